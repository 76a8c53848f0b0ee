//! Array and mask helpers shared by the propagation kernels

pub mod array;
pub mod mask;

pub use array::{bin, crop_centered, embed_centered, fftshift, ifftshift, pad};
pub use mask::{circular_mask, MaskFilter};
