//!
//! # Fourier optics PSF synthesis
//!
//! The crate propagates a complex pupil field through a telescope to the focal plane
//! and builds the resulting point spread functions (PSF) for a single star, an asterism
//! or a spatially extended, partially incoherent source such as the Sun.
//!
//! Elements are created using the builder associated to each element:
//! ```no_run
//! use sunpsf::{Builder, FromBuilder, Source, SourceSet, Telescope};
//!
//! # fn main() -> sunpsf::Result<()> {
//! let mut tel = Telescope::builder().resolution(128).diameter(8.).build()?;
//! let mut src: SourceSet = Source::builder().wavelength(500e-9).build()?.into();
//! src.through(&mut tel)?;
//! let psf = tel.compute_psf(&mut src, 4., None)?;
//! # Ok(())
//! # }
//! ```
//!
//! Extended sources are decomposed into overlapping sub-directions, each propagated as a
//! point source, and the partial images are stitched back with an overlap-add filter:
//! ```no_run
//! use sunpsf::{Builder, ExtendedSource, FromBuilder, SourceSet, Telescope};
//!
//! # fn main() -> sunpsf::Result<()> {
//! let mut tel = Telescope::builder().resolution(64).diameter(1.5).fov(60.).build()?;
//! let sun = ExtendedSource::builder()
//!     .fits("imsol.fits")
//!     .n_sub_dirs(3)
//!     .build()?;
//! let zero_padding = sun.zero_padding_for(&tel);
//! let mut src = SourceSet::from(sun);
//! src.through(&mut tel)?;
//! let psf = tel.compute_psf(&mut src, zero_padding, None)?;
//! # Ok(())
//! # }
//! ```

pub mod airy;
pub mod backend;
pub mod compositor;
pub mod config;
pub mod error;
pub mod extended;
pub mod io;
pub mod opd;
pub mod propagator;
pub mod psf;
pub mod pupil;
pub mod source;
pub mod telescope;
pub mod utilities;

#[doc(inline)]
pub use self::backend::{backend, set_backend, CpuBackend, FourierBackend};
#[doc(inline)]
pub use self::compositor::SolarPsfCompositor;
#[doc(inline)]
pub use self::config::TomlConfig;
#[doc(inline)]
pub use self::error::PsfError;
#[doc(inline)]
pub use self::extended::{Decomposition, ExtendedSource, ExtendedSourceBuilder, SubDirection};
#[doc(inline)]
pub use self::io::ReferenceImage;
#[doc(inline)]
pub use self::opd::Opd;
#[doc(inline)]
pub use self::propagator::{Coronagraph, FieldPropagator, PropagatedField};
#[doc(inline)]
pub use self::psf::{Psf, PsfResult};
#[doc(inline)]
pub use self::pupil::Pupil;
#[doc(inline)]
pub use self::source::{
    Asterism, Coordinates, Propagation, Source, SourceBuilder, SourceSet, SourceTag,
};
#[doc(inline)]
pub use self::telescope::{SpatialFilter, Spiders, Telescope, TelescopeBuilder};

pub use skyangle::Conversion;

pub type Result<T> = std::result::Result<T, PsfError>;

/// Builder type trait
pub trait Builder: Default {
    type Component;
    fn new() -> Self {
        Default::default()
    }
    fn build(self) -> Result<Self::Component>;
}

/// Component built from a [Builder]
pub trait FromBuilder {
    type ComponentBuilder: Builder;
    /// Returns the default builder of the component
    fn builder() -> Self::ComponentBuilder {
        Self::ComponentBuilder::new()
    }
}
