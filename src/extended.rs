//!
//! # Extended sources
//!
//! An extended, spatially incoherent, source like the Sun is modeled from a reference
//! brightness image.
//! The field of view of the source, enlarged by a padding, is split into
//! `n_sub_dirs`x`n_sub_dirs` sub-directions overlapping by half their size.
//! Each sub-direction is propagated through the telescope as a point source and the
//! resulting PSFs are convolved with the brightness patches of the sub-directions before
//! being stitched together with overlap-add [blending filters](blending::blending_filters).

use std::fmt::Display;

use ndarray::Array2;
use skyangle::Conversion;

use crate::{
    io::ReferenceImage, Coordinates, FromBuilder, Source, SourceTag, Telescope,
};

pub mod blending;
mod builder;
pub use builder::ExtendedSourceBuilder;

/// Largest number of sub-directions along each axis
pub const MAX_SUB_DIRS: usize = 7;

#[derive(Debug, thiserror::Error)]
pub enum ExtendedSourceError {
    #[error("too many sub-directions ({0}x{0}, max: {MAX_SUB_DIRS}x{MAX_SUB_DIRS}), processing will not be feasible")]
    TooManySubDirections(usize),
    #[error("at least one sub-direction is required")]
    NoSubDirection,
    #[error("no reference image: set either a FITS file or an array")]
    MissingImage,
    #[error("{0} must be positive, found {1}")]
    NotPositive(&'static str, f64),
    #[error("sub-direction tiles are {0}px wide, at least 4px are required")]
    TileTooSmall(usize),
    #[error("a {size}x{size} patch starting at ({row},{col}) falls outside the {shape:?} reference image")]
    OutOfImage {
        row: isize,
        col: isize,
        size: usize,
        shape: (usize, usize),
    },
    #[error("expected {expected} PSFs, one per sub-direction, found {found}")]
    PsfCount { expected: usize, found: usize },
    #[error(transparent)]
    Fits(#[from] crate::io::FitsError),
}

/// A sub-direction of an extended source
#[derive(Debug, Clone, PartialEq)]
pub struct SubDirection {
    /// Row index in the mosaic
    pub row: usize,
    /// Column index in the mosaic
    pub col: usize,
    /// Sky coordinates of the tile center
    pub coordinates: Coordinates,
    /// Tile size \[arcsec\]
    pub size: f64,
    /// Brightness patch, including the margin, at the reference image plate scale
    pub image: Array2<f64>,
    /// Blending filter
    pub filter: Array2<f64>,
}

/// Geometry of the sub-directions mosaic
///
/// Tiles are `2·step` pixels wide and consecutive tiles are `step` pixels apart, the
/// padded mosaic is `(n_sub_dirs+1)·step` pixels wide.
/// The brightness patch of each tile extends beyond the tile by the margin on every side.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    pub n_sub_dirs: usize,
    /// Field of view \[arcsec\]
    pub fov: f64,
    /// Padding around the field of view \[arcsec\]
    pub padding: f64,
    /// Extra margin of the tile patches \[arcsec\]
    pub margin: f64,
    /// Plate scale \[arcsec/px\]
    pub plate_scale: f64,
    /// Tile size \[arcsec\]
    pub tile_size: f64,
    step: usize,
    margin_px: usize,
    padded: Array2<f64>,
    /// Sub-directions in row major order
    pub sub_directions: Vec<SubDirection>,
}

fn round(x: f64) -> isize {
    x.round() as isize
}

/// Tile size \[arcsec\], tile step \[px\] and tile patch margin \[px\]
fn pixel_geometry(
    plate_scale: f64,
    fov: f64,
    padding: f64,
    n_sub_dirs: usize,
    margin: f64,
) -> std::result::Result<(f64, usize, usize), ExtendedSourceError> {
    if n_sub_dirs > MAX_SUB_DIRS {
        return Err(ExtendedSourceError::TooManySubDirections(n_sub_dirs));
    }
    if n_sub_dirs == 0 {
        return Err(ExtendedSourceError::NoSubDirection);
    }
    let padded_fov = fov + padding;
    let tile_size = if n_sub_dirs > 1 {
        2. * padded_fov / (n_sub_dirs + 1) as f64
    } else {
        padded_fov
    };
    let step = round(tile_size / (2. * plate_scale)).max(0) as usize;
    if step < 2 {
        return Err(ExtendedSourceError::TileTooSmall(2 * step));
    }
    let margin_px = round(margin / (2. * plate_scale)).max(0) as usize;
    Ok((tile_size, step, margin_px))
}

impl Decomposition {
    /// Splits the field of view of an extended source centered on `center` into
    /// `n_sub_dirs`x`n_sub_dirs` sub-directions
    ///
    /// * `fov` - field of view \[arcsec\]
    /// * `padding` - padding around the field of view \[arcsec\]
    /// * `margin` - extra margin of the sub-direction patches \[arcsec\]
    pub fn decompose(
        reference: &ReferenceImage,
        center: Coordinates,
        fov: f64,
        padding: f64,
        n_sub_dirs: usize,
        margin: f64,
    ) -> std::result::Result<Self, ExtendedSourceError> {
        let plate_scale = reference.plate_scale();
        let (_, step, margin_px) = pixel_geometry(plate_scale, fov, padding, n_sub_dirs, margin)?;
        let width = (n_sub_dirs + 1) * step + 2 * margin_px;
        let padded = reference.patch_around(center, width)?;
        Self::from_padded_patch(padded, plate_scale, center, fov, padding, n_sub_dirs, margin)
    }
    /// Splits the padded brightness patch of an extended source into sub-directions
    ///
    /// * `padded` - brightness patch covering the field of view, the padding and the margin,
    ///   centered on the extended source
    /// * `center` - sky coordinates of the extended source
    #[allow(clippy::too_many_arguments)]
    pub fn from_padded_patch(
        padded: Array2<f64>,
        plate_scale: f64,
        center: Coordinates,
        fov: f64,
        padding: f64,
        n_sub_dirs: usize,
        margin: f64,
    ) -> std::result::Result<Self, ExtendedSourceError> {
        let (tile_size, step, margin_px) =
            pixel_geometry(plate_scale, fov, padding, n_sub_dirs, margin)?;
        let filter_width = 2 * step;
        let image_size = filter_width + 2 * margin_px;
        let width = (n_sub_dirs + 1) * step + 2 * margin_px;
        let filters = blending::blending_filters(filter_width, n_sub_dirs);
        let (tel_x, tel_y) = center.cartesian();
        let (n_row, n_col) = padded.dim();
        let row0 = (n_row as isize - width as isize) / 2;
        let col0 = (n_col as isize - width as isize) / 2;
        // tile centers relative to the mosaic center, in units of step
        let half_mosaic = (n_sub_dirs + 1) as f64 / 2.;

        let mut sub_directions = Vec::with_capacity(n_sub_dirs * n_sub_dirs);
        for (k, filter) in filters.into_iter().enumerate() {
            let (row, col) = (k / n_sub_dirs, k % n_sub_dirs);
            let x = ((row + 1) as f64 - half_mosaic) * (step as f64 * plate_scale);
            let y = ((col + 1) as f64 - half_mosaic) * (step as f64 * plate_scale);
            let coordinates = Coordinates::from_cartesian(x + tel_x, y + tel_y);
            let image = crate::io::patch(
                &padded,
                row0 + (row * step) as isize,
                col0 + (col * step) as isize,
                image_size,
            )?;
            sub_directions.push(SubDirection {
                row,
                col,
                coordinates,
                size: filter_width as f64 * plate_scale,
                image,
                filter,
            });
        }
        Ok(Self {
            n_sub_dirs,
            fov,
            padding,
            margin,
            plate_scale,
            tile_size,
            step,
            margin_px,
            padded,
            sub_directions,
        })
    }
    /// Brightness patch of the field of view with the padding and the margin
    pub fn padded_patch(&self) -> &Array2<f64> {
        &self.padded
    }
    /// Distance between consecutive tiles \[px\]
    pub fn step(&self) -> usize {
        self.step
    }
    /// Width of the tile filters \[px\]
    pub fn filter_width(&self) -> usize {
        2 * self.step
    }
    /// Margin of the tile brightness patches on each side of the tiles \[px\]
    pub fn margin_px(&self) -> usize {
        self.margin_px
    }
    /// Width of the padded mosaic \[px\]
    pub fn mosaic_size(&self) -> usize {
        (self.n_sub_dirs + 1) * self.step
    }
    /// Position of the first row or column of the `index` tile in the mosaic \[px\]
    pub fn tile_offset(&self, index: usize) -> usize {
        index * self.step
    }
    /// Offset of the field of view within the padded mosaic \[px\]
    pub fn fov_offset(&self) -> usize {
        self.mosaic_size().saturating_sub(self.fov_size()) / 2
    }
    /// Width of the field of view \[px\]
    pub fn fov_size(&self) -> usize {
        round(self.fov / self.plate_scale).max(0) as usize
    }
}

/// Extended source
#[derive(Debug, Clone)]
pub struct ExtendedSource {
    pub(crate) wavelength: f64,
    pub(crate) n_photon: f64,
    pub(crate) coordinates: Coordinates,
    pub(crate) reference: ReferenceImage,
    pub(crate) patch: Array2<f64>,
    pub(crate) decomposition: Decomposition,
    pub(crate) sources: Vec<Source>,
}
impl FromBuilder for ExtendedSource {
    type ComponentBuilder = ExtendedSourceBuilder;
}
impl ExtendedSource {
    /// Wavelength \[m\]
    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }
    /// Photon rate \[m^-2.s^-1\]
    pub fn n_photon(&self) -> f64 {
        self.n_photon
    }
    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }
    /// Field of view \[arcsec\]
    pub fn fov(&self) -> f64 {
        self.decomposition.fov
    }
    /// Plate scale of the reference image \[arcsec/px\]
    pub fn plate_scale(&self) -> f64 {
        self.reference.plate_scale()
    }
    pub fn n_sub_dirs(&self) -> usize {
        self.decomposition.n_sub_dirs
    }
    pub fn decomposition(&self) -> &Decomposition {
        &self.decomposition
    }
    pub fn reference(&self) -> &ReferenceImage {
        &self.reference
    }
    /// Brightness patch of the field of view
    pub fn reference_patch(&self) -> &Array2<f64> {
        &self.patch
    }
    /// Brightness patch of the field of view with the padding and the margin
    pub fn padded_patch(&self) -> &Array2<f64> {
        self.decomposition.padded_patch()
    }
    /// Point sources at the center of the sub-directions
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }
    pub fn sources_mut(&mut self) -> &mut [Source] {
        &mut self.sources
    }
    /// Zero-padding factor matching the PSF pixel scale to the reference image plate scale
    pub fn zero_padding_for(&self, tel: &Telescope) -> f64 {
        (self.wavelength / tel.diameter()).to_arcsec() / self.plate_scale()
    }

    pub(crate) fn new(
        wavelength: f64,
        n_photon: f64,
        coordinates: Coordinates,
        reference: ReferenceImage,
        decomposition: Decomposition,
    ) -> std::result::Result<Self, ExtendedSourceError> {
        let fov = decomposition.fov;
        let n_sub_dirs = decomposition.n_sub_dirs;
        let width = round(fov / reference.plate_scale()).max(0) as usize;
        let patch = reference.patch_around(coordinates, width)?;
        let n_tile = (n_sub_dirs * n_sub_dirs) as f64;
        let sources = decomposition
            .sub_directions
            .iter()
            .map(|sub_dir| {
                Source::new(
                    wavelength,
                    (n_photon / n_tile).round(),
                    sub_dir.coordinates,
                    SourceTag::SubDirection,
                )
            })
            .collect();
        Ok(Self {
            wavelength,
            n_photon,
            coordinates,
            reference,
            patch,
            decomposition,
            sources,
        })
    }
}

impl Display for ExtendedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let d = &self.decomposition;
        writeln!(f, "Extended source:")?;
        writeln!(f, " - wavelength     : {:.1}nm", self.wavelength * 1e9)?;
        writeln!(f, " - photon rate    : {:.3e}ph/m^2/s", self.n_photon)?;
        writeln!(
            f,
            " - coordinates    : [{:.2}arcsec,{:.1}deg]",
            self.coordinates.radius, self.coordinates.azimuth
        )?;
        writeln!(f, " - field of view  : {}arcsec", d.fov)?;
        writeln!(f, " - plate scale    : {:.4}arcsec/px", d.plate_scale)?;
        writeln!(
            f,
            " - sub-directions : {}x{}, {:.3}arcsec wide",
            d.n_sub_dirs, d.n_sub_dirs, d.tile_size
        )?;
        write!(
            f,
            " - padding/margin : {}arcsec/{}arcsec",
            d.padding, d.margin
        )
    }
}
