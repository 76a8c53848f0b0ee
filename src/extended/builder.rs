use std::path::PathBuf;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::{Decomposition, ExtendedSource, ExtendedSourceError, MAX_SUB_DIRS};
use crate::{io::ReferenceImage, Builder, Coordinates, Result};

/// `ExtendedSource` builder
///
/// Default properties:
///  - wavelength     : 500nm
///  - photon rate    : 3.31e12 m^-2.s^-1
///  - coordinates    : on-axis
///  - field of view  : 10arcsec
///  - plate scale    : 1/60 arcsec/px
///  - sub-directions : 1x1
///  - padding        : 5arcsec
///  - margin         : 1arcsec
///
/// The reference image is either read from a FITS file or given as an array.
///
/// # Examples
///
/// ```
/// use sunpsf::{Builder, ExtendedSource, FromBuilder};
/// let image = ndarray::Array2::<f64>::ones((1200, 1200));
/// let sun = ExtendedSource::builder()
///     .wavelength(700e-9)
///     .n_photon(2.25e20)
///     .image(image)
///     .n_sub_dirs(3)
///     .build()
///     .unwrap();
/// assert_eq!(sun.sources().len(), 9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedSourceBuilder {
    pub wavelength: f64,
    pub n_photon: f64,
    pub fov: f64,
    pub plate_scale: f64,
    pub n_sub_dirs: usize,
    pub padding: f64,
    pub margin: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fits: Option<PathBuf>,
    pub coordinates: Coordinates,
    #[serde(skip)]
    pub image: Option<Array2<f64>>,
}
impl Default for ExtendedSourceBuilder {
    fn default() -> Self {
        Self {
            wavelength: 500e-9,
            n_photon: 3.31e12,
            fov: 10.,
            plate_scale: 1. / 60.,
            n_sub_dirs: 1,
            padding: 5.,
            margin: 1.,
            fits: None,
            coordinates: Coordinates::default(),
            image: None,
        }
    }
}
impl ExtendedSourceBuilder {
    /// Sets the wavelength \[m\]
    pub fn wavelength(self, wavelength: f64) -> Self {
        Self { wavelength, ..self }
    }
    /// Sets the photon rate \[m^-2.s^-1\]
    pub fn n_photon(self, n_photon: f64) -> Self {
        Self { n_photon, ..self }
    }
    /// Sets the center of the source with respect to the center of the reference image,
    /// radius \[arcsec\] and position angle \[degree\]
    pub fn coordinates(self, radius: f64, azimuth: f64) -> Self {
        Self {
            coordinates: Coordinates::new(radius, azimuth),
            ..self
        }
    }
    /// Sets the field of view \[arcsec\]
    pub fn fov(self, fov: f64) -> Self {
        Self { fov, ..self }
    }
    /// Sets the reference image plate scale \[arcsec/px\]
    pub fn plate_scale(self, plate_scale: f64) -> Self {
        Self {
            plate_scale,
            ..self
        }
    }
    /// Sets the number of sub-directions along each axis
    pub fn n_sub_dirs(self, n_sub_dirs: usize) -> Self {
        Self { n_sub_dirs, ..self }
    }
    /// Sets the padding around the field of view \[arcsec\]
    pub fn padding(self, padding: f64) -> Self {
        Self { padding, ..self }
    }
    /// Sets the extra margin of the sub-direction patches \[arcsec\]
    pub fn margin(self, margin: f64) -> Self {
        Self { margin, ..self }
    }
    /// Reads the reference image from a FITS file
    pub fn fits<P: Into<PathBuf>>(self, path: P) -> Self {
        Self {
            fits: Some(path.into()),
            ..self
        }
    }
    /// Sets the reference image
    pub fn image(self, image: Array2<f64>) -> Self {
        Self {
            image: Some(image),
            ..self
        }
    }
}
impl Builder for ExtendedSourceBuilder {
    type Component = ExtendedSource;
    fn build(self) -> Result<ExtendedSource> {
        if self.n_sub_dirs > MAX_SUB_DIRS {
            return Err(ExtendedSourceError::TooManySubDirections(self.n_sub_dirs).into());
        }
        if self.n_sub_dirs == 0 {
            return Err(ExtendedSourceError::NoSubDirection.into());
        }
        for (name, value) in [
            ("wavelength", self.wavelength),
            ("field of view", self.fov),
            ("plate scale", self.plate_scale),
        ] {
            if !(value > 0.) {
                return Err(ExtendedSourceError::NotPositive(name, value).into());
            }
        }
        for (name, value) in [
            ("padding", self.padding),
            ("margin", self.margin),
            ("photon rate", self.n_photon),
        ] {
            if value < 0. {
                return Err(ExtendedSourceError::NotPositive(name, value).into());
            }
        }
        let reference = match (self.image, &self.fits) {
            (Some(image), _) => ReferenceImage::new(image, self.plate_scale),
            (None, Some(path)) => ReferenceImage::from_fits(path, self.plate_scale)
                .map_err(ExtendedSourceError::from)?,
            (None, None) => return Err(ExtendedSourceError::MissingImage.into()),
        };
        let decomposition = Decomposition::decompose(
            &reference,
            self.coordinates,
            self.fov,
            self.padding,
            self.n_sub_dirs,
            self.margin,
        )?;
        let sun = ExtendedSource::new(
            self.wavelength,
            self.n_photon,
            self.coordinates,
            reference,
            decomposition,
        )?;
        log::info!("{sun}");
        Ok(sun)
    }
}
