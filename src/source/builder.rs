use serde::{Deserialize, Serialize};

use super::{Coordinates, Source, SourceError, SourceTag};
use crate::{Builder, Result};

/// `Source` builder
///
/// Default properties:
///  - wavelength  : 500nm
///  - photon rate : 1e10 m^-2.s^-1
///  - coordinates : on-axis
///
/// # Examples
///
/// - on-axis source with default parameters
///
/// ```
/// use sunpsf::{Builder, FromBuilder, Source};
/// let src = Source::builder().build().unwrap();
/// ```
///
/// - H band source 10 arcsec off-axis
///
/// ```
/// use sunpsf::{Builder, FromBuilder, Source};
/// let src = Source::builder()
///     .wavelength(1.65e-6)
///     .coordinates(10., 45.)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceBuilder {
    pub wavelength: f64,
    pub n_photon: f64,
    pub coordinates: Coordinates,
}
impl Default for SourceBuilder {
    fn default() -> Self {
        Self {
            wavelength: 500e-9,
            n_photon: 1e10,
            coordinates: Coordinates::default(),
        }
    }
}
impl SourceBuilder {
    /// Sets the wavelength \[m\]
    pub fn wavelength(self, wavelength: f64) -> Self {
        Self { wavelength, ..self }
    }
    /// Sets the photon rate \[m^-2.s^-1\]
    pub fn n_photon(self, n_photon: f64) -> Self {
        Self { n_photon, ..self }
    }
    /// Sets the source radius \[arcsec\] and position angle \[degree\]
    pub fn coordinates(self, radius: f64, azimuth: f64) -> Self {
        Self {
            coordinates: Coordinates::new(radius, azimuth),
            ..self
        }
    }
}
impl Builder for SourceBuilder {
    type Component = Source;
    fn build(self) -> Result<Source> {
        if !(self.wavelength > 0.) {
            return Err(SourceError::Wavelength(self.wavelength).into());
        }
        if self.n_photon < 0. {
            return Err(SourceError::NegativePhotons(self.n_photon).into());
        }
        let src = Source::new(
            self.wavelength,
            self.n_photon,
            self.coordinates,
            SourceTag::Point,
        );
        log::debug!("{src}");
        Ok(src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FromBuilder;

    #[test]
    fn default_source() {
        let src = Source::builder().build().unwrap();
        assert_eq!(src.wavelength(), 500e-9);
        assert_eq!(src.n_photon(), 1e10);
        assert!(!src.is_coupled());
    }

    #[test]
    fn invalid_wavelength() {
        assert!(Source::builder().wavelength(0.).build().is_err());
        assert!(Source::builder().n_photon(-1.).build().is_err());
    }
}
