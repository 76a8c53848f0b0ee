use std::sync::Arc;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::Telescope;
use crate::{Builder, FieldPropagator, FourierBackend, Opd, Pupil, Result};

/// Telescope spiders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spiders {
    /// Spider angles \[degree\]
    pub angles: Vec<f64>,
    /// Spider width \[m\]
    pub thickness: f64,
    /// Optional x and y shifts \[m\] of each spider
    pub offsets: Option<(Vec<f64>, Vec<f64>)>,
}

/// `Telescope` builder
///
/// Default properties:
///  - resolution          : 100px
///  - diameter            : 8m
///  - sampling time       : 1ms
///  - central obstruction : 0
///  - field of view       : 0arcsec
///  - reflectivity        : 1
///
/// # Examples
///
/// ```
/// use sunpsf::{Builder, FromBuilder, Telescope};
/// let tel = Telescope::builder()
///     .resolution(128)
///     .diameter(8.)
///     .central_obstruction(0.15)
///     .spiders(vec![0., 90., 180., 270.], 0.1)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelescopeBuilder {
    pub resolution: usize,
    pub diameter: f64,
    pub sampling_time: f64,
    pub central_obstruction: f64,
    pub fov: f64,
    pub reflectivity: f64,
    #[serde(default)]
    pub off_axis_tilt: bool,
    pub coronagraph_diameter: Option<f64>,
    pub spiders: Option<Spiders>,
    #[serde(skip)]
    pub pupil: Option<Array2<bool>>,
    #[serde(skip)]
    pub propagator: Option<FieldPropagator>,
}
impl Default for TelescopeBuilder {
    fn default() -> Self {
        Self {
            resolution: 100,
            diameter: 8.,
            sampling_time: 1e-3,
            central_obstruction: 0.,
            fov: 0.,
            reflectivity: 1.,
            off_axis_tilt: false,
            coronagraph_diameter: None,
            spiders: None,
            pupil: None,
            propagator: None,
        }
    }
}
impl TelescopeBuilder {
    /// Sets the pupil resolution \[px\]
    pub fn resolution(self, resolution: usize) -> Self {
        Self { resolution, ..self }
    }
    /// Sets the telescope diameter \[m\]
    pub fn diameter(self, diameter: f64) -> Self {
        Self { diameter, ..self }
    }
    /// Sets the sampling time \[s\]
    pub fn sampling_time(self, sampling_time: f64) -> Self {
        Self {
            sampling_time,
            ..self
        }
    }
    /// Sets the central obstruction as a fraction of the diameter
    pub fn central_obstruction(self, central_obstruction: f64) -> Self {
        Self {
            central_obstruction,
            ..self
        }
    }
    /// Sets the field of view \[arcsec\]
    pub fn fov(self, fov: f64) -> Self {
        Self { fov, ..self }
    }
    /// Sets a uniform pupil reflectivity
    pub fn reflectivity(self, reflectivity: f64) -> Self {
        Self {
            reflectivity,
            ..self
        }
    }
    /// Adds a perfect coronagraph with a focal plane mask of `diameter` λ/D
    pub fn coronagraph(self, diameter: f64) -> Self {
        Self {
            coronagraph_diameter: Some(diameter),
            ..self
        }
    }
    /// Adds spiders of width `thickness` \[m\] at the given angles \[degree\]
    pub fn spiders(self, angles: Vec<f64>, thickness: f64) -> Self {
        Self {
            spiders: Some(Spiders {
                angles,
                thickness,
                offsets: None,
            }),
            ..self
        }
    }
    /// Sets a user-defined pupil, the resolution is set to the pupil size
    pub fn pupil(self, mask: Array2<bool>) -> Self {
        Self {
            resolution: mask.nrows(),
            pupil: Some(mask),
            ..self
        }
    }
    /// Enables the tip-tilt of off-axis sources
    pub fn off_axis_tilt(self) -> Self {
        Self {
            off_axis_tilt: true,
            ..self
        }
    }
    /// Sets the Fourier backend of this telescope, the process-wide backend otherwise
    pub fn backend(self, backend: Arc<dyn FourierBackend>) -> Self {
        Self {
            propagator: Some(FieldPropagator::new(backend)),
            ..self
        }
    }
}
impl Builder for TelescopeBuilder {
    type Component = Telescope;
    fn build(self) -> Result<Telescope> {
        let mut pupil = match self.pupil {
            Some(mask) => Pupil::from_mask(mask, self.diameter)?,
            None => Pupil::circular(self.resolution, self.diameter, self.central_obstruction),
        };
        if let Some(Spiders {
            angles,
            thickness,
            offsets,
        }) = &self.spiders
        {
            let offsets = offsets
                .as_ref()
                .map(|(x, y)| (x.as_slice(), y.as_slice()));
            pupil.apply_spiders(angles, *thickness, offsets)?;
        }
        pupil.uniform_reflectivity(self.reflectivity)?;
        let opd = Opd::flat(pupil.resolution(), None);
        let tel = Telescope {
            pupil,
            sampling_time: self.sampling_time,
            fov: self.fov,
            coronagraph_diameter: self.coronagraph_diameter,
            spatial_filter: None,
            mean_removed_opd: opd.clone(),
            opd,
            optical_path: vec!["telescope".into()],
            warning_src: false,
            off_axis_tilt: self.off_axis_tilt,
            propagator: self.propagator.unwrap_or_default(),
        };
        log::info!("{tel}");
        Ok(tel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CpuBackend, FromBuilder};

    #[test]
    fn default_telescope() {
        let tel = Telescope::builder().build().unwrap();
        assert_eq!(tel.resolution(), 100);
        assert_eq!(tel.pixel_size(), 0.08);
        assert_eq!(tel.sampling_time(), 1e-3);
        assert!(tel.coronagraph_diameter().is_none());
    }

    #[test]
    fn user_defined_pupil() {
        let mask = Array2::from_elem((20, 20), true);
        let tel = Telescope::builder()
            .pupil(mask)
            .diameter(2.)
            .backend(Arc::new(CpuBackend))
            .build()
            .unwrap();
        assert_eq!(tel.resolution(), 20);
        assert_eq!(tel.pupil().pixel_area(), 400);
        assert_eq!(tel.propagator().backend_name(), "cpu (rustfft)");
    }
}
