//!
//! # Telescope
//!
//! The telescope holds the pupil, the optical path difference seen by each source and
//! the optional coronagraph and spatial filter.
//! Sources are coupled to the telescope with [SourceSet::through]: the flux maps of the
//! sources are computed and their phases are updated from the telescope OPD.

use std::{f64::consts::PI, fmt::Display};

use ndarray::Array2;

use crate::{
    Coronagraph, FieldPropagator, FromBuilder, Opd, Propagation, Pupil, Result, SourceSet,
};

mod builder;
pub use builder::{Spiders, TelescopeBuilder};

#[derive(Debug, thiserror::Error)]
pub enum TelescopeError {
    #[error("the length of the OPD list ({0}) does not match the number of sources ({1})")]
    OpdLengthMismatch(usize, usize),
    #[error("expected {expected}x{expected} OPD maps")]
    OpdShape { expected: usize },
    #[error("the telescope was not coupled to any source, propagate the sources first")]
    Uncoupled,
    #[error("incompatible operation: {0}")]
    Incompatible(String),
    #[error("spatial filter maps must be {0}x{0}")]
    SpatialFilterShape(usize),
}

/// Amplitude and phase of the pupil field filtered by a focal plane spatial filter
///
/// When set, the phase replaces the phase of the sources and the amplitude multiplies
/// the pupil amplitude
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialFilter {
    pub amplitude: Array2<f64>,
    pub phase: Array2<f64>,
}

/// Telescope
#[derive(Debug, Clone)]
pub struct Telescope {
    pub(crate) pupil: Pupil,
    pub(crate) sampling_time: f64,
    pub(crate) fov: f64,
    pub(crate) coronagraph_diameter: Option<f64>,
    pub(crate) spatial_filter: Option<SpatialFilter>,
    pub(crate) opd: Opd,
    pub(crate) mean_removed_opd: Opd,
    pub(crate) optical_path: Vec<String>,
    pub(crate) warning_src: bool,
    pub(crate) off_axis_tilt: bool,
    pub(crate) propagator: FieldPropagator,
}
impl FromBuilder for Telescope {
    type ComponentBuilder = TelescopeBuilder;
}

impl Telescope {
    /// Pupil resolution \[px\]
    pub fn resolution(&self) -> usize {
        self.pupil.resolution()
    }
    /// Telescope diameter \[m\]
    pub fn diameter(&self) -> f64 {
        self.pupil.diameter()
    }
    /// Pupil pixel size \[m\]
    pub fn pixel_size(&self) -> f64 {
        self.pupil.pixel_size()
    }
    /// Sampling time \[s\]
    pub fn sampling_time(&self) -> f64 {
        self.sampling_time
    }
    /// Field of view \[arcsec\]
    pub fn fov(&self) -> f64 {
        self.fov
    }
    pub fn pupil(&self) -> &Pupil {
        &self.pupil
    }
    /// Mutable access to the pupil, the OPD is reset to the new pupil
    pub fn pupil_mut(&mut self) -> &mut Pupil {
        self.opd = Opd::flat(self.resolution(), None);
        self.mean_removed_opd = self.opd.clone();
        &mut self.pupil
    }
    pub fn opd(&self) -> &Opd {
        &self.opd
    }
    /// OPD with the piston over the pupil removed, updated with [Telescope::update_phase]
    pub fn mean_removed_opd(&self) -> &Opd {
        &self.mean_removed_opd
    }
    /// Elements the light went through
    pub fn optical_path(&self) -> &[String] {
        &self.optical_path
    }
    pub fn coronagraph_diameter(&self) -> Option<f64> {
        self.coronagraph_diameter
    }
    /// Sets the diameter of the perfect coronagraph in units of λ/D, `None` removes it
    pub fn set_coronagraph(&mut self, diameter: Option<f64>) -> &mut Self {
        self.coronagraph_diameter = diameter;
        self
    }
    pub(crate) fn coronagraph(&self) -> Option<Coronagraph> {
        self.coronagraph_diameter.map(|diameter| Coronagraph {
            diameter,
            pupil: self.pupil.mask().clone(),
        })
    }
    pub fn spatial_filter(&self) -> Option<&SpatialFilter> {
        self.spatial_filter.as_ref()
    }
    /// Sets or removes the spatial filter
    pub fn set_spatial_filter(&mut self, filter: Option<SpatialFilter>) -> Result<&mut Self> {
        if let Some(SpatialFilter { amplitude, phase }) = &filter {
            let n = self.resolution();
            if amplitude.dim() != (n, n) || phase.dim() != (n, n) {
                return Err(TelescopeError::SpatialFilterShape(n).into());
            }
            self.optical_path.push("spatial filter".into());
        }
        self.spatial_filter = filter;
        Ok(self)
    }
    /// Enables the tip-tilt of off-axis sources when computing PSFs
    pub fn off_axis_tilt(&mut self, enabled: bool) -> &mut Self {
        self.off_axis_tilt = enabled;
        self
    }
    pub fn propagator(&self) -> &FieldPropagator {
        &self.propagator
    }
    /// Sets the telescope OPD \[m\], the OPD is masked by the pupil
    pub fn set_opd<T: Into<Opd>>(&mut self, opd: T) -> Result<&mut Self> {
        let opd: Opd = opd.into();
        if !opd.has_resolution(self.resolution()) {
            return Err(TelescopeError::OpdShape {
                expected: self.resolution(),
            }
            .into());
        }
        self.opd = opd.masked(&self.pupil);
        Ok(self)
    }
    /// Adds a static OPD map \[m\] to the telescope OPD
    pub fn add_opd(&mut self, map: &Array2<f64>) -> Result<&mut Self> {
        let n = self.resolution();
        if map.dim() != (n, n) {
            return Err(TelescopeError::OpdShape { expected: n }.into());
        }
        self.opd.add_map(map);
        self.opd = std::mem::take(&mut self.opd).masked(&self.pupil);
        self.optical_path.push("NCPA".into());
        Ok(self)
    }
    /// Resets the OPD to a flat wavefront, one map per source for sets of sources
    pub fn reset_opd(&mut self, src: &SourceSet) -> &mut Self {
        let n = match src {
            SourceSet::Point(_) => None,
            _ => Some(src.len()),
        };
        self.opd = Opd::flat(self.resolution(), n);
        self.mean_removed_opd = self.opd.clone();
        self.optical_path = vec![src.label(), "telescope".into()];
        self
    }
    /// Updates the phase of the sources from the telescope OPD
    ///
    /// Also updates the mean removed OPD and the phase variance of the sources
    pub fn update_phase(&mut self, src: &mut SourceSet) -> Result<()> {
        if self.opd.is_per_source() && self.opd.len() != src.len() {
            return Err(TelescopeError::OpdLengthMismatch(self.opd.len(), src.len()).into());
        }
        self.mean_removed_opd = self.opd.mean_removed(&self.pupil);
        for (i, source) in src.sources_mut().iter_mut().enumerate() {
            match self.opd.map(i) {
                Some(map) => {
                    let k = 2. * PI / source.wavelength;
                    let phase = map * k;
                    source.var = match self.mean_removed_opd.map(i) {
                        Some(mean_removed) => self.pupil.var(&(mean_removed * k)),
                        None => self.pupil.var(&phase),
                    };
                    source.phase = Some(phase);
                }
                None => {
                    source.phase = None;
                    source.var = 0.;
                }
            }
        }
        Ok(())
    }
}

impl Propagation for Telescope {
    /// Couples the sources to the telescope
    fn propagate(&mut self, src: &mut SourceSet) -> Result<()> {
        src.wavelength()?;
        let n = self.resolution();
        let is_flat = !self.opd.has_resolution(n) || self.opd.is_empty() || self.opd.is_flat();
        if is_flat {
            self.reset_opd(src);
        } else {
            self.optical_path = vec![src.label(), "telescope".into()];
        }
        if src.is_extended() && !self.opd.is_per_source() {
            self.opd = std::mem::take(&mut self.opd).replicate(src.len());
        }
        let scale = self.sampling_time * self.pixel_size().powi(2);
        let reflectivity = self.pupil.reflectivity();
        for source in src.sources_mut() {
            source.flux_map = Some(reflectivity * (source.n_photon * scale));
        }
        self.update_phase(src)?;
        log::debug!("optical path: {}", self.optical_path.join(" ~~> "));
        Ok(())
    }
}

impl Display for Telescope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Telescope:")?;
        writeln!(f, " - diameter            : {:.2}m", self.diameter())?;
        writeln!(f, " - resolution          : {}px", self.resolution())?;
        writeln!(f, " - pixel size          : {:.3}m", self.pixel_size())?;
        writeln!(f, " - surface             : {:.1}m^2", self.pupil.surface())?;
        writeln!(
            f,
            " - central obstruction : {:.0}%",
            100. * self.pupil.central_obstruction()
        )?;
        writeln!(f, " - pixels in the pupil : {}", self.pupil.pixel_area())?;
        writeln!(f, " - field of view       : {}arcsec", self.fov)?;
        if let Some(diameter) = self.coronagraph_diameter {
            writeln!(f, " - coronagraph         : {diameter}λ/D")?;
        }
        write!(f, " - optical path        : {}", self.optical_path.join(" ~~> "))
    }
}
