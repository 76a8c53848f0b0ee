//!
//! # Point spread functions
//!
//! PSFs are computed with [Telescope::compute_psf] for all the sources coupled to the
//! telescope.
//! For an extended source, the PSFs of all the sub-directions are combined into a single
//! image of the source with the [SolarPsfCompositor].

use std::f64::consts::PI;

use ndarray::Array2;
use rayon::prelude::*;
use rustfft::num_complex::Complex64;
use skyangle::Conversion;

use crate::{
    pupil::linspace, telescope::TelescopeError, Opd, Result, SolarPsfCompositor, Source,
    SourceSet, Telescope,
};

/// PSF of a point source
#[derive(Debug, Clone, PartialEq)]
pub struct PsfResult {
    /// Focal plane complex field
    pub emf: Array2<Complex64>,
    /// PSF \[photon\]
    pub irradiance: Array2<f64>,
    /// PSF normalized to unit sum
    pub normalized: Array2<f64>,
    /// PSF extent along the x axis \[arcsec\]
    pub x_arcsec: [f64; 2],
    /// PSF extent along the y axis \[arcsec\]
    pub y_arcsec: [f64; 2],
    /// PSF extent along the x axis \[rd\]
    pub x_rad: [f64; 2],
    /// PSF extent along the y axis \[rd\]
    pub y_rad: [f64; 2],
    /// Oversampling factor applied to the focal plane field
    pub oversampling: usize,
}
impl PsfResult {
    /// Number of pixels along each axis
    pub fn resolution(&self) -> usize {
        self.irradiance.nrows()
    }
    /// Total number of photons
    pub fn flux(&self) -> f64 {
        self.irradiance.sum()
    }
}

/// PSFs of a [SourceSet]
#[derive(Debug, Clone, PartialEq)]
pub enum Psf {
    /// PSF of a single point source
    Single(PsfResult),
    /// PSFs of an asterism, in the order of the sources
    Multiple(Vec<PsfResult>),
    /// PSFs of the sub-directions of an extended source and the composite image
    Extended {
        tiles: Vec<PsfResult>,
        composite: Array2<f64>,
        /// Extent of the composite image along both axis \[arcsec\]
        extent_arcsec: [f64; 2],
    },
}
impl Psf {
    /// PSFs of the point sources
    pub fn results(&self) -> &[PsfResult] {
        match self {
            Psf::Single(psf) => std::slice::from_ref(psf),
            Psf::Multiple(psfs) => psfs,
            Psf::Extended { tiles, .. } => tiles,
        }
    }
    /// Composite image of an extended source
    pub fn composite(&self) -> Option<&Array2<f64>> {
        match self {
            Psf::Extended { composite, .. } => Some(composite),
            _ => None,
        }
    }
    pub fn len(&self) -> usize {
        self.results().len()
    }
    pub fn is_empty(&self) -> bool {
        self.results().is_empty()
    }
}

impl Telescope {
    /// Tip-tilt phase \[rd\] of an off-axis source
    fn off_axis_tip_tilt(&self, src: &Source) -> Array2<f64> {
        let n = self.resolution();
        let ramp = linspace(-PI, PI, n);
        let radius = src.coordinates.radius.from_arcsec() * self.diameter() / src.wavelength;
        let (s, c) = src.coordinates.azimuth.to_radians().sin_cos();
        let mask = self.pupil.mask();
        Array2::from_shape_fn((n, n), |(i, j)| {
            if mask[[i, j]] {
                radius * (c * ramp[j] + s * ramp[i])
            } else {
                0.
            }
        })
    }
    /// Computes the PSFs of the sources coupled to the telescope
    ///
    /// * `zero_padding` - PSF sampling as a fraction of λ/D
    /// * `img_resolution` - number of pixels of the PSFs, the default is the zero-padding
    ///   factor times the pupil resolution
    ///
    /// The phase of the sources is updated from the telescope OPD before propagation.
    pub fn compute_psf(
        &mut self,
        src: &mut SourceSet,
        zero_padding: f64,
        img_resolution: Option<usize>,
    ) -> Result<Psf> {
        if src.is_empty() {
            return Err(TelescopeError::Uncoupled.into());
        }
        if matches!(self.opd, Opd::Stack(_)) {
            return Err(TelescopeError::Incompatible(
                "PSFs cannot be computed from modal OPD stacks".into(),
            )
            .into());
        }
        if src
            .sources()
            .iter()
            .any(|source| !source.is_coupled())
        {
            return Err(TelescopeError::Uncoupled.into());
        }
        self.update_phase(src)?;
        let wavelength = src.wavelength()?;

        let img_resolution =
            img_resolution.unwrap_or((zero_padding * self.resolution() as f64).trunc() as usize);
        let half_width = match src.extended() {
            Some(sun) => sun.fov() / 2.,
            None => {
                (wavelength / self.diameter()).to_arcsec() * img_resolution as f64
                    / 2.
                    / zero_padding
            }
        };
        let x_arcsec = [-half_width, half_width];
        let x_rad = [x_arcsec[0].from_arcsec(), x_arcsec[1].from_arcsec()];

        for source in src.sources() {
            let radius = source.coordinates.radius;
            let (outside, limit) = match src.extended() {
                Some(_) => (radius + 2f64.sqrt() * half_width > self.fov, self.fov),
                None => (radius > half_width, half_width),
            };
            if outside && !self.warning_src {
                log::warn!(
                    "some sources are outside of the field of view ({limit:.3}arcsec), wrapping effects will appear"
                );
                self.warning_src = true;
            }
        }
        if let Some(sun) = src.extended() {
            let psf_pixel_scale = (wavelength / self.diameter() / zero_padding).to_arcsec();
            if (psf_pixel_scale - sun.plate_scale()).abs() > 1e-3 * sun.plate_scale() {
                log::warn!(
                    "PSF pixel scale ({psf_pixel_scale:.5}arcsec) does not match the source plate scale ({:.5}arcsec)",
                    sun.plate_scale()
                );
            }
        }

        let pupil = self.pupil.as_f64();
        let coronagraph = self.coronagraph();
        let tiles = src
            .sources()
            .par_iter()
            .map(|source| -> Result<PsfResult> {
                let (amplitude_mask, phase) = match &self.spatial_filter {
                    Some(filter) => (Some(&filter.amplitude), filter.phase.clone()),
                    None => (
                        None,
                        source
                            .phase
                            .clone()
                            .ok_or(TelescopeError::Uncoupled)?,
                    ),
                };
                let flux_map = source.flux_map.as_ref().ok_or(TelescopeError::Uncoupled)?;
                let mut amplitude = &pupil * &flux_map.mapv(f64::sqrt);
                if let Some(mask) = amplitude_mask {
                    amplitude *= mask;
                }
                let phase = if self.off_axis_tilt {
                    phase + self.off_axis_tip_tilt(source)
                } else {
                    phase
                };
                let field = self.propagator.propagate(
                    &amplitude,
                    &phase,
                    zero_padding,
                    Some(img_resolution),
                    coronagraph.as_ref(),
                )?;
                let total = field.irradiance.sum();
                let normalized = if total > 0. {
                    &field.irradiance / total
                } else {
                    field.irradiance.clone()
                };
                Ok(PsfResult {
                    emf: field.emf,
                    irradiance: field.irradiance,
                    normalized,
                    x_arcsec,
                    y_arcsec: x_arcsec,
                    x_rad,
                    y_rad: x_rad,
                    oversampling: field.oversampling,
                })
            })
            .collect::<Result<Vec<PsfResult>>>()?;

        Ok(match src {
            SourceSet::Extended(sun) => {
                let composite = SolarPsfCompositor::new(sun)
                    .composite(tiles.iter().map(|psf| &psf.normalized))?;
                Psf::Extended {
                    tiles,
                    composite,
                    extent_arcsec: x_arcsec,
                }
            }
            _ => match <[PsfResult; 1]>::try_from(tiles) {
                Ok([psf]) => Psf::Single(psf),
                Err(tiles) => Psf::Multiple(tiles),
            },
        })
    }
}
