//!
//! # Fourier propagation
//!
//! The complex pupil field `amplitude x exp(i phase)` is zero-padded and Fourier transformed
//! to the focal plane.
//! The PSF sampling is set with the zero-padding factor, if the zero-padding factor is less
//! than 2 the field is oversampled by an integer factor and the PSF is binned back to the
//! requested sampling.
//! An optional perfect coronagraph (apodiser, focal plane mask and Lyot stop) can be
//! inserted in the optical path.

use std::{f64::consts::PI, sync::Arc};

use ndarray::Array2;
use rustfft::num_complex::Complex64;

use crate::{
    backend,
    utilities::{bin, circular_mask, crop_centered, fftshift, ifftshift, pad},
    FourierBackend, Result,
};

/// Radius of the Lyot stop as a fraction of half the padded field size
const LYOT_STOP_UNDERSIZING: f64 = 0.9;

#[derive(Debug, thiserror::Error)]
pub enum PropagatorError {
    #[error(
        "image has too many pixels ({0}) for this pupil sampling (max: {1}), try using a pupil mask with more pixels"
    )]
    ResolutionTooLarge(usize, usize),
    #[error("the zero-padding factor must be positive, found {0}")]
    ZeroPadding(f64),
    #[error("amplitude {0:?} and phase {1:?} must be square arrays of the same size")]
    Shape((usize, usize), (usize, usize)),
    #[error("coronagraph pupil {0:?} does not match the field {1:?}")]
    CoronagraphPupil((usize, usize), (usize, usize)),
}

/// Perfect coronagraph
#[derive(Debug, Clone, PartialEq)]
pub struct Coronagraph {
    /// Focal plane mask diameter in units of λ/D
    pub diameter: f64,
    /// Pupil used for the Lyot stop
    pub pupil: Array2<bool>,
}

/// Focal plane field
#[derive(Debug, Clone, PartialEq)]
pub struct PropagatedField {
    /// Complex field at the oversampled resolution
    pub emf: Array2<Complex64>,
    /// Squared modulus of the field, binned to the requested resolution
    pub irradiance: Array2<f64>,
    /// Oversampling factor
    pub oversampling: usize,
    /// Number of pixels of the irradiance along each axis
    pub resolution: usize,
}

/// Pupil to focal plane propagation
#[derive(Clone)]
pub struct FieldPropagator {
    backend: Arc<dyn FourierBackend>,
}
impl Default for FieldPropagator {
    fn default() -> Self {
        Self {
            backend: backend(),
        }
    }
}
impl std::fmt::Debug for FieldPropagator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldPropagator")
            .field("backend", &self.backend.name())
            .finish()
    }
}

/// Sizes of the propagation arrays
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Sampling {
    pub oversampling: usize,
    pub img_resolution: usize,
    pub img_size: usize,
    pub pad_width: usize,
    pub n: usize,
}
impl Sampling {
    pub fn new(resolution: usize, zero_padding: f64, img_resolution: Option<usize>) -> Result<Self> {
        if !(zero_padding > 0.) {
            return Err(PropagatorError::ZeroPadding(zero_padding).into());
        }
        let max_resolution = zero_padding * resolution as f64;
        let img_resolution = match img_resolution {
            Some(r) if r as f64 > max_resolution => {
                return Err(
                    PropagatorError::ResolutionTooLarge(r, max_resolution.trunc() as usize).into(),
                )
            }
            Some(r) => r,
            None => max_resolution.trunc() as usize,
        };
        let oversampling = if zero_padding < 2. {
            (2. / zero_padding).ceil() as usize
        } else {
            1
        };
        let n = (zero_padding * oversampling as f64 * resolution as f64).trunc() as usize;
        let pad_width = (n.saturating_sub(resolution) + 1) / 2;
        Ok(Self {
            oversampling,
            img_resolution,
            img_size: img_resolution * oversampling,
            pad_width,
            n: resolution + 2 * pad_width,
        })
    }
    /// First row and column of the cropped focal plane
    ///
    /// The crop is shifted by one pixel when the parities of the padded field and of
    /// the image differ
    pub fn crop_start(&self) -> usize {
        let (n, s) = (self.n, self.img_size);
        n.div_ceil(2) + 1 - n % 2 - 1 - s / 2
    }
}

impl FieldPropagator {
    pub fn new(backend: Arc<dyn FourierBackend>) -> Self {
        Self { backend }
    }
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
    /// `fftshift(fft2(ifftshift(data)))`
    fn centered_fft2(&self, data: &Array2<Complex64>) -> Array2<Complex64> {
        let mut data = ifftshift(data);
        self.backend.fft2(&mut data);
        fftshift(&data)
    }
    /// `fftshift(ifft2(ifftshift(data)))`
    fn centered_ifft2(&self, data: &Array2<Complex64>) -> Array2<Complex64> {
        let mut data = ifftshift(data);
        self.backend.ifft2(&mut data);
        fftshift(&data)
    }
    /// Propagates the pupil field to the focal plane
    ///
    /// * `amplitude` - field amplitude in the pupil
    /// * `phase` - field phase in the pupil \[rd\]
    /// * `zero_padding` - ratio of the PSF sampling to the diffraction limit `λ/D`
    /// * `img_resolution` - number of pixels of the PSF, at most `zero_padding` times the
    ///   pupil resolution which is also the default
    /// * `coronagraph` - optional perfect coronagraph
    pub fn propagate(
        &self,
        amplitude: &Array2<f64>,
        phase: &Array2<f64>,
        zero_padding: f64,
        img_resolution: Option<usize>,
        coronagraph: Option<&Coronagraph>,
    ) -> Result<PropagatedField> {
        let (n_row, n_col) = amplitude.dim();
        if n_row != n_col || phase.dim() != amplitude.dim() {
            return Err(PropagatorError::Shape(amplitude.dim(), phase.dim()).into());
        }
        let resolution = n_row;
        let sampling = Sampling::new(resolution, zero_padding, img_resolution)?;
        let Sampling {
            oversampling,
            img_resolution,
            img_size,
            pad_width,
            n,
        } = sampling;
        log::debug!(
            "propagation: {n}x{n} field, {img_size}px image, oversampling: {oversampling}"
        );

        let mut field = Array2::<Complex64>::zeros((resolution, resolution));
        field
            .iter_mut()
            .zip(amplitude.iter().zip(phase.iter()))
            .for_each(|(f, (a, p))| *f = Complex64::from_polar(*a, *p));
        let field = pad(&field, pad_width);

        let parity = (1 - img_resolution % 2) as f64;
        let phasor = Array2::from_shape_fn((n, n), |(i, j)| {
            Complex64::from_polar(1., -PI / n as f64 * (i + j) as f64 * parity)
        });

        let emf = match coronagraph {
            None => self.centered_fft2(&(&field * &phasor)) / n as f64,
            Some(Coronagraph { diameter, pupil }) => {
                if pupil.dim() != amplitude.dim() {
                    return Err(
                        PropagatorError::CoronagraphPupil(pupil.dim(), amplitude.dim()).into(),
                    );
                }
                let to_complex = |m: &bool| Complex64::new(if *m { 1. } else { 0. }, 0.);
                let apodiser = circular_mask(n, resolution as f64 / 2., 0.).map(to_complex);
                let focal_mask = circular_mask(n, diameter / 2. * zero_padding, 0.)
                    .mapv(|m| Complex64::new(if m { 0. } else { 1. }, 0.));
                let lyot_stop = (circular_mask(n, n as f64 / 2. * LYOT_STOP_UNDERSIZING, 1.)
                    & pad(pupil, pad_width))
                .map(to_complex);
                let emf = self.centered_fft2(&(&field * &phasor * &apodiser)) / n as f64;
                let b = emf * &focal_mask * &phasor;
                let c = self.centered_ifft2(&b) * &lyot_stop * &phasor;
                self.centered_fft2(&c)
            }
        };

        let emf = crop_centered(&emf, sampling.crop_start(), img_size);
        let irradiance = emf.mapv(|x| x.norm_sqr());
        let irradiance = if oversampling != 1 {
            bin(&irradiance, oversampling)
        } else {
            irradiance
        };
        Ok(PropagatedField {
            emf,
            irradiance,
            oversampling,
            resolution: img_resolution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Pupil, PsfError};

    fn argmax(data: &Array2<f64>) -> (usize, usize) {
        data.indexed_iter()
            .fold(((0, 0), f64::MIN), |(ij, m), (kl, &x)| {
                if x > m {
                    (kl, x)
                } else {
                    (ij, m)
                }
            })
            .0
    }

    #[test]
    fn sampling_and_cropping() {
        let s = Sampling::new(32, 1.5, None).unwrap();
        assert_eq!(s.oversampling, 2);
        assert_eq!(s.img_resolution, 48);
        assert_eq!((s.n, s.img_size, s.crop_start()), (96, 96, 0));
        let s = Sampling::new(32, 4., Some(127)).unwrap();
        assert_eq!((s.n, s.img_size, s.crop_start()), (128, 127, 1));
        let s = Sampling::new(31, 3., Some(92)).unwrap();
        assert_eq!((s.n, s.img_size, s.crop_start()), (93, 92, 0));
        let s = Sampling::new(31, 3., Some(91)).unwrap();
        assert_eq!((s.n, s.img_size, s.crop_start()), (93, 91, 1));
    }

    #[test]
    fn resolution_too_large() {
        let amp = Array2::<f64>::ones((16, 16));
        let phase = Array2::<f64>::zeros((16, 16));
        let result = FieldPropagator::default().propagate(&amp, &phase, 2., Some(33), None);
        assert!(matches!(
            result,
            Err(PsfError::Propagator(PropagatorError::ResolutionTooLarge(
                33, 32
            )))
        ));
    }

    #[test]
    fn energy_is_conserved() {
        let pupil = Pupil::circular(32, 1., 0.);
        let amp = pupil.as_f64();
        let phase = Array2::from_shape_fn((32, 32), |(i, j)| 0.1 * (i as f64) - 0.05 * j as f64);
        let field = FieldPropagator::default()
            .propagate(&amp, &phase, 4., None, None)
            .unwrap();
        let energy = field.irradiance.sum();
        assert!((energy - pupil.pixel_area() as f64).abs() < 1e-9 * energy);
    }

    #[test]
    fn odd_and_even_images_are_centered() {
        let amp = Pupil::circular(32, 1., 0.).as_f64();
        let phase = Array2::<f64>::zeros((32, 32));
        let propagator = FieldPropagator::default();
        let odd = propagator
            .propagate(&amp, &phase, 4., Some(127), None)
            .unwrap()
            .irradiance;
        assert_eq!(argmax(&odd), (63, 63));
        let even = propagator
            .propagate(&amp, &phase, 4., Some(128), None)
            .unwrap()
            .irradiance;
        let peak = even[[63, 63]];
        for ij in [[63, 64], [64, 63], [64, 64]] {
            assert!((even[ij] - peak).abs() < 1e-9 * peak);
        }
        assert!(even.iter().all(|&x| x <= peak * (1. + 1e-9)));
    }

    #[test]
    fn oversampled_psf_is_binned() {
        let amp = Pupil::circular(32, 1., 0.).as_f64();
        let phase = Array2::<f64>::zeros((32, 32));
        let field = FieldPropagator::default()
            .propagate(&amp, &phase, 1.5, None, None)
            .unwrap();
        assert_eq!(field.oversampling, 2);
        assert_eq!(field.emf.dim(), (96, 96));
        assert_eq!(field.irradiance.dim(), (48, 48));
    }

    #[test]
    fn coronagraph_blocks_light() {
        let pupil = Pupil::circular(32, 1., 0.);
        let amp = pupil.as_f64();
        let phase = Array2::<f64>::zeros((32, 32));
        let propagator = FieldPropagator::default();
        let psf = propagator
            .propagate(&amp, &phase, 4., None, None)
            .unwrap()
            .irradiance;
        let coronagraph = Coronagraph {
            diameter: 3.,
            pupil: pupil.mask().clone(),
        };
        let coro = propagator
            .propagate(&amp, &phase, 4., None, Some(&coronagraph))
            .unwrap()
            .irradiance;
        assert_eq!(coro.dim(), psf.dim());
        assert!(coro.sum() < psf.sum());
    }
}
