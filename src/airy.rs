//!
//! # Airy pattern
//!
//! Diffraction pattern of an unobstructed circular aperture, used as a reference for the
//! PSFs of diffraction limited telescopes.

use std::f64::consts::PI;

use roots::{find_root_brent, SimpleConvergency};

/// Normalized Airy intensity `[2J1(v)/v]^2` at the reduced radius `v = π D θ / λ`
pub fn intensity(v: f64) -> f64 {
    if v.abs() < 1e-8 {
        1.
    } else {
        let a = 2. * libm::j1(v) / v;
        a * a
    }
}

/// First zero of the Bessel function `J1`
pub fn first_zero() -> Option<f64> {
    let mut convergency = SimpleConvergency {
        eps: 1e-12f64,
        max_iter: 100,
    };
    find_root_brent(3., 4.5, libm::j1, &mut convergency).ok()
}

/// Angular radius \[rd\] of the first dark ring of the Airy pattern
pub fn first_dark_ring(wavelength: f64, diameter: f64) -> Option<f64> {
    first_zero().map(|z| z / PI * wavelength / diameter)
}

/// Airy pattern sampled on a `n`x`n` grid centered on pixel `(n/2,n/2)`
///
/// * `pixel_scale` - angular size of a pixel in units of λ/D
/// * `peak` - intensity at the center of the pattern
pub fn pattern(n: usize, pixel_scale: f64, peak: f64) -> ndarray::Array2<f64> {
    let c = (n / 2) as f64;
    ndarray::Array2::from_shape_fn((n, n), |(i, j)| {
        let r = (i as f64 - c).hypot(j as f64 - c) * pixel_scale;
        peak * intensity(PI * r)
    })
}

/// Peak irradiance of the discrete PSF of a uniformly illuminated pupil
///
/// * `pixel_area` - number of pupil pixels
/// * `n_fft` - size of the zero-padded field
/// * `flux_per_pixel` - photons collected by each pupil pixel
pub fn discrete_peak(pixel_area: usize, n_fft: usize, flux_per_pixel: f64) -> f64 {
    let ratio = pixel_area as f64 / n_fft as f64;
    flux_per_pixel * ratio * ratio
}
