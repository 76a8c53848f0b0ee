//!
//! # Fourier backend
//!
//! The propagation kernels only talk to the [FourierBackend] trait.
//! A backend is selected once for the whole process with [set_backend];
//! when none is set, the CPU backend based on `rustfft` is used.

use std::sync::{Arc, OnceLock};

use ndarray::{Array2, Axis};
use rustfft::{num_complex::Complex64, FftDirection, FftPlanner};

/// Two-dimensional discrete Fourier transforms
///
/// The forward transform is not normalized, the inverse transform is normalized by
/// the number of samples so that `ifft2(fft2(x)) = x`
pub trait FourierBackend: Send + Sync {
    /// Backend name
    fn name(&self) -> &str;
    /// In-place forward 2D DFT
    fn fft2(&self, data: &mut Array2<Complex64>);
    /// In-place inverse 2D DFT
    fn ifft2(&self, data: &mut Array2<Complex64>);
}

/// CPU backend
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuBackend;

impl CpuBackend {
    fn transform(data: &mut Array2<Complex64>, direction: FftDirection) {
        let (n_row, n_col) = data.dim();
        if n_row == 0 || n_col == 0 {
            return;
        }
        let mut planner = FftPlanner::<f64>::new();
        let row_fft = planner.plan_fft(n_col, direction);
        let col_fft = planner.plan_fft(n_row, direction);
        let mut scratch = vec![Complex64::default(); row_fft.get_inplace_scratch_len()];
        let mut buffer = vec![Complex64::default(); n_col];
        for mut row in data.axis_iter_mut(Axis(0)) {
            buffer.iter_mut().zip(row.iter()).for_each(|(b, r)| *b = *r);
            row_fft.process_with_scratch(&mut buffer, &mut scratch);
            row.iter_mut().zip(buffer.iter()).for_each(|(r, b)| *r = *b);
        }
        let mut scratch = vec![Complex64::default(); col_fft.get_inplace_scratch_len()];
        let mut buffer = vec![Complex64::default(); n_row];
        for mut col in data.axis_iter_mut(Axis(1)) {
            buffer.iter_mut().zip(col.iter()).for_each(|(b, c)| *b = *c);
            col_fft.process_with_scratch(&mut buffer, &mut scratch);
            col.iter_mut().zip(buffer.iter()).for_each(|(c, b)| *c = *b);
        }
    }
}

impl FourierBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu (rustfft)"
    }
    fn fft2(&self, data: &mut Array2<Complex64>) {
        Self::transform(data, FftDirection::Forward);
    }
    fn ifft2(&self, data: &mut Array2<Complex64>) {
        Self::transform(data, FftDirection::Inverse);
        let n = data.len() as f64;
        data.mapv_inplace(|x| x / n);
    }
}

static BACKEND: OnceLock<Arc<dyn FourierBackend>> = OnceLock::new();

/// Selects the process-wide Fourier backend
///
/// Returns `false` if a backend has already been selected, in which case it is left untouched
pub fn set_backend<B: FourierBackend + 'static>(backend: B) -> bool {
    let name = backend.name().to_string();
    let is_set = BACKEND.set(Arc::new(backend)).is_ok();
    if is_set {
        log::info!("Fourier backend: {name}");
    } else {
        log::warn!("Fourier backend already selected, ignoring {name}");
    }
    is_set
}

/// Returns the process-wide Fourier backend
pub fn backend() -> Arc<dyn FourierBackend> {
    BACKEND.get_or_init(|| Arc::new(CpuBackend)).clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fft2_of_a_delta_is_flat() {
        let mut data = Array2::<Complex64>::zeros((4, 6));
        data[[0, 0]] = Complex64::new(1., 0.);
        CpuBackend.fft2(&mut data);
        assert!(data.iter().all(|x| (x - Complex64::new(1., 0.)).norm() < 1e-12));
    }

    #[test]
    fn ifft2_inverts_fft2() {
        let data = Array2::from_shape_fn((5, 8), |(i, j)| {
            Complex64::new((i * 3 + j) as f64, (i as f64 - j as f64).sin())
        });
        let mut work = data.clone();
        CpuBackend.fft2(&mut work);
        CpuBackend.ifft2(&mut work);
        let err = data
            .iter()
            .zip(work.iter())
            .map(|(a, b)| (a - b).norm())
            .fold(0f64, f64::max);
        assert!(err < 1e-10, "max error: {err}");
    }

    #[test]
    fn fft2_parseval() {
        let data = Array2::from_shape_fn((8, 8), |(i, j)| Complex64::new((i * j) as f64, 1.));
        let energy: f64 = data.iter().map(|x| x.norm_sqr()).sum();
        let mut work = data.clone();
        CpuBackend.fft2(&mut work);
        let spectrum_energy: f64 = work.iter().map(|x| x.norm_sqr()).sum::<f64>() / 64.;
        assert!((energy - spectrum_energy).abs() / energy < 1e-12);
    }
}
