//!
//! # Extended source image synthesis
//!
//! The brightness patch of each sub-direction is convolved with the PSF of the
//! sub-direction, weighted by the sub-direction blending filter and added to the mosaic
//! of the padded field of view.
//! The composite image is the mosaic cropped to the field of view of the extended source.

use std::sync::Arc;

use ndarray::{s, Array2};
use rayon::prelude::*;
use rustfft::num_complex::Complex64;

use crate::{
    backend,
    extended::{ExtendedSourceError, SubDirection},
    utilities::{crop_centered, embed_centered, fftshift},
    ExtendedSource, FourierBackend, Result,
};

/// Stitches the PSFs of the sub-directions of an [ExtendedSource]
pub struct SolarPsfCompositor<'a> {
    sun: &'a ExtendedSource,
    backend: Arc<dyn FourierBackend>,
}
impl<'a> SolarPsfCompositor<'a> {
    /// Creates a compositor using the process-wide Fourier backend
    pub fn new(sun: &'a ExtendedSource) -> Self {
        Self {
            sun,
            backend: backend(),
        }
    }
    /// Sets the Fourier backend
    pub fn backend(self, backend: Arc<dyn FourierBackend>) -> Self {
        Self { backend, ..self }
    }
    /// Convolves the brightness patch of a sub-direction with its PSF and applies the
    /// blending filter
    fn blend(&self, sub_dir: &SubDirection, psf: &Array2<f64>) -> Array2<f64> {
        let n_image = sub_dir.image.nrows();
        let (n_row, n_col) = psf.dim();
        let n_fft = (n_image + n_row.max(n_col)).next_power_of_two();
        let mut image = embed_centered(&sub_dir.image.mapv(|x| Complex64::new(x, 0.)), n_fft);
        // the PSF center (n_row/2,n_col/2) goes to (n_fft/2,n_fft/2)
        let mut kernel = Array2::<Complex64>::zeros((n_fft, n_fft));
        let (i0, j0) = (n_fft / 2 - n_row / 2, n_fft / 2 - n_col / 2);
        kernel
            .slice_mut(s![i0..i0 + n_row, j0..j0 + n_col])
            .assign(&psf.mapv(|x| Complex64::new(x, 0.)));
        self.backend.fft2(&mut image);
        self.backend.fft2(&mut kernel);
        image *= &kernel;
        self.backend.ifft2(&mut image);
        let convolved = fftshift(&image).mapv(|x| x.norm());

        let width = sub_dir.filter.nrows();
        let margin = (n_image - width) / 2;
        crop_centered(&convolved, (n_fft - n_image) / 2 + margin, width) * &sub_dir.filter
    }
    /// Returns the image of the extended source from the PSFs of the sub-directions
    ///
    /// The PSFs must be given in the order of the sub-directions, with the same plate
    /// scale as the reference image of the source.
    pub fn composite<'b, I>(&self, psfs: I) -> Result<Array2<f64>>
    where
        I: IntoIterator<Item = &'b Array2<f64>>,
    {
        let decomposition = self.sun.decomposition();
        let psfs: Vec<&Array2<f64>> = psfs.into_iter().collect();
        let expected = decomposition.sub_directions.len();
        if psfs.len() != expected {
            return Err(ExtendedSourceError::PsfCount {
                expected,
                found: psfs.len(),
            }
            .into());
        }

        let tiles: Vec<_> = decomposition
            .sub_directions
            .par_iter()
            .zip(psfs.into_par_iter())
            .map(|(sub_dir, psf)| (sub_dir.row, sub_dir.col, self.blend(sub_dir, psf)))
            .collect();

        let n_mosaic = decomposition.mosaic_size();
        let mut mosaic = Array2::<f64>::zeros((n_mosaic, n_mosaic));
        for (row, col, tile) in tiles {
            let (i, j) = (decomposition.tile_offset(row), decomposition.tile_offset(col));
            if i >= n_mosaic || j >= n_mosaic {
                continue;
            }
            let (n_i, n_j) = (tile.nrows().min(n_mosaic - i), tile.ncols().min(n_mosaic - j));
            let mut patch = mosaic.slice_mut(s![i..i + n_i, j..j + n_j]);
            patch += &tile.slice(s![..n_i, ..n_j]);
        }
        log::debug!(
            "{} sub-directions stitched into a {n_mosaic}x{n_mosaic} mosaic",
            expected
        );

        let offset = decomposition.fov_offset().min(n_mosaic);
        let size = decomposition.fov_size().min(n_mosaic - offset);
        Ok(crop_centered(&mosaic, offset, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{extended::blending::tent, Builder, FromBuilder, PsfError};

    fn uniform_sun(n_sub_dirs: usize) -> ExtendedSource {
        ExtendedSource::builder()
            .image(Array2::ones((100, 100)))
            .plate_scale(0.25)
            .n_sub_dirs(n_sub_dirs)
            .build()
            .unwrap()
    }

    fn delta(n: usize) -> Array2<f64> {
        let mut psf = Array2::zeros((n, n));
        psf[[n / 2, n / 2]] = 1.;
        psf
    }

    #[test]
    fn uniform_source_with_perfect_psf() {
        for n in 1..=7 {
            let sun = uniform_sun(n);
            let width = sun.decomposition().filter_width();
            let psfs = vec![delta(33); n * n];
            let image = SolarPsfCompositor::new(&sun).composite(&psfs).unwrap();
            assert_eq!(image.dim(), (40, 40));
            let peak = tent(width).fold(0f64, |m, x| m.max(*x));
            let err = image
                .iter()
                .map(|x| (x - peak).abs())
                .fold(0f64, f64::max);
            assert!(err < 1e-9, "{n}x{n} tiles of {width}px, max error: {err}");
        }
    }

    #[test]
    fn even_and_odd_psfs_are_centered() {
        let mut image = Array2::zeros((100, 100));
        image[[50, 50]] = 1.;
        let sun = ExtendedSource::builder()
            .image(image)
            .plate_scale(0.25)
            .build()
            .unwrap();
        for n in [32, 33] {
            let psfs = vec![delta(n)];
            let composite = SolarPsfCompositor::new(&sun).composite(&psfs).unwrap();
            let (argmax, _) = composite
                .indexed_iter()
                .fold(((0, 0), f64::MIN), |(k, m), (i, x)| if *x > m { (i, *x) } else { (k, m) });
            assert_eq!(argmax, (20, 20), "{n}px PSF");
        }
    }

    #[test]
    fn one_psf_per_sub_direction() {
        let sun = uniform_sun(2);
        let psfs = vec![delta(33); 3];
        assert!(matches!(
            SolarPsfCompositor::new(&sun).composite(&psfs),
            Err(PsfError::ExtendedSource(ExtendedSourceError::PsfCount {
                expected: 4,
                found: 3
            }))
        ));
    }
}
