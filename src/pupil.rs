//!
//! # Telescope pupil
//!
//! The entrance pupil of the telescope is a binary mask sampled on a square grid of
//! `resolution`x`resolution` pixels, with a reflectivity map that is null outside the mask.

use std::fmt::Display;

use ndarray::{Array2, Zip};

use crate::utilities::MaskFilter;

#[derive(Debug, thiserror::Error)]
pub enum PupilError {
    #[error("pupil mask must be square, found {0}x{1}")]
    NotSquare(usize, usize),
    #[error("expected a {expected}x{expected} map, found {found:?}")]
    Shape { expected: usize, found: (usize, usize) },
    #[error("pupil reflectivity must be positive")]
    NegativeReflectivity,
    #[error("spider angles ({0}) and offsets ({1}) have different lengths")]
    SpiderOffsets(usize, usize),
}
pub type Result<T> = std::result::Result<T, PupilError>;

/// `n` evenly spaced samples over `[a,b]`
pub(crate) fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![a],
        _ => (0..n)
            .map(|k| a + (b - a) * k as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// Telescope pupil
#[derive(Debug, Clone, PartialEq)]
pub struct Pupil {
    resolution: usize,
    diameter: f64,
    central_obstruction: f64,
    user_defined: bool,
    mask: Array2<bool>,
    reflectivity: Array2<f64>,
}
impl Pupil {
    /// Circular pupil of diameter `diameter` \[m\] sampled with `resolution` pixels
    ///
    /// The central obstruction is given as a fraction of the diameter
    pub fn circular(resolution: usize, diameter: f64, central_obstruction: f64) -> Self {
        let mask = Self::circular_mask(resolution, central_obstruction);
        let reflectivity = mask.mapv(|m| if m { 1f64 } else { 0f64 });
        Self {
            resolution,
            diameter,
            central_obstruction,
            user_defined: false,
            mask,
            reflectivity,
        }
    }
    fn circular_mask(resolution: usize, central_obstruction: f64) -> Array2<bool> {
        let n = resolution as f64;
        let x = linspace(-n / 2., n / 2., resolution);
        let outer = ((n + 1.) / 2.).powi(2);
        let inner = (central_obstruction * (n + 1.) / 2.).powi(2);
        Array2::from_shape_fn((resolution, resolution), |(i, j)| {
            let r2 = x[j] * x[j] + x[i] * x[i];
            r2 < outer && r2 >= inner
        })
    }
    /// User-defined pupil
    pub fn from_mask(mask: Array2<bool>, diameter: f64) -> Result<Self> {
        let (n_row, n_col) = mask.dim();
        if n_row != n_col {
            return Err(PupilError::NotSquare(n_row, n_col));
        }
        log::info!("user-defined pupil, the central obstruction is not taken into account");
        let reflectivity = mask.mapv(|m| if m { 1f64 } else { 0f64 });
        Ok(Self {
            resolution: n_row,
            diameter,
            central_obstruction: 0.,
            user_defined: true,
            mask,
            reflectivity,
        })
    }
    /// Number of pixels along the pupil side
    pub fn resolution(&self) -> usize {
        self.resolution
    }
    /// Pupil diameter \[m\]
    pub fn diameter(&self) -> f64 {
        self.diameter
    }
    /// Central obstruction as a fraction of the diameter
    pub fn central_obstruction(&self) -> f64 {
        self.central_obstruction
    }
    /// Pixel size \[m\]
    pub fn pixel_size(&self) -> f64 {
        self.diameter / self.resolution as f64
    }
    /// Number of pixels inside the pupil
    pub fn pixel_area(&self) -> usize {
        self.mask.iter().filter(|m| **m).count()
    }
    /// Light collecting area \[m^2\]
    pub fn surface(&self) -> f64 {
        self.pixel_area() as f64 * self.pixel_size().powi(2)
    }
    /// Binary pupil mask
    pub fn mask(&self) -> &Array2<bool> {
        &self.mask
    }
    /// Pupil mask as 0 or 1 values
    pub fn as_f64(&self) -> Array2<f64> {
        self.mask.mapv(|m| if m { 1f64 } else { 0f64 })
    }
    /// Reflectivity map
    pub fn reflectivity(&self) -> &Array2<f64> {
        &self.reflectivity
    }
    /// Sets a uniform reflectivity inside the pupil
    pub fn uniform_reflectivity(&mut self, value: f64) -> Result<&mut Self> {
        if value < 0. {
            return Err(PupilError::NegativeReflectivity);
        }
        self.reflectivity = self.mask.mapv(|m| if m { value } else { 0f64 });
        Ok(self)
    }
    /// Sets the reflectivity map, the map is zeroed outside the pupil
    pub fn set_reflectivity(&mut self, map: Array2<f64>) -> Result<&mut Self> {
        if map.dim() != self.mask.dim() {
            return Err(PupilError::Shape {
                expected: self.resolution,
                found: map.dim(),
            });
        }
        if map.iter().any(|x| *x < 0.) {
            return Err(PupilError::NegativeReflectivity);
        }
        self.reflectivity = map;
        Zip::from(&mut self.reflectivity)
            .and(&self.mask)
            .for_each(|r, &m| {
                if !m {
                    *r = 0.
                }
            });
        Ok(self)
    }
    /// Replaces the pupil mask, the reflectivity is reset to uniform
    pub fn set_mask(&mut self, mask: Array2<bool>) -> Result<&mut Self> {
        if mask.dim() != self.mask.dim() {
            return Err(PupilError::Shape {
                expected: self.resolution,
                found: mask.dim(),
            });
        }
        self.mask = mask;
        self.reflectivity = self.as_f64();
        log::warn!("a new pupil is now considered, its reflectivity is reset to uniform");
        Ok(self)
    }
    /// Mean of `data` over the pupil
    pub fn mean(&self, data: &Array2<f64>) -> f64 {
        (&self.mask).masked_mean(data)
    }
    /// Variance of `data` over the pupil
    pub fn var(&self, data: &Array2<f64>) -> f64 {
        (&self.mask).masked_var(data)
    }
    /// Adds spiders to the pupil
    ///
    /// * `angle` - spider angles \[degree\], one per spider
    /// * `thickness` - spider width \[m\]
    /// * `offsets` - optional x and y shifts \[m\] of each spider
    ///
    /// The pupil is rebuilt before the spiders are cut, a thickness less or equal to zero
    /// restores the default pupil
    pub fn apply_spiders(
        &mut self,
        angle: &[f64],
        thickness: f64,
        offsets: Option<(&[f64], &[f64])>,
    ) -> Result<&mut Self> {
        let mut mask = if self.user_defined {
            self.mask.clone()
        } else {
            Self::circular_mask(self.resolution, self.central_obstruction)
        };
        if thickness <= 0. {
            log::info!("spider thickness is <=0, returning default pupil");
            return self.set_mask(mask);
        }
        let zeros = vec![0f64; angle.len()];
        let (offset_x, offset_y) = offsets.unwrap_or((&zeros, &zeros));
        if offset_x.len() != angle.len() || offset_y.len() != angle.len() {
            return Err(PupilError::SpiderOffsets(
                angle.len(),
                offset_x.len().min(offset_y.len()),
            ));
        }
        let max_offset = self.central_obstruction * self.diameter / 2. - thickness / 2.;
        let max_abs = |v: &[f64]| v.iter().fold(0f64, |a, x| a.max(x.abs()));
        if max_abs(offset_x) >= max_offset || max_abs(offset_y) > max_offset {
            log::warn!("the spider offsets are too large");
        }
        let n = self.resolution;
        let x = linspace(-self.diameter / 2., self.diameter / 2., n);
        for ((a, dx), dy) in angle.iter().zip(offset_x).zip(offset_y) {
            let a = (a + 90.).rem_euclid(360.);
            let (sin_a, cos_a) = a.to_radians().sin_cos();
            Zip::indexed(&mut mask).for_each(|(i, j), m| {
                let blocked_half = match a {
                    a if a < 90. => i < n / 2,
                    a if a < 180. => j < n / 2,
                    a if a < 270. => i >= n / 2,
                    _ => j >= n / 2,
                };
                let distance = if blocked_half {
                    thickness
                } else {
                    ((x[j] + dx) * cos_a - (x[i] + dy) * sin_a).abs()
                };
                *m &= distance > thickness / 2.;
            });
        }
        self.set_mask(mask)
    }
}

impl Display for Pupil {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Pupil: {:.2}m diameter, {}x{}px, {:.3}m pixel, {:.0}% central obstruction",
            self.diameter,
            self.resolution,
            self.resolution,
            self.pixel_size(),
            100. * self.central_obstruction
        )?;
        write!(
            f,
            " {}px in the pupil, {:.1}m^2 surface",
            self.pixel_area(),
            self.surface()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_pupil_area() {
        let pupil = Pupil::circular(128, 8., 0.);
        let area = pupil.pixel_area() as f64;
        let expected = std::f64::consts::PI * 64f64.powi(2);
        assert!((area - expected).abs() / expected < 1e-2, "{area} vs {expected}");
        assert_eq!(pupil.pixel_size(), 8. / 128.);
    }

    #[test]
    fn central_obstruction_removes_pixels() {
        let full = Pupil::circular(64, 8., 0.);
        let obstructed = Pupil::circular(64, 8., 0.3);
        assert!(obstructed.pixel_area() < full.pixel_area());
        assert!(!obstructed.mask()[[32, 32]]);
    }

    #[test]
    fn reflectivity_is_zero_outside_the_pupil() {
        let mut pupil = Pupil::circular(32, 1., 0.);
        pupil
            .set_reflectivity(Array2::from_elem((32, 32), 0.5))
            .unwrap();
        assert_eq!(pupil.reflectivity()[[0, 0]], 0.);
        assert_eq!(pupil.reflectivity()[[16, 16]], 0.5);
        assert!(pupil.set_reflectivity(Array2::zeros((31, 31))).is_err());
    }

    #[test]
    fn statistics_ignore_the_outside_of_the_pupil() {
        let pupil = Pupil::circular(32, 1., 0.);
        let data = Array2::from_shape_fn((32, 32), |(i, j)| {
            if pupil.mask()[[i, j]] {
                if (i + j) % 2 == 0 {
                    1.
                } else {
                    -1.
                }
            } else {
                100.
            }
        });
        let n = pupil.pixel_area() as f64;
        let mean = data.iter().zip(pupil.mask()).filter(|(_, m)| **m).map(|(x, _)| x).sum::<f64>() / n;
        assert!((pupil.mean(&data) - mean).abs() < 1e-12);
        assert!((pupil.var(&data) - (1. - mean * mean)).abs() < 1e-12);
    }

    #[test]
    fn spiders_cut_the_pupil() {
        let mut pupil = Pupil::circular(100, 8., 0.2);
        let area = pupil.pixel_area();
        pupil
            .apply_spiders(&[0., 90., 180., 270.], 0.2, None)
            .unwrap();
        assert!(pupil.pixel_area() < area);
        pupil.apply_spiders(&[0.], 0., None).unwrap();
        assert_eq!(pupil.pixel_area(), area);
    }
}
