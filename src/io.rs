//!
//! # FITS input/output
//!
//! The reference image of an extended source is read from the primary HDU of a FITS file,
//! PSFs can be saved to FITS files as double precision images.

use std::path::{Path, PathBuf};

use fitsio::{
    hdu::HduInfo,
    images::{ImageDescription, ImageType},
    FitsFile,
};
use ndarray::{s, Array2};

use crate::{extended::ExtendedSourceError, Coordinates};

#[derive(Debug, thiserror::Error)]
pub enum FitsError {
    #[error("cannot open FITS file: {1}")]
    Open(#[source] fitsio::errors::Error, PathBuf),
    #[error("cannot create FITS file: {1}")]
    Create(#[source] fitsio::errors::Error, PathBuf),
    #[error("FITS I/O failed")]
    Fitsio(#[from] fitsio::errors::Error),
    #[error("the primary HDU of {0} is not an image")]
    NotAnImage(PathBuf),
    #[error("expected a 2D image, found {0} dimensions")]
    Dimensions(usize),
    #[error("image data do not match the image shape")]
    Shape(#[from] ndarray::ShapeError),
}
pub type Result<T> = std::result::Result<T, FitsError>;

/// Brightness map of an extended source
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceImage {
    data: Array2<f64>,
    plate_scale: f64,
}
impl ReferenceImage {
    /// Creates a reference image from an array with a plate scale \[arcsec/px\]
    pub fn new(data: Array2<f64>, plate_scale: f64) -> Self {
        Self { data, plate_scale }
    }
    /// Reads the primary HDU of a FITS file
    pub fn from_fits<P: AsRef<Path>>(path: P, plate_scale: f64) -> Result<Self> {
        let path = path.as_ref();
        let mut fptr = FitsFile::open(path).map_err(|e| FitsError::Open(e, path.to_path_buf()))?;
        let hdu = fptr.primary_hdu()?;
        let shape = match &hdu.info {
            HduInfo::ImageInfo { shape, .. } => shape.clone(),
            _ => return Err(FitsError::NotAnImage(path.to_path_buf())),
        };
        let (n_row, n_col) = match shape.as_slice() {
            [n_row, n_col] => (*n_row, *n_col),
            _ => return Err(FitsError::Dimensions(shape.len())),
        };
        let pixels: Vec<f64> = hdu.read_image(&mut fptr)?;
        let data = Array2::from_shape_vec((n_row, n_col), pixels)?;
        log::info!(
            "reference image {:?}: {}x{}px, {:.4}arcsec/px",
            path,
            n_row,
            n_col,
            plate_scale
        );
        Ok(Self { data, plate_scale })
    }
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }
    /// Plate scale \[arcsec/px\]
    pub fn plate_scale(&self) -> f64 {
        self.plate_scale
    }
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }
    /// Extracts the `size`x`size` patch centered on `center`
    ///
    /// The origin of the sky coordinates is the center of the image
    pub(crate) fn patch_around(
        &self,
        center: Coordinates,
        size: usize,
    ) -> std::result::Result<Array2<f64>, ExtendedSourceError> {
        let (n_row, n_col) = self.dim();
        let (x, y) = center.cartesian();
        let half = size as f64 / 2.;
        let row = x / self.plate_scale + (n_row / 2) as f64 - half;
        let col = y / self.plate_scale + (n_col / 2) as f64 - half;
        self.patch(row.round() as isize, col.round() as isize, size)
    }
    /// Extracts the `size`x`size` patch starting at (`row`,`col`)
    pub(crate) fn patch(
        &self,
        row: isize,
        col: isize,
        size: usize,
    ) -> std::result::Result<Array2<f64>, ExtendedSourceError> {
        patch(&self.data, row, col, size)
    }
}

/// Extracts the `size`x`size` patch of `data` starting at (`row`,`col`)
pub(crate) fn patch(
    data: &Array2<f64>,
    row: isize,
    col: isize,
    size: usize,
) -> std::result::Result<Array2<f64>, ExtendedSourceError> {
    let (n_row, n_col) = data.dim();
    let fits = |start: isize, n: usize| start >= 0 && start as usize + size <= n;
    if !(fits(row, n_row) && fits(col, n_col)) {
        return Err(ExtendedSourceError::OutOfImage {
            row,
            col,
            size,
            shape: (n_row, n_col),
        });
    }
    let (i, j) = (row as usize, col as usize);
    Ok(data.slice(s![i..i + size, j..j + size]).to_owned())
}

/// Writes a 2D array to the primary HDU of a new FITS file
///
/// An existing file is overwritten
pub fn write_fits<P: AsRef<Path>>(path: P, data: &Array2<f64>) -> Result<()> {
    let path = path.as_ref();
    let (n_row, n_col) = data.dim();
    let description = ImageDescription {
        data_type: ImageType::Double,
        dimensions: &[n_row, n_col],
    };
    let mut fptr = FitsFile::create(path)
        .with_custom_primary(&description)
        .overwrite()
        .open()
        .map_err(|e| FitsError::Create(e, path.to_path_buf()))?;
    let hdu = fptr.primary_hdu()?;
    let pixels: Vec<f64> = data.iter().copied().collect();
    hdu.write_image(&mut fptr, &pixels)?;
    log::info!("{n_row}x{n_col} image written to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_bounds() {
        let image = ReferenceImage::new(Array2::from_shape_fn((10, 10), |(i, j)| (i * 10 + j) as f64), 0.1);
        let p = image.patch(2, 3, 4).unwrap();
        assert_eq!(p[[0, 0]], 23.);
        assert_eq!(p.dim(), (4, 4));
        assert!(image.patch(-1, 0, 4).is_err());
        assert!(image.patch(0, 7, 4).is_err());
        let centered = image.patch_around(Coordinates::new(0.2, 90.), 4).unwrap();
        assert_eq!(centered[[0, 0]], 35.);
    }

    #[test]
    fn fits_write_read() {
        let data = Array2::from_shape_fn((6, 9), |(i, j)| i as f64 - 0.5 * j as f64);
        let path = std::env::temp_dir().join("sunpsf-io-test.fits");
        write_fits(&path, &data).unwrap();
        let image = ReferenceImage::from_fits(&path, 0.25).unwrap();
        assert_eq!(image.data(), &data);
        assert_eq!(image.plate_scale(), 0.25);
        std::fs::remove_file(path).ok();
    }
}
