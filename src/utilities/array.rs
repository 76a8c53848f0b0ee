use ndarray::{s, Array2};

/// Circularly shifts the rows and columns of `data` by (`shift_row`,`shift_col`)
fn roll<T: Clone + Default>(data: &Array2<T>, shift_row: usize, shift_col: usize) -> Array2<T> {
    let (n_row, n_col) = data.dim();
    let mut rolled = Array2::<T>::default((n_row, n_col));
    for ((i, j), value) in data.indexed_iter() {
        rolled[[(i + shift_row) % n_row, (j + shift_col) % n_col]] = value.clone();
    }
    rolled
}

/// Moves the zero-frequency sample to the center of the array
pub fn fftshift<T: Clone + Default>(data: &Array2<T>) -> Array2<T> {
    let (n_row, n_col) = data.dim();
    roll(data, n_row / 2, n_col / 2)
}

/// Inverse of [fftshift]
pub fn ifftshift<T: Clone + Default>(data: &Array2<T>) -> Array2<T> {
    let (n_row, n_col) = data.dim();
    roll(data, n_row - n_row / 2, n_col - n_col / 2)
}

/// Pads `data` with `width` zeros on each side
pub fn pad<T: Clone + Default>(data: &Array2<T>, width: usize) -> Array2<T> {
    let (n_row, n_col) = data.dim();
    let mut padded = Array2::<T>::default((n_row + 2 * width, n_col + 2 * width));
    padded
        .slice_mut(s![width..width + n_row, width..width + n_col])
        .assign(data);
    padded
}

/// Copies `data` into a `size`x`size` array of zeros, starting at `(size - n) / 2` along each axis
///
/// `size` must be at least as large as both dimensions of `data`
pub fn embed_centered<T: Clone + Default>(data: &Array2<T>, size: usize) -> Array2<T> {
    let (n_row, n_col) = data.dim();
    let (i0, j0) = ((size - n_row) / 2, (size - n_col) / 2);
    let mut canvas = Array2::<T>::default((size, size));
    canvas
        .slice_mut(s![i0..i0 + n_row, j0..j0 + n_col])
        .assign(data);
    canvas
}

/// Extracts the `size`x`size` block starting at `start` along both axes
pub fn crop_centered<T: Clone>(data: &Array2<T>, start: usize, size: usize) -> Array2<T> {
    data.slice(s![start..start + size, start..start + size])
        .to_owned()
}

/// Sums `data` over non-overlapping `factor`x`factor` blocks
///
/// Trailing rows and columns that do not fill a whole block are discarded
pub fn bin(data: &Array2<f64>, factor: usize) -> Array2<f64> {
    if factor <= 1 {
        return data.clone();
    }
    let (n_row, n_col) = data.dim();
    Array2::from_shape_fn((n_row / factor, n_col / factor), |(i, j)| {
        data.slice(s![
            i * factor..(i + 1) * factor,
            j * factor..(j + 1) * factor
        ])
        .sum()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn shift_odd_and_even() {
        let even = array![[0, 1, 2, 3], [4, 5, 6, 7], [8, 9, 10, 11], [12, 13, 14, 15]];
        assert_eq!(fftshift(&even)[[2, 2]], 0);
        assert_eq!(ifftshift(&fftshift(&even)), even);
        let odd = array![[0, 1, 2], [3, 4, 5], [6, 7, 8]];
        assert_eq!(fftshift(&odd)[[1, 1]], 0);
        assert_eq!(ifftshift(&odd)[[0, 0]], 4);
        assert_eq!(ifftshift(&fftshift(&odd)), odd);
    }

    #[test]
    fn binning_sums_blocks() {
        let data = Array2::from_elem((6, 6), 1f64);
        let binned = bin(&data, 3);
        assert_eq!(binned.dim(), (2, 2));
        assert!(binned.iter().all(|&x| x == 9.));
    }

    #[test]
    fn embed_then_crop() {
        let data = array![[1., 2.], [3., 4.]];
        let canvas = embed_centered(&data, 5);
        assert_eq!(canvas.sum(), 10.);
        assert_eq!(crop_centered(&canvas, 1, 2), data);
        assert_eq!(pad(&data, 2).dim(), (6, 6));
    }
}
