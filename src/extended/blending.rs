//! Overlap-add blending filters of the sub-directions mosaic

use ndarray::{s, Array1, Array2};

/// Separable triangular window of `width`x`width` pixels
///
/// The window is 0 on the border and peaks at the center of the tile
pub fn tent(width: usize) -> Array2<f64> {
    let half = (width as f64 - 1.) / 2.;
    let lin = Array1::from_shape_fn(width, |k| 1. - (k as f64 - half).abs() / half);
    let column = lin.view().insert_axis(ndarray::Axis(1));
    let row = lin.view().insert_axis(ndarray::Axis(0));
    &column * &row
}

/// Blending filters of a `n_sub_dirs`x`n_sub_dirs` mosaic of tiles `width` pixels wide,
/// with tiles overlapping by half their width
///
/// The filters add up to a constant only if `width` is even.
/// Filters are ordered row major, the filter of the tile (`row`,`col`) is at index
/// `row * n_sub_dirs + col`.
/// On the edges of the mosaic, the contribution of the missing neighbour is added to the
/// tile filter and the outer quadrant of corner tiles is set to the filter peak, so that
/// the filters of the mosaic add up to the filter peak everywhere.
pub fn blending_filters(width: usize, n_sub_dirs: usize) -> Vec<Array2<f64>> {
    let template = tent(width);
    let peak = template.fold(f64::MIN, |m, x| m.max(*x));
    let h = width / 2;
    let last = n_sub_dirs.saturating_sub(1);
    let mut filters = Vec::with_capacity(n_sub_dirs * n_sub_dirs);
    for row in 0..n_sub_dirs {
        for col in 0..n_sub_dirs {
            let mut filter = template.clone();
            if row == 0 {
                let mut top = filter.slice_mut(s![..h, ..]);
                top += &template.slice(s![width - h.., ..]);
            }
            if row == last {
                let mut bottom = filter.slice_mut(s![width - h.., ..]);
                bottom += &template.slice(s![..h, ..]);
            }
            if col == 0 {
                let mut left = filter.slice_mut(s![.., ..h]);
                left += &template.slice(s![.., width - h..]);
            }
            if col == last {
                let mut right = filter.slice_mut(s![.., width - h..]);
                right += &template.slice(s![.., ..h]);
            }
            let (top, bottom) = (row == 0, row == last);
            let (left, right) = (col == 0, col == last);
            if top && left {
                filter.slice_mut(s![..h, ..h]).fill(peak);
            }
            if top && right {
                filter.slice_mut(s![..h, width - h..]).fill(peak);
            }
            if bottom && left {
                filter.slice_mut(s![width - h.., ..h]).fill(peak);
            }
            if bottom && right {
                filter.slice_mut(s![width - h.., width - h..]).fill(peak);
            }
            filters.push(filter);
        }
    }
    filters
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tent_window() {
        let t = tent(5);
        assert_eq!(t[[2, 2]], 1.);
        assert_eq!(t[[0, 2]], 0.);
        assert_eq!(t[[1, 1]], 0.25);
    }

    #[test]
    fn partition_of_unity() {
        for step in [2, 3, 7, 8, 113] {
            let width = 2 * step;
            let peak = tent(width).fold(0f64, |m, x| m.max(*x));
            for n in 1..=7 {
                let size = step * (n + 1);
                let filters = blending_filters(width, n);
                let mut mosaic = Array2::<f64>::zeros((size, size));
                for (k, filter) in filters.iter().enumerate() {
                    let (i, j) = (step * (k / n), step * (k % n));
                    let mut tile = mosaic.slice_mut(s![i..i + width, j..j + width]);
                    tile += filter;
                }
                let err = mosaic.iter().map(|x| (x - peak).abs()).fold(0f64, f64::max);
                assert!(err < 1e-12, "{n}x{n} tiles of {width}px, max error: {err}");
            }
        }
    }

    #[test]
    fn single_tile_is_flat() {
        let filters = blending_filters(8, 1);
        assert_eq!(filters.len(), 1);
        let peak = tent(8).fold(0f64, |m, x| m.max(*x));
        assert!(filters[0].iter().all(|x| (x - peak).abs() < 1e-12));
    }
}
