use ndarray::Array2;

/// Returns a `size`x`size` mask that is `true` where the distance to the point
/// (`(size-1)/2 + offset`, `(size-1)/2 + offset`) is strictly less than `radius`
pub fn circular_mask(size: usize, radius: f64, offset: f64) -> Array2<bool> {
    let c = (size as f64 - 1.) * 0.5 + offset;
    Array2::from_shape_fn((size, size), |(i, j)| {
        let (x, y) = (j as f64 - c, i as f64 - c);
        x.hypot(y) < radius
    })
}

/// Masked iterators and statistics
///
/// A tuple of masks keeps the values where all the masks are `true`
pub trait MaskFilter {
    /// Filters out the values in the iterator according to the mask
    fn filter<'a, T: 'a>(self, data: impl Iterator<Item = &'a T>) -> impl Iterator<Item = &'a T>;
    /// Mean of the values inside the mask
    fn masked_mean(self, data: &Array2<f64>) -> f64
    where
        Self: Sized,
    {
        let (n, s) = self
            .filter(data.iter())
            .fold((0usize, 0f64), |(n, s), x| (n + 1, s + x));
        if n == 0 {
            0.
        } else {
            s / n as f64
        }
    }
    /// Variance of the values inside the mask
    fn masked_var(self, data: &Array2<f64>) -> f64
    where
        Self: Sized + Copy,
    {
        let mean = self.masked_mean(data);
        let (n, s) = self
            .filter(data.iter())
            .fold((0usize, 0f64), |(n, s), x| (n + 1, s + (x - mean).powi(2)));
        if n == 0 {
            0.
        } else {
            s / n as f64
        }
    }
}
impl MaskFilter for &Array2<bool> {
    /// Filters out the values in the iterator according to the mask
    fn filter<'a, T: 'a>(self, data: impl Iterator<Item = &'a T>) -> impl Iterator<Item = &'a T> {
        data.zip(self.iter())
            .filter(|(_, m)| **m)
            .map(|(data, _)| data)
    }
}
impl MaskFilter for (&Array2<bool>, &Array2<bool>) {
    /// Filters out the values in the iterator where both mask do not overlap
    fn filter<'a, T: 'a>(self, data: impl Iterator<Item = &'a T>) -> impl Iterator<Item = &'a T> {
        data.zip(self.0.iter().zip(self.1.iter()))
            .filter(|(_, (m, mo))| **m && **mo)
            .map(|(data, _)| data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn masked_statistics() {
        let mask = array![[true, false], [true, true]];
        let data = array![[1., 100.], [2., 3.]];
        assert_eq!((&mask).masked_mean(&data), 2.);
        assert!(((&mask).masked_var(&data) - 2. / 3.).abs() < 1e-12);
        let other = array![[true, true], [false, true]];
        assert_eq!((&mask, &other).masked_mean(&data), 2.);
        let kept: Vec<_> = (&mask, &other).filter(data.iter()).collect();
        assert_eq!(kept, vec![&1., &3.]);
    }

    #[test]
    fn circle() {
        let mask = circular_mask(5, 1.5, 0.);
        assert!(mask[[2, 2]] && mask[[1, 2]] && mask[[1, 1]]);
        assert!(!mask[[0, 0]] && !mask[[0, 2]]);
    }
}
