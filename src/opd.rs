//!
//! # Optical path difference
//!
//! The OPD seen by the telescope is either a single map shared by all the sources,
//! one map per source or one modal stack per source (`[resolution,resolution,n_mode]`).

use ndarray::{Array2, Array3, Axis, Zip};

use crate::{utilities::MaskFilter, Pupil};

/// Optical path difference \[m\]
#[derive(Debug, Clone, PartialEq)]
pub enum Opd {
    /// A single map
    Map(Array2<f64>),
    /// One map per source
    Maps(Vec<Array2<f64>>),
    /// One modal stack per source
    Stack(Vec<Array3<f64>>),
}
impl Default for Opd {
    fn default() -> Self {
        Opd::Map(Array2::zeros((0, 0)))
    }
}
impl From<Array2<f64>> for Opd {
    fn from(map: Array2<f64>) -> Self {
        Opd::Map(map)
    }
}
impl From<Vec<Array2<f64>>> for Opd {
    fn from(maps: Vec<Array2<f64>>) -> Self {
        Opd::Maps(maps)
    }
}
impl From<Vec<Array3<f64>>> for Opd {
    fn from(stack: Vec<Array3<f64>>) -> Self {
        Opd::Stack(stack)
    }
}
impl Opd {
    /// Flat OPD, one map if `n` is `None` or `n` maps otherwise
    pub fn flat(resolution: usize, n: Option<usize>) -> Self {
        let map = Array2::zeros((resolution, resolution));
        match n {
            None => Opd::Map(map),
            Some(n) => Opd::Maps(vec![map; n]),
        }
    }
    /// Number of maps, a single map counts for 1
    pub fn len(&self) -> usize {
        match self {
            Opd::Map(_) => 1,
            Opd::Maps(maps) => maps.len(),
            Opd::Stack(stack) => stack.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Returns `true` if every OPD value is zero
    pub fn is_flat(&self) -> bool {
        match self {
            Opd::Map(map) => map.iter().all(|x| *x == 0.),
            Opd::Maps(maps) => maps.iter().flatten().all(|x| *x == 0.),
            Opd::Stack(stack) => stack.iter().flatten().all(|x| *x == 0.),
        }
    }
    /// Returns `true` if the OPD holds one map per source
    pub fn is_per_source(&self) -> bool {
        !matches!(self, Opd::Map(_))
    }
    /// Returns `true` if every map is `resolution`x`resolution`
    pub fn has_resolution(&self, resolution: usize) -> bool {
        let square = |(n, m): (usize, usize)| n == resolution && m == resolution;
        match self {
            Opd::Map(map) => square(map.dim()),
            Opd::Maps(maps) => maps.iter().all(|map| square(map.dim())),
            Opd::Stack(stack) => stack.iter().all(|s| {
                let (n, m, _) = s.dim();
                square((n, m))
            }),
        }
    }
    /// Returns the map seen by the source `index`
    ///
    /// A single map is seen by all the sources, modal stacks have no map
    pub fn map(&self, index: usize) -> Option<&Array2<f64>> {
        match self {
            Opd::Map(map) => Some(map),
            Opd::Maps(maps) => maps.get(index),
            Opd::Stack(_) => None,
        }
    }
    /// Replicates a single map `n` times
    pub fn replicate(self, n: usize) -> Self {
        match self {
            Opd::Map(map) => Opd::Maps(vec![map; n]),
            _ => self,
        }
    }
    /// Multiplies the OPD by the pupil mask
    pub fn masked(mut self, pupil: &Pupil) -> Self {
        let mask = pupil.mask();
        let apply = |map: &mut Array2<f64>| {
            Zip::from(map).and(mask).for_each(|o, &m| {
                if !m {
                    *o = 0.
                }
            })
        };
        match &mut self {
            Opd::Map(map) => apply(map),
            Opd::Maps(maps) => maps.iter_mut().for_each(apply),
            Opd::Stack(stack) => stack.iter_mut().for_each(|s| {
                s.axis_iter_mut(Axis(2)).for_each(|mut mode| {
                    Zip::from(&mut mode).and(mask).for_each(|o, &m| {
                        if !m {
                            *o = 0.
                        }
                    })
                })
            }),
        }
        self
    }
    /// Adds a map to every OPD map or mode
    pub fn add_map(&mut self, other: &Array2<f64>) {
        match self {
            Opd::Map(map) => *map += other,
            Opd::Maps(maps) => maps.iter_mut().for_each(|map| *map += other),
            Opd::Stack(stack) => stack.iter_mut().for_each(|s| {
                s.axis_iter_mut(Axis(2))
                    .for_each(|mut mode| mode += other)
            }),
        }
    }
    /// OPD with the piston over the pupil removed, and null outside the pupil
    ///
    /// Modal stacks are returned unchanged
    pub fn mean_removed(&self, pupil: &Pupil) -> Self {
        let remove = |map: &Array2<f64>| {
            let mean = pupil.mask().masked_mean(map);
            let mut map = map - mean;
            Zip::from(&mut map).and(pupil.mask()).for_each(|o, &m| {
                if !m {
                    *o = 0.
                }
            });
            map
        };
        match self {
            Opd::Map(map) => Opd::Map(remove(map)),
            Opd::Maps(maps) => Opd::Maps(maps.iter().map(remove).collect()),
            Opd::Stack(_) => self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_source_maps() {
        let opd = Opd::flat(8, None).replicate(4);
        assert_eq!(opd.len(), 4);
        assert!(opd.is_per_source());
        assert!(opd.has_resolution(8));
        assert!(opd.map(3).is_some() && opd.map(4).is_none());
        assert!(opd.is_flat());
    }

    #[test]
    fn mean_removed_opd() {
        let pupil = Pupil::circular(16, 1., 0.);
        let opd = Opd::Map(Array2::from_elem((16, 16), 1e-6)).masked(&pupil);
        let Opd::Map(map) = opd.mean_removed(&pupil) else {
            panic!("expected a single map")
        };
        assert!(map.iter().all(|x| x.abs() < 1e-18));
    }

    #[test]
    fn modal_stack_masking() {
        let pupil = Pupil::circular(16, 1., 0.);
        let mut opd = Opd::Stack(vec![Array3::from_elem((16, 16, 3), 1.)]);
        opd.add_map(&Array2::from_elem((16, 16), 1.));
        let Opd::Stack(stack) = opd.masked(&pupil) else {
            panic!("expected a modal stack")
        };
        assert_eq!(stack[0][[0, 0, 2]], 0.);
        assert_eq!(stack[0][[8, 8, 1]], 2.);
        assert!(Opd::Stack(stack).map(0).is_none());
    }
}
