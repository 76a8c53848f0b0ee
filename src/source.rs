//!
//! # Light sources
//!
//! A [Source] is a monochromatic point source; sources are propagated through the
//! telescope as a [SourceSet]: a single source, an [Asterism] or the sub-directions of an
//! [ExtendedSource].

use std::fmt::Display;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::{ExtendedSource, FromBuilder, Result};

mod builder;
pub use builder::SourceBuilder;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source wavelength must be positive, found {0}m")]
    Wavelength(f64),
    #[error("source photon rate must be positive, found {0}")]
    NegativePhotons(f64),
    #[error("an asterism needs at least one source")]
    EmptyAsterism,
    #[error(
        "sources with different wavelengths ({0}m and {1}m): summing up PSFs of different wavelengths is not implemented"
    )]
    MixedWavelengths(f64, f64),
}

/// Propagation of a set of sources through an optical system
pub trait Propagation {
    fn propagate(&mut self, src: &mut SourceSet) -> Result<()>;
}

/// Polar sky coordinates
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Distance to the optical axis \[arcsec\]
    pub radius: f64,
    /// Position angle \[degree\]
    pub azimuth: f64,
}
impl Coordinates {
    pub fn new(radius: f64, azimuth: f64) -> Self {
        Self { radius, azimuth }
    }
    /// Cartesian coordinates \[arcsec\]
    pub fn cartesian(&self) -> (f64, f64) {
        let (s, c) = self.azimuth.to_radians().sin_cos();
        (self.radius * c, self.radius * s)
    }
    /// Polar coordinates from cartesian coordinates \[arcsec\]
    pub fn from_cartesian(x: f64, y: f64) -> Self {
        Self {
            radius: x.hypot(y),
            azimuth: y.atan2(x).to_degrees(),
        }
    }
}

/// Role of a source within a [SourceSet]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SourceTag {
    #[default]
    Point,
    AsterismMember,
    SubDirection,
}

/// Monochromatic point source
///
/// The flux map and the phase are set when the source is coupled to a telescope
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub(crate) wavelength: f64,
    pub(crate) n_photon: f64,
    pub(crate) coordinates: Coordinates,
    pub(crate) tag: SourceTag,
    pub(crate) flux_map: Option<Array2<f64>>,
    pub(crate) phase: Option<Array2<f64>>,
    pub(crate) var: f64,
}
impl FromBuilder for Source {
    type ComponentBuilder = SourceBuilder;
}
impl Source {
    pub(crate) fn new(wavelength: f64, n_photon: f64, coordinates: Coordinates, tag: SourceTag) -> Self {
        Self {
            wavelength,
            n_photon,
            coordinates,
            tag,
            flux_map: None,
            phase: None,
            var: 0.,
        }
    }
    /// Wavelength \[m\]
    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }
    /// Photon rate \[m^-2.s^-1\]
    pub fn n_photon(&self) -> f64 {
        self.n_photon
    }
    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }
    pub fn tag(&self) -> SourceTag {
        self.tag
    }
    /// Number of photons per pupil pixel and per sampling time
    pub fn flux_map(&self) -> Option<&Array2<f64>> {
        self.flux_map.as_ref()
    }
    /// Phase \[rd\]
    pub fn phase(&self) -> Option<&Array2<f64>> {
        self.phase.as_ref()
    }
    /// Phase variance over the pupil \[rd^2\]
    pub fn phase_var(&self) -> f64 {
        self.var
    }
    /// Total number of photons collected by the telescope per sampling time
    pub fn n_photon_collected(&self) -> f64 {
        self.flux_map.as_ref().map_or(0., |f| f.sum())
    }
    pub fn is_coupled(&self) -> bool {
        self.flux_map.is_some()
    }
}
impl Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Source ({:?}): {:.1}nm, {:.3e} ph/m^2/s, [{:.2}\",{:.1}deg]",
            self.tag,
            self.wavelength * 1e9,
            self.n_photon,
            self.coordinates.radius,
            self.coordinates.azimuth
        )
    }
}

/// Sources observed simultaneously at the same wavelength
#[derive(Debug, Clone, PartialEq)]
pub struct Asterism {
    sources: Vec<Source>,
}
impl Asterism {
    /// Creates an asterism from sources sharing the same wavelength
    pub fn new(sources: Vec<Source>) -> Result<Self> {
        let first = sources.first().ok_or(SourceError::EmptyAsterism)?;
        check_wavelength(&sources, first.wavelength)?;
        Ok(Self {
            sources: sources
                .into_iter()
                .map(|src| Source {
                    tag: SourceTag::AsterismMember,
                    ..src
                })
                .collect(),
        })
    }
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }
    pub fn sources_mut(&mut self) -> &mut [Source] {
        &mut self.sources
    }
}

fn check_wavelength(sources: &[Source], wavelength: f64) -> Result<()> {
    match sources.iter().find(|src| src.wavelength != wavelength) {
        Some(src) => Err(SourceError::MixedWavelengths(wavelength, src.wavelength).into()),
        None => Ok(()),
    }
}

/// Set of sources propagated together
#[derive(Debug, Clone)]
pub enum SourceSet {
    Point(Source),
    Asterism(Asterism),
    Extended(ExtendedSource),
}
impl From<Source> for SourceSet {
    fn from(src: Source) -> Self {
        SourceSet::Point(src)
    }
}
impl From<Asterism> for SourceSet {
    fn from(ast: Asterism) -> Self {
        SourceSet::Asterism(ast)
    }
}
impl From<ExtendedSource> for SourceSet {
    fn from(sun: ExtendedSource) -> Self {
        SourceSet::Extended(sun)
    }
}
impl SourceSet {
    /// Point sources of the set, sub-directions for an extended source
    pub fn sources(&self) -> &[Source] {
        match self {
            SourceSet::Point(src) => std::slice::from_ref(src),
            SourceSet::Asterism(ast) => ast.sources(),
            SourceSet::Extended(sun) => sun.sources(),
        }
    }
    pub fn sources_mut(&mut self) -> &mut [Source] {
        match self {
            SourceSet::Point(src) => std::slice::from_mut(src),
            SourceSet::Asterism(ast) => ast.sources_mut(),
            SourceSet::Extended(sun) => sun.sources_mut(),
        }
    }
    /// Number of point sources
    pub fn len(&self) -> usize {
        self.sources().len()
    }
    pub fn is_empty(&self) -> bool {
        self.sources().is_empty()
    }
    pub fn is_extended(&self) -> bool {
        matches!(self, SourceSet::Extended(_))
    }
    pub fn extended(&self) -> Option<&ExtendedSource> {
        match self {
            SourceSet::Extended(sun) => Some(sun),
            _ => None,
        }
    }
    /// Common wavelength of the sources
    pub fn wavelength(&self) -> Result<f64> {
        let wavelength = match self {
            SourceSet::Extended(sun) => sun.wavelength(),
            _ => self
                .sources()
                .first()
                .map(|src| src.wavelength)
                .ok_or(SourceError::EmptyAsterism)?,
        };
        check_wavelength(self.sources(), wavelength)?;
        Ok(wavelength)
    }
    /// Label of the set in an optical path
    pub fn label(&self) -> String {
        match self {
            SourceSet::Point(src) => format!("source({:.0}nm)", src.wavelength * 1e9),
            SourceSet::Asterism(ast) => format!("asterism({})", ast.sources.len()),
            SourceSet::Extended(sun) => format!(
                "sun({}x{} sub-directions)",
                sun.n_sub_dirs(),
                sun.n_sub_dirs()
            ),
        }
    }
    /// Propagates the sources through an optical system
    pub fn through<T: Propagation>(&mut self, system: &mut T) -> Result<&mut Self> {
        system.propagate(self)?;
        Ok(self)
    }
}
