#[derive(Debug, thiserror::Error)]
pub enum PsfError {
    #[error("cannot build `::sunpsf::Pupil`")]
    Pupil(#[from] crate::pupil::PupilError),
    #[error("field propagation failed")]
    Propagator(#[from] crate::propagator::PropagatorError),
    #[error("telescope configuration error")]
    Telescope(#[from] crate::telescope::TelescopeError),
    #[error("source configuration error")]
    Source(#[from] crate::source::SourceError),
    #[error("cannot build `::sunpsf::ExtendedSource`")]
    ExtendedSource(#[from] crate::extended::ExtendedSourceError),
    #[error("FITS I/O failed")]
    Fits(#[from] crate::io::FitsError),
    #[error("builder configuration file error")]
    Config(#[from] crate::config::ConfigError),
}

impl PsfError {
    /// Returns `true` if the error comes from an invalid configuration of the simulation
    /// rather than from a failure of the numerical or I/O machinery
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::Fits(_) | Self::Config(_))
    }
}
