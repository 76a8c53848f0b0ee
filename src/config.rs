//!
//! # Builder configuration files
//!
//! Builders are saved to and loaded from [TOML](https://toml.io) files.
//!
//! ```no_run
//! use sunpsf::{Builder, FromBuilder, Telescope, TelescopeBuilder, TomlConfig};
//!
//! # fn main() -> sunpsf::Result<()> {
//! Telescope::builder().resolution(256).save("telescope.toml")?;
//! let tel = TelescopeBuilder::load("telescope.toml")?.build()?;
//! # Ok(())
//! # }
//! ```

use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};

use crate::{ExtendedSourceBuilder, SourceBuilder, TelescopeBuilder};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot open builder toml file: {1}")]
    Open(#[source] std::io::Error, PathBuf),
    #[error("cannot create builder toml file: {1}")]
    Create(#[source] std::io::Error, PathBuf),
    #[error("cannot read builder toml file: {1}")]
    Read(#[source] std::io::Error, PathBuf),
    #[error("cannot write builder toml file: {1}")]
    Write(#[source] std::io::Error, PathBuf),
    #[error("cannot deserialize builder from toml")]
    Load(#[from] toml::de::Error),
    #[error("cannot serialize builder into toml")]
    Save(#[from] toml::ser::Error),
}
type Result<T> = std::result::Result<T, ConfigError>;

/// TOML persistence of builders
pub trait TomlConfig: Serialize + DeserializeOwned {
    /// Name written in the header of the file
    const NAME: &'static str;
    /// Loads the builder from a toml file
    fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| ConfigError::Open(e, path.to_path_buf()))?;
        let mut toml = String::new();
        file.read_to_string(&mut toml)
            .map_err(|e| ConfigError::Read(e, path.to_path_buf()))?;
        let builder: Self = toml::from_str(&toml)?;
        log::debug!("{} loaded from {:?}", Self::NAME, path);
        Ok(builder)
    }
    /// Saves the builder into a toml file
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let toml = toml::to_string_pretty(self)?;
        let mut file =
            File::create(path).map_err(|e| ConfigError::Create(e, path.to_path_buf()))?;
        write!(file, "# {}\n\n{}", Self::NAME, toml)
            .map_err(|e| ConfigError::Write(e, path.to_path_buf()))?;
        Ok(())
    }
}

impl TomlConfig for TelescopeBuilder {
    const NAME: &'static str = "::sunpsf::TelescopeBuilder";
}
impl TomlConfig for SourceBuilder {
    const NAME: &'static str = "::sunpsf::SourceBuilder";
}
impl TomlConfig for ExtendedSourceBuilder {
    const NAME: &'static str = "::sunpsf::ExtendedSourceBuilder";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExtendedSource, FromBuilder, Telescope};

    #[test]
    fn telescope_toml() -> anyhow::Result<()> {
        let path = std::env::temp_dir().join("sunpsf-telescope.toml");
        let builder = Telescope::builder()
            .resolution(64)
            .central_obstruction(0.2)
            .coronagraph(2.)
            .spiders(vec![45., 135.], 0.05);
        builder.save(&path)?;
        let loaded = TelescopeBuilder::load(&path)?;
        assert_eq!(loaded.resolution, 64);
        assert_eq!(loaded.central_obstruction, 0.2);
        assert_eq!(loaded.coronagraph_diameter, Some(2.));
        assert_eq!(loaded.spiders, builder.spiders);
        std::fs::remove_file(path).ok();
        Ok(())
    }

    #[test]
    fn extended_source_toml() -> anyhow::Result<()> {
        let path = std::env::temp_dir().join("sunpsf-sun.toml");
        let builder = ExtendedSource::builder()
            .fits("imsol.fits")
            .coordinates(120., 30.)
            .n_sub_dirs(5);
        builder.save(&path)?;
        let header = std::fs::read_to_string(&path)?;
        assert!(header.starts_with("# ::sunpsf::ExtendedSourceBuilder"));
        assert_eq!(ExtendedSourceBuilder::load(&path)?, builder);
        std::fs::remove_file(path).ok();
        Ok(())
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            TelescopeBuilder::load("does-not-exist.toml"),
            Err(ConfigError::Open(..))
        ));
    }
}
