use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::engine::SpawnPolicy;
use crate::grid::MIN_SIZE;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("toml parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Game settings, usually read from a TOML file.
///
/// Every key is optional:
///
/// ```toml
/// size = 4
/// start_tiles = 1
/// store_path = "save.json"
///
/// [spawn]
/// two_weight = 5
/// four_weight = 1
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GameConfig {
    /// Grid edge length.
    #[serde(default = "defaults::size")]
    pub size: usize,
    /// Tiles placed on a fresh grid.
    #[serde(default = "defaults::start_tiles")]
    pub start_tiles: usize,
    #[serde(default)]
    pub spawn: SpawnPolicy,
    /// Where the command-line front end keeps its save file.
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            size: defaults::size(),
            start_tiles: defaults::start_tiles(),
            spawn: SpawnPolicy::default(),
            store_path: None,
        }
    }
}

impl GameConfig {
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size < MIN_SIZE {
            return Err(ConfigError::Invalid(format!(
                "size must be at least {MIN_SIZE}, got {}",
                self.size
            )));
        }
        let Some(cells) = self.size.checked_mul(self.size) else {
            return Err(ConfigError::Invalid(format!("size {} is too large", self.size)));
        };
        if self.start_tiles > cells {
            return Err(ConfigError::Invalid(format!(
                "start_tiles {} exceeds the {cells} cells of the grid",
                self.start_tiles
            )));
        }
        let SpawnPolicy { two_weight, four_weight } = self.spawn;
        if two_weight == 0 && four_weight == 0 {
            return Err(ConfigError::Invalid("spawn weights cannot both be zero".into()));
        }
        if two_weight.checked_add(four_weight).is_none() {
            return Err(ConfigError::Invalid(format!(
                "spawn weights {two_weight} + {four_weight} exceed {}",
                u32::MAX
            )));
        }
        Ok(())
    }
}

mod defaults {
    pub fn size() -> usize { crate::grid::DEFAULT_SIZE }
    pub fn start_tiles() -> usize { 1 }
}
