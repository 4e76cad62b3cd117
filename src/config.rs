//! Application configuration management.
//!
//! Persistent defaults are layered with `figment`:
//! built-in defaults < TOML config file < `DUPEFINDER_*` environment
//! variables. CLI flags are applied on top by the caller.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::duplicates::SortKey;
use crate::error::SetupError;
use crate::mapfile::MapFormat;
use crate::scanner::{DigestAlgorithm, VanishedPolicy};

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "DUPEFINDER_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of hashing workers.
    pub workers: usize,
    /// Digest algorithm for new hashes and map files.
    pub algorithm: DigestAlgorithm,
    /// Key that decides the keeper of each group.
    pub sort: SortKey,
    /// Reverse the keeper ordering.
    pub reverse: bool,
    /// Print absolute paths in listings and hash-sums.
    pub absolute_paths: bool,
    /// Layout used when exporting a map file.
    pub map_format: MapFormat,
    /// Handling of files that disappear before they are hashed.
    pub vanished: VanishedPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 1,
            algorithm: DigestAlgorithm::default(),
            sort: SortKey::default(),
            reverse: false,
            absolute_paths: false,
            map_format: MapFormat::default(),
            vanished: VanishedPolicy::default(),
        }
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// With `explicit` set, that file must exist and parse. Otherwise the
    /// platform config file is used when present.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidConfig`] if the explicit file is missing
    /// or any layer fails to parse.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SetupError> {
        let file = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(SetupError::InvalidConfig(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Some(path.to_path_buf())
            }
            None => Self::default_path().filter(|p| p.is_file()),
        };

        if let Some(ref path) = file {
            log::debug!("Loading configuration from {}", path.display());
        }
        Self::figment(file.as_deref())
            .extract()
            .map_err(|e| SetupError::InvalidConfig(e.to_string()))
    }

    /// Build the provider stack without extracting it.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Platform-specific configuration path, if a home directory is known.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "dupefinder", "dupefinder")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
