use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_STORE_KEY: &str = "video-progress";
pub const DEFAULT_DATA_DIR: &str = "data";

/// Where the effective configuration file came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    Explicit(PathBuf),
    File(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Default => None,
            ConfigSource::EnvPath(path)
            | ConfigSource::Explicit(path)
            | ConfigSource::File(path) => Some(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one JSON file per store key.
    pub data_dir: PathBuf,
    pub key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            key: DEFAULT_STORE_KEY.to_string(),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TmdbConfig {
    pub api_key: Option<String>,
    /// Overrides the public TMDB v3 endpoint.
    pub base_url: Option<Url>,
    pub language: Option<String>,
}

impl std::fmt::Debug for TmdbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmdbConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("language", &self.language)
            .finish()
    }
}

/// Effective host configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub tmdb: TmdbConfig,
    /// Run the background legacy reconciliation when a store migrates.
    pub reconcile: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            tmdb: TmdbConfig::default(),
            reconcile: true,
        }
    }
}
