use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use tracing::debug;
use url::Url;

use crate::error::ConfigLoadError;
use crate::models::{Config, ConfigSource};
use crate::util::{non_empty, parse_bool};

pub const CONFIG_PATH_VAR: &str = "WATCHKEEP_CONFIG_PATH";
pub const DATA_DIR_VAR: &str = "WATCHKEEP_DATA_DIR";
pub const STORE_KEY_VAR: &str = "WATCHKEEP_STORE_KEY";
pub const RECONCILE_VAR: &str = "WATCHKEEP_RECONCILE";
pub const TMDB_API_KEY_VAR: &str = "TMDB_API_KEY";
pub const TMDB_BASE_URL_VAR: &str = "TMDB_BASE_URL";
pub const TMDB_LANG_VAR: &str = "TMDB_LANG";

const CANDIDATES: &[&str] = &[
    "watchkeep.toml",
    "watchkeep.json",
    "config/watchkeep.toml",
    "config/watchkeep.json",
];

/// Loaded configuration plus the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLoad {
    pub config: Config,
    pub source: ConfigSource,
}

/// Resolves a [`Config`] from a file and an environment snapshot.
///
/// Precedence, lowest first: built-in defaults, the config file, environment
/// overrides. The file is the explicit path if one was given, otherwise
/// `$WATCHKEEP_CONFIG_PATH`, otherwise the first default candidate found
/// under the root directory.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    env: HashMap<String, String>,
    root: PathBuf,
    explicit: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(env: HashMap<String, String>) -> Self {
        Self {
            env,
            root: PathBuf::from("."),
            explicit: None,
        }
    }

    /// Snapshot of the process environment, after applying `.env` if one
    /// exists in the working directory.
    pub fn from_process_env() -> Result<Self, ConfigLoadError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(
                target: "watchkeep::config",
                path = %path.display(),
                "loaded .env"
            ),
            Err(err) if err.not_found() => {}
            Err(err) => return Err(err.into()),
        }
        Ok(Self::new(std::env::vars().collect()))
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_path(mut self, path: Option<PathBuf>) -> Self {
        self.explicit = path;
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let source = self.locate();
        let mut config = match source.path() {
            Some(path) => load_from_file(path)?,
            None => Config::default(),
        };
        self.apply_env(&mut config)?;
        validate_store_key(&config.store.key)?;

        debug!(
            target: "watchkeep::config",
            source = ?source,
            data_dir = %config.store.data_dir.display(),
            key = %config.store.key,
            reconcile = config.reconcile,
            "configuration resolved"
        );
        Ok(ConfigLoad { config, source })
    }

    fn locate(&self) -> ConfigSource {
        if let Some(path) = &self.explicit {
            return ConfigSource::Explicit(path.clone());
        }
        if let Some(path) = non_empty(&self.env, CONFIG_PATH_VAR) {
            return ConfigSource::EnvPath(PathBuf::from(path));
        }

        CANDIDATES
            .iter()
            .map(|candidate| self.root.join(candidate))
            .find(|path| path.exists())
            .map_or(ConfigSource::Default, ConfigSource::File)
    }

    fn apply_env(&self, config: &mut Config) -> Result<(), ConfigLoadError> {
        if let Some(dir) = non_empty(&self.env, DATA_DIR_VAR) {
            config.store.data_dir = PathBuf::from(dir);
        }
        if let Some(key) = non_empty(&self.env, STORE_KEY_VAR) {
            config.store.key = key.to_string();
        }
        if let Some(raw) = non_empty(&self.env, RECONCILE_VAR) {
            config.reconcile =
                parse_bool(raw).ok_or_else(|| ConfigLoadError::InvalidBool {
                    var: RECONCILE_VAR,
                    value: raw.to_string(),
                })?;
        }
        if let Some(api_key) = non_empty(&self.env, TMDB_API_KEY_VAR) {
            config.tmdb.api_key = Some(api_key.to_string());
        }
        if let Some(raw) = non_empty(&self.env, TMDB_BASE_URL_VAR) {
            let url = Url::parse(raw).map_err(|source| {
                ConfigLoadError::InvalidUrl {
                    var: TMDB_BASE_URL_VAR,
                    source,
                }
            })?;
            config.tmdb.base_url = Some(url);
        }
        if let Some(language) = non_empty(&self.env, TMDB_LANG_VAR) {
            config.tmdb.language = Some(language.to_string());
        }
        Ok(())
    }
}

/// Parse a TOML or JSON config file, picking the format by extension.
///
/// Files without a known extension are tried as TOML, then as JSON.
pub fn load_from_file(path: &Path) -> Result<Config, ConfigLoadError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigLoadError::FileIo {
            path: path.to_path_buf(),
            source,
        })?;

    let parsed = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => {
            serde_json::from_str(&contents).map_err(|err| anyhow!(err))
        }
        Some("toml") | Some("tml") => {
            toml::from_str(&contents).map_err(|err| anyhow!(err))
        }
        _ => parse_from_str(&contents),
    };

    parsed.map_err(|source| ConfigLoadError::InvalidFile {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_from_str(contents: &str) -> anyhow::Result<Config> {
    toml::from_str(contents).or_else(|toml_err| {
        serde_json::from_str(contents).map_err(|json_err| {
            anyhow!("toml error: {toml_err}; json error: {json_err}")
        })
    })
}

fn validate_store_key(key: &str) -> Result<(), ConfigLoadError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ConfigLoadError::InvalidStoreKey(key.to_string()))
    }
}
