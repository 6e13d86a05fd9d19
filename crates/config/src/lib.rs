//! Layered configuration.
//!
//! Sources are merged in this order, later sources winning:
//! 1. built-in defaults,
//! 2. a configuration file: the explicit one given on the command line
//!    (TOML, YAML or JSON by extension) or `config.toml` in the platform
//!    configuration directory,
//! 3. environment variables prefixed with `SNAPSHELF_`, using `__` to
//!    separate nested keys (`SNAPSHELF_LISTING__CASE_SENSITIVE=false`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "SNAPSHELF_";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "catalog.sqlite";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub listing: ListingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Location of the catalog; defaults to the platform data directory.
    pub path: Option<PathBuf>,
    /// Treat the catalog as absent, even if the file exists.
    pub disabled: bool,
    pub max_connections: u32,
}
impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            disabled: false,
            max_connections: 5,
        }
    }
}
impl DatabaseConfig {
    /// The configured path, or the default one in the platform data directory.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let dirs = project_dirs().ok_or_raise(|| ErrorKind::NoHomeDirectory)?;
        Ok(dirs.data_dir().join(DATABASE_FILE))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// How closely a requested time must match a fileset timestamp.
    pub time_granularity: TimeGranularity,
    /// Whether folder strings must match the recorded case exactly.
    pub case_sensitive: bool,
    /// Page size used when the caller does not ask for one.
    pub default_limit: u32,
}
impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            time_granularity: TimeGranularity::default(),
            case_sensitive: true,
            default_limit: 100,
        }
    }
}

/// Width of the window in which two timestamps count as the same time.
///
/// Windows are aligned to the unix epoch, so `Day` means a UTC calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeGranularity {
    #[default]
    Second,
    Minute,
    Hour,
    Day,
}
impl TimeGranularity {
    pub fn seconds(&self) -> i64 {
        match self {
            Self::Second => 1,
            Self::Minute => 60,
            Self::Hour => 60 * 60,
            Self::Day => 24 * 60 * 60,
        }
    }
}

impl Config {
    /// Build the layered [`Figment`] without extracting it.
    ///
    /// An explicit `file` must exist; the default file is optional.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let figment = match file {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::Invalid(format!("config file not found: {}", path.display())));
                }
                match path.extension().and_then(|ext| ext.to_str()) {
                    Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
                    Some("json") => figment.merge(Json::file_exact(path)),
                    _ => figment.merge(Toml::file_exact(path)),
                }
            },
            None => match project_dirs() {
                Some(dirs) => figment.merge(Toml::file_exact(dirs.config_dir().join(CONFIG_FILE))),
                None => figment,
            },
        };
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load and validate the configuration.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(file)?)
    }

    /// Extract and validate a configuration from any [`Figment`].
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            exn::bail!(ErrorKind::Invalid("database.max_connections must be at least 1".to_string()));
        }
        if self.listing.default_limit == 0 {
            exn::bail!(ErrorKind::Invalid("listing.default_limit must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "snapshelf")
}
