//! Layered configuration.
//!
//! Sources, later ones winning:
//! 1. built-in defaults,
//! 2. a config file, either given explicitly or found in the platform config
//!    directory as `airlog/config.{toml,yaml,yml,json}`,
//! 3. `AIRLOG_`-prefixed environment variables, nested with `__`
//!    (`AIRLOG_ARCHIVES__GROUPED__ROOT=/srv/rec`).

pub mod error;

use crate::error::{ErrorKind, Result};
use airlog_timekey::{DEFAULT_EXTENSION, Validation};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Toml, Yaml};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "AIRLOG_";
pub const DEFAULT_ARCHIVE: &str = "grouped";
pub const DEFAULT_ROOT: &str = "/mnt/recordings/grouped";
pub const DEFAULT_PORT: u16 = 5000;

const FILE_STEM: &str = "config";
const FILE_EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Address the HTTP server binds to.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Archive used when a request doesn't name one.
    #[serde(default = "default_archive")]
    pub default_archive: String,
    #[serde(default = "default_archives")]
    pub archives: BTreeMap<String, ArchiveConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArchiveConfig {
    /// Absolute path of the archive root, `<root>/<station>/<recording>`.
    pub root: PathBuf,
    /// Recording extension, without the leading dot.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Seconds a station listing may be reused for. Unset disables caching.
    #[serde(default)]
    pub cache_ttl: Option<u64>,
    #[serde(default)]
    pub validation: Validation,
}
impl ArchiveConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: default_extension(),
            cache_ttl: None,
            validation: Validation::default(),
        }
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl.map(Duration::from_secs)
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT))
}

fn default_archive() -> String {
    DEFAULT_ARCHIVE.to_string()
}

fn default_archives() -> BTreeMap<String, ArchiveConfig> {
    BTreeMap::from([(DEFAULT_ARCHIVE.to_string(), ArchiveConfig::new(DEFAULT_ROOT))])
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            default_archive: default_archive(),
            archives: default_archives(),
        }
    }
}

/// Config file in the platform config directory, if one exists.
pub fn default_config_file() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", "airlog")?;
    FILE_EXTENSIONS
        .iter()
        .map(|ext| dirs.config_dir().join(FILE_STEM).with_extension(ext))
        .find(|path| path.is_file())
}

impl Config {
    /// Assemble every configuration source without extracting anything.
    ///
    /// An explicit `path` must exist and have a recognised extension; without
    /// one, the platform config file is used when present.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::new();
        let file = match path {
            Some(path) if !path.is_file() => {
                exn::bail!(ErrorKind::Load(format!("config file {} does not exist", path.display())));
            },
            Some(path) => Some(path.to_path_buf()),
            None => default_config_file(),
        };
        if let Some(file) = file {
            tracing::debug!(path = %file.display(), "Loading configuration file");
            figment = match file.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file(&file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(&file)),
                Some("json") => figment.merge(Json::file(&file)),
                _ => exn::bail!(ErrorKind::Load(format!(
                    "unsupported config file format: {}",
                    file.display()
                ))),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load and validate the configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(path)?)
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(|e| ErrorKind::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.archives.is_empty() {
            exn::bail!(ErrorKind::Invalid("no archives configured".to_string()));
        }
        if !self.archives.contains_key(&self.default_archive) {
            exn::bail!(ErrorKind::Invalid(format!(
                "default archive {:?} is not configured",
                self.default_archive
            )));
        }
        for (name, archive) in &self.archives {
            if !archive.root.is_absolute() {
                exn::bail!(ErrorKind::Invalid(format!(
                    "archive {name:?}: root {} must be absolute",
                    archive.root.display()
                )));
            }
            let ext = archive.extension.as_str();
            if ext.is_empty() || ext.starts_with('.') || ext.contains(['/', '\\']) {
                exn::bail!(ErrorKind::Invalid(format!("archive {name:?}: invalid extension {ext:?}")));
            }
        }
        Ok(())
    }
}
