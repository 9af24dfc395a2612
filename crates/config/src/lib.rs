//! Layered configuration for hashscan.
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. `hashscan.toml`, `hashscan.yaml` and `hashscan.json` in the user's
//!    config directory, if present.
//! 3. An explicit config file, format chosen by extension.
//! 4. `HASHSCAN_*` environment variables (`HASHSCAN_WORKERS=8`). Only
//!    variables naming a [`Config`] field are read; unknown keys in files
//!    are still rejected.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APPLICATION: &str = "hashscan";
const ENV_PREFIX: &str = "HASHSCAN_";
const ENV_KEYS: [&str; 8] = [
    "database",
    "workers",
    "perceptual_hash",
    "verify_archive_integrity",
    "disallowed_roots",
    "poll_interval_ms",
    "queue_capacity",
    "log_level",
];

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APPLICATION)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// SQLite catalog location.
    pub database: PathBuf,
    /// Number of scan workers.
    pub workers: usize,
    /// Compute perceptual hashes for plain files and container entries.
    pub perceptual_hash: bool,
    /// Re-hash already cataloged containers to detect changes.
    pub verify_archive_integrity: bool,
    /// Paths under these roots are refused.
    pub disallowed_roots: Vec<PathBuf>,
    /// How long an idle worker waits for a task, in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum number of discovered files waiting for a worker.
    pub queue_capacity: usize,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let database = project_dirs()
            .map(|dirs| dirs.data_dir().join("catalog.sqlite"))
            .unwrap_or_else(|| PathBuf::from("catalog.sqlite"));
        Self {
            database,
            workers: std::thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1),
            perceptual_hash: true,
            verify_archive_integrity: true,
            disallowed_roots: vec![PathBuf::from("/content")],
            poll_interval_ms: 500,
            queue_capacity: 1024,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from every source, with an optional explicit config file.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_dir = project_dirs().map(|dirs| dirs.config_dir().to_path_buf());
        Self::from_figment(Self::figment(config_dir.as_deref(), explicit, true)?)
    }

    /// Build the layered provider chain.
    ///
    /// `config_dir` is searched for `hashscan.{toml,yaml,json}`; missing files
    /// there are ignored, but a missing `explicit` file is an error.
    pub fn figment(config_dir: Option<&Path>, explicit: Option<&Path>, env: bool) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(dir) = config_dir {
            figment = figment
                .merge(Toml::file(dir.join("hashscan.toml")))
                .merge(Yaml::file(dir.join("hashscan.yaml")))
                .merge(Json::file(dir.join("hashscan.json")));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.display().to_string()));
            }
            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_ascii_lowercase();
            figment = match extension.as_str() {
                "toml" => figment.merge(Toml::file(path)),
                "yaml" | "yml" => figment.merge(Yaml::file(path)),
                "json" => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.display().to_string())),
            };
        }
        if env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).only(&ENV_KEYS));
        }
        Ok(figment)
    }

    /// Extract and validate settings from a provider chain.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()
    }

    /// Reject settings the scanner cannot run with.
    pub fn validate(self) -> Result<Self> {
        if self.database.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("database"));
        }
        if self.workers == 0 {
            exn::bail!(ErrorKind::Invalid("workers"));
        }
        if self.poll_interval_ms == 0 {
            exn::bail!(ErrorKind::Invalid("poll_interval_ms"));
        }
        if self.queue_capacity == 0 {
            exn::bail!(ErrorKind::Invalid("queue_capacity"));
        }
        if self.log_level.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("log_level"));
        }
        tracing::trace!(config = ?self, "Configuration loaded");
        Ok(self)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
