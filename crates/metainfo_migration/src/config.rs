//! Configuration for migration runs.
//!
//! Settings are read from a TOML file; every section is optional.
//!
//! ```toml
//! [pointerdb]
//! path = "pointerdb"
//!
//! [metabase]
//! path = "metabase.db"
//!
//! [migration]
//! batch_size = 500
//! list_limit = 1000
//! timeout_secs = 3600
//!
//! [[buckets]]
//! project_id = "6b3e1c5a-84f2-4d1e-9a0b-2c3d4e5f6071"
//! name = "photos"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use metainfo_pointerdb::DEFAULT_LIST_LIMIT;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::batch::{DEFAULT_BATCH_SIZE, max_batch_size};
use crate::error::{MigrationError, MigrationResult};

/// File name looked up in the working directory and the user config dir.
pub const CONFIG_FILE_NAME: &str = "metainfo-migration.toml";

/// Configuration-specific errors
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid value for field {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationConfig {
    #[serde(default)]
    pub pointerdb: PointerDbConfig,

    #[serde(default)]
    pub metabase: MetabaseConfig,

    #[serde(default)]
    pub migration: RunConfig,

    /// Buckets migrated by `run` when no project is given on the command line.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buckets: Vec<BucketConfig>,
}

/// Legacy pointer store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerDbConfig {
    pub path: PathBuf,
}

impl Default for PointerDbConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("pointerdb"),
        }
    }
}

/// Destination metabase location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetabaseConfig {
    pub path: PathBuf,
}

impl Default for MetabaseConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("metabase.db"),
        }
    }
}

/// Tuning of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Rows per insert statement.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Keys per listing page.
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,

    /// Deadline for each bucket, unlimited when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl RunConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            list_limit: default_list_limit(),
            timeout_secs: None,
        }
    }
}

/// One bucket to migrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    pub project_id: Uuid,
    pub name: String,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_list_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("metainfo-migration")
}

impl MigrationConfig {
    /// Check values that would otherwise fail deep inside a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.migration.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "migration.batch_size".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.migration.batch_size > max_batch_size() {
            return Err(ConfigError::InvalidValue {
                field: "migration.batch_size".to_string(),
                reason: format!(
                    "{} rows exceed the {} rows one insert statement can hold",
                    self.migration.batch_size,
                    max_batch_size()
                ),
            });
        }
        if self.migration.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "migration.timeout_secs".to_string(),
                reason: "must be greater than zero when set".to_string(),
            });
        }
        if let Some(bucket) = self.buckets.iter().find(|b| b.name.is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "buckets.name".to_string(),
                reason: format!("empty bucket name for project {}", bucket.project_id),
            });
        }
        Ok(())
    }
}

/// Resolve a path relative to a base directory
/// If the path is absolute, return it as-is
fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Load and validate a configuration file.
///
/// Relative store paths are resolved against the file's directory.
pub async fn load_config(path: &Path) -> MigrationResult<MigrationConfig> {
    let config_error = |cause: ConfigError| MigrationError::Config {
        config_path: path.display().to_string(),
        cause,
    };

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| config_error(ConfigError::Io(e.to_string())))?;

    let mut config: MigrationConfig = toml::from_str(&content)
        .map_err(|e| config_error(ConfigError::TomlParse(e.to_string())))?;

    let base_dir = path.parent().unwrap_or(Path::new("."));
    config.pointerdb.path = resolve_path(base_dir, &config.pointerdb.path);
    config.metabase.path = resolve_path(base_dir, &config.metabase.path);

    config.validate().map_err(config_error)?;
    Ok(config)
}

/// Load the first configuration file found in the working directory or the
/// user config directory, falling back to defaults.
pub async fn load_config_from_standard_locations() -> MigrationResult<MigrationConfig> {
    let candidates = [
        Some(PathBuf::from(CONFIG_FILE_NAME)),
        dirs::config_dir().map(|dir| dir.join("metainfo-migration").join(CONFIG_FILE_NAME)),
    ];

    for path in candidates.into_iter().flatten() {
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!("Loading config from: {}", path.display());
            return load_config(&path).await;
        }
    }

    tracing::info!("No config file found, using defaults");
    Ok(MigrationConfig::default())
}
