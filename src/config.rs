//! Application configuration for the `story_worker` binary.
//!
//! The configuration is one JSON document:
//!
//! ```json
//! {
//!   "database_url": "/var/lib/storyloom/stories.db",
//!   "coordinator_url": "http://coordinator.internal:8080",
//!   "evaluator_url": "http://reviewer.internal:9000/evaluate",
//!   "worker": {
//!     "worker_id": "review-1",
//!     "task_types": ["story_review"]
//!   },
//!   "thresholds": { "title_review": 85 }
//! }
//! ```
//!
//! Omitted tuning fields fall back to the documented defaults.

use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::story::domain::AcceptanceThresholds;
use crate::worker::config::{WorkerConfig, WorkerConfigError, WorkerSettings};

/// Default number of pooled database connections.
pub const DEFAULT_POOL_SIZE: u32 = 4;
/// Default coordinator request timeout in seconds.
pub const DEFAULT_COORDINATOR_TIMEOUT_SECS: u64 = 30;
/// Default evaluator request timeout in seconds.
pub const DEFAULT_EVALUATOR_TIMEOUT_SECS: u64 = 60;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The worker section is invalid.
    #[error("invalid worker settings: {0}")]
    Worker(#[from] WorkerConfigError),
}

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// `SQLite` database path or URL.
    pub database_url: String,
    /// Maximum pooled database connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    /// Base URL of the task coordination service.
    pub coordinator_url: String,
    /// Coordinator request timeout in seconds.
    #[serde(default = "default_coordinator_timeout_secs")]
    pub coordinator_timeout_secs: u64,
    /// Endpoint of the remote content evaluator.
    pub evaluator_url: String,
    /// Evaluator request timeout in seconds.
    #[serde(default = "default_evaluator_timeout_secs")]
    pub evaluator_timeout_secs: u64,
    /// Worker identity, task types, and backoff tuning.
    pub worker: WorkerSettings,
    /// Per-stage acceptance thresholds.
    #[serde(default)]
    pub thresholds: AcceptanceThresholds,
}

const fn default_pool_size() -> u32 {
    DEFAULT_POOL_SIZE
}

const fn default_coordinator_timeout_secs() -> u64 {
    DEFAULT_COORDINATOR_TIMEOUT_SECS
}

const fn default_evaluator_timeout_secs() -> u64 {
    DEFAULT_EVALUATOR_TIMEOUT_SECS
}

impl AppConfig {
    /// Reads and parses the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it is not valid configuration.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = read_config_file(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Parses configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when `json` is not valid configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validates the worker section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Worker`] when the worker settings are invalid.
    pub fn worker_config(&self) -> Result<WorkerConfig, ConfigError> {
        Ok(WorkerConfig::try_from(self.worker.clone())?)
    }

    /// Returns the coordinator request timeout.
    #[must_use]
    pub const fn coordinator_timeout(&self) -> Duration {
        Duration::from_secs(self.coordinator_timeout_secs)
    }

    /// Returns the evaluator request timeout.
    #[must_use]
    pub const fn evaluator_timeout(&self) -> Duration {
        Duration::from_secs(self.evaluator_timeout_secs)
    }
}

fn read_config_file(path: &Utf8Path) -> std::io::Result<String> {
    let file_name = path
        .file_name()
        .ok_or_else(|| std::io::Error::other("config path must include a file name"))?;
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let dir = Dir::open_ambient_dir(parent, ambient_authority())?;
    dir.read_to_string(file_name)
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, DEFAULT_POOL_SIZE};
    use crate::story::domain::{Score, StoryState};
    use camino::Utf8PathBuf;
    use eyre::{OptionExt, ensure};
    use rstest::rstest;
    use std::time::Duration;

    const MINIMAL: &str = r#"{
        "database_url": "stories.db",
        "coordinator_url": "http://localhost:8080",
        "evaluator_url": "http://localhost:9000/evaluate",
        "worker": { "worker_id": "review-1", "task_types": ["story_review"] }
    }"#;

    #[rstest]
    fn minimal_config_uses_defaults() -> eyre::Result<()> {
        let config = AppConfig::from_json(MINIMAL)?;

        ensure!(config.pool_size == DEFAULT_POOL_SIZE);
        ensure!(config.coordinator_timeout() == Duration::from_secs(30));
        ensure!(config.evaluator_timeout() == Duration::from_secs(60));
        ensure!(config.thresholds.for_stage(StoryState::TitleReview) == Some(Score::clamped(70)));
        let worker = config.worker_config()?;
        ensure!(worker.worker_id().as_str() == "review-1");
        Ok(())
    }

    #[rstest]
    fn partial_thresholds_keep_other_defaults() -> eyre::Result<()> {
        let json = MINIMAL.replacen(
            r#""database_url""#,
            r#""thresholds": { "title_review": 85 }, "database_url""#,
            1,
        );

        let config = AppConfig::from_json(&json)?;

        ensure!(config.thresholds.for_stage(StoryState::TitleReview) == Some(Score::clamped(85)));
        ensure!(config.thresholds.for_stage(StoryState::ExpertReview) == Some(Score::clamped(70)));
        Ok(())
    }

    #[rstest]
    fn out_of_range_threshold_is_a_parse_error() {
        let json = MINIMAL.replacen(
            r#""database_url""#,
            r#""thresholds": { "script_review": 101 }, "database_url""#,
            1,
        );

        assert!(matches!(AppConfig::from_json(&json), Err(ConfigError::Parse(_))));
    }

    #[rstest]
    fn invalid_worker_section_is_reported() -> eyre::Result<()> {
        let json = MINIMAL.replace(r#"["story_review"]"#, "[]");
        let config = AppConfig::from_json(&json)?;

        ensure!(matches!(config.worker_config(), Err(ConfigError::Worker(_))));
        Ok(())
    }

    #[rstest]
    fn load_reads_the_file_through_its_parent_directory() -> eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = Utf8PathBuf::from_path_buf(dir.path().join("storyloom.json"))
            .ok()
            .ok_or_eyre("temp path is not UTF-8")?;
        std::fs::write(&path, MINIMAL)?;

        let config = AppConfig::load(&path)?;

        ensure!(config.database_url == "stories.db");
        Ok(())
    }

    #[rstest]
    fn missing_file_is_a_read_error() -> eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = Utf8PathBuf::from_path_buf(dir.path().join("absent.json"))
            .ok()
            .ok_or_eyre("temp path is not UTF-8")?;

        ensure!(matches!(AppConfig::load(&path), Err(ConfigError::Read { .. })));
        Ok(())
    }
}
