//! Configuration types for botload

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Scratch storage configuration (temp tree, database, default TTL)
///
/// Groups settings for where task artifacts live and how long they survive.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the per-user scratch tree (default: "./temp")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// SQLite database path (default: "./botload.db")
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Minutes before a registered temp resource becomes sweepable (default: 30)
    #[serde(default = "default_ttl_minutes")]
    pub default_ttl_minutes: i64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            db_path: default_db_path(),
            default_ttl_minutes: default_ttl_minutes(),
        }
    }
}

/// Sweeper loop configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Seconds between sweep passes (default: 300)
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
}

impl SweeperConfig {
    /// Interval between sweep passes as a [`Duration`]
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// HTTP fetch configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds (None = no timeout, matching
    /// long-running large downloads)
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl HttpConfig {
    /// Request timeout as a [`Duration`], if configured
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Progress reporting configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Minimum milliseconds between progress emissions for one transfer
    /// (default: 1000); completion always emits regardless
    #[serde(default = "default_progress_interval_ms")]
    pub min_interval_ms: u64,
}

impl ProgressConfig {
    /// Minimum interval between emissions as a [`Duration`]
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_progress_interval_ms(),
        }
    }
}

/// External tool paths
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ToolsConfig {
    /// Path to ffmpeg executable (auto-detected via PATH if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,
}

/// Root configuration for the task engine
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    /// Scratch storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Sweeper loop settings
    #[serde(default)]
    pub sweeper: SweeperConfig,

    /// HTTP fetch settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Progress reporting settings
    #[serde(default)]
    pub progress: ProgressConfig,

    /// External tool settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./temp")
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./botload.db")
}

fn default_ttl_minutes() -> i64 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_progress_interval_ms() -> u64 {
    1000
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.storage.default_ttl_minutes, 30);
        assert_eq!(config.sweeper.interval(), Duration::from_secs(300));
        assert_eq!(config.http.request_timeout(), None);
        assert_eq!(config.progress.min_interval(), Duration::from_millis(1000));
        assert!(config.tools.ffmpeg_path.is_none());
    }

    #[test]
    fn empty_json_deserializes_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.storage.temp_dir, PathBuf::from("./temp"));
        assert_eq!(config.sweeper.interval_secs, 300);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"storage": {"default_ttl_minutes": 5}}"#).unwrap();
        assert_eq!(config.storage.default_ttl_minutes, 5);
        assert_eq!(config.storage.temp_dir, PathBuf::from("./temp"));
    }
}
