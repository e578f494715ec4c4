//! Reconciler configuration loaded from `~/.wmstate/config.toml`.
//!
//! Every field has a default, so a missing file or an empty table is valid.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, StateError};
use crate::types::px_from_dp;

const DEFAULT_CONFIG_RELATIVE_PATH: &str = ".wmstate/config.toml";

/// How one bounded polling loop retries.
///
/// Each loop has its own defaults, so a table in the file only overrides the
/// keys it names (see [`PollOverrides`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollConfig {
    /// Total attempts, including the first.
    pub attempts: u32,
    pub interval_ms: u64,
    /// Added to the interval after every failed attempt.
    pub step_ms: u64,
    /// Upper bound for the grown interval; unbounded when absent.
    pub max_interval_ms: Option<u64>,
}

impl PollConfig {
    pub fn fixed(attempts: u32, interval_ms: u64) -> Self {
        Self {
            attempts,
            interval_ms,
            step_ms: 0,
            max_interval_ms: None,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// A `[wait]`-style table as written; absent keys keep the loop's default.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PollOverrides {
    attempts: Option<u32>,
    interval_ms: Option<u64>,
    step_ms: Option<u64>,
    max_interval_ms: Option<u64>,
}

impl PollOverrides {
    fn apply(self, base: PollConfig) -> PollConfig {
        PollConfig {
            attempts: self.attempts.unwrap_or(base.attempts),
            interval_ms: self.interval_ms.unwrap_or(base.interval_ms),
            step_ms: self.step_ms.unwrap_or(base.step_ms),
            max_interval_ms: self.max_interval_ms.or(base.max_interval_ms),
        }
    }
}

fn wait_poll<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<PollConfig, D::Error> {
    Ok(PollOverrides::deserialize(deserializer)?.apply(default_wait_poll()))
}

fn liveness_poll<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<PollConfig, D::Error> {
    Ok(PollOverrides::deserialize(deserializer)?.apply(default_liveness_poll()))
}

fn stopped_poll<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<PollConfig, D::Error> {
    Ok(PollOverrides::deserialize(deserializer)?.apply(default_stopped_poll()))
}

fn default_wait_poll() -> PollConfig {
    PollConfig::fixed(5, 1000)
}

fn default_liveness_poll() -> PollConfig {
    PollConfig::fixed(4, 500)
}

fn default_stopped_poll() -> PollConfig {
    PollConfig::fixed(5, 1500)
}

/// Default minimum task sizes, in dp, used when a task reports none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct MinSizeConfig {
    #[serde(default = "default_resizeable_task_dp")]
    pub resizeable_task_dp: i32,
    #[serde(default = "default_pinned_task_dp")]
    pub pinned_task_dp: i32,
}

impl Default for MinSizeConfig {
    fn default() -> Self {
        Self {
            resizeable_task_dp: default_resizeable_task_dp(),
            pinned_task_dp: default_pinned_task_dp(),
        }
    }
}

impl MinSizeConfig {
    pub fn resizeable_task_px(&self, density_dpi: i32) -> i32 {
        px_from_dp(self.resizeable_task_dp, density_dpi)
    }

    pub fn pinned_task_px(&self, density_dpi: i32) -> i32 {
        px_from_dp(self.pinned_task_dp, density_dpi)
    }
}

fn default_resizeable_task_dp() -> i32 {
    220
}

fn default_pinned_task_dp() -> i32 {
    108
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReconcilerConfig {
    /// Outer loop of `wait_for_valid_state` and the named waits.
    #[serde(default = "default_wait_poll", deserialize_with = "wait_poll")]
    pub wait: PollConfig,
    /// Re-fetch loop run while a single dump looks unsettled.
    #[serde(default = "default_liveness_poll", deserialize_with = "liveness_poll")]
    pub liveness: PollConfig,
    /// Loop used while waiting for every activity to stop.
    #[serde(default = "default_stopped_poll", deserialize_with = "stopped_poll")]
    pub stopped: PollConfig,
    #[serde(default)]
    pub min_size: MinSizeConfig,
    /// Package used to expand short activity names.
    #[serde(default)]
    pub package_name: Option<String>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            wait: default_wait_poll(),
            liveness: default_liveness_poll(),
            stopped: default_stopped_poll(),
            min_size: MinSizeConfig::default(),
            package_name: None,
        }
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(StateError::HomeDirNotFound)?;
    Ok(home.join(DEFAULT_CONFIG_RELATIVE_PATH))
}

/// Loads the configuration, falling back to defaults when the file is absent.
pub fn load_config(path: Option<PathBuf>) -> Result<ReconcilerConfig> {
    let config_path = match path {
        Some(path) => path,
        None => default_config_path()?,
    };

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "no config file, using defaults");
        return Ok(ReconcilerConfig::default());
    }

    // fs_err already names the path in its message.
    let content = fs_err::read_to_string(&config_path).map_err(|source| StateError::Io {
        context: "reading config".to_string(),
        source,
    })?;
    toml::from_str::<ReconcilerConfig>(&content).map_err(|err| StateError::ConfigMalformed {
        path: config_path,
        details: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_config_defaults_when_file_missing() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("missing.toml");
        let config = load_config(Some(path)).expect("load config");
        assert_eq!(config, ReconcilerConfig::default());
        assert_eq!(config.wait.attempts, 5);
        assert_eq!(config.wait.interval(), Duration::from_millis(1000));
        assert_eq!(config.liveness.attempts, 4);
        assert_eq!(config.min_size.resizeable_task_dp, 220);
        assert_eq!(config.min_size.pinned_task_dp, 108);
    }

    #[test]
    fn load_config_reads_partial_tables() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(
            &path,
            r#"
package_name = "com.example.app"

[wait]
attempts = 8
interval_ms = 250
step_ms = 250
max_interval_ms = 1000

[min_size]
pinned_task_dp = 96
"#,
        )
        .expect("write config");

        let config = load_config(Some(path)).expect("load config");
        assert_eq!(config.package_name.as_deref(), Some("com.example.app"));
        assert_eq!(config.wait.attempts, 8);
        assert_eq!(config.wait.step_ms, 250);
        assert_eq!(config.wait.max_interval_ms, Some(1000));
        assert_eq!(config.liveness, default_liveness_poll());
        assert_eq!(config.min_size.pinned_task_dp, 96);
        assert_eq!(config.min_size.resizeable_task_dp, 220);
    }

    #[test]
    fn load_config_keeps_defaults_for_missing_poll_keys() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(&path, "[wait]\nattempts = 10\n\n[stopped]\ninterval_ms = 2000\n")
            .expect("write config");

        let config = load_config(Some(path)).expect("load config");
        assert_eq!(config.wait, PollConfig::fixed(10, 1000));
        assert_eq!(config.liveness, default_liveness_poll());
        assert_eq!(config.stopped, PollConfig::fixed(5, 2000));
    }

    #[test]
    fn load_config_rejects_unknown_poll_keys() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(&path, "[liveness]\nretries = 3\n").expect("write config");
        assert!(matches!(
            load_config(Some(path)),
            Err(StateError::ConfigMalformed { .. })
        ));
    }

    #[test]
    fn load_config_reports_malformed_file() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(&path, "[wait]\nattempts = \"many\"\n").expect("write config");

        let err = load_config(Some(path.clone())).expect_err("malformed config");
        let message = err.to_string();
        assert_eq!(message.matches("config.toml").count(), 1, "{message}");
        match err {
            StateError::ConfigMalformed { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn min_size_scales_with_density() {
        let min_size = MinSizeConfig::default();
        assert_eq!(min_size.resizeable_task_px(320), 440);
        assert_eq!(min_size.pinned_task_px(240), 162);
    }
}
