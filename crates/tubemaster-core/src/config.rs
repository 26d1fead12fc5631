//! Application configuration.
//!
//! Sources, later wins:
//! 1. built-in defaults
//! 2. JSON file (`--config`, or `<config dir>/config.json` when present)
//! 3. `TUBEMASTER_*` environment variables

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_LOG_FILTER: &str = "tubemaster=info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("could not determine a home directory for application data")]
    NoHomeDir,
}

/// Gemini endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    /// Per-request HTTP timeout. Unset means no timeout.
    pub timeout_secs: Option<u64>,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            text_model: "gemini-2.5-flash".to_string(),
            image_model: "imagen-4.0-generate-001".to_string(),
            timeout_secs: None,
        }
    }
}

impl GeminiSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Planner timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerSettings {
    /// Auto-pilot tick period.
    pub poll_interval_ms: u64,
    /// Pause between optimize and upload on a manual run.
    pub manual_cooldown_ms: u64,
    /// Simulated upload duration.
    pub publish_delay_ms: u64,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            manual_cooldown_ms: 1000,
            publish_delay_ms: 1500,
        }
    }
}

impl PlannerSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn manual_cooldown(&self) -> Duration {
        Duration::from_millis(self.manual_cooldown_ms)
    }

    pub fn publish_delay(&self) -> Duration {
        Duration::from_millis(self.publish_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where the key-value files live. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    pub log_filter: Option<String>,
    pub planner: PlannerSettings,
    pub gemini: GeminiSettings,
}

impl AppConfig {
    /// Defaults, then `path` (or the default config file if it exists), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        let mut config = match file {
            Some(p) => {
                let config = Self::from_file(&p)?;
                tracing::info!(path = %p.display(), "loaded configuration");
                config
            }
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overrides from `TUBEMASTER_*` variables, read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TUBEMASTER_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("TUBEMASTER_LOG") {
            self.log_filter = Some(v);
        }
        if let Some(v) = lookup("TUBEMASTER_GEMINI_BASE_URL") {
            self.gemini.base_url = v;
        }
        if let Some(v) = lookup("TUBEMASTER_GEMINI_MODEL") {
            self.gemini.text_model = v;
        }
        if let Some(v) = lookup("TUBEMASTER_IMAGE_MODEL") {
            self.gemini.image_model = v;
        }
        if let Some(v) = lookup("TUBEMASTER_HTTP_TIMEOUT_SECS") {
            self.gemini.timeout_secs = Some(parse_env("TUBEMASTER_HTTP_TIMEOUT_SECS", v)?);
        }
        if let Some(v) = lookup("TUBEMASTER_POLL_INTERVAL_MS") {
            self.planner.poll_interval_ms = parse_env("TUBEMASTER_POLL_INTERVAL_MS", v)?;
        }
        Ok(())
    }

    /// Configured data dir, or the platform default.
    pub fn resolve_data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => project_dirs()
                .map(|d| d.data_dir().to_path_buf())
                .ok_or(ConfigError::NoHomeDir),
        }
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

fn parse_env(var: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "tubemaster", "tubemaster")
}

/// `<config dir>/config.json` for this platform.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_the_planner_timings() {
        let config = AppConfig::default();
        assert_eq!(config.planner.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.planner.manual_cooldown(), Duration::from_secs(1));
        assert_eq!(config.planner.publish_delay(), Duration::from_millis(1500));
        assert_eq!(config.gemini.text_model, "gemini-2.5-flash");
        assert_eq!(config.gemini.timeout(), None);
        assert_eq!(config.log_filter(), "tubemaster=info");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"planner":{"poll_interval_ms":500},"gemini":{"timeout_secs":30}}"#)
            .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.planner.poll_interval_ms, 500);
        assert_eq!(config.planner.publish_delay_ms, 1500);
        assert_eq!(config.gemini.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.gemini.image_model, "imagen-4.0-generate-001");
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TUBEMASTER_DATA_DIR", "/tmp/tm"),
            ("TUBEMASTER_POLL_INTERVAL_MS", "250"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.resolve_data_dir().unwrap(), PathBuf::from("/tmp/tm"));
        assert_eq!(config.planner.poll_interval_ms, 250);
    }

    #[test]
    fn bad_env_number_is_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(|k| (k == "TUBEMASTER_HTTP_TIMEOUT_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn unreadable_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{").unwrap();
        assert!(matches!(
            AppConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
