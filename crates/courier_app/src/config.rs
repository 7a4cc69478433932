//! Application configuration, stored as RON.
//!
//! Runtime credentials are not part of this file; they live in the key-value
//! store and are edited with `courier configure`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use courier_core::{MutationClassifier, ScheduleConfig};
use courier_engine::{FetchSettings, HostProfile};
use serde::{Deserialize, Serialize};

use crate::logging::LogDestination;

pub const CONFIG_ENV: &str = "COURIER_CONFIG";
const APP_DIR: &str = "pdf-courier";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub destination: LogDestination,
    /// `error`, `warn`, `info`, `debug` or `trace`.
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            destination: LogDestination::Terminal,
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// JSON key-value store; defaults to the platform data directory.
    pub store_path: Option<PathBuf>,
    pub log: LogConfig,
    pub fetch: FetchSettings,
    pub schedule: ScheduleConfig,
    pub classifier: MutationClassifier,
    pub profile: HostProfile,
    /// How often `courier watch` re-reads the snapshot file.
    pub watch_poll_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            log: LogConfig::default(),
            fetch: FetchSettings::default(),
            schedule: ScheduleConfig::default(),
            classifier: MutationClassifier::default(),
            profile: HostProfile::default(),
            watch_poll_ms: 250,
        }
    }
}

impl AppConfig {
    pub fn store_path(&self) -> PathBuf {
        self.store_path.clone().unwrap_or_else(|| data_dir().join("store.json"))
    }

    pub fn log_file(&self) -> PathBuf {
        self.log.file.clone().unwrap_or_else(|| data_dir().join("courier.log"))
    }
}

/// `$COURIER_CONFIG`, else `<config dir>/pdf-courier/config.ron`.
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.ron"))
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// A missing file yields the defaults; a malformed one is an error.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(AppConfig::default()),
        Err(err) => return Err(err).with_context(|| format!("reading {}", path.display())),
    };
    ron::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

pub fn save_config(path: &Path, config: &AppConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = ron::ser::to_string_pretty(config, ron::ser::PrettyConfig::new())?;
    fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_config(Some(&temp.path().join("absent.ron"))).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.schedule.attachment_debounce_ms, 500);
        assert_eq!(config.schedule.list_debounce_ms, 1_500);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ron");
        fs::write(
            &path,
            r#"(store_path: Some("/tmp/courier.json"), schedule: (periodic_ms: 60000))"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.store_path(), PathBuf::from("/tmp/courier.json"));
        assert_eq!(config.schedule.periodic_ms, 60_000);
        assert_eq!(config.schedule.navigation_settle_ms, 800);
        assert_eq!(config.fetch, FetchSettings::default());
    }

    #[test]
    fn saved_config_loads_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ron");
        let mut config = AppConfig::default();
        config.log.level = "debug".to_string();
        config.log.destination = LogDestination::Both;

        save_config(&path, &config).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), config);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ron");
        fs::write(&path, "(store_path: 12").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
