//! Runtime configuration loaded from `~/.courier/config.yaml`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    CONFIG_FILE, DATA_DIR_NAME, DEFAULT_DEBOUNCE_MS, DEFAULT_HISTORY_LIMIT, DEFAULT_LOG_LEVEL,
    DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_MS,
};

/// Tunables for the client. Every field may be omitted from the file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-request timeout
    pub timeout_ms: u64,
    pub max_redirects: usize,
    /// Quiet period before environment edits are persisted
    pub debounce_ms: u64,
    pub history_limit: usize,
    pub data_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            data_dir: None,
            log_level: String::from(DEFAULT_LOG_LEVEL),
        }
    }
}

impl Config {
    /// Load from the default location, then apply `COURIER_*` overrides.
    pub fn load() -> Result<Self> {
        let path = default_base_dir().join(CONFIG_FILE);
        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from an explicit path. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("COURIER_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(timeout) = lookup("COURIER_TIMEOUT_MS") {
            self.timeout_ms = timeout
                .trim()
                .parse()
                .with_context(|| format!("COURIER_TIMEOUT_MS is not a number: {timeout}"))?;
        }
        Ok(())
    }

    /// Directory holding collections, environment and the log file
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_base_dir)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn default_base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.yaml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.history_limit, 50);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "debounce_ms: 250\nlog_level: debug\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "timeout_ms: [not, a, number]\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env_overrides(|key| match key {
                "COURIER_DATA_DIR" => Some("/tmp/courier-data".to_string()),
                "COURIER_TIMEOUT_MS" => Some("1500".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/courier-data"));
        assert_eq!(config.timeout(), Duration::from_millis(1500));

        let mut config = Config::default();
        let result = config.apply_env_overrides(|key| {
            (key == "COURIER_TIMEOUT_MS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }
}
