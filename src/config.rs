use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::irc::IrcTimings;
use crate::models::Filter;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub irc: IrcConfig,

    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub indexers: Vec<IndexerConfig>,

    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Extra on-disk definitions loaded after the embedded set.
    pub definitions_dir: Option<String>,

    /// 0 lets tokio size the runtime itself.
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            definitions_dir: None,
            worker_threads: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IrcConfig {
    pub connect_timeout_seconds: u64,

    pub ping_interval_seconds: u64,

    pub pong_timeout_seconds: u64,

    pub nickserv_timeout_seconds: u64,

    pub backoff_base_seconds: u64,

    pub backoff_cap_seconds: u64,

    /// A READY dwell at least this long resets the reconnect backoff.
    pub ready_reset_seconds: u64,
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: 30,
            ping_interval_seconds: 60,
            pong_timeout_seconds: 90,
            nickserv_timeout_seconds: 30,
            backoff_base_seconds: 5,
            backoff_cap_seconds: 300,
            ready_reset_seconds: 30,
        }
    }
}

impl IrcConfig {
    #[must_use]
    pub fn timings(&self) -> IrcTimings {
        IrcTimings {
            connect_timeout: Duration::from_secs(self.connect_timeout_seconds),
            ping_interval: Duration::from_secs(self.ping_interval_seconds),
            pong_timeout: Duration::from_secs(self.pong_timeout_seconds),
            nickserv_timeout: Duration::from_secs(self.nickserv_timeout_seconds),
            backoff_base: Duration::from_secs(self.backoff_base_seconds),
            backoff_cap: Duration::from_secs(self.backoff_cap_seconds),
            ready_reset: Duration::from_secs(self.ready_reset_seconds),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub queue_capacity: usize,

    /// Concurrent release tails; 0 means one per CPU.
    pub workers: usize,

    pub shutdown_grace_seconds: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            workers: 0,
            shutdown_grace_seconds: 10,
        }
    }
}

/// User-side configuration of one indexer definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub identifier: String,

    pub enabled: bool,

    pub irc_nick: String,

    pub irc_auth_account: String,

    pub irc_auth_password: String,

    pub irc_sasl: bool,

    /// Values for the definition's settings schema (passkey, authkey, …).
    pub settings: HashMap<String, String>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            identifier: String::new(),
            enabled: true,
            irc_nick: String::new(),
            irc_auth_account: String::new(),
            irc_auth_password: String::new(),
            irc_sasl: false,
            settings: HashMap::new(),
        }
    }
}

/// A filter bound to a set of indexers; empty means all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub indexers: Vec<String>,

    #[serde(flatten)]
    pub filter: Filter,
}

impl Config {
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("CONFIG_PATH") {
            return Self::load_from_path(Path::new(&path));
        }

        for path in Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(&path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("announcerr").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".announcerr").join("config.toml"));
        }

        paths
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = PathBuf::from("config.toml");
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.queue_capacity == 0 {
            anyhow::bail!("pipeline queue capacity must be > 0");
        }
        if self.irc.pong_timeout_seconds <= self.irc.ping_interval_seconds {
            anyhow::bail!("irc pong timeout must be longer than the ping interval");
        }

        for indexer in &self.indexers {
            if indexer.identifier.is_empty() {
                anyhow::bail!("indexer entry without an identifier");
            }
            if indexer.enabled && indexer.irc_nick.is_empty() {
                anyhow::bail!("indexer '{}' is enabled but has no irc_nick", indexer.identifier);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.pipeline.queue_capacity, 1024);
        assert_eq!(config.irc.ping_interval_seconds, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [pipeline]
            queue_capacity = 256

            [[indexers]]
            identifier = "polarbytes"
            irc_nick = "announcebot"
            irc_auth_password = "hunter2"

            [indexers.settings]
            passkey = "abc"
            invite_key = "def"

            [[filters]]
            indexers = ["polarbytes"]
            name = "tv"
            enabled = true
            priority = 10
            resolutions = ["1080p", "2160p"]
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.pipeline.queue_capacity, 256);
        assert_eq!(config.indexers.len(), 1);
        assert_eq!(config.indexers[0].settings["passkey"], "abc");
        assert_eq!(config.filters[0].filter.name, "tv");
        assert_eq!(config.filters[0].filter.resolutions, vec!["1080p", "2160p"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_nickless_indexer() {
        let toml_str = r#"
            [[indexers]]
            identifier = "polarbytes"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.pipeline.queue_capacity, config.pipeline.queue_capacity);
    }
}
