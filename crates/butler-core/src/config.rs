use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::queue::QueueConfig;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "butler.yaml";

/// Prefix of environment overrides, e.g. `BUTLER_DISTRIBUTE_QUEUE__MAX_AGE_MS`.
pub const ENV_PREFIX: &str = "BUTLER_";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Extract(Box<figment::Error>),

    #[error("invalid distribute_queue.poll_interval_ms: {0}. Must be positive")]
    InvalidPollInterval(u64),

    #[error("invalid distribute_queue.max_age_ms: {0}. Must be positive")]
    InvalidMaxAge(u64),

    #[error("invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Extract(Box::new(err))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButlerConfig {
    #[serde(default)]
    pub logging: LogConfig,

    #[serde(default)]
    pub distribute_queue: DistributeQueueConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default level (trace, debug, info, warn, error). `RUST_LOG` still wins.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `Butler.configFile.qrsConfig.distributeTaskQueue` equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributeQueueConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: u64,
}

impl Default for DistributeQueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_age_ms: default_max_age_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    20_000
}

fn default_max_age_ms() -> u64 {
    6 * 60 * 60 * 1000
}

impl DistributeQueueConfig {
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::new(
            Duration::from_millis(self.poll_interval_ms),
            Duration::from_millis(self.max_age_ms),
        )
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. `path`, or `butler.yaml` in the working directory (optional)
    /// 3. Environment variables (`BUTLER_*`, `__` separates nested keys)
    pub fn load(path: Option<&Path>) -> Result<ButlerConfig, ConfigError> {
        Self::from_figment(Self::figment(path))
    }

    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::new()
            .merge(Serialized::defaults(ButlerConfig::default()))
            .merge(Yaml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<ButlerConfig, ConfigError> {
        let config: ButlerConfig = figment.extract()?;
        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &ButlerConfig) -> Result<(), ConfigError> {
        let queue = &config.distribute_queue;
        if queue.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval(queue.poll_interval_ms));
        }
        if queue.max_age_ms == 0 {
            return Err(ConfigError::InvalidMaxAge(queue.max_age_ms));
        }

        if !VALID_LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    fn from_yaml(yaml: &str) -> Result<ButlerConfig, ConfigError> {
        ConfigLoader::from_figment(
            Figment::new()
                .merge(Serialized::defaults(ButlerConfig::default()))
                .merge(Yaml::string(yaml)),
        )
    }

    #[test]
    fn defaults_are_valid() {
        let config = ButlerConfig::default();
        assert_eq!(config.distribute_queue.poll_interval_ms, 20_000);
        assert_eq!(config.distribute_queue.max_age_ms, 21_600_000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        ConfigLoader::validate(&config).unwrap();
    }

    #[test]
    fn queue_config_converts_millis() {
        let queue = DistributeQueueConfig {
            poll_interval_ms: 1_500,
            max_age_ms: 60_000,
        }
        .queue_config();

        assert_eq!(queue.poll_interval, Duration::from_millis(1_500));
        assert_eq!(queue.max_age, Duration::from_secs(60));
    }

    #[test]
    fn yaml_overrides_only_given_keys() {
        let config = from_yaml(
            r"
distribute_queue:
  poll_interval_ms: 5000
logging:
  format: json
",
        )
        .unwrap();

        assert_eq!(config.distribute_queue.poll_interval_ms, 5_000);
        assert_eq!(config.distribute_queue.max_age_ms, 21_600_000);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = from_yaml("distribute_queue:\n  poll_interval_ms: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPollInterval(0)));
    }

    #[test]
    fn zero_max_age_is_rejected() {
        let err = from_yaml("distribute_queue:\n  max_age_ms: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMaxAge(0)));
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let err = from_yaml("logging:\n  level: chatty\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel(ref level) if level == "chatty"));
    }

    #[test]
    fn unknown_log_format_fails_extraction() {
        let err = from_yaml("logging:\n  format: xml\n").unwrap_err();
        assert!(matches!(err, ConfigError::Extract(_)));
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "butler.yaml",
                "distribute_queue:\n  poll_interval_ms: 5000\n  max_age_ms: 60000\n",
            )?;
            jail.set_env("BUTLER_DISTRIBUTE_QUEUE__MAX_AGE_MS", "120000");

            let config = ConfigLoader::load(None).map_err(|e| e.to_string())?;

            assert_eq!(config.distribute_queue.poll_interval_ms, 5_000);
            assert_eq!(config.distribute_queue.max_age_ms, 120_000);
            Ok(())
        });
    }

    #[test]
    fn explicit_path_is_used_and_missing_file_falls_back_to_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.yaml", "logging:\n  level: debug\n")?;

            let config = ConfigLoader::load(Some(Path::new("custom.yaml"))).map_err(|e| e.to_string())?;
            assert_eq!(config.logging.level, "debug");

            let config = ConfigLoader::load(Some(Path::new("absent.yaml"))).map_err(|e| e.to_string())?;
            assert_eq!(config, ButlerConfig::default());
            Ok(())
        });
    }
}
