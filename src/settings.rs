//! Service settings.
//! Priority: `MURLI__*` environment variables > `config/{env}` file >
//! `config/default` file > built-in defaults.

use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::translate::cache::DEFAULT_MAX_ENTRIES;
use crate::translate::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub upstream: UpstreamSettings,
    pub retry: RetryPolicy,
    pub cache: CacheSettings,
    pub dictionary: DictionarySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// JSON log lines instead of human-readable ones.
    pub json_logs: bool,
    /// Include the `debug` object in translate responses.
    pub debug_responses: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            json_logs: false,
            debug_responses: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub timeout_ms: u64,
    pub pool_max_idle_per_host: usize,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: "https://translate.googleapis.com".to_string(),
            timeout_ms: 10_000,
            pool_max_idle_per_host: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionarySettings {
    /// Extra phrases merged over the built-in dictionary.
    pub path: Option<PathBuf>,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.max_entries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.max_entries",
                message: "must be at least 1".to_string(),
            });
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "retry.base_delay_ms",
                message: format!(
                    "{} exceeds retry.max_delay_ms ({})",
                    self.retry.base_delay_ms, self.retry.max_delay_ms
                ),
            });
        }
        if self.upstream.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "upstream.timeout_ms",
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Load settings from files and `MURLI__SECTION__KEY` environment variables.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder().add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{env_name}")).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("MURLI")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let settings: Settings = builder.build()?.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.cache.max_entries, 500);
        assert_eq!(settings.retry, RetryPolicy::default());
        assert_eq!(settings.bind_address(), "0.0.0.0:3000");
        assert!(settings.dictionary.path.is_none());
    }

    #[test]
    fn zero_cache_is_rejected() {
        let mut settings = Settings::default();
        settings.cache.max_entries = 0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { field: "cache.max_entries", .. })
        ));
    }

    #[test]
    fn base_delay_above_cap_is_rejected() {
        let mut settings = Settings::default();
        settings.retry.base_delay_ms = 60_000;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let settings: Settings = Config::builder()
            .set_override("retry.max_retries", 1)
            .unwrap()
            .set_override("server.port", 8081)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.retry.max_retries, 1);
        assert_eq!(settings.retry.base_delay_ms, 500);
        assert_eq!(settings.server.port, 8081);
        assert_eq!(settings.server.host, "0.0.0.0");
    }
}
