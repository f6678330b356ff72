use std::time::Duration;

use serde::Deserialize;

use crate::infrastructure::cache::{CacheConfig, CacheType};
use crate::infrastructure::stampede::StampedeConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub cache: CacheSettings,
    pub stampede: StampedeSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Store backend settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// `in_memory`, `redis`, `layered` or `null`
    pub backend: String,
    pub redis_url: Option<String>,
    pub key_prefix: Option<String>,
    pub default_ttl_secs: u64,
    pub max_capacity: u64,
    pub local_capacity: u64,
    pub local_ttl_secs: u64,
    pub fail_open: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StampedeSettings {
    pub lock_ttl_secs: u64,
    pub early_refresh_ratio: f64,
    pub jitter_ratio: f64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheType::InMemory.to_string(),
            redis_url: None,
            key_prefix: None,
            default_ttl_secs: 3600,
            max_capacity: 10_000,
            local_capacity: 1_000,
            local_ttl_secs: 60,
            fail_open: true,
        }
    }
}

impl Default for StampedeSettings {
    fn default() -> Self {
        let defaults = StampedeConfig::default();

        Self {
            lock_ttl_secs: defaults.lock_ttl.as_secs(),
            early_refresh_ratio: defaults.early_refresh_ratio,
            jitter_ratio: defaults.jitter_ratio,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Backend settings in the form the cache factory takes
    pub fn cache_config(&self) -> Result<CacheConfig, config::ConfigError> {
        let cache_type: CacheType = self
            .cache
            .backend
            .parse()
            .map_err(|e| config::ConfigError::Message(format!("cache.backend: {}", e)))?;

        Ok(CacheConfig {
            cache_type,
            redis_url: self.cache.redis_url.clone(),
            key_prefix: self.cache.key_prefix.clone(),
            default_ttl: Duration::from_secs(self.cache.default_ttl_secs),
            max_capacity: Some(self.cache.max_capacity),
            time_to_idle: None,
            local_capacity: self.cache.local_capacity,
            local_ttl: Duration::from_secs(self.cache.local_ttl_secs),
            fail_open: self.cache.fail_open,
        })
    }

    pub fn stampede_config(&self) -> Result<StampedeConfig, config::ConfigError> {
        let stampede = StampedeConfig::default()
            .with_lock_ttl(Duration::from_secs(self.stampede.lock_ttl_secs))
            .with_early_refresh_ratio(self.stampede.early_refresh_ratio)
            .with_jitter_ratio(self.stampede.jitter_ratio);

        stampede
            .validate()
            .map_err(|e| config::ConfigError::Message(format!("stampede: {}", e)))?;

        Ok(stampede)
    }
}
