//! Load: config loading from file and environment variables.

use std::path::Path;

use super::model::{ConfigError, NormalizerConfig};

pub const CONFIG_FILE_ENV: &str = "LOGNORM_CONFIG_FILE";
pub const DEFAULT_CONFIG_FILE: &str = "/etc/lognorm/normalizer.toml";

impl NormalizerConfig {
    /// Load configuration from file or environment variables
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::info!("Config file not found at {}, using defaults", config_path);
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml(path, &contents)
    }

    fn from_toml(path: &str, contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Toml {
            path: path.to_string(),
            source,
        })
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Overlay `LOGNORM_*` settings. Unparseable values are ignored.
    fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(size) = var("LOGNORM_MAX_RECORD_SIZE").and_then(|s| s.parse().ok()) {
            self.max_record_size = size;
        }
        if let Some(enabled) = var("LOGNORM_EVENT_TIME_FALLBACK").and_then(|s| s.parse().ok()) {
            self.event_time_fallback = enabled;
        }
        if let Some(types) = var("LOGNORM_LOG_TYPES") {
            self.enabled_log_types = types
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(default) = var("LOGNORM_DEFAULT_LOG_TYPE") {
            self.default_log_type = default;
        }
    }
}
