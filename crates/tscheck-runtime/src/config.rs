//! Runtime configuration.

use tscheck_core::DEFAULT_MAX_CONCURRENCY;

use crate::error::{Result, RuntimeError};

/// Environment variable overriding `max_concurrency`.
pub const MAX_CONCURRENCY_ENV: &str = "TSCHECK_MAX_CONCURRENCY";

/// Configuration for the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum queue-managed tasks running at once.
    pub max_concurrency: usize,
    /// Capacity of the process event channel.
    pub channel_capacity: usize,
    /// Size of the stdout read buffer, in bytes.
    pub read_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            channel_capacity: 256,
            read_buffer_size: 16 * 1024,
        }
    }
}

impl RuntimeConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config from defaults overridden by the environment.
    ///
    /// Reads `TSCHECK_MAX_CONCURRENCY`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(MAX_CONCURRENCY_ENV) {
            config.max_concurrency = value.trim().parse().map_err(|_| {
                RuntimeError::InvalidConfig(format!(
                    "{} must be a positive integer, got {:?}",
                    MAX_CONCURRENCY_ENV, value
                ))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Sets the maximum concurrency.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Sets the event channel capacity.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Sets the stdout read buffer size.
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(RuntimeError::InvalidConfig(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(RuntimeError::InvalidConfig(
                "channel_capacity must be at least 1".to_string(),
            ));
        }
        if self.read_buffer_size == 0 {
            return Err(RuntimeError::InvalidConfig(
                "read_buffer_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();

        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.channel_capacity, 256);
        assert_eq!(config.read_buffer_size, 16 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = RuntimeConfig::new()
            .with_max_concurrency(2)
            .with_channel_capacity(8)
            .with_read_buffer_size(512);

        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.channel_capacity, 8);
        assert_eq!(config.read_buffer_size, 512);
    }

    #[test]
    fn test_env_override() {
        let config = RuntimeConfig::from_lookup(|key| {
            (key == MAX_CONCURRENCY_ENV).then(|| " 7 ".to_string())
        })
        .unwrap();

        assert_eq!(config.max_concurrency, 7);
    }

    #[test]
    fn test_env_missing_uses_default() {
        let config = RuntimeConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_env_rejects_bad_values() {
        let result = RuntimeConfig::from_lookup(|_| Some("many".to_string()));
        assert!(matches!(result, Err(RuntimeError::InvalidConfig(_))));

        let result = RuntimeConfig::from_lookup(|_| Some("0".to_string()));
        assert!(matches!(result, Err(RuntimeError::InvalidConfig(_))));
    }
}
