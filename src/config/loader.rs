use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::types::Config;

impl Config {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        debug!(path = %path.display(), "loading configuration");

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(yaml).context("failed to parse YAML configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let dispatch = &self.dispatch;

        if dispatch.batch_size == 0 {
            anyhow::bail!("dispatch.batch_size must be at least 1");
        }

        if dispatch.min_delay > dispatch.max_delay {
            anyhow::bail!(
                "dispatch.min_delay ({:?}) must not exceed dispatch.max_delay ({:?})",
                dispatch.min_delay,
                dispatch.max_delay
            );
        }

        if dispatch.business_start_hour >= dispatch.business_end_hour {
            anyhow::bail!(
                "dispatch.business_start_hour ({}) must be before business_end_hour ({})",
                dispatch.business_start_hour,
                dispatch.business_end_hour
            );
        }

        if dispatch.business_end_hour > 24 || dispatch.business_start_hour > 23 {
            anyhow::bail!("business hours must fall within a day (start 0-23, end 1-24)");
        }

        if dispatch.send_permits == 0 {
            anyhow::bail!("dispatch.send_permits must be at least 1");
        }

        if dispatch.drain_permits == 0 {
            anyhow::bail!("dispatch.drain_permits must be at least 1");
        }

        if dispatch.tick_interval.is_zero() {
            anyhow::bail!("dispatch.tick_interval must be non-zero");
        }

        info!("configuration validated successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MockResponse, QueueBackend};
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.dispatch.batch_size, 30);
        assert_eq!(config.dispatch.batch_pause, Duration::from_secs(30 * 60));
        assert_eq!(config.dispatch.min_delay, Duration::from_millis(15_000));
        assert_eq!(config.dispatch.max_delay, Duration::from_millis(45_000));
        assert_eq!(config.dispatch.max_retries, 3);
        assert_eq!(config.dispatch.retry_delay, Duration::from_millis(5_000));
        assert!(config.dispatch.business_hours_only);
        assert_eq!(config.dispatch.business_start_hour, 9);
        assert_eq!(config.dispatch.business_end_hour, 18);
        assert!(config.dispatch.randomize_order);
        assert_eq!(config.dispatch.send_permits, 50);
        assert_eq!(config.dispatch.drain_permits, 10);
        assert_eq!(config.queue.backend, QueueBackend::Memory);
        assert_eq!(config.provider.response, MockResponse::Success);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
dispatch:
  tick_interval: 500ms
  batch_size: 10
  batch_pause: 5m
  min_delay: 1s
  max_delay: 2s
  message_timeout: 10s
  max_retries: 5
  retry_delay: 2s
  business_hours_only: false
  randomize_order: false
  send_permits: 20
  drain_permits: 4

queue:
  backend: fjall
  fjall:
    path: /var/lib/campaignd

provider:
  response: transient
  latency: 50ms

admin:
  address: "127.0.0.1:9191"

settings:
  log_level: debug
  tenant_id: 42
"#;

        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.dispatch.tick_interval, Duration::from_millis(500));
        assert_eq!(config.dispatch.batch_size, 10);
        assert_eq!(config.dispatch.max_retries, 5);
        assert!(!config.dispatch.business_hours_only);
        assert!(!config.dispatch.randomize_order);
        assert_eq!(config.queue.backend, QueueBackend::Fjall);
        assert_eq!(
            config.queue.fjall.path.as_deref(),
            Some(std::path::Path::new("/var/lib/campaignd"))
        );
        assert_eq!(config.provider.response, MockResponse::Transient);
        assert_eq!(config.provider.latency, Duration::from_millis(50));
        assert_eq!(config.settings.tenant_id, 42);
        assert_eq!(config.settings.log_level, "debug");
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let result = Config::from_yaml("dispatch:\n  batch_size: 0\n");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("batch_size"));
    }

    #[test]
    fn test_rejects_inverted_delays() {
        let yaml = "dispatch:\n  min_delay: 10s\n  max_delay: 1s\n";
        let result = Config::from_yaml(yaml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("min_delay"));
    }

    #[test]
    fn test_rejects_inverted_business_hours() {
        let yaml = "dispatch:\n  business_start_hour: 18\n  business_end_hour: 9\n";
        let result = Config::from_yaml(yaml);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("business_start_hour"));
    }

    #[test]
    fn test_rejects_zero_permits() {
        let result = Config::from_yaml("dispatch:\n  send_permits: 0\n");
        assert!(result.is_err());

        let result = Config::from_yaml("dispatch:\n  drain_permits: 0\n");
        assert!(result.is_err());
    }
}
