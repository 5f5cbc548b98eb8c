use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for campaignd
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Dispatch engine knobs
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Queue store backend
    #[serde(default)]
    pub queue: QueueConfig,

    /// Outbound provider (mock configuration for development)
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Admin API configuration
    #[serde(default)]
    pub admin: AdminConfig,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Dispatch engine configuration. Loaded once and treated as an immutable
/// snapshot for the lifetime of the process.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Coordinator tick interval
    #[serde(default = "default_tick_interval", with = "humantime_serde")]
    pub tick_interval: Duration,

    /// Contacts per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batches
    #[serde(default = "default_batch_pause", with = "humantime_serde")]
    pub batch_pause: Duration,

    /// Minimum inter-message delay within a batch
    #[serde(default = "default_min_delay", with = "humantime_serde")]
    pub min_delay: Duration,

    /// Maximum inter-message delay within a batch
    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,

    /// Hard per-message provider timeout
    #[serde(default = "default_message_timeout", with = "humantime_serde")]
    pub message_timeout: Duration,

    /// Advisory batch timeout: entries this far past due are flagged stuck
    #[serde(default = "default_batch_timeout", with = "humantime_serde")]
    pub batch_timeout: Duration,

    /// Maximum retries per contact after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential retry backoff
    #[serde(default = "default_retry_delay", with = "humantime_serde")]
    pub retry_delay: Duration,

    /// Only dispatch within business hours
    #[serde(default = "default_true")]
    pub business_hours_only: bool,

    /// First in-window hour (inclusive)
    #[serde(default = "default_business_start_hour")]
    pub business_start_hour: u32,

    /// First out-of-window hour (exclusive)
    #[serde(default = "default_business_end_hour")]
    pub business_end_hour: u32,

    /// Shuffle contact order at planning time
    #[serde(default = "default_true")]
    pub randomize_order: bool,

    /// Global in-flight send permit pool
    #[serde(default = "default_send_permits")]
    pub send_permits: usize,

    /// Per-tick queue drain permit pool
    #[serde(default = "default_drain_permits")]
    pub drain_permits: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            batch_size: default_batch_size(),
            batch_pause: default_batch_pause(),
            min_delay: default_min_delay(),
            max_delay: default_max_delay(),
            message_timeout: default_message_timeout(),
            batch_timeout: default_batch_timeout(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            business_hours_only: true,
            business_start_hour: default_business_start_hour(),
            business_end_hour: default_business_end_hour(),
            randomize_order: true,
            send_permits: default_send_permits(),
            drain_permits: default_drain_permits(),
        }
    }
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_batch_size() -> usize {
    30
}

fn default_batch_pause() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_min_delay() -> Duration {
    Duration::from_millis(15_000)
}

fn default_max_delay() -> Duration {
    Duration::from_millis(45_000)
}

fn default_message_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_batch_timeout() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(5_000)
}

fn default_business_start_hour() -> u32 {
    9
}

fn default_business_end_hour() -> u32 {
    18
}

fn default_send_permits() -> usize {
    50
}

fn default_drain_permits() -> usize {
    10
}

fn default_true() -> bool {
    true
}

/// Queue store configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueConfig {
    /// Backend selection
    #[serde(default)]
    pub backend: QueueBackend,

    /// Fjall backend settings
    #[serde(default)]
    pub fjall: FjallConfig,
}

impl QueueConfig {
    /// In-memory queue config (for tests).
    pub fn memory() -> Self {
        Self {
            backend: QueueBackend::Memory,
            fjall: FjallConfig::default(),
        }
    }
}

/// Queue backend selection
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// In-memory, volatile
    #[default]
    Memory,
    /// Fjall LSM-tree, durable
    Fjall,
}

/// Fjall backend settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FjallConfig {
    /// Data directory (default: ./data/campaignd)
    pub path: Option<PathBuf>,
}

/// Mock provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Response behavior
    #[serde(default)]
    pub response: MockResponse,

    /// Simulated latency
    #[serde(default, with = "humantime_serde")]
    pub latency: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            response: MockResponse::default(),
            latency: Duration::ZERO,
        }
    }
}

/// Mock provider response type
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MockResponse {
    /// Every send succeeds
    #[default]
    Success,
    /// Every send fails with a transient error
    Transient,
    /// Every send fails with a permanent rejection
    Permanent,
}

/// Admin API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// HTTP API address
    #[serde(default = "default_admin_address")]
    pub address: SocketAddr,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            address: default_admin_address(),
        }
    }
}

fn default_admin_address() -> SocketAddr {
    "0.0.0.0:9090".parse().unwrap()
}

/// Global settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable structured JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Tenant this process dispatches for
    #[serde(default = "default_tenant_id")]
    pub tenant_id: u64,

    /// Shutdown configuration
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            tenant_id: default_tenant_id(),
            shutdown: ShutdownConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tenant_id() -> u64 {
    1
}

/// Shutdown configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ShutdownConfig {
    /// Drain timeout - how long to wait for in-flight sends
    #[serde(default = "default_drain_timeout", with = "humantime_serde")]
    pub drain_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout: default_drain_timeout(),
        }
    }
}

fn default_drain_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Humantime serde support module
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
