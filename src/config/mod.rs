//! Configuration loading and validation.

mod loader;
mod types;

pub use types::{
    AdminConfig, Config, DispatchConfig, FjallConfig, MockResponse, ProviderConfig, QueueBackend,
    QueueConfig, Settings, ShutdownConfig,
};
