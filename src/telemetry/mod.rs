//! Telemetry: tracing initialization and engine counters.

mod counters;
mod tracing;

pub use counters::{CountersSnapshot, EngineCounters};
pub use tracing::{init_tracing, TracingConfig};
