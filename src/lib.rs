//! campaignd - campaign dispatch engine.
//!
//! Takes bulk messaging campaigns (a contact list plus a message body) and
//! delivers individual outbound messages through a rate-limited provider
//! channel under hard constraints: bounded concurrency, batch pacing,
//! business-hour windows, retry with exponential backoff, pause/resume and
//! per-tenant isolation. Each contact is messaged at most the intended
//! number of times, even across crashes and restarts, because the durable
//! queue store is the single source of truth for pending work.
//!
//! # Architecture
//!
//! ```text
//!  control surface (admin HTTP / library API)
//!        │
//!        ▼
//!  CampaignLifecycleController ──► BatchPlanner ──► QueueStore
//!                                                      │ due entries
//!                     ┌────────────────────────────────┘
//!                     ▼
//!  DispatchCoordinator (single ticker, drain permits)
//!                     │ per-entry tasks (send permits)
//!                     ▼
//!  dispatcher::processor ──► ProviderClient
//!        │ failures
//!        ▼
//!  RetryCoordinator (backoff re-enqueue or terminal failure)
//! ```

pub mod admin;
pub mod bootstrap;
pub mod campaign;
pub mod clock;
pub mod config;
pub mod dedup;
pub mod dispatcher;
pub mod lifecycle;
pub mod planner;
pub mod provider;
pub mod queue;
pub mod telemetry;
pub mod tenant;
