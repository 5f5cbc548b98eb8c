//! Shared engine state.
//!
//! All core components are constructed here once and dependency-injected
//! into whatever needs them. No ambient statics: lifecycle is tied to the
//! owning [`super::Server`].

use std::sync::Arc;

use crate::campaign::{
    MemoryCampaignRepository, MemoryContactRepository, SharedCampaigns, SharedContacts, TenantId,
};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::dedup::{MemoryDedupGuard, SharedDedup};
use crate::dispatcher::ConcurrencyGate;
use crate::provider::{MockProvider, SharedProvider};
use crate::queue::{create_queue_store, SharedQueue};
use crate::telemetry::EngineCounters;
use crate::tenant::{FixedTenantResolver, SharedTenantResolver};

use super::EventBus;

/// Shared engine state.
///
/// Passed to every component that needs access to engine-wide resources.
/// All fields are thread-safe and cheap to clone through the Arc.
pub struct EngineState {
    /// Configuration snapshot
    pub config: Arc<Config>,
    /// Clock used for all schedule computation
    pub clock: Arc<dyn Clock>,
    /// Campaign repository
    pub campaigns: SharedCampaigns,
    /// Contact repository
    pub contacts: SharedContacts,
    /// Dispatch queue
    pub queue: SharedQueue,
    /// Duplicate-engagement guard
    pub dedup: SharedDedup,
    /// Outbound provider
    pub provider: SharedProvider,
    /// Tenant resolver for control-surface isolation
    pub tenants: SharedTenantResolver,
    /// Permit pools
    pub gate: Arc<ConcurrencyGate>,
    /// Engine counters
    pub counters: Arc<EngineCounters>,
    /// Event bus
    pub events: Arc<EventBus>,
}

/// Shared engine state handle.
pub type SharedEngineState = Arc<EngineState>;

impl EngineState {
    /// Create engine state with default component wiring: in-memory
    /// repositories, the configured queue backend, and the mock provider.
    pub async fn new(config: Arc<Config>) -> anyhow::Result<SharedEngineState> {
        let queue = create_queue_store(&config.queue).await?;
        let provider: SharedProvider = Arc::new(MockProvider::new(&config.provider));
        let tenants: SharedTenantResolver = Arc::new(FixedTenantResolver::new(
            TenantId::from_u64(config.settings.tenant_id),
        ));

        Ok(Self::with_components(
            config,
            Arc::new(SystemClock),
            Arc::new(MemoryCampaignRepository::new()),
            Arc::new(MemoryContactRepository::new()),
            queue,
            Arc::new(MemoryDedupGuard::new()),
            provider,
            tenants,
        ))
    }

    /// Assemble engine state from explicit components.
    #[allow(clippy::too_many_arguments)]
    pub fn with_components(
        config: Arc<Config>,
        clock: Arc<dyn Clock>,
        campaigns: SharedCampaigns,
        contacts: SharedContacts,
        queue: SharedQueue,
        dedup: SharedDedup,
        provider: SharedProvider,
        tenants: SharedTenantResolver,
    ) -> SharedEngineState {
        let gate = Arc::new(ConcurrencyGate::new(
            config.dispatch.send_permits,
            config.dispatch.drain_permits,
        ));

        Arc::new(Self {
            config,
            clock,
            campaigns,
            contacts,
            queue,
            dedup,
            provider,
            tenants,
            gate,
            counters: Arc::new(EngineCounters::new()),
            events: EventBus::new(256),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::QueueStore;

    #[tokio::test]
    async fn test_engine_state_default_wiring() {
        let config = Arc::new(Config::default());
        let state = EngineState::new(config).await.unwrap();

        assert_eq!(state.gate.send_capacity(), 50);
        assert_eq!(state.gate.drain_capacity(), 10);
        assert_eq!(state.queue.depth().unwrap(), 0);
        assert_eq!(state.counters.snapshot().messages_sent, 0);
    }
}
