//! Admin HTTP server.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing::info;

use crate::bootstrap::{SharedEngineState, Shutdown};
use crate::lifecycle::CampaignLifecycleController;
use crate::telemetry::CountersSnapshot;

use super::handlers::{
    campaign_stats_handler, cancel_campaign_handler, health_handler, live_handler,
    pause_campaign_handler, ready_handler, resume_campaign_handler, start_campaign_handler,
    stats_handler, sync_campaign_handler,
};

/// Admin server state.
pub struct AdminState {
    /// Server start time
    start_time: Instant,
    /// Is the server healthy
    healthy: AtomicBool,
    /// Is the server ready
    ready: AtomicBool,
    /// Engine state (counters, stores)
    engine: SharedEngineState,
    /// Campaign control surface
    controller: Arc<CampaignLifecycleController>,
}

impl AdminState {
    /// Create new admin state.
    pub fn new(engine: SharedEngineState, controller: Arc<CampaignLifecycleController>) -> Self {
        Self {
            start_time: Instant::now(),
            healthy: AtomicBool::new(true),
            ready: AtomicBool::new(false),
            engine,
            controller,
        }
    }

    /// Get uptime.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Check if healthy.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// Set health status.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    /// Set ready status.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }

    /// Campaign controller.
    pub fn controller(&self) -> &CampaignLifecycleController {
        &self.controller
    }

    /// Engine counter snapshot.
    pub fn counters(&self) -> CountersSnapshot {
        self.engine.counters.snapshot()
    }
}

/// Admin HTTP server.
pub struct AdminServer {
    address: SocketAddr,
    state: Arc<AdminState>,
    shutdown: Arc<Shutdown>,
}

impl AdminServer {
    /// Create a new admin server.
    pub fn new(address: SocketAddr, state: Arc<AdminState>, shutdown: Arc<Shutdown>) -> Self {
        Self {
            address,
            state,
            shutdown,
        }
    }

    /// Build the router.
    fn build_router(&self) -> Router {
        Router::new()
            // Kubernetes-style health endpoints
            .route("/healthz", get(health_handler))
            .route("/livez", get(live_handler))
            .route("/readyz", get(ready_handler))
            // Global stats
            .route("/stats", get(stats_handler))
            // Campaign control surface
            .route("/campaigns/{id}/start", post(start_campaign_handler))
            .route("/campaigns/{id}/pause", post(pause_campaign_handler))
            .route("/campaigns/{id}/resume", post(resume_campaign_handler))
            .route("/campaigns/{id}/cancel", post(cancel_campaign_handler))
            .route("/campaigns/{id}/sync", post(sync_campaign_handler))
            .route("/campaigns/{id}/stats", get(campaign_stats_handler))
            .with_state(self.state.clone())
    }

    /// Run the admin server.
    pub async fn run(self) -> std::io::Result<()> {
        let router = self.build_router();

        info!(address = %self.address, "starting admin server");

        let listener = TcpListener::bind(self.address).await?;
        let mut shutdown_rx = self.shutdown.subscribe();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
                info!("admin server shutting down");
            })
            .await?;

        Ok(())
    }
}
