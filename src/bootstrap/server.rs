use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use crate::admin::{AdminServer, AdminState};
use crate::config::Config;
use crate::dispatcher::DispatchCoordinator;
use crate::lifecycle::CampaignLifecycleController;
use crate::queue::QueueStore;

use super::shutdown::Shutdown;
use super::state::EngineState;
use super::Event;

/// Main campaignd server
///
/// Components:
/// - Engine state: repositories, queue store, provider, permit pools
/// - Dispatch coordinator: the single ticker driving dequeue cycles
/// - Admin server: health, stats and campaign control endpoints
/// - Shutdown: graceful drain letting in-flight sends complete
pub struct Server {
    config: Arc<Config>,
    shutdown: Arc<Shutdown>,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        let shutdown = Shutdown::new(config.settings.shutdown.drain_timeout);
        Self {
            config: Arc::new(config),
            shutdown,
        }
    }

    /// Run the server until shutdown
    pub async fn run(self) -> Result<()> {
        info!(
            tick_ms = self.config.dispatch.tick_interval.as_millis() as u64,
            send_permits = self.config.dispatch.send_permits,
            drain_permits = self.config.dispatch.drain_permits,
            "starting campaignd server"
        );

        let state = EngineState::new(self.config.clone()).await?;
        state.events.publish(Event::Starting);

        // Admin control surface
        let controller = Arc::new(CampaignLifecycleController::new(state.clone()));
        let admin_state = Arc::new(AdminState::new(state.clone(), controller));
        let admin_server = AdminServer::new(
            self.config.admin.address,
            admin_state.clone(),
            self.shutdown.clone(),
        );
        let admin_handle = tokio::spawn(async move {
            if let Err(e) = admin_server.run().await {
                error!(error = %e, "admin server failed");
            }
        });

        // The coordinator loop is the sole driver of dequeue cycles
        let coordinator = DispatchCoordinator::new(state.clone(), self.shutdown.clone());
        let coordinator_handle = tokio::spawn(coordinator.run());

        admin_state.set_ready(true);
        state.events.publish(Event::Ready);

        info!(
            admin_address = %self.config.admin.address,
            queue_depth = state.queue.depth().unwrap_or(0),
            "campaignd server started"
        );

        wait_for_shutdown().await;

        info!("shutdown signal received, starting graceful shutdown");
        state.events.publish(Event::ShutdownStarted);
        self.shutdown.start_drain();

        // In-flight sends are allowed to complete within the drain timeout;
        // no new work is drained once the coordinator observes the state.
        let drained = tokio::time::timeout(self.shutdown.drain_timeout(), async {
            while state.gate.in_flight() > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                in_flight = state.gate.in_flight(),
                "drain timeout reached, forcing shutdown"
            );
        }

        self.shutdown.terminate();
        let _ = coordinator_handle.await;
        admin_handle.abort();

        if let Err(e) = state.queue.flush() {
            warn!(error = %e, "failed to flush queue store");
        }

        info!("campaignd server stopped");
        Ok(())
    }
}

/// Wait for SIGINT or SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal as unix_signal, SignalKind};

        match unix_signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                let _ = signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
    }
}
