//! Admin API integration tests
//!
//! Tests for the health endpoints and the campaign control surface.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use campaignd::admin::{AdminServer, AdminState};
use campaignd::bootstrap::{EngineState, SharedEngineState, Shutdown};
use campaignd::campaign::{
    Campaign, CampaignContact, CampaignId, CampaignRepository, ContactId, ContactRepository,
    MemoryCampaignRepository, MemoryContactRepository, TenantId,
};
use campaignd::queue::QueueStore;
use campaignd::clock::SystemClock;
use campaignd::config::{Config, DispatchConfig};
use campaignd::dedup::MemoryDedupGuard;
use campaignd::dispatcher::DispatchCoordinator;
use campaignd::lifecycle::CampaignLifecycleController;
use campaignd::provider::MockProvider;
use campaignd::queue::MemoryQueueStore;
use campaignd::tenant::FixedTenantResolver;

/// Port allocator for tests
static PORT: AtomicU16 = AtomicU16::new(19300);

fn next_port() -> u16 {
    PORT.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    uptime_seconds: u64,
    global: GlobalStats,
    counters: Counters,
}

#[derive(Debug, Deserialize)]
struct GlobalStats {
    queue_depth: u64,
    in_flight: u64,
    send_permit_utilization: f64,
    active_campaigns: u64,
}

#[derive(Debug, Deserialize)]
struct Counters {
    messages_sent: u64,
    messages_failed: u64,
}

#[derive(Debug, Deserialize)]
struct CampaignStatsResponse {
    status: String,
    pending: u64,
    sent: u64,
    failed: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Test fixture that starts the engine and admin server on a unique port
struct TestServer {
    state: SharedEngineState,
    campaigns: Arc<MemoryCampaignRepository>,
    contacts: Arc<MemoryContactRepository>,
    shutdown: Arc<Shutdown>,
    base_url: String,
    client: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let dispatch = DispatchConfig {
            tick_interval: Duration::from_millis(20),
            batch_pause: Duration::ZERO,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            business_hours_only: false,
            randomize_order: false,
            ..DispatchConfig::default()
        };
        let config = Arc::new(Config {
            dispatch,
            ..Config::default()
        });

        let campaigns = Arc::new(MemoryCampaignRepository::new());
        let contacts = Arc::new(MemoryContactRepository::new());
        let state = EngineState::with_components(
            config,
            Arc::new(SystemClock),
            campaigns.clone(),
            contacts.clone(),
            Arc::new(MemoryQueueStore::new()),
            Arc::new(MemoryDedupGuard::new()),
            Arc::new(MockProvider::success()),
            Arc::new(FixedTenantResolver::new(TenantId::from_u64(1))),
        );

        let shutdown = Shutdown::new(Duration::from_secs(1));
        tokio::spawn(DispatchCoordinator::new(state.clone(), shutdown.clone()).run());

        let controller = Arc::new(CampaignLifecycleController::new(state.clone()));
        let admin_state = Arc::new(AdminState::new(state.clone(), controller));
        admin_state.set_ready(true);

        let port = next_port();
        let address = format!("127.0.0.1:{}", port).parse().unwrap();
        let server = AdminServer::new(address, admin_state, shutdown.clone());
        tokio::spawn(async move {
            let _ = server.run().await;
        });

        let fixture = Self {
            state,
            campaigns,
            contacts,
            shutdown,
            base_url: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
        };

        fixture.wait_for_server().await;
        fixture
    }

    async fn wait_for_server(&self) {
        for _ in 0..100 {
            if self
                .client
                .get(format!("{}/healthz", self.base_url))
                .send()
                .await
                .is_ok()
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("admin server did not come up");
    }

    fn seed_campaign(&self, id: u64, contact_count: u64) {
        let campaign_id = CampaignId::from_u64(id);
        self.campaigns.insert(
            Campaign::new(
                campaign_id,
                TenantId::from_u64(1),
                format!("campaign-{}", id),
                "hello",
                chrono::Utc::now(),
            )
            .with_total_contacts(contact_count),
        );
        for i in 1..=contact_count {
            self.contacts.insert(CampaignContact::new(
                ContactId::from_u64(id * 1000 + i),
                campaign_id,
                i,
                format!("+25884{:07}", id * 1000 + i),
            ));
        }
    }

    async fn post(&self, path: &str) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap()
    }

    async fn campaign_stats(&self, id: u64) -> CampaignStatsResponse {
        self.client
            .get(format!("{}/campaigns/{}/stats", self.base_url, id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_health_endpoints() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .get(format!("{}/healthz", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let health: HealthResponse = resp.json().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert!(!health.version.is_empty());

    for path in ["/livez", "/readyz"] {
        let resp = server
            .client
            .get(format!("{}{}", server.base_url, path))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    server.shutdown.terminate();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_start_campaign_and_observe_completion() {
    let server = TestServer::start().await;
    server.seed_campaign(1, 3);

    let resp = server.post("/campaigns/1/start").await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Poll stats until the campaign drains.
    let mut completed = false;
    for _ in 0..250 {
        let stats = server.campaign_stats(1).await;
        if stats.status == "completed" {
            assert_eq!(stats.sent, 3);
            assert_eq!(stats.pending, 0);
            assert_eq!(stats.failed, 0);
            completed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(completed, "campaign did not complete in time");

    let resp = server
        .client
        .get(format!("{}/stats", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let stats: StatsResponse = resp.json().await.unwrap();
    assert_eq!(stats.counters.messages_sent, 3);
    assert_eq!(stats.counters.messages_failed, 0);
    assert_eq!(stats.global.queue_depth, 0);
    assert_eq!(stats.global.in_flight, 0);
    assert!(stats.global.send_permit_utilization >= 0.0);
    let _ = (stats.uptime_seconds, stats.global.active_campaigns);

    server.shutdown.terminate();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_control_surface_error_mapping() {
    let server = TestServer::start().await;

    // Unknown campaign -> 404
    let resp = server.post("/campaigns/404/start").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let err: ErrorResponse = resp.json().await.unwrap();
    assert!(err.error.contains("not found"));

    // Campaign without contacts -> 422
    server.seed_campaign(2, 0);
    let resp = server.post("/campaigns/2/start").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Pause before start -> 409
    server.seed_campaign(3, 2);
    let resp = server.post("/campaigns/3/pause").await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Foreign tenant -> 404
    server.campaigns.insert(
        Campaign::new(
            CampaignId::from_u64(9),
            TenantId::from_u64(2),
            "other-tenant",
            "hi",
            chrono::Utc::now(),
        )
        .with_total_contacts(1),
    );
    let resp = server.post("/campaigns/9/start").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    server.shutdown.terminate();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pause_resume_cancel_flow() {
    let server = TestServer::start().await;

    // Scheduled an hour out so nothing dispatches during the test.
    let id = CampaignId::from_u64(5);
    server.campaigns.insert(
        Campaign::new(id, TenantId::from_u64(1), "scheduled", "hello", chrono::Utc::now())
            .with_total_contacts(2)
            .with_window(Some(chrono::Utc::now() + chrono::Duration::hours(1)), None),
    );
    for i in 1..=2 {
        server.contacts.insert(CampaignContact::new(
            ContactId::from_u64(5000 + i),
            id,
            i,
            format!("+25884{:07}", 5000 + i),
        ));
    }

    assert_eq!(server.post("/campaigns/5/start").await.status(), StatusCode::OK);

    assert_eq!(server.post("/campaigns/5/pause").await.status(), StatusCode::OK);
    let stats = server.campaign_stats(5).await;
    assert_eq!(stats.status, "paused");
    assert_eq!(stats.pending, 2);

    // Double pause -> 409
    assert_eq!(
        server.post("/campaigns/5/pause").await.status(),
        StatusCode::CONFLICT
    );

    // Cancel is legal from Paused and purges the parked entries.
    assert_eq!(server.post("/campaigns/5/cancel").await.status(), StatusCode::OK);
    let stats = server.campaign_stats(5).await;
    assert_eq!(stats.status, "canceled");
    assert_eq!(server.state.queue.depth().unwrap(), 0);

    // Resume after cancel -> 409 (terminal).
    assert_eq!(
        server.post("/campaigns/5/resume").await.status(),
        StatusCode::CONFLICT
    );

    // A second scheduled campaign exercises resume over HTTP. Resume
    // restores due-times to now, so its entry dispatches right after.
    server.campaigns.insert(
        Campaign::new(
            CampaignId::from_u64(6),
            TenantId::from_u64(1),
            "scheduled-2",
            "hello",
            chrono::Utc::now(),
        )
        .with_total_contacts(1)
        .with_window(Some(chrono::Utc::now() + chrono::Duration::hours(1)), None),
    );
    server.contacts.insert(CampaignContact::new(
        ContactId::from_u64(6001),
        CampaignId::from_u64(6),
        1,
        "+258846000001",
    ));

    assert_eq!(server.post("/campaigns/6/start").await.status(), StatusCode::OK);
    assert_eq!(server.post("/campaigns/6/pause").await.status(), StatusCode::OK);
    assert_eq!(server.post("/campaigns/6/resume").await.status(), StatusCode::OK);

    let mut completed = false;
    for _ in 0..250 {
        let stats = server.campaign_stats(6).await;
        if stats.status == "completed" {
            assert_eq!(stats.sent, 1);
            completed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(completed, "resumed campaign did not dispatch");

    server.shutdown.terminate();
}
