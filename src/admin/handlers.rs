//! Admin API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::campaign::CampaignId;
use crate::lifecycle::{GlobalStats, LifecycleError};
use crate::telemetry::CountersSnapshot;

use super::AdminState;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check handler.
pub async fn health_handler(State(state): State<Arc<AdminState>>) -> Response {
    let response = HealthResponse {
        status: if state.is_healthy() {
            "healthy"
        } else {
            "unhealthy"
        }
        .to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    if state.is_healthy() {
        (StatusCode::OK, Json(response)).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response)).into_response()
    }
}

/// Liveness handler (for Kubernetes).
pub async fn live_handler() -> StatusCode {
    StatusCode::OK
}

/// Readiness handler (for Kubernetes).
pub async fn ready_handler(State(state): State<Arc<AdminState>>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Global stats response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub uptime_seconds: u64,
    pub global: GlobalStats,
    pub counters: CountersSnapshot,
}

/// Global stats handler.
pub async fn stats_handler(State(state): State<Arc<AdminState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        uptime_seconds: state.uptime().as_secs(),
        global: state.controller().global_stats(),
        counters: state.counters(),
    })
}

/// Result of a campaign control action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub ok: bool,
    pub campaign_id: u64,
    pub action: String,
    /// Entries affected, where the action has a count (sync)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected: Option<u64>,
}

/// Error payload for failed control actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(err: LifecycleError) -> Response {
    let status = match &err {
        LifecycleError::NotFound => StatusCode::NOT_FOUND,
        LifecycleError::InvalidState(_) => StatusCode::CONFLICT,
        LifecycleError::EmptyContactList => StatusCode::UNPROCESSABLE_ENTITY,
        LifecycleError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

fn action_response(id: u64, action: &str, affected: Option<u64>) -> Response {
    (
        StatusCode::OK,
        Json(ActionResponse {
            ok: true,
            campaign_id: id,
            action: action.to_string(),
            affected,
        }),
    )
        .into_response()
}

/// Start a campaign.
pub async fn start_campaign_handler(
    State(state): State<Arc<AdminState>>,
    Path(id): Path<u64>,
) -> Response {
    match state.controller().start(CampaignId::from_u64(id)) {
        Ok(()) => action_response(id, "start", None),
        Err(err) => error_response(err),
    }
}

/// Pause a campaign.
pub async fn pause_campaign_handler(
    State(state): State<Arc<AdminState>>,
    Path(id): Path<u64>,
) -> Response {
    match state.controller().pause(CampaignId::from_u64(id)) {
        Ok(()) => action_response(id, "pause", None),
        Err(err) => error_response(err),
    }
}

/// Resume a campaign.
pub async fn resume_campaign_handler(
    State(state): State<Arc<AdminState>>,
    Path(id): Path<u64>,
) -> Response {
    match state.controller().resume(CampaignId::from_u64(id)) {
        Ok(()) => action_response(id, "resume", None),
        Err(err) => error_response(err),
    }
}

/// Cancel a campaign.
pub async fn cancel_campaign_handler(
    State(state): State<Arc<AdminState>>,
    Path(id): Path<u64>,
) -> Response {
    match state.controller().cancel(CampaignId::from_u64(id)) {
        Ok(()) => action_response(id, "cancel", None),
        Err(err) => error_response(err),
    }
}

/// Plan contacts added after campaign start.
pub async fn sync_campaign_handler(
    State(state): State<Arc<AdminState>>,
    Path(id): Path<u64>,
) -> Response {
    match state.controller().sync_contacts(CampaignId::from_u64(id)) {
        Ok(added) => action_response(id, "sync", Some(added)),
        Err(err) => error_response(err),
    }
}

/// Per-campaign stats handler.
pub async fn campaign_stats_handler(
    State(state): State<Arc<AdminState>>,
    Path(id): Path<u64>,
) -> Response {
    match state.controller().stats(CampaignId::from_u64(id)) {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(err) => error_response(err),
    }
}
