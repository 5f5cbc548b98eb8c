//! Campaign lifecycle control.
//!
//! State machine over campaigns: Draft -(start)-> Active -(pause)-> Paused
//! -(resume)-> Active; Active/Paused -(cancel)-> Canceled; Active ->
//! Completed when the dispatcher observes zero remaining non-terminal
//! contacts. Only validation errors surface synchronously; everything else
//! is visible through stats and the event bus.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bootstrap::{EngineState, Event, SharedEngineState};
use crate::campaign::{
    Campaign, CampaignId, CampaignRepository, CampaignStatus, ContactRepository,
};
use crate::clock::Clock;
use crate::planner::{advance_into_window, BatchPlanner};
use crate::queue::{EntryKey, QueueError, QueueStore};
use crate::tenant::TenantResolver;

/// Control-surface error. `NotFound` also covers campaigns owned by another
/// tenant so existence does not leak across tenants.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("campaign not found")]
    NotFound,

    #[error("invalid campaign state: {0}")]
    InvalidState(CampaignStatus),

    #[error("campaign has no pending contacts")]
    EmptyContactList,

    #[error(transparent)]
    Store(#[from] QueueError),
}

/// Per-campaign stats snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignStats {
    pub campaign_id: u64,
    pub status: String,
    pub total: u64,
    pub reached: u64,
    pub pending: u64,
    pub sent: u64,
    pub failed: u64,
    pub responded: u64,
    pub converted: u64,
    pub opted_out: u64,
}

/// Global engine stats snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalStats {
    pub queue_depth: u64,
    pub in_flight: u64,
    pub send_permit_utilization: f64,
    pub send_permits: u64,
    pub drain_permits: u64,
    pub active_campaigns: u64,
}

/// Exposes start/pause/resume/cancel/stats and enforces campaign-state
/// transitions.
pub struct CampaignLifecycleController {
    state: SharedEngineState,
    planner: BatchPlanner,
}

impl CampaignLifecycleController {
    pub fn new(state: SharedEngineState) -> Self {
        let planner = BatchPlanner::new(state.config.dispatch.clone());
        Self { state, planner }
    }

    fn authorized(&self, id: CampaignId) -> Result<Campaign, LifecycleError> {
        let campaign = self.state.campaigns.get(id).ok_or(LifecycleError::NotFound)?;
        if campaign.tenant_id != self.state.tenants.current_tenant() {
            return Err(LifecycleError::NotFound);
        }
        Ok(campaign)
    }

    /// Start a Draft campaign: plan the schedule, enqueue every pending
    /// contact, and activate. Rejected if the campaign is not Draft, its
    /// window has closed, or it has no contacts.
    pub fn start(&self, id: CampaignId) -> Result<(), LifecycleError> {
        let campaign = self.authorized(id)?;

        if campaign.status != CampaignStatus::Draft {
            return Err(LifecycleError::InvalidState(campaign.status));
        }

        let now = self.state.clock.now();
        if campaign.window_expired(now) {
            return Err(LifecycleError::InvalidState(campaign.status));
        }

        let contacts = self.state.contacts.pending_for_campaign(id);
        if contacts.is_empty() {
            return Err(LifecycleError::EmptyContactList);
        }

        let start_at = campaign.starts_at.map(|s| s.max(now)).unwrap_or(now);
        let entries = self.planner.plan(&campaign, &contacts, start_at, 0);
        for entry in &entries {
            self.state.queue.enqueue(entry.clone())?;
        }

        let planned = entries.len() as u64;
        self.state.campaigns.update(
            id,
            Box::new(move |c| {
                c.mark_started(start_at);
                c.planned_contacts = planned;
            }),
        );

        info!(
            campaign_id = %id,
            contacts = entries.len(),
            start_at = %start_at,
            "campaign started"
        );
        self.state.events.publish(Event::CampaignStarted {
            campaign_id: id,
            contacts: entries.len(),
        });

        Ok(())
    }

    /// Pause an Active campaign. The status flips first so no new sends are
    /// drained, then every queue entry is parked at the sentinel; pause
    /// takes effect within one tick. In-flight sends complete.
    pub fn pause(&self, id: CampaignId) -> Result<(), LifecycleError> {
        let campaign = self.authorized(id)?;

        if campaign.status != CampaignStatus::Active {
            return Err(LifecycleError::InvalidState(campaign.status));
        }

        self.state.campaigns.update(id, Box::new(|c| c.mark_paused()));
        let parked = self.state.queue.pause_campaign(id)?;

        info!(campaign_id = %id, parked, "campaign paused");
        self.state.events.publish(Event::CampaignPaused {
            campaign_id: id,
            parked,
        });

        Ok(())
    }

    /// Resume a Paused campaign: parked entries become due now (shifted
    /// into the business-hour window when configured).
    pub fn resume(&self, id: CampaignId) -> Result<(), LifecycleError> {
        let campaign = self.authorized(id)?;

        if campaign.status != CampaignStatus::Paused {
            return Err(LifecycleError::InvalidState(campaign.status));
        }

        let dispatch = &self.state.config.dispatch;
        let mut due = self.state.clock.now();
        if dispatch.business_hours_only {
            due = advance_into_window(
                due,
                dispatch.business_start_hour,
                dispatch.business_end_hour,
            );
        }

        self.state
            .campaigns
            .update(id, Box::new(|c| c.mark_resumed()));
        let released = self.state.queue.resume_campaign(id, due)?;

        info!(campaign_id = %id, released, due = %due, "campaign resumed");
        self.state.events.publish(Event::CampaignResumed {
            campaign_id: id,
            released,
        });

        Ok(())
    }

    /// Cancel an Active or Paused campaign and purge its queue entries.
    pub fn cancel(&self, id: CampaignId) -> Result<(), LifecycleError> {
        let campaign = self.authorized(id)?;

        if !matches!(
            campaign.status,
            CampaignStatus::Active | CampaignStatus::Paused
        ) {
            return Err(LifecycleError::InvalidState(campaign.status));
        }

        let now = self.state.clock.now();
        self.state
            .campaigns
            .update(id, Box::new(move |c| c.mark_canceled(now)));
        let purged = self.state.queue.purge_campaign(id)?;

        info!(campaign_id = %id, purged, "campaign canceled");
        self.state.events.publish(Event::CampaignCanceled {
            campaign_id: id,
            purged,
        });

        Ok(())
    }

    /// Plan contacts added after campaign start, continuing the existing
    /// batch cadence. Returns how many new entries were scheduled.
    pub fn sync_contacts(&self, id: CampaignId) -> Result<u64, LifecycleError> {
        let campaign = self.authorized(id)?;

        if campaign.status != CampaignStatus::Active {
            return Err(LifecycleError::InvalidState(campaign.status));
        }

        let mut fresh = Vec::new();
        for contact in self.state.contacts.pending_for_campaign(id) {
            if contact.attempts == 0 && !self.state.queue.contains(EntryKey::new(id, contact.id))? {
                fresh.push(contact);
            }
        }
        if fresh.is_empty() {
            return Ok(0);
        }

        let start_at = campaign.started_at.unwrap_or_else(|| self.state.clock.now());
        let entries = self
            .planner
            .plan(&campaign, &fresh, start_at, campaign.planned_contacts);
        for entry in &entries {
            self.state.queue.enqueue(entry.clone())?;
        }

        let added = entries.len() as u64;
        self.state.campaigns.update(
            id,
            Box::new(move |c| {
                c.planned_contacts += added;
                c.total_contacts = c.total_contacts.max(c.planned_contacts);
            }),
        );

        debug!(campaign_id = %id, added, "late contacts planned");
        Ok(added)
    }

    /// Read-only per-campaign stats.
    pub fn stats(&self, id: CampaignId) -> Result<CampaignStats, LifecycleError> {
        let campaign = self.authorized(id)?;
        let counts = self.state.contacts.counts_for_campaign(id);

        Ok(CampaignStats {
            campaign_id: id.as_u64(),
            status: campaign.status.name().to_string(),
            total: campaign.total_contacts,
            reached: campaign.reached,
            pending: counts.pending,
            sent: counts.sent,
            failed: counts.failed,
            responded: counts.responded,
            converted: counts.converted,
            opted_out: counts.opted_out,
        })
    }

    /// Read-only global view across all active campaigns.
    pub fn global_stats(&self) -> GlobalStats {
        GlobalStats {
            queue_depth: self.state.queue.depth().unwrap_or(0),
            in_flight: self.state.gate.in_flight() as u64,
            send_permit_utilization: self.state.gate.send_utilization(),
            send_permits: self.state.gate.send_capacity() as u64,
            drain_permits: self.state.gate.drain_capacity() as u64,
            active_campaigns: self.state.campaigns.active_count() as u64,
        }
    }
}

/// Transition an Active campaign to Completed once no non-terminal contacts
/// remain. Driven by the dispatcher after each terminal contact outcome,
/// never by an external caller.
pub fn maybe_complete_campaign(state: &EngineState, id: CampaignId) {
    let Some(campaign) = state.campaigns.get(id) else {
        return;
    };
    if campaign.status != CampaignStatus::Active {
        return;
    }
    if state.contacts.non_terminal_count(id) > 0 {
        return;
    }

    let now = state.clock.now();
    state.campaigns.update(
        id,
        Box::new(move |c| {
            if c.status == CampaignStatus::Active {
                c.mark_completed(now);
            }
        }),
    );
    state.counters.inc_campaigns_completed();
    state
        .events
        .publish(Event::CampaignCompleted { campaign_id: id });
    info!(campaign_id = %id, "campaign completed");
}
