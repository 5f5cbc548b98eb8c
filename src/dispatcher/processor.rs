//! Per-entry dispatch processing.
//!
//! Each drained entry runs through the same gauntlet: campaign still
//! active, contact still pending, no fresher engagement on the phone, a
//! send permit available - then one provider call under a hard timeout.
//! Every skip path is deliberate about whether the entry goes back to the
//! queue (capacity, pause race) or is dropped (terminal states). A contact
//! failure never affects sibling entries; each runs in its own task.

use tracing::{debug, info, instrument, warn};

use crate::bootstrap::{Event, SharedEngineState};
use crate::campaign::{CampaignRepository, CampaignStatus, ContactRepository};
use crate::clock::Clock;
use crate::dedup::DedupGuard;
use crate::lifecycle::maybe_complete_campaign;
use crate::provider::{MessagePayload, ProviderClient, SendError};
use crate::queue::{paused_due, QueueEntry, QueueStore};

use super::retry::RetryCoordinator;

/// Dispatch one claimed queue entry.
#[instrument(skip_all, fields(campaign_id = %entry.campaign_id, contact_id = %entry.contact_id))]
pub async fn dispatch_entry(state: SharedEngineState, entry: QueueEntry) {
    let Some(campaign) = state.campaigns.get(entry.campaign_id) else {
        debug!("campaign not found, dropping entry");
        state.counters.inc_state_conflicts();
        return;
    };

    match campaign.status {
        CampaignStatus::Active => {}
        CampaignStatus::Draft => {
            // start() is mid-flight: entries land in the queue before the
            // status flips. Defer to the next tick.
            if let Err(e) = state.queue.enqueue(entry.clone()) {
                warn!(error = %e, "failed to defer entry of draft campaign");
                state.counters.inc_queue_errors();
            }
            state.counters.inc_state_conflicts();
            debug!("campaign not yet active, entry deferred");
            return;
        }
        CampaignStatus::Paused => {
            // Pause raced this tick's dequeue: park the entry again, retry
            // count untouched.
            let mut parked = entry.clone();
            parked.due_at = paused_due();
            if let Err(e) = state.queue.enqueue(parked) {
                warn!(error = %e, "failed to re-park entry of paused campaign");
                state.counters.inc_queue_errors();
            }
            state.counters.inc_state_conflicts();
            debug!("campaign paused, entry re-parked");
            return;
        }
        status => {
            debug!(status = %status, "campaign no longer dispatchable, dropping entry");
            state.counters.inc_state_conflicts();
            return;
        }
    }

    let Some(contact) = state.contacts.get(entry.contact_id) else {
        debug!("contact not found, dropping entry");
        state.counters.inc_state_conflicts();
        return;
    };

    if contact.status.is_terminal() {
        debug!(status = %contact.status, "contact already terminal, skipping");
        state.counters.inc_state_conflicts();
        return;
    }

    let now = state.clock.now();

    // Dedup guard: a fresher engagement by a different campaign owns this
    // phone. Last-claimed-wins; the loser is suppressed, not failed.
    match state
        .dedup
        .most_recent_engagement(entry.tenant_id, &contact.phone)
    {
        Some(engagement) if engagement.campaign_id != entry.campaign_id => {
            state.contacts.update(
                entry.contact_id,
                Box::new(|c| c.mark_opt_out("suppressed: phone engaged by another campaign")),
            );
            state.counters.inc_duplicates_suppressed();
            info!(winner = %engagement.campaign_id, "duplicate suppressed");
            state.events.publish(Event::DuplicateSuppressed {
                campaign_id: entry.campaign_id,
                contact_id: entry.contact_id,
                winner: engagement.campaign_id,
            });
            maybe_complete_campaign(&state, entry.campaign_id);
            return;
        }
        Some(_) => {}
        None => {
            state
                .dedup
                .claim(entry.tenant_id, &contact.phone, entry.campaign_id, now);
        }
    }

    // Capacity: without a permit the entry simply waits for the next tick.
    // No state mutation, no retry consumed.
    let Some(permit) = state.gate.try_send_permit() else {
        if let Err(e) = state.queue.enqueue(entry.clone()) {
            warn!(error = %e, "failed to return deferred entry to queue");
            state.counters.inc_queue_errors();
        }
        state.counters.inc_capacity_deferred();
        debug!("send permits exhausted, entry deferred");
        return;
    };

    let attempts = contact.attempts + 1;
    state
        .contacts
        .update(entry.contact_id, Box::new(move |c| c.mark_attempt(now)));

    let payload = MessagePayload {
        campaign_id: campaign.id,
        body: campaign.message_body.clone(),
    };

    let result = tokio::time::timeout(
        state.config.dispatch.message_timeout,
        state.provider.send(&contact.phone, &payload),
    )
    .await;

    // Permit covers exactly the provider call.
    drop(permit);

    match result {
        Ok(Ok(ack)) => {
            state
                .contacts
                .update(entry.contact_id, Box::new(|c| c.mark_sent()));
            state
                .campaigns
                .update(entry.campaign_id, Box::new(|c| c.record_reached()));
            state.counters.inc_messages_sent();
            debug!(message_id = %ack.message_id, attempt = attempts, "message sent");
            state.events.publish(Event::ContactSent {
                campaign_id: entry.campaign_id,
                contact_id: entry.contact_id,
                message_id: ack.message_id,
            });
            maybe_complete_campaign(&state, entry.campaign_id);
        }
        Ok(Err(err)) => {
            RetryCoordinator::new(state.clone()).handle_failure(&entry, attempts, &err);
        }
        Err(_elapsed) => {
            RetryCoordinator::new(state.clone()).handle_failure(
                &entry,
                attempts,
                &SendError::Timeout,
            );
        }
    }
}
