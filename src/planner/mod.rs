//! Batch planner.
//!
//! Turns a campaign's pending contacts into queue entries: optional
//! deterministic shuffle, partition into batches, per-slot jitter delay,
//! inter-batch pause, and business-hour gating. All pacing is expressed as
//! due-times in the queue store; no worker ever sleeps through a delay.

use chrono::{DateTime, Duration, Timelike, Utc};
use tracing::debug;

use crate::campaign::{Campaign, CampaignContact, CampaignId};
use crate::config::DispatchConfig;
use crate::queue::QueueEntry;

/// Simple xorshift PRNG.
///
/// Seeded per campaign so planning is reproducible: re-running the planner
/// for the same contacts produces the same schedule.
pub struct Xorshift {
    state: u64,
}

impl Xorshift {
    /// Create a PRNG from a non-zero seed.
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.max(1),
        }
    }

    fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform value in `[min, max]` (inclusive).
    pub fn uniform(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = (max - min) as u64 + 1;
        min + (self.next() % span) as i64
    }

    /// Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        let n = items.len();
        for i in (1..n).rev() {
            let j = (self.next() % (i as u64 + 1)) as usize;
            items.swap(i, j);
        }
    }
}

/// Advance an instant into the `[start_hour, end_hour)` window.
///
/// Forward-only: the result is never earlier than the input. Applied
/// repeatedly until the instant lands in-window (an early-morning time moves
/// to the same day's opening hour, a late one to the next day's).
pub fn advance_into_window(due: DateTime<Utc>, start_hour: u32, end_hour: u32) -> DateTime<Utc> {
    if start_hour >= end_hour || end_hour > 24 {
        return due;
    }

    let mut due = due;
    loop {
        let hour = due.hour();
        if hour >= start_hour && hour < end_hour {
            return due;
        }

        let day = if hour < start_hour {
            due.date_naive()
        } else {
            due.date_naive() + Duration::days(1)
        };
        due = match day.and_hms_opt(start_hour, 0, 0) {
            Some(naive) => naive.and_utc(),
            None => return due,
        };
    }
}

fn plan_seed(campaign: CampaignId, cursor: u64) -> u64 {
    campaign.as_u64().wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ cursor
}

/// Computes the dispatch schedule for a campaign's contacts.
pub struct BatchPlanner {
    config: DispatchConfig,
}

impl BatchPlanner {
    /// Create a planner over an immutable dispatch config snapshot.
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    /// Expected wall-clock length of one full batch, in milliseconds.
    pub fn estimated_batch_duration_ms(&self) -> i64 {
        let min_ms = self.config.min_delay.as_millis() as i64;
        let max_ms = self.config.max_delay.as_millis() as i64;
        self.config.batch_size as i64 * ((min_ms + max_ms) / 2)
    }

    /// Plan queue entries for `contacts` of `campaign`.
    ///
    /// `cursor` is the number of contacts already planned for this campaign;
    /// positions continue from it so contacts added after campaign start
    /// keep the existing batch cadence instead of restarting numbering.
    pub fn plan(
        &self,
        campaign: &Campaign,
        contacts: &[CampaignContact],
        start: DateTime<Utc>,
        cursor: u64,
    ) -> Vec<QueueEntry> {
        let mut ordered: Vec<&CampaignContact> = contacts.iter().collect();
        let mut rng = Xorshift::new(plan_seed(campaign.id, cursor));
        if self.config.randomize_order {
            rng.shuffle(&mut ordered);
        }

        let batch_size = self.config.batch_size as u64;
        let cycle_ms =
            self.estimated_batch_duration_ms() + self.config.batch_pause.as_millis() as i64;
        let min_ms = self.config.min_delay.as_millis() as i64;
        let max_ms = self.config.max_delay.as_millis() as i64;

        let entries: Vec<QueueEntry> = ordered
            .iter()
            .enumerate()
            .map(|(idx, contact)| {
                let position = cursor + idx as u64;
                let batch_index = (position / batch_size) as i64;
                let slot = (position % batch_size) as i64;
                let jitter = rng.uniform(min_ms, max_ms);

                let mut due =
                    start + Duration::milliseconds(batch_index * cycle_ms + slot * jitter);
                if self.config.business_hours_only {
                    due = advance_into_window(
                        due,
                        self.config.business_start_hour,
                        self.config.business_end_hour,
                    );
                }

                QueueEntry::new(campaign.id, contact.id, campaign.tenant_id, due)
            })
            .collect();

        debug!(
            campaign_id = %campaign.id,
            contacts = entries.len(),
            cursor,
            batches = entries.len().div_ceil(self.config.batch_size),
            "campaign schedule planned"
        );

        entries
    }
}
