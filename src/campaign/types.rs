//! Core campaign domain types.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

/// Unique campaign identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CampaignId(u64);

/// Global campaign ID counter (used by the in-memory repository).
pub static CAMPAIGN_COUNTER: AtomicU64 = AtomicU64::new(1);

impl CampaignId {
    /// Allocate the next local campaign ID.
    pub fn next() -> Self {
        Self(CAMPAIGN_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a campaign ID from a raw value.
    pub fn from_u64(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique campaign-contact identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId(u64);

/// Global contact ID counter (used by the in-memory repository).
pub static CONTACT_COUNTER: AtomicU64 = AtomicU64::new(1);

impl ContactId {
    /// Allocate the next local contact ID.
    pub fn next() -> Self {
        Self(CONTACT_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a contact ID from a raw value.
    pub fn from_u64(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tenant identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenantId(u64);

impl TenantId {
    /// Create a tenant ID from a raw value.
    pub fn from_u64(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Campaign lifecycle state.
///
/// Transitions are monotone except Active <-> Paused:
/// Draft -> Active -> {Paused, Completed, Canceled}, Paused -> {Active, Canceled}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CampaignStatus {
    /// Created, not yet started
    Draft,
    /// Dispatching
    Active,
    /// Dispatching suspended, resumable
    Paused,
    /// All contacts reached a terminal state
    Completed,
    /// Aborted by an operator
    Canceled,
}

impl CampaignStatus {
    /// Check if the campaign can never dispatch again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }

    /// Get the string name of this status.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Delivery state of a single (campaign, contact) pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactStatus {
    /// Waiting to be dispatched
    Pending,
    /// Message accepted by the provider
    Sent,
    /// Delivery failed permanently or retries exhausted
    Failed,
    /// Contact replied to the campaign message
    Responded,
    /// Contact converted (handled by the conversation subsystem)
    Converted,
    /// Contact must not be messaged by this campaign
    OptOut,
}

impl ContactStatus {
    /// Check if the contact is done as far as dispatch is concerned.
    ///
    /// Everything except Pending is terminal: once any other status is
    /// recorded, no further sends occur for this contact in this campaign.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Get the string name of this status.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Responded => "responded",
            Self::Converted => "converted",
            Self::OptOut => "opt_out",
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A bulk-messaging campaign.
///
/// Rows are created by the ingestion pipeline; the dispatch engine only
/// transitions `status` and advances the counters.
#[derive(Debug, Clone)]
pub struct Campaign {
    /// Unique campaign ID
    pub id: CampaignId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Display name
    pub name: String,
    /// Lifecycle state
    pub status: CampaignStatus,
    /// Materialized message body (template already rendered)
    pub message_body: String,
    /// Source template, if any
    pub template_id: Option<u64>,
    /// Total contacts attached to this campaign
    pub total_contacts: u64,
    /// Contacts successfully messaged
    pub reached: u64,
    /// Contacts already scheduled (cadence continuation cursor)
    pub planned_contacts: u64,
    /// Earliest dispatch instant, if scheduled ahead
    pub starts_at: Option<DateTime<Utc>>,
    /// End of the campaign window, if bounded
    pub ends_at: Option<DateTime<Utc>>,
    /// When the campaign was created
    pub created_at: DateTime<Utc>,
    /// When dispatch began
    pub started_at: Option<DateTime<Utc>>,
    /// When the campaign reached a terminal state
    pub finished_at: Option<DateTime<Utc>>,
}

impl Campaign {
    /// Create a new draft campaign.
    pub fn new(
        id: CampaignId,
        tenant_id: TenantId,
        name: impl Into<String>,
        message_body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            name: name.into(),
            status: CampaignStatus::Draft,
            message_body: message_body.into(),
            template_id: None,
            total_contacts: 0,
            reached: 0,
            planned_contacts: 0,
            starts_at: None,
            ends_at: None,
            created_at,
            started_at: None,
            finished_at: None,
        }
    }

    /// Set the source template ID.
    pub fn with_template(mut self, template_id: u64) -> Self {
        self.template_id = Some(template_id);
        self
    }

    /// Set the total contact count.
    pub fn with_total_contacts(mut self, total: u64) -> Self {
        self.total_contacts = total;
        self
    }

    /// Set the dispatch window.
    pub fn with_window(
        mut self,
        starts_at: Option<DateTime<Utc>>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.starts_at = starts_at;
        self.ends_at = ends_at;
        self
    }

    /// Check whether the campaign window has already closed.
    pub fn window_expired(&self, now: DateTime<Utc>) -> bool {
        self.ends_at.is_some_and(|ends| ends <= now)
    }

    /// Mark as started.
    pub fn mark_started(&mut self, now: DateTime<Utc>) {
        self.status = CampaignStatus::Active;
        self.started_at = Some(now);
    }

    /// Mark as paused.
    pub fn mark_paused(&mut self) {
        self.status = CampaignStatus::Paused;
    }

    /// Mark as resumed.
    pub fn mark_resumed(&mut self) {
        self.status = CampaignStatus::Active;
    }

    /// Mark as canceled.
    pub fn mark_canceled(&mut self, now: DateTime<Utc>) {
        self.status = CampaignStatus::Canceled;
        self.finished_at = Some(now);
    }

    /// Mark as completed.
    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        self.status = CampaignStatus::Completed;
        self.finished_at = Some(now);
    }

    /// Record one more contact reached. Invariant: reached <= total_contacts.
    pub fn record_reached(&mut self) {
        self.reached = (self.reached + 1).min(self.total_contacts);
    }
}

/// One (campaign, customer) pairing with its own delivery status.
#[derive(Debug, Clone)]
pub struct CampaignContact {
    /// Unique contact ID
    pub id: ContactId,
    /// Owning campaign
    pub campaign_id: CampaignId,
    /// Customer reference in the contact store
    pub customer_id: u64,
    /// Destination phone number
    pub phone: String,
    /// Delivery state
    pub status: ContactStatus,
    /// Send attempts made so far
    pub attempts: u32,
    /// When the last attempt was made
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Error from the last failed attempt
    pub last_error: Option<String>,
}

impl CampaignContact {
    /// Create a new pending contact.
    pub fn new(
        id: ContactId,
        campaign_id: CampaignId,
        customer_id: u64,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            id,
            campaign_id,
            customer_id,
            phone: phone.into(),
            status: ContactStatus::Pending,
            attempts: 0,
            last_attempt_at: None,
            last_error: None,
        }
    }

    /// Record a provider attempt.
    pub fn mark_attempt(&mut self, now: DateTime<Utc>) {
        self.attempts += 1;
        self.last_attempt_at = Some(now);
    }

    /// Mark as sent.
    pub fn mark_sent(&mut self) {
        self.status = ContactStatus::Sent;
        self.last_error = None;
    }

    /// Mark as failed with a reason.
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.status = ContactStatus::Failed;
        self.last_error = Some(reason.into());
    }

    /// Mark as opted out (do-not-message for this campaign).
    pub fn mark_opt_out(&mut self, reason: impl Into<String>) {
        self.status = ContactStatus::OptOut;
        self.last_error = Some(reason.into());
    }
}

/// Contact counts by status for one campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactCounts {
    /// Contacts waiting to be dispatched
    pub pending: u64,
    /// Contacts messaged successfully
    pub sent: u64,
    /// Contacts that failed permanently
    pub failed: u64,
    /// Contacts that replied
    pub responded: u64,
    /// Contacts that converted
    pub converted: u64,
    /// Contacts suppressed or opted out
    pub opted_out: u64,
}

impl ContactCounts {
    /// Total contacts counted.
    pub fn total(&self) -> u64 {
        self.pending + self.sent + self.failed + self.responded + self.converted + self.opted_out
    }

    /// Add one contact by status.
    pub fn record(&mut self, status: ContactStatus) {
        match status {
            ContactStatus::Pending => self.pending += 1,
            ContactStatus::Sent => self.sent += 1,
            ContactStatus::Failed => self.failed += 1,
            ContactStatus::Responded => self.responded += 1,
            ContactStatus::Converted => self.converted += 1,
            ContactStatus::OptOut => self.opted_out += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_campaign_status_terminal() {
        assert!(!CampaignStatus::Draft.is_terminal());
        assert!(!CampaignStatus::Active.is_terminal());
        assert!(!CampaignStatus::Paused.is_terminal());
        assert!(CampaignStatus::Completed.is_terminal());
        assert!(CampaignStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_contact_status_terminal() {
        assert!(!ContactStatus::Pending.is_terminal());
        assert!(ContactStatus::Sent.is_terminal());
        assert!(ContactStatus::Failed.is_terminal());
        assert!(ContactStatus::Responded.is_terminal());
        assert!(ContactStatus::Converted.is_terminal());
        assert!(ContactStatus::OptOut.is_terminal());
    }

    #[test]
    fn test_status_names() {
        assert_eq!(CampaignStatus::Active.name(), "active");
        assert_eq!(CampaignStatus::Paused.name(), "paused");
        assert_eq!(ContactStatus::OptOut.name(), "opt_out");
        assert_eq!(ContactStatus::Pending.name(), "pending");
    }

    #[test]
    fn test_contact_attempt_tracking() {
        let now = Utc::now();
        let mut contact =
            CampaignContact::new(ContactId::from_u64(1), CampaignId::from_u64(1), 7, "+258840000001");

        assert_eq!(contact.attempts, 0);
        assert!(contact.last_attempt_at.is_none());

        contact.mark_attempt(now);
        assert_eq!(contact.attempts, 1);
        assert_eq!(contact.last_attempt_at, Some(now));

        contact.mark_failed("provider rejected");
        assert_eq!(contact.status, ContactStatus::Failed);
        assert_eq!(contact.last_error.as_deref(), Some("provider rejected"));
    }

    #[test]
    fn test_campaign_lifecycle_marks() {
        let now = Utc::now();
        let mut campaign = Campaign::new(
            CampaignId::from_u64(1),
            TenantId::from_u64(1),
            "spring-promo",
            "Hello!",
            now,
        )
        .with_total_contacts(10);

        assert_eq!(campaign.status, CampaignStatus::Draft);

        campaign.mark_started(now);
        assert_eq!(campaign.status, CampaignStatus::Active);
        assert_eq!(campaign.started_at, Some(now));

        campaign.mark_paused();
        assert_eq!(campaign.status, CampaignStatus::Paused);

        campaign.mark_resumed();
        assert_eq!(campaign.status, CampaignStatus::Active);

        campaign.mark_completed(now);
        assert_eq!(campaign.status, CampaignStatus::Completed);
        assert_eq!(campaign.finished_at, Some(now));
    }

    #[test]
    fn test_campaign_window_expired() {
        let now = Utc::now();
        let campaign = Campaign::new(
            CampaignId::from_u64(1),
            TenantId::from_u64(1),
            "expired",
            "Hi",
            now,
        )
        .with_window(None, Some(now - chrono::Duration::hours(1)));

        assert!(campaign.window_expired(now));
    }

    #[test]
    fn test_contact_counts() {
        let mut counts = ContactCounts::default();
        counts.record(ContactStatus::Pending);
        counts.record(ContactStatus::Pending);
        counts.record(ContactStatus::Sent);
        counts.record(ContactStatus::OptOut);

        assert_eq!(counts.pending, 2);
        assert_eq!(counts.sent, 1);
        assert_eq!(counts.opted_out, 1);
        assert_eq!(counts.total(), 4);
    }
}
