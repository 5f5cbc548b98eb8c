//! Duplicate-engagement guard.
//!
//! A side mapping from (tenant, phone) to the most recent campaign that
//! claimed the number. The engine claims at first dispatch and consults the
//! mapping before every send so a contact already engaged by a fresher
//! campaign (or an open conversation owned by it) is not double-messaged.
//! Last-claimed-wins; the engine never mutates a claim after creation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::campaign::{CampaignId, TenantId};

/// The most recent engagement recorded for a (tenant, phone) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementRef {
    /// Campaign that owns the engagement
    pub campaign_id: CampaignId,
    /// When the claim was made
    pub claimed_at: DateTime<Utc>,
}

/// Lookup and claim of per-phone engagements.
pub trait DedupGuard: Send + Sync {
    /// Most recent engagement for the pair, if any.
    fn most_recent_engagement(&self, tenant: TenantId, phone: &str) -> Option<EngagementRef>;

    /// Claim the pair for a campaign. Overwrites any earlier claim.
    fn claim(&self, tenant: TenantId, phone: &str, campaign: CampaignId, at: DateTime<Utc>);
}

/// Shared dedup guard handle.
pub type SharedDedup = Arc<dyn DedupGuard>;

/// In-memory dedup guard for development and tests.
#[derive(Default)]
pub struct MemoryDedupGuard {
    engagements: RwLock<HashMap<(TenantId, String), EngagementRef>>,
}

impl MemoryDedupGuard {
    /// Create an empty guard.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DedupGuard for MemoryDedupGuard {
    fn most_recent_engagement(&self, tenant: TenantId, phone: &str) -> Option<EngagementRef> {
        self.engagements
            .read()
            .unwrap()
            .get(&(tenant, phone.to_string()))
            .copied()
    }

    fn claim(&self, tenant: TenantId, phone: &str, campaign: CampaignId, at: DateTime<Utc>) {
        self.engagements.write().unwrap().insert(
            (tenant, phone.to_string()),
            EngagementRef {
                campaign_id: campaign,
                claimed_at: at,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_and_lookup() {
        let guard = MemoryDedupGuard::new();
        let tenant = TenantId::from_u64(1);
        let now = Utc::now();

        assert!(guard.most_recent_engagement(tenant, "+1").is_none());

        guard.claim(tenant, "+1", CampaignId::from_u64(10), now);
        let eng = guard.most_recent_engagement(tenant, "+1").unwrap();
        assert_eq!(eng.campaign_id, CampaignId::from_u64(10));

        // Tenants are isolated.
        assert!(guard
            .most_recent_engagement(TenantId::from_u64(2), "+1")
            .is_none());
    }

    #[test]
    fn test_last_claim_wins() {
        let guard = MemoryDedupGuard::new();
        let tenant = TenantId::from_u64(1);
        let now = Utc::now();

        guard.claim(tenant, "+1", CampaignId::from_u64(10), now);
        guard.claim(
            tenant,
            "+1",
            CampaignId::from_u64(20),
            now + chrono::Duration::minutes(1),
        );

        let eng = guard.most_recent_engagement(tenant, "+1").unwrap();
        assert_eq!(eng.campaign_id, CampaignId::from_u64(20));
    }
}
