//! Campaign and contact repositories.
//!
//! Persistence of campaigns and contacts belongs to the surrounding
//! application; the engine consumes these traits and only transitions status
//! fields and attempt counts. Updates go through a closure so each record
//! mutation is atomic with respect to concurrent callers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::types::{
    Campaign, CampaignContact, CampaignId, CampaignStatus, ContactCounts, ContactId,
};

/// Read/update access to campaigns.
pub trait CampaignRepository: Send + Sync {
    /// Get a campaign by ID.
    fn get(&self, id: CampaignId) -> Option<Campaign>;

    /// Update a campaign in place using a closure. Returns false if absent.
    fn update(&self, id: CampaignId, f: Box<dyn FnOnce(&mut Campaign) + Send>) -> bool;

    /// Insert a campaign (ingestion side; the engine never calls this).
    fn insert(&self, campaign: Campaign);

    /// Number of campaigns currently Active.
    fn active_count(&self) -> usize;
}

/// Read/update access to campaign contacts.
pub trait ContactRepository: Send + Sync {
    /// Get a contact by ID.
    fn get(&self, id: ContactId) -> Option<CampaignContact>;

    /// Update a contact in place using a closure. Returns false if absent.
    fn update(&self, id: ContactId, f: Box<dyn FnOnce(&mut CampaignContact) + Send>) -> bool;

    /// Insert a contact (ingestion side; the engine never calls this).
    fn insert(&self, contact: CampaignContact);

    /// All Pending contacts of a campaign, ordered by contact ID.
    fn pending_for_campaign(&self, id: CampaignId) -> Vec<CampaignContact>;

    /// Contact counts by status for a campaign.
    fn counts_for_campaign(&self, id: CampaignId) -> ContactCounts;

    /// Number of contacts of a campaign not yet in a terminal state.
    fn non_terminal_count(&self, id: CampaignId) -> usize;
}

/// Shared repository handles.
pub type SharedCampaigns = Arc<dyn CampaignRepository>;
pub type SharedContacts = Arc<dyn ContactRepository>;

/// In-memory campaign repository for development and tests.
#[derive(Default)]
pub struct MemoryCampaignRepository {
    campaigns: RwLock<HashMap<CampaignId, Campaign>>,
}

impl MemoryCampaignRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CampaignRepository for MemoryCampaignRepository {
    fn get(&self, id: CampaignId) -> Option<Campaign> {
        self.campaigns.read().unwrap().get(&id).cloned()
    }

    fn update(&self, id: CampaignId, f: Box<dyn FnOnce(&mut Campaign) + Send>) -> bool {
        let mut campaigns = self.campaigns.write().unwrap();
        match campaigns.get_mut(&id) {
            Some(campaign) => {
                f(campaign);
                true
            }
            None => false,
        }
    }

    fn insert(&self, campaign: Campaign) {
        self.campaigns.write().unwrap().insert(campaign.id, campaign);
    }

    fn active_count(&self) -> usize {
        self.campaigns
            .read()
            .unwrap()
            .values()
            .filter(|c| c.status == CampaignStatus::Active)
            .count()
    }
}

/// In-memory contact repository for development and tests.
#[derive(Default)]
pub struct MemoryContactRepository {
    contacts: RwLock<HashMap<ContactId, CampaignContact>>,
}

impl MemoryContactRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContactRepository for MemoryContactRepository {
    fn get(&self, id: ContactId) -> Option<CampaignContact> {
        self.contacts.read().unwrap().get(&id).cloned()
    }

    fn update(&self, id: ContactId, f: Box<dyn FnOnce(&mut CampaignContact) + Send>) -> bool {
        let mut contacts = self.contacts.write().unwrap();
        match contacts.get_mut(&id) {
            Some(contact) => {
                f(contact);
                true
            }
            None => false,
        }
    }

    fn insert(&self, contact: CampaignContact) {
        self.contacts.write().unwrap().insert(contact.id, contact);
    }

    fn pending_for_campaign(&self, id: CampaignId) -> Vec<CampaignContact> {
        let mut pending: Vec<_> = self
            .contacts
            .read()
            .unwrap()
            .values()
            .filter(|c| c.campaign_id == id && !c.status.is_terminal())
            .cloned()
            .collect();
        pending.sort_by_key(|c| c.id);
        pending
    }

    fn counts_for_campaign(&self, id: CampaignId) -> ContactCounts {
        let mut counts = ContactCounts::default();
        for contact in self.contacts.read().unwrap().values() {
            if contact.campaign_id == id {
                counts.record(contact.status);
            }
        }
        counts
    }

    fn non_terminal_count(&self, id: CampaignId) -> usize {
        self.contacts
            .read()
            .unwrap()
            .values()
            .filter(|c| c.campaign_id == id && !c.status.is_terminal())
            .count()
    }
}
