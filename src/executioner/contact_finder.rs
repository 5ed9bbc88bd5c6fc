use crate::campaign::store::CampaignStore;
use crate::campaign::{Contact, LeadEventLog};
use crate::executioner::error::Result;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

#[derive(Debug)]
pub enum Hydration {
    Found(Vec<LeadEventLog>),
    /// No log in the batch has a contact left to act on.
    Empty,
}

/// Attaches contact records to scheduled logs, caching contacts until
/// [`ScheduledContactFinder::clear`] is called between batches.
pub struct ScheduledContactFinder<'a> {
    store: &'a CampaignStore,
    contacts: HashMap<i64, Contact>,
}

impl<'a> ScheduledContactFinder<'a> {
    pub fn new(store: &'a CampaignStore) -> Self {
        Self {
            store,
            contacts: HashMap::new(),
        }
    }

    pub fn hydrate_contacts(&mut self, logs: Vec<LeadEventLog>) -> Result<Hydration> {
        if logs.is_empty() {
            return Ok(Hydration::Empty);
        }

        let missing = logs
            .iter()
            .map(|log| log.contact_id)
            .filter(|id| !self.contacts.contains_key(id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            let found = self.store.get_contacts(&missing)?;
            self.contacts.extend(found);
        }

        let mut hydrated = Vec::with_capacity(logs.len());
        for mut log in logs {
            match self.contacts.get(&log.contact_id) {
                Some(contact) => {
                    log.contact = Some(contact.clone());
                    hydrated.push(log);
                }
                None => {
                    // contact deleted after the batch was fetched
                    warn!(
                        log_id = log.id,
                        contact_id = log.contact_id,
                        "CAMPAIGN: contact not found, dropping log from batch"
                    );
                }
            }
        }

        if hydrated.is_empty() {
            debug!("CAMPAIGN: no contacts found for batch");
            return Ok(Hydration::Empty);
        }
        Ok(Hydration::Found(hydrated))
    }

    pub fn clear(&mut self) {
        self.contacts.clear();
    }

    #[cfg(test)]
    fn cached_contacts(&self) -> usize {
        self.contacts.len()
    }
}
