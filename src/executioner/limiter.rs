use anyhow::{Result, bail};

pub const DEFAULT_BATCH_LIMIT: usize = 100;

/// Batch size and contact scope for one run. Built once, then read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactLimiter {
    batch_limit: usize,
    contact_id: Option<i64>,
    min_contact_id: Option<i64>,
    max_contact_id: Option<i64>,
    contact_ids: Vec<i64>,
    threads: Option<(u32, u32)>,
}

impl Default for ContactLimiter {
    fn default() -> Self {
        Self {
            batch_limit: DEFAULT_BATCH_LIMIT,
            contact_id: None,
            min_contact_id: None,
            max_contact_id: None,
            contact_ids: Vec::new(),
            threads: None,
        }
    }
}

impl ContactLimiter {
    pub fn new(batch_limit: usize) -> Result<Self> {
        if batch_limit == 0 {
            bail!("batch limit must be a positive integer");
        }
        Ok(Self {
            batch_limit,
            ..Self::default()
        })
    }

    pub fn with_contact_id(mut self, contact_id: i64) -> Self {
        self.contact_id = Some(contact_id);
        self
    }

    pub fn with_contact_id_range(mut self, min: Option<i64>, max: Option<i64>) -> Result<Self> {
        if let (Some(min), Some(max)) = (min, max)
            && min > max
        {
            bail!("min contact id {min} is greater than max contact id {max}");
        }
        self.min_contact_id = min;
        self.max_contact_id = max;
        Ok(self)
    }

    pub fn with_contact_ids(mut self, mut contact_ids: Vec<i64>) -> Self {
        contact_ids.sort_unstable();
        contact_ids.dedup();
        self.contact_ids = contact_ids;
        self
    }

    /// Restricts the run to the contacts owned by `thread_id` (1-based) out of
    /// `max_threads` processes sharing the population.
    pub fn with_threads(mut self, thread_id: u32, max_threads: u32) -> Result<Self> {
        if max_threads == 0 {
            bail!("max threads must be a positive integer");
        }
        if thread_id == 0 || thread_id > max_threads {
            bail!("thread id must be between 1 and {max_threads}, got {thread_id}");
        }
        self.threads = Some((thread_id, max_threads));
        Ok(self)
    }

    pub fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    pub fn contact_id(&self) -> Option<i64> {
        self.contact_id
    }

    pub fn min_contact_id(&self) -> Option<i64> {
        self.min_contact_id
    }

    pub fn max_contact_id(&self) -> Option<i64> {
        self.max_contact_id
    }

    pub fn contact_ids(&self) -> &[i64] {
        &self.contact_ids
    }

    pub fn threads(&self) -> Option<(u32, u32)> {
        self.threads
    }
}
