pub mod clock;
pub mod contact_finder;
pub mod counter;
pub mod dispatcher;
pub mod error;
pub mod event_executioner;
pub mod limiter;
pub mod output;
pub mod scheduled;
pub mod scheduler;

use crate::campaign::{Campaign, EventKind, LeadEventLog};
use anyhow::Result;
use chrono::{DateTime, Utc};
use limiter::ContactLimiter;

pub use clock::{Clock, FixedClock, SystemClock};
pub use contact_finder::{Hydration, ScheduledContactFinder};
pub use counter::Counter;
pub use dispatcher::{ActionDispatcher, ActionHandler, ActionRegistry, DispatchOutcome};
pub use error::{ExecutionError, ScheduleViolation};
pub use event_executioner::EventExecutioner;
pub use output::{ConsoleOutput, NullOutput, Output};
pub use scheduled::{CAMPAIGN_UNPUBLISHED, ScheduledExecutioner};
pub use scheduler::{EventScheduler, StoreScheduler};

/// Due logs of one event, as counted before a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledCount {
    pub event_id: i64,
    pub kind: EventKind,
    pub count: usize,
}

/// Source of due logs for the scheduled executioner.
pub trait LogRepository {
    /// Due log counts per event, ascending by event id.
    fn get_scheduled_counts(
        &self,
        campaign_id: i64,
        now: DateTime<Utc>,
        limiter: &ContactLimiter,
    ) -> Result<Vec<ScheduledCount>>;

    /// Next batch (at most `limiter.batch_limit()`) of due logs for one event.
    fn get_scheduled(
        &self,
        event_id: i64,
        now: DateTime<Utc>,
        limiter: &ContactLimiter,
    ) -> Result<Vec<LeadEventLog>>;

    /// Still-scheduled logs among `log_ids`, regardless of due time.
    fn get_scheduled_by_ids(&self, log_ids: &[i64]) -> Result<Vec<LeadEventLog>>;

    fn campaign(&self, campaign_id: i64) -> Result<Option<Campaign>>;
}
