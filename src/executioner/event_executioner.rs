use crate::campaign::store::CampaignStore;
use crate::campaign::{Event, LeadEventLog};
use crate::executioner::counter::Counter;
use crate::executioner::dispatcher::{ActionDispatcher, DispatchOutcome};
use crate::executioner::error::{ExecutionError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

pub struct EventExecutioner<'a> {
    store: &'a CampaignStore,
    dispatcher: &'a dyn ActionDispatcher,
}

impl<'a> EventExecutioner<'a> {
    pub fn new(store: &'a CampaignStore, dispatcher: &'a dyn ActionDispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Runs `event` for every log and persists each log's outcome. A failing
    /// contact is recorded as failed without stopping the rest of the batch.
    pub fn execute_logs(
        &self,
        event: &Event,
        logs: &[LeadEventLog],
        counter: &mut Counter,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if logs.is_empty() {
            return Ok(());
        }
        debug!(event_id = event.id, count = logs.len(), "CAMPAIGN: executing logs");

        let outcome = self
            .dispatcher
            .dispatch(event, logs, now)
            .map_err(|err| ExecutionError::Dispatch {
                event_id: event.id,
                reason: format!("{err:#}"),
            })?;
        let (passed, failed) = reconcile(logs, &outcome)?;

        self.store.record_results(&passed, &failed, now)?;
        counter.advance_executed(passed.len());
        Ok(())
    }

    pub fn record_logs_with_error(
        &self,
        logs: &[LeadEventLog],
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if logs.is_empty() {
            return Ok(());
        }
        debug!(count = logs.len(), reason, "CAMPAIGN: recording logs as failed");
        let failed = logs
            .iter()
            .map(|log| (log.id, reason.to_string()))
            .collect::<Vec<_>>();
        self.store.record_results(&[], &failed, now)?;
        Ok(())
    }
}

/// Checks that each log of the batch was either passed or failed, once.
/// Ids outside the batch are ignored.
fn reconcile(
    logs: &[LeadEventLog],
    outcome: &DispatchOutcome,
) -> Result<(Vec<i64>, Vec<(i64, String)>)> {
    let passed_ids = outcome.passed.iter().copied().collect::<HashSet<_>>();
    let mut passed = Vec::new();
    let mut failed = Vec::new();

    for log in logs {
        let reason = outcome
            .failed
            .iter()
            .find(|(id, _)| *id == log.id)
            .map(|(_, reason)| reason.clone());
        match (passed_ids.contains(&log.id), reason) {
            (true, Some(_)) => return Err(ExecutionError::LogPassedAndFailed { log_id: log.id }),
            (true, None) => passed.push(log.id),
            (false, Some(reason)) => failed.push((log.id, reason)),
            (false, None) => return Err(ExecutionError::LogNotProcessed { log_id: log.id }),
        }
    }
    Ok((passed, failed))
}
