use crate::campaign::{Campaign, LeadEventLog};
use crate::executioner::LogRepository;
use crate::executioner::clock::Clock;
use crate::executioner::contact_finder::{Hydration, ScheduledContactFinder};
use crate::executioner::counter::Counter;
use crate::executioner::error::Result;
use crate::executioner::event_executioner::EventExecutioner;
use crate::executioner::limiter::ContactLimiter;
use crate::executioner::output::{NullOutput, Output};
use crate::executioner::scheduler::EventScheduler;
use chrono::{DateTime, Utc};
use tracing::debug;

pub const CAMPAIGN_UNPUBLISHED: &str = "campaign unpublished";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RescheduleMode {
    Individually,
    /// One write, every log moved to the latest computed due time.
    Together,
}

/// Drives due logs of a campaign, or an explicit set of logs, through
/// validation, contact hydration and execution.
pub struct ScheduledExecutioner<'a> {
    repo: &'a dyn LogRepository,
    scheduler: &'a dyn EventScheduler,
    contact_finder: ScheduledContactFinder<'a>,
    executioner: EventExecutioner<'a>,
    clock: &'a dyn Clock,
}

impl<'a> ScheduledExecutioner<'a> {
    pub fn new(
        repo: &'a dyn LogRepository,
        scheduler: &'a dyn EventScheduler,
        contact_finder: ScheduledContactFinder<'a>,
        executioner: EventExecutioner<'a>,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            repo,
            scheduler,
            contact_finder,
            executioner,
            clock,
        }
    }

    pub fn execute(
        &mut self,
        campaign: &Campaign,
        limiter: &ContactLimiter,
        output: Option<&mut dyn Output>,
    ) -> Result<Counter> {
        let mut null = NullOutput;
        let output: &mut dyn Output = match output {
            Some(output) => output,
            None => &mut null,
        };
        let mut counter = Counter::default();
        let now = self.clock.now();

        debug!(campaign_id = campaign.id, "CAMPAIGN: triggering scheduled events");
        let mut counts = self.repo.get_scheduled_counts(campaign.id, now, limiter)?;
        let total = counts.iter().map(|c| c.count).sum::<usize>();
        debug!(total, "CAMPAIGN: events scheduled to execute");
        output.writeln(&format!(
            "{total} total events(s) to be processed in batches of {} contacts",
            limiter.batch_limit()
        ));
        if total == 0 {
            debug!("CAMPAIGN: no events to process");
            return Ok(counter);
        }

        // Jump-to events last, otherwise ascending id.
        counts.sort_by_key(|c| (c.kind.execution_rank(), c.event_id));
        output.start(total);
        let result = counts.iter().try_for_each(|c| {
            counter.advance_event_count();
            self.execute_scheduled(c.event_id, now, limiter, &mut counter, &mut *output)
        });
        output.finish();
        result.map(|()| counter)
    }

    pub fn execute_by_ids(
        &mut self,
        log_ids: &[i64],
        output: Option<&mut dyn Output>,
    ) -> Result<Counter> {
        let mut null = NullOutput;
        let output: &mut dyn Output = match output {
            Some(output) => output,
            None => &mut null,
        };
        let mut counter = Counter::default();
        if log_ids.is_empty() {
            return Ok(counter);
        }

        let now = self.clock.now();
        let logs = self.repo.get_scheduled_by_ids(log_ids)?;
        let total = logs.len();
        counter.advance_evaluated(total);
        debug!(total, "CAMPAIGN: events scheduled to execute");
        output.writeln(&format!(
            "{total} total events(s) to be processed in batches of n/a contacts"
        ));
        if total == 0 {
            return Ok(counter);
        }

        output.start(total);
        let result = organize_by_event(logs)
            .into_iter()
            .try_for_each(|group| self.execute_group(group, now, &mut counter, &mut *output));
        self.contact_finder.clear();
        output.finish();
        result.map(|()| counter)
    }

    fn execute_scheduled(
        &mut self,
        event_id: i64,
        now: DateTime<Utc>,
        limiter: &ContactLimiter,
        counter: &mut Counter,
        output: &mut dyn Output,
    ) -> Result<()> {
        let mut logs = self.repo.get_scheduled(event_id, now, limiter)?;
        while !logs.is_empty() {
            let Hydration::Found(hydrated) = self.contact_finder.hydrate_contacts(logs)? else {
                break;
            };
            let event = hydrated[0].event.clone();
            output.advance(hydrated.len());
            counter.advance_evaluated(hydrated.len());

            let due = self.validate_schedule(hydrated, now, counter, RescheduleMode::Individually)?;
            self.executioner.execute_logs(&event, &due, counter, now)?;

            self.contact_finder.clear();
            logs = self.repo.get_scheduled(event_id, now, limiter)?;
        }
        Ok(())
    }

    fn execute_group(
        &mut self,
        group: Vec<LeadEventLog>,
        now: DateTime<Utc>,
        counter: &mut Counter,
        output: &mut dyn Output,
    ) -> Result<()> {
        let size = group.len();
        let event = group[0].event.clone();
        counter.advance_event_count();

        let due = self.validate_schedule(group, now, counter, RescheduleMode::Together)?;
        if !due.is_empty() {
            let published = self
                .repo
                .campaign(event.campaign_id)?
                .is_some_and(|campaign| campaign.is_published_at(now));
            if published {
                match self.contact_finder.hydrate_contacts(due)? {
                    Hydration::Found(hydrated) => {
                        self.executioner.execute_logs(&event, &hydrated, counter, now)?
                    }
                    Hydration::Empty => {
                        debug!(event_id = event.id, "CAMPAIGN: no contacts left for event");
                    }
                }
            } else {
                debug!(event_id = event.id, "CAMPAIGN: campaign unpublished, failing logs");
                self.executioner
                    .record_logs_with_error(&due, CAMPAIGN_UNPUBLISHED, now)?;
            }
        }

        output.advance(size);
        Ok(())
    }

    /// Returns the logs still due at `now`; the rest are rescheduled.
    fn validate_schedule(
        &self,
        logs: Vec<LeadEventLog>,
        now: DateTime<Utc>,
        counter: &mut Counter,
        mode: RescheduleMode,
    ) -> Result<Vec<LeadEventLog>> {
        let mut due = Vec::with_capacity(logs.len());
        let mut deferred = Vec::new();
        let mut latest = now;

        for log in logs {
            let execution = self.scheduler.validate_execution_date_time(&log, now)?;
            debug!(
                log_id = log.id,
                execution = %execution,
                now = %now,
                "CAMPAIGN: validated execution time"
            );
            if !self.scheduler.should_schedule(execution, now) {
                due.push(log);
                continue;
            }

            counter.advance_total_scheduled(1);
            match mode {
                RescheduleMode::Individually => self.scheduler.reschedule(&log, execution)?,
                RescheduleMode::Together => {
                    latest = latest.max(execution);
                    deferred.push(log);
                }
            }
        }

        if !deferred.is_empty() {
            self.scheduler.reschedule_logs(&deferred, latest)?;
        }
        Ok(due)
    }
}

/// Groups logs by event in discovery order, jump-to events last.
fn organize_by_event(logs: Vec<LeadEventLog>) -> Vec<Vec<LeadEventLog>> {
    let mut groups: Vec<Vec<LeadEventLog>> = Vec::new();
    for log in logs {
        match groups.iter_mut().find(|g| g[0].event.id == log.event.id) {
            Some(group) => group.push(log),
            None => groups.push(vec![log]),
        }
    }
    groups.sort_by_key(|group| group[0].event.kind.execution_rank());
    groups
}
