use crate::campaign::store::CampaignStore;
use crate::campaign::{Event, IntervalUnit, LeadEventLog, TriggerMode};
use crate::executioner::error::{ExecutionError, Result, ScheduleViolation};
use chrono::{DateTime, Datelike, Days, Months, NaiveTime, TimeDelta, Utc};
use tracing::debug;

pub trait EventScheduler {
    /// Authoritative due time for `log` under the event's current rules.
    fn validate_execution_date_time(
        &self,
        log: &LeadEventLog,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>>;

    /// True when `execution` is still ahead of `now` and the log must wait.
    fn should_schedule(&self, execution: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        execution > now
    }

    fn reschedule(&self, log: &LeadEventLog, at: DateTime<Utc>) -> Result<()>;

    /// Moves all `logs` to `at` as one write.
    fn reschedule_logs(&self, logs: &[LeadEventLog], at: DateTime<Utc>) -> Result<()>;
}

pub struct StoreScheduler<'a> {
    store: &'a CampaignStore,
}

impl<'a> StoreScheduler<'a> {
    pub fn new(store: &'a CampaignStore) -> Self {
        Self { store }
    }
}

impl EventScheduler for StoreScheduler<'_> {
    fn validate_execution_date_time(
        &self,
        log: &LeadEventLog,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        if log.trigger_date.is_none() {
            return Ok(now);
        }
        execution_date_time(&log.event, now, log.date_triggered).map_err(|source| {
            ExecutionError::NotSchedulable {
                log_id: log.id,
                source,
            }
        })
    }

    fn reschedule(&self, log: &LeadEventLog, at: DateTime<Utc>) -> Result<()> {
        debug!(log_id = log.id, at = %at, "CAMPAIGN: rescheduling log");
        self.store.reschedule(&[log.id], at)?;
        Ok(())
    }

    fn reschedule_logs(&self, logs: &[LeadEventLog], at: DateTime<Utc>) -> Result<()> {
        debug!(count = logs.len(), at = %at, "CAMPAIGN: rescheduling logs together");
        let ids = logs.iter().map(|log| log.id).collect::<Vec<_>>();
        self.store.reschedule(&ids, at)?;
        Ok(())
    }
}

/// Due time of `event` for a contact scheduled at `compare_from`.
pub fn execution_date_time(
    event: &Event,
    now: DateTime<Utc>,
    compare_from: DateTime<Utc>,
) -> std::result::Result<DateTime<Utc>, ScheduleViolation> {
    match event.trigger {
        TriggerMode::Immediate => Ok(now),
        TriggerMode::Date(at) => Ok(at),
        TriggerMode::Interval { amount, unit } => {
            if amount < 0 {
                return Err(ScheduleViolation::NegativeInterval(amount));
            }
            let base = add_interval(compare_from, amount, unit).ok_or(ScheduleViolation::OutOfRange)?;
            apply_restrictions(event, unit, base)
        }
    }
}

fn add_interval(from: DateTime<Utc>, amount: i64, unit: IntervalUnit) -> Option<DateTime<Utc>> {
    match unit {
        IntervalUnit::Minute => from.checked_add_signed(TimeDelta::try_minutes(amount)?),
        IntervalUnit::Hour => from.checked_add_signed(TimeDelta::try_hours(amount)?),
        IntervalUnit::Day => from.checked_add_signed(TimeDelta::try_days(amount)?),
        IntervalUnit::Week => from.checked_add_signed(TimeDelta::try_weeks(amount)?),
        IntervalUnit::Month => from.checked_add_months(Months::new(u32::try_from(amount).ok()?)),
        IntervalUnit::Year => {
            let months = u32::try_from(amount.checked_mul(12)?).ok()?;
            from.checked_add_months(Months::new(months))
        }
    }
}

fn apply_restrictions(
    event: &Event,
    unit: IntervalUnit,
    mut at: DateTime<Utc>,
) -> std::result::Result<DateTime<Utc>, ScheduleViolation> {
    if let Some(hour) = event.trigger_hour
        && unit.is_day_or_longer()
    {
        at = at_time(at, hour);
    } else if let (Some(start), Some(stop)) = (event.restricted_start_hour, event.restricted_stop_hour)
    {
        if start >= stop {
            return Err(ScheduleViolation::InvertedWindow { start, stop });
        }
        if at.time() < start {
            at = at_time(at, start);
        } else if at.time() > stop {
            at = at_time(next_day(at)?, start);
        }
    }

    if !event.restricted_days.is_empty() {
        while !event.restricted_days.contains(&at.weekday()) {
            at = next_day(at)?;
        }
    }
    Ok(at)
}

fn at_time(at: DateTime<Utc>, time: NaiveTime) -> DateTime<Utc> {
    at.date_naive().and_time(time).and_utc()
}

fn next_day(at: DateTime<Utc>) -> std::result::Result<DateTime<Utc>, ScheduleViolation> {
    at.checked_add_days(Days::new(1))
        .ok_or(ScheduleViolation::OutOfRange)
}
