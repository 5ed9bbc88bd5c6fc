use cadence::campaign::store::CampaignStore;
use cadence::campaign::{
    Campaign, Contact, Event, EventKind, IntervalUnit, LeadEventLog, LogStatus, NewLog,
    TriggerMode,
};
use cadence::executioner::limiter::ContactLimiter;
use cadence::executioner::{
    ActionDispatcher, ActionHandler, ActionRegistry, CAMPAIGN_UNPUBLISHED, Clock,
    DispatchOutcome, EventExecutioner, EventScheduler, ExecutionError, FixedClock, LogRepository,
    Output, ScheduleViolation, ScheduledContactFinder, ScheduledCount, ScheduledExecutioner,
    StoreScheduler,
};
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use std::cell::RefCell;

fn fixture_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
}

fn store_with_campaign() -> (CampaignStore, Campaign) {
    let store = CampaignStore::open_in_memory().unwrap();
    let campaign = store.create_campaign(&Campaign::new("Onboarding")).unwrap();
    (store, campaign)
}

fn add_event(store: &CampaignStore, event: Event) -> Event {
    store.create_event(&event).unwrap()
}

fn add_contact(store: &CampaignStore, email: &str) -> Contact {
    store.create_contact(&Contact::new(email)).unwrap()
}

fn add_log(
    store: &CampaignStore,
    event: &Event,
    contact: &Contact,
    date_triggered: DateTime<Utc>,
    trigger_date: DateTime<Utc>,
) -> i64 {
    store
        .append_log(&NewLog::scheduled(event, contact.id, date_triggered, trigger_date))
        .unwrap()
}

fn log(store: &CampaignStore, id: i64) -> LeadEventLog {
    store.get_log(id).unwrap().unwrap()
}

fn executioner<'a>(
    store: &'a CampaignStore,
    repo: &'a dyn LogRepository,
    scheduler: &'a dyn EventScheduler,
    dispatcher: &'a dyn ActionDispatcher,
    clock: &'a dyn Clock,
) -> ScheduledExecutioner<'a> {
    ScheduledExecutioner::new(
        repo,
        scheduler,
        ScheduledContactFinder::new(store),
        EventExecutioner::new(store, dispatcher),
        clock,
    )
}

/// Passes every contact except those whose email starts with "fail".
struct RejectFailAddresses;

impl ActionHandler for RejectFailAddresses {
    fn handle(&self, _event: &Event, log: &LeadEventLog, _now: DateTime<Utc>) -> anyhow::Result<()> {
        match log.contact.as_ref().and_then(|c| c.email.as_deref()) {
            Some(email) if email.starts_with("fail") => anyhow::bail!("mailbox rejected"),
            _ => Ok(()),
        }
    }
}

fn registry(store: &CampaignStore) -> ActionRegistry<'_> {
    let mut registry = ActionRegistry::with_builtins(store);
    registry.register("email.send", RejectFailAddresses);
    registry
}

#[derive(Default)]
struct RecordingOutput {
    calls: Vec<String>,
}

impl Output for RecordingOutput {
    fn writeln(&mut self, line: &str) {
        self.calls.push(format!("writeln {line}"));
    }

    fn start(&mut self, total: usize) {
        self.calls.push(format!("start {total}"));
    }

    fn advance(&mut self, step: usize) {
        self.calls.push(format!("advance {step}"));
    }

    fn finish(&mut self) {
        self.calls.push("finish".to_string());
    }
}

struct CountingRepo<'a> {
    inner: &'a CampaignStore,
    calls: RefCell<usize>,
    fetches: RefCell<Vec<usize>>,
}

impl<'a> CountingRepo<'a> {
    fn new(inner: &'a CampaignStore) -> Self {
        Self {
            inner,
            calls: RefCell::new(0),
            fetches: RefCell::new(Vec::new()),
        }
    }
}

impl LogRepository for CountingRepo<'_> {
    fn get_scheduled_counts(
        &self,
        campaign_id: i64,
        now: DateTime<Utc>,
        limiter: &ContactLimiter,
    ) -> anyhow::Result<Vec<ScheduledCount>> {
        *self.calls.borrow_mut() += 1;
        self.inner.get_scheduled_counts(campaign_id, now, limiter)
    }

    fn get_scheduled(
        &self,
        event_id: i64,
        now: DateTime<Utc>,
        limiter: &ContactLimiter,
    ) -> anyhow::Result<Vec<LeadEventLog>> {
        *self.calls.borrow_mut() += 1;
        let logs = self.inner.get_scheduled(event_id, now, limiter)?;
        self.fetches.borrow_mut().push(logs.len());
        Ok(logs)
    }

    fn get_scheduled_by_ids(&self, log_ids: &[i64]) -> anyhow::Result<Vec<LeadEventLog>> {
        *self.calls.borrow_mut() += 1;
        self.inner.get_scheduled_by_ids(log_ids)
    }

    fn campaign(&self, campaign_id: i64) -> anyhow::Result<Option<Campaign>> {
        *self.calls.borrow_mut() += 1;
        self.inner.campaign(campaign_id)
    }
}

struct RecordingScheduler<'a> {
    inner: StoreScheduler<'a>,
    single: RefCell<Vec<(i64, DateTime<Utc>)>>,
    grouped: RefCell<Vec<(Vec<i64>, DateTime<Utc>)>>,
}

impl<'a> RecordingScheduler<'a> {
    fn new(store: &'a CampaignStore) -> Self {
        Self {
            inner: StoreScheduler::new(store),
            single: RefCell::new(Vec::new()),
            grouped: RefCell::new(Vec::new()),
        }
    }
}

impl EventScheduler for RecordingScheduler<'_> {
    fn validate_execution_date_time(
        &self,
        log: &LeadEventLog,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, ExecutionError> {
        self.inner.validate_execution_date_time(log, now)
    }

    fn reschedule(&self, log: &LeadEventLog, at: DateTime<Utc>) -> Result<(), ExecutionError> {
        self.single.borrow_mut().push((log.id, at));
        self.inner.reschedule(log, at)
    }

    fn reschedule_logs(&self, logs: &[LeadEventLog], at: DateTime<Utc>) -> Result<(), ExecutionError> {
        let ids = logs.iter().map(|l| l.id).collect();
        self.grouped.borrow_mut().push((ids, at));
        self.inner.reschedule_logs(logs, at)
    }
}

/// Passes every log and remembers the order events were dispatched in.
#[derive(Default)]
struct RecordingDispatcher {
    events: RefCell<Vec<i64>>,
}

impl ActionDispatcher for RecordingDispatcher {
    fn dispatch(
        &self,
        event: &Event,
        logs: &[LeadEventLog],
        _now: DateTime<Utc>,
    ) -> anyhow::Result<DispatchOutcome> {
        self.events.borrow_mut().push(event.id);
        Ok(DispatchOutcome {
            passed: logs.iter().map(|l| l.id).collect(),
            failed: Vec::new(),
        })
    }
}

struct DownDispatcher;

impl ActionDispatcher for DownDispatcher {
    fn dispatch(
        &self,
        _event: &Event,
        _logs: &[LeadEventLog],
        _now: DateTime<Utc>,
    ) -> anyhow::Result<DispatchOutcome> {
        anyhow::bail!("provider unavailable")
    }
}

#[test]
fn nothing_due_returns_zero_counter_without_progress() {
    let (store, campaign) = store_with_campaign();
    let now = fixture_now();
    let event = add_event(&store, Event::new(campaign.id, "send", EventKind::Action, "email.send"));
    let contact = add_contact(&store, "later@example.com");
    add_log(&store, &event, &contact, now, now + Duration::days(1));

    let clock = FixedClock::new(now);
    let scheduler = StoreScheduler::new(&store);
    let dispatcher = RecordingDispatcher::default();
    let mut output = RecordingOutput::default();
    let counter = executioner(&store, &store, &scheduler, &dispatcher, &clock)
        .execute(&campaign, &ContactLimiter::new(10).unwrap(), Some(&mut output))
        .unwrap();

    assert_eq!(counter.event_count(), 0);
    assert_eq!(counter.evaluated_count(), 0);
    assert_eq!(counter.executed_count(), 0);
    assert_eq!(counter.total_scheduled_count(), 0);
    assert_eq!(
        output.calls,
        vec!["writeln 0 total events(s) to be processed in batches of 10 contacts"]
    );
    assert!(dispatcher.events.borrow().is_empty());
}

#[test]
fn drains_due_logs_in_bounded_batches() {
    let (store, campaign) = store_with_campaign();
    let now = fixture_now();
    let event = add_event(&store, Event::new(campaign.id, "send", EventKind::Action, "email.send"));
    for i in 0..25 {
        let contact = add_contact(&store, &format!("c{i}@example.com"));
        add_log(&store, &event, &contact, now - Duration::hours(1), now - Duration::minutes(1));
    }

    let clock = FixedClock::new(now);
    let repo = CountingRepo::new(&store);
    let scheduler = StoreScheduler::new(&store);
    let dispatcher = registry(&store);
    let mut output = RecordingOutput::default();
    let counter = executioner(&store, &repo, &scheduler, &dispatcher, &clock)
        .execute(&campaign, &ContactLimiter::new(10).unwrap(), Some(&mut output))
        .unwrap();

    assert_eq!(*repo.fetches.borrow(), vec![10, 10, 5, 0]);
    assert_eq!(counter.event_count(), 1);
    assert_eq!(counter.evaluated_count(), 25);
    assert_eq!(counter.executed_count(), 25);
    assert_eq!(
        output.calls,
        vec![
            "writeln 25 total events(s) to be processed in batches of 10 contacts",
            "start 25",
            "advance 10",
            "advance 10",
            "advance 5",
            "finish",
        ]
    );
}

#[test]
fn every_log_ends_in_one_state_and_a_second_run_is_a_no_op() {
    let (store, campaign) = store_with_campaign();
    let now = fixture_now();
    let send = add_event(&store, Event::new(campaign.id, "send", EventKind::Action, "email.send"));
    let follow_up = add_event(
        &store,
        Event::new(campaign.id, "follow up", EventKind::Action, "email.send"),
    );
    let ok = add_contact(&store, "ok@example.com");
    let also_ok = add_contact(&store, "also-ok@example.com");
    let bounced = add_contact(&store, "fail@example.com");
    let due = now - Duration::minutes(5);
    let executed_a = add_log(&store, &send, &ok, due, due);
    let executed_b = add_log(&store, &send, &also_ok, due, due);
    let failed = add_log(&store, &send, &bounced, due, due);
    let moved = add_log(&store, &follow_up, &ok, now - Duration::days(1), now - Duration::hours(1));
    // The event now waits two days after the contact was scheduled.
    store
        .update_event_schedule(&follow_up.clone().with_trigger(TriggerMode::Interval {
            amount: 2,
            unit: IntervalUnit::Day,
        }))
        .unwrap();

    let clock = FixedClock::new(now);
    let scheduler = StoreScheduler::new(&store);
    let dispatcher = registry(&store);
    let limiter = ContactLimiter::new(10).unwrap();
    let mut runner = executioner(&store, &store, &scheduler, &dispatcher, &clock);

    let counter = runner.execute(&campaign, &limiter, None).unwrap();
    assert_eq!(counter.event_count(), 2);
    assert_eq!(counter.evaluated_count(), 4);
    assert_eq!(counter.executed_count(), 2);
    assert_eq!(counter.total_scheduled_count(), 1);

    for id in [executed_a, executed_b] {
        let log = log(&store, id);
        assert_eq!(log.status, LogStatus::Executed);
        assert_eq!(log.date_executed, Some(now));
    }
    let failed = log(&store, failed);
    assert_eq!(failed.status, LogStatus::Failed);
    assert_eq!(failed.failure_reason.as_deref(), Some("mailbox rejected"));
    let moved = log(&store, moved);
    assert_eq!(moved.status, LogStatus::Pending);
    assert_eq!(moved.trigger_date, Some(now + Duration::days(1)));

    let before = store.list_logs(campaign.id).unwrap();
    let again = runner.execute(&campaign, &limiter, None).unwrap();
    assert_eq!(again.evaluated_count(), 0);
    assert_eq!(again.executed_count(), 0);
    assert_eq!(again.total_scheduled_count(), 0);
    let after = store.list_logs(campaign.id).unwrap();
    let states = |logs: &[LeadEventLog]| {
        logs.iter()
            .map(|l| (l.id, l.status, l.trigger_date))
            .collect::<Vec<_>>()
    };
    assert_eq!(states(&before), states(&after));
}

#[test]
fn jump_to_groups_run_after_other_events() {
    let (store, campaign) = store_with_campaign();
    let now = fixture_now();
    let target = add_event(&store, Event::new(campaign.id, "target", EventKind::Action, "email.send"));
    let jump = add_event(&store, Event::jump_to(campaign.id, "jump", target.id));
    let send = add_event(&store, Event::new(campaign.id, "send", EventKind::Action, "email.send"));
    let contact = add_contact(&store, "a@example.com");
    let ids = vec![
        add_log(&store, &jump, &contact, now, now),
        add_log(&store, &send, &contact, now, now),
        add_log(&store, &jump, &contact, now, now),
    ];

    let clock = FixedClock::new(now);
    let scheduler = StoreScheduler::new(&store);
    let dispatcher = RecordingDispatcher::default();
    let counter = executioner(&store, &store, &scheduler, &dispatcher, &clock)
        .execute_by_ids(&ids, None)
        .unwrap();

    assert_eq!(*dispatcher.events.borrow(), vec![send.id, jump.id]);
    assert_eq!(counter.event_count(), 2);
    assert_eq!(counter.evaluated_count(), 3);
    assert_eq!(counter.executed_count(), 3);
}

#[test]
fn execute_runs_jump_to_events_after_lower_ranked_ones() {
    let (store, campaign) = store_with_campaign();
    let now = fixture_now();
    let jump = add_event(&store, Event::jump_to(campaign.id, "jump", 99));
    let send = add_event(&store, Event::new(campaign.id, "send", EventKind::Action, "email.send"));
    assert!(jump.id < send.id);
    let contact = add_contact(&store, "a@example.com");
    let due = now - Duration::minutes(1);
    add_log(&store, &jump, &contact, due, due);
    add_log(&store, &send, &contact, due, due);

    let clock = FixedClock::new(now);
    let scheduler = StoreScheduler::new(&store);
    let dispatcher = RecordingDispatcher::default();
    let counter = executioner(&store, &store, &scheduler, &dispatcher, &clock)
        .execute(&campaign, &ContactLimiter::new(10).unwrap(), None)
        .unwrap();

    assert_eq!(*dispatcher.events.borrow(), vec![send.id, jump.id]);
    assert_eq!(counter.event_count(), 2);
    assert_eq!(counter.executed_count(), 2);
}

#[test]
fn self_targeting_jump_fails_its_log_and_the_run_ends() {
    let (store, campaign) = store_with_campaign();
    let now = fixture_now();
    let looped = add_event(&store, Event::jump_to(campaign.id, "loop", 1));
    assert_eq!(looped.id, 1);
    let contact = add_contact(&store, "a@example.com");
    let id = add_log(&store, &looped, &contact, now, now);

    let clock = FixedClock::new(now);
    let scheduler = StoreScheduler::new(&store);
    let dispatcher = registry(&store);
    let counter = executioner(&store, &store, &scheduler, &dispatcher, &clock)
        .execute(&campaign, &ContactLimiter::new(10).unwrap(), None)
        .unwrap();

    assert_eq!(counter.evaluated_count(), 1);
    assert_eq!(counter.executed_count(), 0);
    let failed = log(&store, id);
    assert_eq!(failed.status, LogStatus::Failed);
    assert!(failed.failure_reason.unwrap().contains("targets itself"));
    assert_eq!(store.list_logs(campaign.id).unwrap().len(), 1);
}

#[test]
fn jump_into_a_pending_event_of_the_same_run_waits_for_the_next_pass() {
    let (store, campaign) = store_with_campaign();
    let now = fixture_now();
    let send = add_event(&store, Event::new(campaign.id, "send", EventKind::Action, "email.send"));
    let first = add_event(&store, Event::jump_to(campaign.id, "first", 3));
    let second = add_event(&store, Event::jump_to(campaign.id, "second", send.id));
    assert_eq!((send.id, first.id, second.id), (1, 2, 3));
    let contact = add_contact(&store, "a@example.com");
    let due = now - Duration::minutes(1);
    add_log(&store, &first, &contact, due, due);
    add_log(&store, &second, &contact, due, due);

    let clock = FixedClock::new(now);
    let scheduler = StoreScheduler::new(&store);
    let dispatcher = registry(&store);
    let limiter = ContactLimiter::new(10).unwrap();
    let mut runner = executioner(&store, &store, &scheduler, &dispatcher, &clock);

    let counter = runner.execute(&campaign, &limiter, None).unwrap();
    assert_eq!(counter.evaluated_count(), 2);
    assert_eq!(counter.executed_count(), 2);
    let pending = store
        .list_logs(campaign.id)
        .unwrap()
        .into_iter()
        .filter(|l| l.status == LogStatus::Pending)
        .map(|l| (l.event.id, l.trigger_date))
        .collect::<Vec<_>>();
    let next = Some(now + Duration::seconds(1));
    assert_eq!(pending.len(), 2);
    assert!(pending.contains(&(second.id, next)));
    assert!(pending.contains(&(send.id, next)));

    clock.advance(Duration::seconds(1));
    let again = runner.execute(&campaign, &limiter, None).unwrap();
    assert_eq!(again.evaluated_count(), 2);
    assert_eq!(again.executed_count(), 2);
}

#[test]
fn schedule_errors_abort_both_entry_points_and_finish_progress() {
    let (store, campaign) = store_with_campaign();
    let now = fixture_now();
    let event = add_event(&store, Event::new(campaign.id, "send", EventKind::Action, "email.send"));
    let contact = add_contact(&store, "a@example.com");
    let id = add_log(&store, &event, &contact, now - Duration::hours(2), now - Duration::hours(1));
    let mut inverted = event.clone().with_trigger(TriggerMode::Interval {
        amount: 1,
        unit: IntervalUnit::Hour,
    });
    inverted.restricted_start_hour = NaiveTime::from_hms_opt(17, 0, 0);
    inverted.restricted_stop_hour = NaiveTime::from_hms_opt(9, 0, 0);
    store.update_event_schedule(&inverted).unwrap();

    let clock = FixedClock::new(now);
    let scheduler = StoreScheduler::new(&store);
    let dispatcher = RecordingDispatcher::default();
    let mut runner = executioner(&store, &store, &scheduler, &dispatcher, &clock);

    let mut output = RecordingOutput::default();
    let err = runner
        .execute(&campaign, &ContactLimiter::new(10).unwrap(), Some(&mut output))
        .unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::NotSchedulable {
            log_id,
            source: ScheduleViolation::InvertedWindow { .. },
        } if log_id == id
    ));
    assert_eq!(output.calls.last().map(String::as_str), Some("finish"));

    let mut output = RecordingOutput::default();
    let err = runner.execute_by_ids(&[id], Some(&mut output)).unwrap_err();
    assert!(matches!(err, ExecutionError::NotSchedulable { log_id, .. } if log_id == id));
    assert_eq!(output.calls.last().map(String::as_str), Some("finish"));

    assert!(dispatcher.events.borrow().is_empty());
    assert_eq!(log(&store, id).status, LogStatus::Pending);
}

#[test]
fn execute_by_ids_reschedules_a_group_together_at_the_latest_time() {
    let (store, campaign) = store_with_campaign();
    let now = fixture_now();
    let event = add_event(
        &store,
        Event::new(campaign.id, "nudge", EventKind::Action, "email.send").with_trigger(
            TriggerMode::Interval {
                amount: 1,
                unit: IntervalUnit::Day,
            },
        ),
    );
    let a = add_contact(&store, "a@example.com");
    let b = add_contact(&store, "b@example.com");
    let c = add_contact(&store, "c@example.com");
    let ready = add_log(&store, &event, &a, now - Duration::days(2), now - Duration::days(1));
    let t1 = add_log(&store, &event, &b, now - Duration::hours(12), now);
    let t2 = add_log(&store, &event, &c, now - Duration::hours(6), now);
    let latest = now + Duration::hours(18);

    let clock = FixedClock::new(now);
    let scheduler = RecordingScheduler::new(&store);
    let dispatcher = registry(&store);
    let mut output = RecordingOutput::default();
    let counter = executioner(&store, &store, &scheduler, &dispatcher, &clock)
        .execute_by_ids(&[ready, t1, t2], Some(&mut output))
        .unwrap();

    assert!(scheduler.single.borrow().is_empty());
    assert_eq!(*scheduler.grouped.borrow(), vec![(vec![t1, t2], latest)]);
    assert_eq!(log(&store, t1).trigger_date, Some(latest));
    assert_eq!(log(&store, t2).trigger_date, Some(latest));
    assert_eq!(log(&store, ready).status, LogStatus::Executed);
    assert_eq!(counter.evaluated_count(), 3);
    assert_eq!(counter.executed_count(), 1);
    assert_eq!(counter.total_scheduled_count(), 2);
    assert_eq!(
        output.calls,
        vec![
            "writeln 3 total events(s) to be processed in batches of n/a contacts",
            "start 3",
            "advance 3",
            "finish",
        ]
    );
}

#[test]
fn unpublished_campaign_fails_logs_without_dispatching() {
    let (store, campaign) = store_with_campaign();
    let now = fixture_now();
    let event = add_event(&store, Event::new(campaign.id, "send", EventKind::Action, "email.send"));
    let contact = add_contact(&store, "a@example.com");
    let ids = vec![
        add_log(&store, &event, &contact, now, now),
        add_log(&store, &event, &contact, now, now),
    ];
    store.set_campaign_published(campaign.id, false).unwrap();

    let clock = FixedClock::new(now);
    let scheduler = StoreScheduler::new(&store);
    let dispatcher = RecordingDispatcher::default();
    let counter = executioner(&store, &store, &scheduler, &dispatcher, &clock)
        .execute_by_ids(&ids, None)
        .unwrap();

    assert!(dispatcher.events.borrow().is_empty());
    assert_eq!(counter.executed_count(), 0);
    for id in ids {
        let log = log(&store, id);
        assert_eq!(log.status, LogStatus::Failed);
        assert_eq!(log.failure_reason.as_deref(), Some(CAMPAIGN_UNPUBLISHED));
    }
}

#[test]
fn empty_ids_touch_nothing() {
    let (store, _) = store_with_campaign();
    let clock = FixedClock::new(fixture_now());
    let repo = CountingRepo::new(&store);
    let scheduler = StoreScheduler::new(&store);
    let dispatcher = RecordingDispatcher::default();
    let mut output = RecordingOutput::default();

    let counter = executioner(&store, &repo, &scheduler, &dispatcher, &clock)
        .execute_by_ids(&[], Some(&mut output))
        .unwrap();

    assert_eq!(counter.evaluated_count(), 0);
    assert_eq!(*repo.calls.borrow(), 0);
    assert!(output.calls.is_empty());
}

#[test]
fn progress_finishes_when_dispatch_aborts_the_run() {
    let (store, campaign) = store_with_campaign();
    let now = fixture_now();
    let event = add_event(&store, Event::new(campaign.id, "send", EventKind::Action, "email.send"));
    let contact = add_contact(&store, "a@example.com");
    let id = add_log(&store, &event, &contact, now, now);

    let clock = FixedClock::new(now);
    let scheduler = StoreScheduler::new(&store);
    let mut output = RecordingOutput::default();
    let err = executioner(&store, &store, &scheduler, &DownDispatcher, &clock)
        .execute(&campaign, &ContactLimiter::new(10).unwrap(), Some(&mut output))
        .unwrap_err();

    assert!(matches!(err, ExecutionError::Dispatch { event_id, .. } if event_id == event.id));
    assert_eq!(output.calls.last().map(String::as_str), Some("finish"));
    assert_eq!(log(&store, id).status, LogStatus::Pending);
}

#[test]
fn jump_target_runs_on_the_next_pass() {
    let (store, campaign) = store_with_campaign();
    let now = fixture_now();
    let target = add_event(&store, Event::new(campaign.id, "target", EventKind::Action, "email.send"));
    let jump = add_event(&store, Event::jump_to(campaign.id, "jump", target.id));
    let contact = add_contact(&store, "a@example.com");
    add_log(&store, &jump, &contact, now, now);

    let clock = FixedClock::new(now);
    let scheduler = StoreScheduler::new(&store);
    let dispatcher = registry(&store);
    let limiter = ContactLimiter::new(10).unwrap();
    let mut runner = executioner(&store, &store, &scheduler, &dispatcher, &clock);

    let first = runner.execute(&campaign, &limiter, None).unwrap();
    assert_eq!(first.executed_count(), 1);

    clock.advance(Duration::minutes(1));
    let second = runner.execute(&campaign, &limiter, None).unwrap();
    assert_eq!(second.event_count(), 1);
    assert_eq!(second.executed_count(), 1);

    let logs = store.list_logs(campaign.id).unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|l| l.status == LogStatus::Executed));
    assert!(logs.iter().any(|l| l.event.id == target.id));
}
