use crate::campaign::store::CampaignStore;
use crate::campaign::{CHANGE_TAGS_ACTION, Event, JUMP_TO_EVENT_ACTION, LeadEventLog, NewLog};
use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Per-log result of one dispatch. Every dispatched log id must appear in
/// exactly one of the two lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub passed: Vec<i64>,
    pub failed: Vec<(i64, String)>,
}

pub trait ActionDispatcher {
    /// An `Err` aborts the run; per-contact failures go in the outcome.
    fn dispatch(
        &self,
        event: &Event,
        logs: &[LeadEventLog],
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome>;
}

pub trait ActionHandler {
    fn handle(&self, event: &Event, log: &LeadEventLog, now: DateTime<Utc>) -> Result<()>;
}

/// Dispatches by `event.action` to registered handlers.
#[derive(Default)]
pub struct ActionRegistry<'a> {
    handlers: BTreeMap<String, Box<dyn ActionHandler + 'a>>,
}

impl<'a> ActionRegistry<'a> {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    pub fn with_builtins(store: &'a CampaignStore) -> Self {
        let mut registry = Self::new();
        registry.register(JUMP_TO_EVENT_ACTION, JumpToEventHandler { store });
        registry.register(CHANGE_TAGS_ACTION, ChangeTagsHandler { store });
        registry
    }

    pub fn register(&mut self, action: &str, handler: impl ActionHandler + 'a) {
        self.handlers.insert(action.to_string(), Box::new(handler));
    }
}

impl ActionDispatcher for ActionRegistry<'_> {
    fn dispatch(
        &self,
        event: &Event,
        logs: &[LeadEventLog],
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome> {
        let mut outcome = DispatchOutcome::default();
        let Some(handler) = self.handlers.get(&event.action) else {
            let reason = format!("no handler registered for action '{}'", event.action);
            warn!(event_id = event.id, action = %event.action, "{reason}");
            outcome.failed = logs.iter().map(|log| (log.id, reason.clone())).collect();
            return Ok(outcome);
        };

        for log in logs {
            match handler.handle(event, log, now) {
                Ok(()) => outcome.passed.push(log.id),
                Err(err) => {
                    warn!(log_id = log.id, event_id = event.id, error = %format!("{err:#}"), "CAMPAIGN: action failed");
                    outcome.failed.push((log.id, format!("{err:#}")));
                }
            }
        }
        Ok(outcome)
    }
}

/// Sends the contact to another event of the same campaign by scheduling a
/// log on the target, due one second after `now`. The run that dispatched
/// the jump never fetches that log.
struct JumpToEventHandler<'a> {
    store: &'a CampaignStore,
}

impl ActionHandler for JumpToEventHandler<'_> {
    fn handle(&self, event: &Event, log: &LeadEventLog, now: DateTime<Utc>) -> Result<()> {
        let target_id = event
            .properties
            .get("jump_to_event")
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow!("jump to event {} has no target", event.id))?;
        if target_id == event.id {
            bail!("jump to event {target_id} targets itself");
        }
        let target = self
            .store
            .get_event(target_id)?
            .ok_or_else(|| anyhow!("jump target event {target_id} not found"))?;
        if target.campaign_id != event.campaign_id {
            bail!(
                "jump target event {target_id} belongs to campaign {}, not {}",
                target.campaign_id,
                event.campaign_id
            );
        }
        let due = now
            .checked_add_signed(Duration::seconds(1))
            .ok_or_else(|| anyhow!("jump due time overflows after {now}"))?;
        let mut next = NewLog::scheduled(&target, log.contact_id, now, due);
        next.rotation = log.rotation;
        self.store
            .append_log(&next)
            .with_context(|| format!("schedule jump target {target_id} for log {}", log.id))?;
        Ok(())
    }
}

struct ChangeTagsHandler<'a> {
    store: &'a CampaignStore,
}

impl ActionHandler for ChangeTagsHandler<'_> {
    fn handle(&self, event: &Event, log: &LeadEventLog, _now: DateTime<Utc>) -> Result<()> {
        let contact = log
            .contact
            .as_ref()
            .ok_or_else(|| anyhow!("contact {} was not hydrated", log.contact_id))?;
        let add = string_list(&event.properties, "add_tags");
        let remove = string_list(&event.properties, "remove_tags");

        let mut tags = contact
            .tags
            .iter()
            .filter(|tag| !remove.contains(tag))
            .cloned()
            .collect::<Vec<_>>();
        for tag in add {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        self.store.update_contact_tags(contact.id, &tags)
    }
}

fn string_list(properties: &Value, key: &str) -> Vec<String> {
    properties
        .get(key)
        .and_then(|v| v.as_array())
        .map(|a| {
            a.iter()
                .filter_map(|v| v.as_str().map(ToString::to_string))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}
