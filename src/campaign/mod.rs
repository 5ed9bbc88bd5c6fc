pub mod schema;
pub mod store;

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

pub const JUMP_TO_EVENT_ACTION: &str = "campaign.jump_to_event";
pub const CHANGE_TAGS_ACTION: &str = "lead.changetags";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
    pub publish_up: Option<DateTime<Utc>>,
    pub publish_down: Option<DateTime<Utc>>,
}

impl Campaign {
    /// Unsaved, published campaign; `id` is assigned by the store.
    pub fn new(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            is_published: true,
            publish_up: None,
            publish_down: None,
        }
    }

    /// Published flag plus the optional publish window.
    pub fn is_published_at(&self, now: DateTime<Utc>) -> bool {
        if !self.is_published {
            return false;
        }
        if let Some(up) = self.publish_up
            && now < up
        {
            return false;
        }
        if let Some(down) = self.publish_down
            && now >= down
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Action,
    Decision,
    Condition,
    JumpTo,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Decision => "decision",
            Self::Condition => "condition",
            Self::JumpTo => "jump_to",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "action" => Some(Self::Action),
            "decision" => Some(Self::Decision),
            "condition" => Some(Self::Condition),
            "jump_to" => Some(Self::JumpTo),
            _ => None,
        }
    }

    /// Groups with a lower rank are executed first within one pass. Jump
    /// targets settle after the events that may feed them.
    pub fn execution_rank(self) -> u8 {
        match self {
            Self::JumpTo => 1,
            Self::Action | Self::Decision | Self::Condition => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl IntervalUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minute => "i",
            Self::Hour => "h",
            Self::Day => "d",
            Self::Week => "w",
            Self::Month => "m",
            Self::Year => "y",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "i" => Some(Self::Minute),
            "h" => Some(Self::Hour),
            "d" => Some(Self::Day),
            "w" => Some(Self::Week),
            "m" => Some(Self::Month),
            "y" => Some(Self::Year),
            _ => None,
        }
    }

    pub fn is_day_or_longer(self) -> bool {
        !matches!(self, Self::Minute | Self::Hour)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    Immediate,
    Interval { amount: i64, unit: IntervalUnit },
    Date(DateTime<Utc>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub campaign_id: i64,
    pub name: String,
    pub kind: EventKind,
    pub action: String,
    pub properties: Value,
    pub trigger: TriggerMode,
    pub trigger_hour: Option<NaiveTime>,
    pub restricted_start_hour: Option<NaiveTime>,
    pub restricted_stop_hour: Option<NaiveTime>,
    pub restricted_days: Vec<Weekday>,
}

impl Event {
    pub fn new(campaign_id: i64, name: &str, kind: EventKind, action: &str) -> Self {
        Self {
            id: 0,
            campaign_id,
            name: name.to_string(),
            kind,
            action: action.to_string(),
            properties: json!({}),
            trigger: TriggerMode::Immediate,
            trigger_hour: None,
            restricted_start_hour: None,
            restricted_stop_hour: None,
            restricted_days: Vec::new(),
        }
    }

    pub fn jump_to(campaign_id: i64, name: &str, target_event_id: i64) -> Self {
        Self::new(campaign_id, name, EventKind::JumpTo, JUMP_TO_EVENT_ACTION)
            .with_properties(json!({ "jump_to_event": target_event_id }))
    }

    pub fn with_trigger(mut self, trigger: TriggerMode) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_properties(mut self, properties: Value) -> Self {
        self.properties = properties;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Contact {
    pub id: i64,
    pub email: Option<String>,
    pub fields: Map<String, Value>,
    pub tags: Vec<String>,
}

impl Contact {
    pub fn new(email: &str) -> Self {
        Self {
            email: Some(email.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Pending,
    Executed,
    Failed,
}

impl LogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Executed => "executed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "executed" => Some(Self::Executed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One contact scheduled to pass through one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadEventLog {
    pub id: i64,
    pub event: Event,
    pub campaign_id: i64,
    pub contact_id: i64,
    pub contact: Option<Contact>,
    pub rotation: i64,
    pub date_triggered: DateTime<Utc>,
    pub trigger_date: Option<DateTime<Utc>>,
    pub is_scheduled: bool,
    pub status: LogStatus,
    pub failure_reason: Option<String>,
    pub date_executed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewLog {
    pub event_id: i64,
    pub campaign_id: i64,
    pub contact_id: i64,
    pub rotation: i64,
    pub date_triggered: DateTime<Utc>,
    pub trigger_date: Option<DateTime<Utc>>,
    pub is_scheduled: bool,
}

impl NewLog {
    pub fn scheduled(
        event: &Event,
        contact_id: i64,
        date_triggered: DateTime<Utc>,
        trigger_date: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: event.id,
            campaign_id: event.campaign_id,
            contact_id,
            rotation: 1,
            date_triggered,
            trigger_date: Some(trigger_date),
            is_scheduled: true,
        }
    }
}
