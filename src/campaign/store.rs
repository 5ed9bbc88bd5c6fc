use crate::campaign::{
    Campaign, Contact, Event, EventKind, IntervalUnit, LeadEventLog, LogStatus, NewLog, TriggerMode,
    schema,
};
use crate::executioner::{LogRepository, ScheduledCount};
use crate::executioner::limiter::ContactLimiter;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

const EVENT_COLUMNS: &str = "e.id, e.campaign_id, e.name, e.kind, e.action, e.properties_json, \
     e.trigger_mode, e.trigger_interval, e.trigger_interval_unit, e.trigger_date, e.trigger_hour, \
     e.restricted_start_hour, e.restricted_stop_hour, e.restricted_days";

const LOG_COLUMNS: &str = "l.id, l.campaign_id, l.lead_id, l.rotation, l.date_triggered, \
     l.trigger_date, l.is_scheduled, l.status, l.failure_reason, l.date_executed";

const LOG_COLUMN_COUNT: usize = 10;

pub struct CampaignStore {
    conn: Connection,
}

impl CampaignStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create db parent dir {}", parent.display()))?;
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    pub fn create_campaign(&self, campaign: &Campaign) -> Result<Campaign> {
        self.conn.execute(
            "INSERT INTO campaigns (name, is_published, publish_up, publish_down)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                campaign.name,
                campaign.is_published,
                campaign.publish_up.map(to_ts),
                campaign.publish_down.map(to_ts)
            ],
        )?;
        Ok(Campaign {
            id: self.conn.last_insert_rowid(),
            ..campaign.clone()
        })
    }

    pub fn get_campaign(&self, id: i64) -> Result<Option<Campaign>> {
        self.conn
            .query_row(
                "SELECT id, name, is_published, publish_up, publish_down FROM campaigns WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Campaign {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        is_published: row.get(2)?,
                        publish_up: opt_ts_column(row, 3)?,
                        publish_down: opt_ts_column(row, 4)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn set_campaign_published(&self, id: i64, published: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE campaigns SET is_published = ?2 WHERE id = ?1",
            params![id, published],
        )?;
        Ok(())
    }

    pub fn create_event(&self, event: &Event) -> Result<Event> {
        let trigger = TriggerColumns::from(&event.trigger);
        self.conn.execute(
            "INSERT INTO campaign_events (campaign_id, name, kind, action, properties_json, trigger_mode,
                trigger_interval, trigger_interval_unit, trigger_date, trigger_hour,
                restricted_start_hour, restricted_stop_hour, restricted_days)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                event.campaign_id,
                event.name,
                event.kind.as_str(),
                event.action,
                event.properties.to_string(),
                trigger.mode,
                trigger.interval,
                trigger.unit,
                trigger.date,
                event.trigger_hour,
                event.restricted_start_hour,
                event.restricted_stop_hour,
                encode_days(&event.restricted_days)
            ],
        )?;
        Ok(Event {
            id: self.conn.last_insert_rowid(),
            ..event.clone()
        })
    }

    pub fn get_event(&self, id: i64) -> Result<Option<Event>> {
        self.conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM campaign_events e WHERE e.id = ?1"),
                params![id],
                |row| event_from_row(row, 0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Rewrites the scheduling metadata of an event; pending logs pick up the
    /// new rules the next time they are validated.
    pub fn update_event_schedule(&self, event: &Event) -> Result<()> {
        let trigger = TriggerColumns::from(&event.trigger);
        self.conn.execute(
            "UPDATE campaign_events SET trigger_mode = ?2, trigger_interval = ?3,
                trigger_interval_unit = ?4, trigger_date = ?5, trigger_hour = ?6,
                restricted_start_hour = ?7, restricted_stop_hour = ?8, restricted_days = ?9
             WHERE id = ?1",
            params![
                event.id,
                trigger.mode,
                trigger.interval,
                trigger.unit,
                trigger.date,
                event.trigger_hour,
                event.restricted_start_hour,
                event.restricted_stop_hour,
                encode_days(&event.restricted_days)
            ],
        )?;
        Ok(())
    }

    pub fn create_contact(&self, contact: &Contact) -> Result<Contact> {
        self.conn.execute(
            "INSERT INTO contacts (email, fields_json, tags_json) VALUES (?1, ?2, ?3)",
            params![
                contact.email,
                Value::Object(contact.fields.clone()).to_string(),
                serde_json::to_string(&contact.tags)?
            ],
        )?;
        Ok(Contact {
            id: self.conn.last_insert_rowid(),
            ..contact.clone()
        })
    }

    pub fn delete_contact(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM contacts WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn get_contacts(&self, ids: &[i64]) -> Result<HashMap<i64, Contact>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT id, email, fields_json, tags_json FROM contacts WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let contacts = stmt
            .query_map(params_from_iter(ids.iter()), |row| {
                let fields: String = row.get(2)?;
                let tags: String = row.get(3)?;
                Ok(Contact {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    fields: serde_json::from_str::<Map<String, Value>>(&fields).unwrap_or_default(),
                    tags: serde_json::from_str(&tags).unwrap_or_default(),
                })
            })?
            .map(|contact| contact.map(|c| (c.id, c)))
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(contacts)
    }

    pub fn update_contact_tags(&self, id: i64, tags: &[String]) -> Result<()> {
        self.conn.execute(
            "UPDATE contacts SET tags_json = ?2 WHERE id = ?1",
            params![id, serde_json::to_string(tags)?],
        )?;
        Ok(())
    }

    pub fn append_log(&self, log: &NewLog) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO lead_event_log (event_id, campaign_id, lead_id, rotation, date_triggered,
                trigger_date, is_scheduled, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending')",
            params![
                log.event_id,
                log.campaign_id,
                log.contact_id,
                log.rotation,
                to_ts(log.date_triggered),
                log.trigger_date.map(to_ts),
                log.is_scheduled
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_log(&self, id: i64) -> Result<Option<LeadEventLog>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {LOG_COLUMNS}, {EVENT_COLUMNS} FROM lead_event_log l
                     JOIN campaign_events e ON e.id = l.event_id WHERE l.id = ?1"
                ),
                params![id],
                log_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_logs(&self, campaign_id: i64) -> Result<Vec<LeadEventLog>> {
        let sql = format!(
            "SELECT {LOG_COLUMNS}, {EVENT_COLUMNS} FROM lead_event_log l
             JOIN campaign_events e ON e.id = l.event_id
             WHERE l.campaign_id = ?1 ORDER BY l.id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![campaign_id], log_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    /// Moves every log to the same due time in one transaction.
    pub fn reschedule(&self, log_ids: &[i64], at: DateTime<Utc>) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "UPDATE lead_event_log SET trigger_date = ?2, is_scheduled = 1 WHERE id = ?1",
            )?;
            for id in log_ids {
                stmt.execute(params![id, to_ts(at)])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn record_results(
        &self,
        executed: &[i64],
        failed: &[(i64, String)],
        at: DateTime<Utc>,
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut passed_stmt = tx.prepare(
                "UPDATE lead_event_log SET status = 'executed', is_scheduled = 0,
                    date_executed = ?2, failure_reason = NULL WHERE id = ?1",
            )?;
            for id in executed {
                passed_stmt.execute(params![id, to_ts(at)])?;
            }
            let mut failed_stmt = tx.prepare(
                "UPDATE lead_event_log SET status = 'failed', is_scheduled = 0,
                    failure_reason = ?2 WHERE id = ?1",
            )?;
            for (id, reason) in failed {
                failed_stmt.execute(params![id, reason])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

impl LogRepository for CampaignStore {
    fn get_scheduled_counts(
        &self,
        campaign_id: i64,
        now: DateTime<Utc>,
        limiter: &ContactLimiter,
    ) -> Result<Vec<ScheduledCount>> {
        let mut values = vec![SqlValue::Integer(campaign_id), SqlValue::Integer(to_ts(now))];
        let clause = limiter_clause(limiter, &mut values);
        let sql = format!(
            "SELECT l.event_id, e.kind, COUNT(*) FROM lead_event_log l
             JOIN campaign_events e ON e.id = l.event_id
             WHERE l.campaign_id = ? AND l.is_scheduled = 1 AND l.status = 'pending'
               AND l.trigger_date <= ?{clause}
             GROUP BY l.event_id, e.kind ORDER BY l.event_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let counts = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(ScheduledCount {
                    event_id: row.get(0)?,
                    kind: text_column(row, 1, EventKind::parse)?,
                    count: row.get::<_, i64>(2)? as usize,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    fn get_scheduled(
        &self,
        event_id: i64,
        now: DateTime<Utc>,
        limiter: &ContactLimiter,
    ) -> Result<Vec<LeadEventLog>> {
        let mut values = vec![SqlValue::Integer(event_id), SqlValue::Integer(to_ts(now))];
        let clause = limiter_clause(limiter, &mut values);
        values.push(SqlValue::Integer(
            i64::try_from(limiter.batch_limit()).unwrap_or(i64::MAX),
        ));
        let sql = format!(
            "SELECT {LOG_COLUMNS}, {EVENT_COLUMNS} FROM lead_event_log l
             JOIN campaign_events e ON e.id = l.event_id
             WHERE l.event_id = ? AND l.is_scheduled = 1 AND l.status = 'pending'
               AND l.trigger_date <= ?{clause}
             ORDER BY l.id ASC LIMIT ?"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params_from_iter(values.iter()), log_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    fn get_scheduled_by_ids(&self, log_ids: &[i64]) -> Result<Vec<LeadEventLog>> {
        if log_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {LOG_COLUMNS}, {EVENT_COLUMNS} FROM lead_event_log l
             JOIN campaign_events e ON e.id = l.event_id
             WHERE l.id IN ({}) AND l.is_scheduled = 1 AND l.status = 'pending'
             ORDER BY l.id ASC",
            placeholders(log_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params_from_iter(log_ids.iter()), log_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    fn campaign(&self, campaign_id: i64) -> Result<Option<Campaign>> {
        self.get_campaign(campaign_id)
    }
}

/// Contact scope shared by the scheduled queries. A single contact wins over
/// an id list, which wins over the min/max range.
fn limiter_clause(limiter: &ContactLimiter, values: &mut Vec<SqlValue>) -> String {
    let mut clause = String::new();
    if let Some(contact_id) = limiter.contact_id() {
        clause.push_str(" AND l.lead_id = ?");
        values.push(SqlValue::Integer(contact_id));
    } else if !limiter.contact_ids().is_empty() {
        clause.push_str(&format!(
            " AND l.lead_id IN ({})",
            placeholders(limiter.contact_ids().len())
        ));
        values.extend(limiter.contact_ids().iter().map(|id| SqlValue::Integer(*id)));
    } else {
        if let Some(min) = limiter.min_contact_id() {
            clause.push_str(" AND l.lead_id >= ?");
            values.push(SqlValue::Integer(min));
        }
        if let Some(max) = limiter.max_contact_id() {
            clause.push_str(" AND l.lead_id <= ?");
            values.push(SqlValue::Integer(max));
        }
    }
    if let Some((thread_id, max_threads)) = limiter.threads() {
        clause.push_str(" AND (l.lead_id + ?) % ? = 0");
        values.push(SqlValue::Integer(i64::from(max_threads - thread_id)));
        values.push(SqlValue::Integer(i64::from(max_threads)));
    }
    clause
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn to_ts(at: DateTime<Utc>) -> i64 {
    at.timestamp()
}

fn ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(idx)?;
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp {secs} out of range").into(),
        )
    })
}

fn opt_ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<i64>>(idx)? {
        Some(_) => ts_column(row, idx).map(Some),
        None => Ok(None),
    }
}

fn text_column<T>(row: &Row<'_>, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unexpected value '{raw}'").into(),
        )
    })
}

struct TriggerColumns {
    mode: &'static str,
    interval: Option<i64>,
    unit: Option<&'static str>,
    date: Option<i64>,
}

impl From<&TriggerMode> for TriggerColumns {
    fn from(trigger: &TriggerMode) -> Self {
        match trigger {
            TriggerMode::Immediate => Self {
                mode: "immediate",
                interval: None,
                unit: None,
                date: None,
            },
            TriggerMode::Interval { amount, unit } => Self {
                mode: "interval",
                interval: Some(*amount),
                unit: Some(unit.as_str()),
                date: None,
            },
            TriggerMode::Date(at) => Self {
                mode: "date",
                interval: None,
                unit: None,
                date: Some(to_ts(*at)),
            },
        }
    }
}

fn trigger_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<TriggerMode> {
    let mode: String = row.get(offset)?;
    match mode.as_str() {
        "immediate" => Ok(TriggerMode::Immediate),
        "interval" => Ok(TriggerMode::Interval {
            amount: row.get(offset + 1)?,
            unit: text_column(row, offset + 2, IntervalUnit::parse)?,
        }),
        "date" => Ok(TriggerMode::Date(ts_column(row, offset + 3)?)),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            offset,
            Type::Text,
            format!("unknown trigger mode '{other}'").into(),
        )),
    }
}

fn event_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Event> {
    let properties: String = row.get(offset + 5)?;
    let days: String = row.get(offset + 13)?;
    Ok(Event {
        id: row.get(offset)?,
        campaign_id: row.get(offset + 1)?,
        name: row.get(offset + 2)?,
        kind: text_column(row, offset + 3, EventKind::parse)?,
        action: row.get(offset + 4)?,
        properties: serde_json::from_str(&properties).unwrap_or(Value::Null),
        trigger: trigger_from_row(row, offset + 6)?,
        trigger_hour: row.get::<_, Option<NaiveTime>>(offset + 10)?,
        restricted_start_hour: row.get::<_, Option<NaiveTime>>(offset + 11)?,
        restricted_stop_hour: row.get::<_, Option<NaiveTime>>(offset + 12)?,
        restricted_days: decode_days(&days),
    })
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<LeadEventLog> {
    Ok(LeadEventLog {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        contact_id: row.get(2)?,
        contact: None,
        rotation: row.get(3)?,
        date_triggered: ts_column(row, 4)?,
        trigger_date: opt_ts_column(row, 5)?,
        is_scheduled: row.get(6)?,
        status: text_column(row, 7, LogStatus::parse)?,
        failure_reason: row.get(8)?,
        date_executed: opt_ts_column(row, 9)?,
        event: event_from_row(row, LOG_COLUMN_COUNT)?,
    })
}

fn encode_days(days: &[Weekday]) -> String {
    days.iter()
        .map(|d| d.number_from_monday().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn decode_days(raw: &str) -> Vec<Weekday> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .filter_map(weekday_from_monday)
        .collect()
}

fn weekday_from_monday(n: u32) -> Option<Weekday> {
    match n {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}
