use rusqlite::{Connection, Result};

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS campaigns (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            is_published INTEGER NOT NULL DEFAULT 1,
            publish_up INTEGER,
            publish_down INTEGER
        );

        CREATE TABLE IF NOT EXISTS campaign_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            campaign_id INTEGER NOT NULL REFERENCES campaigns(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            kind TEXT NOT NULL CHECK(kind IN ('action','decision','condition','jump_to')),
            action TEXT NOT NULL,
            properties_json TEXT NOT NULL,
            trigger_mode TEXT NOT NULL CHECK(trigger_mode IN ('immediate','interval','date')),
            trigger_interval INTEGER,
            trigger_interval_unit TEXT,
            trigger_date INTEGER,
            trigger_hour TEXT,
            restricted_start_hour TEXT,
            restricted_stop_hour TEXT,
            restricted_days TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT,
            fields_json TEXT NOT NULL DEFAULT '{}',
            tags_json TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS lead_event_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id INTEGER NOT NULL REFERENCES campaign_events(id) ON DELETE CASCADE,
            campaign_id INTEGER NOT NULL REFERENCES campaigns(id) ON DELETE CASCADE,
            lead_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
            rotation INTEGER NOT NULL DEFAULT 1,
            date_triggered INTEGER NOT NULL,
            trigger_date INTEGER,
            is_scheduled INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'pending' CHECK(status IN ('pending','executed','failed')),
            failure_reason TEXT,
            date_executed INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_log_campaign_due ON lead_event_log(campaign_id, is_scheduled, status, trigger_date);
        CREATE INDEX IF NOT EXISTS idx_log_event_due ON lead_event_log(event_id, is_scheduled, status, trigger_date);
        CREATE INDEX IF NOT EXISTS idx_log_lead ON lead_event_log(lead_id);
        ",
    )?;

    Ok(())
}
