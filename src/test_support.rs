use crate::campaign::store::CampaignStore;
use crate::campaign::{Campaign, Contact, Event, NewLog};
use chrono::{DateTime, TimeZone, Utc};

/// Monday 2026-03-02 12:00 UTC.
pub fn fixture_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
}

pub fn store_with_campaign() -> (CampaignStore, Campaign) {
    let store = CampaignStore::open_in_memory().unwrap();
    let campaign = store.create_campaign(&Campaign::new("Welcome")).unwrap();
    (store, campaign)
}

pub fn add_contact(store: &CampaignStore, email: &str) -> Contact {
    store.create_contact(&Contact::new(email)).unwrap()
}

pub fn schedule_log(
    store: &CampaignStore,
    event: &Event,
    contact_id: i64,
    trigger_date: DateTime<Utc>,
) -> i64 {
    store
        .append_log(&NewLog::scheduled(event, contact_id, trigger_date, trigger_date))
        .unwrap()
}
