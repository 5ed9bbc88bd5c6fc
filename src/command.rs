use crate::campaign::store::CampaignStore;
use crate::config::{RepoConfig, default_state_db, load_repo_config};
use crate::executioner::limiter::{ContactLimiter, DEFAULT_BATCH_LIMIT};
use crate::executioner::{
    ActionRegistry, Clock, Counter, EventExecutioner, Output, ScheduledContactFinder,
    ScheduledExecutioner, StoreScheduler,
};
use crate::logging::ndjson::NdjsonOutput;
use anyhow::{Context, Result, anyhow};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct TriggerCommand {
    pub campaign_id: i64,
    pub batch_limit: Option<usize>,
    pub contact_id: Option<i64>,
    pub min_contact_id: Option<i64>,
    pub max_contact_id: Option<i64>,
    pub contact_ids: Option<String>,
    pub thread_id: Option<u32>,
    pub max_threads: Option<u32>,
    pub state_db: Option<PathBuf>,
    pub log: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct ExecuteCommand {
    pub scheduled_log_ids: String,
    pub state_db: Option<PathBuf>,
    pub log: Option<PathBuf>,
}

/// Executes every due log of one campaign.
pub fn trigger_campaign(
    cmd: TriggerCommand,
    repo_root: &Path,
    clock: &dyn Clock,
    console: &mut dyn Output,
) -> Result<Counter> {
    let cfg = load_repo_config(repo_root)?;
    let store = open_store(cmd.state_db.as_deref(), cfg.as_ref())?;
    let campaign = store
        .get_campaign(cmd.campaign_id)?
        .ok_or_else(|| anyhow!("campaign {} not found", cmd.campaign_id))?;

    if !campaign.is_published_at(clock.now()) {
        info!(campaign_id = campaign.id, "campaign is not published, skipping");
        console.writeln(&format!("Campaign {} is not published; nothing to do", campaign.id));
        return Ok(Counter::default());
    }

    let batch_limit = cmd
        .batch_limit
        .or_else(|| cfg.as_ref().and_then(RepoConfig::batch_limit))
        .unwrap_or(DEFAULT_BATCH_LIMIT);
    let limiter = build_limiter(&cmd, batch_limit)?;

    let registry = ActionRegistry::with_builtins(&store);
    let scheduler = StoreScheduler::new(&store);
    let mut executioner = ScheduledExecutioner::new(
        &store,
        &scheduler,
        ScheduledContactFinder::new(&store),
        EventExecutioner::new(&store, &registry),
        clock,
    );

    let log_path = resolve_log_path(cmd.log, cfg.as_ref());
    let counter = with_output(log_path, console, |output| {
        let counter = executioner.execute(&campaign, &limiter, Some(&mut *output))?;
        write_counts(output, &counter);
        Ok(counter)
    })?;
    info!(
        campaign_id = campaign.id,
        evaluated = counter.evaluated_count(),
        executed = counter.executed_count(),
        scheduled = counter.total_scheduled_count(),
        "scheduled events triggered"
    );
    Ok(counter)
}

/// Executes specific scheduled logs regardless of their due time.
pub fn execute_scheduled_logs(
    cmd: ExecuteCommand,
    repo_root: &Path,
    clock: &dyn Clock,
    console: &mut dyn Output,
) -> Result<Counter> {
    let log_ids = parse_id_csv(&cmd.scheduled_log_ids)?;
    let cfg = load_repo_config(repo_root)?;
    let store = open_store(cmd.state_db.as_deref(), cfg.as_ref())?;

    let registry = ActionRegistry::with_builtins(&store);
    let scheduler = StoreScheduler::new(&store);
    let mut executioner = ScheduledExecutioner::new(
        &store,
        &scheduler,
        ScheduledContactFinder::new(&store),
        EventExecutioner::new(&store, &registry),
        clock,
    );

    let log_path = resolve_log_path(cmd.log, cfg.as_ref());
    let counter = with_output(log_path, console, |output| {
        let counter = executioner.execute_by_ids(&log_ids, Some(&mut *output))?;
        write_counts(output, &counter);
        Ok(counter)
    })?;
    info!(
        requested = log_ids.len(),
        executed = counter.executed_count(),
        "scheduled logs executed"
    );
    Ok(counter)
}

/// Parses `"1, 2,3"` into ids; blank entries are skipped.
pub fn parse_id_csv(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .with_context(|| format!("invalid id `{part}`"))
        })
        .collect()
}

pub fn write_counts(output: &mut dyn Output, counter: &Counter) {
    output.writeln(&format!(
        "{} total events were evaluated",
        counter.evaluated_count()
    ));
    output.writeln(&format!(
        "{} total events were executed",
        counter.executed_count()
    ));
    output.writeln(&format!(
        "{} total events were scheduled",
        counter.total_scheduled_count()
    ));
}

fn build_limiter(cmd: &TriggerCommand, batch_limit: usize) -> Result<ContactLimiter> {
    let mut limiter = ContactLimiter::new(batch_limit)?
        .with_contact_id_range(cmd.min_contact_id, cmd.max_contact_id)?;
    if let Some(contact_id) = cmd.contact_id {
        limiter = limiter.with_contact_id(contact_id);
    }
    if let Some(raw) = cmd.contact_ids.as_deref() {
        limiter = limiter.with_contact_ids(parse_id_csv(raw)?);
    }
    if let (Some(thread_id), Some(max_threads)) = (cmd.thread_id, cmd.max_threads) {
        limiter = limiter.with_threads(thread_id, max_threads)?;
    }
    Ok(limiter)
}

fn open_store(state_db: Option<&Path>, cfg: Option<&RepoConfig>) -> Result<CampaignStore> {
    let path = state_db
        .map(Path::to_path_buf)
        .or_else(|| cfg.and_then(RepoConfig::store_path).map(Path::to_path_buf))
        .unwrap_or_else(default_state_db);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create state dir {}", parent.display()))?;
    }
    CampaignStore::open(&path)
}

fn resolve_log_path(flag: Option<PathBuf>, cfg: Option<&RepoConfig>) -> Option<PathBuf> {
    flag.or_else(|| cfg.and_then(RepoConfig::log_path).map(Path::to_path_buf))
}

/// Runs `f` against the console, mirrored to NDJSON when a log path is set.
fn with_output<T>(
    log_path: Option<PathBuf>,
    console: &mut dyn Output,
    f: impl FnOnce(&mut dyn Output) -> Result<T>,
) -> Result<T> {
    let Some(path) = log_path else {
        return f(console);
    };
    let mut output = NdjsonOutput::new(console, path, Uuid::new_v4().to_string());
    let result = f(&mut output);
    match &result {
        Ok(_) => output.record("done", json!({})),
        Err(err) => output.record("error", json!({ "error": format!("{err:#}") })),
    }
    result
}
