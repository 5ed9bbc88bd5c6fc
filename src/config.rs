use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_RELATIVE_PATH: &str = ".cadence/config.toml";
const SUPPORTED_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    pub version: u32,
    pub limiter: Option<LimiterConfig>,
    pub store: Option<StoreConfig>,
    pub log: Option<LogConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LimiterConfig {
    pub batch_limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
struct RawRepoConfig {
    version: Option<u32>,
    limiter: Option<RawLimiterConfig>,
    store: Option<RawPathConfig>,
    log: Option<RawPathConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawLimiterConfig {
    batch_limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawPathConfig {
    path: Option<String>,
}

impl RepoConfig {
    pub fn batch_limit(&self) -> Option<usize> {
        self.limiter.as_ref().and_then(|l| l.batch_limit)
    }

    pub fn store_path(&self) -> Option<&Path> {
        self.store.as_ref().map(|s| s.path.as_path())
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log.as_ref().map(|l| l.path.as_path())
    }
}

pub fn repo_config_path(repo_root: &Path) -> PathBuf {
    repo_root.join(CONFIG_RELATIVE_PATH)
}

pub fn load_repo_config(repo_root: &Path) -> Result<Option<RepoConfig>> {
    let path = repo_config_path(repo_root);
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("read repo config {}", path.display()))?;
    let parsed: RawRepoConfig =
        toml::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(validate_repo_config(parsed, repo_root, &path)?))
}

fn validate_repo_config(raw: RawRepoConfig, repo_root: &Path, path: &Path) -> Result<RepoConfig> {
    let version = raw
        .version
        .ok_or_else(|| anyhow::anyhow!("{} missing required `version`", path.display()))?;
    if version != SUPPORTED_VERSION {
        bail!(
            "{} has unsupported version {version}; expected version = {SUPPORTED_VERSION}",
            path.display()
        );
    }

    let limiter = raw
        .limiter
        .map(|limiter| {
            let batch_limit = match limiter.batch_limit {
                None => None,
                Some(n) if n > 0 => Some(n as usize),
                Some(n) => bail!(
                    "{} has invalid `[limiter].batch_limit = {n}`; expected a positive integer",
                    path.display()
                ),
            };
            Ok(LimiterConfig { batch_limit })
        })
        .transpose()?;

    let store = raw
        .store
        .map(|store| {
            validate_path(store, "store", repo_root, path).map(|path| StoreConfig { path })
        })
        .transpose()?;

    let log = raw
        .log
        .map(|log| validate_path(log, "log", repo_root, path).map(|path| LogConfig { path }))
        .transpose()?;

    Ok(RepoConfig {
        version,
        limiter,
        store,
        log,
    })
}

fn validate_path(
    raw: RawPathConfig,
    section: &str,
    repo_root: &Path,
    path: &Path,
) -> Result<PathBuf> {
    let value = sanitize_optional(raw.path).ok_or_else(|| {
        anyhow::anyhow!("{} missing `[{section}].path` in config", path.display())
    })?;
    let value = PathBuf::from(value);
    if value.is_absolute() {
        Ok(value)
    } else {
        Ok(repo_root.join(value))
    }
}

fn sanitize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn default_state_db() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("cadence").join("state.db");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("state")
            .join("cadence")
            .join("state.db");
    }
    PathBuf::from(".cadence/state.db")
}
