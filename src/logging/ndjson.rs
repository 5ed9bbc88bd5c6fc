use crate::executioner::Output;
use anyhow::Result;
use chrono::Utc;
use serde_json::{Value, json};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

pub fn mirror_record(path: &Path, record: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(f, "{}", record)?;
    Ok(())
}

/// Forwards progress to `inner` and appends each step to an NDJSON file.
pub struct NdjsonOutput<'a> {
    inner: &'a mut dyn Output,
    path: PathBuf,
    run_id: String,
}

impl<'a> NdjsonOutput<'a> {
    pub fn new(inner: &'a mut dyn Output, path: PathBuf, run_id: String) -> Self {
        Self {
            inner,
            path,
            run_id,
        }
    }

    pub fn record(&self, kind: &str, fields: Value) {
        let mut line = json!({
            "run": self.run_id,
            "ts": Utc::now().to_rfc3339(),
            "event": kind,
        });
        if let (Some(line), Value::Object(fields)) = (line.as_object_mut(), fields) {
            line.extend(fields);
        }
        if let Err(err) = mirror_record(&self.path, &line) {
            warn!(path = %self.path.display(), error = %err, "failed to mirror run log");
        }
    }
}

impl Output for NdjsonOutput<'_> {
    fn writeln(&mut self, line: &str) {
        self.record("message", json!({ "text": line }));
        self.inner.writeln(line);
    }

    fn start(&mut self, total: usize) {
        self.record("start", json!({ "total": total }));
        self.inner.start(total);
    }

    fn advance(&mut self, step: usize) {
        self.record("advance", json!({ "step": step }));
        self.inner.advance(step);
    }

    fn finish(&mut self) {
        self.record("finish", json!({}));
        self.inner.finish();
    }
}
