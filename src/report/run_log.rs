//! Append-only run log: one JSON line per pipeline invocation.
//!
//! Observability only - a failed write warns and moves on, it never fails
//! the run that produced the results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub timestamp: DateTime<Utc>,
    /// Which subcommand ran.
    pub operation: String,
    /// Short parameter summary, e.g. the keyword or budget band.
    pub summary: String,
    pub result_count: usize,
    /// Set when a collaborator degraded to fallback data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl RunRecord {
    pub fn now(operation: &str, summary: String, result_count: usize) -> Self {
        Self {
            timestamp: Utc::now(),
            operation: operation.to_string(),
            summary,
            result_count,
            degraded: None,
        }
    }

    pub fn with_degraded(mut self, reason: Option<&str>) -> Self {
        self.degraded = reason.map(str::to_string);
        self
    }
}

pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(log_dir: PathBuf) -> Self {
        Self {
            path: log_dir.join("runs.jsonl"),
        }
    }

    pub fn record(&self, record: &RunRecord) {
        if let Err(e) = self.append(record) {
            warn!("Failed to write run log entry: {}", e);
        }
    }

    fn append(&self, record: &RunRecord) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let line = serde_json::to_string(record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}
