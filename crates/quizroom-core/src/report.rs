//! Session reports with JSON persistence, and the built-in result sinks.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::TestResult;
use crate::statistics::SessionSummary;
use crate::traits::ResultSink;

/// Final record of a session, handed to the result sink on end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub join_code: String,
    pub test_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Ranked.
    pub results: Vec<TestResult>,
    pub summary: SessionSummary,
}

impl SessionReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: SessionReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// File name used by [`JsonFileSink`].
    pub fn file_name(&self) -> String {
        report_file_name(&self.join_code, &self.session_id)
    }
}

fn report_file_name(join_code: &str, session_id: &Uuid) -> String {
    format!("session-{join_code}-{session_id}.json")
}

/// Writes each session report to `<dir>/session-<code>-<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, report: &SessionReport) -> PathBuf {
        self.dir.join(report.file_name())
    }

    /// Where the report of a session will be written.
    pub fn session_path(&self, join_code: &str, session_id: &Uuid) -> PathBuf {
        self.dir.join(report_file_name(join_code, session_id))
    }
}

#[async_trait]
impl ResultSink for JsonFileSink {
    async fn persist(&self, report: &SessionReport) -> Result<()> {
        let path = self.path_for(report);
        let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        tracing::info!(session = %report.session_id, "saved session report to {}", path.display());
        Ok(())
    }
}

/// Keeps reports in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<SessionReport>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<SessionReport> {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn persist(&self, report: &SessionReport) -> Result<()> {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(report.clone());
        Ok(())
    }
}
