// src/persist.rs
//! Report sinks. The file sink writes pretty JSON under `Results/` with a timestamped name.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::report::AggregateReport;

pub const DEFAULT_RESULTS_DIR: &str = "Results";

#[async_trait::async_trait]
pub trait ReportSink: Send + Sync {
    /// Persist one report; returns where it went.
    async fn store(&self, report: &AggregateReport) -> Result<PathBuf>;
}

/// Keyword reduced to a filename stem: alphanumerics, space, `-` and `_` kept,
/// right end trimmed, spaces to `_`, lowercased.
pub fn search_name(keyword: &str) -> String {
    let kept: String = keyword
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    kept.trim_end().replace(' ', "_").to_lowercase()
}

/// `{search_name}_{YYYYMMDD_HHMMSS}_search_output.json`
pub fn output_filename(keyword: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}_{}_search_output.json",
        search_name(keyword),
        at.format("%Y%m%d_%H%M%S")
    )
}

pub struct FileSink {
    target: Target,
}

enum Target {
    Dir(PathBuf),
    File(PathBuf),
}

impl FileSink {
    /// Timestamped file inside `dir` (created on demand).
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            target: Target::Dir(dir.into()),
        }
    }

    /// Exactly this path, as given by `--out`.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            target: Target::File(path.into()),
        }
    }

    fn resolve(&self, report: &AggregateReport) -> PathBuf {
        match &self.target {
            Target::File(p) => p.clone(),
            Target::Dir(d) => {
                let meta = report.metadata();
                d.join(output_filename(meta.query.keyword(), meta.collected_at))
            }
        }
    }
}

impl Default for FileSink {
    fn default() -> Self {
        Self::in_dir(DEFAULT_RESULTS_DIR)
    }
}

#[async_trait::async_trait]
impl ReportSink for FileSink {
    async fn store(&self, report: &AggregateReport) -> Result<PathBuf> {
        let path = self.resolve(report);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(report).context("serializing report")?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(target: "persist", path = %path.display(), "report saved");
        Ok(path)
    }
}

// --- Test helper ---
pub struct MockSink {
    pub calls: std::sync::Mutex<Vec<String>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            calls: std::sync::Mutex::new(vec![]),
        }
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ReportSink for MockSink {
    async fn store(&self, report: &AggregateReport) -> Result<PathBuf> {
        let json = serde_json::to_string(report).context("serializing report")?;
        let mut calls = self
            .calls
            .lock()
            .map_err(|_| anyhow::anyhow!("mock sink poisoned"))?;
        calls.push(json);
        Ok(PathBuf::from(format!("mock://{}", calls.len())))
    }
}
