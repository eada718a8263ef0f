// src/error.rs
//! Error taxonomy for a pulse run.
//!
//! Per-record and per-source errors are absorbed into report metadata.
//! Only `ConfigError` and `PipelineError::AllSourcesFailed` stop a run.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::ingest::types::SourceKind;

/// Coarse reason code recorded in `metadata.failures`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Timeout,
    Network,
    Auth,
    RateLimited,
    Parse,
    NotConfigured,
    Cancelled,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::Timeout => "timeout",
            FailureReason::Network => "network",
            FailureReason::Auth => "auth",
            FailureReason::RateLimited => "rate_limited",
            FailureReason::Parse => "parse",
            FailureReason::NotConfigured => "not_configured",
            FailureReason::Cancelled => "cancelled",
        }
    }

    /// Timeouts, network blips and rate limits are worth another try.
    pub fn default_retryable(self) -> bool {
        matches!(
            self,
            FailureReason::Timeout | FailureReason::Network | FailureReason::RateLimited
        )
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure of a whole source query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{kind} failed ({reason}): {message}")]
pub struct SourceFailure {
    #[serde(rename = "source")]
    pub kind: SourceKind,
    pub reason: FailureReason,
    pub message: String,
    pub retryable: bool,
}

impl SourceFailure {
    pub fn new(kind: SourceKind, reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            kind,
            reason,
            message: message.into(),
            retryable: reason.default_retryable(),
        }
    }

    pub fn timeout(source: SourceKind, after_ms: u64) -> Self {
        Self::new(
            source,
            FailureReason::Timeout,
            format!("no response within {after_ms} ms"),
        )
    }

    pub fn cancelled(source: SourceKind) -> Self {
        Self::new(source, FailureReason::Cancelled, "run cancelled before completion")
    }

    /// Map an `anyhow` chain from a provider's internal steps.
    /// A `reqwest::Error` anywhere in the chain drives the classification.
    pub fn from_anyhow(source: SourceKind, err: &anyhow::Error, fallback: FailureReason) -> Self {
        let reason = err
            .chain()
            .find_map(|e| e.downcast_ref::<reqwest::Error>())
            .map(classify_http)
            .unwrap_or(fallback);
        Self::new(source, reason, format!("{err:#}"))
    }
}

fn classify_http(err: &reqwest::Error) -> FailureReason {
    if err.is_timeout() {
        return FailureReason::Timeout;
    }
    if let Some(status) = err.status() {
        return match status.as_u16() {
            401 | 403 => FailureReason::Auth,
            429 => FailureReason::RateLimited,
            _ => FailureReason::Network,
        };
    }
    if err.is_decode() {
        FailureReason::Parse
    } else {
        FailureReason::Network
    }
}

/// A single malformed record. The record is dropped and counted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    #[error("{kind} record has no usable identifier")]
    MissingId { kind: SourceKind },
    #[error("{kind} record `{id}` has no title or text")]
    MissingText { kind: SourceKind, id: String },
    #[error("unparseable timestamp `{value}`")]
    InvalidTimestamp { value: String },
}

/// Invalid run configuration; surfaced before any source is queried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("keyword: must not be empty")]
    EmptyKeyword,
    #[error("date: `{value}` is not a valid YYYY-MM-DD date")]
    InvalidDate { value: String },
    #[error("relevance_cutoff: {value} is outside 0..=100")]
    InvalidCutoff { value: i64 },
    #[error("date_window_days: {value} must be non-negative")]
    InvalidWindow { value: i64 },
    #[error("{field}: {value} is outside 0..=100")]
    InvalidNeutralScore { field: &'static str, value: i64 },
    #[error("dedup.title_similarity: {value} is outside 0.0..=1.0")]
    InvalidSimilarity { value: f64 },
    #[error("{field}: weights must be finite, non-negative and not all zero")]
    InvalidWeights { field: &'static str },
    #[error("timeouts.{kind}: timeout must be greater than zero")]
    InvalidTimeout { kind: SourceKind },
    #[error("source_priority: must list ticketing, social and trend exactly once")]
    InvalidPriority,
    #[error("{var}: `{value}` is not a valid override")]
    InvalidEnv { var: &'static str, value: String },
    #[error("config: failed to load {}: {message}", path.display())]
    Load { path: PathBuf, message: String },
}

/// Run-level failure. Everything else degrades the report instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("all sources failed: {}", summarize(.failures))]
    AllSourcesFailed { failures: Vec<SourceFailure> },
}

fn summarize(failures: &[SourceFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}={}", f.kind, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}
