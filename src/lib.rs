// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod persist;
pub mod pipeline;
pub mod query;
pub mod relevance;
pub mod report;

// ---- Re-exports for stable public API ----
pub use crate::config::{PipelineConfig, SourcesConfig};
pub use crate::error::{ConfigError, FailureReason, PipelineError, SourceFailure};
pub use crate::ingest::types::{NormalizedItem, RawSourceRecord, ScoredItem, SourceKind, SourceProvider};
pub use crate::pipeline::Pipeline;
pub use crate::query::Query;
pub use crate::report::AggregateReport;
