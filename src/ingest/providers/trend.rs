// src/ingest/providers/trend.rs
//! Search-interest time series from a JSON endpoint.
//!
//! Accepted bodies: `{"timeline": [{"date": "2025-06-25", "value": 87}, ...]}` or a bare array
//! of the same samples. Requests ask for the UK locale and UTC buckets around the query date.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use serde::Deserialize;
use std::path::Path;

use super::{http_client, read_fixture, CLIENT_USER_AGENT};
use crate::config::SourcesConfig;
use crate::error::{FailureReason, SourceFailure};
use crate::ingest::types::{RawSourceRecord, SourceKind, SourceProvider, TrendSample};
use crate::query::Query;

/// Days requested on each side of the query date.
pub const SPAN_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Body {
    Wrapped { timeline: Vec<TrendSample> },
    Bare(Vec<TrendSample>),
}

pub fn parse_series(json: &str) -> Result<Vec<TrendSample>> {
    let body: Body = serde_json::from_str(json).context("parsing trend json")?;
    Ok(match body {
        Body::Wrapped { timeline } => timeline,
        Body::Bare(v) => v,
    })
}

pub struct TrendProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client, endpoint: String },
    NotConfigured,
}

impl TrendProvider {
    pub fn from_fixture_str(json: &str) -> Self {
        Self {
            mode: Mode::Fixture(json.to_string()),
        }
    }

    pub fn from_fixture_file(path: &Path) -> Result<Self> {
        Ok(Self::from_fixture_str(&read_fixture(path)?))
    }

    pub fn from_config(cfg: &SourcesConfig) -> Result<Self> {
        let mode = match &cfg.trend_endpoint {
            Some(endpoint) => Mode::Http {
                client: http_client(CLIENT_USER_AGENT)?,
                endpoint: endpoint.clone(),
            },
            None => Mode::NotConfigured,
        };
        Ok(Self { mode })
    }

    /// `(start, end)` as `YYYY-MM-DD`.
    pub fn timeframe(query: &Query) -> (String, String) {
        let d = query.date();
        let start = d - ChronoDuration::days(SPAN_DAYS);
        let end = d + ChronoDuration::days(SPAN_DAYS);
        (start.format("%Y-%m-%d").to_string(), end.format("%Y-%m-%d").to_string())
    }

    async fn fetch_http(client: &reqwest::Client, endpoint: &str, query: &Query) -> Result<Vec<TrendSample>> {
        let (start, end) = Self::timeframe(query);
        let body = client
            .get(endpoint)
            .query(&[
                ("keyword", query.keyword()),
                ("start", start.as_str()),
                ("end", end.as_str()),
                ("hl", "en-GB"),
                ("geo", "GB"),
                ("tz", "0"),
            ])
            .send()
            .await
            .context("trend request")?
            .error_for_status()
            .context("trend status")?
            .text()
            .await
            .context("trend http .text()")?;
        parse_series(&body)
    }
}

#[async_trait]
impl SourceProvider for TrendProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Trend
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<RawSourceRecord>, SourceFailure> {
        let kind = self.kind();
        let series = match &self.mode {
            Mode::Fixture(json) => parse_series(json)
                .map_err(|e| SourceFailure::from_anyhow(kind, &e, FailureReason::Parse))?,
            Mode::Http { client, endpoint } => Self::fetch_http(client, endpoint, query)
                .await
                .map_err(|e| SourceFailure::from_anyhow(kind, &e, FailureReason::Parse))?,
            Mode::NotConfigured => {
                return Err(SourceFailure::new(
                    kind,
                    FailureReason::NotConfigured,
                    "TREND_ENDPOINT not set",
                ))
            }
        };
        Ok(series.into_iter().map(RawSourceRecord::Trend).collect())
    }
}
