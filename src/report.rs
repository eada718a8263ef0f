// src/report.rs
//! # Aggregate Report
//! Summary counts, the composite trend score and run metadata around the surviving items.
//!
//! JSON shape: `{ "summary": {...}, "detail": [...], "metadata": {...} }`.
//! A source that failed is reported as `null` in `summary.per_source`, never omitted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::{PipelineConfig, ScoringWeights, TrendBlend};
use crate::error::{PipelineError, SourceFailure};
use crate::ingest::types::{ScoredItem, SourceKind};
use crate::query::Query;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    Unknown,
}

/// Statistics over the whole interest series (before filtering).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendInterest {
    /// Interest on the query date, when that bucket exists.
    pub on_date: Option<i64>,
    pub max: i64,
    pub min: i64,
    pub avg: f64,
    pub direction: TrendDirection,
    pub samples: usize,
}

impl TrendInterest {
    /// `None` for an empty series.
    pub fn from_series(series: &[(NaiveDate, i64)], date: NaiveDate) -> Option<Self> {
        if series.is_empty() {
            return None;
        }
        let mut sorted = series.to_vec();
        sorted.sort_by_key(|(d, _)| *d);

        let values: Vec<i64> = sorted.iter().map(|(_, v)| *v).collect();
        let max = values.iter().copied().max().unwrap_or(0);
        let min = values.iter().copied().min().unwrap_or(0);
        let avg = values.iter().sum::<i64>() as f64 / values.len() as f64;

        let direction = match (values.first(), values.last()) {
            (Some(first), Some(last)) if values.len() >= 2 => {
                if last > first {
                    TrendDirection::Increasing
                } else if last < first {
                    TrendDirection::Decreasing
                } else {
                    TrendDirection::Stable
                }
            }
            _ => TrendDirection::Unknown,
        };

        Some(Self {
            on_date: sorted.iter().find(|(d, _)| *d == date).map(|(_, v)| *v),
            max,
            min,
            avg: (avg * 100.0).round() / 100.0,
            direction,
            samples: values.len(),
        })
    }

    /// Interest used by the composite score: the query-date bucket, else the series max.
    pub fn headline(&self) -> i64 {
        self.on_date.unwrap_or(self.max)
    }
}

/// Blend engagement volume and search interest into 0..=100.
///
/// engagement component = 100·E / (E + half_saturation); interest is already 0..=100.
/// Missing interest drops out of the weighted mean instead of counting as zero.
pub fn composite_trend_score(total_engagement: i64, interest: Option<i64>, blend: &TrendBlend) -> u8 {
    let e = total_engagement.max(0) as f64;
    let half = blend.engagement_half_saturation.max(f64::EPSILON);
    let engagement_component = 100.0 * e / (e + half);

    let mut num = blend.engagement_weight * engagement_component;
    let mut denom = blend.engagement_weight;
    if let Some(i) = interest {
        num += blend.interest_weight * i.clamp(0, 100) as f64;
        denom += blend.interest_weight;
    }
    if denom <= 0.0 {
        return 0;
    }
    (num / denom).round().clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Surviving items per source; `null` when the source failed.
    pub per_source: BTreeMap<SourceKind, Option<usize>>,
    pub total_items: usize,
    pub total_engagement: i64,
    pub composite_trend_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend_interest: Option<TrendInterest>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thresholds {
    pub relevance_cutoff: u8,
    pub date_window_days: i64,
    pub neutral_date_score: i64,
    pub neutral_location_score: i64,
    pub title_similarity: f64,
    pub dedup_day_tolerance: i64,
    pub weights: ScoringWeights,
    pub blend: TrendBlend,
    pub source_priority: Vec<SourceKind>,
}

impl Thresholds {
    fn from_config(cfg: &PipelineConfig) -> Self {
        Self {
            relevance_cutoff: cfg.cutoff(),
            date_window_days: cfg.date_window_days,
            neutral_date_score: cfg.neutral_date_score,
            neutral_location_score: cfg.neutral_location_score,
            title_similarity: cfg.dedup.title_similarity,
            dedup_day_tolerance: cfg.dedup.day_tolerance,
            weights: cfg.weights,
            blend: cfg.blend,
            source_priority: cfg.source_priority.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub query: Query,
    pub collected_at: DateTime<Utc>,
    pub run_duration_ms: u64,
    pub sources_attempted: Vec<SourceKind>,
    pub sources_successful: Vec<SourceKind>,
    /// At least one source failed.
    pub degraded: bool,
    pub source_durations_ms: BTreeMap<SourceKind, u64>,
    /// Raw records per successful source, before normalization and filtering.
    pub raw_counts: BTreeMap<SourceKind, usize>,
    pub malformed_counts: BTreeMap<SourceKind, usize>,
    pub filtered_out: usize,
    pub dedup_removed: usize,
    pub thresholds: Thresholds,
    pub failures: Vec<SourceFailure>,
}

/// Final, immutable output of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    summary: Summary,
    detail: Vec<ScoredItem>,
    metadata: Metadata,
}

impl AggregateReport {
    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn detail(&self) -> &[ScoredItem] {
        &self.detail
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// Per-source bookkeeping collected while fetching and normalizing.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStats {
    pub kind: SourceKind,
    pub duration_ms: u64,
    pub raw_records: usize,
    pub malformed: usize,
    pub failure: Option<SourceFailure>,
}

impl SourceStats {
    pub fn succeeded(kind: SourceKind, duration_ms: u64, raw_records: usize, malformed: usize) -> Self {
        Self {
            kind,
            duration_ms,
            raw_records,
            malformed,
            failure: None,
        }
    }

    pub fn failed(failure: SourceFailure, duration_ms: u64) -> Self {
        Self {
            kind: failure.kind,
            duration_ms,
            raw_records: 0,
            malformed: 0,
            failure: Some(failure),
        }
    }
}

pub struct ReportBuilder<'a> {
    query: &'a Query,
    cfg: &'a PipelineConfig,
    sources: Vec<SourceStats>,
    items: Vec<ScoredItem>,
    trend_series: Vec<(NaiveDate, i64)>,
    filtered_out: usize,
    dedup_removed: usize,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(query: &'a Query, cfg: &'a PipelineConfig) -> Self {
        Self {
            query,
            cfg,
            sources: Vec::new(),
            items: Vec::new(),
            trend_series: Vec::new(),
            filtered_out: 0,
            dedup_removed: 0,
        }
    }

    pub fn source(mut self, stats: SourceStats) -> Self {
        self.sources.push(stats);
        self
    }

    /// Deduplicated, filtered items.
    pub fn items(mut self, items: Vec<ScoredItem>) -> Self {
        self.items = items;
        self
    }

    /// The raw interest series `(bucket date, index)` from the trend source.
    pub fn trend_series(mut self, series: Vec<(NaiveDate, i64)>) -> Self {
        self.trend_series = series;
        self
    }

    pub fn filtered_out(mut self, n: usize) -> Self {
        self.filtered_out = n;
        self
    }

    pub fn dedup_removed(mut self, n: usize) -> Self {
        self.dedup_removed = n;
        self
    }

    /// Fails only when every attempted source failed.
    pub fn build(
        self,
        collected_at: DateTime<Utc>,
        run_duration_ms: u64,
    ) -> Result<AggregateReport, PipelineError> {
        let failures: Vec<SourceFailure> = self
            .sources
            .iter()
            .filter_map(|s| s.failure.clone())
            .collect();
        if self.sources.is_empty() || failures.len() == self.sources.len() {
            return Err(PipelineError::AllSourcesFailed { failures });
        }

        let mut per_source = BTreeMap::new();
        let mut source_durations_ms = BTreeMap::new();
        let mut raw_counts = BTreeMap::new();
        let mut malformed_counts = BTreeMap::new();
        let mut sources_attempted = Vec::new();
        let mut sources_successful = Vec::new();

        for s in &self.sources {
            sources_attempted.push(s.kind);
            source_durations_ms.insert(s.kind, s.duration_ms);
            if s.failure.is_some() {
                per_source.insert(s.kind, None);
                continue;
            }
            sources_successful.push(s.kind);
            raw_counts.insert(s.kind, s.raw_records);
            malformed_counts.insert(s.kind, s.malformed);
            let surviving = self.items.iter().filter(|it| it.source() == s.kind).count();
            per_source.insert(s.kind, Some(surviving));
        }

        let total_engagement: i64 = self
            .items
            .iter()
            .map(|it| it.item.engagement.max(0))
            .fold(0i64, |acc, e| acc.saturating_add(e));
        let trend_interest = TrendInterest::from_series(&self.trend_series, self.query.date());
        let composite = composite_trend_score(
            total_engagement,
            trend_interest.as_ref().map(TrendInterest::headline),
            &self.cfg.blend,
        );

        Ok(AggregateReport {
            summary: Summary {
                per_source,
                total_items: self.items.len(),
                total_engagement,
                composite_trend_score: composite,
                trend_interest,
            },
            detail: self.items,
            metadata: Metadata {
                query: self.query.clone(),
                collected_at,
                run_duration_ms,
                sources_attempted,
                sources_successful,
                degraded: !failures.is_empty(),
                source_durations_ms,
                raw_counts,
                malformed_counts,
                filtered_out: self.filtered_out,
                dedup_removed: self.dedup_removed,
                thresholds: Thresholds::from_config(self.cfg),
                failures,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureReason;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    #[test]
    fn composite_blends_available_components() {
        let blend = TrendBlend::default();
        // E == half_saturation → engagement component 50
        assert_eq!(composite_trend_score(500, None, &blend), 50);
        // 0.6·50 + 0.4·100
        assert_eq!(composite_trend_score(500, Some(100), &blend), 70);
        assert_eq!(composite_trend_score(0, Some(0), &blend), 0);
        let interest_only = TrendBlend {
            engagement_weight: 0.0,
            interest_weight: 1.0,
            ..Default::default()
        };
        assert_eq!(composite_trend_score(10_000, Some(42), &interest_only), 42);
        assert_eq!(composite_trend_score(10_000, None, &interest_only), 0);
    }

    #[test]
    fn trend_stats_and_direction() {
        let t = TrendInterest::from_series(&[(d(26), 40), (d(24), 20), (d(25), 100)], d(25)).unwrap();
        assert_eq!(t.on_date, Some(100));
        assert_eq!((t.max, t.min, t.samples), (100, 20, 3));
        assert_eq!(t.direction, TrendDirection::Increasing);
        assert_eq!(t.avg, 53.33);

        let single = TrendInterest::from_series(&[(d(1), 7)], d(25)).unwrap();
        assert_eq!(single.direction, TrendDirection::Unknown);
        assert_eq!(single.headline(), 7);
        assert!(TrendInterest::from_series(&[], d(25)).is_none());
    }

    #[test]
    fn all_failed_is_an_error() {
        let q = Query::parse("Proms", "2025-07-18", None).unwrap();
        let cfg = PipelineConfig::default();
        let res = ReportBuilder::new(&q, &cfg)
            .source(SourceStats::failed(
                SourceFailure::timeout(SourceKind::Ticketing, 5),
                5,
            ))
            .source(SourceStats::failed(
                SourceFailure::new(SourceKind::Social, FailureReason::Auth, "401"),
                3,
            ))
            .build(Utc::now(), 10);
        assert!(matches!(res, Err(PipelineError::AllSourcesFailed { failures }) if failures.len() == 2));
    }

    #[test]
    fn failed_source_is_null_not_missing() {
        let q = Query::parse("Proms", "2025-07-18", None).unwrap();
        let cfg = PipelineConfig::default();
        let report = ReportBuilder::new(&q, &cfg)
            .source(SourceStats::succeeded(SourceKind::Ticketing, 12, 4, 1))
            .source(SourceStats::failed(
                SourceFailure::timeout(SourceKind::Trend, 20),
                20,
            ))
            .build(Utc::now(), 25)
            .unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["per_source"]["ticketing"], 0);
        assert!(json["summary"]["per_source"]["trend"].is_null());
        assert_eq!(json["metadata"]["degraded"], true);
        assert_eq!(json["metadata"]["failures"][0]["source"], "trend");
        assert_eq!(json["metadata"]["failures"][0]["reason"], "timeout");
        assert_eq!(json["metadata"]["raw_counts"]["ticketing"], 4);
        assert!(json["detail"].as_array().unwrap().is_empty());
    }
}
