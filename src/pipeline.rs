// src/pipeline.rs
//! End-to-end run: fetch → normalize → score → filter → dedup → report.
//!
//! Only the fetch stage suspends. Everything after it is a synchronous fold over the
//! per-source outcomes, in provider order.

use chrono::{NaiveDate, Utc};
use metrics::counter;
use std::future::Future;
use std::time::Instant;
use tracing::info;

use crate::config::PipelineConfig;
use crate::dedup::Deduplicator;
use crate::error::PipelineError;
use crate::filter::apply_cutoff;
use crate::ingest::types::{NormalizedItem, SourceKind, SourceProvider};
use crate::ingest::{self, normalize_batch, SourceOutcome};
use crate::query::Query;
use crate::relevance::RelevanceScorer;
use crate::report::{AggregateReport, ReportBuilder, SourceStats};

pub struct Pipeline {
    cfg: PipelineConfig,
    providers: Vec<Box<dyn SourceProvider>>,
    scorer: RelevanceScorer,
    dedup: Deduplicator,
}

impl Pipeline {
    /// Rejects an invalid config before any source can be queried.
    pub fn new(
        cfg: PipelineConfig,
        providers: Vec<Box<dyn SourceProvider>>,
    ) -> Result<Self, PipelineError> {
        cfg.validate()?;
        Ok(Self {
            scorer: RelevanceScorer::new(&cfg),
            dedup: Deduplicator::new(&cfg),
            cfg,
            providers,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    pub async fn run(&self, query: &Query) -> Result<AggregateReport, PipelineError> {
        self.run_with_cancel(query, std::future::pending::<()>()).await
    }

    /// When `cancel` resolves, sources still in flight are recorded as `cancelled` and the
    /// report is built from whatever already completed.
    pub async fn run_with_cancel<C>(
        &self,
        query: &Query,
        cancel: C,
    ) -> Result<AggregateReport, PipelineError>
    where
        C: Future<Output = ()>,
    {
        let started = Instant::now();
        info!(
            target: "pipeline",
            keyword = query.keyword(),
            date = %query.date(),
            location = query.location_hint().unwrap_or("-"),
            cutoff = self.cfg.cutoff(),
            "run started"
        );
        let outcomes =
            ingest::fetch_all_until(&self.providers, query, &self.cfg.timeouts, cancel).await;
        self.assemble(query, outcomes, started)
    }

    /// The synchronous half of a run, over already-fetched outcomes.
    pub fn assemble(
        &self,
        query: &Query,
        outcomes: Vec<SourceOutcome>,
        started: Instant,
    ) -> Result<AggregateReport, PipelineError> {
        let mut builder = ReportBuilder::new(query, &self.cfg);
        let mut items: Vec<NormalizedItem> = Vec::new();
        let mut trend_series: Vec<(NaiveDate, i64)> = Vec::new();

        for outcome in outcomes {
            let kind = outcome.kind;
            match outcome.result {
                Ok(records) => {
                    let batch = normalize_batch(&records, query);
                    if batch.malformed > 0 {
                        counter!("pulse_malformed_total", "source" => kind.as_str())
                            .increment(batch.malformed as u64);
                    }
                    if kind == SourceKind::Trend {
                        trend_series.extend(
                            batch
                                .items
                                .iter()
                                .filter_map(|it| it.timestamp.map(|t| (t.date_naive(), it.engagement))),
                        );
                    }
                    builder = builder.source(SourceStats::succeeded(
                        kind,
                        outcome.duration_ms,
                        records.len(),
                        batch.malformed,
                    ));
                    items.extend(batch.items);
                }
                Err(failure) => {
                    builder = builder.source(SourceStats::failed(failure, outcome.duration_ms));
                }
            }
        }

        let scored = self.scorer.score_all(items, query);
        let scored_total = scored.len();
        let filtered = apply_cutoff(scored, self.cfg.cutoff());
        counter!("pulse_filtered_total").increment(filtered.dropped as u64);

        let deduped = self.dedup.dedup(filtered.kept);
        counter!("pulse_dedup_total").increment(deduped.removed as u64);

        info!(
            target: "pipeline",
            scored = scored_total,
            dropped = filtered.dropped,
            dedup_removed = deduped.removed,
            kept = deduped.kept.len(),
            "items processed"
        );

        let run_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let report = builder
            .items(deduped.kept)
            .trend_series(trend_series)
            .filtered_out(filtered.dropped)
            .dedup_removed(deduped.removed)
            .build(Utc::now(), run_ms)?;

        info!(
            target: "pipeline",
            total = report.summary().total_items,
            composite = report.summary().composite_trend_score,
            degraded = report.metadata().degraded,
            duration_ms = run_ms,
            "report built"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn invalid_config_rejected_up_front() {
        let cfg = PipelineConfig {
            relevance_cutoff: -1,
            ..Default::default()
        };
        let err = Pipeline::new(cfg, Vec::new()).err().unwrap();
        assert!(matches!(
            err,
            PipelineError::Config(ConfigError::InvalidCutoff { value: -1 })
        ));
        assert!(err.to_string().contains("relevance_cutoff"));
    }
}
