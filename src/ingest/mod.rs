// src/ingest/mod.rs
pub mod normalize;
pub mod providers;
pub mod types;

pub use normalize::{normalize_batch, normalize_record, normalize_text, NormalizedBatch};

use crate::config::SourceTimeouts;
use crate::error::SourceFailure;
use crate::ingest::types::{RawSourceRecord, SourceKind, SourceProvider};
use crate::query::Query;
use futures::stream::{FuturesUnordered, StreamExt};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use std::future::Future;
use std::time::{Duration, Instant};

/// One-time metrics registration (so series show up once a recorder is installed).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pulse_records_total", "Raw records returned by source providers.");
        describe_counter!(
            "pulse_malformed_total",
            "Records dropped by normalization as malformed."
        );
        describe_counter!(
            "pulse_source_failures_total",
            "Source queries that failed, timed out or were cancelled."
        );
        describe_counter!(
            "pulse_filtered_total",
            "Scored items dropped by the relevance cutoff."
        );
        describe_counter!("pulse_dedup_total", "Items removed by cross-source deduplication.");
        describe_histogram!("pulse_source_fetch_ms", "Source query time in milliseconds.");
    });
}

/// Result of querying one source, success or structured failure.
#[derive(Debug)]
pub struct SourceOutcome {
    pub kind: SourceKind,
    pub duration_ms: u64,
    pub result: Result<Vec<RawSourceRecord>, SourceFailure>,
}

impl SourceOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

fn elapsed_ms(t0: Instant) -> u64 {
    u64::try_from(t0.elapsed().as_millis()).unwrap_or(u64::MAX)
}

async fn fetch_one(p: &dyn SourceProvider, query: &Query, limit: Duration) -> SourceOutcome {
    let kind = p.kind();
    let t0 = Instant::now();
    let result = match tokio::time::timeout(limit, p.fetch(query)).await {
        Ok(Ok(records)) => Ok(records),
        Ok(Err(failure)) => Err(failure),
        Err(_) => Err(SourceFailure::timeout(kind, limit.as_millis() as u64)),
    };
    let duration_ms = elapsed_ms(t0);
    histogram!("pulse_source_fetch_ms", "source" => kind.as_str()).record(duration_ms as f64);

    match &result {
        Ok(records) => {
            counter!("pulse_records_total", "source" => kind.as_str())
                .increment(records.len() as u64);
            tracing::info!(target: "ingest", source = %kind, records = records.len(), duration_ms, "source fetched");
        }
        Err(failure) => {
            counter!("pulse_source_failures_total", "source" => kind.as_str()).increment(1);
            tracing::warn!(
                target: "ingest",
                provider = p.name(),
                reason = %failure.reason,
                retryable = failure.retryable,
                duration_ms,
                error = %failure.message,
                "provider error"
            );
        }
    }

    SourceOutcome {
        kind,
        duration_ms,
        result,
    }
}

/// Query every provider concurrently, each under its own timeout.
/// Outcomes come back in provider order.
pub async fn fetch_all(
    providers: &[Box<dyn SourceProvider>],
    query: &Query,
    timeouts: &SourceTimeouts,
) -> Vec<SourceOutcome> {
    fetch_all_until(providers, query, timeouts, std::future::pending::<()>()).await
}

/// Like [`fetch_all`], but once `cancel` resolves the in-flight queries are abandoned and
/// reported as `cancelled`. Outcomes that already completed are kept.
pub async fn fetch_all_until<C>(
    providers: &[Box<dyn SourceProvider>],
    query: &Query,
    timeouts: &SourceTimeouts,
    cancel: C,
) -> Vec<SourceOutcome>
where
    C: Future<Output = ()>,
{
    ensure_metrics_described();
    let t0 = Instant::now();

    let mut in_flight: FuturesUnordered<_> = providers
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let limit = timeouts.for_source(p.kind());
            async move { (i, fetch_one(p.as_ref(), query, limit).await) }
        })
        .collect();

    let mut slots: Vec<Option<SourceOutcome>> = providers.iter().map(|_| None).collect();
    tokio::pin!(cancel);

    loop {
        tokio::select! {
            biased;
            next = in_flight.next() => match next {
                Some((i, outcome)) => slots[i] = Some(outcome),
                None => break,
            },
            _ = &mut cancel => {
                tracing::warn!(target: "ingest", pending = in_flight.len(), "run cancelled; abandoning in-flight sources");
                break;
            }
        }
    }
    drop(in_flight);

    slots
        .into_iter()
        .zip(providers)
        .map(|(slot, p)| {
            slot.unwrap_or_else(|| {
                counter!("pulse_source_failures_total", "source" => p.kind().as_str()).increment(1);
                SourceOutcome {
                    kind: p.kind(),
                    duration_ms: elapsed_ms(t0),
                    result: Err(SourceFailure::cancelled(p.kind())),
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureReason;
    use crate::ingest::types::TrendSample;
    use async_trait::async_trait;

    struct Slow(SourceKind, u64);

    #[async_trait]
    impl SourceProvider for Slow {
        fn kind(&self) -> SourceKind {
            self.0
        }
        async fn fetch(&self, _q: &Query) -> Result<Vec<RawSourceRecord>, SourceFailure> {
            tokio::time::sleep(Duration::from_millis(self.1)).await;
            Ok(vec![RawSourceRecord::Trend(TrendSample::default())])
        }
    }

    fn q() -> Query {
        Query::parse("Proms", "2025-07-18", None).unwrap()
    }

    #[tokio::test]
    async fn timeout_is_per_source() {
        let providers: Vec<Box<dyn SourceProvider>> = vec![
            Box::new(Slow(SourceKind::Ticketing, 5)),
            Box::new(Slow(SourceKind::Social, 2_000)),
        ];
        let timeouts = SourceTimeouts {
            ticketing_ms: 500,
            social_ms: 50,
            trend_ms: 500,
        };
        let out = fetch_all(&providers, &q(), &timeouts).await;
        assert_eq!(out[0].kind, SourceKind::Ticketing);
        assert!(out[0].is_ok());
        let failure = out[1].result.as_ref().unwrap_err();
        assert_eq!(failure.reason, FailureReason::Timeout);
        assert!(failure.retryable);
    }

    #[tokio::test]
    async fn cancel_keeps_completed_sources() {
        let providers: Vec<Box<dyn SourceProvider>> = vec![
            Box::new(Slow(SourceKind::Ticketing, 1)),
            Box::new(Slow(SourceKind::Trend, 10_000)),
        ];
        let cancel = tokio::time::sleep(Duration::from_millis(200));
        let out = fetch_all_until(&providers, &q(), &SourceTimeouts::default(), cancel).await;
        assert!(out[0].is_ok());
        assert_eq!(
            out[1].result.as_ref().unwrap_err().reason,
            FailureReason::Cancelled
        );
    }
}
