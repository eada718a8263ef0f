// src/dedup.rs
//! Cross-source deduplication.
//!
//! Two items are the same entity when
//! - they share `(source, external_id)` (a re-fetch), or
//! - they come from different non-trend sources, their titles match (normalized equality or
//!   `strsim::normalized_levenshtein` >= `title_similarity`) and their UK calendar days are
//!   within `day_tolerance`.
//!
//! Trend buckets carry the query keyword as their title, so they only collapse on re-fetch.
//!
//! The representative is the higher-scored item; ties keep the one seen first in
//! source-priority order. Passes repeat until nothing merges, so the output is
//! pairwise duplicate-free and a second run is a no-op.

use strsim::normalized_levenshtein;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::ingest::types::{ScoredItem, SourceKind};
use crate::relevance::{uk_date, words};

/// Lowercase word tokens joined by single spaces; punctuation and spacing are dropped.
pub fn comparable_title(s: &str) -> String {
    words(s).join(" ")
}

/// Similarity of two titles in [0.0, 1.0] after normalization.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a = comparable_title(a);
    let b = comparable_title(b);
    if a == b {
        return if a.is_empty() { 0.0 } else { 1.0 };
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(&a, &b)
}

#[derive(Debug, Default)]
pub struct DedupOutcome {
    pub kept: Vec<ScoredItem>,
    pub removed: usize,
}

#[derive(Debug, Clone)]
pub struct Deduplicator {
    title_similarity: f64,
    day_tolerance: i64,
    priority: Vec<SourceKind>,
}

impl Deduplicator {
    pub fn new(cfg: &PipelineConfig) -> Self {
        Self {
            title_similarity: cfg.dedup.title_similarity,
            day_tolerance: cfg.dedup.day_tolerance.max(0),
            priority: cfg.source_priority.clone(),
        }
    }

    fn rank(&self, kind: SourceKind) -> usize {
        self.priority
            .iter()
            .position(|k| *k == kind)
            .unwrap_or(self.priority.len())
    }

    fn same_day_window(&self, a: &ScoredItem, b: &ScoredItem) -> bool {
        match (a.item.timestamp, b.item.timestamp) {
            (Some(ta), Some(tb)) => {
                (uk_date(ta) - uk_date(tb)).num_days().abs() <= self.day_tolerance
            }
            // No time evidence on one side: never merge across sources.
            _ => false,
        }
    }

    pub fn is_duplicate(&self, a: &ScoredItem, b: &ScoredItem) -> bool {
        if a.source() == b.source() {
            return a.item.external_id == b.item.external_id;
        }
        if a.source() == SourceKind::Trend || b.source() == SourceKind::Trend {
            return false;
        }
        self.same_day_window(a, b)
            && title_similarity(&a.item.title, &b.item.title) >= self.title_similarity
    }

    /// One merge pass over items already in priority order.
    fn pass(&self, items: Vec<ScoredItem>) -> (Vec<ScoredItem>, usize) {
        let mut reps: Vec<ScoredItem> = Vec::with_capacity(items.len());
        let mut removed = 0usize;

        for it in items {
            match reps.iter().position(|r| self.is_duplicate(r, &it)) {
                Some(j) => {
                    removed += 1;
                    if it.relevance_score() > reps[j].relevance_score() {
                        debug!(
                            target: "dedup",
                            kept = %it.item.external_id,
                            dropped = %reps[j].item.external_id,
                            "duplicate replaced by higher score"
                        );
                        reps[j] = it;
                    } else {
                        debug!(
                            target: "dedup",
                            kept = %reps[j].item.external_id,
                            dropped = %it.item.external_id,
                            "duplicate dropped"
                        );
                    }
                }
                None => reps.push(it),
            }
        }
        (reps, removed)
    }

    pub fn dedup(&self, items: Vec<ScoredItem>) -> DedupOutcome {
        let mut current = items;
        let mut removed = 0usize;
        loop {
            // Stable: input order is kept within a source.
            current.sort_by_key(|it| self.rank(it.source()));
            let (next, merged) = self.pass(current);
            removed += merged;
            if merged == 0 {
                return DedupOutcome {
                    kept: next,
                    removed,
                };
            }
            current = next;
        }
    }
}
