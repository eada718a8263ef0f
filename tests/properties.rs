// tests/properties.rs
//! Seeded randomized checks of the filter and dedup invariants.

use chrono::{TimeZone, Utc};
use event_pulse::dedup::Deduplicator;
use event_pulse::filter::apply_cutoff;
use event_pulse::ingest::types::NormalizedItem;
use event_pulse::{PipelineConfig, ScoredItem, SourceKind};
use rand::{rngs::StdRng, seq::IndexedRandom, Rng, SeedableRng};
use std::collections::HashSet;

const TITLES: &[&str] = &[
    "Arsenal v Chelsea",
    "Arsenal vs Chelsea",
    "Arsenal v Chelsea!",
    "Spurs v Villa",
    "Glastonbury Festival 2025",
    "Glastonbury festival 2025",
    "Proms in the Park",
    "Proms in the park - Hyde Park",
];

fn random_items(rng: &mut StdRng, n: usize) -> Vec<ScoredItem> {
    (0..n)
        .map(|_| {
            let source = *SourceKind::ALL.choose(rng).unwrap();
            let title = *TITLES.choose(rng).unwrap();
            let day = rng.random_range(20..=22);
            ScoredItem::new(
                NormalizedItem {
                    source,
                    external_id: format!("id{}", rng.random_range(0..6)),
                    title: title.to_string(),
                    text: String::new(),
                    timestamp: if rng.random_bool(0.9) {
                        Some(Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap())
                    } else {
                        None
                    },
                    engagement: rng.random_range(0..500),
                    location: None,
                    url: None,
                },
                rng.random_range(0..=100),
            )
        })
        .collect()
}

fn ids(items: &[ScoredItem]) -> HashSet<(SourceKind, String)> {
    items
        .iter()
        .map(|i| (i.source(), i.item.external_id.clone()))
        .collect()
}

#[test]
fn higher_cutoff_keeps_a_subset() {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    for _ in 0..200 {
        let items = random_items(&mut rng, 30);
        let c1: u8 = rng.random_range(0..=100);
        let c2: u8 = rng.random_range(c1..=100);

        let low = apply_cutoff(items.clone(), c1).kept;
        let high = apply_cutoff(items, c2).kept;
        assert!(high.len() <= low.len());
        for it in &high {
            assert!(it.relevance_score() >= c2);
            assert!(low.contains(it));
        }
    }
}

#[test]
fn dedup_is_idempotent_and_keys_are_unique() {
    let mut rng = StdRng::seed_from_u64(42);
    let d = Deduplicator::new(&PipelineConfig::default());
    for _ in 0..200 {
        let n = rng.random_range(0..40);
        let once = d.dedup(random_items(&mut rng, n));
        assert_eq!(ids(&once.kept).len(), once.kept.len());

        let twice = d.dedup(once.kept.clone());
        assert_eq!(twice.removed, 0);
        assert_eq!(twice.kept, once.kept);
    }
}

#[test]
fn dedup_never_loses_the_best_score_of_a_key() {
    let mut rng = StdRng::seed_from_u64(7);
    let d = Deduplicator::new(&PipelineConfig::default());
    for _ in 0..100 {
        let items = random_items(&mut rng, 25);
        let best = items.iter().map(|i| i.relevance_score()).max();
        let out = d.dedup(items);
        assert_eq!(out.kept.iter().map(|i| i.relevance_score()).max(), best);
    }
}
