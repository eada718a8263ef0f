// src/filter.rs
//! Threshold filter: keep items whose relevance score reaches the cutoff.

use crate::ingest::types::ScoredItem;

#[inline]
pub fn passes(item: &ScoredItem, cutoff: u8) -> bool {
    item.relevance_score() >= cutoff
}

/// Kept items (input order preserved) and the number dropped.
#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub kept: Vec<ScoredItem>,
    pub dropped: usize,
}

pub fn apply_cutoff(items: Vec<ScoredItem>, cutoff: u8) -> FilterOutcome {
    let total = items.len();
    let kept: Vec<ScoredItem> = items.into_iter().filter(|it| passes(it, cutoff)).collect();
    FilterOutcome {
        dropped: total - kept.len(),
        kept,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{NormalizedItem, SourceKind};

    fn scored(id: &str, score: u8) -> ScoredItem {
        ScoredItem::new(
            NormalizedItem {
                source: SourceKind::Social,
                external_id: id.into(),
                title: id.into(),
                text: String::new(),
                timestamp: None,
                engagement: 0,
                location: None,
                url: None,
            },
            score,
        )
    }

    #[test]
    fn zero_keeps_everything_hundred_keeps_perfect() {
        let items = vec![scored("a", 0), scored("b", 89), scored("c", 90), scored("d", 100)];
        assert_eq!(apply_cutoff(items.clone(), 0).kept.len(), 4);

        let out = apply_cutoff(items.clone(), 90);
        assert_eq!(
            out.kept.iter().map(|i| i.item.external_id.as_str()).collect::<Vec<_>>(),
            vec!["c", "d"]
        );
        assert_eq!(out.dropped, 2);

        let out = apply_cutoff(items, 100);
        assert_eq!(out.kept.len(), 1);
        assert_eq!(out.kept[0].relevance_score(), 100);
    }
}
