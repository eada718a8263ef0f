// src/relevance.rs
//! Relevance scorer: tokenizer, location classifier and the weighted 0–100 score.
//!
//! score = keyword·w_k + date·w_d + location·w_l (weights normalized by their sum),
//! each sub-score in 0..=100, result rounded and clamped to 0..=100.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Europe::London;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

use crate::config::{PipelineConfig, ScoringWeights};
use crate::ingest::types::{NormalizedItem, ScoredItem};
use crate::query::Query;

/// A single token with byte span and sequential index
#[derive(Debug, Clone)]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub index: usize, // 0-based token index in the sequence
}

/// Basic, Unicode-friendly tokenizer.
pub fn tokenize(input: &str) -> Vec<Token> {
    // \w covers [A-Za-z0-9_]; (?u) enables Unicode
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"(?u)\b\w+\b").expect("tokenizer regex"));
    re.find_iter(input)
        .enumerate()
        .map(|(i, m)| Token {
            text: m.as_str().to_string(),
            start: m.start(),
            end: m.end(),
            index: i,
        })
        .collect()
}

/// Lowercased token texts, order preserved.
pub fn words(input: &str) -> Vec<String> {
    tokenize(input)
        .into_iter()
        .map(|t| t.text.to_lowercase())
        .collect()
}

/* ----------------------------
Keyword
---------------------------- */

/// Letters and digits only, lowercased: `#TaylorSwift` and `Taylor Swift` both become `taylorswift`.
fn compact(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// 100 on a case-insensitive substring or phrase hit, else the fraction of distinct query words present.
pub fn keyword_score(keyword: &str, title: &str, text: &str) -> u8 {
    let kw_words = words(keyword);
    if kw_words.is_empty() {
        return 0;
    }
    let combined = format!("{title} {text}");

    let kw_lower = keyword.trim().to_lowercase();
    if combined.to_lowercase().contains(&kw_lower) {
        return 100;
    }

    // Phrase match on the token stream so punctuation and spacing differences don't matter.
    let hay_words = words(&combined);
    if hay_words
        .windows(kw_words.len())
        .any(|w| w == kw_words.as_slice())
    {
        return 100;
    }

    // Glued forms: hashtags, compound handles.
    let kw_compact = compact(keyword);
    if !kw_compact.is_empty() && compact(&combined).contains(&kw_compact) {
        return 100;
    }

    let hay: HashSet<&str> = hay_words.iter().map(String::as_str).collect();
    let mut wanted: Vec<&str> = kw_words.iter().map(String::as_str).collect();
    wanted.sort_unstable();
    wanted.dedup();
    let matched = wanted.iter().filter(|w| hay.contains(*w)).count();
    ((matched as f64 / wanted.len() as f64) * 100.0).round() as u8
}

/* ----------------------------
Date
---------------------------- */

/// Calendar date of a timestamp in the UK.
pub fn uk_date(ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&London).date_naive()
}

/// 100 on the query date, linear decay to 0 at `window_days`; `neutral` when there is no timestamp.
pub fn date_score(
    ts: Option<DateTime<Utc>>,
    target: NaiveDate,
    window_days: i64,
    neutral: u8,
) -> u8 {
    let Some(ts) = ts else {
        return neutral;
    };
    let dist = (uk_date(ts) - target).num_days().abs();
    if dist == 0 {
        return 100;
    }
    if window_days <= 0 || dist >= window_days {
        return 0;
    }
    (100.0 * (1.0 - dist as f64 / window_days as f64)).round() as u8
}

/* ----------------------------
Location
---------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationAffinity {
    Uk,
    NonUk,
    Unknown,
}

const UK_MARKERS: &[&str] = &[
    "uk", "u k", "united kingdom", "great britain", "britain", "gb", "england", "scotland",
    "wales", "northern ireland", "london", "manchester", "birmingham", "glasgow", "edinburgh",
    "liverpool", "bristol", "leeds", "cardiff", "belfast", "sheffield", "newcastle",
    "nottingham", "leicester", "brighton", "oxford", "cambridge", "southampton", "aberdeen",
    "dundee", "coventry", "somerset", "cornwall", "devon", "kent", "yorkshire", "pilton",
    "wembley",
];

const NON_UK_MARKERS: &[&str] = &[
    "usa", "united states", "america", "new york", "los angeles", "chicago",
    "san francisco", "canada", "toronto", "ontario", "france", "paris", "germany", "berlin",
    "spain", "madrid", "barcelona", "netherlands", "amsterdam", "ireland", "dublin", "italy",
    "rome", "australia", "sydney", "melbourne", "japan", "tokyo", "india", "mumbai",
];

/// Whole-phrase lookup over the lowercased token stream.
fn contains_phrase(hay: &[String], phrase: &str) -> bool {
    let needle: Vec<&str> = phrase.split(' ').collect();
    hay.windows(needle.len())
        .any(|w| w.iter().zip(&needle).all(|(a, b)| a == b))
}

/// Token spans `[start, end)` of every marker occurrence.
fn marker_spans(hay: &[String], markers: &[&str]) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    for m in markers {
        let needle: Vec<&str> = m.split(' ').collect();
        for (i, w) in hay.windows(needle.len()).enumerate() {
            if w.iter().zip(&needle).all(|(a, b)| a == b) {
                spans.push((i, i + needle.len()));
            }
        }
    }
    spans
}

fn parse_coordinates(s: &str) -> Option<(f64, f64)> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^\s*(-?\d{1,2}(?:\.\d+)?)\s*,\s*(-?\d{1,3}(?:\.\d+)?)\s*$")
            .expect("coordinate regex")
    });
    let caps = re.captures(s)?;
    let lat = caps.get(1)?.as_str().parse().ok()?;
    let lon = caps.get(2)?.as_str().parse().ok()?;
    Some((lat, lon))
}

/// Classify free text or `lat,lon` against the UK.
/// Markers from both sides make the location ambiguous; a hint match then counts as UK.
pub fn classify_location(location: &str, hint: Option<&str>) -> LocationAffinity {
    if let Some((lat, lon)) = parse_coordinates(location) {
        let in_uk = (49.8..=60.95).contains(&lat) && (-8.7..=1.8).contains(&lon);
        return if in_uk {
            LocationAffinity::Uk
        } else {
            LocationAffinity::NonUk
        };
    }

    let hay = words(location);
    if hay.is_empty() {
        return LocationAffinity::Unknown;
    }

    let uk_spans = marker_spans(&hay, UK_MARKERS);
    // A non-UK marker inside a UK phrase ("ireland" in "northern ireland") is not a hit.
    let non_uk = marker_spans(&hay, NON_UK_MARKERS)
        .into_iter()
        .any(|(s, e)| !uk_spans.iter().any(|&(us, ue)| us <= s && e <= ue));
    let affinity = match (!uk_spans.is_empty(), non_uk) {
        (true, false) => LocationAffinity::Uk,
        (false, true) => LocationAffinity::NonUk,
        _ => LocationAffinity::Unknown,
    };

    // The hint can only settle an unknown location.
    if affinity == LocationAffinity::Unknown {
        if let Some(h) = hint {
            let hint_words = words(h);
            if !hint_words.is_empty() && contains_phrase(&hay, &hint_words.join(" ")) {
                return LocationAffinity::Uk;
            }
        }
    }
    affinity
}

pub fn location_score(location: Option<&str>, hint: Option<&str>, neutral: u8) -> u8 {
    match location.map(|l| classify_location(l, hint)) {
        Some(LocationAffinity::Uk) => 100,
        Some(LocationAffinity::NonUk) => 0,
        Some(LocationAffinity::Unknown) | None => neutral,
    }
}

/* ----------------------------
Scorer
---------------------------- */

/// Sub-scores and the combined score for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Relevance {
    pub score: u8,
    pub keyword: u8,
    pub date: u8,
    pub location: u8,
}

/// Deterministic scorer; holds only configuration.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    weights: ScoringWeights,
    window_days: i64,
    neutral_date: u8,
    neutral_location: u8,
}

impl RelevanceScorer {
    pub fn new(cfg: &PipelineConfig) -> Self {
        Self {
            weights: cfg.weights,
            window_days: cfg.date_window_days.max(0),
            neutral_date: cfg.neutral_date_score.clamp(0, 100) as u8,
            neutral_location: cfg.neutral_location_score.clamp(0, 100) as u8,
        }
    }

    pub fn evaluate(&self, item: &NormalizedItem, query: &Query) -> Relevance {
        let keyword = keyword_score(query.keyword(), &item.title, &item.text);
        let date = date_score(item.timestamp, query.date(), self.window_days, self.neutral_date);
        let location = location_score(
            item.location.as_deref(),
            query.location_hint(),
            self.neutral_location,
        );

        let w = &self.weights;
        let denom = w.keyword + w.date + w.location;
        let raw = if denom > 0.0 {
            (w.keyword * keyword as f64 + w.date * date as f64 + w.location * location as f64)
                / denom
        } else {
            0.0
        };

        Relevance {
            score: raw.round().clamp(0.0, 100.0) as u8,
            keyword,
            date,
            location,
        }
    }

    pub fn score(&self, item: &NormalizedItem, query: &Query) -> u8 {
        self.evaluate(item, query).score
    }

    /// Score every item; consumes the unscored items.
    pub fn score_all(&self, items: Vec<NormalizedItem>, query: &Query) -> Vec<ScoredItem> {
        items
            .into_iter()
            .map(|item| {
                let r = self.evaluate(&item, query);
                tracing::trace!(
                    target: "relevance",
                    source = %item.source,
                    id = %item.external_id,
                    score = r.score,
                    keyword = r.keyword,
                    date = r.date,
                    location = r.location,
                    "scored"
                );
                ScoredItem::new(item, r.score)
            })
            .collect()
    }
}

/* ----------------------------
Tests
---------------------------- */
