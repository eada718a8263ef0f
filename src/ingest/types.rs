// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SourceFailure;
use crate::query::Query;

/// The three signal sources. Declaration order is the default tie-break priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Ticketing,
    Social,
    Trend,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Ticketing, SourceKind::Social, SourceKind::Trend];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Ticketing => "ticketing",
            SourceKind::Social => "social",
            SourceKind::Trend => "trend",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One listing card scraped from the ticketing site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketingListing {
    #[serde(default)]
    pub listing_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Start time as printed or published (RFC 3339, `YYYY-MM-DD HH:MM`, or a bare date).
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    /// Attendee / "interested" count when the card shows one.
    #[serde(default)]
    pub interest: Option<f64>,
}

/// One post from the social discussion API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialPost {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "selftext")]
    pub body: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub created_utc: Option<f64>,
    /// Originating community, e.g. `london`.
    #[serde(default, alias = "subreddit")]
    pub community: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
}

/// One bucket of the search-interest time series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendSample {
    /// Bucket date, `YYYY-MM-DD`.
    #[serde(default)]
    pub date: Option<String>,
    /// Interest index, 0..=100.
    #[serde(default, alias = "score")]
    pub value: Option<f64>,
}

/// Source-specific record, tagged by origin. One normalizer per tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "payload", rename_all = "lowercase")]
pub enum RawSourceRecord {
    Ticketing(TicketingListing),
    Social(SocialPost),
    Trend(TrendSample),
}

impl RawSourceRecord {
    pub fn kind(&self) -> SourceKind {
        match self {
            RawSourceRecord::Ticketing(_) => SourceKind::Ticketing,
            RawSourceRecord::Social(_) => SourceKind::Social,
            RawSourceRecord::Trend(_) => SourceKind::Trend,
        }
    }
}

/// Common item schema every stage after normalization works on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedItem {
    pub source: SourceKind,
    /// Unique within `source`; repeated ids are collapsed by dedup.
    pub external_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub engagement: i64,
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A normalized item after scoring. The score is fixed once this value exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredItem {
    #[serde(flatten)]
    pub item: NormalizedItem,
    relevance_score: u8,
}

impl ScoredItem {
    /// Scores above 100 are clamped.
    pub fn new(item: NormalizedItem, relevance_score: u8) -> Self {
        Self {
            item,
            relevance_score: relevance_score.min(100),
        }
    }

    pub fn relevance_score(&self) -> u8 {
        self.relevance_score
    }

    pub fn source(&self) -> SourceKind {
        self.item.source
    }

    /// Identity used by dedup rule (a).
    pub fn key(&self) -> (SourceKind, &str) {
        (self.item.source, self.item.external_id.as_str())
    }
}

/// A source collaborator. Each call returns the full record list or a structured failure.
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn fetch(&self, query: &Query) -> Result<Vec<RawSourceRecord>, SourceFailure>;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }
}
