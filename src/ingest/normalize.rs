// src/ingest/normalize.rs
//! Source record normalizer: one mapping per `RawSourceRecord` tag into `NormalizedItem`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Europe::London;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::error::NormalizationError;
use crate::ingest::types::{
    NormalizedItem, RawSourceRecord, SocialPost, SourceKind, TicketingListing, TrendSample,
};
use crate::query::Query;

const TITLE_CAP: usize = 200;
const TEXT_CAP: usize = 1500;

/// Normalize text: decode entities, strip tags, collapse whitespace, strip stray punctuation.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // Strip trailing sentence punctuation (keep quotes)
    while let Some(last) = out.chars().last() {
        if matches!(last, '!' | '?' | '.' | ',') {
            out.pop();
        } else {
            break;
        }
    }

    cap_chars(out, TEXT_CAP)
}

pub(crate) fn cap_chars(s: String, max: usize) -> String {
    if s.chars().count() > max {
        s.chars().take(max).collect()
    } else {
        s
    }
}

fn clean_opt(s: Option<&str>) -> Option<String> {
    s.map(normalize_text).filter(|t| !t.is_empty())
}

/// Short stable id for records that only carry a URL.
pub(crate) fn url_id(url: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(url.trim().as_bytes());
    let mut out = String::with_capacity(16);
    out.push_str("url:");
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Parse the timestamp shapes the sources emit.
///
/// Offsets are honoured; naive date-times are UK local; bare dates are UTC midnight,
/// which always falls on the same UK calendar day.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, NormalizationError> {
    let s = raw.trim();
    let invalid = || NormalizationError::InvalidTimestamp {
        value: raw.to_string(),
    };
    if s.is_empty() {
        return Err(invalid());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return uk_local_to_utc(naive).ok_or_else(invalid);
        }
    }
    // Card texts such as "Wed, 25 Jun 2025, 19:00" or "25 June 2025 7:00 PM".
    for fmt in [
        "%a, %d %b %Y, %H:%M",
        "%a, %d %b %Y %H:%M",
        "%d %B %Y %I:%M %p",
        "%d %b %Y %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return uk_local_to_utc(naive).ok_or_else(invalid);
        }
    }
    for fmt in ["%Y-%m-%d", "%a, %d %b %Y", "%d %B %Y", "%d %b %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date_to_utc(d));
        }
    }
    Err(invalid())
}

fn uk_local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    London
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn date_to_utc(d: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&d.and_time(chrono::NaiveTime::MIN))
}

/// Geography implied by a UK community name.
pub fn community_location(community: &str) -> Option<&'static str> {
    let c = community.trim().trim_start_matches("r/").to_ascii_lowercase();
    let loc = match c.as_str() {
        "unitedkingdom" | "uk" | "casualuk" | "britishproblems" | "askuk" => "United Kingdom",
        "london" => "London",
        "manchester" => "Manchester",
        "birmingham" => "Birmingham",
        "glasgow" => "Glasgow",
        "edinburgh" => "Edinburgh",
        "liverpool" => "Liverpool",
        "bristol" => "Bristol",
        "leeds" => "Leeds",
        _ => return None,
    };
    Some(loc)
}

/// Convert one raw record. Exactly one item or a `NormalizationError`.
pub fn normalize_record(
    record: &RawSourceRecord,
    query: &Query,
) -> Result<NormalizedItem, NormalizationError> {
    match record {
        RawSourceRecord::Ticketing(l) => normalize_ticketing(l),
        RawSourceRecord::Social(p) => normalize_social(p),
        RawSourceRecord::Trend(t) => normalize_trend(t, query),
    }
}

fn normalize_ticketing(l: &TicketingListing) -> Result<NormalizedItem, NormalizationError> {
    let kind = SourceKind::Ticketing;
    let external_id = l
        .listing_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| l.url.as_deref().filter(|u| !u.trim().is_empty()).map(url_id))
        .ok_or(NormalizationError::MissingId { kind })?;

    let title = clean_opt(l.name.as_deref())
        .or_else(|| clean_opt(l.summary.as_deref()))
        .ok_or_else(|| NormalizationError::MissingText {
            kind,
            id: external_id.clone(),
        })?;
    let text = clean_opt(l.summary.as_deref()).unwrap_or_default();

    let location = [l.venue.as_deref(), l.city.as_deref()]
        .into_iter()
        .filter_map(clean_opt)
        .collect::<Vec<_>>();

    Ok(NormalizedItem {
        source: kind,
        external_id,
        title: cap_chars(title, TITLE_CAP),
        text,
        timestamp: l.start.as_deref().and_then(|s| parse_timestamp(s).ok()),
        engagement: l
            .interest
            .filter(|v| v.is_finite())
            .map(|v| v.round().max(0.0) as i64)
            .unwrap_or(0),
        location: (!location.is_empty()).then(|| location.join(", ")),
        url: l.url.clone(),
    })
}

fn normalize_social(p: &SocialPost) -> Result<NormalizedItem, NormalizationError> {
    let kind = SourceKind::Social;
    let external_id = p
        .id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(NormalizationError::MissingId { kind })?;

    let title = clean_opt(p.title.as_deref());
    let body = clean_opt(p.body.as_deref());
    let (title, text) = match (title, body) {
        (Some(t), b) => (t, b.unwrap_or_default()),
        (None, Some(b)) => (b.clone(), b),
        (None, None) => {
            return Err(NormalizationError::MissingText {
                kind,
                id: external_id,
            })
        }
    };

    let timestamp = p
        .created_utc
        .filter(|v| v.is_finite())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs.trunc() as i64, 0));

    Ok(NormalizedItem {
        source: kind,
        external_id,
        title: cap_chars(title, TITLE_CAP),
        text,
        timestamp,
        engagement: p.score.max(0).saturating_add(p.num_comments.max(0)),
        location: p
            .community
            .as_deref()
            .and_then(community_location)
            .map(str::to_string),
        url: p
            .permalink
            .as_deref()
            .map(|pl| format!("https://reddit.com{pl}")),
    })
}

fn normalize_trend(t: &TrendSample, query: &Query) -> Result<NormalizedItem, NormalizationError> {
    let kind = SourceKind::Trend;
    let raw_date = t
        .date
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(NormalizationError::MissingId { kind })?;
    let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|_| {
        NormalizationError::InvalidTimestamp {
            value: raw_date.to_string(),
        }
    })?;

    Ok(NormalizedItem {
        source: kind,
        external_id: format!("trend:{date}"),
        title: query.keyword().to_string(),
        text: String::new(),
        timestamp: Some(date_to_utc(date)),
        engagement: t
            .value
            .filter(|v| v.is_finite())
            .map(|v| v.round().clamp(0.0, 100.0) as i64)
            .unwrap_or(0),
        location: None,
        url: None,
    })
}

/// Items from one source plus the number of records dropped as malformed.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub items: Vec<NormalizedItem>,
    pub malformed: usize,
}

/// Normalize a source's records; malformed records are skipped and counted.
pub fn normalize_batch(records: &[RawSourceRecord], query: &Query) -> NormalizedBatch {
    let mut batch = NormalizedBatch {
        items: Vec::with_capacity(records.len()),
        malformed: 0,
    };
    for rec in records {
        match normalize_record(rec, query) {
            Ok(item) => batch.items.push(item),
            Err(e) => {
                tracing::debug!(target: "ingest", source = %rec.kind(), error = %e, "malformed record skipped");
                batch.malformed += 1;
            }
        }
    }
    batch
}
