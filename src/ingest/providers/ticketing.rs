// src/ingest/providers/ticketing.rs
//! Ticketing listings scraped from the UK search pages.
//!
//! Card selectors are tried in order; the first one with matches wins. When none match,
//! every link to an event page (`/e/`) is taken as a bare listing.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::path::Path;

use super::{http_client, read_fixture, BROWSER_USER_AGENT};
use crate::config::SourcesConfig;
use crate::error::{FailureReason, SourceFailure};
use crate::ingest::normalize::cap_chars;
use crate::ingest::types::{RawSourceRecord, SourceKind, SourceProvider, TicketingListing};
use crate::query::Query;
use crate::relevance::words;

pub const CARD_SELECTORS: &[&str] = &[
    "[data-testid='search-result-event-card']",
    ".search-event-card-wrapper",
    ".eds-event-card-content__primary-content",
    ".search-main-content__events-list-item",
    "[data-spec='search-result']",
    ".search-results-panel-content article",
    ".event-card",
    "[class*='event-card']",
    ".discover-search-desktop-card",
    ".eds-card-content",
];

const TITLE_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, [class*='title']";
const DATE_SELECTOR: &str = "time, [class*='date'], [class*='time'], [class*='when']";
const LOCATION_SELECTOR: &str = "[class*='location'], [class*='venue'], [class*='where']";
const EVENT_LINK_SELECTOR: &str = "a[href*='/e/']";

const FIELD_CAP: usize = 100;

pub struct TicketingProvider {
    base_url: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl TicketingProvider {
    /// Parse a saved search page instead of fetching one.
    pub fn from_fixture_str(html: &str, base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            mode: Mode::Fixture(html.to_string()),
        }
    }

    pub fn from_fixture_file(path: &Path, base_url: &str) -> Result<Self> {
        Ok(Self::from_fixture_str(&read_fixture(path)?, base_url))
    }

    pub fn from_config(cfg: &SourcesConfig) -> Result<Self> {
        Ok(Self {
            base_url: cfg.ticketing_base_url.trim_end_matches('/').to_string(),
            mode: Mode::Http {
                client: http_client(BROWSER_USER_AGENT)?,
            },
        })
    }

    /// Directory page first, then the keyword search restricted to the UK.
    pub fn search_urls(&self, keyword: &str) -> Vec<String> {
        let slug = words(keyword).join("-");
        let q: String = keyword.split_whitespace().collect::<Vec<_>>().join("+");
        vec![
            format!("{}/d/united-kingdom/{}/", self.base_url, slug),
            format!("{}/search?q={}&location=United+Kingdom", self.base_url, q),
        ]
    }

    async fn fetch_http(&self, client: &reqwest::Client, query: &Query) -> Result<Vec<TicketingListing>> {
        let mut last_err = None;
        let mut fetched_any = false;
        for url in self.search_urls(query.keyword()) {
            let body = match client.get(&url).send().await.and_then(|r| r.error_for_status()) {
                Ok(resp) => resp.text().await.context("ticketing http .text()")?,
                Err(e) => {
                    tracing::debug!(target: "ingest", url = %url, error = %e, "ticketing page failed");
                    last_err = Some(anyhow::Error::new(e).context(format!("ticketing get {url}")));
                    continue;
                }
            };
            fetched_any = true;
            let listings = parse_listings(&body, &self.base_url);
            if !listings.is_empty() {
                return Ok(listings);
            }
        }
        match (fetched_any, last_err) {
            (false, Some(e)) => Err(e),
            _ => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl SourceProvider for TicketingProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Ticketing
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<RawSourceRecord>, SourceFailure> {
        let listings = match &self.mode {
            Mode::Fixture(html) => parse_listings(html, &self.base_url),
            Mode::Http { client } => self
                .fetch_http(client, query)
                .await
                .map_err(|e| SourceFailure::from_anyhow(self.kind(), &e, FailureReason::Network))?,
        };
        Ok(listings.into_iter().map(RawSourceRecord::Ticketing).collect())
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {css:?}: {e}"))
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn absolutize(href: &str, base_url: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), href.trim_start_matches('/'))
    }
}

/// Numeric event id at the end of an event URL, e.g. `...-tickets-812345678901?aff=x`.
pub fn listing_id_from_url(url: &str) -> Option<String> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"-(\d{6,})/?(?:[?#].*)?$").unwrap());
    re.captures(url).map(|c| c[1].to_string())
}

fn interest_from_text(text: &str) -> Option<f64> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)(\d[\d,]*)\s+(?:interested|going|attending)").unwrap()
    });
    re.captures(text)
        .and_then(|c| c[1].replace(',', "").parse::<f64>().ok())
}

fn first_text(card: ElementRef<'_>, sel: &Selector) -> Option<String> {
    card.select(sel).map(text_of).find(|t| !t.is_empty())
}

fn listing_from_card(card: ElementRef<'_>, sels: &CardSelectors, base_url: &str) -> TicketingListing {
    let card_text = text_of(card);
    let name = first_text(card, &sels.title).unwrap_or_else(|| cap_chars(card_text.clone(), FIELD_CAP));
    let start = card
        .select(&sels.date)
        .find_map(|el| el.value().attr("datetime").map(str::to_string))
        .or_else(|| first_text(card, &sels.date))
        .map(|t| cap_chars(t, FIELD_CAP));
    let venue = first_text(card, &sels.location).map(|t| cap_chars(t, FIELD_CAP));
    let url = card
        .select(&sels.link)
        .find_map(|a| a.value().attr("href"))
        .filter(|h| !h.trim().is_empty())
        .map(|h| absolutize(h.trim(), base_url));

    TicketingListing {
        listing_id: url.as_deref().and_then(listing_id_from_url),
        name: Some(cap_chars(name, 200)),
        summary: None,
        url,
        start,
        venue,
        city: None,
        interest: interest_from_text(&card_text),
    }
}

struct CardSelectors {
    title: Selector,
    date: Selector,
    location: Selector,
    link: Selector,
}

impl CardSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            title: selector(TITLE_SELECTOR)?,
            date: selector(DATE_SELECTOR)?,
            location: selector(LOCATION_SELECTOR)?,
            link: selector("a[href]")?,
        })
    }
}

/// Extract listings from one search page. Unparseable markup yields an empty list.
pub fn parse_listings(html: &str, base_url: &str) -> Vec<TicketingListing> {
    match try_parse_listings(html, base_url) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(target: "ingest", error = ?e, "ticketing selectors unusable");
            Vec::new()
        }
    }
}

fn try_parse_listings(html: &str, base_url: &str) -> Result<Vec<TicketingListing>> {
    let doc = Html::parse_document(html);
    let sels = CardSelectors::new()?;

    for css in CARD_SELECTORS {
        let sel = selector(css)?;
        let cards: Vec<ElementRef<'_>> = doc.select(&sel).collect();
        if cards.is_empty() {
            continue;
        }
        tracing::debug!(target: "ingest", selector = css, cards = cards.len(), "ticketing cards matched");
        return Ok(cards
            .into_iter()
            .map(|c| listing_from_card(c, &sels, base_url))
            .collect());
    }

    let links = selector(EVENT_LINK_SELECTOR)?;
    let out: Vec<TicketingListing> = doc
        .select(&links)
        .enumerate()
        .filter_map(|(k, a)| {
            let href = absolutize(a.value().attr("href")?.trim(), base_url);
            let title = text_of(a);
            let name = if title.is_empty() {
                format!("Event {}", k + 1)
            } else {
                cap_chars(title, 200)
            };
            Some(TicketingListing {
                listing_id: listing_id_from_url(&href),
                name: Some(name),
                url: Some(href),
                ..Default::default()
            })
        })
        .collect();
    tracing::debug!(target: "ingest", links = out.len(), "ticketing fallback to event links");
    Ok(out)
}
