// src/ingest/providers/social.rs
//! Social discussion posts from UK communities (app-only OAuth, newest first).

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

use super::{http_client, read_fixture};
use crate::config::{SocialCredentials, SourcesConfig};
use crate::error::{FailureReason, SourceFailure};
use crate::ingest::types::{RawSourceRecord, SocialPost, SourceKind, SourceProvider};
use crate::query::Query;

pub const UK_COMMUNITIES: &[&str] = &[
    "unitedkingdom",
    "uk",
    "london",
    "manchester",
    "birmingham",
    "glasgow",
    "edinburgh",
    "liverpool",
    "bristol",
    "leeds",
    "casualuk",
    "britishproblems",
    "askuk",
];

/// Upper bound on posts per run.
pub const MAX_POSTS: usize = 1000;
const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
    #[serde(default)]
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: SocialPost,
}

/// Fixture files may hold either a raw listing page or a plain array of posts.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FixtureShape {
    Listing(Listing),
    Posts(Vec<SocialPost>),
}

pub struct SocialProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        client: reqwest::Client,
        auth_url: String,
        api_url: String,
        creds: SocialCredentials,
    },
    NotConfigured,
}

impl SocialProvider {
    pub fn from_fixture_str(json: &str) -> Self {
        Self {
            mode: Mode::Fixture(json.to_string()),
        }
    }

    pub fn from_fixture_file(path: &Path) -> Result<Self> {
        Ok(Self::from_fixture_str(&read_fixture(path)?))
    }

    /// Missing credentials are not an error here; `fetch` reports `not_configured`.
    pub fn from_config(cfg: &SourcesConfig) -> Result<Self> {
        let mode = match &cfg.social {
            Some(creds) => Mode::Http {
                client: http_client(&creds.user_agent)?,
                auth_url: cfg.social_auth_url.clone(),
                api_url: cfg.social_api_url.trim_end_matches('/').to_string(),
                creds: creds.clone(),
            },
            None => Mode::NotConfigured,
        };
        Ok(Self { mode })
    }

    pub fn search_url(api_url: &str) -> String {
        format!("{}/r/{}/search", api_url, UK_COMMUNITIES.join("+"))
    }

    fn parse_fixture(json: &str) -> Result<Vec<SocialPost>> {
        let shape: FixtureShape = serde_json::from_str(json).context("parsing social fixture json")?;
        Ok(match shape {
            FixtureShape::Listing(l) => l.data.children.into_iter().map(|c| c.data).collect(),
            FixtureShape::Posts(p) => p,
        })
    }

    async fn token(client: &reqwest::Client, auth_url: &str, creds: &SocialCredentials) -> Result<String> {
        let resp = client
            .post(auth_url)
            .basic_auth(&creds.client_id, Some(&creds.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("social token request")?
            .error_for_status()
            .context("social token status")?;
        let tok: TokenResponse = resp.json().await.context("social token body")?;
        Ok(tok.access_token)
    }

    async fn fetch_http(
        client: &reqwest::Client,
        auth_url: &str,
        api_url: &str,
        creds: &SocialCredentials,
        query: &Query,
    ) -> Result<Vec<SocialPost>> {
        let token = Self::token(client, auth_url, creds).await?;
        let url = Self::search_url(api_url);
        let limit = PAGE_SIZE.to_string();

        let mut posts = Vec::new();
        let mut after: Option<String> = None;
        while posts.len() < MAX_POSTS {
            let mut params: Vec<(&str, &str)> = vec![
                ("q", query.keyword()),
                ("restrict_sr", "1"),
                ("sort", "new"),
                ("t", "all"),
                ("limit", limit.as_str()),
                ("raw_json", "1"),
            ];
            if let Some(a) = after.as_deref() {
                params.push(("after", a));
            }
            let page: Listing = client
                .get(&url)
                .bearer_auth(&token)
                .query(&params)
                .send()
                .await
                .context("social search request")?
                .error_for_status()
                .context("social search status")?
                .json()
                .await
                .context("social search body")?;

            let got = page.data.children.len();
            posts.extend(page.data.children.into_iter().map(|c| c.data));
            after = page.data.after;
            if got == 0 || after.is_none() {
                break;
            }
        }
        posts.truncate(MAX_POSTS);
        Ok(posts)
    }
}

#[async_trait]
impl SourceProvider for SocialProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Social
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<RawSourceRecord>, SourceFailure> {
        let kind = self.kind();
        let posts = match &self.mode {
            Mode::Fixture(json) => Self::parse_fixture(json)
                .map_err(|e| SourceFailure::from_anyhow(kind, &e, FailureReason::Parse))?,
            Mode::Http {
                client,
                auth_url,
                api_url,
                creds,
            } => Self::fetch_http(client, auth_url, api_url, creds, query)
                .await
                .map_err(|e| SourceFailure::from_anyhow(kind, &e, FailureReason::Network))?,
            Mode::NotConfigured => {
                return Err(SourceFailure::new(
                    kind,
                    FailureReason::NotConfigured,
                    "REDDIT_CLIENT_ID / REDDIT_CLIENT_SECRET not set",
                ))
            }
        };
        Ok(posts.into_iter().map(RawSourceRecord::Social).collect())
    }
}
