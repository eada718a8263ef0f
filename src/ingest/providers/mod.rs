// src/ingest/providers/mod.rs
//! Source collaborators. Each provider runs either from a fixture (offline) or over HTTP.

pub mod social;
pub mod ticketing;
pub mod trend;

pub use social::SocialProvider;
pub use ticketing::TicketingProvider;
pub use trend::TrendProvider;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::SourcesConfig;
use crate::ingest::types::SourceProvider;

/// Browser-like agent for the ticketing pages; the listing site rejects bare clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Agent for the API-style sources.
pub const CLIENT_USER_AGENT: &str = concat!("event-pulse/", env!("CARGO_PKG_VERSION"));

pub(crate) fn http_client(user_agent: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .context("building http client")
}

pub(crate) fn read_fixture(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading fixture {}", path.display()))
}

/// Optional fixture files, one per source. A source with a fixture never touches the network.
#[derive(Debug, Clone, Default)]
pub struct FixturePaths {
    pub ticketing: Option<PathBuf>,
    pub social: Option<PathBuf>,
    pub trend: Option<PathBuf>,
}

/// All three providers in default priority order.
pub fn build_providers(
    sources: &SourcesConfig,
    fixtures: &FixturePaths,
) -> Result<Vec<Box<dyn SourceProvider>>> {
    let ticketing = match &fixtures.ticketing {
        Some(p) => TicketingProvider::from_fixture_file(p, &sources.ticketing_base_url)?,
        None => TicketingProvider::from_config(sources)?,
    };
    let social = match &fixtures.social {
        Some(p) => SocialProvider::from_fixture_file(p)?,
        None => SocialProvider::from_config(sources)?,
    };
    let trend = match &fixtures.trend {
        Some(p) => TrendProvider::from_fixture_file(p)?,
        None => TrendProvider::from_config(sources)?,
    };
    Ok(vec![Box::new(ticketing), Box::new(social), Box::new(trend)])
}
