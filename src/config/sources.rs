// src/config/sources.rs
//! Endpoints and credentials for the source collaborators, resolved from the environment.
//!
//! A source whose credentials are missing is not an error here: the provider reports a
//! `not_configured` failure at fetch time and the run continues on the other sources.

use std::env;

pub const DEFAULT_TICKETING_BASE_URL: &str = "https://www.eventbrite.co.uk";
pub const DEFAULT_SOCIAL_AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
pub const DEFAULT_SOCIAL_API_URL: &str = "https://oauth.reddit.com";
pub const DEFAULT_SOCIAL_USER_AGENT: &str = "event-pulse/0.1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcesConfig {
    pub ticketing_base_url: String,
    pub social_auth_url: String,
    pub social_api_url: String,
    pub social: Option<SocialCredentials>,
    /// JSON endpoint serving the interest time series; no public default exists.
    pub trend_endpoint: Option<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            ticketing_base_url: DEFAULT_TICKETING_BASE_URL.to_string(),
            social_auth_url: DEFAULT_SOCIAL_AUTH_URL.to_string(),
            social_api_url: DEFAULT_SOCIAL_API_URL.to_string(),
            social: None,
            trend_endpoint: None,
        }
    }
}

impl SourcesConfig {
    /// Read `TICKETING_BASE_URL`, `REDDIT_CLIENT_ID`, `REDDIT_CLIENT_SECRET`,
    /// `REDDIT_USER_AGENT` and `TREND_ENDPOINT`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(url) = non_empty_var("TICKETING_BASE_URL") {
            cfg.ticketing_base_url = url.trim_end_matches('/').to_string();
        }
        if let (Some(client_id), Some(client_secret)) = (
            non_empty_var("REDDIT_CLIENT_ID"),
            non_empty_var("REDDIT_CLIENT_SECRET"),
        ) {
            cfg.social = Some(SocialCredentials {
                client_id,
                client_secret,
                user_agent: non_empty_var("REDDIT_USER_AGENT")
                    .unwrap_or_else(|| DEFAULT_SOCIAL_USER_AGENT.to_string()),
            });
        }
        cfg.trend_endpoint = non_empty_var("TREND_ENDPOINT");
        cfg
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[serial_test::serial]
    #[test]
    fn social_needs_both_id_and_secret() {
        env::set_var("REDDIT_CLIENT_ID", "abc");
        env::remove_var("REDDIT_CLIENT_SECRET");
        env::remove_var("REDDIT_USER_AGENT");
        assert!(SourcesConfig::from_env().social.is_none());

        env::set_var("REDDIT_CLIENT_SECRET", "shh");
        let creds = SourcesConfig::from_env().social.unwrap();
        assert_eq!(creds.client_id, "abc");
        assert_eq!(creds.user_agent, DEFAULT_SOCIAL_USER_AGENT);

        env::remove_var("REDDIT_CLIENT_ID");
        env::remove_var("REDDIT_CLIENT_SECRET");
    }

    #[serial_test::serial]
    #[test]
    fn ticketing_base_url_is_trimmed() {
        env::set_var("TICKETING_BASE_URL", "http://localhost:8080/");
        assert_eq!(
            SourcesConfig::from_env().ticketing_base_url,
            "http://localhost:8080"
        );
        env::remove_var("TICKETING_BASE_URL");
    }
}
