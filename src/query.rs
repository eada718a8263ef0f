// src/query.rs
//! The immutable run input: keyword, calendar date (UK local) and an optional location hint.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::ConfigError;
use crate::relevance::tokenize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    keyword: String,
    date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_hint: Option<String>,
}

impl Query {
    /// Build a query. The keyword is trimmed and must contain at least one word.
    pub fn new(
        keyword: &str,
        date: NaiveDate,
        location_hint: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let keyword = keyword.split_whitespace().collect::<Vec<_>>().join(" ");
        if keyword.is_empty() || tokenize(&keyword).is_empty() {
            return Err(ConfigError::EmptyKeyword);
        }
        let location_hint = location_hint
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Ok(Self {
            keyword,
            date,
            location_hint,
        })
    }

    /// Parse the CLI form: date as `YYYY-MM-DD`.
    pub fn parse(
        keyword: &str,
        date: &str,
        location_hint: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
            ConfigError::InvalidDate {
                value: date.to_string(),
            }
        })?;
        Self::new(keyword, date, location_hint)
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn location_hint(&self) -> Option<&str> {
        self.location_hint.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_collapses_keyword() {
        let q = Query::parse("  Glastonbury   Festival ", "2025-06-25", None).unwrap();
        assert_eq!(q.keyword(), "Glastonbury Festival");
        assert_eq!(q.date(), NaiveDate::from_ymd_opt(2025, 6, 25).unwrap());
        assert_eq!(q.location_hint(), None);
    }

    #[test]
    fn rejects_empty_keyword_and_bad_date() {
        assert!(matches!(
            Query::parse("   ", "2025-06-25", None),
            Err(ConfigError::EmptyKeyword)
        ));
        assert!(matches!(
            Query::parse("!!!", "2025-06-25", None),
            Err(ConfigError::EmptyKeyword)
        ));
        assert!(matches!(
            Query::parse("Glastonbury", "25/06/2025", None),
            Err(ConfigError::InvalidDate { .. })
        ));
    }

    #[test]
    fn blank_location_hint_is_dropped() {
        let q = Query::parse("Proms", "2025-07-18", Some("  ")).unwrap();
        assert_eq!(q.location_hint(), None);
        let q = Query::parse("Proms", "2025-07-18", Some(" London ")).unwrap();
        assert_eq!(q.location_hint(), Some("London"));
    }
}
