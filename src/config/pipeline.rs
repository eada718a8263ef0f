// src/config/pipeline.rs
//! Tunables for scoring, filtering, dedup and the composite trend score.
//!
//! TOML shape (every key optional; missing keys keep their default):
//! ```toml
//! relevance_cutoff = 90
//! date_window_days = 3
//! neutral_date_score = 50
//! neutral_location_score = 50
//! source_priority = ["ticketing", "social", "trend"]
//!
//! [weights]
//! keyword = 0.5
//! date = 0.3
//! location = 0.2
//!
//! [dedup]
//! title_similarity = 0.88
//! day_tolerance = 0
//!
//! [blend]
//! engagement_weight = 0.6
//! interest_weight = 0.4
//! engagement_half_saturation = 500.0
//!
//! [timeouts]
//! ticketing_ms = 20000
//! social_ms = 20000
//! trend_ms = 20000
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::ingest::types::SourceKind;

pub const DEFAULT_PIPELINE_CONFIG_PATH: &str = "config/pulse.toml";
pub const ENV_PIPELINE_CONFIG_PATH: &str = "PULSE_CONFIG_PATH";
pub const ENV_RELEVANCE_CUTOFF: &str = "PULSE_RELEVANCE_CUTOFF";
pub const ENV_DATE_WINDOW_DAYS: &str = "PULSE_DATE_WINDOW_DAYS";

pub const DEFAULT_RELEVANCE_CUTOFF: i64 = 90;
pub const DEFAULT_DATE_WINDOW_DAYS: i64 = 3;
pub const DEFAULT_NEUTRAL_SCORE: i64 = 50;

/// Sub-score weights of the relevance scorer. Normalized by their sum at scoring time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub keyword: f64,
    pub date: f64,
    pub location: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            keyword: 0.5,
            date: 0.3,
            location: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Normalized Levenshtein similarity at or above which two titles are the same entity.
    pub title_similarity: f64,
    /// Allowed distance in calendar days (UK local). 0 = same day.
    pub day_tolerance: i64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            title_similarity: 0.88,
            day_tolerance: 0,
        }
    }
}

/// Blend of engagement volume and search interest into the composite trend score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendBlend {
    pub engagement_weight: f64,
    pub interest_weight: f64,
    /// Total engagement that maps to an engagement component of 50.
    pub engagement_half_saturation: f64,
}

impl Default for TrendBlend {
    fn default() -> Self {
        Self {
            engagement_weight: 0.6,
            interest_weight: 0.4,
            engagement_half_saturation: 500.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceTimeouts {
    pub ticketing_ms: u64,
    pub social_ms: u64,
    pub trend_ms: u64,
}

impl Default for SourceTimeouts {
    fn default() -> Self {
        Self {
            ticketing_ms: 20_000,
            social_ms: 20_000,
            trend_ms: 20_000,
        }
    }
}

impl SourceTimeouts {
    pub fn millis_for(&self, kind: SourceKind) -> u64 {
        match kind {
            SourceKind::Ticketing => self.ticketing_ms,
            SourceKind::Social => self.social_ms,
            SourceKind::Trend => self.trend_ms,
        }
    }

    pub fn for_source(&self, kind: SourceKind) -> Duration {
        Duration::from_millis(self.millis_for(kind))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub relevance_cutoff: i64,
    pub date_window_days: i64,
    pub neutral_date_score: i64,
    pub neutral_location_score: i64,
    pub weights: ScoringWeights,
    pub dedup: DedupConfig,
    pub blend: TrendBlend,
    pub timeouts: SourceTimeouts,
    pub source_priority: Vec<SourceKind>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            relevance_cutoff: DEFAULT_RELEVANCE_CUTOFF,
            date_window_days: DEFAULT_DATE_WINDOW_DAYS,
            neutral_date_score: DEFAULT_NEUTRAL_SCORE,
            neutral_location_score: DEFAULT_NEUTRAL_SCORE,
            weights: ScoringWeights::default(),
            dedup: DedupConfig::default(),
            blend: TrendBlend::default(),
            timeouts: SourceTimeouts::default(),
            source_priority: SourceKind::ALL.to_vec(),
        }
    }
}

impl PipelineConfig {
    /// Resolve config from `$PULSE_CONFIG_PATH`, then `config/pulse.toml`, then defaults,
    /// and apply env overrides on top.
    pub fn load_default() -> Result<Self, ConfigError> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_PIPELINE_CONFIG_PATH) {
            let path = PathBuf::from(p);
            if !path.exists() {
                return Err(ConfigError::Load {
                    path,
                    message: format!("{ENV_PIPELINE_CONFIG_PATH} points to a non-existent path"),
                });
            }
            Self::load_from(&path)?
        } else {
            let path = PathBuf::from(DEFAULT_PIPELINE_CONFIG_PATH);
            if path.exists() {
                Self::load_from(&path)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::Load { message, .. } => ConfigError::Load {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Load {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })
    }

    /// `PULSE_RELEVANCE_CUTOFF` / `PULSE_DATE_WINDOW_DAYS` override the file values.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = parse_env_i64(ENV_RELEVANCE_CUTOFF)? {
            self.relevance_cutoff = v;
        }
        if let Some(v) = parse_env_i64(ENV_DATE_WINDOW_DAYS)? {
            self.date_window_days = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=100).contains(&self.relevance_cutoff) {
            return Err(ConfigError::InvalidCutoff {
                value: self.relevance_cutoff,
            });
        }
        if self.date_window_days < 0 {
            return Err(ConfigError::InvalidWindow {
                value: self.date_window_days,
            });
        }
        for (field, value) in [
            ("neutral_date_score", self.neutral_date_score),
            ("neutral_location_score", self.neutral_location_score),
        ] {
            if !(0..=100).contains(&value) {
                return Err(ConfigError::InvalidNeutralScore { field, value });
            }
        }
        let w = &self.weights;
        if !weights_ok(&[w.keyword, w.date, w.location]) {
            return Err(ConfigError::InvalidWeights { field: "weights" });
        }
        let sim = self.dedup.title_similarity;
        if !sim.is_finite() || !(0.0..=1.0).contains(&sim) {
            return Err(ConfigError::InvalidSimilarity { value: sim });
        }
        if self.dedup.day_tolerance < 0 {
            return Err(ConfigError::InvalidWindow {
                value: self.dedup.day_tolerance,
            });
        }
        let b = &self.blend;
        if !weights_ok(&[b.engagement_weight, b.interest_weight])
            || !b.engagement_half_saturation.is_finite()
            || b.engagement_half_saturation <= 0.0
        {
            return Err(ConfigError::InvalidWeights { field: "blend" });
        }
        for kind in SourceKind::ALL {
            if self.timeouts.millis_for(kind) == 0 {
                return Err(ConfigError::InvalidTimeout { kind });
            }
        }
        let mut prio = self.source_priority.clone();
        prio.sort();
        prio.dedup();
        if prio.len() != SourceKind::ALL.len() || self.source_priority.len() != prio.len() {
            return Err(ConfigError::InvalidPriority);
        }
        Ok(())
    }

    /// Cutoff as a score. Only meaningful after `validate`.
    pub fn cutoff(&self) -> u8 {
        self.relevance_cutoff.clamp(0, 100) as u8
    }
}

fn weights_ok(ws: &[f64]) -> bool {
    ws.iter().all(|w| w.is_finite() && *w >= 0.0) && ws.iter().sum::<f64>() > 0.0
}

fn parse_env_i64(var: &'static str) -> Result<Option<i64>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value: raw }),
        Err(_) => Ok(None),
    }
}
