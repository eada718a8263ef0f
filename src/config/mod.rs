// src/config/mod.rs
pub mod pipeline;
pub mod sources;

pub use pipeline::{
    DedupConfig, PipelineConfig, ScoringWeights, SourceTimeouts, TrendBlend,
    DEFAULT_PIPELINE_CONFIG_PATH, ENV_PIPELINE_CONFIG_PATH,
};
pub use sources::{SocialCredentials, SourcesConfig};
