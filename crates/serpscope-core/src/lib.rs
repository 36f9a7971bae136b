//! Domain types and pure logic for serpscope.
//!
//! This crate has no I/O: it defines the records exchanged with the upstream
//! collector, the price/field normalizer, the daily-metrics summarizer, the
//! opportunity detector, and configuration loading. Persistence lives in
//! `serpscope-db`; the HTTP collector lives in `serpscope-canopy`.

use thiserror::Error;

pub mod app_config;
pub mod config;
pub mod keywords;
pub mod metrics;
pub mod opportunity;
pub mod price;
pub mod serp;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use keywords::{load_keywords, KeywordConfig, KeywordsFile};
pub use metrics::{summarize, DailySummary, ResultObservation};
pub use opportunity::{
    detect_for_keyword, summarize_window, MetricPoint, Opportunity, OpportunitySignal, PriceTrend,
    Priority, WindowSummary,
};
pub use price::{coerce_f64, coerce_i64, normalize_price, NormalizedPrice, RawPrice};
pub use serp::{parse_review_date, EnrichmentPayload, RawReview, SerpResult};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read keywords file {path}: {source}")]
    KeywordsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse keywords file: {0}")]
    KeywordsFileParse(#[from] serde_yaml::Error),

    #[error("keywords config validation failed: {0}")]
    Validation(String),
}
