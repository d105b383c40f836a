//! LLM enrichment of news articles.
//!
//! - [`ArticleEnricher`] / [`LlmEnricher`]: one call for one article and task
//! - [`EnrichmentEngine`]: bounded, order-preserving fan-out over a batch
//! - [`PromptSet`]: prompt templates, optionally loaded from disk

mod adapter;
mod engine;
mod prompt;
mod types;

pub use adapter::{
    extract_field, normalize_summary, normalize_tag, ArticleEnricher, EnricherSettings,
    LlmEnricher,
};
pub use engine::{EngineConfig, EngineError, EngineRun, EngineStats, EnrichmentEngine};
pub use prompt::{PromptError, PromptSet};
pub use types::{
    AbsentReason, EnrichError, EnrichmentResult, FieldValue, TaskKind, ABSENT_MARKER,
};
