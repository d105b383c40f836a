pub mod config;
pub mod enrich;
pub mod llm;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod source;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LlmProvider,
};
pub use enrich::{
    ArticleEnricher, EngineConfig, EngineError, EnrichError, EnricherSettings, EnrichmentEngine,
    FieldValue, LlmEnricher, PromptSet, TaskKind, ABSENT_MARKER,
};
pub use llm::{create_llm_client, LlmClient, LlmError};
pub use output::{CsvRowWriter, OutputError, RowSink, RunManifest};
pub use pipeline::{DailyPipeline, EnrichedRow, PipelineError, PipelineReport};
pub use source::{Article, DateWindow, NewsSource, SourceError, SqliteNewsSource};
