use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// News warehouse configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    /// Replacement SELECT; must bind `:date_bgn` and `:date_end` and return
    /// timestamp, body and classification columns in that order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// Text-generation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// Azure OpenAI deployment (`model` is the deployment name).
    AzureOpenAi,
    /// OpenAI or any OpenAI-compatible endpoint.
    OpenAi,
    /// Local Ollama instance.
    Ollama,
}

/// LLM client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Azure REST API version
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// HTTP-level request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_api_version() -> String {
    "2024-10-21".to_string()
}

fn default_api_key_env() -> String {
    "AOAI_API_KEY".to_string()
}

fn default_request_timeout() -> u64 {
    90
}

fn default_max_tokens() -> u32 {
    5000
}

fn default_temperature() -> f32 {
    0.1
}

/// Parallel enrichment configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Per-article call timeout in seconds
    #[serde(default = "default_call_timeout")]
    pub timeout_secs: u64,
    /// Directory with prompt template overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts_dir: Option<PathBuf>,
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,
    #[serde(default = "default_summary_temperature")]
    pub summary_temperature: f32,
}

fn default_workers() -> usize {
    8
}

fn default_call_timeout() -> u64 {
    60
}

fn default_summary_max_tokens() -> u32 {
    500
}

fn default_summary_temperature() -> f32 {
    1.0
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout_secs: default_call_timeout(),
            prompts_dir: None,
            summary_max_tokens: default_summary_max_tokens(),
            summary_temperature: default_summary_temperature(),
        }
    }
}

/// Date window configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WindowConfig {
    /// Days back from today; unset applies the weekend rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_back: Option<u32>,
}

/// Output file configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_output_prefix")]
    pub file_prefix: String,
    #[serde(default = "default_true")]
    pub utf8_bom: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./outputs")
}

fn default_output_prefix() -> String {
    "enriched_news".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            file_prefix: default_output_prefix(),
            utf8_bom: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_log_prefix")]
    pub file_prefix: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_log_prefix() -> String {
    "aipro_news".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
            file_prefix: default_log_prefix(),
            json: false,
        }
    }
}

/// Metrics export configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Prometheus textfile written at the end of the run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub textfile: Option<PathBuf>,
}
