//! Per-article enrichment call.
//!
//! [`LlmEnricher`] renders the task prompt, asks the model for a single-field
//! JSON object and normalizes the returned value. Every failure is reported
//! as an [`EnrichError`]; nothing here retries or panics.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::sync::Arc;
use tracing::debug;

use super::prompt::PromptSet;
use super::types::{EnrichError, TaskKind, ABSENT_MARKER};
use crate::config::{EnrichmentConfig, LlmConfig};
use crate::llm::{CompletionRequest, LlmClient};
use crate::metrics::LLM_TOKENS;

/// Spacing around the 4-digit code, e.g. `台積電 ( 2330 )`.
static TICKER_PARENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(\s*(\d{4})\s*\)").expect("valid regex"));

/// Canonical `Name(1234)` form.
static TICKER_FORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S.*\(\d{4}\)$").expect("valid regex"));

const SUMMARY_CHARS: std::ops::RangeInclusive<usize> = 100..=150;

/// Enriches one article text for one task.
#[async_trait]
pub trait ArticleEnricher: Send + Sync {
    /// Return the normalized field value, or why there is none.
    async fn enrich(&self, text: &str, task: TaskKind) -> Result<String, EnrichError>;
}

/// Sampling parameters per task.
#[derive(Debug, Clone, PartialEq)]
pub struct EnricherSettings {
    pub tag_max_tokens: u32,
    pub tag_temperature: f32,
    pub summary_max_tokens: u32,
    pub summary_temperature: f32,
}

impl Default for EnricherSettings {
    fn default() -> Self {
        Self {
            tag_max_tokens: 5000,
            tag_temperature: 0.1,
            summary_max_tokens: 500,
            summary_temperature: 1.0,
        }
    }
}

impl EnricherSettings {
    pub fn from_config(llm: &LlmConfig, enrichment: &EnrichmentConfig) -> Self {
        Self {
            tag_max_tokens: llm.max_tokens,
            tag_temperature: llm.temperature,
            summary_max_tokens: enrichment.summary_max_tokens,
            summary_temperature: enrichment.summary_temperature,
        }
    }

    fn for_task(&self, task: TaskKind) -> (u32, f32) {
        match task {
            TaskKind::ExtractTag => (self.tag_max_tokens, self.tag_temperature),
            TaskKind::Summarize => (self.summary_max_tokens, self.summary_temperature),
        }
    }
}

/// [`ArticleEnricher`] backed by a text-generation service.
pub struct LlmEnricher {
    client: Arc<dyn LlmClient>,
    prompts: PromptSet,
    settings: EnricherSettings,
}

impl LlmEnricher {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            prompts: PromptSet::default(),
            settings: EnricherSettings::default(),
        }
    }

    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_settings(mut self, settings: EnricherSettings) -> Self {
        self.settings = settings;
        self
    }

    fn build_request(&self, text: &str, task: TaskKind) -> CompletionRequest {
        let (max_tokens, temperature) = self.settings.for_task(task);
        CompletionRequest::new(self.prompts.render(task, text))
            .with_system(self.prompts.system())
            .with_max_tokens(max_tokens)
            .with_temperature(temperature)
            .with_json_output()
    }
}

#[async_trait]
impl ArticleEnricher for LlmEnricher {
    async fn enrich(&self, text: &str, task: TaskKind) -> Result<String, EnrichError> {
        let request = self.build_request(text, task);
        let response = self.client.complete(request).await?;

        let provider = self.client.provider();
        LLM_TOKENS
            .with_label_values(&[provider, "input"])
            .inc_by(u64::from(response.usage.input_tokens));
        LLM_TOKENS
            .with_label_values(&[provider, "output"])
            .inc_by(u64::from(response.usage.output_tokens));

        let value = extract_field(&response.text, task.field_name())?;
        match task {
            TaskKind::ExtractTag => normalize_tag(&value),
            TaskKind::Summarize => normalize_summary(&value),
        }
    }
}

/// Pull `field` out of the outermost JSON object in `text`.
///
/// Models sometimes wrap the object in prose or code fences, so only the
/// span from the first `{` to the last `}` is parsed.
pub fn extract_field(text: &str, field: &str) -> Result<String, EnrichError> {
    let json_str = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => return Err(EnrichError::Parse(format!("no JSON object in: {}", text))),
    };

    let parsed: serde_json::Value =
        serde_json::from_str(json_str).map_err(|e| EnrichError::Parse(e.to_string()))?;
    let object = parsed
        .as_object()
        .ok_or_else(|| EnrichError::Parse("response is not a JSON object".to_string()))?;

    match object.get(field) {
        None => Err(EnrichError::MissingField(field.to_string())),
        Some(serde_json::Value::String(value)) => Ok(value.clone()),
        Some(serde_json::Value::Null) => Err(EnrichError::NoneFound),
        Some(other) => Err(EnrichError::Parse(format!(
            "field `{}` is not a string: {}",
            field, other
        ))),
    }
}

/// Canonicalize a stock tag to `Name(1234)`.
pub fn normalize_tag(raw: &str) -> Result<String, EnrichError> {
    let cleaned = raw
        .replace("股份有限公司", "")
        .replace('（', "(")
        .replace('）', ")");
    let cleaned = TICKER_PARENS.replace_all(cleaned.trim(), "($1)").into_owned();

    if cleaned.is_empty() || cleaned == ABSENT_MARKER {
        return Err(EnrichError::NoneFound);
    }
    if !TICKER_FORM.is_match(&cleaned) {
        debug!(tag = %cleaned, "Stock tag not in Name(code) form");
    }
    Ok(cleaned)
}

/// Trim a summary; the length target is advisory only.
pub fn normalize_summary(raw: &str) -> Result<String, EnrichError> {
    let summary = raw.trim();
    if summary.is_empty() || summary == ABSENT_MARKER {
        return Err(EnrichError::NoneFound);
    }
    let chars = summary.chars().count();
    if !SUMMARY_CHARS.contains(&chars) {
        debug!(chars, "Summary length outside target range");
    }
    Ok(summary.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::testing::MockLlmClient;

    #[test]
    fn test_extract_field_from_wrapped_json() {
        let text = "```json\n{\"股票標的\": \"台積電(2330)\"}\n```";
        assert_eq!(extract_field(text, "股票標的").unwrap(), "台積電(2330)");
    }

    #[test]
    fn test_extract_field_errors() {
        assert!(matches!(
            extract_field("no json here", "股票標的"),
            Err(EnrichError::Parse(_))
        ));
        assert!(matches!(
            extract_field("} backwards {", "股票標的"),
            Err(EnrichError::Parse(_))
        ));
        assert!(matches!(
            extract_field(r#"{"other": "x"}"#, "股票標的"),
            Err(EnrichError::MissingField(f)) if f == "股票標的"
        ));
        assert!(matches!(
            extract_field(r#"{"股票標的": null}"#, "股票標的"),
            Err(EnrichError::NoneFound)
        ));
        assert!(matches!(
            extract_field(r#"{"股票標的": 2330}"#, "股票標的"),
            Err(EnrichError::Parse(_))
        ));
    }

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("台積電(2330)").unwrap(), "台積電(2330)");
        assert_eq!(
            normalize_tag("台灣積體電路製造股份有限公司（2330）").unwrap(),
            "台灣積體電路製造(2330)"
        );
        assert_eq!(normalize_tag(" 鴻海 ( 2317 ) ").unwrap(), "鴻海(2317)");
        assert_eq!(normalize_tag("無"), Err(EnrichError::NoneFound));
        assert_eq!(normalize_tag("   "), Err(EnrichError::NoneFound));
    }

    #[test]
    fn test_normalize_summary() {
        assert_eq!(normalize_summary("  摘要內容  ").unwrap(), "摘要內容");
        assert_eq!(normalize_summary("無"), Err(EnrichError::NoneFound));
    }

    #[tokio::test]
    async fn test_enrich_tag_through_client() {
        let client = Arc::new(MockLlmClient::new());
        client.push_response(Ok(r#"{"股票標的": "聯發科（2454）"}"#.to_string()));
        let enricher = LlmEnricher::new(client.clone());

        let value = enricher.enrich("聯發科發表新晶片", TaskKind::ExtractTag).await;
        assert_eq!(value.unwrap(), "聯發科(2454)");

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].json_output);
        assert_eq!(requests[0].max_tokens, 5000);
        assert!(requests[0].prompt.contains("聯發科發表新晶片"));
    }

    #[tokio::test]
    async fn test_enrich_summary_uses_summary_settings() {
        let client = Arc::new(MockLlmClient::new());
        client.push_response(Ok(r#"{"新聞摘要": "聯發科發表新晶片。"}"#.to_string()));
        let enricher = LlmEnricher::new(client.clone());

        let value = enricher.enrich("聯發科發表新晶片", TaskKind::Summarize).await;
        assert_eq!(value.unwrap(), "聯發科發表新晶片。");
        assert_eq!(client.requests()[0].max_tokens, 500);
    }

    #[tokio::test]
    async fn test_enrich_maps_client_errors() {
        let client = Arc::new(MockLlmClient::new());
        client.push_response(Err(LlmError::Api {
            status: 429,
            message: "rate limited".to_string(),
        }));
        let enricher = LlmEnricher::new(client);

        let result = enricher.enrich("x", TaskKind::ExtractTag).await;
        assert!(matches!(result, Err(EnrichError::Transport(_))));
    }
}
