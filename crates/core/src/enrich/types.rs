//! Enrichment result types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::llm::LlmError;

/// Sentinel written by the model (and by us) for "no usable value".
pub const ABSENT_MARKER: &str = "無";

/// Which enrichment operation to perform on an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Single most salient company/ticker, as `Name(1234)`.
    ExtractTag,
    /// 100-150 character summary.
    Summarize,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::ExtractTag => "extract_tag",
            TaskKind::Summarize => "summarize",
        }
    }

    /// The single field the model must return for this task.
    pub fn field_name(&self) -> &'static str {
        match self {
            TaskKind::ExtractTag => "股票標的",
            TaskKind::Summarize => "新聞摘要",
        }
    }

    /// JSON schema describing the single expected field.
    pub fn json_schema(&self) -> String {
        format!("{{\"{}\": \"string\"}}", self.field_name())
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an article ended up without a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsentReason {
    NoneFound,
    Timeout,
    Transport,
    Parse,
    MissingField,
    WorkerLost,
}

impl AbsentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbsentReason::NoneFound => "none_found",
            AbsentReason::Timeout => "timeout",
            AbsentReason::Transport => "transport",
            AbsentReason::Parse => "parse",
            AbsentReason::MissingField => "missing_field",
            AbsentReason::WorkerLost => "worker_lost",
        }
    }
}

impl fmt::Display for AbsentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-article enrichment failure.
///
/// These never abort a batch; the engine folds them into
/// [`FieldValue::Absent`] and keeps only the reason for stats and logs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnrichError {
    #[error("model reported no match")]
    NoneFound,

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unparsable response: {0}")]
    Parse(String),

    #[error("response missing field `{0}`")]
    MissingField(String),

    #[error("worker lost: {0}")]
    WorkerLost(String),
}

impl EnrichError {
    pub fn reason(&self) -> AbsentReason {
        match self {
            EnrichError::NoneFound => AbsentReason::NoneFound,
            EnrichError::Timeout(_) => AbsentReason::Timeout,
            EnrichError::Transport(_) => AbsentReason::Transport,
            EnrichError::Parse(_) => AbsentReason::Parse,
            EnrichError::MissingField(_) => AbsentReason::MissingField,
            EnrichError::WorkerLost(_) => AbsentReason::WorkerLost,
        }
    }
}

impl From<LlmError> for EnrichError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Timeout(d) => EnrichError::Timeout(d),
            LlmError::Json(msg) => EnrichError::Parse(msg),
            LlmError::EmptyResponse => EnrichError::Parse("empty response".to_string()),
            other => EnrichError::Transport(other.to_string()),
        }
    }
}

/// A derived field: either a value or the absent marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Present(String),
    Absent,
}

impl FieldValue {
    pub fn is_present(&self) -> bool {
        matches!(self, FieldValue::Present(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    /// The value, or [`ABSENT_MARKER`].
    pub fn as_str(&self) -> &str {
        match self {
            FieldValue::Present(value) => value,
            FieldValue::Absent => ABSENT_MARKER,
        }
    }
}

impl From<Result<String, EnrichError>> for FieldValue {
    fn from(outcome: Result<String, EnrichError>) -> Self {
        match outcome {
            Ok(value) => FieldValue::Present(value),
            Err(_) => FieldValue::Absent,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one task applied to one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    /// 0-based index in the submitted batch.
    pub position: usize,
    /// Text the value was derived from.
    pub source_text: String,
    pub value: FieldValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_schema_names_single_field() {
        assert_eq!(TaskKind::ExtractTag.json_schema(), r#"{"股票標的": "string"}"#);
        assert_eq!(TaskKind::Summarize.json_schema(), r#"{"新聞摘要": "string"}"#);
    }

    #[test]
    fn test_llm_errors_keep_their_class() {
        let timeout: EnrichError = LlmError::Timeout(Duration::from_secs(1)).into();
        assert_eq!(timeout.reason(), AbsentReason::Timeout);

        let parse: EnrichError = LlmError::Json("eof".to_string()).into();
        assert_eq!(parse.reason(), AbsentReason::Parse);

        let api: EnrichError = LlmError::Api {
            status: 500,
            message: "boom".to_string(),
        }
        .into();
        assert_eq!(api.reason(), AbsentReason::Transport);
    }

    #[test]
    fn test_field_value_collapses_failures() {
        let present = FieldValue::from(Ok::<_, EnrichError>("台積電(2330)".to_string()));
        assert_eq!(present.as_str(), "台積電(2330)");

        let absent = FieldValue::from(Err::<String, _>(EnrichError::NoneFound));
        assert!(absent.is_absent());
        assert_eq!(absent.to_string(), ABSENT_MARKER);
    }
}
