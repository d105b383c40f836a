//! Pipeline row and report types.

use serde::Serialize;
use std::path::PathBuf;

use crate::enrich::{EngineError, EngineStats, FieldValue};
use crate::output::OutputError;
use crate::source::{Article, DateWindow, SourceError};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("Background task failed: {0}")]
    Join(String),
}

/// An article with both derived fields attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedRow {
    /// Index of the article in the fetched batch.
    pub position: usize,
    pub date_tag: String,
    pub text: String,
    pub related_tags: String,
    pub stock_tag: FieldValue,
    pub summary: FieldValue,
}

impl EnrichedRow {
    pub fn new(position: usize, article: &Article, stock_tag: FieldValue, summary: FieldValue) -> Self {
        Self {
            position,
            date_tag: article.date_tag.clone(),
            text: article.text.clone(),
            related_tags: article.related_tags.clone(),
            stock_tag,
            summary,
        }
    }

    /// Both fields carry a value.
    pub fn is_complete(&self) -> bool {
        self.stock_tag.is_present() && self.summary.is_present()
    }
}

/// Stats for the tag and summary passes of one round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassStats {
    pub tags: EngineStats,
    pub summaries: EngineStats,
}

/// What a daily run did.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub window: DateWindow,
    pub fetched: usize,
    pub complete_first_pass: usize,
    pub first_pass: PassStats,
    /// Present only when some rows needed a second pass.
    pub retry_pass: Option<PassStats>,
    pub retried: usize,
    pub recovered: usize,
    /// Complete rows, in fetch order.
    pub rows: Vec<EnrichedRow>,
    pub dropped: usize,
    /// Rows persisted; zero when nothing was written.
    pub written: usize,
    pub output_path: Option<PathBuf>,
}

impl PipelineReport {
    pub(crate) fn empty(window: DateWindow) -> Self {
        Self {
            window,
            fetched: 0,
            complete_first_pass: 0,
            first_pass: PassStats::default(),
            retry_pass: None,
            retried: 0,
            recovered: 0,
            rows: Vec::new(),
            dropped: 0,
            written: 0,
            output_path: None,
        }
    }

    pub fn enriched(&self) -> usize {
        self.rows.len()
    }
}
