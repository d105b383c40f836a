//! Tabular news source.
//!
//! The warehouse is reached through the synchronous [`NewsSource`] trait. It
//! returns fully materialized [`Article`]s in a deterministic order; position
//! in the returned vector is the article's identity for the rest of the run.

mod sqlite;
mod window;

pub use sqlite::SqliteNewsSource;
pub use window::DateWindow;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the news source. All of them are fatal for a run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Invalid window: {begin} is after {end}")]
    InvalidWindow { begin: NaiveDate, end: NaiveDate },

    #[error("Window start {days_back} days back is outside the calendar")]
    WindowOutOfRange { days_back: u64 },
}

/// One news item as fetched from the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Publication day as `YYYYMMDD`.
    pub date_tag: String,
    /// Full article body.
    pub text: String,
    /// Classification string provided by the source, passed through as-is.
    pub related_tags: String,
}

impl Article {
    pub fn new(
        date_tag: impl Into<String>,
        text: impl Into<String>,
        related_tags: impl Into<String>,
    ) -> Self {
        Self {
            date_tag: date_tag.into(),
            text: text.into(),
            related_tags: related_tags.into(),
        }
    }
}

/// Source of raw news rows for a date window.
pub trait NewsSource: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Fetch all articles inside `window`, in a stable order.
    ///
    /// An empty window yields an empty vector, not an error.
    fn fetch(&self, window: &DateWindow) -> Result<Vec<Article>, SourceError>;
}
