//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the pipeline's collaborator
//! traits, so the engine and the daily run can be exercised without a
//! database or a model endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use aipro_news_core::testing::{fixtures, MemorySink, MockEnricher, MockNewsSource};
//!
//! let source = MockNewsSource::with_articles(fixtures::articles(&["a", "b"]));
//! let enricher = MockEnricher::new();
//! let sink = MemorySink::new();
//! ```

mod memory_sink;
mod mock_enricher;
mod mock_llm;
mod mock_source;

pub use memory_sink::{MemorySink, RecordedWrite};
pub use mock_enricher::{MockBehavior, MockEnricher, RecordedCall};
pub use mock_llm::MockLlmClient;
pub use mock_source::MockNewsSource;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::NaiveDate;

    use crate::source::{Article, DateWindow};

    /// An article dated 2026-10-16 with a fixed classification.
    pub fn article(text: &str) -> Article {
        Article::new("20261016", text, "半導體")
    }

    pub fn articles(texts: &[&str]) -> Vec<Article> {
        texts.iter().map(|text| article(text)).collect()
    }

    pub fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    /// 2026-10-16 ~ 2026-10-18, the window of a run on Monday 2026-10-19.
    pub fn window() -> DateWindow {
        DateWindow::new(date(2026, 10, 16), date(2026, 10, 18))
            .unwrap_or_else(|e| panic!("fixture window: {}", e))
    }

    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap_or_else(|| panic!("invalid fixture date {}-{}-{}", year, month, day))
    }
}
