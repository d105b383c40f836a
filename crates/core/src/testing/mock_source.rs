//! Mock news source for testing.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::source::{Article, DateWindow, NewsSource, SourceError};

/// In-memory [`NewsSource`] returning a fixed article list.
#[derive(Debug, Default)]
pub struct MockNewsSource {
    articles: Mutex<Vec<Article>>,
    /// If set, the next fetch fails with this error.
    next_error: Mutex<Option<SourceError>>,
    windows: Mutex<Vec<DateWindow>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockNewsSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_articles(articles: Vec<Article>) -> Self {
        let source = Self::new();
        source.set_articles(articles);
        source
    }

    pub fn set_articles(&self, articles: Vec<Article>) {
        *lock(&self.articles) = articles;
    }

    pub fn fail_next(&self, error: SourceError) {
        *lock(&self.next_error) = Some(error);
    }

    /// Windows passed to `fetch`, in call order.
    pub fn requested_windows(&self) -> Vec<DateWindow> {
        lock(&self.windows).clone()
    }
}

impl NewsSource for MockNewsSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch(&self, window: &DateWindow) -> Result<Vec<Article>, SourceError> {
        lock(&self.windows).push(*window);
        if let Some(error) = lock(&self.next_error).take() {
            return Err(error);
        }
        Ok(lock(&self.articles).clone())
    }
}
