//! Mock enricher for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::enrich::{ArticleEnricher, EnrichError, TaskKind};

/// What a scripted call does.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return this value.
    Value(String),
    /// Fail with this error.
    Fail(EnrichError),
    /// Sleep, then behave as the inner behavior.
    Delay(Duration, Box<MockBehavior>),
    /// Panic inside the call.
    Panic,
}

impl MockBehavior {
    pub fn delayed(delay: Duration, then: MockBehavior) -> Self {
        MockBehavior::Delay(delay, Box::new(then))
    }
}

/// A recorded call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub text: String,
    pub task: TaskKind,
}

/// Mock implementation of the ArticleEnricher trait.
///
/// Provides controllable behavior for testing:
/// - Scripted outcomes per (text, task); the last scripted entry repeats
/// - Deterministic default values for unscripted calls
/// - Call recording and a high-water mark of concurrent calls
///
/// # Example
///
/// ```rust,ignore
/// use aipro_news_core::testing::{MockBehavior, MockEnricher};
///
/// let enricher = MockEnricher::new();
/// enricher.script("b", TaskKind::ExtractTag, vec![
///     MockBehavior::Fail(EnrichError::NoneFound),
///     MockBehavior::Value("鴻海(2317)".into()),
/// ]).await;
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockEnricher {
    scripts: Arc<RwLock<HashMap<(String, TaskKind), VecDeque<MockBehavior>>>>,
    /// Delay applied to every call before its behavior.
    delay: Arc<RwLock<Option<Duration>>>,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockEnricher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value returned for unscripted calls.
    pub fn default_value(text: &str, task: TaskKind) -> String {
        match task {
            TaskKind::ExtractTag => format!("tag:{}", text),
            TaskKind::Summarize => format!("summary:{}", text),
        }
    }

    /// Queue behaviors for `text` and `task`, consumed one per call.
    pub async fn script(&self, text: &str, task: TaskKind, behaviors: Vec<MockBehavior>) {
        self.scripts
            .write()
            .await
            .insert((text.to_string(), task), behaviors.into());
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self, text: &str, task: TaskKind) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| call.text == text && call.task == task)
            .count()
    }

    /// Most calls observed running at the same time.
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn next_behavior(&self, text: &str, task: TaskKind) -> MockBehavior {
        let mut scripts = self.scripts.write().await;
        match scripts.get_mut(&(text.to_string(), task)) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| MockBehavior::Value(Self::default_value(text, task))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| MockBehavior::Value(Self::default_value(text, task))),
            None => MockBehavior::Value(Self::default_value(text, task)),
        }
    }
}

/// Decrements the in-flight count when a call ends, including on timeout.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ArticleEnricher for MockEnricher {
    async fn enrich(&self, text: &str, task: TaskKind) -> Result<String, EnrichError> {
        self.calls.write().await.push(RecordedCall {
            text: text.to_string(),
            task,
        });
        let mut behavior = self.next_behavior(text, task).await;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _in_flight = InFlight(Arc::clone(&self.in_flight));

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        loop {
            match behavior {
                MockBehavior::Value(value) => return Ok(value),
                MockBehavior::Fail(error) => return Err(error),
                MockBehavior::Delay(delay, then) => {
                    tokio::time::sleep(delay).await;
                    behavior = *then;
                }
                MockBehavior::Panic => panic!("scripted panic for {:?}", text),
            }
        }
    }
}
