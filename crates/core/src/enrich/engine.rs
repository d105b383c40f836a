//! Parallel enrichment engine.
//!
//! Runs one task over a batch of article texts with at most `workers` calls
//! in flight. Each call gets its own timeout; a failed, slow or lost call
//! only degrades its own position to [`FieldValue::Absent`]. Results always
//! come back in input order, one per input.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::adapter::ArticleEnricher;
use super::types::{AbsentReason, EnrichError, EnrichmentResult, FieldValue, TaskKind};
use crate::config::EnrichmentConfig;
use crate::metrics::{ENRICHMENT_CALLS, ENRICHMENT_DURATION};

/// Errors that prevent a pass from starting at all.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Worker pool unavailable: {0}")]
    PoolUnavailable(String),
}

/// Pool size and per-call deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub workers: usize,
    pub call_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            call_timeout: Duration::from_secs(60),
        }
    }
}

impl EngineConfig {
    pub fn from_config(config: &EnrichmentConfig) -> Self {
        Self {
            workers: config.workers,
            call_timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }
}

/// Outcome counts for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub total: usize,
    pub succeeded: usize,
    pub absent: BTreeMap<AbsentReason, usize>,
}

impl EngineStats {
    fn record(&mut self, outcome: &Result<String, EnrichError>) {
        match outcome {
            Ok(_) => self.succeeded += 1,
            Err(e) => *self.absent.entry(e.reason()).or_insert(0) += 1,
        }
    }

    pub fn absent_total(&self) -> usize {
        self.absent.values().sum()
    }

    pub fn absent_for(&self, reason: AbsentReason) -> usize {
        self.absent.get(&reason).copied().unwrap_or(0)
    }
}

/// Ordered results of one pass plus its stats.
#[derive(Debug, Clone)]
pub struct EngineRun {
    pub task: TaskKind,
    pub results: Vec<EnrichmentResult>,
    pub stats: EngineStats,
}

type Outcome = (usize, String, Result<String, EnrichError>);

/// Bounded-concurrency driver for an [`ArticleEnricher`].
#[derive(Clone)]
pub struct EnrichmentEngine {
    enricher: Arc<dyn ArticleEnricher>,
    config: EngineConfig,
}

impl EnrichmentEngine {
    pub fn new(enricher: Arc<dyn ArticleEnricher>, config: EngineConfig) -> Self {
        Self { enricher, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Apply `task` to every text. The result at index `i` belongs to `texts[i]`.
    pub async fn run(&self, texts: &[String], task: TaskKind) -> Result<EngineRun, EngineError> {
        let workers = self.config.workers;
        if workers == 0 {
            return Err(EngineError::PoolUnavailable(
                "worker count must be at least 1".to_string(),
            ));
        }
        if workers > Semaphore::MAX_PERMITS {
            return Err(EngineError::PoolUnavailable(format!(
                "worker count {} exceeds the permit limit",
                workers
            )));
        }

        let total = texts.len();
        info!(task = %task, articles = total, workers, "Starting enrichment pass");
        let started = Instant::now();

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut join_set = JoinSet::new();
        for (position, text) in texts.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let enricher = Arc::clone(&self.enricher);
            let text = text.clone();
            let call_timeout = self.config.call_timeout;

            join_set.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        let call_started = Instant::now();
                        let outcome =
                            match tokio::time::timeout(call_timeout, enricher.enrich(&text, task))
                                .await
                            {
                                Ok(result) => result,
                                Err(_) => Err(EnrichError::Timeout(call_timeout)),
                            };
                        ENRICHMENT_DURATION
                            .with_label_values(&[task.as_str()])
                            .observe(call_started.elapsed().as_secs_f64());
                        outcome
                    }
                    Err(_) => Err(EnrichError::WorkerLost("worker pool closed".to_string())),
                };
                (position, text, outcome)
            });
        }

        let progress_step = (total / 10).max(1);
        let mut buffered: Vec<Outcome> = Vec::with_capacity(total);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(entry) => {
                    buffered.push(entry);
                    let done = buffered.len();
                    if done % progress_step == 0 || done == total {
                        debug!(task = %task, done, total, "Enrichment progress");
                    }
                }
                Err(e) => {
                    warn!(task = %task, error = %e, "Enrichment worker terminated abnormally");
                }
            }
        }

        buffered.sort_by_key(|(position, _, _)| *position);
        let mut buffered = buffered.into_iter().peekable();
        let mut results = Vec::with_capacity(total);
        let mut stats = EngineStats {
            total,
            ..Default::default()
        };

        for (position, original) in texts.iter().enumerate() {
            let (source_text, outcome) =
                match buffered.next_if(|(buffered_position, _, _)| *buffered_position == position) {
                    Some((_, text, outcome)) => (text, outcome),
                    None => (
                        original.clone(),
                        Err(EnrichError::WorkerLost(format!(
                            "no result for position {}",
                            position
                        ))),
                    ),
                };

            let label = match &outcome {
                Ok(_) => "success",
                Err(e) => e.reason().as_str(),
            };
            ENRICHMENT_CALLS
                .with_label_values(&[task.as_str(), label])
                .inc();

            match &outcome {
                Ok(_) => {}
                Err(EnrichError::NoneFound) => {
                    debug!(task = %task, position, "No value found for article");
                }
                Err(e) => {
                    warn!(task = %task, position, reason = %e.reason(), error = %e, "Enrichment call failed");
                }
            }

            stats.record(&outcome);
            results.push(EnrichmentResult {
                position,
                source_text,
                value: FieldValue::from(outcome),
            });
        }

        info!(
            task = %task,
            total = stats.total,
            succeeded = stats.succeeded,
            absent = stats.absent_total(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Enrichment pass finished"
        );

        Ok(EngineRun {
            task,
            results,
            stats,
        })
    }
}
