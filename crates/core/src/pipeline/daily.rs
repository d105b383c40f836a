//! The daily enrichment run.

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::types::{EnrichedRow, PassStats, PipelineError, PipelineReport};
use crate::enrich::{EnrichmentEngine, EnrichmentResult, FieldValue, TaskKind};
use crate::metrics::{ARTICLES, RETRIED_ROWS};
use crate::output::RowSink;
use crate::source::{Article, DateWindow, NewsSource};

/// Fetch, tag, summarize, retry once, filter and persist.
pub struct DailyPipeline {
    source: Arc<dyn NewsSource>,
    engine: EnrichmentEngine,
    sink: Arc<dyn RowSink>,
}

impl DailyPipeline {
    pub fn new(source: Arc<dyn NewsSource>, engine: EnrichmentEngine, sink: Arc<dyn RowSink>) -> Self {
        Self {
            source,
            engine,
            sink,
        }
    }

    pub async fn run(&self, window: &DateWindow) -> Result<PipelineReport, PipelineError> {
        let started = Instant::now();
        let window = *window;
        info!(window = %window, source = self.source.name(), "Fetching news");

        let source = Arc::clone(&self.source);
        let articles = tokio::task::spawn_blocking(move || source.fetch(&window))
            .await
            .map_err(|e| PipelineError::Join(e.to_string()))??;

        let fetched = articles.len();
        ARTICLES
            .with_label_values(&["fetched"])
            .inc_by(fetched as u64);

        if articles.is_empty() {
            info!(window = %window, fetched = 0, enriched = 0, dropped = 0, "No news in window, nothing to write");
            return Ok(PipelineReport::empty(window));
        }

        let all_positions: Vec<usize> = (0..fetched).collect();
        let (mut rows, first_pass) = self.enrich_batch(&articles, &all_positions).await?;
        let complete_first_pass = rows.iter().filter(|row| row.is_complete()).count();

        let incomplete = select_incomplete(&rows);
        let retried = incomplete.len();
        let mut recovered = 0;
        let mut retry_pass = None;
        if !incomplete.is_empty() {
            warn!(incomplete = retried, "Retrying incomplete rows");
            RETRIED_ROWS.inc_by(retried as u64);

            let (retried_rows, stats) = self.enrich_batch(&articles, &incomplete).await?;
            recovered = retried_rows.iter().filter(|row| row.is_complete()).count();
            // Replace outright, even when the retry is still incomplete.
            for row in retried_rows {
                let position = row.position;
                rows[position] = row;
            }
            retry_pass = Some(stats);
        }

        let (complete, dropped) = finalize(rows);
        ARTICLES
            .with_label_values(&["complete"])
            .inc_by(complete.len() as u64);
        ARTICLES
            .with_label_values(&["dropped"])
            .inc_by(dropped.len() as u64);

        let (complete, output_path) = if complete.is_empty() {
            warn!(window = %window, "No complete rows, skipping output");
            (complete, None)
        } else {
            let sink = Arc::clone(&self.sink);
            let (complete, written) = tokio::task::spawn_blocking(move || {
                let written = sink.write(&window, &complete);
                (complete, written)
            })
            .await
            .map_err(|e| PipelineError::Join(e.to_string()))?;
            (complete, Some(written?))
        };

        let written = if output_path.is_some() { complete.len() } else { 0 };
        info!(
            window = %window,
            fetched,
            enriched = complete.len(),
            dropped = dropped.len(),
            retried,
            recovered,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Daily run finished"
        );

        Ok(PipelineReport {
            window,
            fetched,
            complete_first_pass,
            first_pass,
            retry_pass,
            retried,
            recovered,
            rows: complete,
            dropped: dropped.len(),
            written,
            output_path,
        })
    }

    /// Run both tasks over `articles[positions]` and merge them into rows.
    async fn enrich_batch(
        &self,
        articles: &[Article],
        positions: &[usize],
    ) -> Result<(Vec<EnrichedRow>, PassStats), PipelineError> {
        let texts: Vec<String> = positions
            .iter()
            .map(|&position| articles[position].text.clone())
            .collect();

        let tags = self.engine.run(&texts, TaskKind::ExtractTag).await?;
        let summaries = self.engine.run(&texts, TaskKind::Summarize).await?;

        let rows = merge_results(articles, positions, &tags.results, &summaries.results);
        Ok((
            rows,
            PassStats {
                tags: tags.stats,
                summaries: summaries.stats,
            },
        ))
    }
}

/// Attach tag and summary results to their articles.
///
/// `positions[i]` is the fetch position of the article that was submitted
/// at batch index `i`; results are matched on that index, never on text.
pub fn merge_results(
    articles: &[Article],
    positions: &[usize],
    tags: &[EnrichmentResult],
    summaries: &[EnrichmentResult],
) -> Vec<EnrichedRow> {
    positions
        .iter()
        .enumerate()
        .filter_map(|(index, &position)| {
            let article = articles.get(position)?;
            Some(EnrichedRow::new(
                position,
                article,
                value_at(tags, index),
                value_at(summaries, index),
            ))
        })
        .collect()
}

fn value_at(results: &[EnrichmentResult], index: usize) -> FieldValue {
    results
        .get(index)
        .filter(|result| result.position == index)
        .map(|result| result.value.clone())
        .unwrap_or(FieldValue::Absent)
}

/// Fetch positions of rows missing either field.
pub fn select_incomplete(rows: &[EnrichedRow]) -> Vec<usize> {
    rows.iter()
        .filter(|row| !row.is_complete())
        .map(|row| row.position)
        .collect()
}

/// Split rows into `(complete, dropped)`, keeping order.
pub fn finalize(rows: Vec<EnrichedRow>) -> (Vec<EnrichedRow>, Vec<EnrichedRow>) {
    rows.into_iter().partition(EnrichedRow::is_complete)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn articles() -> Vec<Article> {
        vec![
            Article::new("20261016", "a", "x"),
            Article::new("20261016", "b", "x"),
            Article::new("20261017", "c", "y"),
        ]
    }

    fn result(position: usize, value: Option<&str>) -> EnrichmentResult {
        EnrichmentResult {
            position,
            source_text: String::new(),
            value: match value {
                Some(v) => FieldValue::Present(v.to_string()),
                None => FieldValue::Absent,
            },
        }
    }

    #[test]
    fn test_merge_maps_batch_index_to_fetch_position() {
        let articles = articles();
        let rows = merge_results(
            &articles,
            &[0, 2],
            &[result(0, Some("t0")), result(1, Some("t2"))],
            &[result(0, Some("s0")), result(1, None)],
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].position, 0);
        assert_eq!(rows[0].text, "a");
        assert_eq!(rows[1].position, 2);
        assert_eq!(rows[1].text, "c");
        assert_eq!(rows[1].stock_tag, FieldValue::Present("t2".to_string()));
        assert!(rows[1].summary.is_absent());
    }

    #[test]
    fn test_merge_missing_result_is_absent() {
        let articles = articles();
        let rows = merge_results(&articles, &[0, 1], &[result(0, Some("t"))], &[]);
        assert!(rows[0].summary.is_absent());
        assert!(rows[1].stock_tag.is_absent());
    }

    #[test]
    fn test_select_incomplete_is_idempotent() {
        let articles = articles();
        let rows = merge_results(
            &articles,
            &[0, 1, 2],
            &[result(0, Some("t")), result(1, None), result(2, Some("t"))],
            &[result(0, Some("s")), result(1, Some("s")), result(2, None)],
        );

        let first = select_incomplete(&rows);
        let second = select_incomplete(&rows);
        assert_eq!(first, vec![1, 2]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_finalize_partitions_on_completeness() {
        let articles = articles();
        let rows = merge_results(
            &articles,
            &[0, 1, 2],
            &[result(0, Some("t")), result(1, None), result(2, Some("t"))],
            &[result(0, Some("s")), result(1, Some("s")), result(2, Some("s"))],
        );

        let (complete, dropped) = finalize(rows);
        assert_eq!(complete.len(), 2);
        assert!(complete.iter().all(EnrichedRow::is_complete));
        assert_eq!(dropped.len(), 1);
        assert!(dropped[0].stock_tag.is_absent() || dropped[0].summary.is_absent());
    }
}
