//! Enrichment engine integration tests.
//!
//! These tests drive the engine with a mock enricher:
//! - Results come back in submission order whatever the completion order
//! - Slow calls degrade to the absent marker without failing the batch
//! - The worker pool bounds concurrent calls
//! - Duplicate texts are enriched independently

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use aipro_news_core::{
    enrich::{AbsentReason, EnrichmentResult},
    testing::{fixtures, MockBehavior, MockEnricher},
    EngineConfig, EnrichError, EnrichmentEngine, FieldValue, TaskKind,
};

fn engine(enricher: &MockEnricher, config: EngineConfig) -> EnrichmentEngine {
    EnrichmentEngine::new(Arc::new(enricher.clone()), config)
}

fn present(value: String) -> FieldValue {
    FieldValue::Present(value)
}

#[tokio::test]
async fn test_results_follow_input_order_not_completion_order() {
    let enricher = MockEnricher::new();
    let texts = fixtures::texts(&["t0", "t1", "t2", "t3", "t4", "t5"]);
    // Earlier positions finish last.
    for (i, text) in texts.iter().enumerate() {
        let delay = Duration::from_millis(20 * (texts.len() - i) as u64);
        enricher
            .script(
                text,
                TaskKind::ExtractTag,
                vec![MockBehavior::delayed(
                    delay,
                    MockBehavior::Value(format!("v{}", i)),
                )],
            )
            .await;
    }

    let run = engine(&enricher, EngineConfig::default())
        .run(&texts, TaskKind::ExtractTag)
        .await
        .unwrap();

    assert_eq!(run.results.len(), texts.len());
    for (i, result) in run.results.iter().enumerate() {
        assert_eq!(result.position, i);
        assert_eq!(result.source_text, texts[i]);
        assert_eq!(result.value, present(format!("v{}", i)));
    }
    assert_eq!(run.stats.succeeded, texts.len());
}

#[tokio::test]
async fn test_empty_input_returns_empty_output() {
    let enricher = MockEnricher::new();
    let run = engine(&enricher, EngineConfig::default())
        .run(&[], TaskKind::ExtractTag)
        .await
        .unwrap();

    assert!(run.results.is_empty());
    assert!(enricher.calls().await.is_empty());
}

#[tokio::test]
async fn test_timeout_degrades_only_the_slow_article() {
    let enricher = MockEnricher::new();
    enricher
        .script(
            "B",
            TaskKind::ExtractTag,
            vec![MockBehavior::delayed(
                Duration::from_secs(2),
                MockBehavior::Value("late".to_string()),
            )],
        )
        .await;
    let config = EngineConfig::default().with_call_timeout(Duration::from_millis(100));

    let run = engine(&enricher, config)
        .run(&fixtures::texts(&["A", "B", "C"]), TaskKind::ExtractTag)
        .await
        .unwrap();

    let expected = vec![
        EnrichmentResult {
            position: 0,
            source_text: "A".to_string(),
            value: present(MockEnricher::default_value("A", TaskKind::ExtractTag)),
        },
        EnrichmentResult {
            position: 1,
            source_text: "B".to_string(),
            value: FieldValue::Absent,
        },
        EnrichmentResult {
            position: 2,
            source_text: "C".to_string(),
            value: present(MockEnricher::default_value("C", TaskKind::ExtractTag)),
        },
    ];
    assert_eq!(run.results, expected);
    assert_eq!(run.stats.absent_for(AbsentReason::Timeout), 1);
}

#[tokio::test]
async fn test_every_entry_has_value_or_marker() {
    let enricher = MockEnricher::new();
    enricher
        .script(
            "bad json",
            TaskKind::Summarize,
            vec![MockBehavior::Fail(EnrichError::Parse("eof".to_string()))],
        )
        .await;
    enricher
        .script(
            "no field",
            TaskKind::Summarize,
            vec![MockBehavior::Fail(EnrichError::MissingField(
                "新聞摘要".to_string(),
            ))],
        )
        .await;
    let texts = fixtures::texts(&["ok", "bad json", "no field", "ok too"]);

    let run = engine(&enricher, EngineConfig::default())
        .run(&texts, TaskKind::Summarize)
        .await
        .unwrap();

    assert_eq!(run.results.len(), 4);
    assert_eq!(run.results[1].value.as_str(), "無");
    assert_eq!(run.results[2].value.as_str(), "無");
    assert_eq!(run.stats.succeeded + run.stats.absent_total(), 4);
}

#[tokio::test]
async fn test_pool_bounds_concurrent_calls() {
    let enricher = MockEnricher::new();
    enricher.set_delay(Duration::from_millis(30)).await;
    let texts: Vec<String> = (0..20).map(|i| format!("article {}", i)).collect();
    let config = EngineConfig::default().with_workers(3);

    let run = engine(&enricher, config)
        .run(&texts, TaskKind::Summarize)
        .await
        .unwrap();

    assert_eq!(run.stats.succeeded, 20);
    assert_eq!(enricher.calls().await.len(), 20);
    let peak = enricher.max_concurrency();
    assert!(peak >= 1 && peak <= 3, "peak concurrency was {}", peak);
}

#[tokio::test]
async fn test_duplicate_texts_are_enriched_independently() {
    let enricher = MockEnricher::new();
    enricher
        .script(
            "dup",
            TaskKind::ExtractTag,
            vec![
                MockBehavior::Value("甲(1111)".to_string()),
                MockBehavior::Value("乙(2222)".to_string()),
            ],
        )
        .await;
    let texts = fixtures::texts(&["a", "b", "dup", "c", "d", "dup"]);

    let run = engine(&enricher, EngineConfig::default())
        .run(&texts, TaskKind::ExtractTag)
        .await
        .unwrap();

    assert_eq!(run.results.len(), 6);
    assert_eq!(run.results[2].source_text, "dup");
    assert_eq!(run.results[5].source_text, "dup");
    let values: HashSet<&str> = [2, 5]
        .iter()
        .map(|&position| run.results[position].value.as_str())
        .collect();
    assert_eq!(values, HashSet::from(["甲(1111)", "乙(2222)"]));
    assert_eq!(enricher.call_count("dup", TaskKind::ExtractTag).await, 2);
}
