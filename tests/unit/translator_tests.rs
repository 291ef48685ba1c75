/*!
 * Tests for translator failover across containers
 */

use std::time::Duration;

use tokio_test;

use mangatl::errors::TranslationError;
use mangatl::registry::EngineId;
use mangatl::translator::{TranslationRequest, TranslatorContainer};

use crate::common::mock_backends::{
    MockBackend, MockOutcome, batch_capabilities, mock_translator, sequential_capabilities,
};

fn request(text: &str) -> TranslationRequest {
    TranslationRequest::new(text, "ja", "en")
}

#[tokio::test(start_paused = true)]
async fn test_failover_withTwoContainers_shouldRotateBlockFirstAndSucceed() {
    let containers = vec![
        TranslatorContainer::primary("c1").with_max_failures(2),
        TranslatorContainer::new("c2").with_max_failures(2),
    ];
    let (translator, recorder) = mock_translator(
        EngineId::OpenAiTranslate,
        sequential_capabilities(),
        containers,
        vec![
            MockOutcome::Fail("boom"),
            MockOutcome::Fail("boom"),
            MockOutcome::Fail("boom"),
            MockOutcome::Succeed,
        ],
    );

    let result = translator.translate_text(&request("hello")).await.unwrap();
    assert_eq!(result.translated_text, MockBackend::translated("hello"));

    // Alternation c1, c2, c1, c2: c1 hit its failure limit, c2 recovered
    let calls = recorder.calls();
    let names: Vec<&str> = calls.iter().map(|c| c.container.as_str()).collect();
    assert_eq!(names, ["c1", "c2", "c1", "c2"]);

    let containers = translator.containers();
    assert!(containers[0].is_blocked());
    assert_eq!(containers[0].fail_uses, 2);
    assert!(!containers[1].is_blocked());
    assert_eq!(containers[1].fail_uses, 0);
}

#[tokio::test(start_paused = true)]
async fn test_failover_withAllAttemptsFailing_shouldReportNoAvailableBackend() {
    let (translator, recorder) = mock_translator(
        EngineId::OpenAiTranslate,
        sequential_capabilities(),
        vec![TranslatorContainer::primary("c1")],
        vec![MockOutcome::Fail("down"); 4],
    );

    let err = translator.translate_text(&request("hello")).await.unwrap_err();
    match err {
        TranslationError::NoAvailableBackend { engine, source } => {
            assert_eq!(engine, "Mock Engine");
            assert!(source.is_some());
        }
        other => panic!("unexpected error: {}", other),
    }
    // Attempts capped at twice the container count
    assert_eq!(recorder.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failover_withSingleBlockedContainer_shouldForceRestorePrimary() {
    let containers = vec![TranslatorContainer::primary("c1").with_max_failures(1)];
    let (translator, _recorder) = mock_translator(
        EngineId::OpenAiTranslate,
        sequential_capabilities(),
        containers,
        vec![MockOutcome::Fail("boom"), MockOutcome::Succeed],
    );

    // First call fails and blocks the only container
    let err = translator.translate_text(&request("first")).await;
    assert!(err.is_err());
    assert!(translator.containers()[0].is_blocked());

    // The next call force-restores the primary rather than bailing out
    let result = translator.translate_text(&request("second")).await.unwrap();
    assert_eq!(result.translated_text, MockBackend::translated("second"));
    assert!(!translator.containers()[0].is_blocked());
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_duringFailover_shouldPropagateWithoutRotation() {
    let containers = vec![
        TranslatorContainer::primary("c1"),
        TranslatorContainer::new("c2"),
    ];
    let (translator, recorder) = mock_translator(
        EngineId::Deepl,
        sequential_capabilities(),
        containers,
        vec![MockOutcome::RateLimit],
    );

    let err = translator.translate_text(&request("hello")).await.unwrap_err();
    assert!(matches!(err, TranslationError::RateLimited { status_code: Some(429), .. }));
    // No second container was tried
    assert_eq!(recorder.call_count(), 1);
    // The failure still counts against the container
    assert_eq!(translator.containers()[0].fail_uses, 1);
}

#[tokio::test(start_paused = true)]
async fn test_translate_batch_withNonBatchEngine_shouldIssueOneCallPerRequest() {
    let (translator, recorder) = mock_translator(
        EngineId::Argos,
        sequential_capabilities(),
        Vec::new(),
        Vec::new(),
    );

    let requests = vec![request("one"), request("two"), request("three")];
    let results = translator.translate_batch(&requests).await.unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(recorder.batch_sizes(), [1, 1, 1]);
    assert_eq!(results[0].translated_text, MockBackend::translated("one"));
    assert_eq!(results[2].translated_text, MockBackend::translated("three"));
}

/// An empty batch short-circuits without touching any backend
#[test]
fn test_translate_batch_withNoRequests_shouldReturnEmptyWithoutBackendCall() {
    let (translator, recorder) = mock_translator(
        EngineId::Deepl,
        batch_capabilities(10, 1000),
        Vec::new(),
        Vec::new(),
    );

    let results = tokio_test::block_on(async { translator.translate_batch(&[]).await }).unwrap();

    assert!(results.is_empty());
    assert_eq!(recorder.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_translate_batch_withBatchEngine_shouldIssueSingleNativeCall() {
    let (translator, recorder) = mock_translator(
        EngineId::Deepl,
        batch_capabilities(10, 1000),
        Vec::new(),
        Vec::new(),
    );

    let requests = vec![request("one"), request("two")];
    let results = translator.translate_batch(&requests).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(recorder.batch_sizes(), [2]);
}

#[tokio::test(start_paused = true)]
async fn test_failover_withAttemptDelay_shouldPauseBetweenAttempts() {
    let mut capabilities = sequential_capabilities();
    capabilities.attempt_delay_ms = 600;
    let (translator, _recorder) = mock_translator(
        EngineId::OpenAiTranslate,
        capabilities,
        vec![TranslatorContainer::primary("c1"), TranslatorContainer::new("c2")],
        vec![MockOutcome::Fail("boom"), MockOutcome::Succeed],
    );

    let before = tokio::time::Instant::now();
    translator.translate_text(&request("hello")).await.unwrap();
    assert!(before.elapsed() >= Duration::from_millis(600));
}
