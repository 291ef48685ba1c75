/*!
 * Mock translator backends for testing
 *
 * This module provides a scriptable backend so tests can drive the
 * failover and retry machinery without any network calls. Outcomes are
 * consumed one per engine call; every call is recorded with its batch
 * size and the container it ran against.
 */

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use mangatl::errors::EngineError;
use mangatl::registry::EngineId;
use mangatl::translator::{
    EngineSettings, TranslationRequest, TranslationResult, Translator, TranslatorBackend,
    TranslatorCapabilities, TranslatorContainer,
};

/// What the next engine call should do
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Succeed, echoing each text with a marker prefix
    Succeed,
    /// Fail with a generic request error
    Fail(&'static str),
    /// Fail with a rate-limit signal
    RateLimit,
}

/// One recorded engine call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Number of requests in the call
    pub batch_size: usize,
    /// Name of the container the call ran against
    pub container: String,
    /// Texts in request order
    pub texts: Vec<String>,
    /// Context length of the first request in the call
    pub context_len: usize,
}

/// Shared recorder, cloneable into the backend and kept by the test
#[derive(Debug, Default)]
pub struct CallRecorder {
    calls: Mutex<Vec<RecordedCall>>,
}

impl CallRecorder {
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(|c| c.batch_size).collect()
    }
}

/// Scriptable backend: pops one outcome per engine call, succeeding once
/// the script runs out
pub struct MockBackend {
    outcomes: Mutex<VecDeque<MockOutcome>>,
    recorder: Arc<CallRecorder>,
}

impl MockBackend {
    pub fn new(outcomes: Vec<MockOutcome>) -> (Self, Arc<CallRecorder>) {
        let recorder = Arc::new(CallRecorder::default());
        let backend = Self {
            outcomes: Mutex::new(outcomes.into()),
            recorder: Arc::clone(&recorder),
        };
        (backend, recorder)
    }

    /// Translation a successful mock call produces for `text`
    pub fn translated(text: &str) -> String {
        format!("TX:{}", text)
    }

    fn next_outcome(&self) -> MockOutcome {
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockOutcome::Succeed)
    }
}

#[async_trait]
impl TranslatorBackend for MockBackend {
    async fn translate_one(
        &self,
        request: &TranslationRequest,
        container: &TranslatorContainer,
        settings: &EngineSettings,
    ) -> Result<TranslationResult, EngineError> {
        let mut results = self
            .translate_many(std::slice::from_ref(request), container, settings)
            .await?;
        Ok(results.remove(0))
    }

    async fn translate_many(
        &self,
        requests: &[TranslationRequest],
        container: &TranslatorContainer,
        _settings: &EngineSettings,
    ) -> Result<Vec<TranslationResult>, EngineError> {
        self.recorder.calls.lock().unwrap().push(RecordedCall {
            batch_size: requests.len(),
            container: container.name.clone(),
            texts: requests.iter().map(|r| r.text.clone()).collect(),
            context_len: requests.first().map_or(0, |r| r.context.len()),
        });

        match self.next_outcome() {
            MockOutcome::Succeed => Ok(requests
                .iter()
                .map(|r| TranslationResult::new(Self::translated(&r.text), r))
                .collect()),
            MockOutcome::Fail(message) => Err(EngineError::RequestFailed(message.to_string())),
            MockOutcome::RateLimit => Err(EngineError::RateLimited {
                status_code: Some(429),
                message: "too many requests".to_string(),
            }),
        }
    }
}

/// Batch-capable capabilities with no failover pause, for deterministic
/// timing assertions
pub fn batch_capabilities(max_batch_size: usize, max_chars: usize) -> TranslatorCapabilities {
    TranslatorCapabilities {
        supports_batch: true,
        max_batch_size,
        max_chars_per_request: Some(max_chars),
        max_chars_total: None,
        context_window: 10,
        attempt_delay_ms: 0,
    }
}

/// Single-item capabilities with no failover pause
pub fn sequential_capabilities() -> TranslatorCapabilities {
    TranslatorCapabilities { attempt_delay_ms: 0, ..TranslatorCapabilities::default() }
}

/// Translator wired to a scripted mock backend
pub fn mock_translator(
    engine_id: EngineId,
    capabilities: TranslatorCapabilities,
    containers: Vec<TranslatorContainer>,
    outcomes: Vec<MockOutcome>,
) -> (Translator, Arc<CallRecorder>) {
    let (backend, recorder) = MockBackend::new(outcomes);
    let translator = Translator::with_containers(
        engine_id,
        "Mock Engine",
        capabilities,
        EngineSettings::new(),
        Box::new(backend),
        containers,
    );
    (translator, recorder)
}
