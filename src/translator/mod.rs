/*!
 * Core translator abstraction with container failover.
 *
 * A `Translator` pairs an opaque engine call (`TranslatorBackend`) with a
 * pool of containers and the declared capabilities copied from the
 * registry at construction. Single-request translation is defined as a
 * batch of one; batch-capable engines issue one native multi-item call,
 * everything else translates sequentially with per-request failover.
 */

pub mod containers;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::context::ContextEntry;
use crate::errors::{EngineError, TranslationError};
use crate::knowledge::{Character, StyleConfig, Term};
use crate::registry::EngineId;

pub use containers::{ContainerPool, TranslatorContainer};

/// Opaque per-engine settings supplied by the caller (api keys,
/// endpoints, mode flags).
pub type EngineSettings = BTreeMap<String, String>;

/// Declared limits and batching capabilities of one engine.
///
/// Copied into each translator instance at construction; runtime mutation
/// of a copy never affects the registry default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslatorCapabilities {
    /// Whether the engine accepts several items in one native call
    pub supports_batch: bool,

    /// Maximum items per native batch call
    pub max_batch_size: usize,

    /// Character budget per request/batch, when the engine declares one
    pub max_chars_per_request: Option<usize>,

    /// Total character budget across a session, when declared
    pub max_chars_total: Option<usize>,

    /// How many recent context pairs the engine prompt can carry
    pub context_window: usize,

    /// Pause between failover attempts
    pub attempt_delay_ms: u64,
}

impl Default for TranslatorCapabilities {
    fn default() -> Self {
        Self {
            supports_batch: false,
            max_batch_size: 1,
            max_chars_per_request: None,
            max_chars_total: None,
            context_window: 10,
            attempt_delay_ms: 600,
        }
    }
}

/// Structured context handed to the engine alongside the text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptPayload {
    /// Text to translate
    pub text: String,

    /// Source language code
    pub src_lang: String,

    /// Target language code
    pub dst_lang: String,

    /// Title identifier
    pub title_id: String,

    /// Title display name
    pub title_name: String,

    /// Style settings for this title, when configured
    pub style: Option<StyleConfig>,

    /// Known characters
    pub characters: Vec<Character>,

    /// Glossary terms
    pub terms: Vec<Term>,

    /// Recent (original, translated) pairs, oldest-first
    pub recent_context: Vec<ContextEntry>,

    /// Content type hint
    pub content_type: Option<String>,

    /// Color mode hint
    pub color_mode: Option<String>,
}

/// Single translation unit prepared by the translation service.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    /// Text to translate
    pub text: String,

    /// Source language code
    pub src_lang: String,

    /// Target language code
    pub dst_lang: String,

    /// Structured prompt context, when the service built one
    pub prompt: Option<PromptPayload>,

    /// Recent context pairs
    pub context: Vec<ContextEntry>,

    /// Free-form metadata carried through to the result (block id etc.)
    pub metadata: BTreeMap<String, String>,
}

impl TranslationRequest {
    /// Bare request without prompt context.
    pub fn new(
        text: impl Into<String>,
        src_lang: impl Into<String>,
        dst_lang: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            src_lang: src_lang.into(),
            dst_lang: dst_lang.into(),
            prompt: None,
            context: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }
}

/// Normalized translation output.
#[derive(Debug, Clone)]
pub struct TranslationResult {
    /// Translated text
    pub translated_text: String,

    /// Raw engine response, when one was captured
    pub raw_response: Option<serde_json::Value>,

    /// Metadata carried over from the request
    pub metadata: BTreeMap<String, String>,
}

impl TranslationResult {
    /// Result carrying only text plus the request's metadata.
    pub fn new(translated_text: impl Into<String>, request: &TranslationRequest) -> Self {
        Self {
            translated_text: translated_text.into(),
            raw_response: None,
            metadata: request.metadata.clone(),
        }
    }
}

/// The opaque engine call boundary.
///
/// Adapters translate one request at a time against a specific container;
/// batch-capable engines override `translate_many` to issue one native
/// multi-item call. The default `translate_many` loops `translate_one`
/// on the same container.
#[async_trait]
pub trait TranslatorBackend: Send + Sync {
    /// Translate a single request via this backend.
    async fn translate_one(
        &self,
        request: &TranslationRequest,
        container: &TranslatorContainer,
        settings: &EngineSettings,
    ) -> Result<TranslationResult, EngineError>;

    /// Translate several requests in one engine call, preserving order
    /// and cardinality.
    async fn translate_many(
        &self,
        requests: &[TranslationRequest],
        container: &TranslatorContainer,
        settings: &EngineSettings,
    ) -> Result<Vec<TranslationResult>, EngineError> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.translate_one(request, container, settings).await?);
        }
        Ok(results)
    }
}

/// A configured translator: engine call + containers + capability copy.
pub struct Translator {
    engine_id: EngineId,
    name: String,
    capabilities: TranslatorCapabilities,
    settings: EngineSettings,
    pool: ContainerPool,
    backend: Box<dyn TranslatorBackend>,
}

impl Translator {
    /// Build a translator with a single primary container.
    pub fn new(
        engine_id: EngineId,
        name: impl Into<String>,
        capabilities: TranslatorCapabilities,
        settings: EngineSettings,
        backend: Box<dyn TranslatorBackend>,
    ) -> Self {
        Self::with_containers(engine_id, name, capabilities, settings, backend, Vec::new())
    }

    /// Build a translator with an explicit container set; an empty set
    /// falls back to one primary named after the translator.
    pub fn with_containers(
        engine_id: EngineId,
        name: impl Into<String>,
        capabilities: TranslatorCapabilities,
        settings: EngineSettings,
        backend: Box<dyn TranslatorBackend>,
        containers: Vec<TranslatorContainer>,
    ) -> Self {
        let name = name.into();
        let pool = ContainerPool::new(containers, &name);
        Self { engine_id, name, capabilities, settings, pool, backend }
    }

    /// Engine identifier this translator was built for.
    pub fn engine_id(&self) -> EngineId {
        self.engine_id
    }

    /// Display name for logs and error reporting.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capability copy owned by this instance.
    pub fn capabilities(&self) -> &TranslatorCapabilities {
        &self.capabilities
    }

    /// Snapshot of this translator's containers.
    pub fn containers(&self) -> Vec<TranslatorContainer> {
        self.pool.containers()
    }

    /// Translate a single request. Defined as a batch of one.
    pub async fn translate_text(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationResult, TranslationError> {
        let mut results = self
            .translate_with_failover(std::slice::from_ref(request))
            .await?;
        results.pop().ok_or(TranslationError::ResultCountMismatch { expected: 1, actual: 0 })
    }

    /// Translate a batch, returning results in request order.
    ///
    /// Batch-capable engines issue one native call for the whole slice;
    /// otherwise each request is translated sequentially with its own
    /// failover.
    pub async fn translate_batch(
        &self,
        requests: &[TranslationRequest],
    ) -> Result<Vec<TranslationResult>, TranslationError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        if self.capabilities.supports_batch && requests.len() > 1 {
            return self.translate_with_failover(requests).await;
        }

        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.extend(
                self.translate_with_failover(std::slice::from_ref(request))
                    .await?,
            );
        }
        Ok(results)
    }

    /// Run one engine call with container rotation on failure.
    ///
    /// Rate-limit signals mark the container failed and propagate
    /// immediately; general failures rotate to the longest-idle
    /// alternative after `attempt_delay_ms`. Attempts are capped at twice
    /// the container count so the loop always terminates.
    async fn translate_with_failover(
        &self,
        requests: &[TranslationRequest],
    ) -> Result<Vec<TranslationResult>, TranslationError> {
        let mut last_error: Option<EngineError> = None;
        let mut current = self.pool.select(true, None);
        let mut attempts = 0;
        let max_attempts = self.pool.len().max(1) * 2;

        while attempts < max_attempts {
            attempts += 1;
            let Some(index) = current else { break };
            let container = self.pool.snapshot(index);

            match self
                .backend
                .translate_many(requests, &container, &self.settings)
                .await
            {
                Ok(results) => {
                    self.pool.mark_success(index);
                    if results.len() != requests.len() {
                        return Err(TranslationError::ResultCountMismatch {
                            expected: requests.len(),
                            actual: results.len(),
                        });
                    }
                    debug!(
                        "{}: translated {} item(s) via container '{}'",
                        self.name,
                        results.len(),
                        container.name
                    );
                    return Ok(results);
                }
                Err(EngineError::RateLimited { status_code, message }) => {
                    self.pool.mark_failure(index);
                    return Err(TranslationError::RateLimited { status_code, message });
                }
                Err(err @ EngineError::TextTooLong { .. }) => {
                    // Not a container fault; rotating cannot help.
                    return Err(err.into());
                }
                Err(err) => {
                    warn!(
                        "{}: container '{}' failed (attempt {}/{}): {}",
                        self.name, container.name, attempts, max_attempts, err
                    );
                    self.pool.mark_failure(index);
                    last_error = Some(err);
                    current = self.pool.select(false, Some(index));
                    if self.capabilities.attempt_delay_ms > 0 {
                        sleep(Duration::from_millis(self.capabilities.attempt_delay_ms)).await;
                    }
                }
            }
        }

        Err(TranslationError::NoAvailableBackend {
            engine: self.name.clone(),
            source: last_error,
        })
    }
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator")
            .field("engine_id", &self.engine_id)
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("containers", &self.pool.len())
            .finish()
    }
}
