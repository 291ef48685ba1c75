/*!
 * Translation service: the top-level orchestrator.
 *
 * Resolves a translator (cached by engine id + settings fingerprint),
 * loads title knowledge, builds prompt payloads, splits work into
 * batches within the engine's declared limits, drives the rate-limit
 * retry, and applies glossary/name substitution while keeping the
 * rolling context history up to date.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use tokio::time::sleep;

use crate::context::{ContextEntry, ContextManager};
use crate::errors::TranslationError;
use crate::knowledge::{KnowledgeSource, TitleKnowledge};
use crate::project::{TextBlock, TitleProject};
use crate::rate_limit::OrchestratorState;
use crate::registry::{EngineId, create_translator};
use crate::translator::{
    EngineSettings, PromptPayload, TranslationRequest, TranslationResult, Translator,
    TranslatorCapabilities,
};

/// Minimum backoff before the single rate-limit retry.
const RETRY_FLOOR: Duration = Duration::from_millis(1500);

/// Notified with the engine id exactly when slow mode is freshly
/// activated.
pub type RateLimitCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Per-call options for the translation entry points.
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    /// Source language override; defaults to the project's
    pub src_lang: Option<String>,

    /// Target language override; defaults to the project's
    pub dst_lang: Option<String>,

    /// Clear the rolling context before translating
    pub reset_context: bool,
}

/// Coordinates translator creation, batching and context-aware
/// post-processing. One instance per caller; shared per-engine throttle
/// state lives in the injected `OrchestratorState`.
pub struct TranslationService {
    ctx_manager: ContextManager,
    state: Arc<OrchestratorState>,
    knowledge_source: Option<Box<dyn KnowledgeSource>>,
    knowledge_cache: HashMap<String, Arc<TitleKnowledge>>,
    translator_cache: Option<CachedTranslator>,
    rate_limit_callback: Option<RateLimitCallback>,
}

struct CachedTranslator {
    key: (EngineId, String),
    translator: Arc<Translator>,
}

impl TranslationService {
    /// Service using the given shared orchestrator state.
    pub fn new(state: Arc<OrchestratorState>) -> Self {
        Self {
            ctx_manager: ContextManager::default(),
            state,
            knowledge_source: None,
            knowledge_cache: HashMap::new(),
            translator_cache: None,
            rate_limit_callback: None,
        }
    }

    /// Attach a knowledge source (e.g. `YamlKnowledgeBase`). Without one,
    /// every project gets fallback knowledge.
    pub fn with_knowledge_source(mut self, source: Box<dyn KnowledgeSource>) -> Self {
        self.knowledge_source = Some(source);
        self
    }

    /// Register a callback invoked with the engine id exactly when slow
    /// mode is freshly activated.
    pub fn set_rate_limit_callback(&mut self, callback: RateLimitCallback) {
        self.rate_limit_callback = Some(callback);
    }

    /// Rolling context history of this service.
    pub fn context(&self) -> &ContextManager {
        &self.ctx_manager
    }

    /// Mutable access to the context history, for persistence restore.
    pub fn context_mut(&mut self) -> &mut ContextManager {
        &mut self.ctx_manager
    }

    /// Shared orchestrator state this service was built with.
    pub fn state(&self) -> &Arc<OrchestratorState> {
        &self.state
    }

    /// Pre-seed the translator cache for `(engine_id, engine_state)`.
    ///
    /// Lets embedders and tests supply a translator with a custom backend
    /// instead of the registry-built one.
    pub fn install_translator(
        &mut self,
        engine_id: EngineId,
        engine_state: &EngineSettings,
        translator: Arc<Translator>,
    ) {
        self.translator_cache = Some(CachedTranslator {
            key: (engine_id, settings_fingerprint(engine_state)),
            translator,
        });
    }

    /// Translate a single piece of text with knowledge and context
    /// awareness. Empty or whitespace-only input is returned unchanged
    /// without touching the engine.
    pub async fn translate_text(
        &mut self,
        text: &str,
        project: &TitleProject,
        engine_id: &str,
        engine_state: &EngineSettings,
        options: &TranslateOptions,
    ) -> Result<String, TranslationError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }
        if options.reset_context {
            self.ctx_manager.clear();
        }

        let engine = engine_id.parse::<EngineId>()?;
        let translator = self.resolve_translator(engine, engine_state)?;
        let knowledge = self.knowledge_for(project);
        let (src, dst) = resolve_languages(project, options);

        let context = self
            .ctx_manager
            .get_recent_context(context_limit(translator.capabilities()));
        let request = build_request(text, &src, &dst, project, &knowledge, context, None);

        let results = self
            .translate_with_retry(engine, &translator, std::slice::from_ref(&request))
            .await?;
        let translated = apply_glossary_and_name_fixes(&results[0].translated_text, &knowledge);
        if !translated.is_empty() {
            self.ctx_manager.add_segment(text, &translated);
        }
        Ok(translated)
    }

    /// Translate a list of text blocks in order, updating their
    /// `translated_text` in place.
    ///
    /// Blocks with empty source text are skipped (translation cleared).
    /// Context history is updated strictly after each batch completes, in
    /// block order, so blocks in the same batch do not see each other's
    /// translations in their own prompt.
    pub async fn translate_blocks(
        &mut self,
        blocks: &mut [TextBlock],
        project: &TitleProject,
        engine_id: &str,
        engine_state: &EngineSettings,
        options: &TranslateOptions,
    ) -> Result<(), TranslationError> {
        if options.reset_context {
            self.ctx_manager.clear();
        }

        let engine = engine_id.parse::<EngineId>()?;
        let translator = self.resolve_translator(engine, engine_state)?;
        let knowledge = self.knowledge_for(project);
        let (src, dst) = resolve_languages(project, options);
        let limit = context_limit(translator.capabilities());

        let mut pending: Vec<usize> = Vec::with_capacity(blocks.len());
        for (index, block) in blocks.iter_mut().enumerate() {
            if block.original_text.trim().is_empty() {
                block.translated_text.clear();
            } else {
                pending.push(index);
            }
        }
        if pending.is_empty() {
            return Ok(());
        }

        let lengths: Vec<usize> = pending
            .iter()
            .map(|&i| blocks[i].original_text.chars().count())
            .collect();
        let batches = split_by_limits(&lengths, translator.capabilities());
        info!(
            "{}: translating {} block(s) in {} batch(es)",
            translator.name(),
            pending.len(),
            batches.len()
        );

        // Requests are built per batch so a batch sees the translations of
        // every earlier batch as context, but never its own.
        for batch in &batches {
            let context = self.ctx_manager.get_recent_context(limit);
            let requests: Vec<TranslationRequest> = batch
                .iter()
                .map(|&slot| {
                    let block = &blocks[pending[slot]];
                    build_request(
                        &block.original_text,
                        &src,
                        &dst,
                        project,
                        &knowledge,
                        context.clone(),
                        Some(block),
                    )
                })
                .collect();

            let results = self.translate_with_retry(engine, &translator, &requests).await?;
            if results.len() != requests.len() {
                return Err(TranslationError::ResultCountMismatch {
                    expected: requests.len(),
                    actual: results.len(),
                });
            }

            for ((slot, request), result) in batch.iter().zip(&requests).zip(&results) {
                let fixed = apply_glossary_and_name_fixes(&result.translated_text, &knowledge);
                blocks[pending[*slot]].translated_text = fixed.clone();
                if !fixed.is_empty() {
                    self.ctx_manager.add_segment(&request.text, &fixed);
                }
            }
        }
        Ok(())
    }

    fn resolve_translator(
        &mut self,
        engine: EngineId,
        engine_state: &EngineSettings,
    ) -> Result<Arc<Translator>, TranslationError> {
        let key = (engine, settings_fingerprint(engine_state));
        if let Some(cached) = &self.translator_cache {
            if cached.key == key {
                return Ok(Arc::clone(&cached.translator));
            }
        }

        debug!("building translator for '{}'", engine);
        let translator = Arc::new(create_translator(engine.as_str(), engine_state, &self.state)?);
        // Single-slot cache: only the most recent configuration stays hot.
        self.translator_cache = Some(CachedTranslator {
            key,
            translator: Arc::clone(&translator),
        });
        Ok(translator)
    }

    fn knowledge_for(&mut self, project: &TitleProject) -> Arc<TitleKnowledge> {
        if let Some(knowledge) = self.knowledge_cache.get(&project.title_id) {
            return Arc::clone(knowledge);
        }

        let loaded = match &self.knowledge_source {
            Some(source) => match source.load(&project.title_id) {
                Ok(knowledge) => knowledge,
                Err(err) => {
                    warn!(
                        "knowledge base unavailable for '{}', using fallback: {}",
                        project.title_id, err
                    );
                    TitleKnowledge::fallback(project)
                }
            },
            None => TitleKnowledge::fallback(project),
        };
        let knowledge = Arc::new(loaded);
        self.knowledge_cache
            .insert(project.title_id.clone(), Arc::clone(&knowledge));
        knowledge
    }

    /// Run one engine call, retrying exactly once after a rate-limit
    /// signal: activate slow mode, fire the callback on a fresh
    /// activation, back off for at least the retry floor, then try again.
    /// A second rate-limit failure is terminal.
    async fn translate_with_retry(
        &self,
        engine: EngineId,
        translator: &Translator,
        requests: &[TranslationRequest],
    ) -> Result<Vec<TranslationResult>, TranslationError> {
        match translator.translate_batch(requests).await {
            Err(TranslationError::RateLimited { message, .. }) => {
                self.state.activate_slow_mode(engine, &message);
                if self.state.consume_slow_mode_notice(engine) {
                    if let Some(callback) = &self.rate_limit_callback {
                        callback(engine.as_str());
                    }
                }

                let wait = self.state.penalty_delay(engine).max(RETRY_FLOOR);
                warn!(
                    "{}: rate limited ({}), retrying once after {:?}",
                    translator.name(),
                    message,
                    wait
                );
                sleep(wait).await;

                match translator.translate_batch(requests).await {
                    Err(TranslationError::RateLimited { message, .. }) => {
                        Err(TranslationError::Failed(format!(
                            "{} still rate limited after retry: {}",
                            translator.name(),
                            message
                        )))
                    }
                    other => other,
                }
            }
            other => other,
        }
    }
}

fn resolve_languages(project: &TitleProject, options: &TranslateOptions) -> (String, String) {
    let src = options
        .src_lang
        .clone()
        .unwrap_or_else(|| project.original_language.clone())
        .to_lowercase();
    let dst = options
        .dst_lang
        .clone()
        .unwrap_or_else(|| project.target_language.clone())
        .to_lowercase();
    (src, dst)
}

fn context_limit(capabilities: &TranslatorCapabilities) -> usize {
    if capabilities.context_window == 0 {
        10
    } else {
        capabilities.context_window
    }
}

fn build_request(
    text: &str,
    src: &str,
    dst: &str,
    project: &TitleProject,
    knowledge: &TitleKnowledge,
    context: Vec<ContextEntry>,
    block: Option<&TextBlock>,
) -> TranslationRequest {
    let prompt = PromptPayload {
        text: text.to_string(),
        src_lang: src.to_string(),
        dst_lang: dst.to_string(),
        title_id: knowledge.meta.id.clone(),
        title_name: knowledge.meta.display_name.clone(),
        style: knowledge.style.clone(),
        characters: knowledge.characters.clone(),
        terms: knowledge.terms.clone(),
        recent_context: context.clone(),
        content_type: project.content_type.clone(),
        color_mode: project.color_mode.clone(),
    };

    let mut request = TranslationRequest::new(text, src, dst);
    request.prompt = Some(prompt);
    request.context = context;
    if let Some(block) = block {
        request.metadata.insert("block_id".to_string(), block.id.clone());
        if let Some(block_type) = &block.block_type {
            request
                .metadata
                .insert("block_type".to_string(), block_type.clone());
        }
    }
    request
}

/// Split requests into engine-sized batches.
///
/// Greedy first-fit in request order: a batch closes when the next
/// request would exceed the batch size or the accumulated character
/// budget, whichever triggers first. Non-batch engines get one request
/// per batch.
pub fn split_into_batches(
    requests: &[TranslationRequest],
    capabilities: &TranslatorCapabilities,
) -> Vec<Vec<TranslationRequest>> {
    let lengths: Vec<usize> = requests.iter().map(|r| r.text.chars().count()).collect();
    split_by_limits(&lengths, capabilities)
        .into_iter()
        .map(|batch| batch.into_iter().map(|i| requests[i].clone()).collect())
        .collect()
}

/// Index form of the batch split, over precomputed character counts.
fn split_by_limits(lengths: &[usize], capabilities: &TranslatorCapabilities) -> Vec<Vec<usize>> {
    if !capabilities.supports_batch {
        return (0..lengths.len()).map(|i| vec![i]).collect();
    }

    let max_batch = capabilities.max_batch_size.max(1);
    let max_chars = capabilities.max_chars_per_request;

    let mut batches: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut current_chars = 0usize;

    for (index, &length) in lengths.iter().enumerate() {
        let fits_count = current.len() < max_batch;
        let fits_chars = max_chars.is_none_or(|max| current_chars + length <= max);

        if !current.is_empty() && (!fits_count || !fits_chars) {
            batches.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        current.push(index);
        current_chars += length;
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Apply glossary terms, then character display names, as literal
/// substring replacements over the translated text. Deliberately naive;
/// not word-boundary aware.
pub fn apply_glossary_and_name_fixes(translated: &str, knowledge: &TitleKnowledge) -> String {
    let mut result = translated.to_string();
    for term in &knowledge.terms {
        if !term.source.is_empty() && !term.target.is_empty() {
            result = result.replace(&term.source, &term.target);
        }
    }
    for character in &knowledge.characters {
        if character.display_name.is_empty() {
            continue;
        }
        for original_name in &character.original_names {
            if !original_name.is_empty() {
                result = result.replace(original_name, &character.display_name);
            }
        }
    }
    result
}

fn settings_fingerprint(settings: &EngineSettings) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in settings {
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(value.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}
