/*!
 * DeepL adapter: official API/endpoint mode, or the web JSON-RPC
 * endpoint in limited (no-API) mode.
 *
 * The web path is paced by the per-engine rate limiter before every call;
 * any failure there is registered with the backoff state and surfaces as
 * the rate-limit signal so the orchestrator can enter slow mode.
 */

use async_trait::async_trait;
use rand::Rng;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::engines::http_api::{MtClient, configured_endpoint, effective_api_key};
use crate::engines::{decode_html_entities, map_wait_error};
use crate::errors::EngineError;
use crate::rate_limit::OrchestratorState;
use crate::registry::EngineId;
use crate::translator::{
    EngineSettings, TranslationRequest, TranslationResult, TranslatorBackend, TranslatorContainer,
};

const DEEPL_WEB_URL: &str = "https://www2.deepl.com/jsonrpc";

/// DeepL backend. Uses the web endpoint by default; `use_api=true` plus an
/// endpoint or key switches to the configured API.
#[derive(Debug)]
pub struct DeeplBackend {
    client: MtClient,
    state: Arc<OrchestratorState>,
}

impl DeeplBackend {
    /// Backend sharing the orchestrator's rate-limit state.
    pub fn new(state: Arc<OrchestratorState>) -> Self {
        Self { client: MtClient::new(), state }
    }

    fn use_api(settings: &EngineSettings) -> bool {
        settings.get("use_api").is_some_and(|v| v == "true" || v == "1")
    }

    /// Best-effort call against the public web JSON-RPC endpoint.
    async fn translate_web(
        &self,
        text: &str,
        src_lang: &str,
        dst_lang: &str,
    ) -> Result<String, EngineError> {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let request_id: u32 = rand::rng().random_range(100_000..=999_999);
        let payload = json!({
            "jsonrpc": "2.0",
            "method": "LMT_handle_jobs",
            "id": request_id,
            "params": {
                "jobs": [{
                    "kind": "default",
                    "raw_en_sentence": text,
                    "raw_en_context_before": [],
                    "raw_en_context_after": [],
                    "preferred_num_beams": 1,
                }],
                "lang": {
                    "source_lang_user_selected": src_lang.to_uppercase(),
                    "target_lang": dst_lang.to_uppercase(),
                },
                "priority": 1,
                "timestamp": timestamp_ms,
            },
        });
        let headers = [
            ("User-Agent", "Mozilla/5.0".to_string()),
            ("Accept", "*/*".to_string()),
            ("Origin", "https://www.deepl.com".to_string()),
            ("Referer", "https://www.deepl.com/translator".to_string()),
        ];

        let response = self.client.post_json(DEEPL_WEB_URL, &payload, &headers).await?;
        let sentence = response
            .pointer("/result/translations/0/beams/0/postprocessed_sentence")
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::ParseError("unexpected DeepL response".to_string()))?;
        Ok(decode_html_entities(sentence))
    }

    async fn translate_limited(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationResult, EngineError> {
        self.state
            .wait_or_raise(EngineId::Deepl, request.text.chars().count())
            .await
            .map_err(map_wait_error)?;

        match self
            .translate_web(&request.text, &request.src_lang, &request.dst_lang)
            .await
        {
            Ok(translated) => Ok(TranslationResult::new(translated, request)),
            Err(err) => {
                let status_code = err.status_code();
                let message = err.to_string();
                self.state
                    .register_backoff_failure(EngineId::Deepl, status_code, &message);
                Err(EngineError::RateLimited { status_code, message })
            }
        }
    }
}

#[async_trait]
impl TranslatorBackend for DeeplBackend {
    async fn translate_one(
        &self,
        request: &TranslationRequest,
        container: &TranslatorContainer,
        settings: &EngineSettings,
    ) -> Result<TranslationResult, EngineError> {
        if request.text.trim().is_empty() {
            return Ok(TranslationResult::new("", request));
        }

        let endpoint = configured_endpoint(settings);
        let api_key = effective_api_key(container, settings);
        if Self::use_api(settings) && (endpoint.is_some() || api_key.is_some()) {
            let translated = self
                .client
                .call(request, EngineId::Deepl, api_key, endpoint)
                .await?;
            return Ok(TranslationResult::new(translated, request));
        }

        self.translate_limited(request).await
    }

    async fn translate_many(
        &self,
        requests: &[TranslationRequest],
        container: &TranslatorContainer,
        settings: &EngineSettings,
    ) -> Result<Vec<TranslationResult>, EngineError> {
        let endpoint = configured_endpoint(settings);
        let api_key = effective_api_key(container, settings);
        if Self::use_api(settings) && endpoint.is_some() {
            let translations = self
                .client
                .call_many(requests, EngineId::Deepl, api_key, endpoint)
                .await?;
            return Ok(requests
                .iter()
                .zip(translations)
                .map(|(request, translated)| TranslationResult::new(translated, request))
                .collect());
        }

        // The web endpoint takes one job at a time.
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.translate_one(request, container, settings).await?);
        }
        Ok(results)
    }
}
