/*!
 * Google and Yandex adapters using the lightweight web client endpoints
 * in limited mode, with the configured API as an opt-in.
 *
 * Both limited paths are paced by the per-engine rate limiter; failures
 * are registered with the backoff state and surface as the rate-limit
 * signal, same as the DeepL web path.
 */

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::engines::http_api::{MtClient, configured_endpoint, effective_api_key};
use crate::engines::{decode_html_entities, map_wait_error};
use crate::errors::EngineError;
use crate::rate_limit::OrchestratorState;
use crate::registry::EngineId;
use crate::translator::{
    EngineSettings, TranslationRequest, TranslationResult, TranslatorBackend, TranslatorContainer,
};

fn use_api(settings: &EngineSettings) -> bool {
    settings.get("use_api").is_some_and(|v| v == "true" || v == "1")
}

fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.as_bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(*byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Google Translate via the `translate.googleapis.com` web client
/// endpoint, or a configured API endpoint when `use_api` is set.
#[derive(Debug)]
pub struct GoogleWebBackend {
    client: MtClient,
    state: Arc<OrchestratorState>,
}

impl GoogleWebBackend {
    /// Backend sharing the orchestrator's rate-limit state.
    pub fn new(state: Arc<OrchestratorState>) -> Self {
        Self { client: MtClient::new(), state }
    }

    async fn translate_web(
        &self,
        text: &str,
        src_lang: &str,
        dst_lang: &str,
    ) -> Result<String, EngineError> {
        let url = format!(
            "https://translate.googleapis.com/translate_a/single?client=gtx&sl={}&tl={}&dt=t&q={}",
            urlencode(src_lang),
            urlencode(dst_lang),
            urlencode(text),
        );
        let data = self.client.get_json(&url, &[]).await?;

        // data[0] is a list of [translated, original, ...] chunks.
        let chunks = data
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| EngineError::ParseError("unexpected Google response".to_string()))?;
        let translated: String = chunks
            .iter()
            .filter_map(|chunk| chunk.get(0).and_then(Value::as_str))
            .collect();
        Ok(decode_html_entities(&translated))
    }
}

#[async_trait]
impl TranslatorBackend for GoogleWebBackend {
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
        if use_api(settings) && (endpoint.is_some() || api_key.is_some()) {
            let translated = self
                .client
                .call(request, EngineId::GoogleTranslate, api_key, endpoint)
                .await?;
            return Ok(TranslationResult::new(translated, request));
        }

        let engine = EngineId::GoogleTranslate;
        self.state
            .wait_or_raise(engine, request.text.chars().count())
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
                self.state.register_backoff_failure(engine, status_code, &message);
                Err(EngineError::RateLimited { status_code, message })
            }
        }
    }
}

/// Yandex Translate via the non-official web endpoint, or a configured
/// API endpoint when `use_api` is set.
#[derive(Debug)]
pub struct YandexWebBackend {
    client: MtClient,
    state: Arc<OrchestratorState>,
}

impl YandexWebBackend {
    /// Backend sharing the orchestrator's rate-limit state.
    pub fn new(state: Arc<OrchestratorState>) -> Self {
        Self { client: MtClient::new(), state }
    }

    async fn translate_web(
        &self,
        text: &str,
        src_lang: &str,
        dst_lang: &str,
    ) -> Result<String, EngineError> {
        let url = format!(
            "https://translate.yandex.net/api/v1/tr.json/translate?text={}&lang={}-{}&srv=tr-text",
            urlencode(text),
            urlencode(src_lang),
            urlencode(dst_lang),
        );
        let data = self.client.get_json(&url, &[]).await?;
        let translated = data
            .pointer("/text/0")
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::ParseError("unexpected Yandex response".to_string()))?;
        Ok(decode_html_entities(translated))
    }
}

#[async_trait]
impl TranslatorBackend for YandexWebBackend {
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
        if use_api(settings) && (endpoint.is_some() || api_key.is_some()) {
            let translated = self
                .client
                .call(request, EngineId::YandexTranslate, api_key, endpoint)
                .await?;
            return Ok(TranslationResult::new(translated, request));
        }

        let engine = EngineId::YandexTranslate;
        self.state
            .wait_or_raise(engine, request.text.chars().count())
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
                self.state.register_backoff_failure(engine, status_code, &message);
                Err(EngineError::RateLimited { status_code, message })
            }
        }
    }
}
