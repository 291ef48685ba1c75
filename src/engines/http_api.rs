/*!
 * Generic HTTP MT/LLM client and the plain API backend built on it.
 *
 * The client posts the structured prompt payload to a configured endpoint
 * and extracts a translated string from the common response shapes
 * (`translation` / `translated_text` / `text` / `result`, or a plain text
 * body). Without an endpoint it falls back to a deterministic offline
 * stub, which keeps the orchestration layers testable end to end.
 */

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde_json::{Value, json};
use url::Url;

use crate::errors::EngineError;
use crate::registry::EngineId;
use crate::translator::{
    EngineSettings, TranslationRequest, TranslationResult, TranslatorBackend, TranslatorContainer,
};

/// Request timeout applied to every engine call.
const CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Response keys probed for the translated string, in order.
const TRANSLATION_KEYS: [&str; 4] = ["translation", "translated_text", "text", "result"];

/// Effective api key for a call: a container-level override wins over the
/// engine settings.
pub(crate) fn effective_api_key<'a>(
    container: &'a TranslatorContainer,
    settings: &'a EngineSettings,
) -> Option<&'a str> {
    container
        .extra
        .get("api_key")
        .or_else(|| settings.get("api_key"))
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
}

/// Configured endpoint, if any.
pub(crate) fn configured_endpoint(settings: &EngineSettings) -> Option<&str> {
    settings.get("endpoint").map(|e| e.trim()).filter(|e| !e.is_empty())
}

/// Thin JSON HTTP client shared by the engine adapters.
#[derive(Debug, Clone)]
pub struct MtClient {
    http: reqwest::Client,
}

impl Default for MtClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MtClient {
    /// Client with the standard call timeout.
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(CALL_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { http }
    }

    /// POST a JSON payload and return the parsed response body. Non-JSON
    /// bodies come back as a JSON string value.
    pub async fn post_json(
        &self,
        url: &str,
        payload: &Value,
        headers: &[(&str, String)],
    ) -> Result<Value, EngineError> {
        let url = Url::parse(url)
            .map_err(|e| EngineError::RequestFailed(format!("invalid endpoint '{url}': {e}")))?;

        let mut request = self.http.post(url).json(payload);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::RequestFailed(e.to_string()))?;
        Self::read_body(response).await
    }

    /// GET a URL and return the parsed response body.
    pub async fn get_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
    ) -> Result<Value, EngineError> {
        let url = Url::parse(url)
            .map_err(|e| EngineError::RequestFailed(format!("invalid endpoint '{url}': {e}")))?;

        let mut request = self.http.get(url).header("User-Agent", "Mozilla/5.0");
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::RequestFailed(e.to_string()))?;
        Self::read_body(response).await
    }

    async fn read_body(response: reqwest::Response) -> Result<Value, EngineError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::RequestFailed(e.to_string()))?;
        if !status.is_success() {
            return Err(EngineError::from_status(status.as_u16(), body));
        }
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }

    /// Call a configured MT/LLM endpoint with one request, or produce the
    /// deterministic offline stub when no endpoint is set.
    pub async fn call(
        &self,
        request: &TranslationRequest,
        engine_id: EngineId,
        api_key: Option<&str>,
        endpoint: Option<&str>,
    ) -> Result<String, EngineError> {
        let text = request.text.as_str();
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let Some(endpoint) = endpoint else {
            return Ok(stub_translation(engine_id, request));
        };

        let payload = json!({
            "engine_id": engine_id.as_str(),
            "text": text,
            "src_lang": request.src_lang,
            "dst_lang": request.dst_lang,
            "prompt": request.prompt,
        });
        let response = self
            .post_json(endpoint, &payload, &auth_headers(engine_id, api_key))
            .await?;
        extract_translation(&response)
            .ok_or_else(|| EngineError::ParseError(format!("unexpected response from {endpoint}")))
    }

    /// Call a configured endpoint with several requests in one POST.
    /// Expects a `translations` array (or a bare array) in response.
    pub async fn call_many(
        &self,
        requests: &[TranslationRequest],
        engine_id: EngineId,
        api_key: Option<&str>,
        endpoint: Option<&str>,
    ) -> Result<Vec<String>, EngineError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let Some(endpoint) = endpoint else {
            return Ok(requests
                .iter()
                .map(|r| stub_translation(engine_id, r))
                .collect());
        };

        let first = &requests[0];
        let payload = json!({
            "engine_id": engine_id.as_str(),
            "src_lang": first.src_lang,
            "dst_lang": first.dst_lang,
            "texts": requests.iter().map(|r| r.text.as_str()).collect::<Vec<_>>(),
            "prompts": requests.iter().map(|r| &r.prompt).collect::<Vec<_>>(),
        });
        let response = self
            .post_json(endpoint, &payload, &auth_headers(engine_id, api_key))
            .await?;

        let items = response
            .get("translations")
            .and_then(Value::as_array)
            .or_else(|| response.as_array())
            .ok_or_else(|| {
                EngineError::ParseError(format!("unexpected batch response from {endpoint}"))
            })?;
        let translations: Vec<String> = items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<_>>()
            .ok_or_else(|| {
                EngineError::ParseError("batch response contained non-string items".to_string())
            })?;
        if translations.len() != requests.len() {
            return Err(EngineError::ParseError(format!(
                "batch response had {} items for {} requests",
                translations.len(),
                requests.len()
            )));
        }
        Ok(translations)
    }
}

fn auth_headers(engine_id: EngineId, api_key: Option<&str>) -> Vec<(&'static str, String)> {
    let mut headers = vec![("X-Engine-Id", engine_id.as_str().to_string())];
    if let Some(key) = api_key {
        headers.push(("Authorization", format!("Bearer {key}")));
        headers.push(("X-API-Key", key.to_string()));
    }
    headers
}

fn stub_translation(engine_id: EngineId, request: &TranslationRequest) -> String {
    debug!("{}: no endpoint configured, using offline stub", engine_id);
    format!(
        "[{} {}->{}] {}",
        engine_id, request.src_lang, request.dst_lang, request.text
    )
}

fn extract_translation(response: &Value) -> Option<String> {
    if let Value::Object(map) = response {
        for key in TRANSLATION_KEYS {
            if let Some(value) = map.get(key) {
                return Some(match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                });
            }
        }
        return None;
    }
    response.as_str().map(str::to_string)
}

/// Plain HTTP API backend: posts the prompt payload to the configured
/// endpoint. Used as-is by Azure and OpenAI-style engines and wrapped by
/// the offline adapters.
#[derive(Debug)]
pub struct HttpApiBackend {
    engine_id: EngineId,
    client: MtClient,
    default_endpoint: Option<String>,
}

impl HttpApiBackend {
    /// Backend for the given engine with no implicit endpoint.
    pub fn new(engine_id: EngineId) -> Self {
        Self { engine_id, client: MtClient::new(), default_endpoint: None }
    }

    /// Backend that falls back to `endpoint` when settings configure none.
    pub fn with_default_endpoint(engine_id: EngineId, endpoint: impl Into<String>) -> Self {
        Self {
            engine_id,
            client: MtClient::new(),
            default_endpoint: Some(endpoint.into()),
        }
    }

    fn endpoint<'a>(&'a self, settings: &'a EngineSettings) -> Option<&'a str> {
        configured_endpoint(settings).or(self.default_endpoint.as_deref())
    }
}

#[async_trait]
impl TranslatorBackend for HttpApiBackend {
    async fn translate_one(
        &self,
        request: &TranslationRequest,
        container: &TranslatorContainer,
        settings: &EngineSettings,
    ) -> Result<TranslationResult, EngineError> {
        let translated = self
            .client
            .call(
                request,
                self.engine_id,
                effective_api_key(container, settings),
                self.endpoint(settings),
            )
            .await?;
        Ok(TranslationResult::new(translated, request))
    }

    async fn translate_many(
        &self,
        requests: &[TranslationRequest],
        container: &TranslatorContainer,
        settings: &EngineSettings,
    ) -> Result<Vec<TranslationResult>, EngineError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let translations = self
            .client
            .call_many(
                requests,
                self.engine_id,
                effective_api_key(container, settings),
                self.endpoint(settings),
            )
            .await?;
        Ok(requests
            .iter()
            .zip(translations)
            .map(|(request, translated)| TranslationResult::new(translated, request))
            .collect())
    }
}
