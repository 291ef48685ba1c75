/*!
 * Offline engine adapters: Argos and Marian/M2M/NLLB.
 *
 * Model invocation itself happens in a local translation server; these
 * adapters only speak its HTTP interface, falling back to the
 * deterministic stub when no server is configured. Marian advertises
 * native batching, so its batch call posts all segment texts at once.
 */

use async_trait::async_trait;

use crate::engines::http_api::HttpApiBackend;
use crate::errors::EngineError;
use crate::registry::EngineId;
use crate::translator::{
    EngineSettings, TranslationRequest, TranslationResult, TranslatorBackend, TranslatorContainer,
};

/// Default local translation server used when settings configure none.
const LOCAL_SERVER_URL: &str = "http://127.0.0.1:8760/translate";

/// Argos Translate behind the local server. Single-item calls only.
#[derive(Debug)]
pub struct ArgosBackend {
    inner: HttpApiBackend,
}

impl ArgosBackend {
    /// Adapter with the standard local server fallback.
    pub fn new() -> Self {
        Self {
            inner: HttpApiBackend::with_default_endpoint(EngineId::Argos, LOCAL_SERVER_URL),
        }
    }
}

impl Default for ArgosBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranslatorBackend for ArgosBackend {
    async fn translate_one(
        &self,
        request: &TranslationRequest,
        container: &TranslatorContainer,
        settings: &EngineSettings,
    ) -> Result<TranslationResult, EngineError> {
        self.inner.translate_one(request, container, settings).await
    }
}

/// Marian/M2M/NLLB behind the local server, with native batch calls.
#[derive(Debug)]
pub struct MarianBackend {
    inner: HttpApiBackend,
}

impl MarianBackend {
    /// Adapter with the standard local server fallback.
    pub fn new() -> Self {
        Self {
            inner: HttpApiBackend::with_default_endpoint(EngineId::MarianM2mNllb, LOCAL_SERVER_URL),
        }
    }
}

impl Default for MarianBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranslatorBackend for MarianBackend {
    async fn translate_one(
        &self,
        request: &TranslationRequest,
        container: &TranslatorContainer,
        settings: &EngineSettings,
    ) -> Result<TranslationResult, EngineError> {
        self.inner.translate_one(request, container, settings).await
    }

    async fn translate_many(
        &self,
        requests: &[TranslationRequest],
        container: &TranslatorContainer,
        settings: &EngineSettings,
    ) -> Result<Vec<TranslationResult>, EngineError> {
        self.inner.translate_many(requests, container, settings).await
    }
}
