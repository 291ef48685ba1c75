/*!
 * Concrete engine adapters behind the `TranslatorBackend` boundary.
 *
 * Each adapter turns a prepared request into one engine-native call:
 * - `http_api`: generic JSON POST client for configured MT/LLM endpoints
 * - `deepl`: DeepL API or web JSON-RPC scrape path
 * - `web`: Google/Yandex web client endpoints
 * - `offline`: Argos and Marian/M2M/NLLB local model servers
 *
 * The request/response shape of every engine stays inside its adapter;
 * the orchestration layers above only see `TranslationResult`s and the
 * error taxonomy.
 */

pub mod deepl;
pub mod http_api;
pub mod offline;
pub mod web;

use crate::errors::{EngineError, TranslationError};

/// Fold a rate-limiter gate failure back into the engine error space so
/// the failover layer can classify it.
pub(crate) fn map_wait_error(err: TranslationError) -> EngineError {
    match err {
        TranslationError::TextTooLong { length, max } => EngineError::TextTooLong { length, max },
        TranslationError::RateLimited { status_code, message } => {
            EngineError::RateLimited { status_code, message }
        }
        other => EngineError::RequestFailed(other.to_string()),
    }
}

/// Minimal entity decoding for web endpoints that return HTML-escaped
/// text.
pub(crate) fn decode_html_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
