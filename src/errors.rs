/*!
 * Error types for the mangatl orchestration core.
 *
 * Two layers, mirroring who raises what: `EngineError` is produced by
 * concrete engine adapters at the call boundary, `TranslationError` is the
 * orchestration-level taxonomy surfaced to callers of the translation
 * service. Rate-limit signals are explicit variants rather than a separate
 * exception hierarchy, so callers can pattern-match on them.
 */

use thiserror::Error;

/// Errors raised by concrete engine adapters (HTTP APIs, web endpoints,
/// local model servers).
#[derive(Error, Debug)]
pub enum EngineError {
    /// The request never produced a usable response.
    #[error("engine request failed: {0}")]
    RequestFailed(String),

    /// The engine answered but the response shape was not understood.
    #[error("failed to parse engine response: {0}")]
    ParseError(String),

    /// The engine answered with an explicit error status.
    #[error("engine responded with error: {status_code} - {message}")]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Error message from the engine
        message: String,
    },

    /// Rate-limit signal. Must propagate to the service layer for
    /// slow-mode activation instead of being retried in place.
    #[error("rate limited: {message}")]
    RateLimited {
        /// HTTP status code, when the signal came from an HTTP response
        status_code: Option<u16>,
        /// Short cause string
        message: String,
    },

    /// Input exceeds the per-request character budget of the engine's
    /// limited mode. Caller-correctable; never retried.
    #[error("text of {length} chars exceeds the {max} char limit")]
    TextTooLong {
        /// Character count of the offending text
        length: usize,
        /// Configured per-request maximum
        max: usize,
    },
}

impl EngineError {
    /// Classify an HTTP error status. 429 and 403 are treated as
    /// rate-limit signals, everything else as a plain API error.
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status_code == 429 || status_code == 403 {
            EngineError::RateLimited { status_code: Some(status_code), message }
        } else {
            EngineError::Api { status_code, message }
        }
    }

    /// HTTP status attached to this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            EngineError::Api { status_code, .. } => Some(*status_code),
            EngineError::RateLimited { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

/// Errors surfaced by the translation orchestration layer.
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The requested engine id has no registry entry. Fatal; the caller
    /// must choose a valid engine.
    #[error("translator '{0}' is not registered")]
    UnregisteredEngine(String),

    /// Input too large for the engine's limited mode. Shrink or re-batch.
    #[error("text of {length} chars exceeds the {max} char limit")]
    TextTooLong {
        /// Character count of the offending text
        length: usize,
        /// Configured per-request maximum
        max: usize,
    },

    /// Transient rate-limit signal. The service absorbs exactly one of
    /// these per logical call via backoff-and-retry.
    #[error("rate limited: {message}")]
    RateLimited {
        /// HTTP status code, when known
        status_code: Option<u16>,
        /// Short cause string
        message: String,
    },

    /// Every container of the translator was exhausted or blocked.
    #[error("no available translator containers for {engine}")]
    NoAvailableBackend {
        /// Display name of the engine
        engine: String,
        /// Last underlying engine failure, if any attempt was made
        #[source]
        source: Option<EngineError>,
    },

    /// The engine adapter broke the order/cardinality contract.
    #[error("translator returned {actual} results for {expected} requests")]
    ResultCountMismatch {
        /// Number of requests sent
        expected: usize,
        /// Number of results received
        actual: usize,
    },

    /// Knowledge base could not be read. Always absorbed by the service.
    #[error("knowledge base error: {0}")]
    Knowledge(String),

    /// Terminal translation failure for this request.
    #[error("translation failed: {0}")]
    Failed(String),
}

impl From<EngineError> for TranslationError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::RateLimited { status_code, message } => {
                TranslationError::RateLimited { status_code, message }
            }
            EngineError::TextTooLong { length, max } => {
                TranslationError::TextTooLong { length, max }
            }
            other => TranslationError::Failed(other.to_string()),
        }
    }
}
