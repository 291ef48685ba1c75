/*!
 * Unified catalog of OCR and translator engines.
 *
 * Engine identifiers are a closed set validated at startup: unknown ids
 * fail fast with `UnregisteredEngine` instead of silently falling back.
 * Legacy aliases (`yandex`, `openai`, `marianmt`) normalize to their
 * canonical ids. Each translator entry ties a descriptor to capability
 * defaults and a constructor; capabilities are copied per instance so
 * runtime mutation never leaks back into the registry.
 */

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::engines::deepl::DeeplBackend;
use crate::engines::http_api::HttpApiBackend;
use crate::engines::offline::{ArgosBackend, MarianBackend};
use crate::engines::web::{GoogleWebBackend, YandexWebBackend};
use crate::errors::TranslationError;
use crate::rate_limit::OrchestratorState;
use crate::translator::{EngineSettings, Translator, TranslatorCapabilities, TranslatorContainer};

/// What an engine does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// Text recognition
    Ocr,
    /// Text translation
    Translator,
}

/// Where an engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    /// Local models, no network required
    Offline,
    /// Remote HTTP API or web endpoint
    Cloud,
}

/// Canonical translator engine identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineId {
    /// DeepL (API or web endpoint)
    Deepl,
    /// Google Translate (API or web client endpoint)
    GoogleTranslate,
    /// Yandex Translate (API or web endpoint)
    YandexTranslate,
    /// Azure Translator
    AzureTranslate,
    /// OpenAI-style LLM endpoint
    OpenAiTranslate,
    /// Argos Translate local models
    Argos,
    /// Marian/M2M/NLLB local models
    MarianM2mNllb,
}

impl EngineId {
    /// Every registered translator engine.
    pub const ALL: [EngineId; 7] = [
        EngineId::Deepl,
        EngineId::GoogleTranslate,
        EngineId::YandexTranslate,
        EngineId::AzureTranslate,
        EngineId::OpenAiTranslate,
        EngineId::Argos,
        EngineId::MarianM2mNllb,
    ];

    /// Canonical string id.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineId::Deepl => "deepl",
            EngineId::GoogleTranslate => "google_translate",
            EngineId::YandexTranslate => "yandex_translate",
            EngineId::AzureTranslate => "azure_translate",
            EngineId::OpenAiTranslate => "openai_translate",
            EngineId::Argos => "argos",
            EngineId::MarianM2mNllb => "marian_m2m_nllb",
        }
    }

    /// Parse a raw id, accepting legacy aliases.
    pub fn parse(raw: &str) -> Option<EngineId> {
        match normalize_engine_id(raw) {
            "deepl" => Some(EngineId::Deepl),
            "google_translate" => Some(EngineId::GoogleTranslate),
            "yandex_translate" => Some(EngineId::YandexTranslate),
            "azure_translate" => Some(EngineId::AzureTranslate),
            "openai_translate" => Some(EngineId::OpenAiTranslate),
            "argos" => Some(EngineId::Argos),
            "marian_m2m_nllb" => Some(EngineId::MarianM2mNllb),
            _ => None,
        }
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineId {
    type Err = TranslationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        EngineId::parse(raw).ok_or_else(|| TranslationError::UnregisteredEngine(raw.to_string()))
    }
}

/// Map a raw engine id to its canonical form. Idempotent; unknown ids
/// pass through unchanged.
pub fn normalize_engine_id(raw: &str) -> &str {
    match raw {
        "yandex" => "yandex_translate",
        "openai" => "openai_translate",
        "marianmt" => "marian_m2m_nllb",
        other => other,
    }
}

/// Immutable catalog record for one engine.
#[derive(Debug, Clone)]
pub struct EngineDescriptor {
    /// Canonical id, globally unique after alias normalization
    pub id: &'static str,

    /// What the engine does
    pub kind: EngineKind,

    /// Where the engine runs
    pub mode: EngineMode,

    /// Human-readable name
    pub name: &'static str,

    /// Short description
    pub description: &'static str,

    /// Estimated on-disk size of offline models
    pub estimated_size_mb: Option<u32>,

    /// Whether an api key is mandatory
    pub requires_api_key: bool,

    /// Whether a custom endpoint is mandatory
    pub requires_endpoint: bool,

    /// Whether the api key can be omitted (scrape/limited mode)
    pub api_optional: bool,

    /// Whether an official API integration exists
    pub supports_api: bool,

    /// Whether a web-scrape (no-API) mode exists
    pub supports_scrape_mode: bool,
}

/// OCR engines, catalog metadata only. Recognition itself lives outside
/// the orchestration core.
pub static OCR_ENGINES: &[EngineDescriptor] = &[
    EngineDescriptor {
        id: "easyocr",
        kind: EngineKind::Ocr,
        mode: EngineMode::Offline,
        name: "EasyOCR",
        description: "Offline neural OCR with broad language coverage",
        estimated_size_mb: Some(300),
        requires_api_key: false,
        requires_endpoint: false,
        api_optional: false,
        supports_api: false,
        supports_scrape_mode: false,
    },
    EngineDescriptor {
        id: "paddleocr",
        kind: EngineKind::Ocr,
        mode: EngineMode::Offline,
        name: "PaddleOCR",
        description: "Offline OCR tuned for CJK scripts",
        estimated_size_mb: Some(400),
        requires_api_key: false,
        requires_endpoint: false,
        api_optional: false,
        supports_api: false,
        supports_scrape_mode: false,
    },
    EngineDescriptor {
        id: "tesseract",
        kind: EngineKind::Ocr,
        mode: EngineMode::Offline,
        name: "Tesseract",
        description: "Classic offline OCR engine",
        estimated_size_mb: Some(250),
        requires_api_key: false,
        requires_endpoint: false,
        api_optional: false,
        supports_api: false,
        supports_scrape_mode: false,
    },
    EngineDescriptor {
        id: "google_vision",
        kind: EngineKind::Ocr,
        mode: EngineMode::Cloud,
        name: "Google Vision",
        description: "Cloud OCR via the Google Vision API",
        estimated_size_mb: None,
        requires_api_key: true,
        requires_endpoint: false,
        api_optional: false,
        supports_api: true,
        supports_scrape_mode: false,
    },
    EngineDescriptor {
        id: "azure",
        kind: EngineKind::Ocr,
        mode: EngineMode::Cloud,
        name: "Azure Computer Vision",
        description: "Cloud OCR via Azure Computer Vision",
        estimated_size_mb: None,
        requires_api_key: true,
        requires_endpoint: true,
        api_optional: false,
        supports_api: true,
        supports_scrape_mode: false,
    },
];

/// Translator engines exposed by the orchestration core.
pub static TRANSLATOR_ENGINES: &[EngineDescriptor] = &[
    EngineDescriptor {
        id: "deepl",
        kind: EngineKind::Translator,
        mode: EngineMode::Cloud,
        name: "DeepL",
        description: "DeepL via web endpoint by default, official API optionally",
        estimated_size_mb: None,
        requires_api_key: true,
        requires_endpoint: false,
        api_optional: true,
        supports_api: true,
        supports_scrape_mode: true,
    },
    EngineDescriptor {
        id: "google_translate",
        kind: EngineKind::Translator,
        mode: EngineMode::Cloud,
        name: "Google Translate",
        description: "Google Translate web client endpoint or API",
        estimated_size_mb: None,
        requires_api_key: true,
        requires_endpoint: false,
        api_optional: true,
        supports_api: true,
        supports_scrape_mode: true,
    },
    EngineDescriptor {
        id: "yandex_translate",
        kind: EngineKind::Translator,
        mode: EngineMode::Cloud,
        name: "Yandex Translate",
        description: "Yandex Translate web endpoint or API",
        estimated_size_mb: None,
        requires_api_key: true,
        requires_endpoint: false,
        api_optional: true,
        supports_api: true,
        supports_scrape_mode: true,
    },
    EngineDescriptor {
        id: "azure_translate",
        kind: EngineKind::Translator,
        mode: EngineMode::Cloud,
        name: "Azure Translate",
        description: "Azure Translator cloud API",
        estimated_size_mb: None,
        requires_api_key: true,
        requires_endpoint: true,
        api_optional: false,
        supports_api: true,
        supports_scrape_mode: false,
    },
    EngineDescriptor {
        id: "openai_translate",
        kind: EngineKind::Translator,
        mode: EngineMode::Cloud,
        name: "OpenAI LLM",
        description: "LLM-based translation via an OpenAI-style endpoint",
        estimated_size_mb: None,
        requires_api_key: true,
        requires_endpoint: false,
        api_optional: false,
        supports_api: true,
        supports_scrape_mode: false,
    },
    EngineDescriptor {
        id: "argos",
        kind: EngineKind::Translator,
        mode: EngineMode::Offline,
        name: "Argos",
        description: "Offline Argos Translate models behind a local server",
        estimated_size_mb: Some(900),
        requires_api_key: false,
        requires_endpoint: false,
        api_optional: false,
        supports_api: false,
        supports_scrape_mode: false,
    },
    EngineDescriptor {
        id: "marian_m2m_nllb",
        kind: EngineKind::Translator,
        mode: EngineMode::Offline,
        name: "Marian/M2M/NLLB",
        description: "Offline seq2seq models behind a local server",
        estimated_size_mb: Some(2000),
        requires_api_key: false,
        requires_endpoint: false,
        api_optional: false,
        supports_api: false,
        supports_scrape_mode: false,
    },
];

/// All registered translator engine descriptors.
pub fn list_translator_engines() -> &'static [EngineDescriptor] {
    TRANSLATOR_ENGINES
}

static DESCRIPTOR_INDEX: Lazy<HashMap<&'static str, &'static EngineDescriptor>> =
    Lazy::new(|| {
        TRANSLATOR_ENGINES
            .iter()
            .chain(OCR_ENGINES.iter())
            .map(|d| (d.id, d))
            .collect()
    });

/// Descriptor for the given engine id (OCR or translator), if registered.
pub fn get_engine_descriptor(raw: &str) -> Option<&'static EngineDescriptor> {
    DESCRIPTOR_INDEX.get(normalize_engine_id(raw)).copied()
}

/// Capability defaults for batching/context limits, tuned per engine.
fn default_capabilities(engine_id: EngineId) -> TranslatorCapabilities {
    match engine_id {
        EngineId::Deepl => TranslatorCapabilities {
            supports_batch: true,
            max_batch_size: 50,
            max_chars_per_request: Some(4500),
            max_chars_total: None,
            context_window: 10,
            attempt_delay_ms: 700,
        },
        EngineId::GoogleTranslate => TranslatorCapabilities {
            supports_batch: true,
            max_batch_size: 20,
            max_chars_per_request: Some(4000),
            max_chars_total: None,
            context_window: 8,
            attempt_delay_ms: 500,
        },
        EngineId::YandexTranslate => TranslatorCapabilities {
            supports_batch: true,
            max_batch_size: 10,
            max_chars_per_request: Some(4500),
            max_chars_total: None,
            context_window: 8,
            attempt_delay_ms: 800,
        },
        EngineId::AzureTranslate => TranslatorCapabilities {
            supports_batch: true,
            max_batch_size: 25,
            max_chars_per_request: Some(9000),
            max_chars_total: None,
            context_window: 12,
            attempt_delay_ms: 700,
        },
        EngineId::OpenAiTranslate => TranslatorCapabilities {
            supports_batch: false,
            max_batch_size: 1,
            max_chars_per_request: Some(2500),
            max_chars_total: None,
            context_window: 16,
            attempt_delay_ms: 800,
        },
        EngineId::Argos => TranslatorCapabilities {
            supports_batch: false,
            max_batch_size: 1,
            max_chars_per_request: Some(1200),
            max_chars_total: None,
            context_window: 6,
            attempt_delay_ms: 500,
        },
        EngineId::MarianM2mNllb => TranslatorCapabilities {
            supports_batch: true,
            max_batch_size: 8,
            max_chars_per_request: Some(2200),
            max_chars_total: None,
            context_window: 8,
            attempt_delay_ms: 600,
        },
    }
}

/// Capability defaults for the given raw id. Unregistered ids get the
/// conservative single-item default; this lookup never fails.
pub fn get_translator_capabilities(raw: &str) -> TranslatorCapabilities {
    match EngineId::parse(raw) {
        Some(id) => default_capabilities(id),
        None => TranslatorCapabilities::default(),
    }
}

/// Containers derived from settings: one primary, plus a backup-credential
/// container when `api_key_backup` is configured.
fn containers_from_settings(name: &str, settings: &EngineSettings) -> Vec<TranslatorContainer> {
    let mut containers = vec![TranslatorContainer::primary(name)];
    if let Some(backup) = settings.get("api_key_backup").filter(|v| !v.trim().is_empty()) {
        containers.push(
            TranslatorContainer::new(format!("{name} (backup key)"))
                .with_extra("api_key", backup.trim()),
        );
    }
    containers
}

/// Instantiate a translator by id, injecting a copy of the capability
/// defaults and the shared orchestrator state.
pub fn create_translator(
    raw: &str,
    settings: &EngineSettings,
    state: &Arc<OrchestratorState>,
) -> Result<Translator, TranslationError> {
    let engine_id = EngineId::parse(raw)
        .ok_or_else(|| TranslationError::UnregisteredEngine(raw.to_string()))?;
    let descriptor = get_engine_descriptor(engine_id.as_str())
        .ok_or_else(|| TranslationError::UnregisteredEngine(raw.to_string()))?;
    let capabilities = default_capabilities(engine_id);
    let containers = containers_from_settings(descriptor.name, settings);

    let backend: Box<dyn crate::translator::TranslatorBackend> = match engine_id {
        EngineId::Deepl => Box::new(DeeplBackend::new(Arc::clone(state))),
        EngineId::GoogleTranslate => Box::new(GoogleWebBackend::new(Arc::clone(state))),
        EngineId::YandexTranslate => Box::new(YandexWebBackend::new(Arc::clone(state))),
        EngineId::AzureTranslate => Box::new(HttpApiBackend::new(engine_id)),
        EngineId::OpenAiTranslate => Box::new(HttpApiBackend::new(engine_id)),
        EngineId::Argos => Box::new(ArgosBackend::new()),
        EngineId::MarianM2mNllb => Box::new(MarianBackend::new()),
    };

    Ok(Translator::with_containers(
        engine_id,
        descriptor.name,
        capabilities,
        settings.clone(),
        backend,
        containers,
    ))
}
