/*!
 * # mangatl - Translation orchestration for manga pages
 *
 * A Rust library that coordinates machine translation engines for manga
 * text blocks: it knows which engines exist, paces the ones that scrape
 * web endpoints, fails over between account containers, batches blocks
 * within engine limits and applies per-title glossaries.
 *
 * ## Features
 *
 * - Static registry of OCR and translation engines with per-engine
 *   capability defaults
 * - Container failover: rotate between accounts/endpoints of one engine
 *   when calls fail, with automatic unblocking after a timeout
 * - Rate limiting with slow mode: limited (no-API) engines back off
 *   after 429/403 signals and self-heal after five minutes
 * - Order-preserving batch translation within declared size and
 *   character budgets
 * - Per-title knowledge bases (characters, glossary, style) feeding
 *   prompt payloads and post-translation name fixes
 * - Rolling translation context shared across pages of a chapter
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `registry`: Engine catalogue and translator construction
 * - `translator`: Core translator abstraction and container failover
 * - `engines`: Concrete engine adapters (HTTP APIs, web endpoints,
 *   local model servers)
 * - `rate_limit`: Per-engine throttles, slow mode and backoff penalties
 * - `service`: Top-level translation service (batching, retry,
 *   glossary post-processing)
 * - `knowledge`: Per-title knowledge bases loaded from YAML
 * - `context`: Rolling (original, translated) context history
 * - `project`: Title and text block data model
 * - `errors`: Custom error types for the library
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod context;
pub mod engines;
pub mod errors;
pub mod knowledge;
pub mod project;
pub mod rate_limit;
pub mod registry;
pub mod service;
pub mod translator;

// Re-export main types for easier usage
pub use context::{ContextEntry, ContextManager};
pub use errors::{EngineError, TranslationError};
pub use knowledge::{KnowledgeSource, TitleKnowledge, YamlKnowledgeBase};
pub use project::{TextBlock, TitleProject};
pub use rate_limit::{OrchestratorState, RateLimitConfig};
pub use registry::{EngineId, create_translator, get_translator_capabilities, normalize_engine_id};
pub use service::{TranslateOptions, TranslationService};
pub use translator::{
    TranslationRequest, TranslationResult, Translator, TranslatorBackend, TranslatorCapabilities,
};
