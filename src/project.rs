/*!
 * Read-only project and text block models.
 *
 * These mirror the structures owned by the page editor and session
 * persistence layers; the orchestration core only reads project fields
 * and writes `translated_text` on blocks.
 */

use serde::{Deserialize, Serialize};

/// Title-level project settings the service reads for translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleProject {
    /// Stable title identifier
    pub title_id: String,

    /// Human-readable title name
    pub title_name: String,

    /// Source language code
    pub original_language: String,

    /// Target language code
    pub target_language: String,

    /// Content type hint (manga, manhwa, comic, ...)
    #[serde(default)]
    pub content_type: Option<String>,

    /// Color mode hint (bw, color)
    #[serde(default)]
    pub color_mode: Option<String>,
}

/// One recognized text region on a page. `translated_text` is updated in
/// place by `TranslationService::translate_blocks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    /// Block identifier within its page session
    pub id: String,

    /// Recognized source text
    #[serde(default)]
    pub original_text: String,

    /// Translation output
    #[serde(default)]
    pub translated_text: String,

    /// Block kind hint (dialogue, sfx, narration, ...)
    #[serde(default)]
    pub block_type: Option<String>,
}

impl TextBlock {
    /// Convenience constructor for an untranslated block.
    pub fn new(id: impl Into<String>, original_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            original_text: original_text.into(),
            translated_text: String::new(),
            block_type: None,
        }
    }
}
