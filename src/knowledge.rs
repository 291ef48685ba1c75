/*!
 * Title knowledge base: characters, glossary terms and style settings.
 *
 * A title's knowledge lives in a folder of YAML files
 * (`meta.yaml`, `characters.yaml`, `glossary.yaml`, `style.yaml`).
 * The translation service tolerates a missing or broken knowledge base by
 * substituting an empty one, so loading never blocks translation.
 */

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::TranslationError;
use crate::project::TitleProject;

/// General title metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleMeta {
    /// Stable title identifier (folder name in the knowledge base)
    pub id: String,

    /// Human-readable title name
    pub display_name: String,

    /// Source language code
    #[serde(default)]
    pub original_language: String,

    /// Target language code
    #[serde(default)]
    pub target_language: String,

    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,

    /// Translator notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// One character of the title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    /// Stable character identifier
    #[serde(default)]
    pub id: String,

    /// Name spellings as they appear in the source text
    #[serde(default)]
    pub original_names: Vec<String>,

    /// Canonical name used in the translation
    #[serde(default)]
    pub display_name: String,

    /// Character gender, when relevant for pronouns
    #[serde(default)]
    pub gender: Option<String>,

    /// Narrative role (protagonist, rival, ...)
    #[serde(default)]
    pub role: Option<String>,

    /// Preferred pronouns in the target language
    #[serde(default)]
    pub pronouns: Option<Vec<String>>,

    /// Speech register hints (formal, archaic, slang, ...)
    #[serde(default)]
    pub speech_style: Option<String>,

    /// Translator notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// A glossary term or fixed expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Term {
    /// Source-language form
    pub source: String,

    /// Target-language form
    pub target: String,

    /// Term category (technique, place, honorific, ...)
    #[serde(default)]
    pub term_type: Option<String>,

    /// Translator notes
    #[serde(default)]
    pub notes: Option<String>,

    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Per-title translation style settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleConfig {
    /// Overall tone (casual, dramatic, ...)
    #[serde(default)]
    pub tone: Option<String>,

    /// How to handle honorifics (keep, drop, localize)
    #[serde(default)]
    pub honorifics_policy: Option<String>,

    /// How to handle sound effects
    #[serde(default)]
    pub sfx_policy: Option<String>,

    /// Punctuation conventions
    #[serde(default)]
    pub punctuation_style: Option<String>,

    /// Casing conventions
    #[serde(default)]
    pub casing_style: Option<String>,

    /// Anything engine-specific
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Combined knowledge base for one title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleKnowledge {
    /// Title metadata
    pub meta: TitleMeta,

    /// Known characters
    #[serde(default)]
    pub characters: Vec<Character>,

    /// Glossary terms
    #[serde(default)]
    pub terms: Vec<Term>,

    /// Style settings
    #[serde(default)]
    pub style: Option<StyleConfig>,
}

impl TitleKnowledge {
    /// Empty knowledge derived from project fields alone, used when the
    /// knowledge base is missing or malformed.
    pub fn fallback(project: &TitleProject) -> Self {
        Self {
            meta: TitleMeta {
                id: project.title_id.clone(),
                display_name: project.title_name.clone(),
                original_language: project.original_language.clone(),
                target_language: project.target_language.clone(),
                description: None,
                notes: None,
            },
            characters: Vec::new(),
            terms: Vec::new(),
            style: None,
        }
    }
}

/// Source of title knowledge. The file layout below is one
/// implementation; tests and embedders can provide their own.
pub trait KnowledgeSource: Send + Sync {
    /// Load the knowledge base for `title_id`.
    fn load(&self, title_id: &str) -> Result<TitleKnowledge, TranslationError>;
}

/// File-based knowledge base: one folder per title under `base_dir`.
///
/// `meta.yaml` is required; `characters.yaml`, `glossary.yaml` and
/// `style.yaml` are optional and default to empty.
#[derive(Debug, Clone)]
pub struct YamlKnowledgeBase {
    base_dir: PathBuf,
}

impl YamlKnowledgeBase {
    /// Create a knowledge base rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    /// Root directory of the knowledge base.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn read_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, TranslationError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| TranslationError::Knowledge(format!("{}: {}", path.display(), e)))?;
        serde_yaml::from_str(&raw)
            .map_err(|e| TranslationError::Knowledge(format!("{}: {}", path.display(), e)))
    }

    fn read_yaml_or<T: for<'de> Deserialize<'de>>(
        path: &Path,
        default: T,
    ) -> Result<T, TranslationError> {
        if !path.is_file() {
            return Ok(default);
        }
        Self::read_yaml(path)
    }
}

impl KnowledgeSource for YamlKnowledgeBase {
    fn load(&self, title_id: &str) -> Result<TitleKnowledge, TranslationError> {
        let folder = self.base_dir.join(title_id);
        let meta: TitleMeta = Self::read_yaml(&folder.join("meta.yaml"))?;
        let characters: Vec<Character> =
            Self::read_yaml_or(&folder.join("characters.yaml"), Vec::new())?;
        let terms: Vec<Term> = Self::read_yaml_or(&folder.join("glossary.yaml"), Vec::new())?;
        let style: Option<StyleConfig> = Self::read_yaml_or(&folder.join("style.yaml"), None)?;

        debug!(
            "Loaded knowledge for '{}': {} characters, {} terms",
            title_id,
            characters.len(),
            terms.len()
        );
        Ok(TitleKnowledge { meta, characters, terms, style })
    }
}
