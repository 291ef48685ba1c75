/*!
 * Common test utilities for the mangatl test suite
 */

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;

use mangatl::project::{TextBlock, TitleProject};

// Re-export the mock backends module
pub mod mock_backends;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a minimal knowledge base folder for `title_id` with a
/// meta.yaml and an optional glossary
pub fn create_test_knowledge(base_dir: &Path, title_id: &str, glossary: Option<&str>) -> Result<()> {
    let folder = base_dir.join(title_id);
    fs::create_dir_all(&folder)?;
    let meta = format!(
        "id: {}\ndisplay_name: Test Title\noriginal_language: ja\ntarget_language: en\n",
        title_id
    );
    fs::write(folder.join("meta.yaml"), meta)?;
    if let Some(glossary) = glossary {
        fs::write(folder.join("glossary.yaml"), glossary)?;
    }
    Ok(())
}

/// A test project translating Japanese to English
pub fn test_project(title_id: &str) -> TitleProject {
    TitleProject {
        title_id: title_id.to_string(),
        title_name: "Test Title".to_string(),
        original_language: "ja".to_string(),
        target_language: "en".to_string(),
        content_type: Some("manga".to_string()),
        color_mode: None,
    }
}

/// Text blocks with sequential ids for the given source texts
pub fn test_blocks(texts: &[&str]) -> Vec<TextBlock> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| TextBlock::new(format!("b{}", i + 1), *text))
        .collect()
}
