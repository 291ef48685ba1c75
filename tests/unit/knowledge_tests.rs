/*!
 * Tests for YAML knowledge base loading
 */

use anyhow::Result;

use mangatl::knowledge::{KnowledgeSource, TitleKnowledge, YamlKnowledgeBase};

use crate::common::{create_temp_dir, create_test_file, create_test_knowledge, test_project};

#[test]
fn test_load_withMetaOnly_shouldDefaultOptionalSections() -> Result<()> {
    let dir = create_temp_dir()?;
    create_test_knowledge(dir.path(), "one-piece", None)?;

    let base = YamlKnowledgeBase::new(dir.path());
    let knowledge = base.load("one-piece")?;

    assert_eq!(knowledge.meta.id, "one-piece");
    assert_eq!(knowledge.meta.display_name, "Test Title");
    assert!(knowledge.characters.is_empty());
    assert!(knowledge.terms.is_empty());
    assert!(knowledge.style.is_none());
    Ok(())
}

#[test]
fn test_load_withAllSections_shouldParseEverything() -> Result<()> {
    let dir = create_temp_dir()?;
    create_test_knowledge(
        dir.path(),
        "slime",
        Some("- source: 転生\n  target: reincarnation\n  term_type: concept\n"),
    )?;
    let folder = dir.path().join("slime");
    create_test_file(
        &folder,
        "characters.yaml",
        "- id: rimuru\n  original_names: [リムル]\n  display_name: Rimuru\n  gender: other\n",
    )?;
    create_test_file(&folder, "style.yaml", "tone: casual\nhonorifics_policy: keep\n")?;

    let base = YamlKnowledgeBase::new(dir.path());
    let knowledge = base.load("slime")?;

    assert_eq!(knowledge.terms.len(), 1);
    assert_eq!(knowledge.terms[0].target, "reincarnation");
    assert_eq!(knowledge.characters.len(), 1);
    assert_eq!(knowledge.characters[0].display_name, "Rimuru");
    let style = knowledge.style.unwrap();
    assert_eq!(style.tone.as_deref(), Some("casual"));
    assert_eq!(style.honorifics_policy.as_deref(), Some("keep"));
    Ok(())
}

#[test]
fn test_load_withMissingMeta_shouldFail() -> Result<()> {
    let dir = create_temp_dir()?;
    let base = YamlKnowledgeBase::new(dir.path());
    assert!(base.load("never-created").is_err());
    Ok(())
}

#[test]
fn test_load_withMalformedYaml_shouldFail() -> Result<()> {
    let dir = create_temp_dir()?;
    let folder = dir.path().join("broken");
    std::fs::create_dir_all(&folder)?;
    create_test_file(&folder, "meta.yaml", "id: [unclosed\n")?;

    let base = YamlKnowledgeBase::new(dir.path());
    assert!(base.load("broken").is_err());
    Ok(())
}

#[test]
fn test_fallback_fromProject_shouldCarryProjectFields() {
    let project = test_project("my-title");
    let knowledge = TitleKnowledge::fallback(&project);

    assert_eq!(knowledge.meta.id, "my-title");
    assert_eq!(knowledge.meta.display_name, "Test Title");
    assert_eq!(knowledge.meta.original_language, "ja");
    assert_eq!(knowledge.meta.target_language, "en");
    assert!(knowledge.characters.is_empty());
    assert!(knowledge.terms.is_empty());
}
