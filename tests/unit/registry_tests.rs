/*!
 * Tests for engine registry lookups and translator construction
 */

use std::sync::Arc;

use mangatl::rate_limit::OrchestratorState;
use mangatl::registry::{
    EngineId, create_translator, get_engine_descriptor, get_translator_capabilities,
    list_translator_engines,
};
use mangatl::translator::EngineSettings;

#[test]
fn test_list_translator_engines_shouldExposeEveryCanonicalId() {
    let ids: Vec<&str> = list_translator_engines().iter().map(|d| d.id).collect();
    for engine in EngineId::ALL {
        assert!(ids.contains(&engine.as_str()), "missing {}", engine);
    }
}

#[test]
fn test_get_engine_descriptor_withAlias_shouldResolve() {
    let descriptor = get_engine_descriptor("yandex").unwrap();
    assert_eq!(descriptor.id, "yandex_translate");

    assert!(get_engine_descriptor("no_such_engine").is_none());
}

#[test]
fn test_capabilities_areCopiedPerInstance() {
    let a = get_translator_capabilities("deepl");
    let b = get_translator_capabilities("deepl");
    assert_eq!(a, b);
    assert!(a.supports_batch);
    assert_eq!(a.max_batch_size, 50);
}

#[test]
fn test_create_translator_withUnknownId_shouldFail() {
    let state = Arc::new(OrchestratorState::new());
    let result = create_translator("no_such_engine", &EngineSettings::new(), &state);
    assert!(result.is_err());
}

#[test]
fn test_create_translator_withDefaultSettings_shouldHaveOnePrimaryContainer() {
    let state = Arc::new(OrchestratorState::new());
    let translator = create_translator("deepl", &EngineSettings::new(), &state).unwrap();

    let containers = translator.containers();
    assert_eq!(containers.len(), 1);
    assert!(containers[0].is_primary);
    assert_eq!(translator.engine_id(), EngineId::Deepl);
}

#[test]
fn test_create_translator_withBackupKey_shouldAddBackupContainer() {
    let state = Arc::new(OrchestratorState::new());
    let mut settings = EngineSettings::new();
    settings.insert("api_key".to_string(), "primary-key".to_string());
    settings.insert("api_key_backup".to_string(), "backup-key".to_string());

    let translator = create_translator("openai", &settings, &state).unwrap();
    let containers = translator.containers();
    assert_eq!(containers.len(), 2);
    assert!(containers[0].is_primary);
    assert!(!containers[1].is_primary);
    assert_eq!(containers[1].extra.get("api_key").map(String::as_str), Some("backup-key"));
}

#[test]
fn test_create_translator_withBlankBackupKey_shouldKeepSingleContainer() {
    let state = Arc::new(OrchestratorState::new());
    let mut settings = EngineSettings::new();
    settings.insert("api_key_backup".to_string(), "   ".to_string());

    let translator = create_translator("deepl", &settings, &state).unwrap();
    assert_eq!(translator.containers().len(), 1);
}
