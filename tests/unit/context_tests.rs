/*!
 * Tests for the rolling translation context
 */

use mangatl::context::{ContextEntry, ContextManager, DEFAULT_CONTEXT_CAPACITY};

#[test]
fn test_add_segment_beyondCapacity_shouldKeepMostRecentOldestFirst() {
    let mut manager = ContextManager::new(DEFAULT_CONTEXT_CAPACITY);
    for i in 0..60 {
        manager.add_segment(&format!("src {}", i), &format!("dst {}", i));
    }

    assert_eq!(manager.len(), 50);
    let entries = manager.entries();
    assert_eq!(entries.first().unwrap().original, "src 10");
    assert_eq!(entries.last().unwrap().original, "src 59");
}

#[test]
fn test_get_recent_context_withLimit_shouldReturnTailOldestFirst() {
    let mut manager = ContextManager::new(10);
    for i in 0..6 {
        manager.add_segment(&format!("src {}", i), &format!("dst {}", i));
    }

    let recent = manager.get_recent_context(3);
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].original, "src 3");
    assert_eq!(recent[2].original, "src 5");

    // A limit larger than the history returns everything
    assert_eq!(manager.get_recent_context(100).len(), 6);
}

#[test]
fn test_clear_withHistory_shouldEmptyManager() {
    let mut manager = ContextManager::new(5);
    manager.add_segment("a", "b");
    assert!(!manager.is_empty());

    manager.clear();
    assert!(manager.is_empty());
    assert!(manager.get_recent_context(5).is_empty());
}

#[test]
fn test_load_entries_overCapacity_shouldTruncate() {
    let mut manager = ContextManager::new(2);
    manager.load_entries(vec![
        ContextEntry { original: "a".to_string(), translated: "1".to_string() },
        ContextEntry { original: "b".to_string(), translated: "2".to_string() },
        ContextEntry { original: "c".to_string(), translated: "3".to_string() },
    ]);
    assert_eq!(manager.len(), 2);
}

#[test]
fn test_context_entries_serde_shouldRoundTrip() {
    let entry = ContextEntry {
        original: "こんにちは".to_string(),
        translated: "Hello".to_string(),
    };
    let json = serde_json::to_string(&entry).unwrap();
    let back: ContextEntry = serde_json::from_str(&json).unwrap();
    assert_eq!(back, entry);
}
