/*!
 * Tests for container failure bookkeeping and pool selection
 */

use std::time::Duration;

use mangatl::translator::{ContainerPool, TranslatorContainer};

#[tokio::test(start_paused = true)]
async fn test_mark_failure_atMaxFailures_shouldBlockUntilTimeoutElapses() {
    let mut container = TranslatorContainer::new("c1")
        .with_max_failures(2)
        .with_block_timeout(Duration::from_secs(60));

    container.mark_failure();
    assert!(!container.is_blocked());
    container.mark_failure();
    assert!(container.is_blocked());

    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(!container.is_blocked());
}

#[tokio::test(start_paused = true)]
async fn test_mark_success_afterFailures_shouldResetCountersAndUnblock() {
    let mut container = TranslatorContainer::new("c1").with_max_failures(1);
    container.mark_failure();
    assert!(container.is_blocked());

    container.mark_success();
    assert!(!container.is_blocked());
    assert_eq!(container.fail_uses, 0);
}

#[tokio::test(start_paused = true)]
async fn test_restore_onBlockedContainer_shouldUnblock() {
    let mut container = TranslatorContainer::new("c1").with_max_failures(1);
    container.mark_failure();
    assert!(container.is_blocked());

    container.restore();
    assert!(!container.is_blocked());
    assert_eq!(container.fail_uses, 0);
}

#[tokio::test(start_paused = true)]
async fn test_select_afterFailure_shouldRotateAwayFromLastUsed() {
    let pool = ContainerPool::new(
        vec![TranslatorContainer::primary("c1"), TranslatorContainer::new("c2")],
        "fallback",
    );

    let first = pool.select(true, None).unwrap();
    assert_eq!(first, 0);
    pool.mark_failure(first);

    // The just-used container is only picked when nothing else is free
    let second = pool.select(false, Some(first)).unwrap();
    assert_eq!(second, 1);
}

#[tokio::test(start_paused = true)]
async fn test_select_withAllBlocked_shouldForceRestorePrimary() {
    let pool = ContainerPool::new(
        vec![TranslatorContainer::primary("c1").with_max_failures(1)],
        "fallback",
    );

    pool.mark_failure(0);
    assert!(pool.containers()[0].is_blocked());

    let chosen = pool.select(true, Some(0));
    assert_eq!(chosen, Some(0));
    assert!(!pool.containers()[0].is_blocked());
}

#[tokio::test(start_paused = true)]
async fn test_select_withAllBlockedNoPrimaryPreference_shouldReturnNone() {
    let pool = ContainerPool::new(
        vec![TranslatorContainer::primary("c1").with_max_failures(1)],
        "fallback",
    );
    pool.mark_failure(0);

    assert_eq!(pool.select(false, Some(0)), None);
}

#[test]
fn test_pool_new_withEmptyList_shouldCreateDefaultPrimary() {
    let pool = ContainerPool::new(Vec::new(), "DeepL");
    assert_eq!(pool.len(), 1);
    let containers = pool.containers();
    assert!(containers[0].is_primary);
    assert_eq!(containers[0].name, "DeepL");
}
