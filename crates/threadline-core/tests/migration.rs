//! Thread ownership migration: paging, fail-fast, and resume.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use threadline_config::MigrationConfig;
use threadline_core::{CoreError, MemoryStore, ThreadMigrator};
use threadline_protocol::{MigrationReport, StoreError, ThreadStore};
use threadline_test_utils::{ScriptedThreadStore, thread_summary};

const SOURCE: &str = "anon-123";
const TARGET: &str = "user-456";

fn thread_id(n: usize) -> String {
    format!("thread-{n:03}")
}

async fn store_with_threads(count: usize) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for n in 1..=count {
        store
            .create_thread(thread_summary(thread_id(n), SOURCE))
            .await
            .expect("create thread");
    }
    store
        .create_thread(thread_summary("thread-other", "someone-else"))
        .await
        .expect("create thread");
    store
}

/// 120 threads should be fetched as pages of 50, 50 and 20.
#[tokio::test]
async fn migrates_all_pages_sequentially() {
    let inner = store_with_threads(120).await;
    let store = Arc::new(ScriptedThreadStore::new(inner.clone()));
    let migrator = ThreadMigrator::new(store.clone(), &MigrationConfig::default());

    let report = migrator.migrate(SOURCE, TARGET).await.expect("migrate");

    assert_eq!(
        report,
        MigrationReport {
            total_migrated: 120,
            total_processed: 120,
        }
    );
    assert_eq!(store.page_sizes(), vec![50, 50, 20]);
    let leftover = inner
        .list_threads_by_owner(SOURCE, None, 500)
        .await
        .expect("list");
    assert!(leftover.threads.is_empty());
    assert_eq!(
        inner.thread("thread-other").map(|t| t.owner_id),
        Some("someone-else".to_string())
    );
}

/// A failure on the 75th patch should stop the run; a rerun should finish
/// the rest without touching threads already moved.
#[tokio::test]
async fn failure_is_fail_fast_and_resumable() {
    let inner = store_with_threads(120).await;
    let store = Arc::new(ScriptedThreadStore::new(inner.clone()).fail_patch_at(75));
    let migrator = ThreadMigrator::new(store.clone(), &MigrationConfig::default());

    let err = migrator.migrate(SOURCE, TARGET).await.expect_err("fails");
    assert!(matches!(
        err,
        CoreError::Persistence {
            operation: "set_thread_owner",
            source: StoreError::Unavailable(_),
        }
    ));
    let patched = store.patched();
    assert_eq!(patched.len(), 74);
    assert_eq!(patched.first(), Some(&thread_id(1)));
    assert_eq!(patched.last(), Some(&thread_id(74)));
    assert_eq!(
        inner.thread(&thread_id(75)).map(|t| t.owner_id),
        Some(SOURCE.to_string())
    );

    store.heal();
    store.reset_log();
    let report = migrator.migrate(SOURCE, TARGET).await.expect("resume");

    assert_eq!(report.total_processed, 46);
    assert_eq!(report.total_migrated, 46);
    let expected: Vec<String> = (75..=120).map(thread_id).collect();
    assert_eq!(store.patched(), expected);
    assert_eq!(store.page_sizes(), vec![46]);
}

/// Configured page sizes should drive the fetch size.
#[tokio::test]
async fn honours_configured_page_size() {
    let inner = store_with_threads(7).await;
    let store = Arc::new(ScriptedThreadStore::new(inner));
    let migrator = ThreadMigrator::new(store.clone(), &MigrationConfig { page_size: 3 });

    let report = migrator.migrate(SOURCE, TARGET).await.expect("migrate");
    assert_eq!(report.total_processed, 7);
    assert_eq!(store.page_sizes(), vec![3, 3, 1]);
}
