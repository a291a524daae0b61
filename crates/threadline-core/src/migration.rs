//! Moves every thread of one owner to another, page by page.

use crate::error::CoreError;
use log::{debug, info};
use std::sync::Arc;
use threadline_config::MigrationConfig;
use threadline_protocol::{MigrationReport, ThreadStore};

/// Sequential, fail-fast thread ownership migration.
///
/// Pages are fetched one after another with the store's keyset cursor, so
/// patching a page never shifts the contents of the next one. The first
/// failing patch aborts the run; patches already applied stay applied and a
/// later run picks up whatever still belongs to the source owner.
pub struct ThreadMigrator {
    store: Arc<dyn ThreadStore>,
    page_size: usize,
}

impl ThreadMigrator {
    pub fn new(store: Arc<dyn ThreadStore>, config: &MigrationConfig) -> Self {
        Self {
            store,
            page_size: config.page_size.max(1),
        }
    }

    pub async fn migrate(
        &self,
        source_owner_id: &str,
        target_owner_id: &str,
    ) -> Result<MigrationReport, CoreError> {
        let mut report = MigrationReport::default();
        if source_owner_id == target_owner_id {
            debug!(
                "skipping migration onto the same owner (owner_id={})",
                source_owner_id
            );
            return Ok(report);
        }

        info!(
            "migrating threads (source_owner_id={}, target_owner_id={}, page_size={})",
            source_owner_id, target_owner_id, self.page_size
        );
        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .store
                .list_threads_by_owner(source_owner_id, cursor.as_deref(), self.page_size)
                .await
                .map_err(CoreError::persistence("list_threads_by_owner"))?;

            for thread in &page.threads {
                let changed = self
                    .store
                    .set_thread_owner(&thread.id, target_owner_id)
                    .await
                    .map_err(CoreError::persistence("set_thread_owner"))?;
                report.total_processed += 1;
                if changed {
                    report.total_migrated += 1;
                }
            }
            debug!(
                "migrated page (threads={}, processed={}, migrated={})",
                page.threads.len(),
                report.total_processed,
                report.total_migrated
            );

            if page.is_done {
                break;
            }
            match page.continue_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        info!(
            "migration finished (source_owner_id={}, target_owner_id={}, processed={}, migrated={})",
            source_owner_id, target_owner_id, report.total_processed, report.total_migrated
        );
        Ok(report)
    }
}
