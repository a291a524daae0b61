//! Wiring of the store, coordinator and migrator from one config.

use crate::completion::ToolCompletionCoordinator;
use crate::error::CoreError;
use crate::guard::ReadyToolGuard;
use crate::migration::ThreadMigrator;
use crate::store::MemoryStore;
use crate::window::RecordWindow;
use log::info;
use std::sync::Arc;
use threadline_config::ThreadlineConfig;
use threadline_protocol::ContinuationScheduler;

/// Store, completion coordinator and migrator sharing one backend, plus the
/// emission guard for ready tool events.
pub struct ThreadlineServices {
    store: Arc<MemoryStore>,
    guard: Arc<ReadyToolGuard>,
    coordinator: ToolCompletionCoordinator,
    migrator: ThreadMigrator,
}

impl ThreadlineServices {
    pub fn open(
        config: &ThreadlineConfig,
        scheduler: Arc<dyn ContinuationScheduler>,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let store = Arc::new(MemoryStore::new());
        let guard = Arc::new(ReadyToolGuard::new());
        let coordinator =
            ToolCompletionCoordinator::new(store.clone(), scheduler, config.completion.clone());
        let migrator = ThreadMigrator::new(store.clone(), &config.migration);
        info!(
            "threadline services ready (max_continuation_steps={}, page_size={})",
            config.completion.max_continuation_steps,
            config.migration.page_size
        );
        Ok(Self {
            store,
            guard,
            coordinator,
            migrator,
        })
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Guard to filter ready tool events through before executing them.
    pub fn guard(&self) -> &Arc<ReadyToolGuard> {
        &self.guard
    }

    pub fn coordinator(&self) -> &ToolCompletionCoordinator {
        &self.coordinator
    }

    pub fn migrator(&self) -> &ThreadMigrator {
        &self.migrator
    }

    pub fn window(&self, thread_id: &str) -> RecordWindow {
        RecordWindow::new(thread_id)
    }
}
