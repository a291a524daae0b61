//! Threadline core: turn reconciliation, tool completion, and thread
//! ownership migration over pluggable stores.

pub mod completion;
pub mod error;
pub mod guard;
pub mod migration;
pub mod reconciler;
pub mod services;
pub mod store;
pub mod window;

pub use completion::{
    CompletionProgress, MAX_STEPS_EXCEEDED_TAG, TokioContinuationScheduler,
    ToolCompletionCoordinator,
};
pub use error::CoreError;
pub use guard::ReadyToolGuard;
pub use migration::ThreadMigrator;
pub use reconciler::status::turn_status;
pub use reconciler::{reconcile, reconcile_with_events};
pub use services::ThreadlineServices;
pub use store::MemoryStore;
pub use window::RecordWindow;
