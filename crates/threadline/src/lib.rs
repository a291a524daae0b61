//! Threadline SDK.
//!
//! Re-exports the protocol, config and core crates under one name.

pub use threadline_config as config;
pub use threadline_core as core;
pub use threadline_protocol as protocol;

pub use threadline_config::ThreadlineConfig;
pub use threadline_core::{
    CoreError, ReadyToolGuard, RecordWindow, ThreadlineServices, TokioContinuationScheduler,
    reconcile, reconcile_with_events,
};

/// Route `log` records to stderr through `env_logger` (feature `logging`).
/// Without the feature, records go wherever the host installed a logger.
/// Calling it twice is harmless.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    if env_logger::try_init().is_err() {
        log::debug!("a logger was already installed");
    }
}
