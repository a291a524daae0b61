//! Error types for the core write operations.

use threadline_config::ConfigError;
use threadline_protocol::{RecordId, ScheduleError, StoreError, ToolCallId};
use thiserror::Error;

/// Errors surfaced by the completion coordinator and the migration processor.
///
/// Reconciliation never produces one of these: inconsistent records are
/// logged and recovered from inside the fold.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A durable write failed; nothing written before it is rolled back.
    #[error("persistence failure during {operation}: {source}")]
    Persistence {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
    /// A continuation ran past its step cap; the step was marked failed.
    #[error("continuation for {message_id} took {steps_taken} step(s), limit is {max_steps}")]
    MaxStepsExceeded {
        message_id: RecordId,
        max_steps: u32,
        steps_taken: u32,
    },
    /// The continuation could not be queued after the outcome was recorded.
    /// Completing the same call again retries only the scheduling.
    #[error("failed to schedule continuation: {0}")]
    Scheduling(#[from] ScheduleError),
    /// Another completion for the same tool call is still running.
    #[error("completion of tool call {tool_call_id} is already in progress")]
    CompletionInProgress { tool_call_id: ToolCallId },
    /// Config loading or validation error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl CoreError {
    pub(crate) fn persistence(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| CoreError::Persistence { operation, source }
    }
}
