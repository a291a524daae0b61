//! Wire types for Threadline message records, reconciled turns, and the
//! tool-completion and migration write surfaces, plus the collaborator
//! traits the core is written against.

mod record;
mod store;
mod thread;
mod tool;
mod turn;

pub use record::{
    ContentItem, MessageContent, OrderingKey, RawMessageRecord, RecordStatus, Role, SourceRef,
    sort_records,
};
pub use store::{
    ContinuationScheduler, MessageStore, PageRequest, RecordPage, ScheduleError, StoreError,
    ThreadStore,
};
pub use thread::{MigrationReport, ThreadPage, ThreadSummary};
pub use tool::{
    ContinuationRequest, ToolCompletion, ToolOutcome, ToolReadyEvent, ToolResultData,
    ToolResultEnvelope,
};
pub use turn::{Part, Reconciliation, ToolInvocation, ToolInvocationState, TurnStatus, UiTurn};

/// Backend identifier for a message record.
pub type RecordId = String;
/// Identifier for a conversation thread.
pub type ThreadId = String;
/// Identifier correlating a tool call with its result.
pub type ToolCallId = String;
/// Identifier for the owner (user) of a thread.
pub type OwnerId = String;
