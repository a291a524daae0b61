//! Collaborator interfaces: the message store, the thread store, and the
//! continuation scheduler.

use crate::record::{ContentItem, OrderingKey, RawMessageRecord};
use crate::thread::{ThreadPage, ThreadSummary};
use crate::tool::ContinuationRequest;
use crate::{RecordId, ThreadId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors returned by store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend could not be reached; retries belong to the store.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("thread not found: {0}")]
    ThreadNotFound(ThreadId),
    #[error("thread already exists: {0}")]
    ThreadExists(ThreadId),
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),
    #[error("record already exists: {0}")]
    DuplicateRecord(RecordId),
    /// Ordering keys are never reassigned; a collision is rejected.
    #[error("ordering key {key} already taken in thread {thread_id}")]
    KeyCollision {
        thread_id: ThreadId,
        key: OrderingKey,
    },
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

/// Errors returned when a continuation cannot be enqueued.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// The consumer side of the scheduler is gone.
    #[error("continuation scheduler closed")]
    Closed,
    #[error("continuation rejected: {0}")]
    Rejected(String),
}

/// Request for one page of a thread's records, walking backwards in time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// Cursor returned by the previous page; `None` starts at the newest record.
    #[serde(default)]
    pub cursor: Option<String>,
    pub limit: usize,
}

impl PageRequest {
    /// First (newest) page.
    pub fn latest(limit: usize) -> Self {
        Self {
            cursor: None,
            limit,
        }
    }
}

/// One page of records, sorted ascending by ordering key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RecordPage {
    pub records: Vec<RawMessageRecord>,
    #[serde(default)]
    pub continue_cursor: Option<String>,
    /// True when no older records remain.
    pub is_done: bool,
}

/// Ordered record log for threads.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Fetch a page of records, newest pages first.
    async fn list_records(
        &self,
        thread_id: &str,
        page: PageRequest,
    ) -> Result<RecordPage, StoreError>;

    /// Insert a record with a caller-chosen ordering key.
    async fn insert_record(&self, record: RawMessageRecord) -> Result<(), StoreError>;

    /// Mark the step carried by `message_id` as finished.
    async fn mark_step_complete(&self, thread_id: &str, message_id: &str)
    -> Result<(), StoreError>;

    /// Append a tool-role record answering `call_message_id`. The store
    /// allocates an ordering key strictly greater than the call's key.
    async fn append_tool_result(
        &self,
        thread_id: &str,
        call_message_id: &str,
        item: ContentItem,
    ) -> Result<RawMessageRecord, StoreError>;

    /// Mark a record failed with a tag.
    async fn mark_failed(
        &self,
        thread_id: &str,
        message_id: &str,
        error: &str,
    ) -> Result<(), StoreError>;
}

/// Thread metadata keyed by owner.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Register a thread.
    async fn create_thread(&self, thread: ThreadSummary) -> Result<(), StoreError>;

    /// List threads owned by `owner_id`, resuming after `cursor`.
    async fn list_threads_by_owner(
        &self,
        owner_id: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<ThreadPage, StoreError>;

    /// Set a thread's owner. Returns whether the owner changed.
    async fn set_thread_owner(&self, thread_id: &str, owner_id: &str) -> Result<bool, StoreError>;
}

/// Sink for continuation turns. Scheduling is fire-and-forget: the request
/// is queued and cannot be cancelled afterwards.
pub trait ContinuationScheduler: Send + Sync {
    fn schedule(&self, request: ContinuationRequest) -> Result<(), ScheduleError>;
}
