use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use threadline_protocol::{
    ContentItem, MessageStore, PageRequest, RawMessageRecord, RecordPage, StoreError, ThreadId,
    ThreadPage, ThreadStore, ThreadSummary,
};

/// Message store operations that can be observed or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageOp {
    ListRecords,
    InsertRecord,
    MarkStepComplete,
    AppendToolResult,
    MarkFailed,
}

/// Wraps a message store, logging calls and failing selected operations.
pub struct ScriptedMessageStore {
    inner: Arc<dyn MessageStore>,
    failing: Mutex<HashSet<MessageOp>>,
    calls: Mutex<Vec<MessageOp>>,
}

impl ScriptedMessageStore {
    pub fn new(inner: Arc<dyn MessageStore>) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_on(self, op: MessageOp) -> Self {
        self.failing.lock().insert(op);
        self
    }

    pub fn heal(&self) {
        self.failing.lock().clear();
    }

    pub fn calls(&self) -> Vec<MessageOp> {
        self.calls.lock().clone()
    }

    fn enter(&self, op: MessageOp) -> Result<(), StoreError> {
        self.calls.lock().push(op);
        if self.failing.lock().contains(&op) {
            return Err(StoreError::Unavailable(format!("scripted failure: {op:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for ScriptedMessageStore {
    async fn list_records(
        &self,
        thread_id: &str,
        page: PageRequest,
    ) -> Result<RecordPage, StoreError> {
        self.enter(MessageOp::ListRecords)?;
        self.inner.list_records(thread_id, page).await
    }

    async fn insert_record(&self, record: RawMessageRecord) -> Result<(), StoreError> {
        self.enter(MessageOp::InsertRecord)?;
        self.inner.insert_record(record).await
    }

    async fn mark_step_complete(
        &self,
        thread_id: &str,
        message_id: &str,
    ) -> Result<(), StoreError> {
        self.enter(MessageOp::MarkStepComplete)?;
        self.inner.mark_step_complete(thread_id, message_id).await
    }

    async fn append_tool_result(
        &self,
        thread_id: &str,
        call_message_id: &str,
        item: ContentItem,
    ) -> Result<RawMessageRecord, StoreError> {
        self.enter(MessageOp::AppendToolResult)?;
        self.inner
            .append_tool_result(thread_id, call_message_id, item)
            .await
    }

    async fn mark_failed(
        &self,
        thread_id: &str,
        message_id: &str,
        error: &str,
    ) -> Result<(), StoreError> {
        self.enter(MessageOp::MarkFailed)?;
        self.inner.mark_failed(thread_id, message_id, error).await
    }
}

/// Wraps a thread store, logging page sizes and patched threads, and
/// optionally failing the n-th owner patch (1-based, counted across runs).
pub struct ScriptedThreadStore {
    inner: Arc<dyn ThreadStore>,
    fail_patch_at: Mutex<Option<usize>>,
    patch_attempts: Mutex<usize>,
    patched: Mutex<Vec<ThreadId>>,
    page_sizes: Mutex<Vec<usize>>,
}

impl ScriptedThreadStore {
    pub fn new(inner: Arc<dyn ThreadStore>) -> Self {
        Self {
            inner,
            fail_patch_at: Mutex::new(None),
            patch_attempts: Mutex::new(0),
            patched: Mutex::new(Vec::new()),
            page_sizes: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_patch_at(self, attempt: usize) -> Self {
        *self.fail_patch_at.lock() = Some(attempt);
        self
    }

    pub fn heal(&self) {
        *self.fail_patch_at.lock() = None;
    }

    /// Threads successfully patched, in order.
    pub fn patched(&self) -> Vec<ThreadId> {
        self.patched.lock().clone()
    }

    /// Size of every page returned, in order.
    pub fn page_sizes(&self) -> Vec<usize> {
        self.page_sizes.lock().clone()
    }

    pub fn reset_log(&self) {
        self.patched.lock().clear();
        self.page_sizes.lock().clear();
    }
}

#[async_trait]
impl ThreadStore for ScriptedThreadStore {
    async fn create_thread(&self, thread: ThreadSummary) -> Result<(), StoreError> {
        self.inner.create_thread(thread).await
    }

    async fn list_threads_by_owner(
        &self,
        owner_id: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<ThreadPage, StoreError> {
        let page = self
            .inner
            .list_threads_by_owner(owner_id, cursor, limit)
            .await?;
        self.page_sizes.lock().push(page.threads.len());
        Ok(page)
    }

    async fn set_thread_owner(&self, thread_id: &str, owner_id: &str) -> Result<bool, StoreError> {
        let attempt = {
            let mut attempts = self.patch_attempts.lock();
            *attempts += 1;
            *attempts
        };
        if *self.fail_patch_at.lock() == Some(attempt) {
            return Err(StoreError::Unavailable(format!(
                "scripted failure patching {thread_id}"
            )));
        }
        let changed = self.inner.set_thread_owner(thread_id, owner_id).await?;
        self.patched.lock().push(thread_id.to_string());
        Ok(changed)
    }
}
