use super::state::{StoreEvent, StoreState};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use parking_lot::RwLock;
use std::ops::Bound;
use threadline_protocol::{
    ContentItem, MessageContent, MessageStore, OrderingKey, PageRequest, RawMessageRecord,
    RecordPage, RecordStatus, Role, StoreError, ThreadPage, ThreadStore, ThreadSummary,
};
use uuid::Uuid;

/// Process-local message and thread store. Nothing survives the process;
/// hosts with durable storage implement the store traits themselves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records of a thread, ascending.
    pub fn records(&self, thread_id: &str) -> Vec<RawMessageRecord> {
        self.state
            .read()
            .records
            .get(thread_id)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn thread(&self, thread_id: &str) -> Option<ThreadSummary> {
        self.state.read().threads.get(thread_id).cloned()
    }
}

fn parse_key_cursor(cursor: &str) -> Result<OrderingKey, StoreError> {
    let invalid = || StoreError::InvalidCursor(cursor.to_string());
    let (order, step) = cursor.split_once('.').ok_or_else(invalid)?;
    let order = order.parse::<i64>().map_err(|_| invalid())?;
    let step = step.parse::<i64>().map_err(|_| invalid())?;
    Ok(OrderingKey::new(order, step))
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn list_records(
        &self,
        thread_id: &str,
        page: PageRequest,
    ) -> Result<RecordPage, StoreError> {
        let before = page.cursor.as_deref().map(parse_key_cursor).transpose()?;
        let limit = page.limit.max(1);
        let state = self.state.read();
        let Some(records) = state.records.get(thread_id) else {
            return Ok(RecordPage {
                records: Vec::new(),
                continue_cursor: None,
                is_done: true,
            });
        };

        let upper = before.map_or(Bound::Unbounded, Bound::Excluded);
        let mut older = records.range((Bound::Unbounded, upper)).rev();
        let mut newest_first: Vec<RawMessageRecord> = older
            .by_ref()
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect();
        let is_done = older.next().is_none();
        newest_first.reverse();
        let continue_cursor = if is_done {
            None
        } else {
            newest_first.first().map(|record| record.key().to_string())
        };
        Ok(RecordPage {
            records: newest_first,
            continue_cursor,
            is_done,
        })
    }

    async fn insert_record(&self, record: RawMessageRecord) -> Result<(), StoreError> {
        let mut state = self.state.write();
        debug!(
            "inserting record (thread_id={}, record_id={}, key={})",
            record.thread_id,
            record.id,
            record.key()
        );
        state.apply(StoreEvent::RecordInserted { record })
    }

    async fn mark_step_complete(
        &self,
        thread_id: &str,
        message_id: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write();
        state.apply(StoreEvent::StepCompleted {
            thread_id: thread_id.to_string(),
            message_id: message_id.to_string(),
        })
    }

    async fn append_tool_result(
        &self,
        thread_id: &str,
        call_message_id: &str,
        item: ContentItem,
    ) -> Result<RawMessageRecord, StoreError> {
        let mut state = self.state.write();
        state.locate(thread_id, call_message_id)?;
        let key = state.next_key(thread_id);
        let record = RawMessageRecord {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.to_string(),
            order: key.order,
            step_order: key.step_order,
            role: Role::Tool,
            status: RecordStatus::Success,
            streaming: false,
            content: MessageContent::Items(vec![item]),
            text: None,
            reasoning: None,
            sources: Vec::new(),
            continuing: None,
            error: None,
            creation_time: Utc::now(),
        };
        state.apply(StoreEvent::RecordInserted {
            record: record.clone(),
        })?;
        debug!(
            "appended tool result (thread_id={}, record_id={}, key={})",
            thread_id, record.id, key
        );
        Ok(record)
    }

    async fn mark_failed(
        &self,
        thread_id: &str,
        message_id: &str,
        error: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write();
        state.apply(StoreEvent::RecordFailed {
            thread_id: thread_id.to_string(),
            message_id: message_id.to_string(),
            error: error.to_string(),
        })
    }
}

#[async_trait]
impl ThreadStore for MemoryStore {
    async fn create_thread(&self, thread: ThreadSummary) -> Result<(), StoreError> {
        let mut state = self.state.write();
        info!(
            "creating thread (thread_id={}, owner_id={})",
            thread.id, thread.owner_id
        );
        state.apply(StoreEvent::ThreadCreated { thread })
    }

    async fn list_threads_by_owner(
        &self,
        owner_id: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<ThreadPage, StoreError> {
        let limit = limit.max(1);
        let state = self.state.read();
        let mut matching = state
            .threads
            .values()
            .filter(|thread| cursor.is_none_or(|after| thread.id.as_str() > after))
            .filter(|thread| thread.owner_id == owner_id);
        let threads: Vec<ThreadSummary> = matching.by_ref().take(limit).cloned().collect();
        let is_done = matching.next().is_none();
        let continue_cursor = if is_done {
            None
        } else {
            threads.last().map(|thread| thread.id.clone())
        };
        Ok(ThreadPage {
            threads,
            continue_cursor,
            is_done,
        })
    }

    async fn set_thread_owner(&self, thread_id: &str, owner_id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.write();
        let current = state
            .threads
            .get(thread_id)
            .ok_or_else(|| StoreError::ThreadNotFound(thread_id.to_string()))?;
        if current.owner_id == owner_id {
            return Ok(false);
        }
        state.apply(StoreEvent::OwnerChanged {
            thread_id: thread_id.to_string(),
            owner_id: owner_id.to_string(),
        })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use threadline_test_utils::{RecordBuilder, thread_summary};

    async fn seeded(count: i64) -> MemoryStore {
        let store = MemoryStore::new();
        for order in 0..count {
            let record = RecordBuilder::new(format!("m{order}"), Role::User, order, 0)
                .text(format!("message {order}"))
                .build();
            store.insert_record(record).await.expect("insert");
        }
        store
    }

    #[tokio::test]
    async fn record_pages_walk_backwards() {
        let store = seeded(5).await;

        let newest = store
            .list_records("thread-1", PageRequest::latest(2))
            .await
            .expect("page");
        let ids: Vec<_> = newest.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["m3", "m4"]);
        assert_eq!(newest.continue_cursor.as_deref(), Some("3.0"));
        assert!(!newest.is_done);

        let older = store
            .list_records(
                "thread-1",
                PageRequest {
                    cursor: newest.continue_cursor,
                    limit: 3,
                },
            )
            .await
            .expect("page");
        let ids: Vec<_> = older.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["m0", "m1", "m2"]);
        assert!(older.is_done);
        assert_eq!(older.continue_cursor, None);
    }

    #[tokio::test]
    async fn malformed_cursor_is_rejected() {
        let store = seeded(1).await;
        let err = store
            .list_records(
                "thread-1",
                PageRequest {
                    cursor: Some("nope".to_string()),
                    limit: 10,
                },
            )
            .await
            .expect_err("invalid");
        assert!(matches!(err, StoreError::InvalidCursor(_)));
    }

    #[tokio::test]
    async fn tool_result_key_follows_existing_records() {
        let store = seeded(3).await;
        let appended = store
            .append_tool_result(
                "thread-1",
                "m1",
                ContentItem::ToolResult {
                    tool_call_id: "A".to_string(),
                    tool_name: "search".to_string(),
                    result: serde_json::Value::Null,
                },
            )
            .await
            .expect("append");
        assert_eq!(appended.key(), OrderingKey::new(3, 0));
        assert_eq!(appended.role, Role::Tool);

        let err = store
            .append_tool_result(
                "thread-1",
                "missing",
                ContentItem::Text {
                    text: String::new(),
                },
            )
            .await
            .expect_err("unknown call record");
        assert!(matches!(err, StoreError::RecordNotFound(_)));
    }

    #[tokio::test]
    async fn thread_pages_use_keyset_cursor() {
        let store = MemoryStore::new();
        for idx in 0..5 {
            store
                .create_thread(thread_summary(format!("t{idx}"), "alice"))
                .await
                .expect("create");
        }
        store
            .create_thread(thread_summary("t9", "bob"))
            .await
            .expect("create");

        let first = store
            .list_threads_by_owner("alice", None, 3)
            .await
            .expect("page");
        assert_eq!(first.threads.len(), 3);
        assert_eq!(first.continue_cursor.as_deref(), Some("t2"));

        assert!(store.set_thread_owner("t0", "bob").await.expect("patch"));
        assert!(!store.set_thread_owner("t0", "bob").await.expect("patch"));

        let second = store
            .list_threads_by_owner("alice", first.continue_cursor.as_deref(), 3)
            .await
            .expect("page");
        let ids: Vec<_> = second.threads.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t3", "t4"]);
        assert!(second.is_done);
    }

    #[tokio::test]
    async fn owner_patch_requires_thread() {
        let store = MemoryStore::new();
        let err = store
            .set_thread_owner("ghost", "bob")
            .await
            .expect_err("missing");
        assert!(matches!(err, StoreError::ThreadNotFound(_)));
    }
}
