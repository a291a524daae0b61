//! Caller-side merge of paginated history and live deltas.

use crate::reconciler;
use log::debug;
use std::collections::HashMap;
use threadline_protocol::{
    MessageStore, PageRequest, RawMessageRecord, Reconciliation, RecordId, StoreError, ThreadId,
    sort_records,
};

/// Records of one thread as seen by a client: historical pages plus live
/// deltas, deduplicated by record id.
#[derive(Debug, Clone)]
pub struct RecordWindow {
    thread_id: ThreadId,
    records: HashMap<RecordId, RawMessageRecord>,
    older_cursor: Option<String>,
    exhausted: bool,
}

impl RecordWindow {
    pub fn new(thread_id: impl Into<ThreadId>) -> Self {
        Self {
            thread_id: thread_id.into(),
            records: HashMap::new(),
            older_cursor: None,
            exhausted: false,
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True once the oldest page has been loaded.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Merge records from either feed. Deliveries are at-least-once: a later
    /// copy of a record replaces the earlier one, except that a finished
    /// record is never overwritten by a stale streaming copy.
    pub fn merge(&mut self, records: impl IntoIterator<Item = RawMessageRecord>) {
        for record in records {
            if record.thread_id != self.thread_id {
                debug!(
                    "ignoring record from another thread (thread_id={}, record_id={})",
                    record.thread_id, record.id
                );
                continue;
            }
            match self.records.get(&record.id) {
                Some(existing) if !existing.streaming && record.streaming => {
                    debug!(
                        "ignoring stale streaming delta (record_id={}, key={})",
                        record.id,
                        record.key()
                    );
                }
                _ => {
                    self.records.insert(record.id.clone(), record);
                }
            }
        }
    }

    /// Fetch the next older page from `store` and merge it. Returns the number
    /// of records received.
    pub async fn load_older(
        &mut self,
        store: &dyn MessageStore,
        limit: usize,
    ) -> Result<usize, StoreError> {
        if self.exhausted {
            return Ok(0);
        }
        let page = store
            .list_records(
                &self.thread_id,
                PageRequest {
                    cursor: self.older_cursor.clone(),
                    limit,
                },
            )
            .await?;
        let received = page.records.len();
        self.merge(page.records);
        self.older_cursor = page.continue_cursor;
        self.exhausted = page.is_done;
        debug!(
            "loaded older records (thread_id={}, received={}, exhausted={})",
            self.thread_id, received, self.exhausted
        );
        Ok(received)
    }

    /// Records sorted by ordering key, ready for reconciliation.
    pub fn records(&self) -> Vec<RawMessageRecord> {
        let mut records: Vec<_> = self.records.values().cloned().collect();
        sort_records(&mut records);
        records
    }

    pub fn reconcile(&self) -> Reconciliation {
        reconciler::reconcile_with_events(&self.records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use threadline_protocol::{RecordStatus, Role};
    use threadline_test_utils::RecordBuilder;

    #[test]
    fn merge_sorts_and_deduplicates() {
        let mut window = RecordWindow::new("thread-1");
        window.merge(vec![
            RecordBuilder::new("b", Role::Assistant, 2, 0).text("later").build(),
            RecordBuilder::new("a", Role::User, 1, 0).text("first").build(),
        ]);
        window.merge(vec![
            RecordBuilder::new("b", Role::Assistant, 2, 0).text("later!").build(),
        ]);

        let ids: Vec<_> = window.records().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(window.reconcile().turns[1].text, "later!");
    }

    #[test]
    fn stale_streaming_copy_does_not_regress() {
        let mut window = RecordWindow::new("thread-1");
        let done = RecordBuilder::new("m", Role::Assistant, 1, 0)
            .text("full answer")
            .build();
        let partial = RecordBuilder::new("m", Role::Assistant, 1, 0)
            .status(RecordStatus::Pending)
            .streaming(true)
            .text("full")
            .build();
        window.merge(vec![done.clone()]);
        window.merge(vec![partial]);
        assert_eq!(window.records(), vec![done]);
    }

    #[test]
    fn foreign_thread_records_are_ignored() {
        let mut window = RecordWindow::new("thread-1");
        window.merge(vec![
            RecordBuilder::new("x", Role::User, 1, 0)
                .thread("thread-2")
                .build(),
        ]);
        assert!(window.is_empty());
    }

    #[tokio::test]
    async fn load_older_walks_to_the_start() {
        let store = MemoryStore::new();
        for order in 0..5 {
            store
                .insert_record(
                    RecordBuilder::new(format!("m{order}"), Role::User, order, 0)
                        .text("hi")
                        .build(),
                )
                .await
                .expect("insert");
        }

        let mut window = RecordWindow::new("thread-1");
        assert_eq!(window.load_older(&store, 2).await.expect("page"), 2);
        assert_eq!(window.load_older(&store, 2).await.expect("page"), 2);
        assert!(!window.is_exhausted());
        assert_eq!(window.load_older(&store, 2).await.expect("page"), 1);
        assert!(window.is_exhausted());
        assert_eq!(window.load_older(&store, 2).await.expect("page"), 0);
        assert_eq!(window.len(), 5);
        assert_eq!(window.reconcile().turns.len(), 5);
    }
}
