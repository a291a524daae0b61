//! Store state and the mutations applied to it.

use std::collections::{BTreeMap, HashMap};
use threadline_protocol::{
    OrderingKey, RawMessageRecord, RecordId, RecordStatus, StoreError, ThreadId, ThreadSummary,
};

/// One mutation. Every write to the store is expressed as one of these so
/// it can be checked in full before anything changes.
#[derive(Debug, Clone)]
pub(crate) enum StoreEvent {
    ThreadCreated {
        thread: ThreadSummary,
    },
    RecordInserted {
        record: RawMessageRecord,
    },
    StepCompleted {
        thread_id: ThreadId,
        message_id: RecordId,
    },
    RecordFailed {
        thread_id: ThreadId,
        message_id: RecordId,
        error: String,
    },
    OwnerChanged {
        thread_id: ThreadId,
        owner_id: String,
    },
}

#[derive(Debug, Default)]
pub(crate) struct StoreState {
    pub(crate) threads: BTreeMap<ThreadId, ThreadSummary>,
    pub(crate) records: HashMap<ThreadId, BTreeMap<OrderingKey, RawMessageRecord>>,
    /// Record id to its thread and key.
    index: HashMap<RecordId, (ThreadId, OrderingKey)>,
}

impl StoreState {
    /// Check that `event` can be applied without changing anything.
    fn check(&self, event: &StoreEvent) -> Result<(), StoreError> {
        match event {
            StoreEvent::ThreadCreated { thread } => {
                if self.threads.contains_key(&thread.id) {
                    return Err(StoreError::ThreadExists(thread.id.clone()));
                }
            }
            StoreEvent::RecordInserted { record } => {
                if self.index.contains_key(&record.id) {
                    return Err(StoreError::DuplicateRecord(record.id.clone()));
                }
                let key = record.key();
                if self
                    .records
                    .get(&record.thread_id)
                    .is_some_and(|records| records.contains_key(&key))
                {
                    return Err(StoreError::KeyCollision {
                        thread_id: record.thread_id.clone(),
                        key,
                    });
                }
            }
            StoreEvent::StepCompleted {
                thread_id,
                message_id,
            }
            | StoreEvent::RecordFailed {
                thread_id,
                message_id,
                ..
            } => {
                self.locate(thread_id, message_id)?;
            }
            StoreEvent::OwnerChanged { thread_id, .. } => {
                if !self.threads.contains_key(thread_id) {
                    return Err(StoreError::ThreadNotFound(thread_id.clone()));
                }
            }
        }
        Ok(())
    }

    /// Check `event`, then apply it. A rejected event leaves the state untouched.
    pub(crate) fn apply(&mut self, event: StoreEvent) -> Result<(), StoreError> {
        self.check(&event)?;
        match event {
            StoreEvent::ThreadCreated { thread } => {
                self.threads.insert(thread.id.clone(), thread);
            }
            StoreEvent::RecordInserted { record } => {
                let key = record.key();
                self.index
                    .insert(record.id.clone(), (record.thread_id.clone(), key));
                self.records
                    .entry(record.thread_id.clone())
                    .or_default()
                    .insert(key, record);
            }
            StoreEvent::StepCompleted {
                thread_id,
                message_id,
            } => {
                let record = self.record_mut(&thread_id, &message_id)?;
                record.streaming = false;
                if record.status == RecordStatus::Pending {
                    record.status = RecordStatus::Success;
                }
            }
            StoreEvent::RecordFailed {
                thread_id,
                message_id,
                error,
            } => {
                let record = self.record_mut(&thread_id, &message_id)?;
                record.streaming = false;
                record.status = RecordStatus::Failed;
                record.error = Some(error);
            }
            StoreEvent::OwnerChanged {
                thread_id,
                owner_id,
            } => {
                if let Some(thread) = self.threads.get_mut(&thread_id) {
                    thread.owner_id = owner_id;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn locate(
        &self,
        thread_id: &str,
        message_id: &str,
    ) -> Result<OrderingKey, StoreError> {
        match self.index.get(message_id) {
            Some((owner, key)) if owner == thread_id => Ok(*key),
            _ => Err(StoreError::RecordNotFound(message_id.to_string())),
        }
    }

    #[cfg(test)]
    pub(crate) fn record(
        &self,
        thread_id: &str,
        message_id: &str,
    ) -> Result<&RawMessageRecord, StoreError> {
        let key = self.locate(thread_id, message_id)?;
        self.records
            .get(thread_id)
            .and_then(|records| records.get(&key))
            .ok_or_else(|| StoreError::RecordNotFound(message_id.to_string()))
    }

    fn record_mut(
        &mut self,
        thread_id: &str,
        message_id: &str,
    ) -> Result<&mut RawMessageRecord, StoreError> {
        let key = self.locate(thread_id, message_id)?;
        self.records
            .get_mut(thread_id)
            .and_then(|records| records.get_mut(&key))
            .ok_or_else(|| StoreError::RecordNotFound(message_id.to_string()))
    }

    /// Key for the next record appended to `thread_id`: a fresh `order`
    /// past everything already stored.
    pub(crate) fn next_key(&self, thread_id: &str) -> OrderingKey {
        let order = self
            .records
            .get(thread_id)
            .and_then(|records| records.keys().next_back())
            .map_or(0, |key| key.order + 1);
        OrderingKey::new(order, 0)
    }
}
