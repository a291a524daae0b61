//! Per-turn status derivation.

use threadline_protocol::{RawMessageRecord, RecordStatus, TurnStatus};

/// Status a turn takes from its latest contributing record.
///
/// A record still being written reports `Streaming` whatever its persisted
/// status says, because live writes lag their final status.
pub fn turn_status(record: &RawMessageRecord) -> TurnStatus {
    if record.streaming {
        return TurnStatus::Streaming;
    }
    match record.status {
        RecordStatus::Pending => TurnStatus::Pending,
        RecordStatus::Success => TurnStatus::Success,
        RecordStatus::Failed => TurnStatus::Failed,
    }
}
