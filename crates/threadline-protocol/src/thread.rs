//! Thread listing and ownership migration types.

use crate::{OwnerId, ThreadId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Thread metadata as listed by the thread store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    pub id: ThreadId,
    pub owner_id: OwnerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One page of a cursor-paginated thread listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ThreadPage {
    pub threads: Vec<ThreadSummary>,
    /// Opaque cursor for the next page; only valid for sequential use.
    #[serde(default)]
    pub continue_cursor: Option<String>,
    pub is_done: bool,
}

/// Counters returned by an ownership migration run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// Threads whose owner changed.
    pub total_migrated: usize,
    /// Threads visited.
    pub total_processed: usize,
}
