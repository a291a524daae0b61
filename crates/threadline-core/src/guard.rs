//! Process-local at-most-once admission of tool calls.

use log::debug;
use parking_lot::Mutex;
use std::collections::HashSet;
use threadline_protocol::{ToolCallId, ToolReadyEvent};

/// Admits each `tool_call_id` at most once for the life of the process.
///
/// The executor filters ready events through one so a re-render does not
/// run a side effect twice.
#[derive(Debug, Default)]
pub struct ReadyToolGuard {
    claimed: Mutex<HashSet<ToolCallId>>,
}

impl ReadyToolGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `tool_call_id`. Returns false if it was already claimed.
    pub fn claim(&self, tool_call_id: &str) -> bool {
        let mut claimed = self.claimed.lock();
        if claimed.contains(tool_call_id) {
            return false;
        }
        claimed.insert(tool_call_id.to_string())
    }

    /// Give a claim back so the call can be retried.
    pub fn release(&self, tool_call_id: &str) {
        self.claimed.lock().remove(tool_call_id);
    }

    pub fn is_claimed(&self, tool_call_id: &str) -> bool {
        self.claimed.lock().contains(tool_call_id)
    }

    /// Keep only events not admitted before, claiming them.
    pub fn admit(&self, events: Vec<ToolReadyEvent>) -> Vec<ToolReadyEvent> {
        let total = events.len();
        let admitted: Vec<_> = events
            .into_iter()
            .filter(|event| self.claim(&event.tool_call_id))
            .collect();
        if admitted.len() < total {
            debug!(
                "suppressed already admitted tool calls (admitted={}, suppressed={})",
                admitted.len(),
                total - admitted.len()
            );
        }
        admitted
    }
}
