//! Per-pass index of tool invocations.

use std::collections::HashMap;
use threadline_protocol::{RecordId, ToolCallId};

/// Which turn holds a registered invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TurnSlot {
    /// The assistant turn currently being assembled.
    Open,
    /// An emitted turn, by index into the output.
    Closed(usize),
}

/// Location of one tool invocation part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ToolSlot {
    pub(crate) turn: TurnSlot,
    pub(crate) part: usize,
    /// Record that carried the call (or the result, for synthesized parts).
    pub(crate) message_id: RecordId,
    /// Whether that record was still being written.
    pub(crate) streaming: bool,
}

/// Maps each `tool_call_id` to the single part that represents it.
///
/// One entry per id per pass is what keeps invocations unique within a turn
/// and ready events unique within a pass.
#[derive(Debug, Clone, Default)]
pub(crate) struct ToolRegistry {
    slots: HashMap<ToolCallId, ToolSlot>,
}

impl ToolRegistry {
    pub(crate) fn get(&self, tool_call_id: &str) -> Option<&ToolSlot> {
        self.slots.get(tool_call_id)
    }

    pub(crate) fn get_mut(&mut self, tool_call_id: &str) -> Option<&mut ToolSlot> {
        self.slots.get_mut(tool_call_id)
    }

    pub(crate) fn insert(&mut self, tool_call_id: ToolCallId, slot: ToolSlot) {
        self.slots.insert(tool_call_id, slot);
    }

    /// Repoint entries of the open turn at its position in the output.
    pub(crate) fn close(&mut self, tool_call_ids: &[ToolCallId], turn_index: usize) {
        for id in tool_call_ids {
            if let Some(slot) = self.slots.get_mut(id)
                && slot.turn == TurnSlot::Open
            {
                slot.turn = TurnSlot::Closed(turn_index);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn slot(turn: TurnSlot, part: usize) -> ToolSlot {
        ToolSlot {
            turn,
            part,
            message_id: "m1".to_string(),
            streaming: false,
        }
    }

    #[test]
    fn close_only_moves_open_entries() {
        let mut registry = ToolRegistry::default();
        registry.insert("A".to_string(), slot(TurnSlot::Closed(0), 1));
        registry.insert("B".to_string(), slot(TurnSlot::Open, 3));

        registry.close(&["A".to_string(), "B".to_string()], 4);

        assert_eq!(registry.get("A").map(|s| s.turn), Some(TurnSlot::Closed(0)));
        assert_eq!(registry.get("B").map(|s| s.turn), Some(TurnSlot::Closed(4)));
        assert_eq!(registry.len(), 2);
    }
}
