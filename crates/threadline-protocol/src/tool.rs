//! Tool completion payloads exchanged with the side-effect layer.

use crate::{RecordId, ThreadId, ToolCallId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a side effect executed outside the thread log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ToolOutcome {
    /// The side effect succeeded.
    Success,
    /// The side effect failed with the given message.
    Error { error: String },
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success)
    }
}

/// Request to record a tool outcome against the record that issued the call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToolCompletion {
    pub thread_id: ThreadId,
    /// Record carrying the originating tool call.
    pub message_id: RecordId,
    pub tool_call_id: ToolCallId,
    pub tool_name: String,
    pub result: ToolOutcome,
}

/// Message body of a normalized tool result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolResultData {
    pub message: String,
}

/// Fixed-shape tool result persisted in place of raw tool payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolResultEnvelope {
    pub success: bool,
    pub data: ToolResultData,
}

impl ToolResultEnvelope {
    pub fn new(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            data: ToolResultData {
                message: message.into(),
            },
        }
    }

    /// Encode as the JSON value stored in a tool-result content item.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "success": self.success,
            "data": { "message": self.data.message },
        })
    }
}

/// A tool call the side-effect layer may execute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolReadyEvent {
    pub tool_call_id: ToolCallId,
    pub tool_name: String,
    pub args: Value,
    /// Record carrying the tool call.
    pub message_id: RecordId,
}

/// A bounded follow-up model turn scheduled after a tool result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationRequest {
    pub thread_id: ThreadId,
    /// Record whose tool loop is being continued.
    pub message_id: RecordId,
    pub tool_call_id: ToolCallId,
    /// Hard cap on model steps the continuation may take.
    pub max_steps: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn outcome_uses_kind_tag() {
        let ok: ToolOutcome = serde_json::from_value(json!({ "kind": "success" })).expect("ok");
        assert_eq!(ok, ToolOutcome::Success);
        let err: ToolOutcome =
            serde_json::from_value(json!({ "kind": "error", "error": "denied" })).expect("err");
        assert_eq!(
            err,
            ToolOutcome::Error {
                error: "denied".to_string()
            }
        );
        assert!(!err.is_success());
    }

    #[test]
    fn envelope_value_matches_serde_shape() {
        let envelope = ToolResultEnvelope::new(false, "denied");
        assert_eq!(
            envelope.to_value(),
            json!({ "success": false, "data": { "message": "denied" } })
        );
        assert_eq!(
            serde_json::to_value(&envelope).expect("encode"),
            envelope.to_value()
        );
    }
}
