//! Reconciled view model handed to rendering layers.

use crate::record::{OrderingKey, Role, SourceRef};
use crate::tool::ToolReadyEvent;
use crate::{RecordId, ToolCallId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Display status of a reconciled turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnStatus {
    /// Content is still arriving.
    Streaming,
    /// Waiting on further steps.
    Pending,
    /// Finished.
    Success,
    /// Failed; see [`UiTurn::error`].
    Failed,
}

/// Lifecycle of a tool invocation part.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolInvocationState {
    /// Requested by the model, no result yet.
    Call,
    /// Result attached.
    Result,
}

/// A tool invocation tracked within a turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub tool_call_id: ToolCallId,
    pub tool_name: String,
    pub state: ToolInvocationState,
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Zero-based index of this invocation among the turn's invocations.
    pub step: usize,
}

/// One renderable piece of a turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum Part {
    Text {
        text: String,
    },
    Reasoning {
        text: String,
    },
    Source {
        source: SourceRef,
    },
    File {
        url: String,
        mime_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
    /// Boundary marker preceding each tool call.
    StepStart,
    ToolInvocation {
        #[serde(flatten)]
        invocation: ToolInvocation,
    },
}

impl Part {
    /// Borrow the tool invocation carried by this part, if any.
    pub fn as_tool_invocation(&self) -> Option<&ToolInvocation> {
        match self {
            Part::ToolInvocation { invocation } => Some(invocation),
            _ => None,
        }
    }
}

/// One logical conversational exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UiTurn {
    /// Id of the last record that contributed to the turn.
    pub id: RecordId,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub status: TurnStatus,
    pub parts: Vec<Part>,
    /// Concatenation of every text part.
    pub text: String,
    /// Ordering key of the first contributing record.
    pub order: OrderingKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UiTurn {
    /// Iterate over the tool invocations of this turn.
    pub fn tool_invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.parts.iter().filter_map(Part::as_tool_invocation)
    }
}

/// Output of a full reconciliation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub turns: Vec<UiTurn>,
    /// Tool calls awaiting execution, each listed once.
    pub ready_tools: Vec<ToolReadyEvent>,
}
