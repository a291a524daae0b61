//! Raw message records as delivered by the message store.

use crate::{RecordId, ThreadId, ToolCallId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Speaker role for a record or turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-generated message.
    System,
    /// User-authored message.
    User,
    /// Model output step.
    Assistant,
    /// Tool result written back into the thread.
    Tool,
}

impl Role {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted status of a record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Step is still in flight.
    #[default]
    Pending,
    /// Step finished.
    Success,
    /// Step failed.
    Failed,
}

/// Thread-local total order of records: `(order, step_order)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct OrderingKey {
    /// Monotonic position of the logical message in the thread.
    pub order: i64,
    /// Step within the logical message; resets at each new `order`.
    pub step_order: i64,
}

impl OrderingKey {
    pub fn new(order: i64, step_order: i64) -> Self {
        Self { order, step_order }
    }
}

impl fmt::Display for OrderingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.order, self.step_order)
    }
}

/// Citation attached to a model reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    /// Source identifier assigned by the model provider.
    pub id: String,
    /// Location of the cited material.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One item of a record's content array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ContentItem {
    /// Plain text.
    Text { text: String },
    /// Model reasoning text.
    Reasoning { text: String },
    /// Source citation.
    Source { source: SourceRef },
    /// File reference.
    File {
        url: String,
        mime_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
    /// Image reference.
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    /// Model-requested tool invocation.
    ToolCall {
        tool_call_id: ToolCallId,
        tool_name: String,
        #[serde(default)]
        args: Value,
    },
    /// Outcome of a tool invocation.
    ToolResult {
        tool_call_id: ToolCallId,
        tool_name: String,
        #[serde(default)]
        result: Value,
    },
}

/// Record content: either a bare string or an ordered item list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    /// Bare text content.
    Text(String),
    /// Structured content items.
    Items(Vec<ContentItem>),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Items(Vec::new())
    }
}

/// Atomic unit of the thread log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawMessageRecord {
    pub id: RecordId,
    pub thread_id: ThreadId,
    pub order: i64,
    pub step_order: i64,
    pub role: Role,
    #[serde(default)]
    pub status: RecordStatus,
    /// True while the record is still being written.
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub content: MessageContent,
    /// Denormalized text, used when `content` carries no text item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Denormalized reasoning, used when `content` carries no reasoning item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Denormalized citations, used when `content` carries no source item.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceRef>,
    /// Explicit tool-loop continuation flag. When absent it is derived from
    /// the presence of tool calls, see [`RawMessageRecord::continues_tool_loop`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuing: Option<bool>,
    /// Failure tag persisted alongside a failed status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub creation_time: DateTime<Utc>,
}

impl RawMessageRecord {
    /// Ordering key of this record.
    pub fn key(&self) -> OrderingKey {
        OrderingKey::new(self.order, self.step_order)
    }

    /// Content as items, resolving bare text and denormalized fallbacks.
    ///
    /// Reasoning fallbacks are placed first, then the content items, then
    /// source fallbacks; a denormalized `text` only applies when the content
    /// has no text of its own.
    pub fn items(&self) -> Vec<ContentItem> {
        let mut items = match &self.content {
            MessageContent::Text(text) if text.is_empty() => Vec::new(),
            MessageContent::Text(text) => vec![ContentItem::Text { text: text.clone() }],
            MessageContent::Items(items) => items.clone(),
        };

        if !items.iter().any(|item| matches!(item, ContentItem::Text { .. }))
            && let Some(text) = self.text.as_ref().filter(|text| !text.is_empty())
        {
            items.push(ContentItem::Text { text: text.clone() });
        }
        if !items
            .iter()
            .any(|item| matches!(item, ContentItem::Reasoning { .. }))
            && let Some(reasoning) = self.reasoning.as_ref().filter(|text| !text.is_empty())
        {
            items.insert(
                0,
                ContentItem::Reasoning {
                    text: reasoning.clone(),
                },
            );
        }
        if !items
            .iter()
            .any(|item| matches!(item, ContentItem::Source { .. }))
        {
            items.extend(
                self.sources
                    .iter()
                    .cloned()
                    .map(|source| ContentItem::Source { source }),
            );
        }
        items
    }

    /// Whether any content item is a tool call.
    pub fn has_tool_calls(&self) -> bool {
        match &self.content {
            MessageContent::Text(_) => false,
            MessageContent::Items(items) => items
                .iter()
                .any(|item| matches!(item, ContentItem::ToolCall { .. })),
        }
    }

    /// Whether this step leaves its turn open for further tool-loop steps.
    pub fn continues_tool_loop(&self) -> bool {
        self.continuing.unwrap_or_else(|| self.has_tool_calls())
    }
}

/// Sort records ascending by `(order, step_order)`, with the record id as a
/// tie-breaker so malformed duplicates still sort deterministically.
pub fn sort_records(records: &mut [RawMessageRecord]) {
    records.sort_by(|a, b| match a.key().cmp(&b.key()) {
        Ordering::Equal => a.id.cmp(&b.id),
        other => other,
    });
}
