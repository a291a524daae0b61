use chrono::{DateTime, Utc};
use serde_json::Value;
use threadline_protocol::{
    ContentItem, MessageContent, RawMessageRecord, RecordStatus, Role, SourceRef, ThreadSummary,
};

pub const DEFAULT_THREAD_ID: &str = "thread-1";

/// Deterministic timestamp derived from an ordering key.
fn timestamp(order: i64, step_order: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + order * 60 + step_order, 0).unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: RawMessageRecord,
    items: Vec<ContentItem>,
}

impl RecordBuilder {
    pub fn new(id: impl Into<String>, role: Role, order: i64, step_order: i64) -> Self {
        Self {
            record: RawMessageRecord {
                id: id.into(),
                thread_id: DEFAULT_THREAD_ID.to_string(),
                order,
                step_order,
                role,
                status: RecordStatus::Success,
                streaming: false,
                content: MessageContent::default(),
                text: None,
                reasoning: None,
                sources: Vec::new(),
                continuing: None,
                error: None,
                creation_time: timestamp(order, step_order),
            },
            items: Vec::new(),
        }
    }

    pub fn thread(mut self, thread_id: impl Into<String>) -> Self {
        self.record.thread_id = thread_id.into();
        self
    }

    pub fn status(mut self, status: RecordStatus) -> Self {
        self.record.status = status;
        self
    }

    pub fn streaming(mut self, streaming: bool) -> Self {
        self.record.streaming = streaming;
        self
    }

    pub fn continuing(mut self, continuing: bool) -> Self {
        self.record.continuing = Some(continuing);
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.record.status = RecordStatus::Failed;
        self.record.error = Some(error.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.items.push(ContentItem::Text { text: text.into() });
        self
    }

    pub fn reasoning(mut self, text: impl Into<String>) -> Self {
        self.items.push(ContentItem::Reasoning { text: text.into() });
        self
    }

    pub fn source(mut self, id: impl Into<String>, url: impl Into<String>) -> Self {
        self.items.push(ContentItem::Source {
            source: SourceRef {
                id: id.into(),
                url: url.into(),
                title: None,
            },
        });
        self
    }

    pub fn file(mut self, url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        self.items.push(ContentItem::File {
            url: url.into(),
            mime_type: mime_type.into(),
            filename: None,
        });
        self
    }

    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.items.push(ContentItem::Image {
            url: url.into(),
            mime_type: None,
        });
        self
    }

    pub fn tool_call(
        mut self,
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        args: Value,
    ) -> Self {
        self.items.push(ContentItem::ToolCall {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            args,
        });
        self
    }

    pub fn tool_result(
        mut self,
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        result: Value,
    ) -> Self {
        self.items.push(ContentItem::ToolResult {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            result,
        });
        self
    }

    pub fn build(self) -> RawMessageRecord {
        RawMessageRecord {
            content: MessageContent::Items(self.items),
            ..self.record
        }
    }
}

pub fn thread_summary(id: impl Into<String>, owner_id: impl Into<String>) -> ThreadSummary {
    ThreadSummary {
        id: id.into(),
        owner_id: owner_id.into(),
        title: None,
        created_at: timestamp(0, 0),
    }
}
