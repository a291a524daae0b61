//! Folds an ordered record log into display turns.
//!
//! The fold is a single forward pass over records sorted by
//! `(order, step_order)`. Its accumulator, [`FoldState`], holds the emitted
//! turns, the assistant turn still being assembled, and a per-pass registry
//! of tool invocations. Each record is one pure `FoldState -> FoldState`
//! step, so re-running the fold over the same slice always yields the same
//! turns. Callers re-derive the whole view after every page fetch or live
//! delta instead of patching it.

mod registry;
pub mod status;

use log::{debug, warn};
use registry::{ToolRegistry, ToolSlot, TurnSlot};
use serde_json::Value;
use threadline_protocol::{
    ContentItem, Part, RawMessageRecord, Reconciliation, Role, ToolCallId, ToolInvocation,
    ToolInvocationState, ToolReadyEvent, UiTurn,
};

/// Reconcile sorted records into turns.
pub fn reconcile(records: &[RawMessageRecord]) -> Vec<UiTurn> {
    reconcile_with_events(records).turns
}

/// Reconcile sorted records into turns plus the tool calls ready to run.
///
/// Records must already be sorted by `(order, step_order)`; see
/// [`threadline_protocol::sort_records`].
pub fn reconcile_with_events(records: &[RawMessageRecord]) -> Reconciliation {
    let reconciliation = records
        .iter()
        .fold(FoldState::default(), FoldState::apply)
        .finish();
    debug!(
        "reconciled records (records={}, turns={}, ready_tools={})",
        records.len(),
        reconciliation.turns.len(),
        reconciliation.ready_tools.len()
    );
    reconciliation
}

/// Assistant turn still receiving steps.
#[derive(Debug, Clone)]
struct OpenTurn {
    turn: UiTurn,
    /// Ids of the invocations in this turn, in part order.
    tool_calls: Vec<ToolCallId>,
}

impl OpenTurn {
    fn start(record: &RawMessageRecord) -> Self {
        Self {
            turn: UiTurn {
                id: record.id.clone(),
                role: Role::Assistant,
                created_at: record.creation_time,
                status: status::turn_status(record),
                parts: Vec::new(),
                text: String::new(),
                order: record.key(),
                error: record.error.clone(),
            },
            tool_calls: Vec::new(),
        }
    }

    fn push_invocation(&mut self, invocation: ToolInvocation) -> usize {
        self.tool_calls.push(invocation.tool_call_id.clone());
        self.turn.parts.push(Part::ToolInvocation { invocation });
        self.turn.parts.len() - 1
    }
}

/// Accumulator of the reconciliation fold.
#[derive(Debug, Clone, Default)]
struct FoldState {
    turns: Vec<UiTurn>,
    open: Option<OpenTurn>,
    registry: ToolRegistry,
}

impl FoldState {
    /// Fold one record into the state.
    fn apply(mut self, record: &RawMessageRecord) -> Self {
        match record.role {
            Role::System | Role::User => self.turns.push(standalone_turn(record)),
            Role::Tool => self.apply_tool(record),
            Role::Assistant => self.apply_assistant(record),
        }
        self
    }

    fn apply_tool(&mut self, record: &RawMessageRecord) {
        let mut open = self.open.take();
        for item in record.items() {
            match item {
                ContentItem::ToolResult {
                    tool_call_id,
                    tool_name,
                    result,
                } => self.resolve_result(open.as_mut(), record, tool_call_id, tool_name, result),
                other => debug!(
                    "ignoring non-result content on tool record (record_id={}, item={:?})",
                    record.id, other
                ),
            }
        }
        self.open = open;
    }

    fn apply_assistant(&mut self, record: &RawMessageRecord) {
        let mut open = match self.open.take() {
            Some(mut open) => {
                open.turn.id = record.id.clone();
                open.turn.status = status::turn_status(record);
                open.turn.error = record.error.clone();
                open
            }
            None => OpenTurn::start(record),
        };

        for item in record.items() {
            match item {
                ContentItem::Reasoning { text } if !text.is_empty() => {
                    open.turn.parts.push(Part::Reasoning { text });
                }
                ContentItem::Text { text } if !text.is_empty() => {
                    open.turn.text.push_str(&text);
                    open.turn.parts.push(Part::Text { text });
                }
                ContentItem::Reasoning { .. } | ContentItem::Text { .. } => {}
                ContentItem::Source { source } => open.turn.parts.push(Part::Source { source }),
                item @ (ContentItem::File { .. } | ContentItem::Image { .. }) => {
                    open.turn.parts.extend(file_part(item));
                }
                ContentItem::ToolCall {
                    tool_call_id,
                    tool_name,
                    args,
                } => self.register_call(&mut open, record, tool_call_id, tool_name, args),
                ContentItem::ToolResult {
                    tool_call_id,
                    tool_name,
                    result,
                } => self.resolve_result(Some(&mut open), record, tool_call_id, tool_name, result),
            }
        }

        if !record.continues_tool_loop() && !open.turn.parts.is_empty() {
            self.flush(open);
        } else {
            self.open = Some(open);
        }
    }

    /// Add a call-state invocation, or refresh the args of one not yet
    /// answered.
    fn register_call(
        &mut self,
        open: &mut OpenTurn,
        record: &RawMessageRecord,
        tool_call_id: ToolCallId,
        tool_name: String,
        args: Value,
    ) {
        if let Some(slot) = self.registry.get_mut(&tool_call_id) {
            if slot.turn == TurnSlot::Open
                && let Some(Part::ToolInvocation { invocation }) = open.turn.parts.get_mut(slot.part)
                && invocation.state == ToolInvocationState::Call
            {
                invocation.tool_name = tool_name;
                invocation.args = args;
                slot.message_id = record.id.clone();
                slot.streaming = record.streaming;
            } else {
                debug!(
                    "ignoring repeated tool call (record_id={}, tool_call_id={})",
                    record.id, tool_call_id
                );
            }
            return;
        }

        let step = open.tool_calls.len();
        open.turn.parts.push(Part::StepStart);
        let part = open.push_invocation(ToolInvocation {
            tool_call_id: tool_call_id.clone(),
            tool_name,
            state: ToolInvocationState::Call,
            args,
            result: None,
            step,
        });
        self.registry.insert(
            tool_call_id,
            ToolSlot {
                turn: TurnSlot::Open,
                part,
                message_id: record.id.clone(),
                streaming: record.streaming,
            },
        );
    }

    /// Attach a result to its call, synthesizing the invocation when the call
    /// was never seen.
    fn resolve_result(
        &mut self,
        open: Option<&mut OpenTurn>,
        record: &RawMessageRecord,
        tool_call_id: ToolCallId,
        tool_name: String,
        result: Value,
    ) {
        if let Some(slot) = self.registry.get(&tool_call_id) {
            let turn = match slot.turn {
                TurnSlot::Open => open.map(|open| &mut open.turn),
                TurnSlot::Closed(index) => self.turns.get_mut(index),
            };
            match turn.and_then(|turn| turn.parts.get_mut(slot.part)) {
                Some(Part::ToolInvocation { invocation })
                    if invocation.state == ToolInvocationState::Call =>
                {
                    invocation.state = ToolInvocationState::Result;
                    invocation.result = Some(result);
                }
                Some(Part::ToolInvocation { .. }) => debug!(
                    "ignoring duplicate tool result (record_id={}, tool_call_id={})",
                    record.id, tool_call_id
                ),
                _ => warn!(
                    "tool registry slot does not hold an invocation (tool_call_id={})",
                    tool_call_id
                ),
            }
            return;
        }

        let Some(open) = open else {
            warn!(
                "skipping tool result with no open assistant turn (record_id={}, tool_call_id={})",
                record.id, tool_call_id
            );
            return;
        };
        warn!(
            "tool result has no matching call; synthesizing invocation (record_id={}, tool_call_id={})",
            record.id, tool_call_id
        );
        let step = open.tool_calls.len();
        let part = open.push_invocation(ToolInvocation {
            tool_call_id: tool_call_id.clone(),
            tool_name,
            state: ToolInvocationState::Result,
            args: Value::Null,
            result: Some(result),
            step,
        });
        self.registry.insert(
            tool_call_id,
            ToolSlot {
                turn: TurnSlot::Open,
                part,
                message_id: record.id.clone(),
                streaming: record.streaming,
            },
        );
    }

    /// Close the open turn and move it to the output.
    fn flush(&mut self, open: OpenTurn) {
        let index = self.turns.len();
        self.registry.close(&open.tool_calls, index);
        self.turns.push(open.turn);
    }

    fn finish(mut self) -> Reconciliation {
        if let Some(open) = self.open.take() {
            self.flush(open);
        }
        let ready_tools = self
            .turns
            .iter()
            .flat_map(|turn| turn.tool_invocations())
            .filter(|invocation| invocation.state == ToolInvocationState::Call)
            .filter_map(|invocation| {
                let slot = self.registry.get(&invocation.tool_call_id)?;
                (!slot.streaming).then(|| ToolReadyEvent {
                    tool_call_id: invocation.tool_call_id.clone(),
                    tool_name: invocation.tool_name.clone(),
                    args: invocation.args.clone(),
                    message_id: slot.message_id.clone(),
                })
            })
            .collect();
        Reconciliation {
            turns: self.turns,
            ready_tools,
        }
    }
}

/// Turn for a system or user record; never merges with neighbours.
fn standalone_turn(record: &RawMessageRecord) -> UiTurn {
    let mut text = String::new();
    let mut attachments = Vec::new();
    for item in record.items() {
        match item {
            ContentItem::Text { text: chunk } => text.push_str(&chunk),
            item @ (ContentItem::File { .. } | ContentItem::Image { .. })
                if record.role == Role::User =>
            {
                attachments.extend(file_part(item));
            }
            other => debug!(
                "ignoring content on {} record (record_id={}, item={:?})",
                record.role, record.id, other
            ),
        }
    }

    let mut parts = Vec::with_capacity(attachments.len() + 1);
    if record.role == Role::System || !text.is_empty() {
        parts.push(Part::Text { text: text.clone() });
    }
    parts.extend(attachments);

    UiTurn {
        id: record.id.clone(),
        role: record.role,
        created_at: record.creation_time,
        status: status::turn_status(record),
        parts,
        text,
        order: record.key(),
        error: record.error.clone(),
    }
}

fn file_part(item: ContentItem) -> Option<Part> {
    match item {
        ContentItem::File {
            url,
            mime_type,
            filename,
        } => Some(Part::File {
            url,
            mime_type,
            filename,
        }),
        ContentItem::Image { url, mime_type } => Some(Part::File {
            url,
            mime_type: mime_type.unwrap_or_else(|| "image/*".to_string()),
            filename: None,
        }),
        _ => None,
    }
}
