//! Tool completion coordinator against the in-memory store.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use threadline_config::CompletionConfig;
use threadline_core::{
    CompletionProgress, CoreError, MAX_STEPS_EXCEEDED_TAG, MemoryStore,
    ToolCompletionCoordinator, reconcile,
};
use threadline_protocol::{
    ContentItem, MessageStore, OrderingKey, RecordStatus, Role, ToolCompletion,
    ToolInvocationState, ToolOutcome, TurnStatus,
};
use threadline_test_utils::{MessageOp, RecordBuilder, RecordingScheduler, ScriptedMessageStore};

const THREAD: &str = "thread-1";

async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let records = [
        RecordBuilder::new("u1", Role::User, 1, 0)
            .text("email bob")
            .build(),
        RecordBuilder::new("a1", Role::Assistant, 2, 0)
            .status(RecordStatus::Pending)
            .tool_call("A", "send_email", json!({ "to": "bob@example.com" }))
            .build(),
    ];
    for record in records {
        store.insert_record(record).await.expect("insert");
    }
    store
}

fn completion(result: ToolOutcome) -> ToolCompletion {
    ToolCompletion {
        thread_id: THREAD.to_string(),
        message_id: "a1".to_string(),
        tool_call_id: "A".to_string(),
        tool_name: "send_email".to_string(),
        result,
    }
}

/// Completion should append a normalized result after the call and schedule once.
#[tokio::test]
async fn completion_appends_result_and_schedules_continuation() {
    let store = seeded_store().await;
    let scheduler = Arc::new(RecordingScheduler::new());
    let coordinator = ToolCompletionCoordinator::new(
        store.clone(),
        scheduler.clone(),
        CompletionConfig::default(),
    );

    coordinator
        .complete(completion(ToolOutcome::Success))
        .await
        .expect("complete");

    let records = store.records(THREAD);
    assert_eq!(records.len(), 3);
    assert_eq!(records[1].status, RecordStatus::Success);
    let appended = &records[2];
    assert_eq!(appended.role, Role::Tool);
    assert!(appended.key() > OrderingKey::new(2, 0));
    assert_eq!(
        appended.items(),
        vec![ContentItem::ToolResult {
            tool_call_id: "A".to_string(),
            tool_name: "send_email".to_string(),
            result: json!({
                "success": true,
                "data": { "message": "The send_email action completed successfully." }
            }),
        }]
    );

    let requests = scheduler.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].message_id, "a1");
    assert_eq!(requests[0].max_steps, 1);

    let turns = reconcile(&records);
    let invocation = turns[1].tool_invocations().next().expect("invocation");
    assert_eq!(invocation.state, ToolInvocationState::Result);
}

/// Error outcomes should carry the error text in the envelope.
#[tokio::test]
async fn error_outcome_is_normalized() {
    let store = seeded_store().await;
    let coordinator = ToolCompletionCoordinator::new(
        store.clone(),
        Arc::new(RecordingScheduler::new()),
        CompletionConfig::default(),
    );
    coordinator
        .complete(completion(ToolOutcome::Error {
            error: "mailbox full".to_string(),
        }))
        .await
        .expect("complete");

    let appended = store.records(THREAD).pop().expect("appended");
    let Some(ContentItem::ToolResult { result, .. }) = appended.items().into_iter().next() else {
        panic!("expected a tool result item");
    };
    assert_eq!(
        result,
        json!({ "success": false, "data": { "message": "mailbox full" } })
    );
}

/// A failed step-complete write should stop the append and the continuation.
#[tokio::test]
async fn mark_step_failure_prevents_scheduling() {
    let inner = seeded_store().await;
    let store =
        Arc::new(ScriptedMessageStore::new(inner.clone()).fail_on(MessageOp::MarkStepComplete));
    let scheduler = Arc::new(RecordingScheduler::new());
    let coordinator = ToolCompletionCoordinator::new(
        store.clone(),
        scheduler.clone(),
        CompletionConfig::default(),
    );

    let err = coordinator
        .complete(completion(ToolOutcome::Success))
        .await
        .expect_err("persistence failure");
    assert!(matches!(
        err,
        CoreError::Persistence {
            operation: "mark_step_complete",
            ..
        }
    ));
    assert_eq!(store.calls(), vec![MessageOp::MarkStepComplete]);
    assert!(scheduler.requests().is_empty());
    assert_eq!(inner.records(THREAD).len(), 2);
}

/// A failed append should leave the step marked complete and schedule nothing.
#[tokio::test]
async fn append_failure_is_not_rolled_back() {
    let inner = seeded_store().await;
    let store =
        Arc::new(ScriptedMessageStore::new(inner.clone()).fail_on(MessageOp::AppendToolResult));
    let scheduler = Arc::new(RecordingScheduler::new());
    let coordinator =
        ToolCompletionCoordinator::new(store, scheduler.clone(), CompletionConfig::default());

    coordinator
        .complete(completion(ToolOutcome::Success))
        .await
        .expect_err("persistence failure");
    assert!(scheduler.requests().is_empty());
    let records = inner.records(THREAD);
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].status, RecordStatus::Success);
}

/// A second completion of the same call should be ignored.
#[tokio::test]
async fn duplicate_completion_is_ignored() {
    let store = seeded_store().await;
    let scheduler = Arc::new(RecordingScheduler::new());
    let coordinator = ToolCompletionCoordinator::new(
        store.clone(),
        scheduler.clone(),
        CompletionConfig::default(),
    );

    coordinator
        .complete(completion(ToolOutcome::Success))
        .await
        .expect("first");
    coordinator
        .complete(completion(ToolOutcome::Success))
        .await
        .expect("second is a no-op");

    assert_eq!(store.records(THREAD).len(), 3);
    assert_eq!(scheduler.requests().len(), 1);
}

/// A closed scheduler should surface after the outcome has been recorded.
#[tokio::test]
async fn closed_scheduler_surfaces_after_writes() {
    let store = seeded_store().await;
    let coordinator = ToolCompletionCoordinator::new(
        store.clone(),
        Arc::new(RecordingScheduler::closed()),
        CompletionConfig::default(),
    );
    let err = coordinator
        .complete(completion(ToolOutcome::Success))
        .await
        .expect_err("closed");
    assert!(matches!(err, CoreError::Scheduling(_)));
    assert_eq!(store.records(THREAD).len(), 3);
}

/// Completing again after a failed schedule should queue the continuation
/// without writing the outcome twice.
#[tokio::test]
async fn retry_after_scheduler_recovers_schedules_once() {
    let inner = seeded_store().await;
    let store = Arc::new(ScriptedMessageStore::new(inner.clone()));
    let scheduler = Arc::new(RecordingScheduler::closed());
    let coordinator = ToolCompletionCoordinator::new(
        store.clone(),
        scheduler.clone(),
        CompletionConfig::default(),
    );

    let err = coordinator
        .complete(completion(ToolOutcome::Success))
        .await
        .expect_err("closed");
    assert!(matches!(err, CoreError::Scheduling(_)));
    assert_eq!(coordinator.progress("A"), Some(CompletionProgress::Recorded));

    scheduler.heal();
    coordinator
        .complete(completion(ToolOutcome::Success))
        .await
        .expect("retry");
    assert_eq!(coordinator.progress("A"), Some(CompletionProgress::Scheduled));
    assert_eq!(scheduler.requests().len(), 1);
    assert_eq!(scheduler.requests()[0].tool_call_id, "A");
    assert_eq!(
        store.calls(),
        vec![MessageOp::MarkStepComplete, MessageOp::AppendToolResult]
    );
    assert_eq!(inner.records(THREAD).len(), 3);

    coordinator
        .complete(completion(ToolOutcome::Success))
        .await
        .expect("duplicate after scheduling");
    assert_eq!(scheduler.requests().len(), 1);
}

/// Running past the step cap should show up as a failed turn with the tag.
#[tokio::test]
async fn step_overrun_marks_turn_failed() {
    let store = seeded_store().await;
    let scheduler = Arc::new(RecordingScheduler::new());
    let coordinator = ToolCompletionCoordinator::new(
        store.clone(),
        scheduler.clone(),
        CompletionConfig::default(),
    );
    coordinator
        .complete(completion(ToolOutcome::Success))
        .await
        .expect("complete");
    let request = scheduler.requests().remove(0);

    store
        .insert_record(
            RecordBuilder::new("c1", Role::Assistant, 4, 0)
                .text("sent, anything else?")
                .build(),
        )
        .await
        .expect("continuation step");
    let err = coordinator
        .enforce_step_limit(&request, "c1", 2)
        .await
        .expect_err("over budget");
    assert!(matches!(
        err,
        CoreError::MaxStepsExceeded {
            max_steps: 1,
            steps_taken: 2,
            ..
        }
    ));

    let turns = reconcile(&store.records(THREAD));
    let last = turns.last().expect("turn");
    assert_eq!(last.id, "c1");
    assert_eq!(last.status, TurnStatus::Failed);
    assert_eq!(last.error.as_deref(), Some(MAX_STEPS_EXCEEDED_TAG));
}
