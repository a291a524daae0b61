//! End-to-end use of the SDK surface.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use threadline::protocol::{MessageStore, Role, ToolCompletion, ToolOutcome, TurnStatus};
use threadline::{ThreadlineConfig, ThreadlineServices, TokioContinuationScheduler, init_logging};
use threadline_test_utils::RecordBuilder;

/// A tool call should run once, complete, and queue one continuation.
#[tokio::test]
async fn tool_round_trip_through_services() {
    init_logging();
    let (scheduler, mut continuations) = TokioContinuationScheduler::channel();
    let services = ThreadlineServices::open(&ThreadlineConfig::default(), Arc::new(scheduler))
        .expect("services");

    let store = services.store();
    store
        .insert_record(RecordBuilder::new("u1", Role::User, 1, 0).text("hi").build())
        .await
        .expect("user");
    store
        .insert_record(
            RecordBuilder::new("a1", Role::Assistant, 2, 0)
                .tool_call("A", "weather", json!({ "city": "Lima" }))
                .build(),
        )
        .await
        .expect("assistant");

    let mut window = services.window("thread-1");
    window.load_older(&**store, 50).await.expect("load");
    let ready = services.guard().admit(window.reconcile().ready_tools);
    assert_eq!(ready.len(), 1);

    for event in ready {
        services
            .coordinator()
            .complete(ToolCompletion {
                thread_id: "thread-1".to_string(),
                message_id: event.message_id,
                tool_call_id: event.tool_call_id,
                tool_name: event.tool_name,
                result: ToolOutcome::Success,
            })
            .await
            .expect("complete");
    }

    let request = continuations.recv().await.expect("continuation");
    assert_eq!(request.message_id, "a1");
    assert_eq!(request.max_steps, 1);

    store
        .insert_record(
            RecordBuilder::new("a2", Role::Assistant, 4, 0)
                .text("It is sunny in Lima.")
                .build(),
        )
        .await
        .expect("continuation reply");
    window.merge(store.records("thread-1"));
    let reconciliation = window.reconcile();
    assert!(reconciliation.ready_tools.is_empty());
    assert_eq!(reconciliation.turns.len(), 2);
    let assistant = &reconciliation.turns[1];
    assert_eq!(assistant.status, TurnStatus::Success);
    assert_eq!(assistant.text, "It is sunny in Lima.");
}
