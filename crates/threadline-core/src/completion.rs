//! Records tool outcomes and schedules the bounded continuation turn.
//!
//! The three steps run in a fixed order: mark the originating step complete,
//! append a tool-role record carrying a normalized result, then schedule
//! one continuation. A failure in either write aborts before scheduling.
//! Earlier writes are not undone. A completion whose writes landed but whose
//! continuation could not be queued is retried from the scheduling step.

use crate::error::CoreError;
use log::{info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use threadline_config::CompletionConfig;
use threadline_protocol::{
    ContentItem, ContinuationRequest, ContinuationScheduler, MessageStore, ScheduleError,
    ToolCallId, ToolCompletion, ToolOutcome, ToolResultEnvelope,
};
use tokio::sync::mpsc;

/// Failure tag written to a step that ran past its continuation budget.
pub const MAX_STEPS_EXCEEDED_TAG: &str = "max-steps-exceeded";

/// How far a tool call's completion has got in this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionProgress {
    /// A `complete` call is writing or scheduling right now.
    InFlight,
    /// Both writes landed; the continuation is still to be queued.
    Recorded,
    Scheduled,
}

pub struct ToolCompletionCoordinator {
    store: Arc<dyn MessageStore>,
    scheduler: Arc<dyn ContinuationScheduler>,
    progress: Mutex<HashMap<ToolCallId, CompletionProgress>>,
    config: CompletionConfig,
}

/// Work left for a `complete` call that was allowed to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resume {
    Persist,
    Schedule,
}

impl ToolCompletionCoordinator {
    pub fn new(
        store: Arc<dyn MessageStore>,
        scheduler: Arc<dyn ContinuationScheduler>,
        config: CompletionConfig,
    ) -> Self {
        Self {
            store,
            scheduler,
            progress: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn progress(&self, tool_call_id: &str) -> Option<CompletionProgress> {
        self.progress.lock().get(tool_call_id).copied()
    }

    /// Record `completion` and schedule its continuation.
    ///
    /// Once a call's continuation is scheduled, further completions for it
    /// are logged and ignored. A retry after a failed write starts over; a
    /// retry after a failed schedule only schedules. A completion that
    /// arrives while another one for the same call is running fails with
    /// [`CoreError::CompletionInProgress`].
    pub async fn complete(&self, completion: ToolCompletion) -> Result<(), CoreError> {
        let Some(resume) = self.begin(&completion)? else {
            return Ok(());
        };
        let tool_call_id = &completion.tool_call_id;

        if resume == Resume::Persist {
            let mut claim = WriteClaim {
                progress: &self.progress,
                tool_call_id,
                settled: false,
            };
            self.persist(&completion).await?;
            claim.settled = true;
        } else {
            info!(
                "retrying continuation for recorded completion (thread_id={}, tool_call_id={})",
                completion.thread_id, tool_call_id
            );
        }

        let request = ContinuationRequest {
            thread_id: completion.thread_id.clone(),
            message_id: completion.message_id.clone(),
            tool_call_id: tool_call_id.clone(),
            max_steps: self.config.max_continuation_steps,
        };
        if let Err(err) = self.scheduler.schedule(request) {
            warn!(
                "continuation not scheduled (thread_id={}, tool_call_id={}): {}",
                completion.thread_id, tool_call_id, err
            );
            self.mark(tool_call_id, CompletionProgress::Recorded);
            return Err(err.into());
        }
        self.mark(tool_call_id, CompletionProgress::Scheduled);
        info!(
            "scheduled continuation (thread_id={}, message_id={}, max_steps={})",
            completion.thread_id, completion.message_id, self.config.max_continuation_steps
        );
        Ok(())
    }

    /// Claim the call for this `complete` and decide where it resumes.
    /// `None` means the continuation was already scheduled.
    fn begin(&self, completion: &ToolCompletion) -> Result<Option<Resume>, CoreError> {
        let mut progress = self.progress.lock();
        let resume = match progress.get(&completion.tool_call_id) {
            None => Resume::Persist,
            Some(CompletionProgress::Recorded) => Resume::Schedule,
            Some(CompletionProgress::Scheduled) => {
                warn!(
                    "ignoring duplicate tool completion (thread_id={}, tool_call_id={})",
                    completion.thread_id, completion.tool_call_id
                );
                return Ok(None);
            }
            Some(CompletionProgress::InFlight) => {
                return Err(CoreError::CompletionInProgress {
                    tool_call_id: completion.tool_call_id.clone(),
                });
            }
        };
        progress.insert(completion.tool_call_id.clone(), CompletionProgress::InFlight);
        Ok(Some(resume))
    }

    fn mark(&self, tool_call_id: &str, state: CompletionProgress) {
        self.progress.lock().insert(tool_call_id.to_string(), state);
    }

    async fn persist(&self, completion: &ToolCompletion) -> Result<(), CoreError> {
        self.store
            .mark_step_complete(&completion.thread_id, &completion.message_id)
            .await
            .map_err(CoreError::persistence("mark_step_complete"))?;

        let envelope = self.envelope_for(completion);
        let record = self
            .store
            .append_tool_result(
                &completion.thread_id,
                &completion.message_id,
                ContentItem::ToolResult {
                    tool_call_id: completion.tool_call_id.clone(),
                    tool_name: completion.tool_name.clone(),
                    result: envelope.to_value(),
                },
            )
            .await
            .map_err(CoreError::persistence("append_tool_result"))?;
        info!(
            "recorded tool outcome (thread_id={}, tool_call_id={}, record_id={}, key={}, success={})",
            completion.thread_id,
            completion.tool_call_id,
            record.id,
            record.key(),
            envelope.success
        );
        Ok(())
    }

    /// Normalized result persisted for `completion`.
    pub fn envelope_for(&self, completion: &ToolCompletion) -> ToolResultEnvelope {
        match &completion.result {
            ToolOutcome::Success => ToolResultEnvelope::new(
                true,
                self.config.success_message_for(&completion.tool_name),
            ),
            ToolOutcome::Error { error } => ToolResultEnvelope::new(false, error.clone()),
        }
    }

    /// Stop a continuation that has taken more steps than it was granted.
    ///
    /// `step_record_id` is the record of the offending step; it is marked
    /// failed with [`MAX_STEPS_EXCEEDED_TAG`] so the overrun shows as a failed
    /// turn.
    pub async fn enforce_step_limit(
        &self,
        request: &ContinuationRequest,
        step_record_id: &str,
        steps_taken: u32,
    ) -> Result<(), CoreError> {
        if steps_taken <= request.max_steps {
            return Ok(());
        }
        warn!(
            "continuation exceeded step limit (thread_id={}, record_id={}, steps={}, max_steps={})",
            request.thread_id, step_record_id, steps_taken, request.max_steps
        );
        self.store
            .mark_failed(&request.thread_id, step_record_id, MAX_STEPS_EXCEEDED_TAG)
            .await
            .map_err(CoreError::persistence("mark_failed"))?;
        Err(CoreError::MaxStepsExceeded {
            message_id: step_record_id.to_string(),
            max_steps: request.max_steps,
            steps_taken,
        })
    }
}

/// Drops the in-flight entry unless both writes landed, so a failed or
/// cancelled `complete` can be retried from the start.
struct WriteClaim<'a> {
    progress: &'a Mutex<HashMap<ToolCallId, CompletionProgress>>,
    tool_call_id: &'a str,
    settled: bool,
}

impl Drop for WriteClaim<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.progress.lock().remove(self.tool_call_id);
        }
    }
}

/// Scheduler that hands continuation requests to a tokio channel consumer.
#[derive(Debug, Clone)]
pub struct TokioContinuationScheduler {
    sender: mpsc::UnboundedSender<ContinuationRequest>,
}

impl TokioContinuationScheduler {
    pub fn new(sender: mpsc::UnboundedSender<ContinuationRequest>) -> Self {
        Self { sender }
    }

    /// Scheduler plus the receiver the continuation runner drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ContinuationRequest>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl ContinuationScheduler for TokioContinuationScheduler {
    fn schedule(&self, request: ContinuationRequest) -> Result<(), ScheduleError> {
        self.sender.send(request).map_err(|_| ScheduleError::Closed)
    }
}
