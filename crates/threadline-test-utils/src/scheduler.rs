use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use threadline_protocol::{ContinuationRequest, ContinuationScheduler, ScheduleError};

#[derive(Debug, Default)]
pub struct RecordingScheduler {
    requests: Mutex<Vec<ContinuationRequest>>,
    closed: AtomicBool,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scheduler whose consumer has gone away.
    pub fn closed() -> Self {
        let scheduler = Self::default();
        scheduler.close();
        scheduler
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Accept requests again after [`close`](Self::close).
    pub fn heal(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<ContinuationRequest> {
        self.requests.lock().clone()
    }
}

impl ContinuationScheduler for RecordingScheduler {
    fn schedule(&self, request: ContinuationRequest) -> Result<(), ScheduleError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ScheduleError::Closed);
        }
        self.requests.lock().push(request);
        Ok(())
    }
}
