//! Test helpers shared across Threadline crates.

pub mod records;
pub mod scheduler;
pub mod stores;

pub use records::{RecordBuilder, thread_summary};
pub use scheduler::RecordingScheduler;
pub use stores::{MessageOp, ScriptedMessageStore, ScriptedThreadStore};
