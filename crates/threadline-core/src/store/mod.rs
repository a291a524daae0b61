//! In-process implementation of the message and thread store traits.

mod memory;
mod state;

pub use memory::MemoryStore;
