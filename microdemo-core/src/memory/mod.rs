//! In-memory queue and object store backends

mod queue;
mod store;


pub use queue::{MemoryQueue, Message};
pub use store::{MemoryStore, StoredObject};
