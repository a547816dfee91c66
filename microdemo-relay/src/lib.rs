//! Queue-to-object-store relay for microdemo
//!
//! Each iteration pulls at most one message, stores its JSON body under a
//! time-derived key and only then deletes it from the queue.

pub mod backoff;
pub mod keys;
pub mod outcome;
pub mod relay;

pub use backoff::Backoff;
pub use keys::KeyScheme;
pub use outcome::{PollOutcome, RelayStats, Stage};
pub use relay::Relay;
