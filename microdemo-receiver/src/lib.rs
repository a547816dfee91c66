//! HTTP receiver for microdemo
//!
//! Accepts `POST /submit` with a shared-secret token and a submission,
//! validates both, and forwards the submission to the queue.

pub mod auth;
pub mod handlers;
pub mod router;

pub use auth::SharedSecret;
pub use handlers::ReceiverState;
pub use router::create_router;
