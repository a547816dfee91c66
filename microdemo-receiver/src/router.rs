//! HTTP router for the receiver

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{self, ReceiverState};

/// Create the receiver router
pub fn create_router(state: ReceiverState) -> Router {
    Router::new()
        .route("/submit", post(handlers::submit))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
