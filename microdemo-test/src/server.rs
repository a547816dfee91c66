//! In-process test server

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::client::SubmitClient;

/// Errors that can occur with test server
#[derive(Debug, Error)]
pub enum TestError {
    #[error("Failed to start server: {0}")]
    StartFailed(String),
}

/// A router served on a random local port until dropped
pub struct TestServer {
    base_url: String,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Bind 127.0.0.1 on an unused port and serve `router` in the background
    pub async fn start(router: Router) -> Result<Self, TestError> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| TestError::StartFailed(e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| TestError::StartFailed(e.to_string()))?;

        // The listener is already bound, so requests queue until serve polls it
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(error = %e, "Test server failed");
            }
        });

        info!(port = addr.port(), "Test server ready");
        Ok(Self {
            base_url: format!("http://{addr}"),
            handle,
        })
    }

    /// Get a client for the receiver endpoints
    pub fn client(&self) -> SubmitClient {
        SubmitClient::new(self.base_url.clone())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
