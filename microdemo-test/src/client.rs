//! Client for the receiver endpoints

use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Status, body and request id of one response
#[derive(Debug, Clone)]
pub struct ClientResponse {
    pub status: u16,
    pub body: String,
    pub request_id: Option<String>,
}

impl ClientResponse {
    /// Parse the body as JSON
    pub fn json(&self) -> Result<Value, ClientError> {
        serde_json::from_str(&self.body).map_err(|e| ClientError::Parse(e.to_string()))
    }
}

/// Client for a running receiver
pub struct SubmitClient {
    base_url: String,
    client: Client,
}

impl SubmitClient {
    /// Create a new client
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { base_url, client }
    }

    /// `POST /submit` with the given token and data
    pub async fn submit(&self, token: &str, data: Value) -> Result<ClientResponse, ClientError> {
        self.submit_raw(json!({ "token": token, "data": data }).to_string())
            .await
    }

    /// `POST /submit` with an arbitrary body
    pub async fn submit_raw(&self, body: impl Into<String>) -> Result<ClientResponse, ClientError> {
        let url = format!("{}/submit", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(body.into())
            .send()
            .await?;
        Self::read(response).await
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<ClientResponse, ClientError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        Self::read(response).await
    }

    async fn read(response: reqwest::Response) -> Result<ClientResponse, ClientError> {
        let status = response.status().as_u16();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = response.text().await?;
        Ok(ClientResponse {
            status,
            body,
            request_id,
        })
    }
}
