//! SQS-backed queue

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sqs::error::{DisplayErrorContext, SdkError};
use aws_sdk_sqs::operation::receive_message::builders::ReceiveMessageFluentBuilder;
use aws_sdk_sqs::operation::receive_message::ReceiveMessageError;
use aws_sdk_sqs::operation::send_message::SendMessageError;
use aws_sdk_sqs::types::MessageSystemAttributeName;
use aws_sdk_sqs::Client;
use microdemo_core::config::MAX_WAIT_TIME_SECS;
use microdemo_core::{MessageQueue, QueueConfig, QueueError, QueueMessage, ReceiptHandle};
use std::time::Duration;
use tracing::{debug, info};

/// Queue bound to one SQS queue URL
pub struct SqsQueue {
    client: Client,
    config: QueueConfig,
}

impl SqsQueue {
    pub fn new(sdk: &SdkConfig, config: QueueConfig) -> Self {
        Self::from_client(Client::new(sdk), config)
    }

    pub fn from_client(client: Client, config: QueueConfig) -> Self {
        Self { client, config }
    }

    /// `ReceiveMessage` for a single message. Visibility is only sent when
    /// configured, otherwise the queue's own timeout applies.
    fn receive_request(&self, wait: Duration) -> ReceiveMessageFluentBuilder {
        self.client
            .receive_message()
            .queue_url(&self.config.url)
            .max_number_of_messages(1)
            .wait_time_seconds(wait_seconds(wait))
            .set_visibility_timeout(visibility_seconds(&self.config))
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
    }
}

/// Long-poll wait in whole seconds, capped at the SQS maximum
fn wait_seconds(wait: Duration) -> i32 {
    i32::try_from(wait.as_secs().min(MAX_WAIT_TIME_SECS)).unwrap_or(0)
}

fn visibility_seconds(config: &QueueConfig) -> Option<i32> {
    config
        .visibility_timeout_secs
        .map(|secs| i32::try_from(secs).unwrap_or(i32::MAX))
}

fn backend_error<E>(err: E) -> QueueError
where
    E: std::error::Error + 'static,
{
    QueueError::Backend(DisplayErrorContext(&err).to_string())
}

/// `QueueNotFound` when the service says the queue is gone, `Backend` otherwise
fn queue_error<E, R>(url: &str, err: SdkError<E, R>, missing: fn(&E) -> bool) -> QueueError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug + 'static,
{
    if err.as_service_error().is_some_and(missing) {
        QueueError::QueueNotFound(url.to_string())
    } else {
        backend_error(err)
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn enqueue(&self, body: String) -> Result<String, QueueError> {
        let output = self
            .client
            .send_message()
            .queue_url(&self.config.url)
            .message_body(body)
            .send()
            .await
            .map_err(|err| {
                queue_error(&self.config.url, err, SendMessageError::is_queue_does_not_exist)
            })?;

        let message_id = output.message_id().unwrap_or_default().to_string();
        info!(queue = %self.config.url, message_id = %message_id, "Sent message");
        Ok(message_id)
    }

    async fn poll_one(&self, wait: Duration) -> Result<Option<QueueMessage>, QueueError> {
        let output = self
            .receive_request(wait)
            .send()
            .await
            .map_err(|err| {
                queue_error(
                    &self.config.url,
                    err,
                    ReceiveMessageError::is_queue_does_not_exist,
                )
            })?;

        let Some(message) = output.messages().first() else {
            debug!(queue = %self.config.url, "No message available");
            return Ok(None);
        };

        let receipt_handle = message
            .receipt_handle()
            .ok_or_else(|| QueueError::MalformedMessage("missing receipt handle".to_string()))?;
        let message_id = message.message_id().unwrap_or_default().to_string();
        let receive_count = message
            .attributes()
            .and_then(|a| a.get(&MessageSystemAttributeName::ApproximateReceiveCount))
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        info!(queue = %self.config.url, message_id = %message_id, "Received message");
        Ok(Some(QueueMessage {
            message_id,
            body: message.body().unwrap_or_default().to_string(),
            receipt_handle: ReceiptHandle::new(receipt_handle),
            receive_count,
        }))
    }

    async fn ack(&self, receipt: ReceiptHandle) -> Result<(), QueueError> {
        let handle = receipt.into_inner();
        let result = self
            .client
            .delete_message()
            .queue_url(&self.config.url)
            .receipt_handle(handle.clone())
            .send()
            .await;

        match result {
            Ok(_) => {
                info!(queue = %self.config.url, "Deleted message");
                Ok(())
            }
            Err(err)
                if err.as_service_error().is_some_and(|e| {
                    e.is_receipt_handle_is_invalid() || e.is_invalid_id_format()
                }) =>
            {
                Err(QueueError::ReceiptHandleInvalid(handle))
            }
            Err(err) => Err(backend_error(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_config::{BehaviorVersion, Region};

    const URL: &str = "http://localhost:4566/000000000000/q";

    fn queue(config: QueueConfig) -> SqsQueue {
        let sdk = aws_sdk_sqs::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-2"))
            .build();
        SqsQueue::from_client(Client::from_conf(sdk), config)
    }

    #[test]
    fn test_wait_is_capped() {
        assert_eq!(wait_seconds(Duration::ZERO), 0);
        assert_eq!(wait_seconds(Duration::from_millis(5900)), 5);
        assert_eq!(wait_seconds(Duration::from_secs(60)), 20);
    }

    #[test]
    fn test_visibility_seconds() {
        let mut config = QueueConfig::new(URL);
        assert_eq!(visibility_seconds(&config), None);

        config.visibility_timeout_secs = Some(45);
        assert_eq!(visibility_seconds(&config), Some(45));
    }

    #[test]
    fn test_receive_leaves_visibility_to_queue_when_unset() {
        let request = queue(QueueConfig::new(URL)).receive_request(Duration::from_secs(5));

        assert_eq!(request.get_visibility_timeout(), &None);
        assert_eq!(request.get_max_number_of_messages(), &Some(1));
        assert_eq!(request.get_wait_time_seconds(), &Some(5));
    }

    #[test]
    fn test_receive_sends_configured_visibility() {
        let mut config = QueueConfig::new(URL);
        config.visibility_timeout_secs = Some(90);

        let request = queue(config).receive_request(Duration::ZERO);

        assert_eq!(request.get_visibility_timeout(), &Some(90));
    }

    #[test]
    fn test_non_service_errors_are_backend_errors() {
        let err: SdkError<SendMessageError> = SdkError::construction_failure("boom");

        let mapped = queue_error(URL, err, SendMessageError::is_queue_does_not_exist);

        assert!(matches!(mapped, QueueError::Backend(_)));
    }
}
