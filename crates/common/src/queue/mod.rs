//! SQS queue integration for async job processing
//!
//! Provides:
//! - SQS client wrapper
//! - Message serialization/deserialization
//! - Typed job messages for the ingestion, proposal, and enhancement workers

use crate::errors::{AppError, Result};
use aws_sdk_sqs::types::Message;
use aws_sdk_sqs::Client as SqsClient;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// SQS queue configuration
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// Queue URL
    pub url: String,
    /// Dead letter queue URL (optional)
    pub dlq_url: Option<String>,
    /// Visibility timeout in seconds
    pub visibility_timeout: i32,
    /// Wait time for long polling (seconds)
    pub wait_time_seconds: i32,
    /// Maximum number of messages per poll
    pub max_messages: i32,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            dlq_url: None,
            visibility_timeout: 30,
            wait_time_seconds: 20,
            max_messages: 10,
        }
    }
}

/// SQS queue client wrapper
pub struct Queue {
    client: SqsClient,
    settings: QueueSettings,
}

impl Queue {
    /// Create a new queue client
    pub async fn new(settings: QueueSettings) -> Result<Self> {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = SqsClient::new(&aws_config);

        Ok(Self { client, settings })
    }

    /// Create with existing AWS client
    pub fn with_client(client: SqsClient, settings: QueueSettings) -> Self {
        Self { client, settings }
    }

    /// Send a message to the queue
    pub async fn send<T: Serialize>(&self, message: &T) -> Result<String> {
        let body = serde_json::to_string(message).map_err(|e| AppError::QueueError {
            message: format!("Failed to serialize message: {}", e),
        })?;

        let result = self
            .client
            .send_message()
            .queue_url(&self.settings.url)
            .message_body(&body)
            .send()
            .await
            .map_err(|e| AppError::QueueError {
                message: format!("Failed to send message: {}", e),
            })?;

        let message_id = result.message_id.unwrap_or_default();
        debug!(message_id = %message_id, "Message sent to queue");

        Ok(message_id)
    }

    /// Send a message with delay
    pub async fn send_delayed<T: Serialize>(
        &self,
        message: &T,
        delay_seconds: i32,
    ) -> Result<String> {
        let body = serde_json::to_string(message).map_err(|e| AppError::QueueError {
            message: format!("Failed to serialize message: {}", e),
        })?;

        let result = self
            .client
            .send_message()
            .queue_url(&self.settings.url)
            .message_body(&body)
            .delay_seconds(delay_seconds)
            .send()
            .await
            .map_err(|e| AppError::QueueError {
                message: format!("Failed to send delayed message: {}", e),
            })?;

        let message_id = result.message_id.unwrap_or_default();
        debug!(message_id = %message_id, delay_seconds, "Delayed message sent to queue");

        Ok(message_id)
    }

    /// Receive messages from the queue
    pub async fn receive(&self) -> Result<Vec<Message>> {
        let result = self
            .client
            .receive_message()
            .queue_url(&self.settings.url)
            .max_number_of_messages(self.settings.max_messages)
            .visibility_timeout(self.settings.visibility_timeout)
            .wait_time_seconds(self.settings.wait_time_seconds)
            .send()
            .await
            .map_err(|e| AppError::QueueError {
                message: format!("Failed to receive messages: {}", e),
            })?;

        let messages = result.messages.unwrap_or_default();
        debug!(count = messages.len(), "Received messages from queue");

        Ok(messages)
    }

    /// Delete a message after processing
    pub async fn delete(&self, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.settings.url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| AppError::QueueError {
                message: format!("Failed to delete message: {}", e),
            })?;

        debug!("Message deleted from queue");
        Ok(())
    }

    /// Change visibility timeout (extend processing time)
    pub async fn extend_visibility(
        &self,
        receipt_handle: &str,
        additional_seconds: i32,
    ) -> Result<()> {
        self.client
            .change_message_visibility()
            .queue_url(&self.settings.url)
            .receipt_handle(receipt_handle)
            .visibility_timeout(additional_seconds)
            .send()
            .await
            .map_err(|e| AppError::QueueError {
                message: format!("Failed to extend visibility: {}", e),
            })?;

        debug!(additional_seconds, "Extended message visibility");
        Ok(())
    }

    /// Parse message body as JSON
    pub fn parse_message<T: DeserializeOwned>(message: &Message) -> Result<T> {
        let body = message.body.as_ref().ok_or_else(|| AppError::QueueError {
            message: "Message has no body".to_string(),
        })?;

        serde_json::from_str(body).map_err(|e| AppError::QueueError {
            message: format!("Failed to parse message: {}", e),
        })
    }
}

/// Ingestion job: extract, chunk, and embed an uploaded resume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionJobMessage {
    pub resume_id: Uuid,
    pub owner_id: Uuid,
}

/// Proposal generation job
///
/// The payload is the full proposal request as JSON; the worker owns the
/// typed request structs and deserializes on receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalJobMessage {
    pub correlation_id: Uuid,
    pub owner_id: Uuid,
    pub payload: serde_json::Value,
}

/// Resume enhancement job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementJobMessage {
    pub resume_id: Uuid,
    pub owner_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingestion_message_serialization() {
        let msg = IngestionJobMessage {
            resume_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
        };

        let json = serde_json::to_string(&msg).unwrap();
        let parsed: IngestionJobMessage = serde_json::from_str(&json).unwrap();

        assert_eq!(msg.resume_id, parsed.resume_id);
        assert_eq!(msg.owner_id, parsed.owner_id);
    }

    #[test]
    fn test_proposal_message_carries_payload() {
        let msg = ProposalJobMessage {
            correlation_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            payload: serde_json::json!({"job": {"title": "Rust backend engineer"}}),
        };

        let json = serde_json::to_string(&msg).unwrap();
        let parsed: ProposalJobMessage = serde_json::from_str(&json).unwrap();

        assert_eq!(msg.correlation_id, parsed.correlation_id);
        assert_eq!(parsed.payload["job"]["title"], "Rust backend engineer");
    }
}
