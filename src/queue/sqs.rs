use async_trait::async_trait;
use aws_sdk_sqs::Client as SqsClient;
use tracing::warn;

use super::TaskQueue;
use crate::core::QueueMessage;
use crate::errors::SummaryError;

/// SQS accepts at most this many messages per `ReceiveMessage`.
const SQS_MAX_RECEIVE: usize = 10;

#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: SqsClient,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(client: SqsClient, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }
}

#[async_trait]
impl TaskQueue for SqsQueue {
    async fn enqueue(&self, task_id: &str) -> Result<(), SummaryError> {
        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(task_id)
            .send()
            .await
            .map_err(|e| SummaryError::StoreFailure(format!("Failed to send message to SQS: {e:?}")))?;
        Ok(())
    }

    async fn dequeue(&self, max: usize) -> Result<Vec<QueueMessage>, SummaryError> {
        let mut messages = Vec::with_capacity(max);
        while messages.len() < max {
            let want = (max - messages.len()).min(SQS_MAX_RECEIVE);
            let output = self
                .client
                .receive_message()
                .queue_url(&self.queue_url)
                .max_number_of_messages(i32::try_from(want).unwrap_or(1))
                .send()
                .await
                .map_err(|e| SummaryError::StoreFailure(format!("Failed ReceiveMessage: {e:?}")))?;

            let received = output.messages.unwrap_or_default();
            if received.is_empty() {
                break;
            }
            for msg in received {
                match (msg.body, msg.receipt_handle) {
                    (Some(body), Some(handle)) => messages.push(QueueMessage {
                        task_id: body.trim().to_string(),
                        receipt_handle: handle,
                    }),
                    (body, _) => warn!(?body, "SQS message without body or receipt handle"),
                }
            }
        }
        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), SummaryError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| SummaryError::StoreFailure(format!("Failed DeleteMessage: {e:?}")))?;
        Ok(())
    }
}
