//! Job queue carrying record ids from the intake path to the worker.
//!
//! Delivery is at-least-once with no ordering across messages. A message
//! stays owned by the queue until the worker deletes it with its receipt
//! handle.

pub mod memory;
pub mod sqs;

use async_trait::async_trait;

use crate::core::QueueMessage;
use crate::errors::SummaryError;

pub use memory::InMemoryQueue;
pub use sqs::SqsQueue;

#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, task_id: &str) -> Result<(), SummaryError>;

    /// Receives up to `max` messages. An empty vector means the queue had
    /// nothing visible.
    async fn dequeue(&self, max: usize) -> Result<Vec<QueueMessage>, SummaryError>;

    async fn delete(&self, receipt_handle: &str) -> Result<(), SummaryError>;
}
