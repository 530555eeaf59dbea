#![allow(clippy::missing_errors_doc)]
use std::collections::HashMap;

use lambda_runtime::{Error, LambdaEvent};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use super::build_pool;
use super::pool::CycleReport;
use crate::core::QueueMessage;
use crate::core::config::AppConfig;

/// A received SQS record: the job plus the id Lambda uses for partial batch
/// failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedRecord {
    pub message_id: Option<String>,
    pub message: QueueMessage,
}

/// Pulls `(messageId, body, receiptHandle)` out of an SQS event. Records
/// missing a body or receipt handle are skipped.
pub fn parse_sqs_records(payload: &Value) -> Vec<ReceivedRecord> {
    let Some(records) = payload.get("Records").and_then(Value::as_array) else {
        return Vec::new();
    };
    records
        .iter()
        .filter_map(|record| {
            let body = record.get("body").and_then(Value::as_str);
            let handle = record.get("receiptHandle").and_then(Value::as_str);
            match (body, handle) {
                (Some(body), Some(handle)) if !body.trim().is_empty() => Some(ReceivedRecord {
                    message_id: record
                        .get("messageId")
                        .and_then(Value::as_str)
                        .map(ToString::to_string),
                    message: QueueMessage {
                        task_id: body.trim().to_string(),
                        receipt_handle: handle.to_string(),
                    },
                }),
                _ => {
                    warn!("Skipping SQS record without body or receipt handle");
                    None
                }
            }
        })
        .collect()
}

/// Builds the `batchItemFailures` response for messages the pool left on the
/// queue, so Lambda redelivers only those.
pub fn batch_item_failures(received: &[ReceivedRecord], report: &CycleReport) -> Value {
    let ids: HashMap<&str, &str> = received
        .iter()
        .filter_map(|r| {
            r.message_id
                .as_deref()
                .map(|id| (r.message.receipt_handle.as_str(), id))
        })
        .collect();
    let failures: Vec<Value> = report
        .unacknowledged()
        .filter_map(|task| ids.get(task.receipt_handle.as_str()))
        .map(|id| json!({ "itemIdentifier": id }))
        .collect();
    json!({ "batchItemFailures": failures })
}

/// Lambda handler for the Worker entrypoint. Runs one batch from the SQS event.
pub async fn function_handler(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let config = AppConfig::from_env().map_err(|e| {
        error!("Config error: {}", e);
        Error::from(e)
    })?;

    let received = parse_sqs_records(&event.payload);
    info!(records = received.len(), "Worker Lambda received SQS event");
    if received.is_empty() {
        return Ok(json!({ "batchItemFailures": [] }));
    }

    let pool = build_pool(&config).await.map_err(|e| {
        error!("Failed to initialize worker: {}", e);
        Error::from(e)
    })?;

    let batch = received.iter().map(|r| r.message.clone()).collect();
    let report = pool.process_batch(batch).await;
    Ok(batch_item_failures(&received, &report))
}

pub use self::function_handler as handler;
