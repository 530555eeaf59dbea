/// TLDR Pages - asynchronous web page summaries.
///
/// This crate implements a two-Lambda architecture:
/// 1. An API Lambda that accepts summary requests, persists a `requested`
///    record and queues its id
/// 2. A Worker Lambda that claims queued ids in batches, scrapes each page,
///    summarizes it with `OpenAI` and records the outcome
///
/// # Architecture
///
/// The system uses:
/// - AWS Lambda for serverless execution
/// - SQS for task queuing between Lambdas
/// - `DynamoDB` for summary records and rate-limit counters
/// - openai-api-rs message types for ChatGPT integration
/// - Tokio for async runtime and per-task deadlines
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tldr_pages::core::Principal;
/// use tldr_pages::queue::InMemoryQueue;
/// use tldr_pages::service::TaskService;
/// use tldr_pages::store::memory::InMemoryRecordStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     tldr_pages::setup_logging();
///
///     let service = TaskService::new(
///         Arc::new(InMemoryRecordStore::new()),
///         Arc::new(InMemoryQueue::new()),
///     );
///     let principal = Principal::User("user-1".to_string());
///     let id = service.create_task(&principal, "https://example.com").await?;
///     let record = service.get_task(&principal, &id).await?;
///     println!("{} is {}", record.id, record.status);
///     Ok(())
/// }
/// ```
// Module declarations
pub mod api;
pub mod clients;
pub mod core;
pub mod errors;
pub mod prompt;
pub mod queue;
pub mod rate_limit;
pub mod service;
pub mod store;
pub mod worker;

pub use errors::SummaryError;

/// Configure structured logging with JSON format for AWS Lambda environments.
///
/// This function sets up tracing-subscriber with a JSON formatter suitable for
/// `CloudWatch` Logs integration, filtered by `RUST_LOG` (default `info`).
/// It should be called at the start of each Lambda handler; later calls are
/// no-ops.
///
/// # Example
///
/// ```
/// // Initialize structured logging at the start of your Lambda handler
/// tldr_pages::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
