//! Worker Lambda handler and task processing

pub mod handler;
pub mod pipeline;
pub mod pool;

use std::sync::Arc;
use std::time::Duration;

use crate::clients::{HttpScraper, LlmClient};
use crate::core::config::AppConfig;
use crate::queue::SqsQueue;
use crate::store::dynamodb::DynamoDbRecordStore;

pub use handler::handler;
pub use pipeline::{FailureMark, PipelineError, SummaryPipeline};
pub use pool::{CycleReport, TaskOutcome, TaskReport, WorkerPool};

const SCRAPE_TIMEOUT: Duration = Duration::from_secs(30);

/// Wires the production pool: `DynamoDB` records, SQS jobs, HTTP scraping
/// and `OpenAI` summaries.
///
/// # Errors
///
/// Returns an error if the worker settings or the `OpenAI` key are missing.
pub async fn build_pool(config: &AppConfig) -> Result<WorkerPool, String> {
    let settings = config.worker_settings()?;
    let api_key = config
        .openai_api_key
        .clone()
        .ok_or_else(|| "OPENAI_API_KEY: must be set for the worker".to_string())?;

    let shared_config = aws_config::from_env().load().await;
    let store = DynamoDbRecordStore::new(
        aws_sdk_dynamodb::Client::new(&shared_config),
        config.summary_table(),
    );
    let queue = SqsQueue::new(
        aws_sdk_sqs::Client::new(&shared_config),
        config.queue_url.clone(),
    );
    let scraper = HttpScraper::new(SCRAPE_TIMEOUT);
    let summarizer = LlmClient::new(api_key, config.openai_model.clone());

    let pipeline = SummaryPipeline::new(Arc::new(store), Arc::new(scraper), Arc::new(summarizer));
    Ok(WorkerPool::new(Arc::new(pipeline), Arc::new(queue), settings))
}
