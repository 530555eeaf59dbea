//! The per-job summarization pipeline.
//!
//! load -> claim (`processing`) -> scrape -> persist title/content ->
//! summarize -> persist summary (`complete`). Each step happens-before the
//! next; the only suspension points are the store, scraper and summarizer
//! calls, so dropping the future abandons whichever call is in flight.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::clients::{Scraper, Summarizer};
use crate::core::{Principal, SummaryRecord, TaskStatus};
use crate::errors::SummaryError;
use crate::prompt::build_summary_prompt;
use crate::store::RecordStore;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The job could not be claimed. The record was not moved out of
    /// `requested` (or does not exist).
    #[error("claim rejected: {0}")]
    Rejected(SummaryError),

    /// The job failed after it entered `processing`.
    #[error("{0}")]
    Failed(SummaryError),
}

/// What happened when a failure was reconciled into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureMark {
    /// The record moved `processing -> failed`.
    Marked,
    /// The record never left `requested`; nothing to fail.
    NotClaimed,
    /// The record had already reached a terminal state.
    AlreadyTerminal(TaskStatus),
}

pub struct SummaryPipeline {
    store: Arc<dyn RecordStore>,
    scraper: Arc<dyn Scraper>,
    summarizer: Arc<dyn Summarizer>,
}

impl SummaryPipeline {
    pub fn new(
        store: Arc<dyn RecordStore>,
        scraper: Arc<dyn Scraper>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            store,
            scraper,
            summarizer,
        }
    }

    /// Runs the whole pipeline for one job id.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Rejected`] if the claim fails, [`PipelineError::Failed`]
    /// for any later step.
    pub async fn execute(&self, task_id: &str) -> Result<SummaryRecord, PipelineError> {
        let record = self.claim(task_id).await.map_err(PipelineError::Rejected)?;
        self.process(record).await.map_err(PipelineError::Failed)
    }

    /// `requested -> processing`, persisted.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing record, `InvalidArgument` for an empty URL or
    /// a record not in `requested`, `StoreFailure` on store errors.
    pub async fn claim(&self, task_id: &str) -> Result<SummaryRecord, SummaryError> {
        let mut record = self.store.get(task_id, &Principal::Service).await?;
        record.claim()?;
        self.store.update(&record).await?;
        info!(task_id = %task_id, "task is processing");
        Ok(record)
    }

    /// Everything after the claim. `record` must be `processing`.
    ///
    /// # Errors
    ///
    /// `UpstreamFailure` from the scraper or summarizer, `NotFound` if the
    /// record vanished, `StoreFailure` on store errors.
    pub async fn process(&self, mut record: SummaryRecord) -> Result<SummaryRecord, SummaryError> {
        info!(url = %record.source_url, "processing scrape contents");
        let page = self.scraper.fetch_contents(&record.source_url).await?;

        info!("update title, content");
        record.record_contents(page.title, page.content)?;
        self.store.update(&record).await?;

        let prompt = build_summary_prompt(
            record.title.as_deref().unwrap_or_default(),
            record.content.as_deref().unwrap_or_default(),
        )
        .ok_or_else(|| {
            SummaryError::UpstreamFailure("page has no title or content to summarize".to_string())
        })?;

        info!("request summary");
        let summary = self.summarizer.summarize(&prompt).await?;
        record.complete(summary)?;

        info!("update summary, status complete");
        self.store.update(&record).await?;
        Ok(record)
    }

    /// Moves a claimed record to `failed`. Runs outside the task deadline.
    ///
    /// The record is re-read first: the in-flight copy is lost when the
    /// deadline drops the pipeline future, and a task that reached `complete`
    /// right at the deadline must stay complete.
    ///
    /// # Errors
    ///
    /// Store errors while reading or writing the record.
    pub async fn mark_failed(&self, task_id: &str, reason: &str) -> Result<FailureMark, SummaryError> {
        let mut record = self.store.get(task_id, &Principal::Service).await?;
        match record.status {
            TaskStatus::Processing => {
                record.fail(reason)?;
                self.store.update(&record).await?;
                Ok(FailureMark::Marked)
            }
            TaskStatus::Requested => Ok(FailureMark::NotClaimed),
            status => Ok(FailureMark::AlreadyTerminal(status)),
        }
    }
}
