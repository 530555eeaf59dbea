//! Batch-at-a-time worker pool.
//!
//! A cycle dequeues up to `max_batch_size` messages and runs one unit per
//! message concurrently. Every unit is bounded by `exec_timeout`, reconciles
//! its own outcome into the store, and deletes its queue message at most
//! once. The cycle returns only after every unit it spawned has finished.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use super::pipeline::{FailureMark, PipelineError, SummaryPipeline};
use crate::core::{QueueMessage, TaskStatus};
use crate::core::config::WorkerSettings;
use crate::errors::SummaryError;
use crate::queue::TaskQueue;

/// Reason recorded when the pool is shut down under a running unit.
pub const CANCELLED_REASON: &str = "task cancelled before completion";

/// Reason recorded when a unit panics.
pub const PANICKED_REASON: &str = "worker unit panicked";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    /// The record is (or was already) `failed`.
    Failed { reason: String },
    /// The claim was refused; the record was not touched.
    Rejected { reason: String },
    /// The unit stopped before the claim was persisted. The record stays
    /// `requested` and the message is left for redelivery.
    Abandoned { reason: String },
}

#[derive(Debug, Clone)]
pub struct TaskReport {
    pub task_id: String,
    pub receipt_handle: String,
    pub outcome: TaskOutcome,
    /// Whether the queue message was deleted.
    pub acknowledged: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub tasks: Vec<TaskReport>,
}

impl CycleReport {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Completed))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Failed { .. }))
    }

    pub fn rejected(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Rejected { .. }))
    }

    pub fn acknowledged(&self) -> usize {
        self.tasks.iter().filter(|t| t.acknowledged).count()
    }

    /// Reports whose message was left on the queue.
    pub fn unacknowledged(&self) -> impl Iterator<Item = &TaskReport> {
        self.tasks.iter().filter(|t| !t.acknowledged)
    }

    pub fn outcome_of(&self, task_id: &str) -> Option<&TaskOutcome> {
        self.tasks
            .iter()
            .find(|t| t.task_id == task_id)
            .map(|t| &t.outcome)
    }

    fn count(&self, pred: impl Fn(&TaskOutcome) -> bool) -> usize {
        self.tasks.iter().filter(|t| pred(&t.outcome)).count()
    }
}

pub struct WorkerPool {
    pipeline: Arc<SummaryPipeline>,
    queue: Arc<dyn TaskQueue>,
    settings: WorkerSettings,
    shutdown: CancellationToken,
}

impl WorkerPool {
    pub fn new(
        pipeline: Arc<SummaryPipeline>,
        queue: Arc<dyn TaskQueue>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            pipeline,
            queue,
            settings,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops the pool. Cancelling it ends every running unit at
    /// its next suspension point and prevents further cycles.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Dequeues one batch and processes it.
    ///
    /// # Errors
    ///
    /// `StoreFailure` if the queue cannot be read. Per-task errors never
    /// surface here; they are in the returned report.
    pub async fn run_cycle(&self) -> Result<CycleReport, SummaryError> {
        if self.shutdown.is_cancelled() {
            return Ok(CycleReport::default());
        }
        let batch = self.queue.dequeue(self.settings.max_batch_size).await?;
        if batch.is_empty() {
            return Ok(CycleReport::default());
        }
        info!(batch_size = batch.len(), "processing batch");
        Ok(self.process_batch(batch).await)
    }

    /// Runs cycles until the queue is drained or the pool is shut down.
    ///
    /// # Errors
    ///
    /// The first queue read error.
    pub async fn run_until_empty(&self) -> Result<Vec<CycleReport>, SummaryError> {
        let mut reports = Vec::new();
        loop {
            let report = self.run_cycle().await?;
            if report.is_empty() {
                break;
            }
            reports.push(report);
        }
        Ok(reports)
    }

    /// Processes messages that were already received, e.g. from an SQS event.
    pub async fn process_batch(&self, batch: Vec<QueueMessage>) -> CycleReport {
        let mut units = JoinSet::new();
        let mut pending = HashMap::with_capacity(batch.len());
        for message in batch {
            let span = info_span!("task", task_id = %message.task_id);
            let unit = TaskUnit {
                pipeline: Arc::clone(&self.pipeline),
                queue: Arc::clone(&self.queue),
                exec_timeout: self.settings.exec_timeout,
                cancel: self.shutdown.child_token(),
            };
            let handle = units.spawn(unit.run(message.clone()).instrument(span));
            pending.insert(handle.id(), message);
        }

        let mut report = CycleReport::default();
        while let Some(joined) = units.join_next_with_id().await {
            match joined {
                Ok((id, task)) => {
                    pending.remove(&id);
                    report.tasks.push(task);
                }
                Err(e) => {
                    let Some(message) = pending.remove(&e.id()) else {
                        error!("worker unit failed: {}", e);
                        continue;
                    };
                    report.tasks.push(self.panicked(message, &e).await);
                }
            }
        }
        info!(
            completed = report.completed(),
            failed = report.failed(),
            rejected = report.rejected(),
            "batch finished"
        );
        report
    }

    /// A unit that panicked leaves its message on the queue. A record it had
    /// already claimed is moved to `failed` so it is not stuck `processing`.
    async fn panicked(&self, message: QueueMessage, err: &JoinError) -> TaskReport {
        let task_id = message.task_id.as_str();
        error!(task_id = %task_id, "worker unit panicked: {}", err);
        match self.pipeline.mark_failed(task_id, PANICKED_REASON).await {
            Ok(mark) => info!(task_id = %task_id, ?mark, "reconciled panicked task"),
            Err(e) => error!(task_id = %task_id, "failed to record task failure: {}", e),
        }
        TaskReport {
            task_id: message.task_id,
            receipt_handle: message.receipt_handle,
            outcome: TaskOutcome::Abandoned {
                reason: PANICKED_REASON.to_string(),
            },
            acknowledged: false,
        }
    }
}

enum Resolution {
    Finished(Result<(), PipelineError>),
    TimedOut,
    Cancelled,
}

struct TaskUnit {
    pipeline: Arc<SummaryPipeline>,
    queue: Arc<dyn TaskQueue>,
    exec_timeout: Duration,
    cancel: CancellationToken,
}

impl TaskUnit {
    async fn run(self, message: QueueMessage) -> TaskReport {
        let task_id = message.task_id.as_str();

        let resolution = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Resolution::Cancelled,
            res = tokio::time::timeout(self.exec_timeout, self.pipeline.execute(task_id)) => {
                match res {
                    Ok(done) => Resolution::Finished(done.map(|_| ())),
                    Err(_) => Resolution::TimedOut,
                }
            }
        };

        let (outcome, delete) = match resolution {
            Resolution::Finished(Ok(())) => {
                info!("task complete");
                (TaskOutcome::Completed, true)
            }
            Resolution::Finished(Err(PipelineError::Rejected(e))) => self.rejected(e),
            Resolution::Finished(Err(PipelineError::Failed(e))) => {
                self.fail(task_id, e.to_string()).await
            }
            Resolution::TimedOut => {
                let reason = SummaryError::Timeout(self.exec_timeout.as_secs()).to_string();
                self.fail(task_id, reason).await
            }
            Resolution::Cancelled => self.fail(task_id, CANCELLED_REASON.to_string()).await,
        };

        let acknowledged = delete && self.acknowledge(&message.receipt_handle).await;
        TaskReport {
            task_id: message.task_id,
            receipt_handle: message.receipt_handle,
            outcome,
            acknowledged,
        }
    }

    fn rejected(&self, err: SummaryError) -> (TaskOutcome, bool) {
        let reason = err.to_string();
        match err {
            // Redelivering these can never succeed.
            SummaryError::NotFound(_) | SummaryError::InvalidArgument(_) => {
                warn!("claim rejected: {}", reason);
                (TaskOutcome::Rejected { reason }, true)
            }
            _ => {
                error!("claim failed, leaving message for redelivery: {}", reason);
                (TaskOutcome::Abandoned { reason }, false)
            }
        }
    }

    async fn fail(&self, task_id: &str, reason: String) -> (TaskOutcome, bool) {
        error!("task failed: {}", reason);
        match self.pipeline.mark_failed(task_id, &reason).await {
            Ok(FailureMark::Marked) => (TaskOutcome::Failed { reason }, true),
            Ok(FailureMark::NotClaimed) => {
                warn!("task stopped before it was claimed");
                (TaskOutcome::Abandoned { reason }, false)
            }
            Ok(FailureMark::AlreadyTerminal(status)) => {
                info!(%status, "task already terminal");
                let outcome = if status == TaskStatus::Complete {
                    TaskOutcome::Completed
                } else {
                    TaskOutcome::Failed { reason }
                };
                (outcome, true)
            }
            Err(e) => {
                // The record stays `processing`; a redelivery would be
                // refused by the claim anyway.
                error!("failed to record task failure: {}", e);
                (TaskOutcome::Failed { reason }, true)
            }
        }
    }

    async fn acknowledge(&self, receipt_handle: &str) -> bool {
        match self.queue.delete(receipt_handle).await {
            Ok(()) => true,
            Err(e) => {
                error!("failed to delete queue message: {}", e);
                false
            }
        }
    }
}
