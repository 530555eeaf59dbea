//! Lifecycle of a summarization job.
//!
//! ```text
//! requested -> processing -> complete
//!                         \-> failed
//! ```
//!
//! `complete` and `failed` are terminal. Every mutation the worker makes goes
//! through the methods on [`SummaryRecord`] below, which validate the edge
//! and keep the `summary`/`failure_reason` invariants.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::models::SummaryRecord;
use crate::errors::SummaryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Requested,
    Processing,
    Complete,
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Requested,
        TaskStatus::Processing,
        TaskStatus::Complete,
        TaskStatus::Failed,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Requested => "requested",
            TaskStatus::Processing => "processing",
            TaskStatus::Complete => "complete",
            TaskStatus::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Complete | TaskStatus::Failed)
    }

    #[must_use]
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Requested, TaskStatus::Processing)
                | (TaskStatus::Processing, TaskStatus::Complete)
                | (TaskStatus::Processing, TaskStatus::Failed)
        )
    }

    /// # Errors
    ///
    /// Returns `InvalidArgument` naming the task and the rejected edge.
    pub fn validate_transition(&self, task_id: &str, next: TaskStatus) -> Result<(), SummaryError> {
        if self.can_transition_to(next) {
            return Ok(());
        }
        let hint = if self.is_terminal() {
            " (task is in a terminal state)"
        } else {
            ""
        };
        Err(SummaryError::InvalidArgument(format!(
            "task {task_id}: cannot transition from {self} to {next}{hint}"
        )))
    }

    /// Parses the wire value used in query strings and the status index.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for unknown values.
    pub fn parse(value: &str) -> Result<Self, SummaryError> {
        TaskStatus::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| SummaryError::InvalidArgument(format!("unknown task status: {value}")))
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SummaryRecord {
    /// `requested -> processing`. Rejected when the record has no URL to fetch.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty `source_url` or a record not in `requested`.
    pub fn claim(&mut self) -> Result<(), SummaryError> {
        if self.source_url.trim().is_empty() {
            return Err(SummaryError::InvalidArgument(format!(
                "task {}: source url is empty",
                self.id
            )));
        }
        self.status.validate_transition(&self.id, TaskStatus::Processing)?;
        self.status = TaskStatus::Processing;
        Ok(())
    }

    /// Stores scraped page data. Only valid while processing.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the record is not `processing`.
    pub fn record_contents(&mut self, title: String, content: String) -> Result<(), SummaryError> {
        if self.status != TaskStatus::Processing {
            return Err(SummaryError::InvalidArgument(format!(
                "task {}: contents can only be recorded while processing (status is {})",
                self.id, self.status
            )));
        }
        self.title = Some(title);
        self.content = Some(content);
        Ok(())
    }

    /// `processing -> complete`. An empty summary is an upstream failure.
    ///
    /// # Errors
    ///
    /// `UpstreamFailure` for a blank summary, `InvalidArgument` for a bad edge.
    pub fn complete(&mut self, summary_text: String) -> Result<(), SummaryError> {
        if summary_text.trim().is_empty() {
            return Err(SummaryError::UpstreamFailure(
                "summarizer returned an empty summary".to_string(),
            ));
        }
        self.status.validate_transition(&self.id, TaskStatus::Complete)?;
        self.status = TaskStatus::Complete;
        self.summary_text = Some(summary_text);
        self.failure_reason = None;
        Ok(())
    }

    /// `processing -> failed`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a bad edge.
    pub fn fail(&mut self, reason: &str) -> Result<(), SummaryError> {
        self.status.validate_transition(&self.id, TaskStatus::Failed)?;
        let reason = reason.trim();
        self.status = TaskStatus::Failed;
        self.summary_text = None;
        self.failure_reason = Some(if reason.is_empty() {
            "unknown error".to_string()
        } else {
            reason.to_string()
        });
        Ok(())
    }
}
