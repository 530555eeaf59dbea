//! Intake and query operations behind the API.
//!
//! `create_task` persists a `requested` record and then enqueues its id, so
//! a worker can never receive an id whose record does not exist yet.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::core::clock::{Clock, SystemClock};
use crate::core::{Principal, SummaryRecord, TaskStatus};
use crate::errors::SummaryError;
use crate::queue::TaskQueue;
use crate::rate_limit::RateLimiter;
use crate::store::{Cursor, RecordPage, RecordStore, validate_limit};

pub const DEFAULT_LIST_LIMIT: i32 = 10;

/// Per-principal request budget for intake and listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestBudget {
    pub max: u32,
    pub window: Duration,
}

pub struct TaskService {
    store: Arc<dyn RecordStore>,
    queue: Arc<dyn TaskQueue>,
    limiter: Option<(RateLimiter, RequestBudget)>,
    clock: Arc<dyn Clock>,
}

impl TaskService {
    pub fn new(store: Arc<dyn RecordStore>, queue: Arc<dyn TaskQueue>) -> Self {
        Self {
            store,
            queue,
            limiter: None,
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_rate_limit(mut self, limiter: RateLimiter, budget: RequestBudget) -> Self {
        self.limiter = Some((limiter, budget));
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn admit(&self, principal: &Principal) -> Result<(), SummaryError> {
        match &self.limiter {
            Some((limiter, budget)) => limiter.enforce(principal, budget.max, budget.window).await,
            None => Ok(()),
        }
    }

    /// Registers a new summary job and returns its id.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a missing or non-http(s) URL, `TooManyRequests`
    /// when the caller's budget is spent, `StoreFailure` on store or queue
    /// errors.
    pub async fn create_task(&self, principal: &Principal, url: &str) -> Result<String, SummaryError> {
        let url = validate_url(url)?;
        self.admit(principal).await?;

        let id = Uuid::new_v4().to_string();
        let record = SummaryRecord::new_requested(
            id.clone(),
            url,
            principal.owner_id().map(ToString::to_string),
            self.clock.now_epoch(),
        );
        self.store.create(&record).await?;

        if let Err(e) = self.queue.enqueue(&id).await {
            // The record stays `requested` with nothing to pick it up.
            warn!(task_id = %id, "failed to enqueue task: {}", e);
            return Err(e);
        }
        info!(task_id = %id, "task requested");
        Ok(id)
    }

    /// # Errors
    ///
    /// `NotFound` if the record is missing or owned by someone else.
    pub async fn get_task(&self, principal: &Principal, id: &str) -> Result<SummaryRecord, SummaryError> {
        if id.trim().is_empty() {
            return Err(SummaryError::InvalidArgument("task id is required".to_string()));
        }
        self.store.get(id, principal).await
    }

    /// Lists records, `DEFAULT_LIST_LIMIT` per page unless `limit` is given.
    ///
    /// User principals only see their own records. Store pages are read until
    /// `limit` owned records are collected or the table is exhausted, and the
    /// returned cursor resumes after the last record handed out.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a bad status, cursor or limit, `TooManyRequests`
    /// when the caller's budget is spent, `StoreFailure` on store errors.
    pub async fn list_tasks(
        &self,
        principal: &Principal,
        status: Option<&str>,
        next_token: Option<&str>,
        limit: Option<i32>,
    ) -> Result<RecordPage, SummaryError> {
        let status = status
            .filter(|s| !s.is_empty())
            .map(TaskStatus::parse)
            .transpose()?;
        self.admit(principal).await?;

        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        match principal.owner_id() {
            None => self.store.list_by_status(status, next_token, limit).await,
            Some(owner) => self.list_owned(owner, status, next_token, limit).await,
        }
    }

    async fn list_owned(
        &self,
        owner: &str,
        status: Option<TaskStatus>,
        next_token: Option<&str>,
        limit: i32,
    ) -> Result<RecordPage, SummaryError> {
        let wanted = validate_limit(limit)?;
        let mut records = Vec::new();
        let mut token = next_token.map(ToString::to_string);

        loop {
            let page = self
                .store
                .list_by_status(status, token.as_deref(), limit)
                .await?;
            let mut scanned = page.records.into_iter();
            for record in scanned.by_ref() {
                if record.owner_id.as_deref() != Some(owner) {
                    continue;
                }
                records.push(record);
                if records.len() == wanted {
                    break;
                }
            }

            let exhausted = page.next_cursor.is_none() && scanned.as_slice().is_empty();
            if records.len() == wanted {
                let next_cursor = match records.last() {
                    Some(last) if !exhausted => Some(Cursor::new(last.id.clone(), status).encode()),
                    _ => None,
                };
                return Ok(RecordPage {
                    records,
                    next_cursor,
                });
            }
            match page.next_cursor {
                Some(next) => token = Some(next),
                None => {
                    return Ok(RecordPage {
                        records,
                        next_cursor: None,
                    });
                }
            }
        }
    }
}

fn validate_url(raw: &str) -> Result<String, SummaryError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(SummaryError::InvalidArgument("url is required".to_string()));
    }
    let parsed = Url::parse(raw)
        .map_err(|e| SummaryError::InvalidArgument(format!("invalid url {raw}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(raw.to_string()),
        other => Err(SummaryError::InvalidArgument(format!(
            "unsupported url scheme: {other}"
        ))),
    }
}
