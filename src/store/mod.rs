//! Persistence for summary records and rate-limit counters.
//!
//! [`RecordStore`] and [`RateLimitStore`] are the seams the rest of the crate
//! talks to. Two backends implement them: [`memory`] (tests and local runs)
//! and [`dynamodb`] (production tables).

pub mod cursor;
pub mod dynamodb;
pub mod memory;
pub mod update;

use async_trait::async_trait;

use crate::core::{Principal, RateLimitCounter, SummaryRecord, TaskStatus};
use crate::errors::SummaryError;

pub use cursor::Cursor;

/// One page of a status listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPage {
    pub records: Vec<SummaryRecord>,
    /// Opaque token resuming after the last record, absent at end of data.
    pub next_cursor: Option<String>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// # Errors
    ///
    /// `AlreadyExists` if the id is taken, `StoreFailure` on transport errors.
    async fn create(&self, record: &SummaryRecord) -> Result<(), SummaryError>;

    /// Point read. Non-service principals only see records they own; a record
    /// owned by someone else is reported as `NotFound`.
    ///
    /// # Errors
    ///
    /// `NotFound`, or `StoreFailure` on transport errors.
    async fn get(&self, id: &str, principal: &Principal) -> Result<SummaryRecord, SummaryError>;

    /// Writes every non-key field of `record`, conditioned on the record
    /// still existing.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id no longer exists (nothing is applied), or
    /// `StoreFailure` on transport errors.
    async fn update(&self, record: &SummaryRecord) -> Result<(), SummaryError>;

    /// Lists up to `limit` records, optionally restricted to one status.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for `limit < 1` or a malformed/mismatched cursor,
    /// `StoreFailure` on transport errors.
    async fn list_by_status(
        &self,
        status: Option<TaskStatus>,
        cursor: Option<&str>,
        limit: i32,
    ) -> Result<RecordPage, SummaryError>;
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Returns the stored counter, expired or not.
    async fn get(&self, principal_id: &str) -> Result<Option<RateLimitCounter>, SummaryError>;

    /// Overwrites the counter for `counter.id`.
    async fn put(&self, counter: &RateLimitCounter) -> Result<(), SummaryError>;
}

pub(crate) fn validate_limit(limit: i32) -> Result<usize, SummaryError> {
    usize::try_from(limit)
        .ok()
        .filter(|l| *l >= 1)
        .ok_or_else(|| SummaryError::InvalidArgument(format!("limit must be at least 1, got {limit}")))
}

/// Decodes `token` and checks it belongs to a listing over `status`.
pub(crate) fn resume_key(
    token: Option<&str>,
    status: Option<TaskStatus>,
) -> Result<Option<Cursor>, SummaryError> {
    let Some(token) = token else {
        return Ok(None);
    };
    let cursor = Cursor::decode(token)?;
    if cursor.status != status {
        return Err(SummaryError::InvalidArgument(
            "cursor was issued for a different status filter".to_string(),
        ));
    }
    Ok(Some(cursor))
}
