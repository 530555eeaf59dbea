use serde::{Deserialize, Serialize};

use super::status::TaskStatus;

/// Persisted state of one summarization job.
///
/// Optional fields are omitted from the serialized form while unset, which is
/// what lets the partial-update builder persist only the progress made so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: String,
    #[serde(rename = "task_status")]
    pub status: TaskStatus,
    #[serde(rename = "page_url", default, skip_serializing_if = "String::is_empty")]
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "summary", default, skip_serializing_if = "Option::is_none")]
    pub summary_text: Option<String>,
    #[serde(
        rename = "task_failed_reason",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub failure_reason: Option<String>,
    #[serde(rename = "user_id", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub created_at: i64,
}

impl SummaryRecord {
    /// A freshly requested job, as written by the intake path.
    #[must_use]
    pub fn new_requested(
        id: impl Into<String>,
        source_url: impl Into<String>,
        owner_id: Option<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            status: TaskStatus::Requested,
            source_url: source_url.into(),
            title: None,
            content: None,
            summary_text: None,
            failure_reason: None,
            owner_id,
            created_at,
        }
    }
}

/// Identity a request is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Caller authenticated with the pre-shared service credential. Sees every
    /// record and bypasses the rate limiter.
    Service,
    /// End user identified by the subject of a verified token.
    User(String),
}

impl Principal {
    #[must_use]
    pub fn is_service(&self) -> bool {
        matches!(self, Principal::Service)
    }

    /// Owner id recorded on records this principal creates.
    #[must_use]
    pub fn owner_id(&self) -> Option<&str> {
        match self {
            Principal::Service => None,
            Principal::User(sub) => Some(sub),
        }
    }
}

/// Fixed-window request counter for one principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitCounter {
    pub id: String,
    pub count: u32,
    /// Epoch seconds after which the counter is treated as absent.
    #[serde(rename = "ttl")]
    pub expiry: i64,
}

impl RateLimitCounter {
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expiry
    }
}

/// A dequeued job: the record id plus the handle needed to acknowledge it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub task_id: String,
    pub receipt_handle: String,
}

/// Scraped page, as returned by a [`Scraper`](crate::clients::Scraper).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContents {
    pub title: String,
    pub content: String,
}
