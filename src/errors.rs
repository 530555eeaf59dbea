use thiserror::Error;

use crate::store::cursor::CursorError;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Too many requests for principal {0}")]
    TooManyRequests(String),

    #[error("Task timed out after {0}s")]
    Timeout(u64),

    #[error("Upstream service failed: {0}")]
    UpstreamFailure(String),

    #[error("Failed to access the record store or queue: {0}")]
    StoreFailure(String),
}

impl SummaryError {
    /// HTTP status code used when the error surfaces through the API handler.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            SummaryError::NotFound(_) => 404,
            SummaryError::AlreadyExists(_) => 409,
            SummaryError::InvalidArgument(_) => 400,
            SummaryError::TooManyRequests(_) => 429,
            SummaryError::Timeout(_) => 504,
            SummaryError::UpstreamFailure(_) => 502,
            SummaryError::StoreFailure(_) => 500,
        }
    }
}

impl From<reqwest::Error> for SummaryError {
    fn from(error: reqwest::Error) -> Self {
        SummaryError::UpstreamFailure(error.to_string())
    }
}

impl From<serde_json::Error> for SummaryError {
    fn from(error: serde_json::Error) -> Self {
        SummaryError::StoreFailure(format!("serialization: {error}"))
    }
}

impl From<CursorError> for SummaryError {
    fn from(error: CursorError) -> Self {
        SummaryError::InvalidArgument(error.to_string())
    }
}

// Generic implementation for AWS SDK errors (SQS and DynamoDB share the smithy error type)
impl<E, R> From<aws_sdk_sqs::error::SdkError<E, R>> for SummaryError
where
    E: std::fmt::Debug,
    R: std::fmt::Debug,
{
    fn from(error: aws_sdk_sqs::error::SdkError<E, R>) -> Self {
        SummaryError::StoreFailure(format!("{error:?}"))
    }
}
