//! Response builders for API Gateway proxy responses.

use serde_json::{Value, json};

use crate::errors::SummaryError;

/// Returns a response with a JSON body.
#[must_use]
pub fn ok_json(status_code: u16, body: &Value) -> Value {
    json!({
        "statusCode": status_code,
        "headers": { "Content-Type": "application/json" },
        "body": body.to_string()
    })
}

/// Returns an error response with the given status code and message.
#[must_use]
pub fn err_response(status_code: u16, message: &str) -> Value {
    json!({
        "statusCode": status_code,
        "headers": { "Content-Type": "application/json" },
        "body": json!({ "error": message }).to_string()
    })
}

/// Maps a crate error onto its HTTP status. Store failures are not echoed
/// back to callers.
#[must_use]
pub fn error_response(error: &SummaryError) -> Value {
    match error {
        SummaryError::StoreFailure(_) => err_response(500, "Internal server error"),
        other => err_response(other.status_code(), &other.to_string()),
    }
}
