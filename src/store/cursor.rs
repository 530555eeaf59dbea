//! Opaque continuation tokens for status listings.
//!
//! A cursor carries the last key a page returned. Listings over the status
//! index need the status too, because that index is keyed by
//! `(task_status, id)`. The token is URL-safe base64 over a small JSON
//! document; callers must treat it as opaque.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::TaskStatus;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl Cursor {
    #[must_use]
    pub fn new(id: impl Into<String>, status: Option<TaskStatus>) -> Self {
        Self {
            id: id.into(),
            status,
        }
    }

    #[must_use]
    pub fn encode(&self) -> String {
        // Serializing a struct of strings cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(token: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|e| CursorError::InvalidCursor(format!("not base64: {e}")))?;
        let cursor: Cursor = serde_json::from_slice(&bytes)
            .map_err(|e| CursorError::InvalidCursor(format!("bad payload: {e}")))?;
        if cursor.id.is_empty() {
            return Err(CursorError::InvalidCursor("empty key".to_string()));
        }
        Ok(cursor)
    }
}
