//! Partial-update builder.
//!
//! Serializes a record and keeps every attribute except the key. Unset
//! optional fields are already skipped by the record's serde attributes, so
//! the result only carries what is known at the time of the write. Backends
//! render the map into their own update syntax.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::errors::SummaryError;

/// Attribute name -> new value, in a stable order.
pub type UpdateFields = BTreeMap<String, Value>;

/// # Errors
///
/// `StoreFailure` if `record` does not serialize to a JSON object.
pub fn update_fields<T: Serialize>(record: &T, key_field: &str) -> Result<UpdateFields, SummaryError> {
    let Value::Object(map) = serde_json::to_value(record)? else {
        return Err(SummaryError::StoreFailure(
            "record did not serialize to an object".to_string(),
        ));
    };

    Ok(map
        .into_iter()
        .filter(|(k, v)| k != key_field && !v.is_null())
        .collect())
}

/// Applies `fields` on top of an existing serialized record.
pub fn apply_fields(target: &mut serde_json::Map<String, Value>, fields: &UpdateFields) {
    for (k, v) in fields {
        target.insert(k.clone(), v.clone());
    }
}
