//! In-memory backends.
//!
//! Records are kept in their serialized form so updates go through the same
//! partial-update path as the DynamoDB backend. Listing order is by id, which
//! gives cursors a stable resume point.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::update::{apply_fields, update_fields};
use super::{Cursor, RateLimitStore, RecordPage, RecordStore, resume_key, validate_limit};
use crate::core::{Principal, RateLimitCounter, SummaryRecord, TaskStatus};
use crate::errors::SummaryError;

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    items: RwLock<BTreeMap<String, Map<String, Value>>>,
}

impl InMemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Deletes a record outright, as an external retention job would.
    pub fn remove(&self, id: &str) -> bool {
        self.items.write().remove(id).is_some()
    }

    /// Reads a record without any ownership filtering.
    #[must_use]
    pub fn snapshot(&self, id: &str) -> Option<SummaryRecord> {
        let items = self.items.read();
        items
            .get(id)
            .and_then(|m| serde_json::from_value(Value::Object(m.clone())).ok())
    }
}

fn decode(item: &Map<String, Value>) -> Result<SummaryRecord, SummaryError> {
    Ok(serde_json::from_value(Value::Object(item.clone()))?)
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create(&self, record: &SummaryRecord) -> Result<(), SummaryError> {
        let Value::Object(item) = serde_json::to_value(record)? else {
            return Err(SummaryError::StoreFailure(
                "record did not serialize to an object".to_string(),
            ));
        };
        let mut items = self.items.write();
        if items.contains_key(&record.id) {
            return Err(SummaryError::AlreadyExists(record.id.clone()));
        }
        items.insert(record.id.clone(), item);
        Ok(())
    }

    async fn get(&self, id: &str, principal: &Principal) -> Result<SummaryRecord, SummaryError> {
        let record = {
            let items = self.items.read();
            let item = items
                .get(id)
                .ok_or_else(|| SummaryError::NotFound(id.to_string()))?;
            decode(item)?
        };

        match principal {
            Principal::Service => Ok(record),
            Principal::User(sub) if record.owner_id.as_deref() == Some(sub.as_str()) => Ok(record),
            Principal::User(_) => Err(SummaryError::NotFound(id.to_string())),
        }
    }

    async fn update(&self, record: &SummaryRecord) -> Result<(), SummaryError> {
        let fields = update_fields(record, "id")?;
        let mut items = self.items.write();
        let item = items
            .get_mut(&record.id)
            .ok_or_else(|| SummaryError::NotFound(record.id.clone()))?;
        apply_fields(item, &fields);
        Ok(())
    }

    async fn list_by_status(
        &self,
        status: Option<TaskStatus>,
        cursor: Option<&str>,
        limit: i32,
    ) -> Result<RecordPage, SummaryError> {
        let limit = validate_limit(limit)?;
        let start = resume_key(cursor, status)?;

        let items = self.items.read();
        let lower = match &start {
            Some(c) => Bound::Excluded(c.id.clone()),
            None => Bound::Unbounded,
        };

        let mut records = Vec::with_capacity(limit);
        let mut has_more = false;
        for item in items.range((lower, Bound::Unbounded)).map(|(_, v)| v) {
            let record = decode(item)?;
            if status.is_some_and(|s| s != record.status) {
                continue;
            }
            if records.len() == limit {
                has_more = true;
                break;
            }
            records.push(record);
        }

        let next_cursor = if has_more {
            records
                .last()
                .map(|last| Cursor::new(last.id.clone(), status).encode())
        } else {
            None
        };

        Ok(RecordPage {
            records,
            next_cursor,
        })
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    counters: RwLock<HashMap<String, RateLimitCounter>>,
}

impl InMemoryRateLimitStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn get(&self, principal_id: &str) -> Result<Option<RateLimitCounter>, SummaryError> {
        Ok(self.counters.read().get(principal_id).cloned())
    }

    async fn put(&self, counter: &RateLimitCounter) -> Result<(), SummaryError> {
        self.counters
            .write()
            .insert(counter.id.clone(), counter.clone());
        Ok(())
    }
}
