//! DynamoDB backends.
//!
//! # Tables
//!
//! | Table                        | Key  | Notes                                        |
//! |------------------------------|------|----------------------------------------------|
//! | `web_page_summary[_<env>]`   | `id` | GSI `StatusIndex`: hash `task_status`, range `id` |
//! | `request_rate_limit[_<env>]` | `id` | `count`, `ttl` (epoch seconds, DynamoDB TTL) |
//!
//! Records are stored attribute-per-field. Updates are rendered from the
//! partial-update builder into a `SET` expression guarded by
//! `attribute_exists(id)`, so a record deleted underneath a worker surfaces
//! as `NotFound` instead of being recreated.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::{Map, Number, Value};
use tracing::debug;

use super::update::{UpdateFields, update_fields};
use super::{Cursor, RateLimitStore, RecordPage, RecordStore, resume_key};
use crate::core::{Principal, RateLimitCounter, SummaryRecord, TaskStatus};
use crate::errors::SummaryError;

const STATUS_INDEX: &str = "StatusIndex";

type Item = HashMap<String, AttributeValue>;

#[derive(Debug, Clone)]
pub struct DynamoDbRecordStore {
    client: Client,
    table_name: String,
}

impl DynamoDbRecordStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

// ---------------------------------------------------------------------------
// Attribute conversion
// ---------------------------------------------------------------------------

pub(crate) fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), to_attribute(v)))
                .collect(),
        ),
    }
}

pub(crate) fn from_attribute(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => n
            .parse::<i64>()
            .map(Value::from)
            .ok()
            .or_else(|| n.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number))
            .unwrap_or(Value::Null),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::L(items) => Value::Array(items.iter().map(from_attribute).collect()),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), from_attribute(v)))
                .collect(),
        ),
        _ => Value::Null,
    }
}

fn to_item<T: serde::Serialize>(value: &T) -> Result<Item, SummaryError> {
    let Value::Object(map) = serde_json::to_value(value)? else {
        return Err(SummaryError::StoreFailure(
            "item did not serialize to an object".to_string(),
        ));
    };
    Ok(map.iter().map(|(k, v)| (k.clone(), to_attribute(v))).collect())
}

fn from_item<T: serde::de::DeserializeOwned>(item: &Item) -> Result<T, SummaryError> {
    let map: Map<String, Value> = item
        .iter()
        .map(|(k, v)| (k.clone(), from_attribute(v)))
        .collect();
    Ok(serde_json::from_value(Value::Object(map))?)
}

/// `SET #f0 = :v0, #f1 = :v1` plus the placeholder maps. `None` when there is
/// nothing to set.
pub(crate) fn render_set_expression(
    fields: &UpdateFields,
) -> Option<(String, HashMap<String, String>, Item)> {
    if fields.is_empty() {
        return None;
    }
    let mut clauses = Vec::with_capacity(fields.len());
    let mut names = HashMap::new();
    let mut values = HashMap::new();
    for (i, (field, value)) in fields.iter().enumerate() {
        clauses.push(format!("#f{i} = :v{i}"));
        names.insert(format!("#f{i}"), field.clone());
        values.insert(format!(":v{i}"), to_attribute(value));
    }
    Some((format!("SET {}", clauses.join(", ")), names, values))
}

fn start_key(cursor: &Cursor) -> Item {
    let mut key = HashMap::from([("id".to_string(), AttributeValue::S(cursor.id.clone()))]);
    if let Some(status) = cursor.status {
        key.insert(
            "task_status".to_string(),
            AttributeValue::S(status.as_str().to_string()),
        );
    }
    key
}

fn cursor_from_key(key: Option<&Item>, status: Option<TaskStatus>) -> Option<String> {
    let id = key?.get("id")?.as_s().ok()?;
    Some(Cursor::new(id.clone(), status).encode())
}

// ---------------------------------------------------------------------------
// RecordStore implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl RecordStore for DynamoDbRecordStore {
    async fn create(&self, record: &SummaryRecord) -> Result<(), SummaryError> {
        let item = to_item(record)?;
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(id)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Err(SummaryError::AlreadyExists(record.id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get(&self, id: &str, principal: &Principal) -> Result<SummaryRecord, SummaryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(id.to_string()))
            .consistent_read(true)
            .send()
            .await?;

        let item = output
            .item()
            .filter(|item| !item.is_empty())
            .ok_or_else(|| SummaryError::NotFound(id.to_string()))?;
        let record: SummaryRecord = from_item(item)?;

        if let Principal::User(sub) = principal
            && record.owner_id.as_deref() != Some(sub.as_str())
        {
            return Err(SummaryError::NotFound(id.to_string()));
        }
        Ok(record)
    }

    async fn update(&self, record: &SummaryRecord) -> Result<(), SummaryError> {
        let fields = update_fields(record, "id")?;
        let mut request = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(record.id.clone()))
            .condition_expression("attribute_exists(id)");

        if let Some((expression, names, values)) = render_set_expression(&fields) {
            debug!(task_id = %record.id, expression = %expression, "rendered update");
            request = request
                .update_expression(expression)
                .set_expression_attribute_names(Some(names))
                .set_expression_attribute_values(Some(values));
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Err(SummaryError::NotFound(record.id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn list_by_status(
        &self,
        status: Option<TaskStatus>,
        cursor: Option<&str>,
        limit: i32,
    ) -> Result<RecordPage, SummaryError> {
        super::validate_limit(limit)?;
        let start = resume_key(cursor, status)?;

        let (items, last_key) = if let Some(status) = status {
            let output = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(STATUS_INDEX)
                .key_condition_expression("#s = :s")
                .expression_attribute_names("#s", "task_status")
                .expression_attribute_values(":s", AttributeValue::S(status.as_str().to_string()))
                .set_exclusive_start_key(start.as_ref().map(start_key))
                .limit(limit)
                .send()
                .await?;
            (output.items, output.last_evaluated_key)
        } else {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(start.as_ref().map(start_key))
                .limit(limit)
                .send()
                .await?;
            (output.items, output.last_evaluated_key)
        };

        let records = items
            .unwrap_or_default()
            .iter()
            .map(from_item::<SummaryRecord>)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RecordPage {
            records,
            next_cursor: cursor_from_key(last_key.as_ref(), status),
        })
    }
}

// ---------------------------------------------------------------------------
// RateLimitStore implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DynamoDbRateLimitStore {
    client: Client,
    table_name: String,
}

impl DynamoDbRateLimitStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl RateLimitStore for DynamoDbRateLimitStore {
    async fn get(&self, principal_id: &str) -> Result<Option<RateLimitCounter>, SummaryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(principal_id.to_string()))
            .send()
            .await?;

        match output.item() {
            Some(item) if !item.is_empty() => Ok(Some(from_item(item)?)),
            _ => Ok(None),
        }
    }

    async fn put(&self, counter: &RateLimitCounter) -> Result<(), SummaryError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_item(counter)?))
            .send()
            .await?;
        Ok(())
    }
}
