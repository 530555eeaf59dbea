//! API Lambda handler - thin router over [`TaskService`].
//!
//! Routes:
//! - `GET /health`
//! - `POST /task` with `{"url": ...}` -> `{"task_id": ...}`
//! - `GET /task/{id}`
//! - `GET /tasks?status=&next_token=&limit=` -> `{"tasks": [...], "nextToken": ...}`

use std::sync::Arc;

use lambda_runtime::{Error, LambdaEvent};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use super::{helpers, parsing};
use crate::core::Principal;
use crate::core::config::AppConfig;
use crate::errors::SummaryError;
use crate::queue::SqsQueue;
use crate::rate_limit::RateLimiter;
use crate::service::{RequestBudget, TaskService};
use crate::store::dynamodb::{DynamoDbRateLimitStore, DynamoDbRecordStore};

pub use self::function_handler as handler;

/// What a request needs besides its payload.
pub struct ApiContext {
    pub service: TaskService,
    pub api_key: Option<String>,
}

impl ApiContext {
    pub async fn from_config(config: &AppConfig) -> Self {
        let shared_config = aws_config::from_env().load().await;
        let dynamodb = aws_sdk_dynamodb::Client::new(&shared_config);
        let store = DynamoDbRecordStore::new(dynamodb.clone(), config.summary_table());
        let counters = DynamoDbRateLimitStore::new(dynamodb, config.rate_limit_table());
        let queue = SqsQueue::new(
            aws_sdk_sqs::Client::new(&shared_config),
            config.queue_url.clone(),
        );
        let budget = RequestBudget {
            max: config.rate_limit_max,
            window: config.rate_limit_window(),
        };
        Self {
            service: TaskService::new(Arc::new(store), Arc::new(queue))
                .with_rate_limit(RateLimiter::new(Arc::new(counters)), budget),
            api_key: config.api_key.clone(),
        }
    }
}

/// Lambda handler for the API entrypoint.
///
/// # Errors
///
/// Returns an error only if configuration cannot be loaded; request-level
/// failures become error responses.
#[tracing::instrument(level = "info", skip(event))]
pub async fn function_handler(
    event: LambdaEvent<serde_json::Value>,
) -> Result<impl Serialize, Error> {
    let config = AppConfig::from_env().map_err(|e| {
        error!("Config error: {}", e);
        Error::from(e)
    })?;
    let ctx = ApiContext::from_config(&config).await;
    Ok(route(&ctx, &event.payload).await)
}

/// Dispatches one API Gateway proxy event.
pub async fn route(ctx: &ApiContext, payload: &Value) -> Value {
    let method = parsing::request_method(payload);
    let path = parsing::request_path(payload);
    info!(method = %method, path = %path, "API request");

    if path.ends_with("/health") {
        return helpers::ok_json(200, &json!({ "status": "ok" }));
    }

    let Some(principal) = parsing::resolve_principal(payload, ctx.api_key.as_deref()) else {
        warn!("Request without a valid principal");
        return helpers::err_response(401, "Unauthorized");
    };

    let result = match (method, path_route(payload, path)) {
        ("POST", Route::CreateTask) => create_task(ctx, &principal, payload).await,
        ("GET", Route::GetTask(id)) => ctx
            .service
            .get_task(&principal, &id)
            .await
            .and_then(|record| Ok(serde_json::to_value(record)?)),
        ("GET", Route::ListTasks) => list_tasks(ctx, &principal, payload).await,
        (_, Route::NotFound) => return helpers::err_response(404, "Not found"),
        _ => return helpers::err_response(405, "Method not allowed"),
    };

    match result {
        Ok(body) => helpers::ok_json(200, &body),
        Err(e) => {
            if e.status_code() >= 500 {
                error!("Request failed: {}", e);
            } else {
                info!("Request rejected: {}", e);
            }
            helpers::error_response(&e)
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Route {
    CreateTask,
    GetTask(String),
    ListTasks,
    NotFound,
}

fn path_route(payload: &Value, path: &str) -> Route {
    if path.ends_with("/tasks") {
        return Route::ListTasks;
    }
    if path.ends_with("/task") {
        return Route::CreateTask;
    }
    if let Some(id) = parsing::v_str(payload, &["pathParameters", "id"]) {
        return Route::GetTask(id.to_string());
    }
    match path.rsplit_once("/task/") {
        Some((_, id)) if !id.is_empty() && !id.contains('/') => Route::GetTask(id.to_string()),
        _ => Route::NotFound,
    }
}

async fn create_task(
    ctx: &ApiContext,
    principal: &Principal,
    payload: &Value,
) -> Result<Value, SummaryError> {
    let body = parsing::json_body(payload)?;
    let url = body.get("url").and_then(Value::as_str).unwrap_or_default();
    let task_id = ctx.service.create_task(principal, url).await?;
    Ok(json!({ "task_id": task_id }))
}

async fn list_tasks(
    ctx: &ApiContext,
    principal: &Principal,
    payload: &Value,
) -> Result<Value, SummaryError> {
    let status = parsing::query_param(payload, "status");
    let next_token = parsing::query_param(payload, "next_token");
    let limit = parsing::query_param(payload, "limit")
        .map(|raw| {
            raw.parse::<i32>()
                .map_err(|e| SummaryError::InvalidArgument(format!("limit: {e}")))
        })
        .transpose()?;

    let page = ctx
        .service
        .list_tasks(principal, status.as_deref(), next_token.as_deref(), limit)
        .await?;

    let mut body = json!({ "tasks": page.records });
    if let Some(next) = page.next_cursor {
        body["nextToken"] = Value::String(next);
    }
    Ok(body)
}
