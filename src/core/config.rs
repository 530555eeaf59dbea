use std::env;
use std::time::Duration;

const DEFAULT_MAX_BATCH_SIZE: usize = 10;
const DEFAULT_RATE_LIMIT_MAX: u32 = 10;
const DEFAULT_RATE_LIMIT_WINDOW_SEC: u64 = 86_400;
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

const SUMMARY_TABLE: &str = "web_page_summary";
const RATE_LIMIT_TABLE: &str = "request_rate_limit";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Option<String>,
    pub queue_url: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub api_key: Option<String>,
    pub max_batch_size: usize,
    pub exec_timeout_sec: Option<u64>,
    pub rate_limit_max: u32,
    pub rate_limit_window_sec: u64,
}

/// Settings the worker pool needs for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    pub max_batch_size: usize,
    pub exec_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            env: env::var("ENV").ok().filter(|s| !s.is_empty()),
            queue_url: env::var("QUEUE_URL").map_err(|e| format!("QUEUE_URL: {}", e))?,
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string()),
            api_key: env::var("API_KEY").ok().filter(|s| !s.is_empty()),
            max_batch_size: parse_var("MAX_BATCH_SIZE")?.unwrap_or(DEFAULT_MAX_BATCH_SIZE),
            exec_timeout_sec: parse_var("EXEC_TIMEOUT_SEC")?,
            rate_limit_max: parse_var("REQUEST_RATE_LIMIT_MAX")?.unwrap_or(DEFAULT_RATE_LIMIT_MAX),
            rate_limit_window_sec: parse_var("REQUEST_RATE_LIMIT_WINDOW_SEC")?
                .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SEC),
        })
    }

    pub fn is_local(&self) -> bool {
        self.env.as_deref() == Some("local")
    }

    pub fn summary_table(&self) -> String {
        table_name(SUMMARY_TABLE, self.env.as_deref())
    }

    pub fn rate_limit_table(&self) -> String {
        table_name(RATE_LIMIT_TABLE, self.env.as_deref())
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_sec)
    }

    /// The per-task deadline has no default; the worker must be told.
    pub fn worker_settings(&self) -> Result<WorkerSettings, String> {
        let exec_timeout_sec = self
            .exec_timeout_sec
            .ok_or_else(|| "EXEC_TIMEOUT_SEC: must be set for the worker".to_string())?;
        if exec_timeout_sec == 0 {
            return Err("EXEC_TIMEOUT_SEC: must be greater than zero".to_string());
        }
        if self.max_batch_size == 0 {
            return Err("MAX_BATCH_SIZE: must be greater than zero".to_string());
        }
        Ok(WorkerSettings {
            max_batch_size: self.max_batch_size,
            exec_timeout: Duration::from_secs(exec_timeout_sec),
        })
    }
}

pub fn table_name(base: &str, env: Option<&str>) -> String {
    match env {
        Some(env) => format!("{base}_{env}"),
        None => base.to_string(),
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, String>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("{}: {}", name, e)),
        _ => Ok(None),
    }
}
