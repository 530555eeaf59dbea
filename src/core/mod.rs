//! Domain types, lifecycle rules and configuration

pub mod clock;
pub mod config;
pub mod models;
pub mod status;

pub use models::{PageContents, Principal, QueueMessage, RateLimitCounter, SummaryRecord};
pub use status::TaskStatus;
