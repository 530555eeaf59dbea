//! Client modules for external API interactions
//!
//! The worker only depends on the [`Scraper`] and [`Summarizer`] traits; the
//! concrete clients below are what the Lambda binaries wire in.

pub mod llm_client;
pub mod scraper;

use async_trait::async_trait;

use crate::core::PageContents;
use crate::errors::SummaryError;

pub use llm_client::LlmClient;
pub use scraper::HttpScraper;

/// Fetches a page and extracts its title and readable text.
///
/// Implementations may be slow. Callers bound them with a deadline and drop
/// the future when it expires, so no work may continue after cancellation.
#[async_trait]
pub trait Scraper: Send + Sync {
    async fn fetch_contents(&self, url: &str) -> Result<PageContents, SummaryError>;
}

/// Turns a prompt into a summary via a language model.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError>;
}
