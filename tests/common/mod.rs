#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use tldr_pages::clients::{Scraper, Summarizer};
use tldr_pages::core::config::WorkerSettings;
use tldr_pages::core::{PageContents, RateLimitCounter, SummaryRecord};
use tldr_pages::errors::SummaryError;
use tldr_pages::queue::{InMemoryQueue, TaskQueue};
use tldr_pages::store::memory::InMemoryRecordStore;
use tldr_pages::store::{RateLimitStore, RecordStore};
use tldr_pages::worker::{SummaryPipeline, WorkerPool};

#[derive(Clone)]
pub enum Scrape {
    Page { title: String, content: String },
    Fail(String),
    /// Never resolves; only a deadline or cancellation ends it.
    Hang,
    /// Panics inside the worker unit.
    Panic,
}

impl Scrape {
    pub fn page(title: &str, content: &str) -> Self {
        Scrape::Page {
            title: title.to_string(),
            content: content.to_string(),
        }
    }
}

/// Scraper answering per URL, with a fallback for everything else.
pub struct StubScraper {
    by_url: HashMap<String, Scrape>,
    fallback: Scrape,
    pub calls: AtomicUsize,
}

impl StubScraper {
    pub fn always(behavior: Scrape) -> Self {
        Self {
            by_url: HashMap::new(),
            fallback: behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_url(mut self, url: &str, behavior: Scrape) -> Self {
        self.by_url.insert(url.to_string(), behavior);
        self
    }
}

#[async_trait]
impl Scraper for StubScraper {
    async fn fetch_contents(&self, url: &str) -> Result<PageContents, SummaryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.by_url.get(url).unwrap_or(&self.fallback).clone() {
            Scrape::Page { title, content } => Ok(PageContents { title, content }),
            Scrape::Fail(msg) => Err(SummaryError::UpstreamFailure(msg)),
            Scrape::Hang => std::future::pending().await,
            Scrape::Panic => panic!("scraper blew up on {url}"),
        }
    }
}

pub struct StubSummarizer {
    result: Result<String, String>,
    pub prompts: Mutex<Vec<String>>,
}

impl StubSummarizer {
    pub fn replying(summary: &str) -> Self {
        Self {
            result: Ok(summary.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            result: Err(msg.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
        self.prompts.lock().push(text.to_string());
        self.result.clone().map_err(SummaryError::UpstreamFailure)
    }
}

/// Counter store whose every call fails.
pub struct BrokenRateLimitStore;

#[async_trait]
impl RateLimitStore for BrokenRateLimitStore {
    async fn get(&self, _principal_id: &str) -> Result<Option<RateLimitCounter>, SummaryError> {
        Err(SummaryError::StoreFailure("connection refused".to_string()))
    }

    async fn put(&self, _counter: &RateLimitCounter) -> Result<(), SummaryError> {
        Err(SummaryError::StoreFailure("connection refused".to_string()))
    }
}

pub async fn seed_requested(store: &InMemoryRecordStore, id: &str, url: &str) {
    store
        .create(&SummaryRecord::new_requested(id, url, None, 1_700_000_000))
        .await
        .expect("seed record");
}

pub struct Harness {
    pub store: Arc<InMemoryRecordStore>,
    pub queue: Arc<InMemoryQueue>,
    pub scraper: Arc<StubScraper>,
    pub summarizer: Arc<StubSummarizer>,
}

impl Harness {
    pub fn new(scraper: StubScraper, summarizer: StubSummarizer) -> Self {
        Self {
            store: Arc::new(InMemoryRecordStore::new()),
            queue: Arc::new(InMemoryQueue::new()),
            scraper: Arc::new(scraper),
            summarizer: Arc::new(summarizer),
        }
    }

    pub fn pipeline(&self) -> SummaryPipeline {
        SummaryPipeline::new(self.store.clone(), self.scraper.clone(), self.summarizer.clone())
    }

    pub fn pool(&self, max_batch_size: usize, exec_timeout: Duration) -> WorkerPool {
        WorkerPool::new(
            Arc::new(self.pipeline()),
            self.queue.clone(),
            WorkerSettings {
                max_batch_size,
                exec_timeout,
            },
        )
    }

    pub async fn submit(&self, id: &str, url: &str) {
        seed_requested(&self.store, id, url).await;
        self.queue.enqueue(id).await.expect("enqueue");
    }

    pub fn record(&self, id: &str) -> SummaryRecord {
        self.store.snapshot(id).expect("record exists")
    }
}
