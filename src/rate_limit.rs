//! Per-principal fixed-window request counter.
//!
//! The first request in a window creates the counter with `count = 1` and
//! `expiry = now + window`; later requests increment it until `max` is
//! reached. The window does not slide, so a burst straddling a window
//! boundary can admit up to `2 * max` requests. Store errors are never
//! swallowed: the caller sees `StoreFailure` and must not admit the request.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::core::clock::{Clock, SystemClock};
use crate::core::{Principal, RateLimitCounter};
use crate::errors::SummaryError;
use crate::store::RateLimitStore;

pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn RateLimitStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Returns whether the request is admitted, counting it if so.
    ///
    /// # Errors
    ///
    /// `StoreFailure` when the counter cannot be read or written.
    pub async fn check_and_increment(
        &self,
        principal: &Principal,
        max: u32,
        window: Duration,
    ) -> Result<bool, SummaryError> {
        let Principal::User(principal_id) = principal else {
            return Ok(true);
        };

        let now = self.clock.now_epoch();
        let existing = self
            .store
            .get(principal_id)
            .await?
            .filter(|counter| !counter.is_expired(now));

        let Some(mut counter) = existing else {
            let window_secs = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
            let fresh = RateLimitCounter {
                id: principal_id.clone(),
                count: 1,
                expiry: now.saturating_add(window_secs),
            };
            self.store.put(&fresh).await?;
            info!(principal = %principal_id, expiry = fresh.expiry, "rate limit window opened");
            return Ok(true);
        };

        if counter.count >= max {
            warn!(principal = %principal_id, count = counter.count, max, "rate limit exceeded");
            return Ok(false);
        }

        counter.count += 1;
        self.store.put(&counter).await?;
        Ok(true)
    }

    /// Same as [`check_and_increment`](Self::check_and_increment) but turns a
    /// denial into `TooManyRequests`.
    ///
    /// # Errors
    ///
    /// `TooManyRequests` on denial, `StoreFailure` on store errors.
    pub async fn enforce(
        &self,
        principal: &Principal,
        max: u32,
        window: Duration,
    ) -> Result<(), SummaryError> {
        if self.check_and_increment(principal, max, window).await? {
            Ok(())
        } else {
            let id = principal.owner_id().unwrap_or_default().to_string();
            Err(SummaryError::TooManyRequests(id))
        }
    }
}
