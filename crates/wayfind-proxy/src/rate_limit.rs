//! Fixed-window rate limiter middleware.
//!
//! Allows `max` requests per window of `window_secs` seconds using atomic
//! counters that reset when a new window starts. Applied to `/api/*`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Extension, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;

/// Shared state for the rate limiter.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    max: u64,
    window_secs: u64,
    count: Arc<AtomicU64>,
    /// Index of the current window (epoch seconds / window length).
    window: Arc<AtomicU64>,
}

impl RateLimiter {
    pub fn new(max: u64, window_secs: u64) -> Self {
        Self {
            max,
            window_secs: window_secs.max(1),
            count: Arc::new(AtomicU64::new(0)),
            window: Arc::new(AtomicU64::new(u64::MAX)),
        }
    }

    /// Try to acquire a permit. Returns true if the request is allowed.
    pub fn try_acquire(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.try_acquire_at(now)
    }

    fn try_acquire_at(&self, epoch_secs: u64) -> bool {
        let current = epoch_secs / self.window_secs;
        if self.window.swap(current, Ordering::Relaxed) != current {
            self.count.store(1, Ordering::Relaxed);
            return self.max > 0;
        }
        self.count.fetch_add(1, Ordering::Relaxed) < self.max
    }
}

/// Axum middleware that enforces the rate limit.
pub async fn rate_limit_middleware(
    Extension(limiter): Extension<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    if limiter.try_acquire() {
        next.run(req).await
    } else {
        tracing::warn!(path = %req.uri().path(), "Rate limit exceeded");
        ApiError::TooManyRequests.into_response()
    }
}
