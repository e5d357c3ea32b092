//! Rate limiting middleware with per-endpoint-class token buckets.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::{BucketConfig, RateLimitConfig};
use crate::http::response::ApiError;
use crate::observability::metrics;

/// Path of the script execution endpoint, which gets the stricter bucket.
pub const EXECUTION_PATH: &str = "/run-script";

/// Endpoints are grouped into classes that each get their own bucket set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    /// Launches processes.
    Execution,
    /// Informational endpoints.
    Standard,
}

impl EndpointClass {
    pub fn for_path(path: &str) -> Self {
        if path == EXECUTION_PATH {
            Self::Execution
        } else {
            Self::Standard
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Execution => "execution",
            Self::Standard => "standard",
        }
    }
}

/// Outcome of a single admission attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// A token was spent.
    Admitted { remaining: f64 },
    /// Not enough tokens; one will be available after `retry_after_secs`.
    Limited { retry_after_secs: f64 },
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted { .. })
    }
}

/// A simple token bucket. Capacity and refill rate are supplied per call.
#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    fn try_consume(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> Decision {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_refill = now;

        if self.tokens < 1.0 {
            Decision::Limited {
                retry_after_secs: (1.0 - self.tokens) / refill_rate,
            }
        } else {
            self.tokens -= 1.0;
            Decision::Admitted {
                remaining: self.tokens,
            }
        }
    }

    /// True once enough time has passed for the bucket to be full again.
    fn is_replenished(&self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens + elapsed * refill_rate >= capacity
    }
}

/// Per-client token buckets, one set per endpoint class, behind a single lock.
pub struct RateLimiter {
    buckets: Mutex<HashMap<(String, EndpointClass), TokenBucket>>,
    execution: BucketConfig,
    standard: BucketConfig,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            execution: config.execution,
            standard: config.standard,
        }
    }

    fn limits(&self, class: EndpointClass) -> (f64, f64) {
        let bucket = match class {
            EndpointClass::Execution => self.execution,
            EndpointClass::Standard => self.standard,
        };
        (f64::from(bucket.capacity), bucket.refill_per_second)
    }

    // The table holds plain numbers, so a panic mid-update cannot leave it
    // inconsistent; recover the guard instead of propagating the poison.
    fn lock(&self) -> MutexGuard<'_, HashMap<(String, EndpointClass), TokenBucket>> {
        self.buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Refill, decide and persist in one critical section.
    pub fn try_consume(&self, client: &str, class: EndpointClass, now: Instant) -> Decision {
        let (capacity, refill_rate) = self.limits(class);

        let mut buckets = self.lock();
        let bucket = buckets
            .entry((client.to_string(), class))
            .or_insert_with(|| {
                tracing::debug!(client = %client, class = class.as_str(), tokens = capacity, "New client bucket");
                TokenBucket::new(capacity, now)
            });

        bucket.try_consume(capacity, refill_rate, now)
    }

    /// Drop buckets that have refilled to capacity. A fresh bucket behaves
    /// identically, so admission decisions are unaffected.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let mut buckets = self.lock();
        let before = buckets.len();
        buckets.retain(|(_, class), bucket| {
            let (capacity, refill_rate) = self.limits(*class);
            !bucket.is_replenished(capacity, refill_rate, now)
        });
        before - buckets.len()
    }

    /// Number of tracked (client, class) pairs.
    pub fn tracked(&self) -> usize {
        self.lock().len()
    }

    /// Periodically evict idle buckets until the shutdown signal fires.
    pub async fn run_eviction(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: tokio::sync::broadcast::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.evict_idle(Instant::now());
                    if evicted > 0 {
                        tracing::debug!(evicted, remaining = self.tracked(), "Evicted idle rate limit buckets");
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
    }
}

/// Seconds to advertise in `Retry-After`: rounded up, never zero.
pub fn retry_after_header_secs(retry_after_secs: f64) -> u64 {
    // Float to int casts saturate.
    retry_after_secs.ceil().max(1.0) as u64
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = addr.ip().to_string();
    let path = request.uri().path().to_string();
    let class = EndpointClass::for_path(&path);

    match limiter.try_consume(&client, class, Instant::now()) {
        Decision::Admitted { remaining } => {
            tracing::debug!(client = %client, class = class.as_str(), remaining, "Token consumed");
            next.run(request).await
        }
        Decision::Limited { retry_after_secs } => {
            tracing::warn!(
                client = %client,
                path = %path,
                class = class.as_str(),
                retry_after_secs,
                "Rate limit exceeded"
            );
            metrics::record_rejection("rate_limited");
            ApiError::RateLimited { retry_after_secs }.into_response()
        }
    }
}
