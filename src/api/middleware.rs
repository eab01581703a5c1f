//! Abuse guards on the credential-exchange routes: a per-IP sliding
//! window rate limit and a per-phone lockout after repeated login
//! failures. Both share the same in-memory window tracker.

use std::{
    collections::HashMap,
    hash::Hash,
    net::IpAddr,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::error::Error;

/// Sliding window of timestamps per key. Entries older than the
/// window are dropped on every touch.
#[derive(Clone, Debug)]
struct SlidingWindow<K> {
    limit: usize,
    window: Duration,
    hits: Arc<Mutex<HashMap<K, Vec<Instant>>>>,
}

impl<K: Eq + Hash> SlidingWindow<K> {
    fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            hits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Records a hit and reports whether the key is still under the limit.
    fn record(&self, key: K) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.lock().expect("window lock poisoned");
        let entry = hits.entry(key).or_default();
        entry.retain(|&t| now - t < self.window);
        if entry.len() < self.limit {
            entry.push(now);
            true
        } else {
            false
        }
    }

    /// Checks the limit without recording a hit.
    fn at_limit(&self, key: &K) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.lock().expect("window lock poisoned");
        match hits.get_mut(key) {
            Some(entry) => {
                entry.retain(|&t| now - t < self.window);
                entry.len() >= self.limit
            }
            None => false,
        }
    }

    fn reset(&self, key: &K) {
        self.hits.lock().expect("window lock poisoned").remove(key);
    }
}

/// Per-IP request limiter for the auth router.
#[derive(Clone, Debug)]
pub struct RateLimiter(SlidingWindow<IpAddr>);

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self(SlidingWindow::new(max_requests, window))
    }

    /// Default for the auth routes: 30 requests per minute per IP.
    pub fn auth_default() -> Self {
        let max = std::env::var("FIELDREPORT_AUTH_RATE_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        Self::new(max, Duration::from_secs(60))
    }

    pub fn check(&self, ip: IpAddr) -> bool {
        self.0.record(ip)
    }
}

/// Lockout tracking for failed logins, keyed by phone number.
/// Five failures inside fifteen minutes lock the account until the
/// window slides past.
#[derive(Clone, Debug)]
pub struct LoginGuard(SlidingWindow<String>);

impl Default for LoginGuard {
    fn default() -> Self {
        Self(SlidingWindow::new(5, Duration::from_secs(15 * 60)))
    }
}

impl LoginGuard {
    pub fn is_locked(&self, phone: &str) -> bool {
        self.0.at_limit(&phone.to_string())
    }

    pub fn record_failure(&self, phone: &str) {
        self.0.record(phone.to_string());
    }

    pub fn clear(&self, phone: &str) {
        self.0.reset(&phone.to_string());
    }
}

/// Rate limiting middleware applied to the auth router.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(&request);
    if state.rate_limiter.check(ip) {
        next.run(request).await
    } else {
        tracing::warn!(%ip, "Rate limit exceeded");
        Error::RateLimited.into_response()
    }
}

/// Client IP from proxy headers, falling back to loopback.
fn client_ip(request: &Request<Body>) -> IpAddr {
    let header_ip = |name: &str| -> Option<IpAddr> {
        let value = request.headers().get(name)?.to_str().ok()?;
        value.split(',').next()?.trim().parse().ok()
    };
    header_ip("X-Forwarded-For")
        .or_else(|| header_ip("X-Real-IP"))
        .unwrap_or(IpAddr::from([127, 0, 0, 1]))
}
