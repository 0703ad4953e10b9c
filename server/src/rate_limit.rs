//! Fixed-window rate limiting.
//!
//! The contract is `check(key) -> Decision`; handlers key on the caller's
//! IP. [`LocalRateLimiter`] keeps its counters in process memory, which
//! only holds up on a single instance — scaling horizontally means
//! swapping in an implementation backed by a shared counter store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::http::HeaderMap;

const SWEEP_PERIOD: Duration = Duration::from_secs(300);

pub struct Decision {
    pub allowed: bool,
    pub remaining: u32,
}

pub trait RateLimit: Send + Sync {
    fn check(&self, key: &str) -> Decision;
}

pub struct LocalRateLimiter {
    interval: Duration,
    limit: u32,
    entries: Mutex<HashMap<String, Entry>>,
}

struct Entry {
    count: u32,
    window_start: Instant,
}

impl LocalRateLimiter {
    pub fn new(interval: Duration, limit: u32) -> Arc<Self> {
        Arc::new(Self {
            interval,
            limit,
            entries: Mutex::new(HashMap::new()),
        })
    }

    /// Periodically drops expired windows so idle keys do not accumulate.
    pub fn spawn_sweeper(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_PERIOD);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(limiter) = weak.upgrade() else { break };
                limiter.sweep();
            }
        });
    }

    fn sweep(&self) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, entry| entry.window_start.elapsed() <= self.interval);
    }
}

impl RateLimit for LocalRateLimiter {
    fn check(&self, key: &str) -> Decision {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(key.to_string()).or_insert(Entry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) > self.interval {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.limit {
            return Decision {
                allowed: false,
                remaining: 0,
            };
        }

        entry.count += 1;
        Decision {
            allowed: true,
            remaining: self.limit - entry.count,
        }
    }
}

/// Rate-limit key for a request: first hop of `x-forwarded-for`, then
/// `x-real-ip`, then a shared bucket.
pub fn client_key(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.to_string();
    }
    "unknown".to_string()
}
