//! Counter store backends
//!
//! Counters live in an external store keyed by (counter key, window
//! boundary). The contract requires atomic increment-and-read so the
//! gateway can scale out horizontally without lost updates; the
//! in-memory backend serializes through one lock and is meant for
//! development and single-instance deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use super::types::current_time_secs;

/// Result of one atomic counter increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Monotonically non-decreasing count within the current window
    pub count: u64,
    /// Unix timestamp of the deterministic window reset boundary
    pub reset_at: u64,
}

impl WindowCount {
    /// Seconds until the window resets, usable as a Retry-After value
    pub fn retry_after_secs(&self) -> u64 {
        self.reset_at.saturating_sub(current_time_secs()).max(1)
    }
}

/// Trait for counter store backends
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the counter for `key` in the current
    /// fixed window and return the new count with the reset boundary.
    async fn increment_and_get(&self, key: &str, window: Duration) -> Result<WindowCount, String>;

    /// Cleanup expired windows (for in-memory storage)
    async fn cleanup(&self);
}

/// Fixed-window boundary: windows start at multiples of the window
/// length, so the reset point is deterministic across instances.
fn window_bounds(now: u64, window: Duration) -> (u64, u64) {
    let len = window.as_secs().max(1);
    let start = (now / len) * len;
    (start, start + len)
}

struct CounterEntry {
    count: u64,
    reset_at: u64,
}

/// In-memory counter store for development/single instance
#[derive(Default)]
pub struct InMemoryCounterStore {
    counters: RwLock<HashMap<String, CounterEntry>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count for a key without incrementing (test helper)
    pub async fn peek(&self, key: &str, window: Duration) -> u64 {
        let (start, _) = window_bounds(current_time_secs(), window);
        let counters = self.counters.read().await;
        counters
            .get(&format!("{}:{}", key, start))
            .map(|e| e.count)
            .unwrap_or(0)
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment_and_get(&self, key: &str, window: Duration) -> Result<WindowCount, String> {
        let now = current_time_secs();
        let (start, reset_at) = window_bounds(now, window);
        let window_key = format!("{}:{}", key, start);

        let mut counters = self.counters.write().await;
        let entry = counters
            .entry(window_key)
            .or_insert(CounterEntry { count: 0, reset_at });
        entry.count += 1;

        Ok(WindowCount {
            count: entry.count,
            reset_at: entry.reset_at,
        })
    }

    async fn cleanup(&self) {
        let now = current_time_secs();
        let mut counters = self.counters.write().await;
        let before = counters.len();
        counters.retain(|_, entry| entry.reset_at > now);
        if counters.len() < before {
            debug!(
                removed = before - counters.len(),
                "Expired counter windows removed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_are_monotonic_within_window() {
        let store = InMemoryCounterStore::new();
        let window = Duration::from_secs(60);

        let mut last = 0;
        for _ in 0..5 {
            let result = store.increment_and_get("test:key", window).await.unwrap();
            assert!(result.count > last);
            last = result.count;
        }
        assert_eq!(last, 5);
    }

    #[tokio::test]
    async fn test_reset_boundary_is_deterministic() {
        let store = InMemoryCounterStore::new();
        let window = Duration::from_secs(60);

        let a = store.increment_and_get("test:key", window).await.unwrap();
        let b = store.increment_and_get("test:key", window).await.unwrap();
        assert_eq!(a.reset_at, b.reset_at);
        assert_eq!(a.reset_at % 60, 0);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = InMemoryCounterStore::new();
        let window = Duration::from_secs(60);

        store.increment_and_get("a", window).await.unwrap();
        store.increment_and_get("a", window).await.unwrap();
        let b = store.increment_and_get("b", window).await.unwrap();
        assert_eq!(b.count, 1);
    }

    #[tokio::test]
    async fn test_retry_after_bounded_by_window() {
        let store = InMemoryCounterStore::new();
        let window = Duration::from_secs(60);

        let result = store.increment_and_get("x", window).await.unwrap();
        let retry = result.retry_after_secs();
        assert!(retry >= 1);
        assert!(retry <= 60);
    }

    #[tokio::test]
    async fn test_peek_does_not_increment() {
        let store = InMemoryCounterStore::new();
        let window = Duration::from_secs(60);

        assert_eq!(store.peek("k", window).await, 0);
        store.increment_and_get("k", window).await.unwrap();
        assert_eq!(store.peek("k", window).await, 1);
        assert_eq!(store.peek("k", window).await, 1);
    }

    #[tokio::test]
    async fn test_cleanup_retains_live_windows() {
        let store = InMemoryCounterStore::new();
        let window = Duration::from_secs(60);

        store.increment_and_get("k", window).await.unwrap();
        store.cleanup().await;
        // The current window has not expired yet
        assert_eq!(store.peek("k", window).await, 1);
    }
}
