//! Cooperative cancellation, keyed by query id (spec §5 "cancellation is
//! cooperative: runners poll a flag between row batches").

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A single query's cancellation flag plus a notifier so a waiting
/// `await` can wake immediately instead of polling.
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<tokio::sync::Notify>,
}

impl CancellationToken {
    fn new() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)), notify: Arc::new(tokio::sync::Notify::new()) }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Resolves immediately if already cancelled, otherwise waits for the
    /// next `cancel()` call. Runners race this against their normal work
    /// future to react to cancellation without polling on a timer.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

impl Clone for CancellationToken {
    fn clone(&self) -> Self {
        Self { cancelled: self.cancelled.clone(), notify: self.notify.clone() }
    }
}

/// Registry of in-flight queries' cancellation tokens (spec §5 "Query
/// watcher"). A broker calls `cancel(query_id)`; every runner working
/// that query id observes it cooperatively.
#[derive(Default)]
pub struct QueryWatcher {
    tokens: DashMap<String, CancellationToken>,
}

impl QueryWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new query and hand back its token. Re-registering the
    /// same id (e.g. a retried sub-query) replaces the prior token.
    pub fn register(&self, query_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        self.tokens.insert(query_id.to_string(), token.clone());
        token
    }

    pub fn cancel(&self, query_id: &str) {
        if let Some(token) = self.tokens.get(query_id) {
            token.cancel();
        }
    }

    pub fn is_cancelled(&self, query_id: &str) -> bool {
        self.tokens.get(query_id).map(|t| t.is_cancelled()).unwrap_or(false)
    }

    /// Drop the token once a query has fully completed, so the registry
    /// does not grow without bound.
    pub fn deregister(&self, query_id: &str) {
        self.tokens.remove(query_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_wakes_a_waiting_task() {
        let watcher = QueryWatcher::new();
        let token = watcher.register("q1");
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        watcher.cancel("q1");
        tokio::time::timeout(std::time::Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[test]
    fn unregistered_query_is_never_cancelled() {
        let watcher = QueryWatcher::new();
        assert!(!watcher.is_cancelled("ghost"));
    }

    #[test]
    fn deregister_clears_the_token() {
        let watcher = QueryWatcher::new();
        watcher.register("q1");
        watcher.cancel("q1");
        assert!(watcher.is_cancelled("q1"));
        watcher.deregister("q1");
        assert!(!watcher.is_cancelled("q1"));
    }
}
