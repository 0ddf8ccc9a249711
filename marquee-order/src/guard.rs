use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Whether the consumer of an in-flight call still wants its result.
///
/// Cheap to clone; all clones observe the same flag.
#[derive(Debug, Clone)]
pub struct Relevance {
    live: Arc<AtomicBool>,
}

impl Default for Relevance {
    fn default() -> Self {
        Self::new()
    }
}

impl Relevance {
    pub fn new() -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn release(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Hand `value` over only if the consumer is still interested.
    pub fn deliver<T>(&self, value: T) -> Option<T> {
        self.is_live().then_some(value)
    }

    /// Await `work` to completion, then drop its output if the consumer left.
    ///
    /// The call itself is not cancelled; side effects such as cache
    /// updates still happen.
    pub async fn settle<F: Future>(&self, work: F) -> Option<F::Output> {
        let output = work.await;
        self.deliver(output)
    }
}

/// A view that owns a [`Relevance`] and releases it when dropped.
#[derive(Debug, Default)]
pub struct ViewScope {
    relevance: Relevance,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relevance(&self) -> Relevance {
        self.relevance.clone()
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.relevance.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_results_after_release_are_dropped() {
        let relevance = Relevance::new();
        assert_eq!(relevance.settle(async { 7 }).await, Some(7));

        let consumer = relevance.clone();
        let (tx, rx) = tokio::sync::oneshot::channel::<u32>();
        let pending = tokio::spawn(async move {
            consumer
                .settle(async move { rx.await.unwrap_or(0) })
                .await
        });

        relevance.release();
        tx.send(9).unwrap();
        assert_eq!(pending.await.unwrap(), None);
    }

    #[test]
    fn test_scope_releases_on_drop() {
        let scope = ViewScope::new();
        let relevance = scope.relevance();
        assert!(relevance.is_live());
        drop(scope);
        assert!(!relevance.is_live());
        assert_eq!(relevance.deliver("late"), None);
    }
}
