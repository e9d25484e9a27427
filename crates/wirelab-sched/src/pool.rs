//! Bounded worker pool over a closed work queue.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

/// Runs `handler` over `items` with at most `workers` concurrent tasks.
///
/// All items are queued up front and the sender dropped, so every worker
/// drains the shared receiver until it is empty and then exits. Returns
/// when all items have been handled. The handler is responsible for its
/// own error reporting; a failed item never aborts the pool.
pub async fn run_pool<T, F, Fut>(name: &str, workers: usize, items: Vec<T>, handler: F)
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = ()> + Send,
{
    if items.is_empty() {
        return;
    }
    let workers = workers.max(1).min(items.len());
    tracing::debug!(pool = name, workers, items = items.len(), "starting worker pool");

    let (tx, rx) = mpsc::channel::<T>(items.len());
    for item in items {
        // capacity equals the item count, send never blocks
        if tx.send(item).await.is_err() {
            break;
        }
    }
    drop(tx);

    let rx = Arc::new(Mutex::new(rx));
    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let rx = Arc::clone(&rx);
        let handler = handler.clone();
        handles.push(tokio::spawn(async move {
            loop {
                let item = rx.lock().await.recv().await;
                match item {
                    Some(item) => handler(item).await,
                    None => break,
                }
            }
        }));
    }

    for handle in handles {
        // workers never panic unless the handler does
        let _ = handle.await;
    }
    tracing::debug!(pool = name, "worker pool drained");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_all_items_handled() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = Arc::clone(&seen);
        run_pool("test", 4, (0..20).collect(), move |_item: usize| {
            let seen = Arc::clone(&seen2);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;
        assert_eq!(seen.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (live2, peak2) = (Arc::clone(&live), Arc::clone(&peak));

        run_pool("test", 2, (0..10).collect(), move |_item: usize| {
            let live = Arc::clone(&live2);
            let peak = Arc::clone(&peak2);
            async move {
                let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                live.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_items_returns() {
        run_pool("test", 4, Vec::<usize>::new(), |_| async {}).await;
    }

    #[tokio::test]
    async fn test_single_worker_is_serial() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let order2 = Arc::clone(&order);
        run_pool("test", 1, vec![1, 2, 3], move |item: i32| {
            let order = Arc::clone(&order2);
            async move {
                order.lock().await.push(item);
            }
        })
        .await;
        assert_eq!(*order.lock().await, vec![1, 2, 3]);
    }
}
