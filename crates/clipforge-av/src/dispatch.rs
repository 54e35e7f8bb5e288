//! Completion contexts.
//!
//! Conversions finish on a background task, but their completion handlers are
//! always re-delivered through a [`CompletionContext`]. With a [`MainQueue`]
//! the handler runs on whichever thread drains the queue, which lets a UI
//! thread touch its own state from inside the handler without locking.

use std::time::Duration;
use tokio::sync::mpsc;

/// A unit of work delivered to a completion context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Somewhere completion handlers run.
pub trait CompletionContext: Send + Sync {
    fn dispatch(&self, job: Job);
}

/// Runs jobs immediately on the task that completed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl CompletionContext for Inline {
    fn dispatch(&self, job: Job) {
        job();
    }
}

/// A serial queue drained by its owner, standing in for a UI main queue.
///
/// Hand out [`MainQueueHandle`]s to the transcoder and drain the queue with
/// [`MainQueue::run_next`] or [`MainQueue::run_until_idle`] from the thread
/// that owns UI state.
pub struct MainQueue {
    tx: mpsc::UnboundedSender<Job>,
    rx: mpsc::UnboundedReceiver<Job>,
}

/// Sending side of a [`MainQueue`].
#[derive(Clone)]
pub struct MainQueueHandle {
    tx: mpsc::UnboundedSender<Job>,
}

impl MainQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn handle(&self) -> MainQueueHandle {
        MainQueueHandle {
            tx: self.tx.clone(),
        }
    }

    /// Wait for the next job and run it on the calling thread.
    pub async fn run_next(&mut self) {
        if let Some(job) = self.rx.recv().await {
            job();
        }
    }

    /// Like [`run_next`](Self::run_next), giving up after `timeout`.
    ///
    /// Returns whether a job ran.
    pub async fn run_next_within(&mut self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(job)) => {
                job();
                true
            }
            _ => false,
        }
    }

    /// Run every job already queued without waiting. Returns how many ran.
    pub fn run_until_idle(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }
}

impl Default for MainQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionContext for MainQueueHandle {
    fn dispatch(&self, job: Job) {
        if self.tx.send(job).is_err() {
            tracing::warn!("Main queue is gone, dropping completion handler");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_inline_runs_immediately() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        Inline.dispatch(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_main_queue_defers_until_drained() {
        let mut queue = MainQueue::new();
        let handle = queue.handle();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = Arc::clone(&hits);
            handle.dispatch(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(queue.run_until_idle(), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_main_queue_runs_on_draining_thread() {
        let mut queue = MainQueue::new();
        let handle = queue.handle();
        let (seen_tx, seen_rx) = std::sync::mpsc::channel();

        tokio::spawn(async move {
            handle.dispatch(Box::new(move || {
                let _ = seen_tx.send(std::thread::current().id());
            }));
        });

        queue.run_next().await;
        assert_eq!(seen_rx.recv().unwrap(), std::thread::current().id());
    }

    #[tokio::test]
    async fn test_run_next_within_times_out() {
        let mut queue = MainQueue::new();
        assert!(!queue.run_next_within(Duration::from_millis(20)).await);
    }
}
