//! Hand-off of results onto the caller's main context.
//!
//! Downstream consumers are not required to be thread-safe, so results of
//! background work are never handed to them from a worker thread. Instead
//! each result is posted as a job to a [MainContext] and executed when the
//! owner of the [MainContextQueue] drains it on its own thread.

use tokio::sync::mpsc;
use tracing::{trace, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Sending half: posts callbacks to the main context.
#[derive(Clone, Debug)]
pub struct MainContext {
    sender: mpsc::UnboundedSender<Job>,
}

/// Receiving half: runs posted callbacks on the thread that owns it.
#[derive(Debug)]
pub struct MainContextQueue {
    receiver: mpsc::UnboundedReceiver<Job>,
}

/// Create a connected [MainContext] and [MainContextQueue].
pub fn main_context() -> (MainContext, MainContextQueue) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (MainContext { sender }, MainContextQueue { receiver })
}

impl MainContext {
    /// Post `callback(value)` to the main context.
    ///
    /// The callback runs at most once. Returns `false` if the queue was
    /// dropped, in which case the undelivered result is logged.
    pub fn deliver<T, F>(&self, what: &'static str, value: T, callback: F) -> bool
    where
        T: Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        let job: Job = Box::new(move || callback(value));
        match self.sender.send(job) {
            Ok(()) => {
                trace!(what, "posted result to main context");
                true
            },
            Err(_) => {
                warn!(what, "main context is closed, result was not delivered");
                false
            },
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl MainContextQueue {
    /// Run every callback posted so far, without waiting.
    ///
    /// Returns the number of callbacks run.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Wait for the next callback and run it.
    ///
    /// Returns `false` once every [MainContext] is dropped and the queue is
    /// empty.
    pub async fn run_next(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(job) => {
                job();
                true
            },
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::logging::test_helpers::test_subscriber;

    #[test]
    fn callbacks_run_only_when_drained() {
        let (context, mut queue) = main_context();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        assert!(context.deliver("answer", 42, move |value: i32| {
            assert_eq!(value, 42);
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(queue.run_pending(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(queue.run_pending(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callbacks_run_on_draining_thread() {
        let (context, mut queue) = main_context();
        let main_thread = std::thread::current().id();
        let ran_on = Arc::new(std::sync::Mutex::new(None));

        let slot = ran_on.clone();
        std::thread::spawn(move || {
            context.deliver("thread", (), move |()| {
                *slot.lock().unwrap() = Some(std::thread::current().id());
            });
        })
        .join()
        .unwrap();

        queue.run_pending();
        assert_eq!(*ran_on.lock().unwrap(), Some(main_thread));
    }

    #[tokio::test]
    async fn run_next_ends_when_contexts_are_dropped() {
        let (context, mut queue) = main_context();
        context.deliver("last", (), |()| {});
        drop(context);

        assert!(queue.run_next().await);
        assert!(!queue.run_next().await);
    }

    #[test]
    fn delivery_to_closed_context_is_reported() {
        let (subscriber, writer) = test_subscriber();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (context, queue) = main_context();
        drop(queue);

        assert!(context.is_closed());
        assert!(!context.deliver("search results", (), |()| {}));
        assert!(writer.to_string().contains("result was not delivered"));
    }
}
