// src/watch/debounce.rs

use std::future::Future;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

/// A restartable single-shot timer used to coalesce event bursts.
///
/// `schedule` cancels any pending action and arms a new one; after the
/// delay elapses with no further `schedule` call, the action runs exactly
/// once as a task on the runtime behind `handle`. The action never runs
/// inline: even with a zero delay it goes through the runtime's queue, so
/// it is safe to call `schedule` from a non-runtime thread (the watcher's
/// notification thread) and still have the action execute on the
/// scheduler.
#[derive(Debug)]
pub struct DebounceTimer {
    handle: Handle,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DebounceTimer {
    /// Create a timer that schedules onto the runtime behind `handle`.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            pending: Mutex::new(None),
        }
    }

    /// Cancel any pending action and arm a new one.
    ///
    /// Last event wins: a burst of `schedule` calls closer together than
    /// `delay` results in exactly one action, `delay` after the last call.
    pub fn schedule<F>(&self, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        });

        let mut slot = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = slot.replace(task) {
            trace!("debounce re-armed; aborting previous timer");
            prev.abort();
        }
    }

    /// Cancel the pending action, if any. Idempotent.
    pub fn cancel(&self) {
        let mut slot = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = slot.take() {
            task.abort();
        }
    }

    /// Returns true if a timer is armed and has not yet fired.
    pub fn is_pending(&self) -> bool {
        let slot = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().is_some_and(|t| !t.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::advance;

    fn counter_action(fired: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + use<> {
        let fired = Arc::clone(fired);
        async move {
            fired.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn settle() {
        // Let the spawned timer task run after the clock moved.
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let timer = DebounceTimer::new(Handle::current());
        let fired = Arc::new(AtomicUsize::new(0));

        timer.schedule(Duration::from_millis(100), counter_action(&fired));
        assert!(timer.is_pending());
        settle().await;

        advance(Duration::from_millis(99)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        advance(Duration::from_millis(2)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_restarts_the_countdown() {
        let timer = DebounceTimer::new(Handle::current());
        let fired = Arc::new(AtomicUsize::new(0));

        timer.schedule(Duration::from_millis(100), counter_action(&fired));
        settle().await;
        advance(Duration::from_millis(60)).await;
        settle().await;

        // Re-arm before expiry: the countdown starts over.
        timer.schedule(Duration::from_millis(100), counter_action(&fired));
        settle().await;
        advance(Duration::from_millis(60)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        advance(Duration::from_millis(50)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_schedules_fires_exactly_once() {
        let timer = DebounceTimer::new(Handle::current());
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            timer.schedule(Duration::from_millis(50), counter_action(&fired));
            advance(Duration::from_millis(10)).await;
            settle().await;
        }

        advance(Duration::from_millis(60)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_the_action() {
        let timer = DebounceTimer::new(Handle::current());
        let fired = Arc::new(AtomicUsize::new(0));

        timer.schedule(Duration::from_millis(50), counter_action(&fired));
        timer.cancel();
        assert!(!timer.is_pending());

        advance(Duration::from_millis(200)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        // Cancel with nothing pending is a no-op.
        timer.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_still_defers_to_the_scheduler() {
        let timer = DebounceTimer::new(Handle::current());
        let fired = Arc::new(AtomicUsize::new(0));

        timer.schedule(Duration::ZERO, counter_action(&fired));
        // Not run inline by `schedule` itself.
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
