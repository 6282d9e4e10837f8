//! One-shot completion latch shared by the test thread and the server thread.
//!
//! `Latch::set` is synchronous so it can be called from plain test code;
//! `LatchWaiter::wait` is awaited on the server's runtime with a bound.
//! `wait_ref` borrows the waiter so it can race other work in a `select!`
//! and still be awaited again afterwards.
//! Setting is idempotent and never fails, even after the waiter is gone.

use std::time::Duration;

use tokio::sync::watch;

/// Why a bounded wait returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Signaled,
    TimedOut,
    /// The latch was dropped without being set.
    Abandoned,
}

#[derive(Debug)]
pub struct Latch {
    tx: watch::Sender<bool>,
}

#[derive(Debug)]
pub struct LatchWaiter {
    rx: watch::Receiver<bool>,
}

impl Latch {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn set(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// A waiter observes a set that happened before it was created.
    pub fn waiter(&self) -> LatchWaiter {
        LatchWaiter {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}

impl LatchWaiter {
    pub async fn wait(mut self, timeout: Duration) -> Wake {
        self.wait_ref(timeout).await
    }

    pub async fn wait_ref(&mut self, timeout: Duration) -> Wake {
        match tokio::time::timeout(timeout, self.rx.wait_for(|set| *set)).await {
            Ok(Ok(_)) => Wake::Signaled,
            Ok(Err(_)) => Wake::Abandoned,
            Err(_) => Wake::TimedOut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_before_wait_is_observed() {
        let latch = Latch::new();
        let waiter = latch.waiter();
        latch.set();
        assert!(latch.is_set());
        assert_eq!(waiter.wait(Duration::from_secs(1)).await, Wake::Signaled);
    }

    #[tokio::test]
    async fn waiter_created_after_set_is_released() {
        let latch = Latch::new();
        latch.set();
        assert_eq!(latch.waiter().wait(Duration::from_secs(1)).await, Wake::Signaled);
    }

    #[tokio::test(start_paused = true)]
    async fn unset_latch_times_out() {
        let latch = Latch::new();
        let wake = latch.waiter().wait(Duration::from_secs(50)).await;
        assert_eq!(wake, Wake::TimedOut);
        assert!(!latch.is_set());
    }

    #[tokio::test]
    async fn set_from_another_thread_wakes_waiter() {
        let latch = Latch::new();
        let waiter = latch.waiter();
        let setter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            latch.set();
            latch
        });
        assert_eq!(waiter.wait(Duration::from_secs(5)).await, Wake::Signaled);
        setter.join().unwrap();
    }

    #[tokio::test]
    async fn dropped_latch_abandons_waiter() {
        let latch = Latch::new();
        let waiter = latch.waiter();
        drop(latch);
        assert_eq!(waiter.wait(Duration::from_secs(5)).await, Wake::Abandoned);
    }

    #[tokio::test(start_paused = true)]
    async fn borrowed_wait_can_be_repeated() {
        let latch = Latch::new();
        let mut waiter = latch.waiter();
        assert_eq!(waiter.wait_ref(Duration::from_secs(1)).await, Wake::TimedOut);
        latch.set();
        assert_eq!(waiter.wait_ref(Duration::from_secs(1)).await, Wake::Signaled);
        assert_eq!(waiter.wait(Duration::from_secs(1)).await, Wake::Signaled);
    }

    #[tokio::test]
    async fn borrowed_wait_loses_race_to_ready_work() {
        let latch = Latch::new();
        let mut waiter = latch.waiter();
        let winner = tokio::select! {
            biased;
            value = async { 7 } => value,
            _ = waiter.wait_ref(Duration::from_secs(5)) => 0,
        };
        assert_eq!(winner, 7);
        latch.set();
        assert_eq!(waiter.wait_ref(Duration::from_secs(1)).await, Wake::Signaled);
    }

    #[test]
    fn repeated_set_is_harmless() {
        let latch = Latch::new();
        latch.set();
        latch.set();
        assert!(latch.is_set());
    }
}
