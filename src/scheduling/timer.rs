// Cancellable dispatch timer
//
// Exactly one of these is alive per controller. Firing produces a single
// typed event into the control loop's channel; cancelling (or dropping)
// aborts the sleep task. The generation counter lets the controller discard
// a fire that raced with cancellation — a stale fire can be sent in the
// window between sleep completion and abort.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// The timer's single typed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub generation: u64,
}

/// Handle to the one in-flight timer task.
pub struct ArmedTimer {
    handle: JoinHandle<()>,
    generation: u64,
}

impl ArmedTimer {
    /// Spawn a timer that sends `TimerFired { generation }` after `delay`.
    pub fn arm(delay: Duration, generation: u64, tx: mpsc::Sender<TimerFired>) -> Self {
        debug!(?delay, generation, "Arming dispatch timer");
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the controller is shutting down.
            let _ = tx.send(TimerFired { generation }).await;
        });
        Self { handle, generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Abort the sleep task. No fire is delivered for this generation after
    /// the controller bumps its counter, even if the send already raced in.
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for ArmedTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_delay() {
        let (tx, mut rx) = mpsc::channel(4);
        let _timer = ArmedTimer::arm(Duration::from_secs(30), 7, tx);

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_secs(2)).await;
        let fired = rx.recv().await.unwrap();
        assert_eq!(fired, TimerFired { generation: 7 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        let (tx, mut rx) = mpsc::channel(4);
        let timer = ArmedTimer::arm(Duration::from_secs(10), 1, tx);
        timer.cancel();

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let (tx, mut rx) = mpsc::channel(4);
        {
            let _timer = ArmedTimer::arm(Duration::from_secs(10), 1, tx);
        }
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_fires_immediately() {
        let (tx, mut rx) = mpsc::channel(4);
        let _timer = ArmedTimer::arm(Duration::ZERO, 3, tx);
        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.generation, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_distinguishes_rearms() {
        let (tx, mut rx) = mpsc::channel(4);
        let old = ArmedTimer::arm(Duration::from_secs(5), 1, tx.clone());
        old.cancel();
        let _new = ArmedTimer::arm(Duration::from_secs(5), 2, tx);

        tokio::time::advance(Duration::from_secs(6)).await;
        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.generation, 2);
        assert!(rx.try_recv().is_err());
    }
}
