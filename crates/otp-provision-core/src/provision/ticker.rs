//! Cancellable one-second ticker.
//!
//! A [`TickerHandle`] owns the spawned tick task. Dropping or stopping the
//! handle aborts the task, so whoever holds the handle decides how long
//! ticks keep coming.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// What the tick callback wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// Handle to a running ticker task.
#[derive(Debug)]
pub struct TickerHandle {
    handle: JoinHandle<()>,
}

impl TickerHandle {
    /// Spawn a task that calls `on_tick` every `period`, first after one
    /// full period, until the callback returns [`TickControl::Stop`].
    pub fn spawn<F, Fut>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = TickControl> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if on_tick().await == TickControl::Stop {
                    break;
                }
            }
        });
        Self { handle }
    }

    /// Stop ticking. No callback runs after this returns.
    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting(limit: u32) -> (Arc<AtomicU32>, TickerHandle) {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let ticker = TickerHandle::spawn(Duration::from_secs(1), move || {
            let c = c.clone();
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                if n >= limit {
                    TickControl::Stop
                } else {
                    TickControl::Continue
                }
            }
        });
        (count, ticker)
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_a_full_period() {
        let (count, _ticker) = counting(10);
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn callback_can_stop_the_ticker() {
        let (count, ticker) = counting(3);
        time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(ticker.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_ticks() {
        let (count, ticker) = counting(100);
        time::sleep(Duration::from_millis(2_500)).await;
        ticker.stop();
        let seen = count.load(Ordering::SeqCst);
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_ticks() {
        let (count, ticker) = counting(100);
        time::sleep(Duration::from_millis(1_500)).await;
        drop(ticker);
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
