use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Owns at most one pending auto-advance timer.
///
/// Every [`schedule`](Self::schedule) cancels the previous timer and bumps the
/// generation. Expiry sends the generation it was armed with, so a tick that raced
/// with a reschedule can be recognised as stale with [`is_current`](Self::is_current).
pub struct SlideTimer {
    tx: mpsc::UnboundedSender<u64>,
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl SlideTimer {
    /// Create a timer and the receiver its expirations arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<u64>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                handle: None,
                generation: 0,
            },
            rx,
        )
    }

    /// Replace any pending timer with one firing after `after`
    pub fn schedule(&mut self, after: Duration) -> u64 {
        self.cancel();
        self.generation += 1;

        let generation = self.generation;
        let tx = self.tx.clone();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(generation);
        }));

        generation
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.handle.is_some() && generation == self.generation
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for SlideTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_duration() {
        let (mut timer, mut rx) = SlideTimer::new();
        let generation = timer.schedule(Duration::from_millis(500));

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(rx.try_recv().ok(), Some(generation));
        assert!(timer.is_current(generation));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_cancels_previous() {
        let (mut timer, mut rx) = SlideTimer::new();
        let first = timer.schedule(Duration::from_millis(100));
        let second = timer.schedule(Duration::from_millis(300));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err());
        assert!(!timer.is_current(first));

        tokio::time::sleep(Duration::from_millis(101)).await;
        assert_eq!(rx.try_recv().ok(), Some(second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_timer() {
        let (mut timer, mut rx) = SlideTimer::new();
        let generation = timer.schedule(Duration::from_millis(100));
        timer.cancel();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err());
        assert!(!timer.is_current(generation));
        assert!(!timer.is_armed());
    }
}
