//! Trailing-edge debounce timer driven from the app actor's select loop

use std::future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Fires once `delay` has passed since the most recent `schedule()`
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer { delay, deadline: None }
    }

    /// Start or restart the quiet period
    pub fn schedule(&mut self) {
        self.deadline = Some(Instant::now() + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolves when the deadline passes. Never resolves while idle.
    pub async fn fired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                sleep_until(deadline).await;
                self.deadline = None;
            }
            None => future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, timeout};

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_quiet_period() {
        let mut debouncer = Debouncer::new(Duration::from_millis(1000));
        let start = Instant::now();
        debouncer.schedule();
        debouncer.fired().await;

        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_extends_deadline() {
        let mut debouncer = Debouncer::new(Duration::from_millis(1000));
        let start = Instant::now();
        debouncer.schedule();
        advance(Duration::from_millis(600)).await;
        debouncer.schedule();
        debouncer.fired().await;

        assert!(start.elapsed() >= Duration::from_millis(1600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_or_cancelled_never_fires() {
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        assert!(timeout(Duration::from_secs(5), debouncer.fired()).await.is_err());

        debouncer.schedule();
        debouncer.cancel();
        assert!(timeout(Duration::from_secs(5), debouncer.fired()).await.is_err());
    }
}
