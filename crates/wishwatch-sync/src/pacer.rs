//! Politeness delay between consecutive detail lookups.

use std::time::Duration;

use tracing::debug;

/// Spaces out requests to the same upstream. The first call never waits.
#[derive(Debug, Clone)]
pub struct Pacer {
    delay: Duration,
    waits: usize,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, waits: 0 }
    }

    /// A pacer that never waits.
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Number of paced calls so far.
    pub fn waits(&self) -> usize {
        self.waits
    }

    /// How long the next call to [`wait`](Self::wait) will sleep.
    pub fn next_delay(&mut self) -> Duration {
        self.waits += 1;
        if self.waits == 1 {
            Duration::ZERO
        } else {
            self.delay
        }
    }

    pub async fn wait(&mut self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis() as u64, "pacing");
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_is_free() {
        let mut pacer = Pacer::new(Duration::from_millis(1500));
        assert_eq!(pacer.next_delay(), Duration::ZERO);
        assert_eq!(pacer.next_delay(), Duration::from_millis(1500));
        assert_eq!(pacer.next_delay(), Duration::from_millis(1500));
    }

    #[test]
    fn none_never_waits() {
        let mut pacer = Pacer::none();
        for _ in 0..3 {
            assert_eq!(pacer.next_delay(), Duration::ZERO);
        }
    }

    #[tokio::test]
    async fn zero_delay_wait_returns_immediately() {
        let mut pacer = Pacer::none();
        pacer.wait().await;
        pacer.wait().await;
        assert_eq!(pacer.waits(), 2);
    }
}
