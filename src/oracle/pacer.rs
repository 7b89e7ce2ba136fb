// Minimum-interval pacing for oracle calls.
//
// Both Crossref and the classification API throttle clients that call too
// fast. A Pacer enforces a minimum gap between consecutive calls: the first
// call goes straight through, each later call sleeps until `interval` has
// passed since the previous one.
//
// A Pacer belongs to one run and is passed down explicitly, so two runs in
// the same process never share a "last call" timestamp.

use tokio::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug)]
pub struct Pacer {
    /// Minimum time between calls
    interval: Duration,
    /// When the last call was let through
    last_call: Option<Instant>,
    /// Calls let through so far
    calls: u64,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: None,
            calls: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Wait until the next call is allowed, then record it.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                let sleep_time = self.interval - elapsed;
                debug!(delay_ms = sleep_time.as_millis() as u64, "Pacing oracle call");
                tokio::time::sleep(sleep_time).await;
            }
        }

        self.last_call = Some(Instant::now());
        self.calls += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_call_is_immediate() {
        let mut pacer = Pacer::new(Duration::from_secs(1));
        let start = Instant::now();
        pacer.wait().await;
        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(pacer.calls(), 1);
    }

    #[tokio::test]
    async fn second_call_waits_for_interval() {
        let mut pacer = Pacer::new(Duration::from_millis(200));
        pacer.wait().await;
        let start = Instant::now();
        pacer.wait().await;
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(150),
            "Expected ~200ms delay, got {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn zero_interval_never_sleeps() {
        let mut pacer = Pacer::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..5 {
            pacer.wait().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
