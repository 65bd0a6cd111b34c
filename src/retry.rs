use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Exponential backoff with a little random jitter on top
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    base_ms: u64,
    max_ms: u64,
    jitter_percent: u64,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_ms: u64, max_ms: u64) -> Self {
        Self {
            max_attempts,
            base_ms,
            max_ms,
            jitter_percent: 10,
        }
    }

    pub fn with_jitter(mut self, jitter_percent: u64) -> Self {
        self.jitter_percent = jitter_percent;
        self
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let exponential_delay = self
            .base_ms
            .saturating_mul(2u64.saturating_pow(attempt.min(20)));
        let capped_delay = exponential_delay.min(self.max_ms);
        // Up to `jitter_percent` of the capped delay on top
        let max_jitter = capped_delay.saturating_mul(self.jitter_percent) / 100;
        let jitter = if max_jitter > 0 {
            rand::thread_rng().gen_range(0..=max_jitter)
        } else {
            0
        };
        Duration::from_millis(capped_delay + jitter)
    }

    /// Run `op` until it succeeds or the attempts run out; the last error is returned.
    pub async fn run<T, F, Fut>(&self, unit: &str, mut op: F) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 < self.max_attempts => {
                    let delay = self.delay(attempt);
                    warn!(
                        "⚠️ {} failed (attempt {}/{}): {:#}, retrying in {:?}",
                        unit,
                        attempt + 1,
                        self.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 1000, 10_000)
    }
}
