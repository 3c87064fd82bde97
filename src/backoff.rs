use crate::shutdown::Shutdown;
use rand::Rng;
use std::time::Duration;

/// Jittered exponential backoff for retrying a single request
#[derive(Debug)]
pub struct ExponentialBackoff {
    initial_delay_ms: u64,
    max_delay_ms: u64,
    max_retries: u32,
    current_attempt: u32,
}

#[derive(Debug, PartialEq, Eq)]
pub enum BackoffStop {
    MaxRetriesExceeded,
    ShutdownRequested,
}

impl std::fmt::Display for BackoffStop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackoffStop::MaxRetriesExceeded => write!(f, "Maximum retry attempts exceeded"),
            BackoffStop::ShutdownRequested => write!(f, "Shutdown requested during backoff"),
        }
    }
}

impl std::error::Error for BackoffStop {}

impl ExponentialBackoff {
    pub fn new(initial_ms: u64, max_ms: u64, retries: u32) -> Self {
        Self {
            initial_delay_ms: initial_ms,
            max_delay_ms: max_ms,
            max_retries: retries,
            current_attempt: 0,
        }
    }

    /// Delay before the next attempt, without jitter
    pub fn base_delay(&self) -> Duration {
        let factor = 2_u64.saturating_pow(self.current_attempt);
        Duration::from_millis(std::cmp::min(
            self.initial_delay_ms.saturating_mul(factor),
            self.max_delay_ms,
        ))
    }

    /// Wait before the next retry. Jitter is up to +50% of the base delay.
    pub async fn sleep(&mut self, shutdown: &Shutdown) -> Result<(), BackoffStop> {
        if self.current_attempt >= self.max_retries {
            return Err(BackoffStop::MaxRetriesExceeded);
        }

        let base = self.base_delay();
        let jitter_ms = rand::thread_rng().gen_range(0..=base.as_millis() as u64 / 2);
        let delay = base + Duration::from_millis(jitter_ms);

        log::warn!(
            "⏳ Retry attempt {} of {} in {}ms",
            self.current_attempt + 1,
            self.max_retries,
            delay.as_millis()
        );

        self.current_attempt += 1;
        if shutdown.sleep(delay).await {
            Ok(())
        } else {
            Err(BackoffStop::ShutdownRequested)
        }
    }
}
