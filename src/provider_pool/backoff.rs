use std::time::Duration;

use backon::BackoffBuilder;
use rand::Rng;

/// Fixed part of every retry delay, in milliseconds.
const BASE_DELAY_MS: f64 = 333.0;
/// Upper bound (exclusive) of the random part of every retry delay, in milliseconds.
const JITTER_MS: f64 = 1000.0;

/// Delay before retry `attempt` (0-based) given a jitter drawn from `[0, 1000)` ms:
/// `round((attempt + 1) * (333 + jitter))`.
#[must_use]
pub fn backoff_delay(attempt: usize, jitter_ms: f64) -> Duration {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let millis = ((attempt + 1) as f64 * (BASE_DELAY_MS + jitter_ms)).round() as u64;
    Duration::from_millis(millis)
}

/// Jittered backoff whose delay grows linearly with the attempt number.
///
/// Yields `max_retries` delays, then ends, which makes the retry give up.
#[derive(Debug, Clone)]
pub struct JitterBackoff {
    attempt: usize,
    max_retries: usize,
}

impl Iterator for JitterBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_retries {
            return None;
        }
        let jitter = rand::thread_rng().gen_range(0.0..JITTER_MS);
        let delay = backoff_delay(self.attempt, jitter);
        self.attempt += 1;
        Some(delay)
    }
}

/// [`BackoffBuilder`] for [`JitterBackoff`].
#[derive(Debug, Clone, Copy)]
pub struct JitterBuilder {
    max_retries: usize,
}

impl JitterBuilder {
    #[must_use]
    pub fn new(max_retries: usize) -> Self {
        Self { max_retries }
    }
}

impl BackoffBuilder for JitterBuilder {
    type Backoff = JitterBackoff;

    fn build(self) -> Self::Backoff {
        JitterBackoff { attempt: 0, max_retries: self.max_retries }
    }
}
