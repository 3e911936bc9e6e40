use rand::Rng;
use std::time::Duration;

use super::request::AttemptOutcome;
use crate::config::RetryConfig;

/// Ceiling for delays after a 429 response
pub const RATE_LIMITED_MAX_DELAY_MS: u64 = 60_000;
/// Ceiling for delays after a 5xx response or a transport failure
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

/// Outcome of consulting the [`BackoffPolicy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffDecision {
    pub should_retry: bool,
    pub delay_ms: u64,
}

impl BackoffDecision {
    pub const STOP: Self = Self {
        should_retry: false,
        delay_ms: 0,
    };

    #[must_use]
    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Exponential backoff with jitter.
///
/// Stateless: every decision depends only on the attempt index and the
/// observed outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    max_retries: u32,
    initial_delay_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for BackoffPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, config.initial_delay_ms)
    }
}

impl BackoffPolicy {
    /// `max_retries` is the total number of attempts, clamped to at least one
    #[must_use]
    pub fn new(max_retries: u32, initial_delay_ms: u64) -> Self {
        Self {
            max_retries: max_retries.max(1),
            initial_delay_ms,
        }
    }

    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub const fn initial_delay_ms(&self) -> u64 {
        self.initial_delay_ms
    }

    /// Whether an outcome warrants another attempt, ignoring the budget
    #[must_use]
    pub const fn is_retry_trigger(outcome: &AttemptOutcome) -> bool {
        match outcome {
            AttemptOutcome::TransportFailure(error) => error.is_retryable(),
            AttemptOutcome::Response(response) => {
                response.status == 429 || response.status >= 500
            }
        }
    }

    /// Decide whether attempt `attempt` (0-based) should be followed by another
    #[must_use]
    pub fn decide(&self, attempt: u32, outcome: &AttemptOutcome) -> BackoffDecision {
        self.decide_with_rng(attempt, outcome, &mut rand::thread_rng())
    }

    /// Same as [`Self::decide`] with a caller-supplied source of jitter
    pub fn decide_with_rng<R: Rng + ?Sized>(
        &self,
        attempt: u32,
        outcome: &AttemptOutcome,
        rng: &mut R,
    ) -> BackoffDecision {
        if attempt >= self.max_retries.saturating_sub(1) || !Self::is_retry_trigger(outcome) {
            return BackoffDecision::STOP;
        }
        BackoffDecision {
            should_retry: true,
            delay_ms: self.delay_ms(attempt, outcome.status(), rng),
        }
    }

    /// `min(initial * 2^attempt + jitter, cap)` with jitter drawn from
    /// `0..=exponential / 2`
    pub fn delay_ms<R: Rng + ?Sized>(&self, attempt: u32, status: Option<u16>, rng: &mut R) -> u64 {
        let exponential = 1u64
            .checked_shl(attempt)
            .map_or(u64::MAX, |factor| self.initial_delay_ms.saturating_mul(factor));
        let jitter = rng.gen_range(0..=exponential / 2);
        let cap = if status == Some(429) {
            RATE_LIMITED_MAX_DELAY_MS
        } else {
            DEFAULT_MAX_DELAY_MS
        };
        exponential.saturating_add(jitter).min(cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::request::WireResponse;
    use crate::pipeline::transport::TransportError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn response(status: u16) -> AttemptOutcome {
        AttemptOutcome::Response(WireResponse::new(status, ""))
    }

    fn io_failure() -> AttemptOutcome {
        AttemptOutcome::TransportFailure(TransportError::Io("connection reset".into()))
    }

    #[test]
    fn test_defaults() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.max_retries(), 3);
        assert_eq!(policy.initial_delay_ms(), 1000);
    }

    #[test]
    fn test_retry_triggers() {
        let policy = BackoffPolicy::default();
        for status in [429, 500, 502, 503, 504] {
            assert!(policy.decide(0, &response(status)).should_retry, "status {status}");
        }
        assert!(policy.decide(0, &io_failure()).should_retry);

        for status in [200, 201, 204, 301, 304, 400, 401, 403, 404, 408, 422] {
            assert_eq!(
                policy.decide(0, &response(status)),
                BackoffDecision::STOP,
                "status {status}"
            );
        }
    }

    #[test]
    fn test_non_io_transport_failures_are_terminal() {
        let policy = BackoffPolicy::default();
        let invalid = AttemptOutcome::TransportFailure(TransportError::InvalidRequest("x".into()));
        let cancelled = AttemptOutcome::TransportFailure(TransportError::Cancelled);
        assert!(!policy.decide(0, &invalid).should_retry);
        assert!(!policy.decide(0, &cancelled).should_retry);
    }

    #[test]
    fn test_last_attempt_never_retries() {
        let policy = BackoffPolicy::new(3, 1000);
        assert!(policy.decide(1, &response(503)).should_retry);
        assert!(!policy.decide(2, &response(503)).should_retry);
        assert!(!policy.decide(2, &response(429)).should_retry);
        assert!(!policy.decide(2, &io_failure()).should_retry);
    }

    #[test]
    fn test_single_attempt_budget() {
        let policy = BackoffPolicy::new(0, 1000);
        assert_eq!(policy.max_retries(), 1);
        assert!(!policy.decide(0, &response(503)).should_retry);
    }

    #[test]
    fn test_delay_bounds_per_attempt() {
        let policy = BackoffPolicy::new(3, 1000);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let first = policy.delay_ms(0, Some(503), &mut rng);
            assert!((1000..=1500).contains(&first), "{first}");
            let second = policy.delay_ms(1, Some(503), &mut rng);
            assert!((2000..=3000).contains(&second), "{second}");
        }
    }

    #[test]
    fn test_delay_caps() {
        let policy = BackoffPolicy::new(10, 1000);
        let mut rng = StdRng::seed_from_u64(11);
        // 1000 * 2^6 = 64s exceeds both caps
        assert_eq!(policy.delay_ms(6, Some(503), &mut rng), DEFAULT_MAX_DELAY_MS);
        assert_eq!(policy.delay_ms(6, None, &mut rng), DEFAULT_MAX_DELAY_MS);
        assert_eq!(policy.delay_ms(6, Some(429), &mut rng), RATE_LIMITED_MAX_DELAY_MS);
        // 1000 * 2^4 = 16s is only capped for non-429
        let rate_limited = policy.delay_ms(4, Some(429), &mut rng);
        assert!((16_000..=24_000).contains(&rate_limited), "{rate_limited}");
        assert_eq!(policy.delay_ms(4, Some(500), &mut rng), DEFAULT_MAX_DELAY_MS);
    }

    #[test]
    fn test_huge_attempt_index_saturates() {
        let policy = BackoffPolicy::new(u32::MAX, 1000);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(policy.delay_ms(200, Some(429), &mut rng), RATE_LIMITED_MAX_DELAY_MS);
    }
}
