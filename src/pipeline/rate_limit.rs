use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use super::request::{AttemptOutcome, WireResponse};
use super::RequestStage;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

const DEFAULT_LIMIT: i64 = 100;

/// Last known server-advertised quota
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    pub limit: i64,
    pub remaining: i64,
    pub reset_at_epoch_ms: i64,
}

impl RateLimitState {
    /// Conservative starting point: full quota, window resetting now
    #[must_use]
    pub const fn initial(now_ms: i64) -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            remaining: DEFAULT_LIMIT,
            reset_at_epoch_ms: now_ms,
        }
    }
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self::initial(now_epoch_ms())
    }
}

/// Milliseconds since the Unix epoch
#[must_use]
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}

fn parse_header(response: &WireResponse, name: &str) -> Option<i64> {
    response.header(name)?.trim().parse().ok()
}

/// Tracks `X-RateLimit-*` headers across every completed exchange.
///
/// Purely observational: it never blocks a request. Callers that want to
/// avoid a throttled backend check [`RateLimitTracker::is_throttled`] first.
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    state: Mutex<RateLimitState>,
}

impl RateLimitTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_state(state: RateLimitState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RateLimitState> {
        // The state is plain data, a panic mid-update cannot leave it torn
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fold any rate-limit headers on `response` into the tracked state.
    /// Headers that are absent or unparsable leave their field untouched.
    pub fn observe_response(&self, response: &WireResponse) {
        let limit = parse_header(response, LIMIT_HEADER);
        let remaining = parse_header(response, REMAINING_HEADER);
        let reset_ms = parse_header(response, RESET_HEADER).map(|secs| secs.saturating_mul(1000));
        if limit.is_none() && remaining.is_none() && reset_ms.is_none() {
            return;
        }

        let snapshot = {
            let mut state = self.lock();
            if let Some(limit) = limit {
                state.limit = limit;
            }
            if let Some(remaining) = remaining {
                state.remaining = remaining;
            }
            if let Some(reset_ms) = reset_ms {
                state.reset_at_epoch_ms = reset_ms;
            }
            *state
        };

        debug!(
            limit = snapshot.limit,
            remaining = snapshot.remaining,
            reset_at_epoch_ms = snapshot.reset_at_epoch_ms,
            "Rate limit state updated"
        );
        let now = now_epoch_ms();
        if Self::throttled(&snapshot, now) {
            warn!(
                seconds_until_reset = Self::seconds_between(&snapshot, now),
                "Rate limit quota exhausted"
            );
        }
    }

    /// Current state
    #[must_use]
    pub fn snapshot(&self) -> RateLimitState {
        *self.lock()
    }

    #[must_use]
    pub fn is_throttled(&self) -> bool {
        self.is_throttled_at(now_epoch_ms())
    }

    /// True iff no requests remain and the window has not reset by `now_ms`
    #[must_use]
    pub fn is_throttled_at(&self, now_ms: i64) -> bool {
        Self::throttled(&self.snapshot(), now_ms)
    }

    #[must_use]
    pub fn seconds_until_reset(&self) -> i64 {
        self.seconds_until_reset_at(now_epoch_ms())
    }

    #[must_use]
    pub fn seconds_until_reset_at(&self, now_ms: i64) -> i64 {
        Self::seconds_between(&self.snapshot(), now_ms)
    }

    const fn throttled(state: &RateLimitState, now_ms: i64) -> bool {
        state.remaining <= 0 && now_ms < state.reset_at_epoch_ms
    }

    const fn seconds_between(state: &RateLimitState, now_ms: i64) -> i64 {
        if state.reset_at_epoch_ms > now_ms {
            (state.reset_at_epoch_ms - now_ms) / 1000
        } else {
            0
        }
    }
}

impl RequestStage for RateLimitTracker {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn observe(&self, outcome: &AttemptOutcome) {
        if let AttemptOutcome::Response(response) = outcome {
            self.observe_response(response);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::transport::TransportError;

    const NOW: i64 = 1_700_000_000_000;

    fn tracker() -> RateLimitTracker {
        RateLimitTracker::with_state(RateLimitState::initial(NOW))
    }

    fn headers(limit: &str, remaining: &str, reset: &str) -> WireResponse {
        WireResponse::new(200, "{}")
            .with_header("X-RateLimit-Limit", limit)
            .with_header("X-RateLimit-Remaining", remaining)
            .with_header("X-RateLimit-Reset", reset)
    }

    #[test]
    fn test_initial_state() {
        let state = tracker().snapshot();
        assert_eq!(state.limit, 100);
        assert_eq!(state.remaining, 100);
        assert_eq!(state.reset_at_epoch_ms, NOW);
        assert!(!tracker().is_throttled_at(NOW));
    }

    #[test]
    fn test_observe_updates_state() {
        let tracker = tracker();
        tracker.observe_response(&headers("60", "59", "1700000030"));
        assert_eq!(
            tracker.snapshot(),
            RateLimitState {
                limit: 60,
                remaining: 59,
                reset_at_epoch_ms: 1_700_000_030_000,
            }
        );
    }

    #[test]
    fn test_missing_headers_leave_state_untouched() {
        let tracker = tracker();
        tracker.observe_response(&headers("60", "10", "1700000030"));
        let before = tracker.snapshot();

        tracker.observe_response(&WireResponse::new(200, "{}"));
        tracker.observe(&AttemptOutcome::TransportFailure(TransportError::Io("reset".into())));
        assert_eq!(tracker.snapshot(), before);
    }

    #[test]
    fn test_unparsable_headers_are_ignored_individually() {
        let tracker = tracker();
        tracker.observe_response(&headers("sixty", "5", "soon"));
        let state = tracker.snapshot();
        assert_eq!(state.limit, 100);
        assert_eq!(state.remaining, 5);
        assert_eq!(state.reset_at_epoch_ms, NOW);
    }

    #[test]
    fn test_throttled_until_reset() {
        let tracker = tracker();
        tracker.observe_response(&headers("100", "0", "1700000030"));

        assert!(tracker.is_throttled_at(NOW));
        assert_eq!(tracker.seconds_until_reset_at(NOW), 30);
        assert!(tracker.is_throttled_at(1_700_000_029_999));
        assert!(!tracker.is_throttled_at(1_700_000_030_000));
        assert_eq!(tracker.seconds_until_reset_at(1_700_000_031_000), 0);
    }

    #[test]
    fn test_remaining_quota_is_not_throttled() {
        let tracker = tracker();
        tracker.observe_response(&headers("100", "1", "1700000030"));
        assert!(!tracker.is_throttled_at(NOW));
    }

    #[test]
    fn test_wall_clock_throttling() {
        let tracker = RateLimitTracker::new();
        let reset_secs = now_epoch_ms() / 1000 + 120;
        tracker.observe_response(&headers("10", "0", &reset_secs.to_string()));
        assert!(tracker.is_throttled());
        assert!(tracker.seconds_until_reset() > 100);

        let past = now_epoch_ms() / 1000 - 5;
        tracker.observe_response(&headers("10", "0", &past.to_string()));
        assert!(!tracker.is_throttled());
        assert_eq!(tracker.seconds_until_reset(), 0);
    }
}
