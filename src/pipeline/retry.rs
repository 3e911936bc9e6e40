use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::backoff::BackoffPolicy;
use super::request::{AttemptOutcome, OutgoingRequest};
use super::transport::{Transport, TransportError};
use super::RequestStage;

/// Runs one logical call as up to `max_retries` attempts.
///
/// After every attempt each observer sees the outcome, then the
/// [`BackoffPolicy`] decides whether to wait and go again. The wait and the
/// in-flight exchange both give way to the cancellation token.
#[derive(Debug, Clone)]
pub struct RetryingTransport {
    transport: Arc<dyn Transport>,
    policy: BackoffPolicy,
}

impl RetryingTransport {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, policy: BackoffPolicy) -> Self {
        Self { transport, policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Execute `request`, returning the first terminal outcome or the last
    /// one seen once the attempt budget is spent.
    pub async fn execute(
        &self,
        request: &OutgoingRequest,
        observers: &[Arc<dyn RequestStage>],
        cancel: &CancellationToken,
    ) -> AttemptOutcome {
        let mut attempt = 0;
        loop {
            let outcome: AttemptOutcome = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return AttemptOutcome::TransportFailure(TransportError::Cancelled);
                }
                result = self.transport.send(request) => result.into(),
            };

            for observer in observers {
                observer.observe(&outcome);
            }

            let decision = self.policy.decide(attempt, &outcome);
            if !decision.should_retry {
                if BackoffPolicy::is_retry_trigger(&outcome) {
                    warn!(
                        method = %request.method(),
                        url = %request.target(),
                        attempts = attempt + 1,
                        "Retries exhausted"
                    );
                } else {
                    debug!(
                        method = %request.method(),
                        url = %request.target(),
                        status = ?outcome.status(),
                        attempts = attempt + 1,
                        "Request completed"
                    );
                }
                return outcome;
            }

            match &outcome {
                AttemptOutcome::Response(response) => warn!(
                    url = %request.target(),
                    attempt,
                    status = response.status,
                    delay_ms = decision.delay_ms,
                    "Retryable response, backing off"
                ),
                AttemptOutcome::TransportFailure(error) => warn!(
                    url = %request.target(),
                    attempt,
                    error = %error,
                    delay_ms = decision.delay_ms,
                    "Transport failure, backing off"
                ),
            }
            // Release the discarded response before sleeping
            drop(outcome);

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return AttemptOutcome::TransportFailure(TransportError::Cancelled);
                }
                () = tokio::time::sleep(decision.delay()) => {}
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::request::WireResponse;
    use crate::pipeline::rate_limit::RateLimitTracker;
    use crate::test_utils::ScriptedTransport;
    use std::time::Duration;

    fn retrying(transport: &Arc<ScriptedTransport>, max_retries: u32) -> RetryingTransport {
        RetryingTransport::new(
            Arc::clone(transport) as Arc<dyn Transport>,
            BackoffPolicy::new(max_retries, 1),
        )
    }

    #[tokio::test]
    async fn test_success_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(WireResponse::new(200, "{}"))]));
        let outcome = retrying(&transport, 3)
            .execute(&OutgoingRequest::get("health"), &[], &CancellationToken::new())
            .await;
        assert_eq!(outcome.status(), Some(200));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(WireResponse::new(503, "")),
            Err(TransportError::Io("connection reset".into())),
            Ok(WireResponse::new(200, "{}")),
        ]));
        let outcome = retrying(&transport, 3)
            .execute(&OutgoingRequest::get("health"), &[], &CancellationToken::new())
            .await;
        assert_eq!(outcome.status(), Some(200));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_last_response() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(WireResponse::new(500, "first")),
            Ok(WireResponse::new(502, "second")),
            Ok(WireResponse::new(429, "third")),
        ]));
        let outcome = retrying(&transport, 3)
            .execute(&OutgoingRequest::get("health"), &[], &CancellationToken::new())
            .await;
        match outcome {
            AttemptOutcome::Response(response) => {
                assert_eq!(response.status, 429);
                assert_eq!(response.body, "third");
            }
            AttemptOutcome::TransportFailure(e) => panic!("unexpected failure: {e}"),
        }
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_transport_failure() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(TransportError::Io("dns".into())),
            Err(TransportError::Io("timeout".into())),
        ]));
        let outcome = retrying(&transport, 2)
            .execute(&OutgoingRequest::get("health"), &[], &CancellationToken::new())
            .await;
        assert!(matches!(
            outcome,
            AttemptOutcome::TransportFailure(TransportError::Io(ref cause)) if cause == "timeout"
        ));
    }

    #[tokio::test]
    async fn test_observers_see_every_attempt() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(WireResponse::new(503, "").with_header("X-RateLimit-Remaining", "7")),
            Ok(WireResponse::new(503, "").with_header("X-RateLimit-Remaining", "6")),
            Ok(WireResponse::new(503, "")),
        ]));
        let tracker = Arc::new(RateLimitTracker::new());
        let observers: Vec<Arc<dyn RequestStage>> =
            vec![Arc::clone(&tracker) as Arc<dyn RequestStage>];

        let outcome = retrying(&transport, 3)
            .execute(&OutgoingRequest::get("health"), &observers, &CancellationToken::new())
            .await;
        assert_eq!(outcome.status(), Some(503));
        assert_eq!(tracker.snapshot().remaining, 6);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_backoff() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(WireResponse::new(503, "")),
            Ok(WireResponse::new(200, "{}")),
        ]));
        let retrying = RetryingTransport::new(
            Arc::clone(&transport) as Arc<dyn Transport>,
            BackoffPolicy::new(3, 60_000),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            retrying.execute(&OutgoingRequest::get("health"), &[], &cancel),
        )
        .await
        .expect("backoff should be interrupted");
        assert!(matches!(
            outcome,
            AttemptOutcome::TransportFailure(TransportError::Cancelled)
        ));
        assert_eq!(transport.calls(), 1);
    }
}
