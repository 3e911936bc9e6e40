use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::settings::PipelineConfig;

pub mod auth;
pub mod backoff;
pub mod base_url;
pub mod rate_limit;
pub mod request;
pub mod retry;
pub mod transport;

use auth::AuthInjector;
use backoff::BackoffPolicy;
use base_url::BaseUrlRewriter;
use rate_limit::RateLimitTracker;
use request::{AttemptOutcome, OutgoingRequest};
use retry::RetryingTransport;
use transport::{ReqwestTransport, Transport, TransportError};

/// One link in the request pipeline.
///
/// `prepare` runs once per logical call, before the first attempt, and must
/// return a new request rather than mutate its input. `observe` runs after
/// every attempt, including the ones that get retried.
pub trait RequestStage: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn prepare(&self, request: &OutgoingRequest) -> OutgoingRequest {
        request.clone()
    }

    fn observe(&self, _outcome: &AttemptOutcome) {}
}

/// The ordered chain every API call goes through:
/// base URL rewrite, auth headers, then the retrying transport feeding the
/// rate-limit tracker after each attempt.
#[derive(Debug)]
pub struct RequestPipeline {
    config: Arc<PipelineConfig>,
    rate_limits: Arc<RateLimitTracker>,
    stages: Vec<Arc<dyn RequestStage>>,
    transport: RetryingTransport,
}

impl RequestPipeline {
    #[must_use]
    pub fn new(
        config: Arc<PipelineConfig>,
        transport: Arc<dyn Transport>,
        policy: BackoffPolicy,
    ) -> Self {
        let rate_limits = Arc::new(RateLimitTracker::new());
        // Order matters: the URL must be final before auth and transport see it
        let stages: Vec<Arc<dyn RequestStage>> = vec![
            Arc::new(BaseUrlRewriter::new(Arc::clone(&config))),
            Arc::new(AuthInjector::new(Arc::clone(&config))),
            Arc::clone(&rate_limits) as Arc<dyn RequestStage>,
        ];
        Self {
            config,
            rate_limits,
            stages,
            transport: RetryingTransport::new(transport, policy),
        }
    }

    /// Build a pipeline over a `reqwest` transport using the file/env config
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(&config.timeouts)?;
        Ok(Self::new(
            Arc::new(PipelineConfig::from_api_config(&config.api)),
            Arc::new(transport),
            BackoffPolicy::from(&config.retry),
        ))
    }

    #[must_use]
    pub const fn config(&self) -> &Arc<PipelineConfig> {
        &self.config
    }

    #[must_use]
    pub const fn rate_limits(&self) -> &Arc<RateLimitTracker> {
        &self.rate_limits
    }

    #[must_use]
    pub const fn policy(&self) -> &BackoffPolicy {
        self.transport.policy()
    }

    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Run every stage's `prepare` in order
    #[must_use]
    pub fn prepare(&self, request: &OutgoingRequest) -> OutgoingRequest {
        self.stages
            .iter()
            .fold(request.clone(), |current, stage| stage.prepare(&current))
    }

    /// Prepare `request` once, then hand it to the retrying transport
    pub async fn execute(
        &self,
        request: &OutgoingRequest,
        cancel: &CancellationToken,
    ) -> AttemptOutcome {
        let prepared = self.prepare(request);
        self.transport.execute(&prepared, &self.stages, cancel).await
    }
}
