use std::sync::Arc;

use super::request::OutgoingRequest;
use super::RequestStage;
use crate::settings::PipelineConfig;

pub const AUTHORIZATION: &str = "authorization";
pub const CONTENT_TYPE: &str = "content-type";
pub const ACCEPT: &str = "accept";
const JSON: &str = "application/json";

/// Attaches the bearer credential and JSON content negotiation headers.
///
/// Existing values are overwritten, so running the stage twice is the same
/// as running it once.
#[derive(Debug, Clone)]
pub struct AuthInjector {
    config: Arc<PipelineConfig>,
}

impl AuthInjector {
    #[must_use]
    pub const fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }
}

impl RequestStage for AuthInjector {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn prepare(&self, request: &OutgoingRequest) -> OutgoingRequest {
        let api_key = self.config.api_key();
        request
            .clone()
            .with_header(AUTHORIZATION, format!("Bearer {api_key}"))
            .with_header(CONTENT_TYPE, JSON)
            .with_header(ACCEPT, JSON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_injects_headers() {
        let config = Arc::new(PipelineConfig::default());
        config.set_api_key("live_key_1");
        let request = AuthInjector::new(config).prepare(&OutgoingRequest::get("health"));

        assert_eq!(request.header("Authorization"), Some("Bearer live_key_1"));
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.header("Accept"), Some("application/json"));
    }

    #[test]
    fn test_is_idempotent() {
        let stage = AuthInjector::new(Arc::new(PipelineConfig::default()));
        let once = stage.prepare(&OutgoingRequest::get("health"));
        let twice = stage.prepare(&once);
        assert_eq!(once.headers(), twice.headers());
    }

    #[test]
    fn test_overwrites_stale_credential() {
        let config = Arc::new(PipelineConfig::default());
        let stage = AuthInjector::new(Arc::clone(&config));
        let stale = OutgoingRequest::get("health").with_header("Authorization", "Bearer old");

        config.set_api_key("rotated");
        let request = stage.prepare(&stale);
        assert_eq!(request.header("authorization"), Some("Bearer rotated"));
        assert_eq!(request.headers().len(), 3);
    }

    #[test]
    fn test_empty_key_uses_default() {
        let config = Arc::new(PipelineConfig::default());
        config.set_api_key("");
        let request = AuthInjector::new(config).prepare(&OutgoingRequest::get("health"));
        assert_eq!(
            request.header("authorization"),
            Some(format!("Bearer {}", crate::settings::DEFAULT_API_KEY).as_str())
        );
    }
}
