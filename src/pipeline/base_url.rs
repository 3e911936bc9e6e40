use std::sync::Arc;
use tracing::warn;
use url::Url;

use super::request::OutgoingRequest;
use super::RequestStage;
use crate::settings::PipelineConfig;

/// Points relative requests at the currently configured base URL.
///
/// The base is read from [`PipelineConfig`] on every call, so a settings
/// change takes effect on the next request. An unusable base leaves the
/// request untouched.
#[derive(Debug, Clone)]
pub struct BaseUrlRewriter {
    config: Arc<PipelineConfig>,
}

impl BaseUrlRewriter {
    #[must_use]
    pub const fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }

    /// Join `base` with the request's relative path and query.
    ///
    /// Returns `None` when `base` is not an absolute http(s) URL or the joined
    /// string does not parse.
    #[must_use]
    pub fn resolve(base: &str, request: &OutgoingRequest) -> Option<Url> {
        let parsed = Url::parse(base).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") || !parsed.has_host() {
            return None;
        }

        let base = base.trim_end_matches('/');
        let path = request.path().trim_start_matches('/');
        let combined = match request.query() {
            Some(query) => format!("{base}/{path}?{query}"),
            None => format!("{base}/{path}"),
        };
        Url::parse(&combined).ok()
    }
}

impl RequestStage for BaseUrlRewriter {
    fn name(&self) -> &'static str {
        "base_url"
    }

    fn prepare(&self, request: &OutgoingRequest) -> OutgoingRequest {
        let base = self.config.base_url();
        match Self::resolve(&base, request) {
            Some(url) => request.clone().with_url(url),
            None => {
                warn!(
                    base_url = %base,
                    path = %request.target(),
                    "Configured base URL is unusable, leaving request URL unchanged"
                );
                request.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter(base: &str) -> BaseUrlRewriter {
        let config = Arc::new(PipelineConfig::default());
        config.set_base_url(base);
        BaseUrlRewriter::new(config)
    }

    #[test]
    fn test_rewrite_keeps_path_and_query() {
        let rewritten = rewriter("https://api.example.com/v1/")
            .prepare(&OutgoingRequest::get("packages/42?limit=5"));
        assert_eq!(
            rewritten.url().map(Url::as_str),
            Some("https://api.example.com/v1/packages/42?limit=5")
        );
    }

    #[test]
    fn test_rewrite_slash_variations() {
        let expected = "https://api.example.com/v1/packages/42?limit=5";
        for base in [
            "https://api.example.com/v1",
            "https://api.example.com/v1/",
            "https://api.example.com/v1//",
        ] {
            for target in [
                "packages/42?limit=5",
                "/packages/42?limit=5",
                "//packages/42?limit=5",
            ] {
                let rewritten = rewriter(base).prepare(&OutgoingRequest::get(target));
                assert_eq!(
                    rewritten.url().map(Url::as_str),
                    Some(expected),
                    "base={base} target={target}"
                );
            }
        }
    }

    #[test]
    fn test_rewrite_keeps_port() {
        let rewritten =
            rewriter("http://127.0.0.1:8080/api").prepare(&OutgoingRequest::get("health"));
        assert_eq!(
            rewritten.url().map(Url::as_str),
            Some("http://127.0.0.1:8080/api/health")
        );
    }

    #[test]
    fn test_unparsable_base_fails_open() {
        let original = OutgoingRequest::get("packages/42?limit=5");
        for base in ["not a url", "ftp://files.example.com/", "mailto:ops@example.com"] {
            let rewritten = rewriter(base).prepare(&original);
            assert_eq!(rewritten, original, "base={base}");
            assert!(rewritten.url().is_none());
        }
    }

    #[test]
    fn test_rewrite_does_not_touch_input() {
        let original = OutgoingRequest::get("health");
        let rewritten = rewriter("https://api.example.com/").prepare(&original);
        assert!(original.url().is_none());
        assert!(rewritten.url().is_some());
    }

    #[test]
    fn test_rewrite_follows_config_changes() {
        let config = Arc::new(PipelineConfig::default());
        let stage = BaseUrlRewriter::new(Arc::clone(&config));
        let request = OutgoingRequest::get("health");

        config.set_base_url("https://one.example.com/api/");
        assert_eq!(
            stage.prepare(&request).url().map(Url::as_str),
            Some("https://one.example.com/api/health")
        );

        config.set_base_url("https://two.example.com/");
        assert_eq!(
            stage.prepare(&request).url().map(Url::as_str),
            Some("https://two.example.com/health")
        );
    }
}
