pub mod api;
pub mod cli;
pub mod config;
pub mod init;
pub mod pipeline;
pub mod settings;

// Re-export key types for convenience
pub use api::{ApiClient, CallError, CallEvent, CallHandle, ErrorCategory};
pub use config::Config;
pub use init::{initialize_config, InitOptions};
pub use pipeline::backoff::{BackoffDecision, BackoffPolicy};
pub use pipeline::rate_limit::{RateLimitState, RateLimitTracker};
pub use pipeline::request::{AttemptOutcome, OutgoingRequest, WireResponse};
pub use pipeline::transport::{ReqwestTransport, Transport, TransportError};
pub use pipeline::{RequestPipeline, RequestStage};
pub use settings::{PipelineConfig, Settings, SettingsStore};

// Test utilities module - only compiled with test or testing feature
#[cfg(any(test, feature = "testing"))]
pub mod test_utils;
