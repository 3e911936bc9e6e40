#![allow(dead_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use kiosklink::api::ApiClient;
use kiosklink::config::Config;
use wiremock::MockServer;

pub const TEST_API_KEY: &str = "kiosk-test-key";

pub struct EnvGuard {
    vars: Vec<(&'static str, Option<String>)>,
}

impl EnvGuard {
    #[must_use]
    pub fn new(vars: Vec<&'static str>) -> Self {
        let vars = vars
            .into_iter()
            .map(|var| (var, env::var(var).ok()))
            .collect();
        Self { vars }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // Restore original environment state
        for (var, original_value) in &self.vars {
            match original_value {
                Some(value) => env::set_var(var, value),
                None => env::remove_var(var),
            }
        }
    }
}

/// Config pointing at `base_url` with millisecond backoff
#[must_use]
pub fn test_config(base_url: &str, max_retries: u32) -> Config {
    let mut config = Config::default();
    config.api.base_url = base_url.to_string();
    config.api.api_key = TEST_API_KEY.to_string();
    config.retry.max_retries = max_retries;
    config.retry.initial_delay_ms = 1;
    config.timeouts.connect_seconds = 2;
    config.timeouts.read_seconds = 2;
    config.timeouts.write_seconds = 2;
    config
}

/// Client talking to the mock server's `/api/` prefix
///
/// # Panics
///
/// Will panic if the HTTP client cannot be built
#[must_use]
pub fn client_for(server: &MockServer, max_retries: u32) -> Arc<ApiClient> {
    let config = test_config(&format!("{}/api/", server.uri()), max_retries);
    Arc::new(ApiClient::from_config(&config).unwrap())
}

/// Wait until the server has seen `count` requests
///
/// # Panics
///
/// Will panic if that does not happen within two seconds
pub async fn wait_for_requests(server: &MockServer, count: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let seen = server.received_requests().await.map_or(0, |r| r.len());
            if seen >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

/// `{"success": false, "error": {...}}` body
#[must_use]
pub fn error_body(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "success": false,
        "error": { "code": code, "message": message }
    })
}
