use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use url::Url;

use super::transport::TransportError;

/// HTTP method of an outgoing API call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

/// A request travelling through the pipeline.
///
/// Stages never mutate a request in place: every `with_*` method consumes the
/// value and hands back the next one, so each stage's output can be compared
/// against its input in tests. Header names are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    method: Method,
    path: String,
    query: Option<String>,
    headers: BTreeMap<String, String>,
    body: Option<String>,
    url: Option<Url>,
}

impl OutgoingRequest {
    /// Create a request for a relative target such as `packages/42?limit=5`
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) if !query.is_empty() => (path, Some(query.to_string())),
            Some((path, _)) => (path, None),
            None => (target, None),
        };
        Self {
            method,
            path: path.to_string(),
            query,
            headers: BTreeMap::new(),
            body: None,
            url: None,
        }
    }

    #[must_use]
    pub fn get(target: &str) -> Self {
        Self::new(Method::Get, target)
    }

    #[must_use]
    pub fn post(target: &str) -> Self {
        Self::new(Method::Post, target)
    }

    #[must_use]
    pub fn put(target: &str) -> Self {
        Self::new(Method::Put, target)
    }

    /// Append a query parameter, form-encoding the key and value
    #[must_use]
    pub fn with_query(mut self, key: &str, value: impl Display) -> Self {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        serializer.append_pair(key, &value.to_string());
        let pair = serializer.finish();
        self.query = Some(match self.query.take() {
            Some(existing) => format!("{existing}&{pair}"),
            None => pair,
        });
        self
    }

    /// Append a query parameter only when a value is present
    #[must_use]
    pub fn with_optional_query<V: Display>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with_query(key, value),
            None => self,
        }
    }

    /// Set or replace a header
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Attach a JSON body
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized
    pub fn with_json<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_string(payload)?);
        Ok(self)
    }

    /// Pin the request to an absolute URL
    #[must_use]
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// The absolute URL, once the base URL stage has resolved one
    #[must_use]
    pub const fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Where the request is headed: the absolute URL if resolved, otherwise
    /// the relative path and query it was created with.
    #[must_use]
    pub fn target(&self) -> String {
        if let Some(url) = &self.url {
            return url.to_string();
        }
        match &self.query {
            Some(query) => format!("{}?{query}", self.path),
            None => self.path.clone(),
        }
    }
}

/// A completed HTTP exchange. Header names are lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl WireResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// 2xx only; a final redirect is not a usable body
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Canonical reason phrase for the status, empty when unknown
    #[must_use]
    pub fn status_text(&self) -> &'static str {
        reqwest::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("")
    }
}

/// Result of a single attempt on the wire
#[derive(Debug)]
pub enum AttemptOutcome {
    Response(WireResponse),
    TransportFailure(TransportError),
}

impl AttemptOutcome {
    /// The status code, if the attempt produced a response
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Response(response) => Some(response.status),
            Self::TransportFailure(_) => None,
        }
    }
}

impl From<Result<WireResponse, TransportError>> for AttemptOutcome {
    fn from(result: Result<WireResponse, TransportError>) -> Self {
        match result {
            Ok(response) => Self::Response(response),
            Err(error) => Self::TransportFailure(error),
        }
    }
}
