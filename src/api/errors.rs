use thiserror::Error;

use super::models::{ErrorDetail, ErrorEnvelope};

/// Broad grouping of backend error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    Validation,
    NotFound,
    RateLimit,
    ServerError,
    NetworkError,
    Unknown,
}

impl ErrorCategory {
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "INVALID_API_KEY" => Self::Authentication,
            "INVALID_REQUEST" | "MISSING_FIELD" | "INVALID_PHONE" | "INVALID_EMAIL"
            | VALIDATION_ERROR => Self::Validation,
            "PACKAGE_NOT_FOUND" | "LEAD_NOT_FOUND" => Self::NotFound,
            "RATE_LIMIT_EXCEEDED" => Self::RateLimit,
            "SERVER_ERROR" | "SERVICE_UNAVAILABLE" => Self::ServerError,
            NETWORK_ERROR => Self::NetworkError,
            _ => Self::Unknown,
        }
    }
}

pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";

/// Human-readable message for a backend error
#[must_use]
pub fn describe(detail: &ErrorDetail) -> String {
    match detail.code.as_str() {
        "INVALID_API_KEY" => "API authentication failed. Please check your API key.".to_string(),
        "INVALID_REQUEST" => format!("Invalid request format: {}", detail.message),
        "MISSING_FIELD" => format!(
            "Missing required field: {}",
            detail.field.as_deref().unwrap_or("unknown")
        ),
        "INVALID_PHONE" => {
            "Phone number format is invalid. Use international format (e.g., +971501234567)"
                .to_string()
        }
        "INVALID_EMAIL" => "Email address format is invalid.".to_string(),
        "PACKAGE_NOT_FOUND" => "Package not found. Please select a valid package.".to_string(),
        "LEAD_NOT_FOUND" => "Lead not found. Please create a new lead first.".to_string(),
        "RATE_LIMIT_EXCEEDED" => {
            "Too many requests. Please try again in a few minutes.".to_string()
        }
        "SERVER_ERROR" => format!("Server error: {}", detail.message),
        "SERVICE_UNAVAILABLE" => {
            "Service is temporarily unavailable. Please try again later.".to_string()
        }
        "AUDIO_TOO_LARGE" => {
            "Audio file is too large (max 5MB). Please record a shorter audio.".to_string()
        }
        _ => format!("Error: {}", detail.message),
    }
}

/// What the user can do about an error code
#[must_use]
pub fn recovery_suggestion(code: &str) -> &'static str {
    match code {
        "INVALID_API_KEY" => "Go to Settings and verify your API key.",
        "RATE_LIMIT_EXCEEDED" => "Wait a few moments before trying again.",
        "SERVER_ERROR" | "SERVICE_UNAVAILABLE" => "Please try again later.",
        NETWORK_ERROR => "Check your internet connection and try again.",
        "INVALID_PHONE" | "INVALID_EMAIL" | VALIDATION_ERROR => {
            "Please enter a valid contact information."
        }
        _ => "Please try again.",
    }
}

/// HTTP statuses a caller may reasonably retry by hand
#[must_use]
pub const fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

#[must_use]
pub fn is_retryable_code(code: &str) -> bool {
    matches!(
        code,
        "RATE_LIMIT_EXCEEDED" | "SERVER_ERROR" | "SERVICE_UNAVAILABLE" | NETWORK_ERROR
    )
}

/// Pull the structured error out of a failed response body, if it has one
#[must_use]
pub fn parse_error_body(body: &str) -> Option<ErrorDetail> {
    serde_json::from_str::<ErrorEnvelope>(body).ok()?.error
}

/// Why an API call did not produce a typed body
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// Rejected locally before anything was sent
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("Network error: {0}")]
    Network(String),

    /// Non-success status, after any retries
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        detail: Option<ErrorDetail>,
    },

    #[error("Empty response body")]
    EmptyBody,

    #[error("Malformed response body: {0}")]
    Decode(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("{0}")]
    Unknown(String),
}

impl CallError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Build the error for a non-success response
    #[must_use]
    pub fn from_status(status: u16, status_text: &str, body: &str) -> Self {
        let detail = parse_error_body(body);
        let message = detail
            .as_ref()
            .map_or_else(|| format!("HTTP {status}: {status_text}"), describe);
        Self::Http {
            status,
            message,
            detail,
        }
    }

    /// Wrap an unexpected failure, never leaving the message blank
    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Self::Unknown("Unknown error occurred".to_string())
        } else {
            Self::Unknown(message)
        }
    }

    /// The backend's structured error, when one was returned
    #[must_use]
    pub const fn detail(&self) -> Option<&ErrorDetail> {
        match self {
            Self::Http { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Error code used for categorisation and recovery hints
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Validation { .. } => VALIDATION_ERROR,
            Self::Network(_) => NETWORK_ERROR,
            Self::Http {
                detail: Some(detail),
                ..
            } => &detail.code,
            _ => UNKNOWN_ERROR,
        }
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Http {
                status: 429,
                detail: None,
                ..
            } => ErrorCategory::RateLimit,
            Self::Http {
                status,
                detail: None,
                ..
            } if *status >= 500 => ErrorCategory::ServerError,
            _ => ErrorCategory::from_code(self.code()),
        }
    }

    #[must_use]
    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::RateLimit => recovery_suggestion("RATE_LIMIT_EXCEEDED"),
            ErrorCategory::ServerError if self.detail().is_none() => {
                recovery_suggestion("SERVER_ERROR")
            }
            _ => recovery_suggestion(self.code()),
        }
    }

    /// Whether trying the same call again later might succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Http { status, detail, .. } => {
                is_retryable_status(*status)
                    || detail.as_ref().is_some_and(|d| is_retryable_code(&d.code))
            }
            _ => false,
        }
    }
}
