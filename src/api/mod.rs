//! Typed client for the kiosk backend, built on [`crate::pipeline`].

pub mod call;
pub mod client;
pub mod errors;
pub mod models;
pub mod validation;

pub use call::{CallEvent, CallHandle};
pub use client::{decode_outcome, ApiClient, DEFAULT_COUNTRY_CODE};
pub use errors::{CallError, ErrorCategory};
pub use models::*;
