//! Local checks applied before a request leaves the kiosk.

use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

/// Largest decoded audio payload the backend accepts
pub const MAX_AUDIO_BYTES: usize = 5 * 1024 * 1024;

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 100;

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[1-9]\d{1,14}$").expect("phone pattern compiles")
});

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("email pattern compiles")
});

static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern compiles")
});

/// E.164-style number, optional leading `+`
#[must_use]
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE.is_match(phone)
}

/// Blank addresses are accepted since email is optional everywhere it appears
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    email.trim().is_empty() || EMAIL.is_match(email)
}

/// Length in characters as typed, surrounding whitespace included
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    (NAME_MIN_LEN..=NAME_MAX_LEN).contains(&name.chars().count())
}

/// `YYYY-MM-DD`, blank accepted
#[must_use]
pub fn is_valid_date(date: &str) -> bool {
    date.trim().is_empty() || DATE.is_match(date)
}

/// Normalise a locally typed number to international form.
///
/// Non-digits are stripped first. A leading trunk `0` is replaced by
/// `country_code`; a number without `+` gets `country_code` prepended.
/// Numbers already starting with `+` are returned as given.
#[must_use]
pub fn format_phone_number(phone: &str, country_code: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if let Some(rest) = digits.strip_prefix('0') {
        format!("{country_code}{rest}")
    } else if !phone.starts_with('+') {
        format!("{country_code}{digits}")
    } else {
        phone.to_string()
    }
}

/// Decoded size of a base64 payload, without decoding it
#[must_use]
pub const fn estimated_audio_bytes(base64_len: usize) -> usize {
    base64_len / 4 * 3
}

/// Fresh identifier for a voice conversation
#[must_use]
pub fn new_session_id() -> String {
    format!("sanbot_{}", Uuid::new_v4())
}
