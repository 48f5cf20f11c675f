//! API handlers and shared input helpers.

pub mod health;
pub mod login;
pub mod otp;
pub mod root;
pub mod student;

use axum::http::HeaderMap;
use regex::Regex;

use super::types::VERIFICATION_TOKEN_HEADER;

/// Normalize an email for lookup/uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

pub fn normalize_roll_number(roll_number: &str) -> String {
    roll_number.trim().to_string()
}

/// Roll numbers are short alphanumeric identifiers, optionally with `-`, `_` or `/`.
pub fn valid_roll_number(roll_number: &str) -> bool {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9/_-]{0,31}$").is_ok_and(|re| re.is_match(roll_number))
}

/// Read the verification token header, ignoring blank values.
pub fn verification_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(VERIFICATION_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
