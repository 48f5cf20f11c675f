//! # ugportal (University Portal registration service)
//!
//! `ugportal` serves the student account endpoints of the university portal
//! and ships the client-side registration workflow that drives them.
//!
//! ## Registration flow
//!
//! Students are imported ahead of time; they never sign up. To claim an
//! account a student:
//!
//! 1. Requests a one-time passcode for their email (`/api/student/otp/send`).
//! 2. Exchanges the passcode for a short-lived verification token
//!    (`/api/student/otp/verify`).
//! 3. Looks up their record by roll number (`/api/student/lookup`).
//! 4. Sets a password, presenting the verification token
//!    (`/api/student/password`).
//!
//! The legacy `/api/student/register` endpoint still accepts both the lookup
//! and the set-password payloads and dispatches on the body shape.
//!
//! Passwords are stored as Argon2id PHC strings. Passcodes and verification
//! tokens are only stored as SHA-256 hashes.

pub mod cli;
pub mod client;
pub mod portal;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
