//! One-time passcodes and verification tokens.
//!
//! A passcode proves the student controls the email on their record. Once
//! checked it is exchanged for a random verification token that authorizes a
//! single password set. Neither value is stored in the clear: the database
//! only sees SHA-256 digests.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, Rng, RngCore};
use sha2::{Digest, Sha256};
use tracing::info;

/// Number of digits in a passcode.
pub const OTP_LENGTH: usize = 6;

/// Passcode delivery abstraction.
pub trait OtpSender: Send + Sync {
    /// Deliver `code` to `email`, or fail so the caller can log it.
    fn send(&self, email: &str, code: &str) -> Result<()>;
}

/// Local dev sender that logs the passcode instead of emailing it.
#[derive(Clone, Debug)]
pub struct LogOtpSender;

impl OtpSender for LogOtpSender {
    fn send(&self, email: &str, code: &str) -> Result<()> {
        info!(to_email = %email, otp = %code, "passcode send stub");
        Ok(())
    }
}

/// Generate a zero-padded numeric passcode.
#[must_use]
pub fn generate_otp_code() -> String {
    let value: u32 = OsRng.gen_range(0..1_000_000);
    format!("{value:0width$}", width = OTP_LENGTH)
}

/// Trim user input and accept it only if it looks like a passcode.
#[must_use]
pub fn normalize_otp(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.len() == OTP_LENGTH && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        Some(trimmed.to_string())
    } else {
        None
    }
}

/// Create a verification token returned to the client after a passcode check.
///
/// # Errors
/// Returns an error if the OS random source fails.
pub fn generate_verification_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate verification token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Digest used to store and look up passcodes and tokens.
#[must_use]
pub fn hash_secret(value: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hasher.finalize().to_vec()
}
