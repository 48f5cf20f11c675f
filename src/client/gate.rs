//! Access gate in front of the registration form.
//!
//! A [`VerificationGrant`] is handed to the workflow when it is mounted, the
//! same way navigation state is passed between pages. It is never read from
//! process-wide storage.

use secrecy::SecretString;
use std::time::{Duration, Instant};

pub const ACCESS_DENIED_NOTICE: &str = "Access denied! Complete email verification first.";

/// Navigation targets produced by the workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    OtpVerify,
    Login,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::OtpVerify => "/otpverify",
            Self::Login => "/login",
        }
    }
}

/// Proof of a completed email verification.
#[derive(Debug)]
pub struct VerificationGrant {
    email: String,
    token: SecretString,
    expires_at: Instant,
}

impl VerificationGrant {
    /// Build a grant that expires `ttl` from now.
    #[must_use]
    pub fn new(email: String, token: SecretString, ttl: Duration) -> Self {
        Self::with_deadline(email, token, Instant::now() + ttl)
    }

    #[must_use]
    pub fn with_deadline(email: String, token: SecretString, expires_at: Instant) -> Self {
        Self {
            email,
            token,
            expires_at,
        }
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    #[must_use]
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Why mounting the form was refused and where to go instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateRejection {
    pub notice: &'static str,
    pub redirect: Route,
}

/// Accept a present, unexpired grant; reject anything else.
///
/// # Errors
/// Returns a [`GateRejection`] pointing at the verification page.
pub fn check_gate(grant: Option<&VerificationGrant>, now: Instant) -> Result<(), GateRejection> {
    match grant {
        Some(grant) if !grant.is_expired(now) => Ok(()),
        _ => Err(GateRejection {
            notice: ACCESS_DENIED_NOTICE,
            redirect: Route::OtpVerify,
        }),
    }
}
