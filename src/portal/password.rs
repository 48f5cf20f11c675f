//! Password rules and Argon2id hashing.

use anyhow::{anyhow, Result};
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};

/// Upper bound on accepted password length (in characters).
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Passwords must contain something other than whitespace and stay bounded.
///
/// Strength is advisory on the client and is not enforced here.
#[must_use]
pub fn valid_password(password: &str) -> bool {
    !password.trim().is_empty() && password.chars().count() <= MAX_PASSWORD_LENGTH
}

fn argon2(pepper: Option<&SecretString>) -> Result<Argon2<'_>> {
    match pepper {
        Some(pepper) => Argon2::new_with_secret(
            pepper.expose_secret().as_bytes(),
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            argon2::Params::default(),
        )
        .map_err(|_| anyhow!("failed to initialize Argon2id")),
        None => Ok(Argon2::default()),
    }
}

/// Hash a password into a PHC string.
///
/// # Errors
/// Returns an error if Argon2 cannot be initialized or hashing fails.
pub fn hash_password(password: &str, pepper: Option<&SecretString>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2(pepper)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| anyhow!("failed to hash password"))?
        .to_string();
    Ok(hash)
}

/// Check a password against a stored PHC string.
///
/// # Errors
/// Returns an error if the stored hash cannot be parsed.
pub fn verify_password(
    password: &str,
    stored_hash: &str,
    pepper: Option<&SecretString>,
) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| anyhow!("invalid password hash"))?;
    Ok(argon2(pepper)?
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
