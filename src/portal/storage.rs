//! Database helpers for student records, passcodes and verification tokens.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::{info_span, Instrument, Span};
use uuid::Uuid;

use super::types::StudentProfile;

/// Outcome of a password set attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SetPasswordOutcome {
    Updated,
    UnknownStudent,
    InvalidToken,
    EmailMismatch,
}

/// Outcome of a passcode request; callers never reveal which one happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OtpIssueOutcome {
    Issued,
    UnknownEmail,
}

/// Outcome of a passcode check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OtpCheckOutcome {
    Verified,
    Invalid,
}

/// Profile plus the stored hash, used by login.
pub(crate) struct CredentialRecord {
    pub(crate) profile: StudentProfile,
    pub(crate) password_hash: Option<String>,
}

fn db_span(operation: &'static str, statement: &'static str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn profile_from_row(row: &sqlx::postgres::PgRow) -> StudentProfile {
    StudentProfile {
        roll_number: row.get("roll_number"),
        name: row.get("name"),
        semester: row.get("semester"),
        branch: row.get("branch"),
        email: row.get("email"),
    }
}

/// Look up the public profile for a roll number.
pub(crate) async fn find_student_profile(
    pool: &PgPool,
    roll_number: &str,
) -> Result<Option<StudentProfile>> {
    let query = "SELECT roll_number, name, semester, branch, email FROM students WHERE roll_number = $1";
    let row = sqlx::query(query)
        .bind(roll_number)
        .fetch_optional(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to look up student")?;

    Ok(row.as_ref().map(profile_from_row))
}

/// Look up the profile and password hash for a roll number.
pub(crate) async fn find_credentials(
    pool: &PgPool,
    roll_number: &str,
) -> Result<Option<CredentialRecord>> {
    let query = "SELECT roll_number, name, semester, branch, email, password_hash FROM students WHERE roll_number = $1";
    let row = sqlx::query(query)
        .bind(roll_number)
        .fetch_optional(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to look up credentials")?;

    Ok(row.map(|row| CredentialRecord {
        profile: profile_from_row(&row),
        password_hash: row.get("password_hash"),
    }))
}

/// Read-only check that `token_hash` could authorize a password set for
/// `roll_number`. Returns the rejection, or `None` when the token looks usable.
/// `set_password_with_token` checks again under lock.
pub(crate) async fn password_token_rejection(
    pool: &PgPool,
    roll_number: &str,
    token_hash: &[u8],
) -> Result<Option<SetPasswordOutcome>> {
    let query = r"
        SELECT t.email AS token_email, s.email AS student_email
        FROM verification_tokens t
        LEFT JOIN students s ON s.roll_number = $2
        WHERE t.token_hash = $1 AND t.consumed_at IS NULL AND t.expires_at > NOW()
    ";
    let row = sqlx::query(query)
        .bind(token_hash)
        .bind(roll_number)
        .fetch_optional(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to check verification token")?;

    let Some(row) = row else {
        return Ok(Some(SetPasswordOutcome::InvalidToken));
    };
    let token_email: String = row.get("token_email");
    let student_email: Option<String> = row.get("student_email");

    Ok(match student_email {
        None => Some(SetPasswordOutcome::UnknownStudent),
        Some(email) if !email.eq_ignore_ascii_case(&token_email) => {
            Some(SetPasswordOutcome::EmailMismatch)
        }
        Some(_) => None,
    })
}

/// Overwrite the password for `roll_number`, consuming the verification token.
///
/// The token must be unexpired, unused, and issued for the student's email.
/// Everything happens in one transaction so a token can authorize one update.
pub(crate) async fn set_password_with_token(
    pool: &PgPool,
    roll_number: &str,
    token_hash: &[u8],
    password_hash: &str,
) -> Result<SetPasswordOutcome> {
    let mut tx = pool.begin().await.context("begin set-password transaction")?;

    let query = r"
        SELECT email FROM verification_tokens
        WHERE token_hash = $1 AND consumed_at IS NULL AND expires_at > NOW()
        FOR UPDATE
    ";
    let token_email: Option<String> = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to look up verification token")?
        .map(|row| row.get("email"));

    let Some(token_email) = token_email else {
        let _ = tx.rollback().await;
        return Ok(SetPasswordOutcome::InvalidToken);
    };

    let query = "SELECT email FROM students WHERE roll_number = $1 FOR UPDATE";
    let student_email: Option<String> = sqlx::query(query)
        .bind(roll_number)
        .fetch_optional(&mut *tx)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to lock student")?
        .map(|row| row.get("email"));

    let Some(student_email) = student_email else {
        let _ = tx.rollback().await;
        return Ok(SetPasswordOutcome::UnknownStudent);
    };

    if !student_email.eq_ignore_ascii_case(&token_email) {
        let _ = tx.rollback().await;
        return Ok(SetPasswordOutcome::EmailMismatch);
    }

    let query = r"
        UPDATE students
        SET password_hash = $2,
            email_verified_at = COALESCE(email_verified_at, NOW()),
            updated_at = NOW()
        WHERE roll_number = $1
    ";
    sqlx::query(query)
        .bind(roll_number)
        .bind(password_hash)
        .execute(&mut *tx)
        .instrument(db_span("UPDATE", query))
        .await
        .context("failed to update password")?;

    let query = "UPDATE verification_tokens SET consumed_at = NOW() WHERE token_hash = $1";
    sqlx::query(query)
        .bind(token_hash)
        .execute(&mut *tx)
        .instrument(db_span("UPDATE", query))
        .await
        .context("failed to consume verification token")?;

    tx.commit().await.context("commit set-password transaction")?;

    Ok(SetPasswordOutcome::Updated)
}

/// Store a new passcode for `email`, replacing any pending one.
pub(crate) async fn issue_otp(
    pool: &PgPool,
    email: &str,
    code_hash: &[u8],
    ttl_seconds: i64,
) -> Result<OtpIssueOutcome> {
    let mut tx = pool.begin().await.context("begin issue-otp transaction")?;

    let query = "SELECT EXISTS(SELECT 1 FROM students WHERE email = $1) AS found";
    let exists: bool = sqlx::query(query)
        .bind(email)
        .fetch_one(&mut *tx)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to check student email")?
        .get("found");

    if !exists {
        let _ = tx.rollback().await;
        return Ok(OtpIssueOutcome::UnknownEmail);
    }

    let query = "DELETE FROM student_otps WHERE email = $1 AND consumed_at IS NULL";
    sqlx::query(query)
        .bind(email)
        .execute(&mut *tx)
        .instrument(db_span("DELETE", query))
        .await
        .context("failed to clear pending passcodes")?;

    let query = r"
        INSERT INTO student_otps (email, code_hash, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    sqlx::query(query)
        .bind(email)
        .bind(code_hash)
        .bind(ttl_seconds)
        .execute(&mut *tx)
        .instrument(db_span("INSERT", query))
        .await
        .context("failed to insert passcode")?;

    tx.commit().await.context("commit issue-otp transaction")?;

    Ok(OtpIssueOutcome::Issued)
}

/// Check a passcode and, on success, store a verification token for `email`.
///
/// Every wrong guess increments the attempt counter; once `max_attempts` is
/// reached the passcode can no longer be used even with the right code.
pub(crate) async fn consume_otp(
    pool: &PgPool,
    email: &str,
    code_hash: &[u8],
    max_attempts: i32,
    token_hash: &[u8],
    token_ttl_seconds: i64,
) -> Result<OtpCheckOutcome> {
    let mut tx = pool.begin().await.context("begin verify-otp transaction")?;

    let query = r"
        SELECT id, code_hash, attempts FROM student_otps
        WHERE email = $1 AND consumed_at IS NULL AND expires_at > NOW()
        ORDER BY created_at DESC
        LIMIT 1
        FOR UPDATE
    ";
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(&mut *tx)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to look up passcode")?;

    let Some(row) = row else {
        let _ = tx.rollback().await;
        return Ok(OtpCheckOutcome::Invalid);
    };

    let id: Uuid = row.get("id");
    let stored_hash: Vec<u8> = row.get("code_hash");
    let attempts: i32 = row.get("attempts");

    if attempts >= max_attempts {
        let _ = tx.rollback().await;
        return Ok(OtpCheckOutcome::Invalid);
    }

    if stored_hash != code_hash {
        let query = "UPDATE student_otps SET attempts = attempts + 1 WHERE id = $1";
        sqlx::query(query)
            .bind(id)
            .execute(&mut *tx)
            .instrument(db_span("UPDATE", query))
            .await
            .context("failed to record passcode attempt")?;
        tx.commit().await.context("commit verify-otp transaction")?;
        return Ok(OtpCheckOutcome::Invalid);
    }

    let query = "UPDATE student_otps SET consumed_at = NOW() WHERE id = $1";
    sqlx::query(query)
        .bind(id)
        .execute(&mut *tx)
        .instrument(db_span("UPDATE", query))
        .await
        .context("failed to consume passcode")?;

    let query = r"
        INSERT INTO verification_tokens (token_hash, email, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    sqlx::query(query)
        .bind(token_hash)
        .bind(email)
        .bind(token_ttl_seconds)
        .execute(&mut *tx)
        .instrument(db_span("INSERT", query))
        .await
        .context("failed to insert verification token")?;

    tx.commit().await.context("commit verify-otp transaction")?;

    Ok(OtpCheckOutcome::Verified)
}
