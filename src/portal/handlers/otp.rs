//! Email passcode endpoints.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::{normalize_email, valid_email};
use crate::portal::{
    config::PortalState,
    otp::{generate_otp_code, generate_verification_token, hash_secret, normalize_otp},
    storage::{self, OtpCheckOutcome, OtpIssueOutcome},
    types::{OtpSendRequest, OtpVerifyRequest, OtpVerifyResponse},
};

/// Send a passcode to a student email (always returns 204 to avoid probing).
#[utoipa::path(
    post,
    path = "/api/student/otp/send",
    request_body = OtpSendRequest,
    responses(
        (status = 204, description = "Request accepted"),
        (status = 400, description = "Missing payload", body = String)
    ),
    tag = "otp"
)]
#[instrument(skip(pool, state, payload))]
pub async fn send_otp(
    pool: Extension<PgPool>,
    state: Extension<Arc<PortalState>>,
    payload: Option<Json<OtpSendRequest>>,
) -> Response {
    let request: OtpSendRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return StatusCode::NO_CONTENT.into_response();
    }

    let code = generate_otp_code();
    match storage::issue_otp(
        &pool,
        &email,
        &hash_secret(&code),
        state.config().otp_ttl_seconds(),
    )
    .await
    {
        Ok(OtpIssueOutcome::Issued) => {
            if let Err(e) = state.otp_sender().send(&email, &code) {
                error!("Error sending passcode: {:?}", e);
            }
        }
        Ok(OtpIssueOutcome::UnknownEmail) => debug!("passcode requested for unknown email"),
        Err(e) => error!("Error issuing passcode: {:?}", e),
    }

    StatusCode::NO_CONTENT.into_response()
}

/// Check a passcode and hand out a short-lived verification token.
#[utoipa::path(
    post,
    path = "/api/student/otp/verify",
    request_body = OtpVerifyRequest,
    responses(
        (status = 200, description = "Passcode accepted", body = OtpVerifyResponse),
        (status = 400, description = "Invalid, expired or exhausted passcode", body = String)
    ),
    tag = "otp"
)]
#[instrument(skip(pool, state, payload))]
pub async fn verify_otp(
    pool: Extension<PgPool>,
    state: Extension<Arc<PortalState>>,
    payload: Option<Json<OtpVerifyRequest>>,
) -> Response {
    let request: OtpVerifyRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    let Some(code) = normalize_otp(&request.otp) else {
        return (StatusCode::BAD_REQUEST, "Invalid code".to_string()).into_response();
    };
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid code".to_string()).into_response();
    }

    let token = match generate_verification_token() {
        Ok(token) => token,
        Err(e) => {
            error!("Error generating verification token: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Verification failed".to_string(),
            )
                .into_response();
        }
    };

    let config = state.config();
    match storage::consume_otp(
        &pool,
        &email,
        &hash_secret(&code),
        config.otp_max_attempts(),
        &hash_secret(&token),
        config.verification_token_ttl_seconds(),
    )
    .await
    {
        Ok(OtpCheckOutcome::Verified) => (
            StatusCode::OK,
            Json(OtpVerifyResponse {
                token,
                expires_in: config.verification_token_ttl_seconds(),
            }),
        )
            .into_response(),
        Ok(OtpCheckOutcome::Invalid) => {
            (StatusCode::BAD_REQUEST, "Invalid code".to_string()).into_response()
        }
        Err(e) => {
            error!("Error verifying passcode: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Verification failed".to_string(),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::config::PortalConfig;
    use anyhow::Result;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_pool() -> Result<PgPool> {
        Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
    }

    fn state() -> Arc<PortalState> {
        Arc::new(PortalState::with_log_sender(PortalConfig::default()))
    }

    #[tokio::test]
    async fn send_otp_missing_payload() -> Result<()> {
        let response = send_otp(Extension(lazy_pool()?), Extension(state()), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn send_otp_invalid_email_is_opaque() -> Result<()> {
        let response = send_otp(
            Extension(lazy_pool()?),
            Extension(state()),
            Some(Json(OtpSendRequest {
                email: "not-an-email".to_string(),
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        Ok(())
    }

    #[tokio::test]
    async fn verify_otp_missing_payload() -> Result<()> {
        let response = verify_otp(Extension(lazy_pool()?), Extension(state()), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn verify_otp_rejects_malformed_code() -> Result<()> {
        let response = verify_otp(
            Extension(lazy_pool()?),
            Extension(state()),
            Some(Json(OtpVerifyRequest {
                email: "a@x.com".to_string(),
                otp: "12ab".to_string(),
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn verify_otp_rejects_invalid_email() -> Result<()> {
        let response = verify_otp(
            Extension(lazy_pool()?),
            Extension(state()),
            Some(Json(OtpVerifyRequest {
                email: "nobody".to_string(),
                otp: "123456".to_string(),
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
