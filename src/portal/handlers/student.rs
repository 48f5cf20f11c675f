//! Student lookup and password setup endpoints.
//!
//! `/api/student/lookup` and `/api/student/password` are the explicit
//! operations. `/api/student/register` keeps the legacy contract where one
//! path serves both and the request body decides which one runs.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::{normalize_roll_number, valid_roll_number, verification_token};
use crate::portal::{
    config::PortalState,
    otp::hash_secret,
    password::{hash_password, valid_password},
    storage::{self, SetPasswordOutcome},
    types::{LookupRequest, MessageResponse, RegisterRequest, SetPasswordRequest, StudentProfile},
};

#[utoipa::path(
    post,
    path = "/api/student/lookup",
    request_body = LookupRequest,
    responses(
        (status = 200, description = "Student found", body = StudentProfile, content_type = "application/json"),
        (status = 400, description = "Invalid roll number", body = String),
        (status = 404, description = "Student not found", body = String)
    ),
    tag = "student"
)]
#[instrument(skip(pool, payload))]
pub async fn lookup(pool: Extension<PgPool>, payload: Option<Json<LookupRequest>>) -> Response {
    let request: LookupRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    lookup_student(&pool, &request).await
}

#[utoipa::path(
    post,
    path = "/api/student/password",
    request_body = SetPasswordRequest,
    params(
        ("X-Portal-Verification-Token" = String, Header, description = "Token issued by /api/student/otp/verify")
    ),
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Invalid roll number or password", body = String),
        (status = 401, description = "Missing, invalid or expired verification token", body = String),
        (status = 403, description = "Token was issued for another email", body = String),
        (status = 404, description = "Student not found", body = String)
    ),
    tag = "student"
)]
#[instrument(skip(headers, pool, state, payload))]
pub async fn set_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<PortalState>>,
    payload: Option<Json<SetPasswordRequest>>,
) -> Response {
    let request: SetPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    update_password(&headers, &pool, &state, &request).await
}

#[utoipa::path(
    post,
    path = "/api/student/register",
    request_body = RegisterRequest,
    params(
        ("X-Portal-Verification-Token" = Option<String>, Header, description = "Required when the body carries a password")
    ),
    responses(
        (status = 200, description = "Student profile (lookup) or acknowledgment (password set)"),
        (status = 400, description = "Invalid payload", body = String),
        (status = 401, description = "Missing, invalid or expired verification token", body = String),
        (status = 403, description = "Token was issued for another email", body = String),
        (status = 404, description = "Student not found", body = String)
    ),
    tag = "student"
)]
#[instrument(skip(headers, pool, state, payload))]
pub async fn register(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<PortalState>>,
    payload: Option<Json<RegisterRequest>>,
) -> Response {
    match payload {
        Some(Json(RegisterRequest::SetPassword(request))) => {
            debug!("register: set-password payload");
            update_password(&headers, &pool, &state, &request).await
        }
        Some(Json(RegisterRequest::Lookup(request))) => {
            debug!("register: lookup payload");
            lookup_student(&pool, &request).await
        }
        None => (StatusCode::BAD_REQUEST, "Invalid payload".to_string()).into_response(),
    }
}

async fn lookup_student(pool: &PgPool, request: &LookupRequest) -> Response {
    let roll_number = normalize_roll_number(&request.roll_number);
    if !valid_roll_number(&roll_number) {
        return (StatusCode::BAD_REQUEST, "Invalid roll number".to_string()).into_response();
    }

    match storage::find_student_profile(pool, &roll_number).await {
        Ok(Some(profile)) => (StatusCode::OK, Json(profile)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Student not found".to_string()).into_response(),
        Err(e) => {
            error!("Error looking up student: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error looking up student".to_string(),
            )
                .into_response()
        }
    }
}

async fn update_password(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &PortalState,
    request: &SetPasswordRequest,
) -> Response {
    let roll_number = normalize_roll_number(&request.roll_number);
    if !valid_roll_number(&roll_number) {
        return (StatusCode::BAD_REQUEST, "Invalid roll number".to_string()).into_response();
    }

    if !valid_password(&request.password) {
        return (StatusCode::BAD_REQUEST, "Invalid password".to_string()).into_response();
    }

    let Some(token) = verification_token(headers) else {
        return (
            StatusCode::UNAUTHORIZED,
            "Missing verification token".to_string(),
        )
            .into_response();
    };

    let token_hash = hash_secret(&token);

    // Token checks run before the Argon2 hash and again inside the update.
    match storage::password_token_rejection(pool, &roll_number, &token_hash).await {
        Ok(Some(rejection)) => return set_password_response(rejection),
        Ok(None) => {}
        Err(e) => {
            error!("Error checking verification token: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error updating password".to_string(),
            )
                .into_response();
        }
    }

    let password_hash = match hash_password(&request.password, state.config().password_pepper())
    {
        Ok(hash) => hash,
        Err(e) => {
            error!("Error hashing password: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error updating password".to_string(),
            )
                .into_response();
        }
    };

    match storage::set_password_with_token(pool, &roll_number, &token_hash, &password_hash).await {
        Ok(outcome) => set_password_response(outcome),
        Err(e) => {
            error!("Error updating password: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error updating password".to_string(),
            )
                .into_response()
        }
    }
}

fn set_password_response(outcome: SetPasswordOutcome) -> Response {
    match outcome {
        SetPasswordOutcome::Updated => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Password updated".to_string(),
            }),
        )
            .into_response(),
        SetPasswordOutcome::InvalidToken => (
            StatusCode::UNAUTHORIZED,
            "Invalid verification token".to_string(),
        )
            .into_response(),
        SetPasswordOutcome::EmailMismatch => (
            StatusCode::FORBIDDEN,
            "Verification token does not match student".to_string(),
        )
            .into_response(),
        SetPasswordOutcome::UnknownStudent => {
            (StatusCode::NOT_FOUND, "Student not found".to_string()).into_response()
        }
    }
}
