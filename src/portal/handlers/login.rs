use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, instrument};

use super::{normalize_roll_number, valid_roll_number};
use crate::portal::{
    config::PortalState,
    password::verify_password,
    storage,
    types::{LoginRequest, StudentProfile},
};

#[utoipa::path(
    post,
    path = "/api/student/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = StudentProfile),
        (status = 400, description = "Missing payload", body = String),
        (status = 401, description = "Invalid credentials", body = String)
    ),
    tag = "student"
)]
// axum handler for student login
#[instrument(skip(pool, state, payload))]
pub async fn login(
    pool: Extension<PgPool>,
    state: Extension<Arc<PortalState>>,
    payload: Option<Json<LoginRequest>>,
) -> Response {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let roll_number = normalize_roll_number(&request.roll_number);
    if !valid_roll_number(&roll_number) || request.password.is_empty() {
        return invalid_credentials();
    }

    let record = match storage::find_credentials(&pool, &roll_number).await {
        Ok(Some(record)) => record,
        Ok(None) => return invalid_credentials(),
        Err(e) => {
            error!("Error looking up credentials: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error logging in".to_string(),
            )
                .into_response();
        }
    };

    // Accounts that never finished registration have no hash yet.
    let Some(stored_hash) = record.password_hash else {
        return invalid_credentials();
    };

    match verify_password(
        &request.password,
        &stored_hash,
        state.config().password_pepper(),
    ) {
        Ok(true) => (StatusCode::OK, Json(record.profile)).into_response(),
        Ok(false) => invalid_credentials(),
        Err(e) => {
            error!("Error verifying password: {:?}", e);
            invalid_credentials()
        }
    }
}

fn invalid_credentials() -> Response {
    (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()).into_response()
}
