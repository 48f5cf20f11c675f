//! HTTP access to the portal API with a fixed timeout and tagged errors.
//!
//! The workflow only needs [`PortalApi`]; [`HttpPortalApi`] implements it on
//! top of `reqwest` and adds the passcode and login calls the CLI uses.

use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use std::{future::Future, time::Duration};
use tracing::{debug, instrument};

use super::{errors::PortalError, gate::VerificationGrant};
use crate::{
    portal::types::{
        LoginRequest, LookupRequest, OtpSendRequest, OtpVerifyRequest, OtpVerifyResponse,
        SetPasswordRequest, StudentProfile, VERIFICATION_TOKEN_HEADER,
    },
    APP_USER_AGENT,
};

/// Request timeout applied to every call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum number of error body characters surfaced to the user.
const MAX_ERROR_CHARS: usize = 200;

/// Server operations the registration workflow depends on.
pub trait PortalApi {
    fn lookup_student(
        &self,
        roll_number: &str,
    ) -> impl Future<Output = Result<StudentProfile, PortalError>> + Send;

    /// Set the password, authorized by the verification token.
    fn set_password(
        &self,
        request: &SetPasswordRequest,
        token: &SecretString,
    ) -> impl Future<Output = Result<(), PortalError>> + Send;
}

#[derive(Clone, Debug)]
pub struct HttpPortalApi {
    client: Client,
    base_url: String,
}

impl HttpPortalApi {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, PortalError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|err| PortalError::Network(format!("Failed to build client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the server to email a passcode. The server answers the same way
    /// for known and unknown addresses.
    ///
    /// # Errors
    /// Returns an error on transport failures or a non-success status.
    #[instrument(skip(self))]
    pub async fn request_otp(&self, email: &str) -> Result<(), PortalError> {
        let body = OtpSendRequest {
            email: email.to_string(),
        };
        let response = self.post("/api/student/otp/send", &body, None).await?;
        handle_empty_response(response).await
    }

    /// Exchange a passcode for a verification grant.
    ///
    /// # Errors
    /// Returns [`PortalError::Validation`] when the code is rejected.
    #[instrument(skip(self, otp))]
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<VerificationGrant, PortalError> {
        let body = OtpVerifyRequest {
            email: email.to_string(),
            otp: otp.to_string(),
        };
        let response = self.post("/api/student/otp/verify", &body, None).await?;
        let verified: OtpVerifyResponse = handle_json_response(response).await?;
        let ttl = Duration::from_secs(u64::try_from(verified.expires_in).unwrap_or_default());

        Ok(VerificationGrant::new(
            email.to_string(),
            SecretString::from(verified.token),
            ttl,
        ))
    }

    /// # Errors
    /// Returns [`PortalError::Verification`] for bad credentials.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        roll_number: &str,
        password: &SecretString,
    ) -> Result<StudentProfile, PortalError> {
        let body = LoginRequest {
            roll_number: roll_number.to_string(),
            password: password.expose_secret().to_string(),
        };
        let response = self.post("/api/student/login", &body, None).await?;
        handle_json_response(response).await
    }

    async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        token: Option<&SecretString>,
    ) -> Result<Response, PortalError> {
        let url = build_url_with_base(&self.base_url, path);
        debug!("POST {url}");

        let mut builder = self.client.post(&url).json(body);
        if let Some(token) = token {
            builder = builder.header(VERIFICATION_TOKEN_HEADER, token.expose_secret());
        }

        builder.send().await.map_err(map_request_error)
    }
}

impl PortalApi for HttpPortalApi {
    async fn lookup_student(&self, roll_number: &str) -> Result<StudentProfile, PortalError> {
        let body = LookupRequest {
            roll_number: roll_number.to_string(),
        };
        let response = self.post("/api/student/lookup", &body, None).await?;
        handle_json_response(response).await
    }

    async fn set_password(
        &self,
        request: &SetPasswordRequest,
        token: &SecretString,
    ) -> Result<(), PortalError> {
        let response = self
            .post("/api/student/password", request, Some(token))
            .await?;
        handle_empty_response(response).await
    }
}

/// Builds a URL from an explicit base URL and the provided path.
fn build_url_with_base(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

fn map_request_error(err: reqwest::Error) -> PortalError {
    if err.is_timeout() {
        PortalError::Timeout
    } else {
        PortalError::Network(format!("Unable to reach the server: {err}"))
    }
}

async fn handle_json_response<T: DeserializeOwned>(response: Response) -> Result<T, PortalError> {
    if response.status().is_success() {
        response
            .json::<T>()
            .await
            .map_err(|err| PortalError::Parse(format!("Failed to decode response: {err}")))
    } else {
        Err(status_error(response).await)
    }
}

/// Success responses may carry a body (`{message}`); it is ignored.
async fn handle_empty_response(response: Response) -> Result<(), PortalError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(status_error(response).await)
    }
}

async fn status_error(response: Response) -> PortalError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    PortalError::from_status(status, sanitize_body(&body))
}

/// Trims and truncates error bodies before they reach the user.
fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
