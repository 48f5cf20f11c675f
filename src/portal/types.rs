//! Request/response types shared by the portal API and its client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use utoipa::ToSchema;

/// Header carrying the verification token issued by `/api/student/otp/verify`.
pub const VERIFICATION_TOKEN_HEADER: &str = "x-portal-verification-token";

/// Public fields of a student record.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    #[serde(default)]
    pub roll_number: String,
    pub name: String,
    #[serde(rename = "sem")]
    pub semester: String,
    pub branch: String,
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest {
    pub roll_number: String,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SetPasswordRequest {
    pub roll_number: String,
    pub password: String,
}

impl fmt::Debug for SetPasswordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetPasswordRequest")
            .field("roll_number", &self.roll_number)
            .field("password", &"***")
            .finish()
    }
}

/// Body accepted by the legacy `/api/student/register` endpoint.
///
/// The payload shape selects the operation: a body with a `password` key sets
/// the password, a body without one looks the student up. A `password` that is
/// not a string is rejected rather than read as a lookup.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged, try_from = "Map<String, Value>")]
pub enum RegisterRequest {
    SetPassword(SetPasswordRequest),
    Lookup(LookupRequest),
}

impl TryFrom<Map<String, Value>> for RegisterRequest {
    type Error = serde_json::Error;

    fn try_from(body: Map<String, Value>) -> Result<Self, Self::Error> {
        if body.contains_key("password") {
            serde_json::from_value(Value::Object(body)).map(Self::SetPassword)
        } else {
            serde_json::from_value(Value::Object(body)).map(Self::Lookup)
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OtpSendRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OtpVerifyRequest {
    pub email: String,
    pub otp: String,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerifyResponse {
    pub token: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
}

impl fmt::Debug for OtpVerifyResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpVerifyResponse")
            .field("token", &"***")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub roll_number: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("roll_number", &self.roll_number)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};
    use serde_json::json;

    #[test]
    fn profile_uses_wire_field_names() -> Result<()> {
        let profile = StudentProfile {
            roll_number: "21CS001".to_string(),
            name: "A".to_string(),
            semester: "3".to_string(),
            branch: "CS".to_string(),
            email: "a@x.com".to_string(),
        };
        let value = serde_json::to_value(&profile)?;
        let sem = value
            .get("sem")
            .and_then(serde_json::Value::as_str)
            .context("missing sem")?;
        assert_eq!(sem, "3");
        assert!(value.get("rollNumber").is_some());
        assert!(value.get("semester").is_none());
        Ok(())
    }

    #[test]
    fn profile_accepts_body_without_roll_number() -> Result<()> {
        let profile: StudentProfile = serde_json::from_value(json!({
            "name": "A",
            "sem": "3",
            "branch": "CS",
            "email": "a@x.com",
        }))?;
        assert_eq!(profile.roll_number, "");
        assert_eq!(profile.branch, "CS");
        Ok(())
    }

    #[test]
    fn register_request_with_password_is_set_password() -> Result<()> {
        let request: RegisterRequest =
            serde_json::from_value(json!({"rollNumber": "21CS001", "password": "secret"}))?;
        assert_eq!(
            request,
            RegisterRequest::SetPassword(SetPasswordRequest {
                roll_number: "21CS001".to_string(),
                password: "secret".to_string(),
            })
        );
        Ok(())
    }

    #[test]
    fn register_request_without_password_is_lookup() -> Result<()> {
        let request: RegisterRequest = serde_json::from_value(json!({"rollNumber": "21CS001"}))?;
        assert_eq!(
            request,
            RegisterRequest::Lookup(LookupRequest {
                roll_number: "21CS001".to_string(),
            })
        );
        Ok(())
    }

    #[test]
    fn register_request_with_non_string_password_is_rejected() {
        for password in [json!(null), json!(12_345_678), json!(["Abc12345!"])] {
            let request = serde_json::from_value::<RegisterRequest>(
                json!({"rollNumber": "21CS001", "password": password}),
            );
            assert!(request.is_err(), "accepted password {password}");
        }
    }

    #[test]
    fn register_request_rejects_missing_roll_number() {
        let request = serde_json::from_value::<RegisterRequest>(json!({"password": "secret"}));
        assert!(request.is_err());
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let request = SetPasswordRequest {
            roll_number: "21CS001".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{request:?}").contains("hunter2"));

        let response = OtpVerifyResponse {
            token: "raw-token".to_string(),
            expires_in: 60,
        };
        assert!(!format!("{response:?}").contains("raw-token"));
    }
}
