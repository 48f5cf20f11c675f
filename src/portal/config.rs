//! Runtime configuration and shared state for the portal API.

use secrecy::SecretString;
use std::sync::Arc;

use super::otp::{LogOtpSender, OtpSender};

const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:5173";
const DEFAULT_OTP_TTL_SECONDS: i64 = 10 * 60;
const DEFAULT_OTP_MAX_ATTEMPTS: i32 = 5;
const DEFAULT_VERIFICATION_TOKEN_TTL_SECONDS: i64 = 15 * 60;

#[derive(Clone, Debug)]
pub struct PortalConfig {
    frontend_base_url: String,
    otp_ttl_seconds: i64,
    otp_max_attempts: i32,
    verification_token_ttl_seconds: i64,
    password_pepper: Option<SecretString>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FRONTEND_BASE_URL.to_string())
    }
}

impl PortalConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            otp_ttl_seconds: DEFAULT_OTP_TTL_SECONDS,
            otp_max_attempts: DEFAULT_OTP_MAX_ATTEMPTS,
            verification_token_ttl_seconds: DEFAULT_VERIFICATION_TOKEN_TTL_SECONDS,
            password_pepper: None,
        }
    }

    #[must_use]
    pub fn with_otp_ttl_seconds(mut self, seconds: i64) -> Self {
        self.otp_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_otp_max_attempts(mut self, attempts: i32) -> Self {
        self.otp_max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_verification_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.verification_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_password_pepper(mut self, pepper: Option<SecretString>) -> Self {
        self.password_pepper = pepper;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn otp_ttl_seconds(&self) -> i64 {
        self.otp_ttl_seconds
    }

    #[must_use]
    pub fn otp_max_attempts(&self) -> i32 {
        self.otp_max_attempts
    }

    #[must_use]
    pub fn verification_token_ttl_seconds(&self) -> i64 {
        self.verification_token_ttl_seconds
    }

    #[must_use]
    pub fn password_pepper(&self) -> Option<&SecretString> {
        self.password_pepper.as_ref()
    }
}

/// State shared by every handler through an `Extension`.
pub struct PortalState {
    config: PortalConfig,
    otp_sender: Arc<dyn OtpSender>,
}

impl PortalState {
    #[must_use]
    pub fn new(config: PortalConfig, otp_sender: Arc<dyn OtpSender>) -> Self {
        Self { config, otp_sender }
    }

    /// State with the logging passcode sender, used for local development.
    #[must_use]
    pub fn with_log_sender(config: PortalConfig) -> Self {
        Self::new(config, Arc::new(LogOtpSender))
    }

    #[must_use]
    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    #[must_use]
    pub fn otp_sender(&self) -> &dyn OtpSender {
        self.otp_sender.as_ref()
    }
}

impl std::fmt::Debug for PortalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalState")
            .field("config", &self.config)
            .field("otp_sender", &"dyn OtpSender")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn defaults_are_applied() {
        let config = PortalConfig::default();
        assert_eq!(config.frontend_base_url(), "http://localhost:5173");
        assert_eq!(config.otp_ttl_seconds(), 600);
        assert_eq!(config.otp_max_attempts(), 5);
        assert_eq!(config.verification_token_ttl_seconds(), 900);
        assert!(config.password_pepper().is_none());
    }

    #[test]
    fn builder_overrides_values() {
        let config = PortalConfig::new("https://portal.example.edu".to_string())
            .with_otp_ttl_seconds(60)
            .with_otp_max_attempts(3)
            .with_verification_token_ttl_seconds(120)
            .with_password_pepper(Some(SecretString::from("pepper".to_string())));
        assert_eq!(config.frontend_base_url(), "https://portal.example.edu");
        assert_eq!(config.otp_ttl_seconds(), 60);
        assert_eq!(config.otp_max_attempts(), 3);
        assert_eq!(config.verification_token_ttl_seconds(), 120);
        assert_eq!(
            config.password_pepper().map(|pepper| pepper.expose_secret()),
            Some("pepper")
        );
    }

    #[test]
    fn debug_redacts_pepper() {
        let config = PortalConfig::default()
            .with_password_pepper(Some(SecretString::from("do-not-print".to_string())));
        let state = PortalState::with_log_sender(config);
        let rendered = format!("{state:?}");
        assert!(!rendered.contains("do-not-print"));
    }
}
