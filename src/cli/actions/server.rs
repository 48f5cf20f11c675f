use crate::portal::{self, PortalConfig, PortalState};
use anyhow::Result;
use secrecy::SecretString;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub otp_ttl_seconds: i64,
    pub otp_max_attempts: i32,
    pub verification_token_ttl_seconds: i64,
    pub password_pepper: Option<SecretString>,
}

impl Args {
    fn portal_config(&self) -> PortalConfig {
        PortalConfig::new(self.frontend_base_url.clone())
            .with_otp_ttl_seconds(self.otp_ttl_seconds)
            .with_otp_max_attempts(self.otp_max_attempts)
            .with_verification_token_ttl_seconds(self.verification_token_ttl_seconds)
            .with_password_pepper(self.password_pepper.clone())
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = args.portal_config();
    debug!("portal config: {:?}", config);

    portal::new(args.port, args.dsn, PortalState::with_log_sender(config)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_map_to_portal_config() {
        let args = Args {
            port: 8080,
            dsn: "postgres://localhost/ugportal".to_string(),
            frontend_base_url: "https://portal.example.edu".to_string(),
            otp_ttl_seconds: 60,
            otp_max_attempts: 2,
            verification_token_ttl_seconds: 300,
            password_pepper: None,
        };
        let config = args.portal_config();
        assert_eq!(config.frontend_base_url(), "https://portal.example.edu");
        assert_eq!(config.otp_ttl_seconds(), 60);
        assert_eq!(config.otp_max_attempts(), 2);
        assert_eq!(config.verification_token_ttl_seconds(), 300);
        assert!(config.password_pepper().is_none());
    }
}
