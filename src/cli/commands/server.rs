use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_OTP_TTL_SECONDS: &str = "otp-ttl-seconds";
pub const ARG_OTP_MAX_ATTEMPTS: &str = "otp-max-attempts";
pub const ARG_VERIFICATION_TOKEN_TTL_SECONDS: &str = "verification-token-ttl-seconds";
pub const ARG_PASSWORD_PEPPER: &str = "password-pepper";

/// Values of the `server` subcommand after parsing.
#[derive(Debug)]
pub struct Options {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub otp_ttl_seconds: i64,
    pub otp_max_attempts: i32,
    pub verification_token_ttl_seconds: i64,
    pub password_pepper: Option<SecretString>,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            port: matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080),
            dsn: matches
                .get_one::<String>(ARG_DSN)
                .cloned()
                .context("missing required argument: --dsn")?,
            frontend_base_url: matches
                .get_one::<String>(ARG_FRONTEND_BASE_URL)
                .cloned()
                .context("missing required argument: --frontend-base-url")?,
            otp_ttl_seconds: matches
                .get_one::<i64>(ARG_OTP_TTL_SECONDS)
                .copied()
                .unwrap_or(600),
            otp_max_attempts: matches
                .get_one::<i32>(ARG_OTP_MAX_ATTEMPTS)
                .copied()
                .unwrap_or(5),
            verification_token_ttl_seconds: matches
                .get_one::<i64>(ARG_VERIFICATION_TOKEN_TTL_SECONDS)
                .copied()
                .unwrap_or(900),
            password_pepper: matches
                .get_one::<String>(ARG_PASSWORD_PEPPER)
                .filter(|pepper| !pepper.is_empty())
                .map(|pepper| SecretString::from(pepper.clone())),
        })
    }
}

#[must_use]
pub fn command() -> Command {
    Command::new("server")
        .about("Run the portal API server")
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("UGPORTAL_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .env("UGPORTAL_DSN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend origin allowed by CORS")
                .default_value("http://localhost:5173")
                .env("UGPORTAL_FRONTEND_BASE_URL"),
        )
        .arg(
            Arg::new(ARG_OTP_TTL_SECONDS)
                .long(ARG_OTP_TTL_SECONDS)
                .help("Passcode lifetime in seconds")
                .default_value("600")
                .env("UGPORTAL_OTP_TTL_SECONDS")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_OTP_MAX_ATTEMPTS)
                .long(ARG_OTP_MAX_ATTEMPTS)
                .help("Wrong guesses allowed per passcode")
                .default_value("5")
                .env("UGPORTAL_OTP_MAX_ATTEMPTS")
                .value_parser(clap::value_parser!(i32).range(1..)),
        )
        .arg(
            Arg::new(ARG_VERIFICATION_TOKEN_TTL_SECONDS)
                .long(ARG_VERIFICATION_TOKEN_TTL_SECONDS)
                .help("Verification token lifetime in seconds")
                .default_value("900")
                .env("UGPORTAL_VERIFICATION_TOKEN_TTL_SECONDS")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_PASSWORD_PEPPER)
                .long(ARG_PASSWORD_PEPPER)
                .help("Secret mixed into password hashes")
                .env("UGPORTAL_PASSWORD_PEPPER")
                .hide_env_values(true),
        )
}
