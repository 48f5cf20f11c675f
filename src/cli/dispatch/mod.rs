//! Map parsed CLI arguments to the action to run.

use crate::cli::{
    actions::{register, server, Action},
    commands,
};
use anyhow::{anyhow, Result};

/// # Errors
/// Returns an error if the subcommand is unknown or its arguments are incomplete.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some(("server", sub_m)) => {
            let options = commands::server::Options::parse(sub_m)?;
            Ok(Action::Server(server::Args {
                port: options.port,
                dsn: options.dsn,
                frontend_base_url: options.frontend_base_url,
                otp_ttl_seconds: options.otp_ttl_seconds,
                otp_max_attempts: options.otp_max_attempts,
                verification_token_ttl_seconds: options.verification_token_ttl_seconds,
                password_pepper: options.password_pepper,
            }))
        }
        Some(("register", sub_m)) => {
            let options = commands::register::Options::parse(sub_m)?;
            Ok(Action::Register(register::Args {
                api_url: options.api_url,
                email: options.email,
                roll_number: options.roll_number,
            }))
        }
        Some((name, _)) => Err(anyhow!("unknown subcommand: {name}")),
        None => Err(anyhow!("missing subcommand")),
    }
}
