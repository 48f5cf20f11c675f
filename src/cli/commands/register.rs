use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_EMAIL: &str = "email";
pub const ARG_ROLL_NUMBER: &str = "roll-number";

#[derive(Debug)]
pub struct Options {
    pub api_url: String,
    pub email: String,
    pub roll_number: String,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            api_url: matches
                .get_one::<String>(ARG_API_URL)
                .cloned()
                .context("missing required argument: --api-url")?,
            email: matches
                .get_one::<String>(ARG_EMAIL)
                .cloned()
                .context("missing required argument: --email")?,
            roll_number: matches
                .get_one::<String>(ARG_ROLL_NUMBER)
                .cloned()
                .context("missing required argument: --roll-number")?,
        })
    }
}

#[must_use]
pub fn command() -> Command {
    Command::new("register")
        .about("Verify an email and set a student password from the terminal")
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Base URL of the portal API")
                .default_value("http://localhost:8080")
                .env("UGPORTAL_API_URL"),
        )
        .arg(
            Arg::new(ARG_EMAIL)
                .short('e')
                .long(ARG_EMAIL)
                .help("Student email that receives the passcode")
                .required(true),
        )
        .arg(
            Arg::new(ARG_ROLL_NUMBER)
                .short('r')
                .long(ARG_ROLL_NUMBER)
                .help("Student roll number")
                .required(true),
        )
}
