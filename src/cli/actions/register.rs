//! Terminal front end for the registration workflow.

use crate::client::{
    workflow::{FormView, Notice},
    HttpPortalApi, RegistrationWorkflow,
};
use anyhow::{anyhow, Context, Result};
use std::io::IsTerminal;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, instrument};

#[derive(Debug)]
pub struct Args {
    pub api_url: String,
    pub email: String,
    pub roll_number: String,
}

/// Execute the register action against a running server.
/// # Errors
/// Returns an error if any step of the workflow fails.
#[instrument(skip(args), fields(email = %args.email))]
pub async fn execute(args: Args) -> Result<()> {
    let api = HttpPortalApi::new(&args.api_url)?;
    let interactive = std::io::stdin().is_terminal();
    let mut lines = BufReader::new(io::stdin()).lines();

    api.request_otp(&args.email).await?;
    println!("A passcode was sent to {} if it belongs to a student.", args.email);

    let otp = prompt(&mut lines, "Passcode: ").await?;
    let grant = api.verify_otp(&args.email, &otp).await?;
    debug!("email verified");

    let mut workflow =
        RegistrationWorkflow::mount(api, Some(grant)).map_err(|rejection| anyhow!(rejection.notice))?;

    workflow.set_roll_number(&args.roll_number);
    if workflow.find_student().await.is_err() {
        return Err(anyhow!(notice_text(&workflow.view())));
    }
    print_profile(&workflow.view());

    let password = prompt_secret(&mut lines, "New password: ", interactive).await?;
    workflow.set_password(&password);
    let strength = workflow.strength();
    println!("Strength: {} ({}/5)", strength.label, strength.score);

    let confirm = prompt_secret(&mut lines, "Confirm password: ", interactive).await?;
    workflow.set_confirm_password(&confirm);

    match workflow.submit_password().await {
        Ok(route) => {
            println!("{}", notice_text(&workflow.view()));
            println!("Continue at {}", route.path());
            Ok(())
        }
        Err(err) => {
            debug!("submit failed: {err}");
            Err(anyhow!(notice_text(&workflow.view())))
        }
    }
}

async fn prompt<R>(lines: &mut io::Lines<R>, label: &str) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    println!("{label}");
    let line = lines
        .next_line()
        .await?
        .context("input closed before a value was entered")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Read a password without echo from the terminal, or as a plain line when
/// input is piped.
async fn prompt_secret<R>(lines: &mut io::Lines<R>, label: &str, interactive: bool) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    if !interactive {
        return prompt(lines, label).await;
    }

    let label = label.to_string();
    tokio::task::spawn_blocking(move || rpassword::prompt_password(label))
        .await?
        .context("failed to read password")
}

fn print_profile(view: &FormView) {
    println!("Name:     {}", view.name.value);
    println!("Semester: {}", view.semester.value);
    println!("Branch:   {}", view.branch.value);
    println!("Email:    {}", view.email.value);
}

fn notice_text(view: &FormView) -> String {
    match &view.notice {
        Some(Notice::Error(message) | Notice::Success(message)) => message.clone(),
        None => String::new(),
    }
}
