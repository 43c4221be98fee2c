//! Login command - stores a session credential.

use anyhow::{Context as _, Result};
use bankline_auth::{Credential, SignIn};
use clap::Args;
use console::style;
use serde::Serialize;

use super::Context;

/// Arguments for the login command.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Bearer credential issued by the sign-in endpoint
    #[arg(long)]
    pub token: String,

    /// Account email
    #[arg(long)]
    pub email: Option<String>,

    /// User identifier
    #[arg(long)]
    pub user_id: Option<String>,

    /// Branch identifier
    #[arg(long)]
    pub branch_id: Option<String>,
}

/// Login result for JSON output.
#[derive(Debug, Serialize)]
struct LoginOutput {
    signed_in: bool,
    email: Option<String>,
    expires_at: Option<String>,
    expired: bool,
}

/// Run the login command.
pub async fn run(args: LoginArgs, ctx: &Context) -> Result<()> {
    let mut sign_in = SignIn::new(&args.token);
    if let Some(email) = &args.email {
        sign_in = sign_in.with_email(email);
    }
    if let Some(user_id) = &args.user_id {
        sign_in = sign_in.with_user_id(user_id);
    }
    if let Some(branch_id) = &args.branch_id {
        sign_in = sign_in.with_branch_id(branch_id);
    }

    ctx.session()
        .sign_in(&sign_in)
        .context("Failed to store session")?;

    let credential = Credential::parse(&args.token);
    let expires_at = credential
        .as_ref()
        .and_then(|c| c.claims())
        .and_then(|c| c.expires_at())
        .map(|t| t.to_rfc3339());
    let expired = credential.as_ref().is_some_and(|c| c.is_expired());
    tracing::info!(email = ?args.email, expired, "Session stored");

    if ctx.json_output {
        let output = LoginOutput {
            signed_in: true,
            email: args.email,
            expires_at,
            expired,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{} Session stored", style("✓").green());
    if let Some(email) = &args.email {
        println!("  Email:   {}", style(email).cyan());
    }
    match expires_at {
        Some(at) if expired => println!("  Expires: {} {}", at, style("(already expired)").yellow()),
        Some(at) => println!("  Expires: {}", at),
        None => println!("  Expires: never"),
    }
    Ok(())
}
