//! Logout command - clears the stored session.

use anyhow::{Context as _, Result};
use clap::Args;
use console::style;

use super::Context;

/// Arguments for the logout command.
#[derive(Args, Debug)]
pub struct LogoutArgs {}

/// Run the logout command.
pub async fn run(_args: LogoutArgs, ctx: &Context) -> Result<()> {
    ctx.session()
        .clear_session()
        .context("Failed to clear session")?;
    tracing::info!("Session cleared");

    if ctx.json_output {
        println!("{}", serde_json::json!({ "signed_in": false }));
    } else {
        println!("{} Signed out", style("✓").green());
    }
    Ok(())
}
