//! Guard command - evaluates the route guard against the stored session.

use std::process::ExitCode;

use anyhow::Result;
use bankline_auth::{GuardOutcome, RouteGuard};
use clap::Args;
use console::style;

use super::Context;

/// Arguments for the guard command.
#[derive(Args, Debug)]
pub struct GuardArgs {
    /// Exit with status 2 when the guard redirects
    #[arg(long)]
    pub strict: bool,
}

/// Run the guard command.
pub async fn run(args: GuardArgs, ctx: &Context) -> Result<ExitCode> {
    let config = ctx.config()?;
    let guard = RouteGuard::new(ctx.session()).with_landing_route(&config.landing_route);
    let outcome = guard.check();
    tracing::debug!(allowed = outcome.is_allowed(), "Route guard evaluated");

    match &outcome {
        GuardOutcome::Allow => {
            if ctx.json_output {
                println!("true");
            } else {
                println!("{} Access allowed", style("✓").green());
            }
        }
        GuardOutcome::Redirect(redirect) => {
            if ctx.json_output {
                println!("{}", serde_json::to_string(redirect)?);
            } else {
                println!(
                    "{} Redirect to {}",
                    style("→").yellow(),
                    style(redirect.to_url()).cyan()
                );
            }
        }
    }

    if args.strict && !outcome.is_allowed() {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}
