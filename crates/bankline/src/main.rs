//! Bankline - command-line front end for the dashboard request pipeline.
//!
//! Main entry point for the bankline CLI.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{config, guard, login, logout, request};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Bankline - banking dashboard session and request tool
#[derive(Parser)]
#[command(name = "bankline")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Backend URL (default: from config, else http://localhost:8080)
    #[arg(long, global = true, env = "BANKLINE_SERVER_URL")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a session credential
    Login(login::LoginArgs),

    /// Clear the stored session
    Logout(logout::LogoutArgs),

    /// Run the route guard against the stored session
    Guard(guard::GuardArgs),

    /// Send a request through the pipeline
    Request(request::RequestArgs),

    /// Show the resolved pipeline configuration
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Console (human-readable, stderr) + rotating JSON file
    let filter = if cli.verbose {
        "bankline=debug,bankline_client=debug,bankline_auth=debug,info"
    } else {
        "bankline=warn,bankline_client=warn,bankline_auth=warn,warn"
    };

    let log_dir = bankline_client::config::config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "bankline.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "bankline=trace,bankline_client=trace,bankline_auth=trace,info",
                )),
        )
        .init();

    let ctx = commands::Context {
        server_url: cli.server,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Login(args) => login::run(args, &ctx).await?,
        Commands::Logout(args) => logout::run(args, &ctx).await?,
        Commands::Guard(args) => return guard::run(args, &ctx).await,
        Commands::Request(args) => request::run(args, &ctx).await?,
        Commands::Config(args) => config::run(args, &ctx).await?,
    }
    Ok(ExitCode::SUCCESS)
}
