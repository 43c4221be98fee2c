//! Config command - shows the resolved pipeline configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::style;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show resolved configuration (default)
    Show,

    /// Show configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Path => path(ctx),
    }
}

fn show(ctx: &Context) -> Result<()> {
    let config = ctx.config()?;
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let source = bankline_client::config::config_path()
        .filter(|p| p.exists())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    println!("{}", style("Pipeline Configuration").bold());
    println!("{}", style(format!("# source: {source}")).dim());
    println!();
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn path(ctx: &Context) -> Result<()> {
    let path = bankline_client::config::config_path();
    if ctx.json_output {
        println!("{}", serde_json::json!({ "path": path, "data_dir": ctx.data_dir() }));
        return Ok(());
    }
    match path {
        Some(p) => println!("{}", p.display()),
        None => println!("{}", style("No config directory available").yellow()),
    }
    Ok(())
}
