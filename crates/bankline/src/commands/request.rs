//! Request command - sends one request through the pipeline.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use bankline_auth::MemoryNavigator;
use bankline_client::ApiRequest;
use clap::Args;
use console::style;
use reqwest::Method;
use serde_json::Value;

use super::Context;

/// Arguments for the request command.
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    pub method: String,

    /// Path relative to the backend URL, or an absolute URL
    pub path: String,

    /// JSON request body
    #[arg(short, long)]
    pub data: Option<String>,

    /// Timeout for this request in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

/// Run the request command.
pub async fn run(args: RequestArgs, ctx: &Context) -> Result<()> {
    let method = Method::from_bytes(args.method.to_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {}", args.method))?;
    let body = match &args.data {
        Some(raw) => Some(serde_json::from_str::<Value>(raw).context("--data is not valid JSON")?),
        None => None,
    };
    if args.timeout_ms == Some(0) {
        bail!("--timeout-ms must be positive");
    }

    let navigator = Arc::new(MemoryNavigator::new());
    let client = ctx.client(navigator.clone())?;

    let mut request = ApiRequest::new(method, client.url(&args.path)?);
    if let Some(body) = body {
        request = request.with_json(body);
    }
    if let Some(ms) = args.timeout_ms {
        request = request.with_timeout(Duration::from_millis(ms));
    }

    tracing::debug!(method = %request.method, url = %request.url, "Sending request from CLI");
    let result = client.send(request).await;

    for redirect in navigator.history() {
        if ctx.json_output {
            eprintln!("{}", serde_json::to_string(&redirect)?);
        } else {
            eprintln!("{} Redirect to {}", style("→").yellow(), style(redirect.to_url()).cyan());
        }
    }

    match result {
        Ok(response) => {
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&response.body)?);
            } else {
                if ctx.verbose {
                    eprintln!("{} {}", style(response.status).green(), response.status_text);
                }
                match &response.body {
                    Value::Null => {}
                    Value::String(s) => println!("{s}"),
                    other => println!("{}", serde_json::to_string_pretty(other)?),
                }
            }
            Ok(())
        }
        Err(e) => {
            if ctx.json_output
                && let Some(normalized) = e.normalized()
            {
                println!("{}", serde_json::to_string_pretty(normalized)?);
            }
            Err(e.into())
        }
    }
}
