//! CLI command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use bankline_auth::{FileStore, MemoryNavigator, SessionStore};
use bankline_client::{BanklineClient, PipelineConfig};

use crate::output::{AuditSink, ConsoleNotifier};

pub mod config;
pub mod guard;
pub mod login;
pub mod logout;
pub mod request;

/// Environment variable overriding the session data directory.
const DATA_DIR_ENV: &str = "BANKLINE_DATA_DIR";

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Backend URL override.
    pub server_url: Option<String>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Configuration from disk with the `--server` override applied.
    pub fn config(&self) -> Result<PipelineConfig> {
        let mut config = bankline_client::load_config().context("Failed to load configuration")?;
        if let Some(server) = &self.server_url {
            config.base_url = server.clone();
        }
        Ok(config)
    }

    /// Directory holding the persisted session.
    pub fn data_dir(&self) -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV)
            && !dir.is_empty()
        {
            return PathBuf::from(dir);
        }
        dirs::data_dir()
            .map(|d| d.join("bankline"))
            .unwrap_or_else(|| PathBuf::from(".bankline"))
    }

    pub fn store(&self) -> Arc<FileStore> {
        Arc::new(FileStore::new(&self.data_dir()))
    }

    pub fn session(&self) -> SessionStore {
        SessionStore::new(self.store())
    }

    /// A client sharing the on-disk session, reporting to the console.
    pub fn client(&self, navigator: Arc<MemoryNavigator>) -> Result<BanklineClient> {
        let mut builder = BanklineClient::builder()
            .config(self.config()?)
            .store(self.store())
            .notifier(Arc::new(ConsoleNotifier::new(self.json_output)))
            .navigator(navigator);
        if self.verbose {
            builder = builder.message_sink(Arc::new(AuditSink));
        }
        builder.build().context("Failed to build client")
    }
}
