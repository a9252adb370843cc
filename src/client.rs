//! # Remote Optimizer Client
//!
//! Confine verso il servizio di compressione. La libreria consuma solo il
//! trait `OptimizerClient`; la compressione vera e propria avviene altrove.
//!
//! ## CommandOptimizerClient
//! Adapter che invoca un programma esterno configurato:
//!
//! ```bash
//! <program> [args...] --level 1 [--backup] /uploads/2024/05/photo.jpg
//! ```
//!
//! Il programma stampa su stdout il JSON della risposta:
//! ```json
//! { "original_size": 1000, "new_size": 400, "percent": 60.0 }
//! ```
//! oppure `{ "error": "..." }` / exit code non zero in caso di fallimento.

use crate::config::CommandConfig;
use crate::error::{OptimizeError, Result};
use crate::file_manager::FileManager;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Successful answer of the service. Missing fields count as 0 when folded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizerResponse {
    #[serde(default)]
    pub original_size: Option<u64>,
    #[serde(default)]
    pub new_size: Option<u64>,
    #[serde(default)]
    pub percent: Option<f64>,
}

impl OptimizerResponse {
    pub fn new(original_size: u64, new_size: u64, percent: f64) -> Self {
        Self {
            original_size: Some(original_size),
            new_size: Some(new_size),
            percent: Some(percent),
        }
    }
}

/// Typed failure returned by the service, carrying a display message
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ClientError {
    pub message: String,
}

impl ClientError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

pub type ClientResult = std::result::Result<OptimizerResponse, ClientError>;

/// Synchronous-per-call compression service. Implementations bound their own latency.
#[async_trait]
pub trait OptimizerClient: Send + Sync {
    async fn optimize_file(&self, path: &Path, request_backup: bool, aggressiveness: u8) -> ClientResult;
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommandOutput {
    Failure { error: String },
    Success(OptimizerResponse),
}

/// Runs an external optimizer program per file
pub struct CommandOptimizerClient {
    command: CommandConfig,
    files: FileManager,
}

impl CommandOptimizerClient {
    pub fn new(command: CommandConfig, files: FileManager) -> Self {
        Self { command, files }
    }

    /// Copy the original into the backup subtree once, before it is first rewritten
    async fn ensure_backup(&self, path: &Path) -> Result<()> {
        let backup_path = self.files.backup_path_for(path).ok_or_else(|| {
            OptimizeError::Command(format!("{} is outside the upload root", path.display()))
        })?;

        if backup_path.exists() {
            return Ok(());
        }

        if let Some(parent) = backup_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(path, &backup_path).await?;
        debug!("Backup created: {}", backup_path.display());
        Ok(())
    }

    fn build_args(&self, path: &Path, request_backup: bool, aggressiveness: u8) -> Vec<String> {
        let mut args = self.command.args.clone();
        args.push("--level".to_string());
        args.push(aggressiveness.to_string());
        if request_backup {
            args.push("--backup".to_string());
        }
        args.push(path.to_string_lossy().to_string());
        args
    }

    fn parse_output(status_ok: bool, stdout: &[u8], stderr: &[u8]) -> ClientResult {
        let stdout = String::from_utf8_lossy(stdout);
        let parsed = serde_json::from_str::<CommandOutput>(stdout.trim());

        match (status_ok, parsed) {
            (_, Ok(CommandOutput::Failure { error })) => Err(ClientError::new(error)),
            (true, Ok(CommandOutput::Success(response))) => Ok(response),
            (true, Err(e)) => Err(ClientError::new(format!("Invalid optimizer response: {}", e))),
            (false, _) => {
                let stderr = String::from_utf8_lossy(stderr);
                let message = stderr.trim();
                if message.is_empty() {
                    Err(ClientError::new("Optimizer command failed"))
                } else {
                    Err(ClientError::new(message))
                }
            }
        }
    }
}

#[async_trait]
impl OptimizerClient for CommandOptimizerClient {
    async fn optimize_file(&self, path: &Path, request_backup: bool, aggressiveness: u8) -> ClientResult {
        if request_backup {
            if let Err(e) = self.ensure_backup(path).await {
                warn!("Could not back up {}: {}", path.display(), e);
                return Err(ClientError::new(format!("Backup failed: {}", e)));
            }
        }

        let args = self.build_args(path, request_backup, aggressiveness);
        debug!("Running {} {:?}", self.command.program.display(), args);

        let mut command = Command::new(&self.command.program);
        command.args(&args).kill_on_drop(true);
        let run = command.output();
        let timeout = Duration::from_secs(self.command.timeout_secs);

        match tokio::time::timeout(timeout, run).await {
            Ok(Ok(output)) => Self::parse_output(output.status.success(), &output.stdout, &output.stderr),
            Ok(Err(e)) => Err(ClientError::new(
                OptimizeError::Command(format!("{}: {}", self.command.program.display(), e)).to_string(),
            )),
            Err(_) => Err(ClientError::new(format!(
                "Optimizer timed out after {}s",
                self.command.timeout_secs
            ))),
        }
    }
}
