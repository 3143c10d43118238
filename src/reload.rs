// src/reload.rs

//! The reload action invoked when a tracked item's debounce expires.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

/// Structured result of reloading one item.
///
/// The action reports success and error detail per call instead of
/// relying on shared mutable "last error" state, so the handler never has
/// to guess which failure belongs to which reload.
#[derive(Debug, Clone)]
pub struct ReloadOutcome {
    pub item: String,
    pub success: bool,
    /// Best-effort human-readable error detail on failure.
    pub error: Option<String>,
}

impl ReloadOutcome {
    pub fn success(item: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            success: true,
            error: None,
        }
    }

    pub fn failure(item: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            item: item.into(),
            success: false,
            error: (!error.is_empty()).then_some(error),
        }
    }
}

/// Performs the host-specific reload for a batch of items.
#[async_trait]
pub trait ReloadAction: Send + Sync {
    async fn reload(&self, items: &[String]) -> Vec<ReloadOutcome>;
}

/// Reload by running a shell command per item.
///
/// The command is the configured `reload_cmd` template with `{item}`
/// substituted. A non-zero exit is a failed reload; captured stderr (or
/// the exit status when stderr is empty) becomes the error detail.
#[derive(Debug, Clone)]
pub struct ShellReload {
    template: String,
}

impl ShellReload {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    async fn reload_one(&self, item: &str) -> ReloadOutcome {
        let cmd_line = self.template.replace("{item}", item);
        debug!(item = %item, cmd = %cmd_line, "running reload command");

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&cmd_line);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&cmd_line);
            c
        };

        let output = match cmd.kill_on_drop(true).output().await {
            Ok(output) => output,
            Err(err) => {
                return ReloadOutcome::failure(
                    item,
                    format!("failed to spawn reload command: {err}"),
                );
            }
        };

        if output.status.success() {
            info!(item = %item, "reload command succeeded");
            ReloadOutcome::success(item)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                format!("reload command exited with {}", output.status)
            } else {
                stderr
            };
            info!(item = %item, status = %output.status, "reload command failed");
            ReloadOutcome::failure(item, detail)
        }
    }
}

#[async_trait]
impl ReloadAction for ShellReload {
    async fn reload(&self, items: &[String]) -> Vec<ReloadOutcome> {
        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            outcomes.push(self.reload_one(item).await);
        }
        outcomes
    }
}
