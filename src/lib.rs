// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod logging;
pub mod reload;
pub mod resolve;
pub mod sink;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::cli::CliArgs;
use crate::config::{ConfigStore, TomlConfigStore};
use crate::engine::{Runtime, RuntimeEvent, command};
use crate::logging::LogHandle;
use crate::reload::ShellReload;
use crate::resolve::DirResolver;
use crate::watch::WatchRegistry;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the persisted config store
/// - resolver and reload action built from the loaded settings
/// - watch registry / runtime event loop
/// - the stdin command reader
/// - Ctrl-C handling
///
/// The runtime must be driven by a current-thread Tokio runtime: all
/// business logic (reloads, notifications, registry mutation) is
/// scheduled there, and the watch layer relies on that being the only
/// place such work runs.
pub async fn run(args: CliArgs, log: Option<LogHandle>) -> Result<()> {
    let store: Arc<dyn ConfigStore> = Arc::new(TomlConfigStore::new(&args.config));
    let settings = store.load().await?;

    let resolver = Arc::new(DirResolver::new(&settings.roots));
    let action = Arc::new(ShellReload::new(settings.reload_cmd.clone()));

    let (events_tx, events_rx) = mpsc::channel::<RuntimeEvent>(64);

    let registry = WatchRegistry::new(resolver, Arc::clone(&store), events_tx.clone());

    // Ctrl-C → graceful shutdown.
    {
        let tx = events_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    // Control commands from stdin.
    tokio::spawn(read_commands(events_tx));

    let runtime = Runtime::new(registry, store, action, log, events_rx);
    runtime.run().await
}

/// Read command lines from stdin, execute them on the runtime, and print
/// each reply. Ends quietly on EOF or when the runtime is gone.
async fn read_commands(tx: mpsc::Sender<RuntimeEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                debug!(error = %err, "stdin read failed");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match command::parse(line) {
            Ok(command) => command,
            Err(msg) => {
                println!("{msg}");
                continue;
            }
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if tx
            .send(RuntimeEvent::Command {
                command,
                reply: reply_tx,
            })
            .await
            .is_err()
        {
            break;
        }

        if let Ok(reply) = reply_rx.await {
            if !reply.is_empty() {
                println!("{reply}");
            }
        }
    }

    debug!("command reader finished");
}
