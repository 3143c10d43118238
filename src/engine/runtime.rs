// src/engine/runtime.rs

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::ConfigStore;
use crate::engine::command::Command;
use crate::logging::LogHandle;
use crate::reload::{ReloadAction, ReloadOutcome};
use crate::sink::{self, NotificationSink, MESSAGE_LIMIT, PAGE_HEADROOM};
use crate::watch::WatchRegistry;

/// Events sent into the runtime from watch handlers, the command surface,
/// and external signals.
///
/// - debounce expiry sends `ReloadDue`
/// - the command reader sends `Command` with a reply channel
/// - Ctrl-C handling sends `ShutdownRequested`
#[derive(Debug)]
pub enum RuntimeEvent {
    ReloadDue {
        item: String,
    },
    Command {
        command: Command,
        reply: oneshot::Sender<String>,
    },
    ShutdownRequested,
}

/// The single-threaded orchestration runtime.
///
/// Responsibilities:
/// - Consume `RuntimeEvent`s; nothing else mutates the registry.
/// - Invoke the reload action when a debounce expires and report the
///   outcome to the notification sink (best-effort).
/// - Execute control commands; global parameter changes trigger a full
///   reload of all sessions so new values take effect.
pub struct Runtime {
    pub(crate) registry: WatchRegistry,
    pub(crate) store: Arc<dyn ConfigStore>,
    pub(crate) reload: Arc<dyn ReloadAction>,
    pub(crate) sink: Option<Arc<dyn NotificationSink>>,
    pub(crate) log: Option<LogHandle>,
    events_rx: mpsc::Receiver<RuntimeEvent>,
}

impl Runtime {
    pub fn new(
        registry: WatchRegistry,
        store: Arc<dyn ConfigStore>,
        reload: Arc<dyn ReloadAction>,
        log: Option<LogHandle>,
        events_rx: mpsc::Receiver<RuntimeEvent>,
    ) -> Self {
        Self {
            registry,
            store,
            reload,
            sink: None,
            log,
            events_rx,
        }
    }

    /// Main event loop. Starts sessions for every persisted item, then
    /// processes events until shutdown or until all senders are gone.
    pub async fn run(mut self) -> Result<()> {
        self.startup().await?;
        info!("plugwatch runtime started");

        while let Some(event) = self.events_rx.recv().await {
            debug!(?event, "runtime received event");

            let keep_running = match event {
                RuntimeEvent::ReloadDue { item } => {
                    self.handle_reload_due(item).await;
                    true
                }
                RuntimeEvent::Command { command, reply } => {
                    let (text, keep_running) = self.execute(command).await;
                    if reply.send(text).is_err() {
                        debug!("command reply receiver dropped");
                    }
                    keep_running
                }
                RuntimeEvent::ShutdownRequested => {
                    info!("shutdown requested, stopping runtime");
                    false
                }
            };

            if !keep_running {
                break;
            }
        }

        self.registry.stop_all();
        info!("plugwatch runtime exiting");
        Ok(())
    }

    /// Load persisted items and the notification sink.
    async fn startup(&mut self) -> Result<()> {
        let settings = self.store.load().await?;
        info!(items = ?settings.items, "starting sessions for persisted items");

        for item in settings.items.clone() {
            if !self.registry.add(&item).await {
                warn!(item = %item, "persisted item could not be started");
            }
        }

        self.refresh_sink().await;
        Ok(())
    }

    /// A debounce expired for `item`: reload it and report the outcome.
    async fn handle_reload_due(&mut self, item: String) {
        // The expiry may have been queued just before the item was
        // removed; such stale requests are dropped.
        if !self.registry.contains(&item) {
            debug!(item = %item, "dropping reload for no-longer-tracked item");
            return;
        }

        let outcomes = self.reload.reload(std::slice::from_ref(&item)).await;
        for outcome in outcomes {
            self.report_outcome(outcome).await;
        }
    }

    /// Emit exactly one reloaded/failed message per outcome, with a
    /// paginated error dump on failure. Send failures are logged only.
    async fn report_outcome(&self, outcome: ReloadOutcome) {
        if outcome.success {
            info!(item = %outcome.item, "*** reloaded ***");
            self.notify(&format!("Reloaded `{}`", outcome.item)).await;
        } else {
            info!(item = %outcome.item, "**** failed to reload ****");
            self.notify(&format!("`{}` failed to reload", outcome.item))
                .await;

            if let Some(detail) = &outcome.error {
                for page in sink::paginate(detail, MESSAGE_LIMIT, PAGE_HEADROOM) {
                    self.notify(&format!("```{page}```")).await;
                }
            }
        }
    }

    async fn notify(&self, text: &str) {
        let Some(sink) = &self.sink else {
            return;
        };
        if let Err(err) = sink.send(text).await {
            warn!(error = %err, "notification send failed");
        }
    }

    /// Re-resolve the notification sink from the current `logto` value.
    pub(crate) async fn refresh_sink(&mut self) {
        match self.store.load().await {
            Ok(settings) => {
                self.sink = settings.logto.as_deref().map(sink::resolve_sink);
            }
            Err(err) => {
                warn!(error = %err, "could not load settings to resolve sink");
                self.sink = None;
            }
        }
    }

    /// Restart every session against freshly read config and re-resolve
    /// the sink. Called whenever a global parameter changes.
    pub(crate) async fn reload_all(&mut self) {
        self.registry.reload_all().await;
        self.refresh_sink().await;
    }
}
