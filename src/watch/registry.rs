// src/watch/registry.rs

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ConfigStore;
use crate::engine::RuntimeEvent;
use crate::resolve::Resolver;
use crate::watch::patterns::PatternSet;
use crate::watch::session::WatchSession;

/// Process-wide collection of active watch sessions, keyed by tracked-item
/// identifier in insertion order.
///
/// The registry is the sole owner of its sessions: removing an entry stops
/// the session (joining its watcher thread) before releasing it, so there
/// is never more than one active session per identifier and no dangling
/// threads after removal.
///
/// Methods must only be called from tasks on the scheduler; the map itself
/// is unsynchronized by design.
pub struct WatchRegistry {
    sessions: IndexMap<String, WatchSession>,
    resolver: Arc<dyn Resolver>,
    store: Arc<dyn ConfigStore>,
    events_tx: mpsc::Sender<RuntimeEvent>,
}

impl WatchRegistry {
    pub fn new(
        resolver: Arc<dyn Resolver>,
        store: Arc<dyn ConfigStore>,
        events_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            sessions: IndexMap::new(),
            resolver,
            store,
            events_tx,
        }
    }

    /// Start watching an item.
    ///
    /// Resolves the identifier, reads settings fresh, builds and starts a
    /// session, and persists the identifier. Returns false (without
    /// error) when the identifier does not resolve, is already tracked,
    /// or its session cannot be constructed/started; the caller reports
    /// such identifiers in its batch failure list.
    pub async fn add(&mut self, ident: &str) -> bool {
        let Some(resolved) = self.resolver.resolve(ident) else {
            warn!(item = %ident, "add failed: identifier did not resolve");
            return false;
        };

        if self.sessions.contains_key(&resolved.name) {
            debug!(item = %resolved.name, "add skipped: already tracked");
            return false;
        }

        let settings = match self.store.load().await {
            Ok(settings) => settings,
            Err(err) => {
                warn!(item = %resolved.name, error = %err, "add failed: config load");
                return false;
            }
        };

        let patterns = match PatternSet::compile(&settings.patterns) {
            Ok(patterns) => patterns,
            Err(err) => {
                warn!(item = %resolved.name, error = %err, "add failed: bad patterns");
                return false;
            }
        };

        let session = WatchSession::new(
            resolved.name.clone(),
            resolved.root,
            patterns,
            settings.wait_duration(),
            self.events_tx.clone(),
            Handle::current(),
        );
        let mut session = match session {
            Ok(session) => session,
            Err(err) => {
                warn!(item = %resolved.name, error = %err, "add failed: session construction");
                return false;
            }
        };

        if let Err(err) = session.start() {
            warn!(item = %resolved.name, error = %err, "add failed: session start");
            return false;
        }

        if let Err(err) = self.persist_item(&resolved.name, true).await {
            warn!(item = %resolved.name, error = %err, "failed to persist tracked item");
        }

        info!(
            item = %resolved.name,
            wait = settings.wait,
            patterns = ?settings.patterns,
            "tracking item"
        );
        self.sessions.insert(resolved.name, session);
        true
    }

    /// Stop watching an item. Returns false if it was not tracked.
    pub async fn remove(&mut self, ident: &str) -> bool {
        let Some(mut session) = self.sessions.shift_remove(ident) else {
            return false;
        };
        session.stop();

        if let Err(err) = self.persist_item(ident, false).await {
            warn!(item = %ident, error = %err, "failed to unpersist tracked item");
        }

        info!(item = %ident, "stopped tracking item");
        true
    }

    /// Identifiers currently tracked, in insertion order.
    pub fn list(&self) -> Vec<String> {
        self.sessions.keys().cloned().collect()
    }

    pub fn contains(&self, ident: &str) -> bool {
        self.sessions.contains_key(ident)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Stop every session without touching persisted config. Shutdown path.
    pub fn stop_all(&mut self) {
        debug!(count = self.sessions.len(), "stopping all watch sessions");
        for (_, session) in self.sessions.iter_mut() {
            session.stop();
        }
        self.sessions.clear();
    }

    /// Stop everything and re-add every persisted identifier, re-reading
    /// config fresh. This is how changed global parameters (wait,
    /// patterns, logto) reach live sessions: per-session parameters are
    /// captured at construction time.
    pub async fn reload_all(&mut self) {
        debug!("reload of all watch sessions started");
        self.stop_all();

        let items = match self.store.load().await {
            Ok(settings) => settings.items,
            Err(err) => {
                warn!(error = %err, "reload_all: config load failed; nothing re-added");
                return;
            }
        };

        for item in items {
            self.add(&item).await;
        }
        debug!(count = self.sessions.len(), "reload of all watch sessions finished");
    }

    /// Add or remove `ident` in the persisted item list.
    async fn persist_item(&self, ident: &str, present: bool) -> anyhow::Result<()> {
        let mut settings = self.store.load().await?;
        let had = settings.items.iter().any(|i| i == ident);
        match (present, had) {
            (true, false) => settings.items.push(ident.to_string()),
            (false, true) => settings.items.retain(|i| i != ident),
            _ => return Ok(()),
        }
        self.store.save(&settings).await
    }
}

impl std::fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("items", &self.list())
            .finish_non_exhaustive()
    }
}
