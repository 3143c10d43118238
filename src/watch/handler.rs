// src/watch/handler.rs

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use notify::{Event, EventKind};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::engine::RuntimeEvent;
use crate::watch::debounce::DebounceTimer;
use crate::watch::error::WatchError;
use crate::watch::patterns::PatternSet;

/// Debounced event handler for one tracked item.
///
/// `on_event` is invoked synchronously on the filesystem watcher's
/// background thread. It must never touch scheduler-bound state directly:
/// all it does is filter the event and (re-)arm the debounce timer. The
/// timer expiry sends a [`RuntimeEvent::ReloadDue`] through the runtime
/// channel, which is the thread-safe handoff into the single-threaded
/// scheduler.
///
/// The handler has two states: idle (no pending timer) and pending (timer
/// armed). A relevant event in either state (re-)arms the timer; expiry
/// returns to idle. `cancel` is terminal: the pending timer is aborted and
/// later events are ignored.
#[derive(Debug)]
pub struct WatchHandler {
    item: String,
    root: PathBuf,
    patterns: PatternSet,
    wait: Duration,
    events_tx: mpsc::Sender<RuntimeEvent>,
    timer: DebounceTimer,
    stopped: AtomicBool,
}

impl WatchHandler {
    pub fn new(
        item: impl Into<String>,
        root: impl Into<PathBuf>,
        patterns: PatternSet,
        wait: Duration,
        events_tx: mpsc::Sender<RuntimeEvent>,
        handle: Handle,
    ) -> Self {
        Self {
            item: item.into(),
            root: root.into(),
            patterns,
            wait,
            events_tx,
            timer: DebounceTimer::new(handle),
            stopped: AtomicBool::new(false),
        }
    }

    /// Name of the tracked item this handler reloads.
    pub fn item(&self) -> &str {
        &self.item
    }

    /// Process one raw filesystem event. Called on the watcher thread.
    pub fn on_event(&self, event: &Event) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }

        // Only creations and modifications qualify; renames/removals of
        // source files produce a modify on the editor's replacement write
        // anyway.
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            trace!(item = %self.item, kind = ?event.kind, "ignoring event kind");
            return;
        }

        let relevant = event.paths.iter().any(|path| self.path_is_relevant(path));
        if relevant {
            self.arm();
        }
    }

    fn path_is_relevant(&self, path: &Path) -> bool {
        // Directory-level churn (mkdir, chmod on dirs) never triggers.
        if path.is_dir() {
            return false;
        }

        let Some(rel) = relative_str(&self.root, path) else {
            warn!(
                item = %self.item,
                ?path,
                root = ?self.root,
                "could not relativize event path against watch root"
            );
            return false;
        };

        let hit = self.patterns.matches(&rel);
        trace!(item = %self.item, path = %rel, hit, "filtered event path");
        hit
    }

    /// (Re-)arm the debounce timer. Last event wins.
    fn arm(&self) {
        // Scheduling failure is synchronous and not retried; the next
        // relevant event will try to arm again.
        if self.events_tx.is_closed() {
            warn!(
                item = %self.item,
                error = %WatchError::SchedulerGone,
                "dropping debounce arm"
            );
            return;
        }

        debug!(item = %self.item, wait = ?self.wait, "relevant change; arming debounce");

        let tx = self.events_tx.clone();
        let item = self.item.clone();
        self.timer.schedule(self.wait, async move {
            if let Err(err) = tx.send(RuntimeEvent::ReloadDue { item }).await {
                warn!(error = %err, "failed to enqueue reload after debounce");
            }
        });
    }

    /// Stop processing events and abort any pending timer. Terminal.
    pub fn cancel(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.timer.cancel();
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }
}

/// Path relative to `root`, with forward slashes.
fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}
