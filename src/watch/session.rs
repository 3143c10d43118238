// src/watch/session.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::watch::error::WatchError;
use crate::watch::handler::WatchHandler;
use crate::watch::patterns::PatternSet;

/// One OS-level recursive watch on a tracked item's directory, plus the
/// debounced handler it feeds.
///
/// Construction validates the path before any thread is spawned. `start`
/// may be called exactly once; `stop` cancels the handler and drops the
/// underlying watcher, which joins its background thread, so no events
/// are delivered after `stop` returns. Callers must expect `stop` to
/// block for the join.
pub struct WatchSession {
    item: String,
    root: PathBuf,
    handler: Arc<WatchHandler>,
    watcher: Option<RecommendedWatcher>,
    started: bool,
}

impl std::fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSession")
            .field("item", &self.item)
            .field("root", &self.root)
            .field("active", &self.watcher.is_some())
            .finish()
    }
}

impl WatchSession {
    /// Build a session for one tracked item. Fails with
    /// [`WatchError::PathNotFound`] / [`WatchError::NotADirectory`] before
    /// anything is spawned.
    pub fn new(
        item: impl Into<String>,
        root: impl Into<PathBuf>,
        patterns: PatternSet,
        wait: Duration,
        events_tx: mpsc::Sender<RuntimeEvent>,
        handle: Handle,
    ) -> Result<Self, WatchError> {
        let item = item.into();
        let root = root.into();

        if !root.exists() {
            return Err(WatchError::PathNotFound(root));
        }
        if !root.is_dir() {
            return Err(WatchError::NotADirectory(root));
        }

        // Events arrive with canonical paths on most platforms; keep the
        // root canonical too so relativization works.
        let root = root.canonicalize().unwrap_or(root);

        let handler = Arc::new(WatchHandler::new(
            item.clone(),
            root.clone(),
            patterns,
            wait,
            events_tx,
            handle,
        ));

        Ok(Self {
            item,
            root,
            handler,
            watcher: None,
            started: false,
        })
    }

    pub fn item(&self) -> &str {
        &self.item
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Begin recursive monitoring. Once-only; a second call errors.
    pub fn start(&mut self) -> Result<(), WatchError> {
        if self.started {
            return Err(WatchError::AlreadyStarted);
        }

        let handler = Arc::clone(&self.handler);
        let item = self.item.clone();
        // The closure runs on notify's background thread; the handler's
        // only cross-thread effect is arming the debounce timer.
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => handler.on_event(&event),
                Err(err) => warn!(item = %item, error = %err, "file watch error"),
            },
            Config::default(),
        )?;

        watcher.watch(&self.root, RecursiveMode::Recursive)?;
        self.watcher = Some(watcher);
        self.started = true;

        info!(item = %self.item, root = ?self.root, "watch session started");
        Ok(())
    }

    /// Stop monitoring. Blocks until the watcher's background thread has
    /// terminated; the handler's pending debounce (if any) is aborted, so
    /// nothing fires after this returns.
    pub fn stop(&mut self) {
        self.handler.cancel();
        if let Some(mut watcher) = self.watcher.take() {
            if let Err(err) = watcher.unwatch(&self.root) {
                debug!(item = %self.item, error = %err, "unwatch on stop");
            }
            // Dropping the watcher joins its thread.
            drop(watcher);
            info!(item = %self.item, "watch session stopped");
        }
    }

    /// True between a successful `start` and `stop`.
    pub fn is_active(&self) -> bool {
        self.watcher.is_some()
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_for(path: &Path) -> Result<WatchSession, WatchError> {
        let (tx, _rx) = mpsc::channel(8);
        WatchSession::new(
            "foo",
            path,
            PatternSet::compile(&[]).unwrap(),
            Duration::from_secs(1),
            tx,
            Handle::current(),
        )
    }

    #[tokio::test]
    async fn missing_path_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let err = session_for(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, WatchError::PathNotFound(_)));
    }

    #[tokio::test]
    async fn file_path_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        let err = session_for(&file).unwrap_err();
        assert!(matches!(err, WatchError::NotADirectory(_)));
    }

    #[tokio::test]
    async fn start_is_once_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_for(dir.path()).unwrap();
        assert!(!session.is_active());

        session.start().unwrap();
        assert!(session.is_active());
        assert!(matches!(session.start(), Err(WatchError::AlreadyStarted)));

        session.stop();
        assert!(!session.is_active());
        // start after stop is still refused: sessions are single-use.
        assert!(matches!(session.start(), Err(WatchError::AlreadyStarted)));
    }

    #[tokio::test]
    async fn stop_without_start_does_not_crash() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_for(dir.path()).unwrap();
        session.stop();
        session.stop();
    }
}
