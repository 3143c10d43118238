//! Driving the runtime event loop through the command surface, with
//! reload outcomes observed through a file-backed notification sink.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use plugwatch::config::{ConfigStore, MemoryConfigStore, Settings};
use plugwatch::engine::{Command, Runtime, RuntimeEvent};
use plugwatch::reload::ShellReload;
use plugwatch::resolve::DirResolver;
use plugwatch::watch::WatchRegistry;

struct Harness {
    tx: mpsc::Sender<RuntimeEvent>,
    runtime: JoinHandle<anyhow::Result<()>>,
    store: Arc<MemoryConfigStore>,
}

fn spawn_runtime(root: &Path, settings: Settings) -> Harness {
    let reload_cmd = settings.reload_cmd.clone();
    let store = Arc::new(MemoryConfigStore::new(settings));
    let (tx, rx) = mpsc::channel(32);

    let registry = WatchRegistry::new(
        Arc::new(DirResolver::new([root.to_path_buf()])),
        Arc::clone(&store) as Arc<dyn ConfigStore>,
        tx.clone(),
    );
    let runtime = Runtime::new(
        registry,
        Arc::clone(&store) as Arc<dyn ConfigStore>,
        Arc::new(ShellReload::new(reload_cmd)),
        None,
        rx,
    );

    Harness {
        tx,
        runtime: tokio::spawn(runtime.run()),
        store,
    }
}

impl Harness {
    async fn exec(&self, command: Command) -> String {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RuntimeEvent::Command {
                command,
                reply: reply_tx,
            })
            .await
            .expect("runtime gone");
        timeout(Duration::from_secs(5), reply_rx)
            .await
            .expect("no reply in time")
            .expect("reply dropped")
    }

    async fn shutdown(self) {
        let reply = self.exec(Command::Quit).await;
        assert_eq!(reply, "Shutting down");
        timeout(Duration::from_secs(5), self.runtime)
            .await
            .expect("runtime did not exit")
            .expect("runtime panicked")
            .expect("runtime errored");
    }
}

/// Poll a notification file until it contains `needle`.
async fn wait_for_notification(path: &Path, needle: &str) -> String {
    for _ in 0..50 {
        if let Ok(contents) = std::fs::read_to_string(path) {
            if contents.contains(needle) {
                return contents;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let contents = std::fs::read_to_string(path).unwrap_or_default();
    panic!("notification file never contained {needle:?}; contents: {contents:?}");
}

fn settings_with_sink(logto: &Path, reload_cmd: &str) -> Settings {
    Settings {
        logto: Some(logto.to_string_lossy().into_owned()),
        wait: 0,
        patterns: vec!["*.py".to_string()],
        reload_cmd: reload_cmd.to_string(),
        ..Settings::default()
    }
}

#[tokio::test]
async fn add_then_change_reloads_and_notifies() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("foo")).unwrap();
    let ntf = dir.path().join("notify.log");

    let h = spawn_runtime(dir.path(), settings_with_sink(&ntf, "true"));

    let reply = h.exec(Command::Add(vec!["foo".to_string()])).await;
    assert_eq!(reply, "Auto-reload started for `foo`");

    tokio::time::sleep(Duration::from_millis(300)).await;
    std::fs::write(dir.path().join("foo/mod.py"), "x = 1\n").unwrap();

    wait_for_notification(&ntf, "Reloaded `foo`").await;
    h.shutdown().await;
}

#[tokio::test]
async fn failed_reload_reports_error_pages() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("foo")).unwrap();
    let ntf = dir.path().join("notify.log");

    let h = spawn_runtime(
        dir.path(),
        settings_with_sink(&ntf, "echo import error in {item} >&2; exit 1"),
    );

    h.exec(Command::Add(vec!["foo".to_string()])).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    std::fs::write(dir.path().join("foo/mod.py"), "x = 1\n").unwrap();

    let contents = wait_for_notification(&ntf, "```").await;
    assert!(contents.contains("`foo` failed to reload"));
    assert!(contents.contains("```import error in foo```"));
    h.shutdown().await;
}

#[tokio::test]
async fn add_reports_batch_failures() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("foo")).unwrap();

    let h = spawn_runtime(dir.path(), Settings::default());

    let reply = h
        .exec(Command::Add(vec!["foo".to_string(), "ghost".to_string()]))
        .await;
    assert!(reply.contains("Auto-reload started for `foo`"));
    assert!(reply.contains("Auto-reload failed for `ghost`"));

    let reply = h.exec(Command::List).await;
    assert_eq!(reply, "Tracked items: `foo`");

    let reply = h.exec(Command::Remove(vec!["ghost".to_string()])).await;
    assert_eq!(reply, "Auto-reload was not active for `ghost`");

    h.shutdown().await;
}

#[tokio::test]
async fn wait_command_persists_and_restarts_sessions() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("foo")).unwrap();

    let h = spawn_runtime(dir.path(), Settings::default());
    h.exec(Command::Add(vec!["foo".to_string()])).await;

    let reply = h.exec(Command::Wait(None)).await;
    assert_eq!(reply, "Wait is `5 seconds`");

    let reply = h.exec(Command::Wait(Some(10))).await;
    assert_eq!(reply, "Wait set to `10 seconds`");
    assert_eq!(h.store.load().await.unwrap().wait, 10);

    // Sessions survived the restart triggered by the change.
    let reply = h.exec(Command::List).await;
    assert_eq!(reply, "Tracked items: `foo`");

    h.shutdown().await;
}

#[tokio::test]
async fn pattern_commands_mutate_config() {
    let dir = tempfile::tempdir().unwrap();
    let h = spawn_runtime(dir.path(), Settings::default());

    let reply = h.exec(Command::PatternsList).await;
    assert_eq!(reply, "Current patterns: `*.py`");

    let reply = h
        .exec(Command::PatternsAdd(vec!["*.toml".to_string()]))
        .await;
    assert_eq!(reply, "Added pattern(s): `*.toml`");
    assert_eq!(
        h.store.load().await.unwrap().patterns,
        vec!["*.py".to_string(), "*.toml".to_string()]
    );

    // Adding the same pattern again changes nothing.
    let reply = h
        .exec(Command::PatternsAdd(vec!["*.toml".to_string()]))
        .await;
    assert_eq!(reply, "No patterns added!");

    let reply = h
        .exec(Command::PatternsRemove(vec!["*.py".to_string()]))
        .await;
    assert_eq!(reply, "Removed pattern(s): `*.py`");

    let reply = h
        .exec(Command::PatternsRemove(vec!["*.missing".to_string()]))
        .await;
    assert_eq!(reply, "No patterns removed!");

    h.shutdown().await;
}

#[tokio::test]
async fn log_command_controls_the_sink_target() {
    let dir = tempfile::tempdir().unwrap();
    let h = spawn_runtime(dir.path(), Settings::default());

    let reply = h
        .exec(Command::Log {
            enabled: None,
            target: None,
        })
        .await;
    assert_eq!(reply, "Logging is disabled");

    let reply = h
        .exec(Command::Log {
            enabled: Some(true),
            target: Some("reload.log".to_string()),
        })
        .await;
    assert_eq!(reply, "Logging enabled, sending to `reload.log`");
    assert_eq!(
        h.store.load().await.unwrap().logto.as_deref(),
        Some("reload.log")
    );

    let reply = h
        .exec(Command::Log {
            enabled: Some(false),
            target: None,
        })
        .await;
    assert_eq!(reply, "Logging disabled");
    assert!(h.store.load().await.unwrap().logto.is_none());

    h.shutdown().await;
}

#[tokio::test]
async fn persisted_items_start_on_boot() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("foo")).unwrap();
    let ntf = dir.path().join("notify.log");

    let mut settings = settings_with_sink(&ntf, "true");
    settings.items = vec!["foo".to_string()];

    let h = spawn_runtime(dir.path(), settings);
    // Startup runs before the first event is handled, so the session is
    // live by the time the List reply comes back.
    let reply = h.exec(Command::List).await;
    assert_eq!(reply, "Tracked items: `foo`");

    tokio::time::sleep(Duration::from_millis(300)).await;
    std::fs::write(dir.path().join("foo/mod.py"), "x = 1\n").unwrap();
    wait_for_notification(&ntf, "Reloaded `foo`").await;

    h.shutdown().await;
}
