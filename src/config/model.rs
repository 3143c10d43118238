// src/config/model.rs

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Persisted settings, stored as a flat TOML file.
///
/// ```toml
/// logto = "reload.log"
/// wait = 5
/// patterns = ["*.py"]
/// items = ["foo", "bar"]
/// roots = ["./plugins"]
/// reload_cmd = "systemctl --user reload {item}"
/// ```
///
/// All keys are optional and default as below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Notification target; `None` disables notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logto: Option<String>,

    /// Debounce delay in seconds. Zero fires on the next scheduling
    /// opportunity.
    #[serde(default = "default_wait")]
    pub wait: u64,

    /// Glob patterns a changed file must match. Empty means match all.
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,

    /// Identifiers of tracked items, in the order they were added.
    #[serde(default)]
    pub items: Vec<String>,

    /// Directories the resolver searches for item source trees.
    #[serde(default = "default_roots")]
    pub roots: Vec<String>,

    /// Shell command template run to reload one item; `{item}` is
    /// substituted with the identifier.
    #[serde(default = "default_reload_cmd")]
    pub reload_cmd: String,
}

fn default_wait() -> u64 {
    5
}

fn default_patterns() -> Vec<String> {
    vec!["*.py".to_string()]
}

fn default_roots() -> Vec<String> {
    vec![".".to_string()]
}

fn default_reload_cmd() -> String {
    "echo reloaded {item}".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logto: None,
            wait: default_wait(),
            patterns: default_patterns(),
            items: Vec::new(),
            roots: default_roots(),
            reload_cmd: default_reload_cmd(),
        }
    }
}

impl Settings {
    /// The debounce delay as a `Duration`.
    pub fn wait_duration(&self) -> Duration {
        Duration::from_secs(self.wait)
    }
}
