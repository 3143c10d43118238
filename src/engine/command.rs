// src/engine/command.rs

//! The control command surface.
//!
//! Commands arrive as text lines (stdin in the shipped binary, anything
//! that can build a [`Command`] when embedding), are executed on the
//! runtime, and produce one human-readable reply each. Every command that
//! mutates a global parameter (logging target, wait, patterns) triggers a
//! full reload of all sessions, since per-session parameters are captured
//! at construction time.

use tracing::info;

use crate::engine::runtime::Runtime;

/// A parsed control command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Query (`None`) or set notification logging; target defaults to
    /// `stdout` when enabling without one.
    Log {
        enabled: Option<bool>,
        target: Option<String>,
    },
    /// Query (`None`) or set the debounce wait in seconds.
    Wait(Option<u64>),
    PatternsAdd(Vec<String>),
    PatternsRemove(Vec<String>),
    PatternsList,
    /// Track one or more items.
    Add(Vec<String>),
    /// Stop tracking one or more items.
    Remove(Vec<String>),
    List,
    /// Query-toggle (`None`) or set verbose diagnostic logging.
    Debug(Option<bool>),
    Quit,
}

/// Parse a command line. Errors are user-facing strings.
pub fn parse(line: &str) -> Result<Command, String> {
    let mut tokens = line.split_whitespace();
    let Some(head) = tokens.next() else {
        return Err("empty command".to_string());
    };
    let rest: Vec<&str> = tokens.collect();

    match head {
        "log" => match rest.as_slice() {
            [] => Ok(Command::Log {
                enabled: None,
                target: None,
            }),
            [flag, target @ ..] => {
                let enabled = parse_bool(flag)?;
                let target = match target {
                    [] => None,
                    [t] => Some(t.to_string()),
                    _ => return Err("usage: log [on|off] [target]".to_string()),
                };
                Ok(Command::Log {
                    enabled: Some(enabled),
                    target,
                })
            }
        },
        "wait" => match rest.as_slice() {
            [] => Ok(Command::Wait(None)),
            [n] => n
                .parse::<u64>()
                .map(|secs| Command::Wait(Some(secs)))
                .map_err(|_| format!("wait must be a non-negative number of seconds, got `{n}`")),
            _ => Err("usage: wait [seconds]".to_string()),
        },
        "patterns" | "pat" => match rest.split_first() {
            Some((&"add", pats)) if !pats.is_empty() => {
                Ok(Command::PatternsAdd(to_owned(pats)))
            }
            Some((&("rm" | "remove" | "del" | "delete"), pats)) if !pats.is_empty() => {
                Ok(Command::PatternsRemove(to_owned(pats)))
            }
            Some((&("ls" | "list"), [])) => Ok(Command::PatternsList),
            _ => Err("usage: patterns add|rm <pattern>... | patterns ls".to_string()),
        },
        "add" | "start" => {
            if rest.is_empty() {
                Err("usage: add <item>...".to_string())
            } else {
                Ok(Command::Add(to_owned(&rest)))
            }
        }
        "rm" | "remove" | "del" | "delete" | "stop" => {
            if rest.is_empty() {
                Err("usage: rm <item>...".to_string())
            } else {
                Ok(Command::Remove(to_owned(&rest)))
            }
        }
        "ls" | "list" => Ok(Command::List),
        "debug" => match rest.as_slice() {
            [] => Ok(Command::Debug(None)),
            [flag] => Ok(Command::Debug(Some(parse_bool(flag)?))),
            _ => Err("usage: debug [on|off]".to_string()),
        },
        "quit" | "exit" | "shutdown" => Ok(Command::Quit),
        other => Err(format!("unknown command: {other}")),
    }
}

fn parse_bool(token: &str) -> Result<bool, String> {
    match token {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => Err(format!("expected on/off, got `{other}`")),
    }
}

fn to_owned(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|s| s.to_string()).collect()
}

fn backticked(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        format!("`{}`", items.join("`, `"))
    }
}

impl Runtime {
    /// Execute one command. Returns the reply text and whether the
    /// runtime should keep running.
    pub(crate) async fn execute(&mut self, command: Command) -> (String, bool) {
        match command {
            Command::List => {
                let items = self.registry.list();
                (format!("Tracked items: {}", backticked(&items)), true)
            }

            Command::Add(idents) => {
                let mut added = Vec::new();
                let mut failed = Vec::new();
                for ident in idents {
                    if self.registry.add(&ident).await {
                        added.push(ident);
                    } else {
                        failed.push(ident);
                    }
                }

                let mut reply = Vec::new();
                if !added.is_empty() {
                    info!(?added, "items added");
                    reply.push(format!("Auto-reload started for {}", backticked(&added)));
                }
                if !failed.is_empty() {
                    info!(?failed, "add failed");
                    reply.push(format!(
                        "Auto-reload failed for {}. Double check the name.",
                        backticked(&failed)
                    ));
                }
                (reply.join("\n"), true)
            }

            Command::Remove(idents) => {
                let mut removed = Vec::new();
                let mut failed = Vec::new();
                for ident in idents {
                    if self.registry.remove(&ident).await {
                        removed.push(ident);
                    } else {
                        failed.push(ident);
                    }
                }

                let mut reply = Vec::new();
                if !removed.is_empty() {
                    info!(?removed, "items removed");
                    reply.push(format!("Auto-reload stopped for {}", backticked(&removed)));
                }
                if !failed.is_empty() {
                    reply.push(format!(
                        "Auto-reload was not active for {}",
                        backticked(&failed)
                    ));
                }
                (reply.join("\n"), true)
            }

            Command::Wait(None) => match self.store.load().await {
                Ok(settings) => (format!("Wait is `{} seconds`", settings.wait), true),
                Err(err) => (format!("Could not read config: {err}"), true),
            },

            Command::Wait(Some(secs)) => {
                let reply = self
                    .mutate_settings(|s| {
                        s.wait = secs;
                        format!("Wait set to `{secs} seconds`")
                    })
                    .await;
                (reply, true)
            }

            Command::Log {
                enabled: None,
                ..
            } => match self.store.load().await {
                Ok(settings) => {
                    let reply = match settings.logto {
                        Some(target) => {
                            format!("Logging is enabled and sending to `{target}`")
                        }
                        None => "Logging is disabled".to_string(),
                    };
                    (reply, true)
                }
                Err(err) => (format!("Could not read config: {err}"), true),
            },

            Command::Log {
                enabled: Some(true),
                target,
            } => {
                let target = target.unwrap_or_else(|| "stdout".to_string());
                let reply = self
                    .mutate_settings(|s| {
                        s.logto = Some(target.clone());
                        format!("Logging enabled, sending to `{target}`")
                    })
                    .await;
                (reply, true)
            }

            Command::Log {
                enabled: Some(false),
                ..
            } => {
                let reply = self
                    .mutate_settings(|s| {
                        s.logto = None;
                        "Logging disabled".to_string()
                    })
                    .await;
                (reply, true)
            }

            Command::PatternsAdd(pats) => {
                let mut added = Vec::new();
                let reply = self
                    .mutate_settings_if(|s| {
                        for pat in &pats {
                            if !s.patterns.contains(pat) {
                                s.patterns.push(pat.clone());
                                added.push(pat.clone());
                            }
                        }
                        if added.is_empty() {
                            None
                        } else {
                            Some(format!("Added pattern(s): {}", backticked(&added)))
                        }
                    })
                    .await
                    .unwrap_or_else(|| "No patterns added!".to_string());
                (reply, true)
            }

            Command::PatternsRemove(pats) => {
                let mut removed = Vec::new();
                let reply = self
                    .mutate_settings_if(|s| {
                        for pat in &pats {
                            if s.patterns.contains(pat) {
                                s.patterns.retain(|p| p != pat);
                                removed.push(pat.clone());
                            }
                        }
                        if removed.is_empty() {
                            None
                        } else {
                            Some(format!("Removed pattern(s): {}", backticked(&removed)))
                        }
                    })
                    .await
                    .unwrap_or_else(|| "No patterns removed!".to_string());
                (reply, true)
            }

            Command::PatternsList => match self.store.load().await {
                Ok(settings) => (
                    format!("Current patterns: {}", backticked(&settings.patterns)),
                    true,
                ),
                Err(err) => (format!("Could not read config: {err}"), true),
            },

            Command::Debug(enabled) => {
                let Some(log) = &self.log else {
                    return ("Debug toggle is unavailable".to_string(), true);
                };
                let enable = enabled.unwrap_or(!log.is_debug());
                let reply = match log.set_debug(enable) {
                    Ok(()) => {
                        let state = if enable { "enabled" } else { "disabled" };
                        info!("debug logging {state}");
                        format!("Debug logging `{state}`")
                    }
                    Err(err) => format!("Could not change log level: {err}"),
                };
                (reply, true)
            }

            Command::Quit => ("Shutting down".to_string(), false),
        }
    }

    /// Load settings, apply `mutate`, save, and restart all sessions so
    /// the change takes effect. Returns the reply from `mutate`.
    async fn mutate_settings<F>(&mut self, mutate: F) -> String
    where
        F: FnOnce(&mut crate::config::Settings) -> String,
    {
        self.mutate_settings_if(|s| Some(mutate(s)))
            .await
            .unwrap_or_default()
    }

    /// Like `mutate_settings`, but `mutate` may decline (return `None`),
    /// in which case nothing is saved and no sessions restart.
    async fn mutate_settings_if<F>(&mut self, mutate: F) -> Option<String>
    where
        F: FnOnce(&mut crate::config::Settings) -> Option<String>,
    {
        let mut settings = match self.store.load().await {
            Ok(settings) => settings,
            Err(err) => return Some(format!("Could not read config: {err}")),
        };

        let reply = mutate(&mut settings)?;

        if let Err(err) = self.store.save(&settings).await {
            return Some(format!("Could not save config: {err}"));
        }

        self.reload_all().await;
        Some(reply)
    }
}
