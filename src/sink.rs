// src/sink.rs

//! Notification sinks and message pagination.
//!
//! Sends are best-effort: the runtime logs a failed send and moves on, it
//! never retries and never lets a sink failure affect watch state.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

/// Upper bound on a single message accepted by typical chat-style sinks.
pub const MESSAGE_LIMIT: usize = 2000;

/// Characters reserved per page for decoration the caller wraps around the
/// text (code fences and the like).
pub const PAGE_HEADROOM: usize = 16;

/// An addressable endpoint for human-readable status messages.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Sink writing one line per message to stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

#[async_trait]
impl NotificationSink for StdoutSink {
    async fn send(&self, text: &str) -> Result<()> {
        let mut out = tokio::io::stdout();
        out.write_all(text.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
        Ok(())
    }
}

/// Sink appending one line per message to a file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl NotificationSink for FileSink {
    async fn send(&self, text: &str) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening notification file {:?}", self.path))?;
        file.write_all(text.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

/// Map a configured `logto` target to a sink.
///
/// `stdout` (or `-`) writes to standard output; anything else is treated
/// as a file path to append to. Hosts embedding the library can bypass
/// this and supply their own [`NotificationSink`].
pub fn resolve_sink(target: &str) -> Arc<dyn NotificationSink> {
    match target {
        "stdout" | "-" => Arc::new(StdoutSink),
        path => Arc::new(FileSink::new(path)),
    }
}

/// Split `text` into pages of at most `limit - headroom` bytes each,
/// preferring to break at newlines. Lines longer than a page are split at
/// character boundaries. Empty text yields no pages.
pub fn paginate(text: &str, limit: usize, headroom: usize) -> Vec<String> {
    let max = limit.saturating_sub(headroom).max(1);
    let mut pages = Vec::new();
    let mut current = String::new();

    for line in text.split('\n') {
        for piece in split_oversized(line, max) {
            if current.is_empty() {
                current.push_str(piece);
                continue;
            }
            if current.len() + 1 + piece.len() <= max {
                current.push('\n');
                current.push_str(piece);
            } else {
                pages.push(std::mem::take(&mut current));
                current.push_str(piece);
            }
        }
    }

    if !current.is_empty() {
        pages.push(current);
    }
    pages
}

/// Split a single line into chunks of at most `max` bytes, respecting
/// char boundaries.
fn split_oversized(line: &str, max: usize) -> Vec<&str> {
    if line.len() <= max {
        return vec![line];
    }

    let mut chunks = Vec::new();
    let mut rest = line;
    while rest.len() > max {
        let mut cut = max;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }
    chunks.push(rest);
    chunks
}
