// src/watch/error.rs

//! Error types for the watch layer.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from session construction, lifecycle and timer scheduling.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("session already started")]
    AlreadyStarted,

    #[error("scheduler is gone; cannot arm debounce timer")]
    SchedulerGone,

    #[error("filesystem watcher error: {0}")]
    Notify(#[from] notify::Error),
}
