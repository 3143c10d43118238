// src/engine/mod.rs

//! Orchestration engine for plugwatch.
//!
//! This module ties together:
//! - the single-threaded runtime event loop that reacts to:
//!   - debounce expiries from watch handlers
//!   - control commands
//!   - shutdown signals
//! - the command surface (parse + execute with human-readable replies)
//!
//! Everything that mutates the registry or talks to the reload action and
//! notification sink runs here, on the scheduler; the watch layer only
//! enqueues events.

pub mod command;
pub mod runtime;

pub use command::Command;
pub use runtime::{Runtime, RuntimeEvent};
