// src/watch/mod.rs

//! Debounced file watching.
//!
//! This module is responsible for:
//! - Compiling glob patterns that decide whether a changed file matters
//!   (`patterns`).
//! - Coalescing bursts of raw filesystem events into one deferred action
//!   per quiet period (`debounce`, `handler`).
//! - Owning the OS-level recursive watches, one per tracked item
//!   (`session`), and their process-wide collection (`registry`).
//!
//! It does **not** perform reloads or send notifications; on debounce
//! expiry it only enqueues a [`crate::engine::RuntimeEvent::ReloadDue`]
//! onto the scheduler, which owns all business logic.

pub mod debounce;
pub mod error;
pub mod handler;
pub mod patterns;
pub mod registry;
pub mod session;

pub use debounce::DebounceTimer;
pub use error::WatchError;
pub use handler::WatchHandler;
pub use patterns::PatternSet;
pub use registry::WatchRegistry;
pub use session::WatchSession;
