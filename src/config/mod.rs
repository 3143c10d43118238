// src/config/mod.rs

//! Persisted configuration for plugwatch.
//!
//! Responsibilities:
//! - Define the settings data model with its defaults (`model.rs`).
//! - Load/save settings through the `ConfigStore` trait (`store.rs`).
//!
//! Settings are read fresh every time a watch session is created, so a
//! global `reload_all` is what makes changed values reach live sessions.

pub mod model;
pub mod store;

pub use model::Settings;
pub use store::{ConfigStore, MemoryConfigStore, TomlConfigStore};
