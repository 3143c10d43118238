// src/config/store.rs

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::model::Settings;

/// Persistent storage for [`Settings`].
///
/// All mutation goes through tasks on the single-threaded scheduler, so a
/// load/modify/save sequence against a store is race-free without locking
/// at the call sites.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load(&self) -> Result<Settings>;
    async fn save(&self, settings: &Settings) -> Result<()>;
}

/// TOML file backed store.
///
/// A missing file loads as defaults; saving writes a sibling temp file and
/// renames it over the target, so a crash mid-save never leaves a
/// truncated config behind.
#[derive(Debug)]
pub struct TomlConfigStore {
    path: PathBuf,
}

impl TomlConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigStore for TomlConfigStore {
    async fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading config file at {:?}", self.path))?;
        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("parsing TOML config from {:?}", self.path))?;
        Ok(settings)
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        let text = toml::to_string_pretty(settings).context("serializing settings")?;

        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, text)
            .with_context(|| format!("writing config temp file at {tmp:?}"))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing config file at {:?}", self.path))?;
        Ok(())
    }
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    inner: Mutex<Settings>,
}

impl MemoryConfigStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Mutex::new(settings),
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self) -> Result<Settings> {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = settings.clone();
        Ok(())
    }
}
