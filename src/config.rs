//! Engine configuration loading and persistence.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Effect, Result, Transience};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub debounce: DebounceConfig,
}

/// Session cache and tick cadence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle seconds before a session is evicted from the cache.
    pub lifetime_secs: u64,
    /// Schedule units between session ticks (host-driven).
    pub tick_interval: u64,
    /// Milliseconds a memoized bypass-permission answer stays fresh.
    pub bypass_ttl_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime_secs: 600,
            tick_interval: 20,
            bypass_ttl_ms: 2_000,
        }
    }
}

impl SessionConfig {
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.lifetime_secs)
    }

    pub fn bypass_ttl(&self) -> Duration {
        Duration::from_millis(self.bypass_ttl_ms)
    }
}

/// Event debounce cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Maximum number of memoized event outcomes.
    pub capacity: usize,
    /// Milliseconds from first write until an outcome expires.
    pub ttl_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            capacity: 1_024,
            ttl_ms: 1_000,
        }
    }
}

impl DebounceConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// Configuration read/parse/persist failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },
    #[error("failed to persist {path}: {reason}")]
    Persist { path: String, reason: String },
}

impl ConfigError {
    pub fn transience(&self) -> Transience {
        match self {
            // Filesystem trouble may clear up; a bad document will not.
            ConfigError::Read { .. } | ConfigError::Persist { .. } => Transience::Unknown,
            ConfigError::Parse { .. } => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            ConfigError::Persist { .. } => Effect::Unknown,
            _ => Effect::None,
        }
    }
}

pub fn load(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let cfg = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(cfg)
}

/// Load a config, falling back to (and persisting) defaults when the file is
/// absent or unreadable.
pub fn load_or_init(path: &Path) -> Config {
    if path.exists() {
        match load(path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                tracing::warn!("config load failed, using defaults: {e}");
                return Config::default();
            }
        }
    }

    let cfg = Config::default();
    if let Err(e) = write_config(path, &cfg) {
        tracing::warn!("failed to write default config: {e}");
    }
    cfg
}

pub fn write_config(path: &Path, cfg: &Config) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| ConfigError::Persist {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;
    }
    let contents = toml::to_string_pretty(cfg).map_err(|e| ConfigError::Persist {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    atomic_write(path, contents.as_bytes())
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let persist_error = |reason: String| ConfigError::Persist {
        path: path.display().to_string(),
        reason,
    };
    let dir = path
        .parent()
        .ok_or_else(|| persist_error("config path missing parent directory".to_string()))?;
    let temp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| persist_error(format!("failed to create temp file: {e}")))?;
    fs::write(temp.path(), data)
        .map_err(|e| persist_error(format!("failed to write temp file: {e}")))?;
    temp.persist(path)
        .map_err(|e| persist_error(e.to_string()))?;
    Ok(())
}
