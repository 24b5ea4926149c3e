//! Runtime buffering configuration.
//!
//! Buffered ports take their defaults from environment variables, resolved
//! once per process and cached:
//! - `PORTIO_BUFFER_SIZE`: buffer capacity in bytes (default 8192, never
//!   below the widest encoded character).
//! - `PORTIO_BUFFER_MODE`: `full` (default), `line` or `none`.
//! - `PORTIO_ENCODING`: `utf-8` (default) or `latin1`.
//!
//! Tests and embedders can bypass the environment with [`PortConfig::new`]
//! or [`PortConfig::from_lookup`].

use std::sync::OnceLock;

use crate::buffer::{BUFSIZ, BufferMode};
use crate::codec::{Encoding, MAX_CHAR_BYTES};

pub const ENV_BUFFER_SIZE: &str = "PORTIO_BUFFER_SIZE";
pub const ENV_BUFFER_MODE: &str = "PORTIO_BUFFER_MODE";
pub const ENV_ENCODING: &str = "PORTIO_ENCODING";

/// Settings applied when a buffered port is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortConfig {
    pub buffer_size: usize,
    pub buffer_mode: BufferMode,
    pub encoding: Encoding,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            buffer_size: BUFSIZ,
            buffer_mode: BufferMode::Full,
            encoding: Encoding::Utf8,
        }
    }
}

impl PortConfig {
    #[must_use]
    pub fn new(buffer_size: usize, buffer_mode: BufferMode) -> Self {
        Self {
            buffer_size: buffer_size.max(MAX_CHAR_BYTES),
            buffer_mode,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Resolve settings through `lookup`, which maps a variable name to its
    /// value. Missing or unparsable values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(size) = lookup(ENV_BUFFER_SIZE).and_then(|v| v.trim().parse::<usize>().ok()) {
            config.buffer_size = size.max(MAX_CHAR_BYTES);
        }
        if let Some(mode) = lookup(ENV_BUFFER_MODE).and_then(|v| BufferMode::from_str_loose(&v)) {
            config.buffer_mode = mode;
        }
        if let Some(name) = lookup(ENV_ENCODING) {
            config.encoding = Encoding::from_str_loose(name.trim());
        }
        config
    }

    /// Resolve settings from the process environment (uncached).
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

static CACHED: OnceLock<PortConfig> = OnceLock::new();

/// Process-wide configuration (reads the environment on first call, cached
/// thereafter).
#[must_use]
pub fn default_config() -> PortConfig {
    *CACHED.get_or_init(PortConfig::from_env)
}
