//! Configuration for zoned windows

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "MOCHI_ZONES_CONFIG";

/// How buffer content is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThreadMode {
    /// Plain string, owner-only access
    #[default]
    Local,
    /// Content behind a mutex so the buffer can be shared and inspected
    /// from other threads
    Synchronized,
}

/// Output buffer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Capacity in characters
    pub capacity: usize,
    /// Flush instead of failing when an add would overflow
    pub auto_flush: bool,
    /// Never let the content exceed capacity, even transiently
    pub strict_size_control: bool,
    /// Storage for the content
    #[serde(default)]
    pub thread_mode: ThreadMode,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 4096,
            auto_flush: true,
            strict_size_control: false,
            thread_mode: ThreadMode::Local,
        }
    }
}

impl BufferConfig {
    /// Buffer of the given capacity with default policies
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn auto_flush(mut self, on: bool) -> Self {
        self.auto_flush = on;
        self
    }

    pub fn strict(mut self, on: bool) -> Self {
        self.strict_size_control = on;
        self
    }

    pub fn thread_mode(mut self, mode: ThreadMode) -> Self {
        self.thread_mode = mode;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid(
                "buffer capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rectangular terminal region owned by one window (0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Left column
    pub col: usize,
    /// Top row
    pub row: usize,
    /// Width in columns
    pub width: usize,
    /// Height in rows
    pub height: usize,
}

impl Zone {
    pub fn new(col: usize, row: usize, width: usize, height: usize) -> Self {
        Self {
            col,
            row,
            width,
            height,
        }
    }

    /// Exclusive right edge
    pub fn right(&self) -> usize {
        self.col + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> usize {
        self.row + self.height
    }
}

/// Per-window configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Region of the terminal the window draws into
    pub zone: Zone,
    /// Output buffer policy
    pub buffer: BufferConfig,
    /// Scrollback retention in characters
    pub scrollback_chars: usize,
}

impl WindowConfig {
    pub fn new(zone: Zone) -> Self {
        Self {
            zone,
            buffer: BufferConfig::default(),
            scrollback_chars: Config::default().scrollback_chars,
        }
    }

    pub fn with_buffer(mut self, buffer: BufferConfig) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn with_scrollback(mut self, chars: usize) -> Self {
        self.scrollback_chars = chars;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.buffer.validate()?;
        if self.scrollback_chars == 0 {
            return Err(ConfigError::Invalid(
                "scrollback retention must be at least 1 char".to_string(),
            ));
        }
        if self.zone.height == 0 {
            return Err(ConfigError::Invalid(
                "zone height must be at least 1 row".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration: defaults applied to every window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Default output buffer policy
    pub buffer: BufferConfig,
    /// Default scrollback retention in characters
    pub scrollback_chars: usize,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer: BufferConfig::default(),
            scrollback_chars: 64 * 1024,
            log_filter: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from the default location or return the defaults
    pub fn load_or_default() -> Self {
        if let Some(path) = config_path() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Ignoring config {}: {}", path.display(), e),
                }
            }
        }
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.buffer.validate()?;
        if self.scrollback_chars == 0 {
            return Err(ConfigError::Invalid(
                "scrollback retention must be at least 1 char".to_string(),
            ));
        }
        Ok(())
    }

    /// Window configuration for a zone using these defaults
    pub fn window(&self, zone: Zone) -> WindowConfig {
        WindowConfig {
            zone,
            buffer: self.buffer,
            scrollback_chars: self.scrollback_chars,
        }
    }
}

/// Config file location: `$MOCHI_ZONES_CONFIG`, else
/// `$HOME/.config/mochi-zones/config.json`
fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    std::env::var("HOME").ok().map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("mochi-zones")
            .join("config.json")
    })
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
