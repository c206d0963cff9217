//! Configuration management for Waysnitch
//!
//! This module handles loading, parsing, and validating configuration
//! from TOML files. It combines settings for the toplevel window, the
//! on-screen event log and general client behaviour.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Largest window dimension accepted from configuration (pixels)
const MAX_DIMENSION: u32 = 16384;

/// Main configuration struct containing all Waysnitch settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClientConfig {
    /// Toplevel window settings
    #[serde(default)]
    pub window: WindowConfig,

    /// On-screen event log settings
    #[serde(default)]
    pub log: EventLogConfig,

    /// General client settings
    #[serde(default)]
    pub general: GeneralConfig,
}

/// Toplevel window configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title shown by the compositor
    pub title: String,

    /// Application id used by the compositor for grouping
    pub app_id: String,

    /// Buffer width used until the compositor suggests a size (pixels)
    pub default_width: u32,

    /// Buffer height used until the compositor suggests a size (pixels)
    pub default_height: u32,

    /// Recreate the pixel buffer when an acknowledged configure changes the
    /// window geometry. Off by default: the first buffer is kept for the
    /// whole session.
    pub resize_buffer_on_configure: bool,
}

/// Event log configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EventLogConfig {
    /// Maximum number of retained entries
    pub capacity: usize,

    /// chrono format string for the entry timestamp
    pub timestamp_format: String,
}

/// General client settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable debug logging
    pub debug: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Waysnitch".to_string(),
            app_id: "waysnitch".to_string(),
            default_width: 800,
            default_height: 600,
            resize_buffer_on_configure: false,
        }
    }
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            capacity: 30,
            timestamp_format: "%H:%M:%S%.3f".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Expand ~ to home directory
        let expanded_path = if path.to_string_lossy().starts_with('~') {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            let rest = path.strip_prefix("~").unwrap_or(path);
            Path::new(&home).join(rest)
        } else {
            path.to_path_buf()
        };

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: ClientConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.window.title.trim().is_empty() {
            anyhow::bail!("Invalid window title: must not be empty");
        }

        if self.window.default_width == 0 || self.window.default_height == 0 {
            anyhow::bail!(
                "Invalid default window size {}x{}: both dimensions must be positive",
                self.window.default_width,
                self.window.default_height
            );
        }

        if self.window.default_width > MAX_DIMENSION || self.window.default_height > MAX_DIMENSION {
            anyhow::bail!(
                "Invalid default window size {}x{}: dimensions are limited to {}",
                self.window.default_width,
                self.window.default_height,
                MAX_DIMENSION
            );
        }

        if self.log.capacity == 0 {
            anyhow::bail!("Invalid event log capacity: must be at least 1");
        }

        if !crate::event_log::is_valid_timestamp_format(&self.log.timestamp_format) {
            anyhow::bail!(
                "Invalid event log timestamp format '{}'",
                self.log.timestamp_format
            );
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }

    /// Merge a partial configuration into this one
    /// Non-default sections from the partial config override this config
    pub fn merge_partial(mut self, partial: ClientConfig) -> Self {
        let default_config = ClientConfig::default();

        if partial.window != default_config.window {
            self.window = partial.window;
        }
        if partial.log != default_config.log {
            self.log = partial.log;
        }
        if partial.general != default_config.general {
            self.general = partial.general;
        }

        self
    }
}

#[cfg(test)]
mod tests;
