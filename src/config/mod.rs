//! Configuration management for the monitor binary
//!
//! Handles loading, parsing and validation of the YAML configuration file.
//! Command-line flags are applied on top with [`AppConfig::with_overrides`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

use crate::avr::reconcile::{DEFAULT_POWERON_DELAY, DEFAULT_POWERON_INTERVAL};
use crate::avr::ReconcileTiming;
use crate::connection::{DEFAULT_COMMAND_SPACING, DEFAULT_PORT};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub receiver: ReceiverConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Receiver address
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReceiverConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Power-on loop and writer pacing, all in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimingConfig {
    #[serde(default = "default_poweron_delay_ms")]
    pub poweron_delay_ms: u64,
    #[serde(default = "default_poweron_interval_ms")]
    pub poweron_interval_ms: u64,
    #[serde(default = "default_command_spacing_ms")]
    pub command_spacing_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Also write a daily-rolling log file to the logs directory
    #[serde(default)]
    pub file: bool,
}

// Default value functions
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_poweron_delay_ms() -> u64 {
    DEFAULT_POWERON_DELAY.as_millis() as u64
}
fn default_poweron_interval_ms() -> u64 {
    DEFAULT_POWERON_INTERVAL.as_millis() as u64
}
fn default_command_spacing_ms() -> u64 {
    DEFAULT_COMMAND_SPACING.as_millis() as u64
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poweron_delay_ms: default_poweron_delay_ms(),
            poweron_interval_ms: default_poweron_interval_ms(),
            command_spacing_ms: default_command_spacing_ms(),
        }
    }
}

impl TimingConfig {
    pub fn reconcile(&self) -> ReconcileTiming {
        ReconcileTiming {
            initial_delay: Duration::from_millis(self.poweron_delay_ms),
            interval: Duration::from_millis(self.poweron_interval_ms),
        }
    }

    pub fn command_spacing(&self) -> Duration {
        Duration::from_millis(self.command_spacing_ms)
    }
}

impl AppConfig {
    /// Load configuration from a YAML file and validate it
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::read(path.as_ref()).await?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file without validating
    ///
    /// Used when command-line overrides may still fill in missing values.
    pub async fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty file deserializes to unit, not to an empty mapping
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Save configuration to file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Apply command-line values on top of the file
    pub fn with_overrides(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.receiver.host = host;
        }
        if let Some(port) = port {
            self.receiver.port = port;
        }
        self
    }

    /// Validate configuration for correctness
    pub fn validate(&self) -> Result<()> {
        if self.receiver.host.trim().is_empty() {
            anyhow::bail!("receiver.host cannot be empty (set it in the config or pass --host)");
        }
        if self.receiver.port == 0 {
            anyhow::bail!("receiver.port must be greater than 0");
        }
        if self.timing.poweron_interval_ms == 0 {
            anyhow::bail!("timing.poweron_interval_ms must be greater than 0");
        }
        Ok(())
    }
}
