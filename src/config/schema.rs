//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! Every section has defaults matching the probe firmware, so an empty file
//! (or no file at all) is a valid configuration.

use super::error::{ConfigError, ConfigResult};
use crate::port::LinkSettings;
use crate::resolver::CandidateSource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial port acquisition
    pub serial: SerialConfig,
    /// Test exchange timing and tolerances
    pub protocol: ProtocolConfig,
    /// Firmware/filesystem flashing
    pub upload: UploadConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values that would make every run fail in a confusing way.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::out_of_range("serial", "baud_rate", "must be non-zero"));
        }
        if self.serial.open_timeout_ms == 0 {
            return Err(ConfigError::out_of_range(
                "serial",
                "open_timeout_ms",
                "must be non-zero",
            ));
        }
        if self.protocol.read_deadline_ms == 0 {
            return Err(ConfigError::out_of_range(
                "protocol",
                "read_deadline_ms",
                "must be non-zero",
            ));
        }
        if self.protocol.pwm_tolerance <= 0 {
            return Err(ConfigError::out_of_range(
                "protocol",
                "pwm_tolerance",
                "must be positive",
            ));
        }
        if self.protocol.probe_tolerance <= 0 {
            return Err(ConfigError::out_of_range(
                "protocol",
                "probe_tolerance",
                "must be positive",
            ));
        }
        if self.upload.program.trim().is_empty() {
            return Err(ConfigError::out_of_range("upload", "program", "must not be empty"));
        }
        Ok(())
    }
}

/// Serial port configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Baud rate used for every candidate
    pub baud_rate: u32,
    /// Read timeout applied when a port is opened, in milliseconds
    pub open_timeout_ms: u64,
    /// Port tried before the scan (overridden by `--port`)
    pub port: Option<String>,
    /// Port aliases for convenience
    pub port_aliases: HashMap<String, String>,
    /// Fallback scan, in order
    pub candidates: Vec<CandidateSource>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            open_timeout_ms: 1000,
            port: None,
            port_aliases: HashMap::new(),
            candidates: CandidateSource::default_scan(),
        }
    }
}

impl SerialConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    pub fn link_settings(&self) -> LinkSettings {
        LinkSettings {
            baud_rate: self.baud_rate,
            open_timeout: self.open_timeout(),
        }
    }
}

/// Test exchange configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Wait after opening, lets the board finish its boot output
    pub settle_ms: u64,
    /// Wait between sending the PWM value and flushing input
    pub pre_flush_ms: u64,
    /// Budget for receiving both response lines
    pub read_deadline_ms: u64,
    /// Half-width of the PWM acceptance window
    pub pwm_tolerance: i64,
    /// Half-width of the position acceptance window
    pub probe_tolerance: i64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            settle_ms: 2000,
            pre_flush_ms: 1000,
            read_deadline_ms: 10_000,
            pwm_tolerance: 50,
            probe_tolerance: 100,
        }
    }
}

impl ProtocolConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn pre_flush(&self) -> Duration {
        Duration::from_millis(self.pre_flush_ms)
    }

    pub fn read_deadline(&self) -> Duration {
        Duration::from_millis(self.read_deadline_ms)
    }
}

/// Flashing toolchain configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Executable invoked for every step
    pub program: String,
    /// Steps run in order; the first failure stops the upload
    pub steps: Vec<UploadStep>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            program: "platformio".to_string(),
            steps: vec![
                UploadStep {
                    name: "firmware".to_string(),
                    args: vec!["run".into(), "--target".into(), "upload".into()],
                },
                UploadStep {
                    name: "filesystem image".to_string(),
                    args: vec!["run".into(), "--target".into(), "uploadfs".into()],
                },
            ],
        }
    }
}

/// One invocation of the upload program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadStep {
    /// Shown as "Uploading <name>..."
    pub name: String,
    pub args: Vec<String>,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
    /// Log file path (optional, stderr otherwise)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
            file: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    Pretty,
    /// Compact format
    #[default]
    Compact,
}
