//! Configuration module for probe-harness.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `PROBE_HARNESS_CONFIG` environment variable (explicit path)
//! 2. `./probe-harness.toml` (current directory)
//! 3. The platform config directory (`~/.config/probe-harness/probe-harness.toml`
//!    on Linux, `%APPDATA%\probe-harness\config\` on Windows)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is: `PROBE_HARNESS_<SECTION>_<KEY>`
//!
//! Examples:
//! - `PROBE_HARNESS_SERIAL_PORT=COM7`
//! - `PROBE_HARNESS_PROTOCOL_READ_DEADLINE_MS=5000`
//! - `PROBE_HARNESS_LOGGING_LEVEL=debug`
//!
//! # Example
//!
//! ```toml
//! [serial]
//! port = "probe"
//!
//! [serial.port_aliases]
//! probe = "/dev/ttyACM0"
//!
//! [protocol]
//! pwm_tolerance = 50
//! probe_tolerance = 100
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{
    Config, LogFormat, LoggingConfig, ProtocolConfig, SerialConfig, UploadConfig, UploadStep,
};
