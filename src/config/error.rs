//! Errors raised while loading, validating or writing `probe-harness.toml`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists (or was named explicitly) but could not be read.
    #[error("Cannot read config file {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the schema.
    #[error("Config file {} is invalid: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Cannot encode configuration as TOML: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("Cannot write config file {}: {source}", .path.display())]
    Unwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value that would make every run fail.
    #[error("[{section}] {key} {message}")]
    OutOfRange {
        section: &'static str,
        key: &'static str,
        message: &'static str,
    },

    /// A `PROBE_HARNESS_*` override that does not parse.
    #[error("{var}={value:?} is not a valid {expected}")]
    BadOverride {
        var: String,
        value: String,
        expected: &'static str,
    },

    /// Saving was requested but there is nowhere to save to.
    #[error("No config file to write: none was loaded and no platform config directory exists")]
    NoWriteTarget,
}

impl ConfigError {
    pub fn out_of_range(section: &'static str, key: &'static str, message: &'static str) -> Self {
        Self::OutOfRange {
            section,
            key,
            message,
        }
    }

    pub fn bad_override(
        var: impl Into<String>,
        value: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::BadOverride {
            var: var.into(),
            value: value.into(),
            expected,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
