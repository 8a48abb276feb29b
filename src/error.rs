use crate::config::ConfigError;
use crate::logging::LoggingError;
use std::fmt;

/// Top-level error for the command-line front end.
///
/// Test failures are not errors at this level; they are reported through the
/// run summary. These variants mean the harness itself could not do its job.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Logging(LoggingError),
    Worker(tokio::task::JoinError),
    IoError(std::io::Error),
    SerdeError(serde_json::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration problem: {e}"),
            Self::Logging(e) => write!(f, "Could not set up logging: {e}"),
            Self::Worker(e) => write!(f, "The test worker stopped unexpectedly: {e}"),
            Self::IoError(e) => write!(f, "An I/O error occurred: {e}"),
            Self::SerdeError(e) => write!(f, "A serialization error occurred: {e}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Logging(e) => Some(e),
            Self::Worker(e) => Some(e),
            Self::IoError(e) => Some(e),
            Self::SerdeError(e) => Some(e),
        }
    }
}

// Implement `From` conversions to allow the `?` operator to work seamlessly.
impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<LoggingError> for AppError {
    fn from(err: LoggingError) -> Self {
        AppError::Logging(err)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Worker(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerdeError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err: AppError =
            ConfigError::out_of_range("serial", "baud_rate", "must be non-zero").into();
        assert_eq!(err.to_string(), "Configuration problem: [serial] baud_rate must be non-zero");
    }

    #[test]
    fn test_io_error_has_source() {
        let err: AppError = std::io::Error::other("disk full").into();
        assert!(std::error::Error::source(&err).is_some());
    }
}
