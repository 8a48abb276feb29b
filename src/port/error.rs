//! Port-specific error types.
//!
//! Kept apart from link and protocol errors so the resolver can tell "this
//! candidate does not exist" from "this candidate exists but misbehaved".

use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Port configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error only means "nothing arrived in time".
    ///
    /// `serialport` reports an expired read timeout as `TimedOut`; some
    /// platforms (and the mock) use `WouldBlock` for the same situation.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PortError::not_found("/dev/ttyUSB0");
        assert_eq!(err.to_string(), "Serial port not found: /dev/ttyUSB0");

        let err = PortError::config("DTR write rejected");
        assert_eq!(err.to_string(), "Configuration error: DTR write rejected");
    }

    #[test]
    fn test_timeout_classification() {
        assert!(PortError::Io(std::io::ErrorKind::TimedOut.into()).is_timeout());
        assert!(PortError::Io(std::io::ErrorKind::WouldBlock.into()).is_timeout());
        assert!(!PortError::Io(std::io::ErrorKind::BrokenPipe.into()).is_timeout());
        assert!(!PortError::not_found("COM3").is_timeout());
        assert!(!PortError::config("modem lines").is_timeout());
    }
}
