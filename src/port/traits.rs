//! Core traits for serial port abstraction.
//!
//! Defines the `SerialPortAdapter` trait that lets the real hardware port and
//! the scripted mock be used interchangeably, and `PortOpener`, which the
//! resolver uses to turn a candidate name into an open port.

use super::error::PortError;
use super::sync_port::SyncSerialPort;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters used when opening a candidate port.
///
/// Frames are always 8N1 without flow control; the probe firmware does not
/// speak anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSettings {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Read timeout applied right after opening.
    pub open_timeout: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            open_timeout: Duration::from_secs(1),
        }
    }
}

/// Trait for serial port I/O operations.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Block until the transport has accepted everything written so far.
    fn flush(&mut self) -> Result<(), PortError>;

    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Blocks for at most the configured timeout. An expired timeout is an
    /// error for which [`PortError::is_timeout`] returns true.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Set the read/write timeout for this port.
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError>;

    /// Discard any received but unread data.
    fn clear_input(&mut self) -> Result<(), PortError>;

    /// Drive the DTR and RTS modem control lines.
    ///
    /// Many USB-serial boards wire these to reset/boot pins, so they must be
    /// deasserted before talking to the device under test.
    fn write_control_lines(&mut self, dtr: bool, rts: bool) -> Result<(), PortError>;

    /// Get the current bytes available to read (if supported).
    fn bytes_to_read(&self) -> Option<usize> {
        None
    }
}

/// Opens a serial port by name.
///
/// The resolver only knows candidate names; how they are opened is injected so
/// tests can hand out mock ports.
pub trait PortOpener: Send + Sync {
    fn open(
        &self,
        port_name: &str,
        settings: &LinkSettings,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError>;
}

/// Opens real ports through the `serialport` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPortOpener;

impl PortOpener for SystemPortOpener {
    fn open(
        &self,
        port_name: &str,
        settings: &LinkSettings,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let port = SyncSerialPort::open(port_name, settings)?;
        Ok(Box::new(port))
    }
}
