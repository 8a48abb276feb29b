//! Line-oriented link to the device under test.
//!
//! `DeviceLink` owns an opened port for the duration of one test run. It frames
//! the incoming byte stream into newline-terminated lines and bounds every read
//! by an absolute deadline. The port is closed when the link is dropped.

use crate::port::{PortError, SerialPortAdapter};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace};

/// Size of a single read from the port.
const READ_CHUNK: usize = 256;

/// Errors raised by the link.
///
/// A read deadline expiring is not an error; see [`DeviceLink::read_line`].
#[derive(Debug, Error)]
pub enum LinkError {
    /// The transport failed (device unplugged, driver error, end of stream).
    #[error("Link to {port} lost: {source}")]
    LinkLost {
        port: String,
        #[source]
        source: PortError,
    },
}

/// An open, exclusively owned connection to the device under test.
#[derive(Debug)]
pub struct DeviceLink {
    port: Box<dyn SerialPortAdapter>,
    /// Received bytes not yet returned as a line.
    pending: Vec<u8>,
}

impl DeviceLink {
    pub fn new(port: Box<dyn SerialPortAdapter>) -> Self {
        Self {
            port,
            pending: Vec::with_capacity(READ_CHUNK),
        }
    }

    /// Name of the underlying port.
    pub fn port_name(&self) -> &str {
        self.port.name()
    }

    /// Write `payload` followed by a newline (unless it already ends in one).
    ///
    /// Returns once the transport has accepted the bytes; there is no
    /// delivery acknowledgment at this layer.
    pub fn send(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        let mut frame = payload.to_vec();
        if frame.last() != Some(&b'\n') {
            frame.push(b'\n');
        }

        let mut written = 0;
        while written < frame.len() {
            let n = self
                .port
                .write_bytes(&frame[written..])
                .map_err(|e| self.lost(e))?;
            if n == 0 {
                let err = PortError::Io(std::io::ErrorKind::WriteZero.into());
                return Err(self.lost(err));
            }
            written += n;
        }
        self.port.flush().map_err(|e| self.lost(e))?;

        debug!(port = %self.port_name(), bytes = written, "Sent frame");
        Ok(())
    }

    /// Read the next complete line, waiting no later than `deadline`.
    ///
    /// The terminator (and a trailing `\r`) is stripped and the bytes are
    /// decoded as lossy UTF-8, so garbled input never fails the read. Returns
    /// `Ok(None)` once the deadline has passed; bytes of an unfinished line
    /// stay buffered for the next call.
    pub fn read_line(&mut self, deadline: Instant) -> Result<Option<String>, LinkError> {
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            // The port's own timed read does the waiting.
            self.port
                .set_timeout(remaining)
                .map_err(|e| self.lost(e))?;

            match self.port.read_bytes(&mut chunk) {
                Ok(0) => {
                    let err = PortError::Io(std::io::ErrorKind::UnexpectedEof.into());
                    return Err(self.lost(err));
                }
                Ok(n) => {
                    trace!(port = %self.port_name(), bytes = n, "Received chunk");
                    self.pending.extend_from_slice(&chunk[..n]);
                }
                Err(e) if e.is_timeout() => continue,
                Err(e) => return Err(self.lost(e)),
            }
        }
    }

    /// Discard everything received so far, buffered here or in the driver.
    pub fn flush_input(&mut self) -> Result<(), LinkError> {
        let dropped = self.pending.len() + self.port.bytes_to_read().unwrap_or(0);
        self.pending.clear();
        self.port.clear_input().map_err(|e| self.lost(e))?;

        debug!(port = %self.port_name(), dropped, "Flushed input");
        Ok(())
    }

    /// Convenience for callers holding a relative timeout.
    pub fn read_line_within(&mut self, timeout: Duration) -> Result<Option<String>, LinkError> {
        self.read_line(Instant::now() + timeout)
    }

    fn take_line(&mut self) -> Option<String> {
        let end = memchr::memchr(b'\n', &self.pending)?;
        let mut raw: Vec<u8> = self.pending.drain(..=end).collect();
        raw.pop();
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        Some(String::from_utf8_lossy(&raw).into_owned())
    }

    fn lost(&self, source: PortError) -> LinkError {
        LinkError::LinkLost {
            port: self.port_name().to_string(),
            source,
        }
    }
}

impl Drop for DeviceLink {
    fn drop(&mut self) {
        debug!(port = %self.port.name(), "Closing serial link");
    }
}
