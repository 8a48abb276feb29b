//! Mock serial port implementation for testing.
//!
//! `MockSerialPort` simulates a probe board without hardware: bytes can be
//! queued for immediate reading, or staged so they only show up after the host
//! clears its input buffer (which is how a real board's answer arrives relative
//! to the protocol's resynchronization step).

use super::error::PortError;
use super::traits::SerialPortAdapter;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct MockPortState {
    /// Bytes returned by read operations.
    read_queue: VecDeque<u8>,
    /// Bytes moved into `read_queue` by the next `clear_input`.
    after_clear: VecDeque<u8>,
    /// Log of all writes, one entry per call.
    write_log: Vec<Vec<u8>>,
    /// Current read timeout.
    timeout: Duration,
    /// Number of `clear_input` calls.
    clear_count: usize,
    /// Last DTR/RTS values written, if any.
    control_lines: Option<(bool, bool)>,
    /// Whether the simulated cable has been pulled.
    disconnected: bool,
    /// Whether `write_control_lines` should be rejected.
    reject_control_lines: bool,
}

/// Mock serial port implementation for testing.
///
/// Clones share state, so a test can keep one handle for inspection while a
/// boxed clone is owned by a `DeviceLink`.
///
/// # Example
/// ```
/// use probe_harness::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.enqueue_read(b"boot noise\n");
/// port.enqueue_after_clear(b"pwmRead:2000\n");
///
/// port.clear_input().unwrap();
///
/// let mut buffer = [0u8; 32];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"pwmRead:2000\n");
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    name: String,
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState {
                timeout: Duration::from_secs(1),
                ..Default::default()
            })),
        }
    }

    /// Queue bytes that are readable right away.
    pub fn enqueue_read(&mut self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Stage bytes that become readable after the next `clear_input`.
    pub fn enqueue_after_clear(&mut self, data: &[u8]) {
        self.state.lock().after_clear.extend(data);
    }

    /// Get a copy of all data written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Number of times the input buffer was cleared.
    pub fn clear_count(&self) -> usize {
        self.state.lock().clear_count
    }

    /// Last DTR/RTS values written, `None` if they were never touched.
    pub fn control_lines(&self) -> Option<(bool, bool)> {
        self.state.lock().control_lines
    }

    /// Current read timeout as last set by the caller.
    pub fn timeout(&self) -> Duration {
        self.state.lock().timeout
    }

    /// Simulate the device being unplugged.
    pub fn disconnect(&mut self) {
        self.state.lock().disconnected = true;
    }

    /// Make `write_control_lines` fail, like a driver without modem lines.
    pub fn reject_control_lines(&mut self) {
        self.state.lock().reject_control_lines = true;
    }

    /// Live handles sharing this port's state, `self` included.
    ///
    /// Drops back once a `DeviceLink` owning a clone is closed.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.state)
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    fn unplugged() -> PortError {
        PortError::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "device disconnected",
        ))
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        if state.disconnected {
            return Err(Self::unplugged());
        }
        state.write_log.push(data.to_vec());
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), PortError> {
        if self.state.lock().disconnected {
            return Err(Self::unplugged());
        }
        Ok(())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let timeout = {
            let mut state = self.state.lock();
            if state.disconnected {
                return Err(Self::unplugged());
            }

            let mut bytes_read = 0;
            for byte in buffer.iter_mut() {
                match state.read_queue.pop_front() {
                    Some(queued) => {
                        *byte = queued;
                        bytes_read += 1;
                    }
                    None => break,
                }
            }
            if bytes_read > 0 {
                return Ok(bytes_read);
            }
            state.timeout
        };

        // Nothing queued: behave like a real port and wait out the timeout.
        std::thread::sleep(timeout);
        Err(PortError::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "Operation timed out",
        )))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        self.state.lock().timeout = timeout;
        Ok(())
    }

    fn clear_input(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if state.disconnected {
            return Err(Self::unplugged());
        }
        let staged = std::mem::take(&mut state.after_clear);
        state.read_queue = staged;
        state.clear_count += 1;
        Ok(())
    }

    fn write_control_lines(&mut self, dtr: bool, rts: bool) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if state.reject_control_lines {
            return Err(PortError::config("modem control lines not supported"));
        }
        state.control_lines = Some((dtr, rts));
        Ok(())
    }

    fn bytes_to_read(&self) -> Option<usize> {
        Some(self.available_bytes())
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}
