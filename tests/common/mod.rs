//! Shared test utilities for probe harness tests.
//!
//! This module provides common test infrastructure including:
//! - A port opener that hands out mock ports by name
//! - Fast protocol timings
//! - Protocol builders wired to mock ports

#![allow(dead_code)]

use parking_lot::Mutex;
use probe_harness::config::ProtocolConfig;
use probe_harness::port::{LinkSettings, MockSerialPort, PortError, PortOpener, SerialPortAdapter};
use probe_harness::resolver::{NamedPorts, PortResolver};
use probe_harness::TestProtocol;
use std::collections::HashMap;
use std::sync::Arc;

/// Opens registered mock ports and records every attempt.
#[derive(Default)]
pub struct MockOpener {
    ports: HashMap<String, MockSerialPort>,
    attempts: Mutex<Vec<String>>,
}

impl MockOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `mock` openable under its own name.
    pub fn with_port(mut self, mock: &MockSerialPort) -> Self {
        self.ports.insert(mock.name().to_string(), mock.clone());
        self
    }

    /// Names passed to `open`, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().clone()
    }
}

impl PortOpener for MockOpener {
    fn open(
        &self,
        port_name: &str,
        _settings: &LinkSettings,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        self.attempts.lock().push(port_name.to_string());
        match self.ports.get(port_name) {
            Some(mock) => Ok(Box::new(mock.clone())),
            None => Err(PortError::not_found(port_name)),
        }
    }
}

/// Timings with no settle or pre-flush pause.
pub fn fast_timing(read_deadline_ms: u64) -> ProtocolConfig {
    ProtocolConfig {
        settle_ms: 0,
        pre_flush_ms: 0,
        read_deadline_ms,
        ..Default::default()
    }
}

/// A protocol whose only candidate is `mock`.
pub fn protocol_with(mock: &MockSerialPort, read_deadline_ms: u64) -> TestProtocol {
    let opener = MockOpener::new().with_port(mock);
    let resolver = PortResolver::new(Arc::new(opener), LinkSettings::default())
        .with_providers(vec![Box::new(NamedPorts(vec![mock.name().to_string()]))]);
    TestProtocol::new(resolver, fast_timing(read_deadline_ms))
}

/// A mock that answers with `lines` once the input buffer is flushed.
pub fn responding_probe(name: &str, lines: &[&str]) -> MockSerialPort {
    let mut mock = MockSerialPort::new(name);
    let mut payload = String::new();
    for line in lines {
        payload.push_str(line);
        payload.push('\n');
    }
    mock.enqueue_after_clear(payload.as_bytes());
    mock
}
