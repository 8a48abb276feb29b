//! Utility functions for hardware testing.

use probe_harness::config::Config;
use probe_harness::resolver::{NamedPorts, PortResolver};
use probe_harness::{SystemPortOpener, TestProtocol, TestRequest};
use serialport::{available_ports, SerialPortType};
use std::env;
use std::sync::Arc;

/// Test board configuration from environment variables.
pub struct TestBoard {
    pub port_name: String,
    pub pwm_value: i64,
    pub probe_value: i64,
}

impl TestBoard {
    pub fn from_env() -> Option<Self> {
        let port_name = env::var("TEST_PORT").ok()?;
        let pwm_value = env::var("TEST_PWM")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(2000);
        let probe_value = env::var("TEST_PROBE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1500);

        Some(Self {
            port_name,
            pwm_value,
            probe_value,
        })
    }

    pub fn request(&self) -> TestRequest {
        TestRequest::new(self.pwm_value, self.probe_value)
    }

    /// A protocol that only ever tries the board's port, with real timings.
    pub fn protocol(&self) -> TestProtocol {
        let config = Config::default();
        let resolver = PortResolver::new(Arc::new(SystemPortOpener), config.serial.link_settings())
            .with_providers(vec![Box::new(NamedPorts(vec![self.port_name.clone()]))]);
        TestProtocol::new(resolver, config.protocol)
    }
}

/// Skip the current test when no board is configured.
#[macro_export]
macro_rules! require_board {
    () => {
        match $crate::hardware::utils::TestBoard::from_env() {
            Some(board) => board,
            None => {
                eprintln!("Skipping: TEST_PORT not set");
                return;
            }
        }
    };
}

/// Print USB serial ports, to help pick a TEST_PORT.
pub fn print_usb_ports() {
    for port in available_ports().unwrap_or_default() {
        if let SerialPortType::UsbPort(info) = &port.port_type {
            println!("  {} ({:04x}:{:04x})", port.port_name, info.vid, info.pid);
        }
    }
}
