//! Candidate providers for port discovery.
//!
//! Each provider yields port names in a fixed order. The resolver walks the
//! providers in sequence, so the full scan order is the concatenation of their
//! outputs.

use serde::{Deserialize, Serialize};
use serialport::SerialPortType;
use tracing::debug;

/// Supplies candidate port names, in the order they should be tried.
pub trait CandidateProvider: Send + Sync + std::fmt::Debug {
    fn candidates(&self) -> Vec<String>;
}

/// Numbered device names: `prefix` followed by every index in `start..=end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedDevices {
    pub prefix: String,
    pub start: u32,
    pub end: u32,
}

impl IndexedDevices {
    pub fn new(prefix: impl Into<String>, start: u32, end: u32) -> Self {
        Self {
            prefix: prefix.into(),
            start,
            end,
        }
    }

    /// `/dev/ttyUSB0` through `/dev/ttyUSB5`.
    pub fn usb_serial() -> Self {
        Self::new("/dev/ttyUSB", 0, 5)
    }

    /// `COM0` through `COM49`.
    pub fn com_ports() -> Self {
        Self::new("COM", 0, 49)
    }
}

impl CandidateProvider for IndexedDevices {
    fn candidates(&self) -> Vec<String> {
        (self.start..=self.end)
            .map(|i| format!("{}{}", self.prefix, i))
            .collect()
    }
}

/// A fixed list of names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedPorts(pub Vec<String>);

impl CandidateProvider for NamedPorts {
    fn candidates(&self) -> Vec<String> {
        self.0.clone()
    }
}

/// Whatever the operating system currently reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumeratedPorts {
    /// Skip Bluetooth, PCI and unknown ports.
    pub usb_only: bool,
}

impl CandidateProvider for EnumeratedPorts {
    fn candidates(&self) -> Vec<String> {
        match serialport::available_ports() {
            Ok(ports) => ports
                .into_iter()
                .filter(|p| !self.usb_only || matches!(p.port_type, SerialPortType::UsbPort(_)))
                .map(|p| p.port_name)
                .collect(),
            Err(e) => {
                debug!("Port enumeration failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// Serializable description of a provider, as written in the config file.
///
/// ```toml
/// [[serial.candidates]]
/// kind = "indexed"
/// prefix = "/dev/ttyACM"
/// start = 0
/// end = 3
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CandidateSource {
    Indexed { prefix: String, start: u32, end: u32 },
    List { names: Vec<String> },
    Enumerated {
        #[serde(default)]
        usb_only: bool,
    },
}

impl CandidateSource {
    /// The scan used when nothing is configured: USB adapters, then COM ports.
    pub fn default_scan() -> Vec<CandidateSource> {
        vec![
            CandidateSource::Indexed {
                prefix: "/dev/ttyUSB".to_string(),
                start: 0,
                end: 5,
            },
            CandidateSource::Indexed {
                prefix: "COM".to_string(),
                start: 0,
                end: 49,
            },
        ]
    }

    pub fn provider(&self) -> Box<dyn CandidateProvider> {
        match self {
            Self::Indexed { prefix, start, end } => {
                Box::new(IndexedDevices::new(prefix.clone(), *start, *end))
            }
            Self::List { names } => Box::new(NamedPorts(names.clone())),
            Self::Enumerated { usb_only } => Box::new(EnumeratedPorts {
                usb_only: *usb_only,
            }),
        }
    }
}
