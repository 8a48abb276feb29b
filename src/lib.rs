//! Probe Harness Library
//!
//! Drives a servo-probe device under test over a serial line: sends a PWM
//! pulse width, reads back what the firmware measured, and checks both the
//! PWM readback and the derived position against tolerance windows.
//! Optionally flashes the firmware first through an external uploader.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML support
//! - `port`: Port abstraction layer for serial communication
//! - `link`: Line-oriented framing over an open port
//! - `resolver`: Port discovery and acquisition
//! - `protocol`: The PWM readback test itself
//! - `upload`: Firmware flashing through an external program
//! - `progress`: Progress line sinks
//! - `shell`: Command-line glue (blocking runs, rendering, summaries)
//! - `logging`: Tracing subscriber setup
//! - `error`: Top-level error for the binary

pub mod config;
pub mod error;
pub mod link;
pub mod logging;
pub mod port;
pub mod progress;
pub mod protocol;
pub mod resolver;
pub mod shell;
pub mod upload;

// Re-export commonly used types for convenience
pub use error::AppError;
pub use link::{DeviceLink, LinkError};
pub use port::{
    LinkSettings, MockSerialPort, PortError, PortOpener, SerialPortAdapter, SyncSerialPort,
    SystemPortOpener,
};
pub use progress::ProgressSink;
pub use protocol::{
    FailureReason, RunError, RunReport, RunState, TestProtocol, TestRequest, TestResponse,
    TestVerdict, Tolerance,
};
pub use resolver::{CandidateProvider, CandidateSource, PortResolver, ResolveError};
pub use shell::{RunSummary, SessionOutcome};
pub use upload::{CommandUploader, UploadError, Uploader};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
