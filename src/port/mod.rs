//! Port abstraction layer for serial communication.
//!
//! Provides the `SerialPortAdapter` trait with a real and a mock
//! implementation, plus the `PortOpener` seam used by the resolver.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::MockSerialPort;
pub use sync_port::SyncSerialPort;
pub use traits::*;
