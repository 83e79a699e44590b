//! lescan - Bluetooth LE advertisement scanning over raw HCI sockets
//!
//! This library opens a Bluetooth controller through a raw HCI socket on Linux,
//! puts it into LE scanning mode, filters the socket for LE meta events and
//! decodes each advertising report's EIR data into typed elements.
//!
//! ```no_run
//! use lescan::{DeviceSession, HciAdapter, ScanEvent, SessionOptions};
//! use std::ops::ControlFlow;
//! use std::time::Duration;
//!
//! let mut session = DeviceSession::open(&HciAdapter::new(), SessionOptions::new());
//! if let Some(message) = session.error() {
//!     panic!("{}", message);
//! }
//!
//! session.start_scan()?;
//! session.listen(Duration::from_micros(500), |event| {
//!     if let ScanEvent::Report(report) = event {
//!         println!("{} {:?}", report.address, report.elements);
//!     }
//!     ControlFlow::Continue(())
//! })?;
//! session.stop_scan()?;
//! session.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod gap;
pub mod hci;
pub mod scan;
pub mod session;

// Re-export common types for convenience
pub use error::{HciError, InvalidState, ScanError, SessionError, SessionErrorKind};
pub use gap::{AdFlags, AddressType, AdvertisingEventType, BdAddr, ScanParameters, ScanType};
pub use hci::{Adapter, HciAdapter, HciCommand, HciEvent, HciFilter, HciHandle, HciSocket, ReadStatus};
pub use scan::{parse_advertising_data, AdvertisingReport, EirElement, MalformedElement, SkipReason};
pub use session::{DeviceSession, ErrorHandler, ListenExit, ScanEvent, SessionOptions, SessionState};
