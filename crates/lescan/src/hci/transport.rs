//! Controller transport abstraction
//!
//! The device session drives the controller only through these traits. The
//! Linux raw socket implementation lives in [`crate::hci::socket`].

use crate::error::HciError;
use crate::gap::ScanParameters;
use crate::hci::constants::HCI_COMMAND_TIMEOUT;
use crate::hci::filter::HciFilter;
use crate::hci::packet::{HciCommand, HciEvent};
use std::io;
use std::time::Duration;

/// Outcome of a non-blocking read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// This many bytes were written into the buffer
    Data(usize),
    /// Nothing to read yet, try again later
    WouldBlock,
    /// The read was interrupted by a signal
    Interrupted,
}

impl ReadStatus {
    /// Sort a failed read into loop control or a genuine I/O failure
    pub fn from_io_error(err: io::Error) -> io::Result<Self> {
        match err.kind() {
            io::ErrorKind::WouldBlock => Ok(ReadStatus::WouldBlock),
            io::ErrorKind::Interrupted => Ok(ReadStatus::Interrupted),
            _ => Err(err),
        }
    }
}

/// Locates and opens controllers
pub trait Adapter {
    type Handle: HciHandle;

    /// Id of the controller to use when the caller has no preference
    fn default_route(&self) -> Result<u16, HciError>;

    /// Open a raw handle bound to the controller
    fn open(&self, dev_id: u16) -> Result<Self::Handle, HciError>;
}

/// An open controller handle
///
/// Dropping the handle releases it.
pub trait HciHandle {
    fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()>;

    /// Send a command and wait for its completion event
    fn send_request(&mut self, command: &HciCommand, timeout: Duration) -> Result<HciEvent, HciError>;

    /// Current socket filter
    fn filter(&self) -> io::Result<HciFilter>;

    fn set_filter(&mut self, filter: &HciFilter) -> io::Result<()>;

    /// Read one raw packet, packet indicator included
    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus>;

    fn le_set_scan_parameters(&mut self, params: &ScanParameters) -> Result<(), HciError> {
        self.send_request(&params.to_command(), HCI_COMMAND_TIMEOUT)
            .map(|_| ())
    }

    fn le_set_scan_enable(&mut self, enable: bool, filter_duplicates: bool) -> Result<(), HciError> {
        let command = HciCommand::LeSetScanEnable {
            enable,
            filter_duplicates,
        };
        self.send_request(&command, HCI_COMMAND_TIMEOUT).map(|_| ())
    }
}
