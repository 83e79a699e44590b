//! Error types for the lescan library
//!
//! `HciError` describes what went wrong talking to the controller.
//! `SessionError` is what a device session reports to its caller: the failed
//! step plus the underlying message.

use std::fmt;
use thiserror::Error;

/// Errors that can occur when working with HCI sockets
#[derive(Error, Debug)]
pub enum HciError {
    #[error("Failed to open HCI socket: {0}")]
    SocketError(#[from] std::io::Error),

    #[error("Failed to bind to HCI device: {0}")]
    BindError(std::io::Error),

    #[error("Failed to send HCI command: {0}")]
    SendError(std::io::Error),

    #[error("Failed to receive HCI event: {0}")]
    ReceiveError(std::io::Error),

    #[error("Timed out waiting for completion of command {opcode:#06x}")]
    Timeout { opcode: u16 },

    #[error("Command {opcode:#06x} failed with status {status:#04x}")]
    CommandFailed { opcode: u16, status: u8 },

    #[error("Invalid HCI packet format")]
    InvalidPacketFormat,

    #[error("No Bluetooth adapter available")]
    NoAdapter,
}

/// The step of the session lifecycle that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionErrorKind {
    AdapterUnavailable,
    ConfigurationFailed,
    ScanParameterError,
    ScanEnableError,
    FilterSaveError,
    FilterInstallError,
    ScanDisableError,
}

impl fmt::Display for SessionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let context = match self {
            Self::AdapterUnavailable => "Could not open device",
            Self::ConfigurationFailed => "Could not set device to non-blocking",
            Self::ScanParameterError => "Failed to set scan parameters",
            Self::ScanEnableError => "Failed to enable scan",
            Self::FilterSaveError => "Could not get socket options",
            Self::FilterInstallError => "Could not set socket options",
            Self::ScanDisableError => "Disable scan failed",
        };
        f.write_str(context)
    }
}

/// A failed session operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct SessionError {
    pub kind: SessionErrorKind,
    pub message: String,
}

impl SessionError {
    pub fn new(kind: SessionErrorKind, source: impl fmt::Display) -> Self {
        Self {
            kind,
            message: source.to_string(),
        }
    }
}

/// Operation rejected because the session is in the wrong state
///
/// Never recorded as the session's last error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot {operation} while the session is {state}")]
pub struct InvalidState {
    pub operation: &'static str,
    pub state: crate::session::SessionState,
}

/// Errors returned by session operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    InvalidState(#[from] InvalidState),
}

impl ScanError {
    pub fn kind(&self) -> Option<SessionErrorKind> {
        match self {
            Self::Session(e) => Some(e.kind),
            Self::InvalidState(_) => None,
        }
    }
}
