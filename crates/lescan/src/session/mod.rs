//! Device session
//!
//! A [`DeviceSession`] owns one controller handle and walks it through
//! `Closed -> Open -> Scanning -> Filtering` and back. The handle and the
//! filter saved at scan start live inside the state they belong to, so a
//! saved filter only exists while filtering and a handle only while open.
//!
//! Every operation returns its own `Result`. The most recent failure is also
//! kept on the session and stays readable until the session is dropped.

use crate::error::{InvalidState, ScanError, SessionError, SessionErrorKind};
use crate::gap::ScanParameters;
use crate::hci::constants::HCI_MAX_EVENT_SIZE;
use crate::hci::{Adapter, HciFilter, HciHandle, ReadStatus};
use crate::scan::{AdvertisingReport, SkipReason};
use log::{debug, error, info, warn};
use std::fmt;
use std::io;
use std::ops::ControlFlow;
use std::time::Duration;


/// Called synchronously with every failure recorded on a session
pub type ErrorHandler = Box<dyn FnMut(&SessionError) + Send + 'static>;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionState {
    Closed,
    Open,
    Scanning,
    Filtering,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::Scanning => "scanning",
            Self::Filtering => "filtering",
        };
        f.write_str(name)
    }
}

enum Link<H> {
    Closed,
    Open(H),
    Scanning(H),
    Filtering { handle: H, saved_filter: HciFilter },
}

impl<H> Link<H> {
    fn state(&self) -> SessionState {
        match self {
            Link::Closed => SessionState::Closed,
            Link::Open(_) => SessionState::Open,
            Link::Scanning(_) => SessionState::Scanning,
            Link::Filtering { .. } => SessionState::Filtering,
        }
    }

    fn handle(&self) -> Option<&H> {
        match self {
            Link::Closed => None,
            Link::Open(handle) | Link::Scanning(handle) | Link::Filtering { handle, .. } => {
                Some(handle)
            }
        }
    }

    fn handle_mut(&mut self) -> Option<&mut H> {
        match self {
            Link::Closed => None,
            Link::Open(handle) | Link::Scanning(handle) | Link::Filtering { handle, .. } => {
                Some(handle)
            }
        }
    }
}

/// Options applied when a session is opened
#[derive(Default)]
pub struct SessionOptions {
    device: Option<u16>,
    scan_parameters: ScanParameters,
    error_handler: Option<ErrorHandler>,
}

impl SessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this controller instead of the default route
    pub fn device(mut self, dev_id: u16) -> Self {
        self.device = Some(dev_id);
        self
    }

    pub fn scan_parameters(mut self, params: ScanParameters) -> Self {
        self.scan_parameters = params;
        self
    }

    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&SessionError) + Send + 'static,
    {
        self.error_handler = Some(Box::new(handler));
        self
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("device", &self.device)
            .field("scan_parameters", &self.scan_parameters)
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

/// What a [`DeviceSession::listen`] callback is handed
#[derive(Debug)]
pub enum ScanEvent<'a> {
    Report(&'a AdvertisingReport),
    /// A packet was read but it was not an advertising report
    Skipped(SkipReason),
    /// Nothing to read right now
    Idle,
}

/// Why [`DeviceSession::listen`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenExit {
    /// The callback asked to stop
    Stopped,
    /// A read was interrupted by a signal
    Interrupted,
}

/// An exclusively owned controller handle and its scan state
pub struct DeviceSession<H: HciHandle> {
    controller_id: Option<u16>,
    link: Link<H>,
    scan_parameters: ScanParameters,
    last_error: Option<SessionError>,
    error_handler: Option<ErrorHandler>,
}

impl<H: HciHandle> DeviceSession<H> {
    /// Open the controller named in `options`, or the default one
    ///
    /// Always yields a session. If the controller could not be acquired or
    /// configured the session is `Closed`, holds no handle, and
    /// [`has_error`](Self::has_error) is true.
    pub fn open<A>(adapter: &A, options: SessionOptions) -> Self
    where
        A: Adapter<Handle = H>,
    {
        let mut session = DeviceSession {
            controller_id: options.device,
            link: Link::Closed,
            scan_parameters: options.scan_parameters,
            last_error: None,
            error_handler: options.error_handler,
        };

        match session.acquire(adapter) {
            Ok(handle) => {
                info!("Opened hci{}", session.controller_id.unwrap_or_default());
                session.link = Link::Open(handle);
            }
            Err(e) => {
                session.record(e);
            }
        }

        session
    }

    /// Like [`open`](Self::open) but fails with the recorded error
    pub fn try_open<A>(adapter: &A, options: SessionOptions) -> Result<Self, SessionError>
    where
        A: Adapter<Handle = H>,
    {
        let session = Self::open(adapter, options);
        match session.last_error {
            Some(ref e) => Err(e.clone()),
            None => Ok(session),
        }
    }

    fn acquire<A>(&mut self, adapter: &A) -> Result<H, SessionError>
    where
        A: Adapter<Handle = H>,
    {
        let dev_id = match self.controller_id {
            Some(dev_id) => dev_id,
            None => adapter
                .default_route()
                .map_err(|e| SessionError::new(SessionErrorKind::AdapterUnavailable, e))?,
        };
        self.controller_id = Some(dev_id);

        let mut handle = adapter
            .open(dev_id)
            .map_err(|e| SessionError::new(SessionErrorKind::AdapterUnavailable, e))?;

        // On failure `handle` is dropped here, which releases it
        handle
            .set_nonblocking(true)
            .map_err(|e| SessionError::new(SessionErrorKind::ConfigurationFailed, e))?;

        Ok(handle)
    }

    /// Configure and enable LE scanning, then filter for LE meta events
    ///
    /// Only valid from `Open`. A failure leaves the session in the state the
    /// last successful step reached: `Open` if the controller rejected the
    /// parameters or the enable, `Scanning` if the filter could not be saved
    /// or replaced.
    pub fn start_scan(&mut self) -> Result<(), ScanError> {
        let mut handle = match std::mem::replace(&mut self.link, Link::Closed) {
            Link::Open(handle) => handle,
            other => {
                let state = other.state();
                self.link = other;
                return Err(InvalidState {
                    operation: "start scan",
                    state,
                }
                .into());
            }
        };

        let params = self.scan_parameters;

        if let Err(e) = handle.le_set_scan_parameters(&params) {
            self.link = Link::Open(handle);
            return Err(self.fail(SessionErrorKind::ScanParameterError, e));
        }

        if let Err(e) = handle.le_set_scan_enable(true, params.filter_duplicates) {
            self.link = Link::Open(handle);
            return Err(self.fail(SessionErrorKind::ScanEnableError, e));
        }

        debug!("LE scan enabled");

        let saved_filter = match handle.filter() {
            Ok(filter) => filter,
            Err(e) => {
                self.link = Link::Scanning(handle);
                return Err(self.fail(SessionErrorKind::FilterSaveError, e));
            }
        };

        if let Err(e) = handle.set_filter(&HciFilter::le_meta_events()) {
            self.link = Link::Scanning(handle);
            return Err(self.fail(SessionErrorKind::FilterInstallError, e));
        }

        debug!("Filtering for LE meta events");
        self.link = Link::Filtering {
            handle,
            saved_filter,
        };

        Ok(())
    }

    /// Restore the saved filter and disable scanning
    ///
    /// Does nothing unless the session is `Scanning` or `Filtering`. The
    /// session ends up `Open` even if the controller rejects the disable.
    pub fn stop_scan(&mut self) -> Result<(), ScanError> {
        let mut handle = match std::mem::replace(&mut self.link, Link::Closed) {
            Link::Filtering {
                mut handle,
                saved_filter,
            } => {
                if let Err(e) = handle.set_filter(&saved_filter) {
                    warn!("Failed to restore HCI filter: {}", e);
                }
                handle
            }
            Link::Scanning(handle) => handle,
            other => {
                debug!("No scan to stop while {}", other.state());
                self.link = other;
                return Ok(());
            }
        };

        let result = handle.le_set_scan_enable(false, self.scan_parameters.filter_duplicates);
        self.link = Link::Open(handle);

        match result {
            Ok(()) => {
                debug!("LE scan disabled");
                Ok(())
            }
            Err(e) => Err(self.fail(SessionErrorKind::ScanDisableError, e)),
        }
    }

    /// Release the controller handle
    ///
    /// Safe to call any number of times.
    pub fn close(&mut self) {
        let link = std::mem::replace(&mut self.link, Link::Closed);
        if link.state() != SessionState::Closed {
            debug!("Closing hci{} from {}", self.controller_id.unwrap_or_default(), link.state());
        }
    }

    /// Read one raw packet from the controller without blocking
    pub fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        match self.link.handle_mut() {
            Some(handle) => handle.read(buf),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "session is closed",
            )),
        }
    }

    /// Poll the controller and hand every packet to `handler`
    ///
    /// Reads that would block sleep for `poll_interval` before the next try.
    /// Returns when `handler` breaks, when a read is interrupted, or with the
    /// first genuine I/O error.
    pub fn listen<F>(&mut self, poll_interval: Duration, mut handler: F) -> io::Result<ListenExit>
    where
        F: FnMut(ScanEvent<'_>) -> ControlFlow<()>,
    {
        let mut buf = [0u8; HCI_MAX_EVENT_SIZE];

        loop {
            let flow = match self.read(&mut buf)? {
                ReadStatus::Data(len) => match AdvertisingReport::from_packet(&buf[..len]) {
                    Ok(report) => handler(ScanEvent::Report(&report)),
                    Err(reason) => handler(ScanEvent::Skipped(reason)),
                },
                ReadStatus::WouldBlock => {
                    let flow = handler(ScanEvent::Idle);
                    if flow.is_continue() {
                        std::thread::sleep(poll_interval);
                    }
                    flow
                }
                ReadStatus::Interrupted => return Ok(ListenExit::Interrupted),
            };

            if flow.is_break() {
                return Ok(ListenExit::Stopped);
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.link.state()
    }

    pub fn controller_id(&self) -> Option<u16> {
        self.controller_id
    }

    pub fn scan_parameters(&self) -> &ScanParameters {
        &self.scan_parameters
    }

    pub fn handle(&self) -> Option<&H> {
        self.link.handle()
    }

    /// Filter captured at scan start, present only while filtering
    pub fn saved_filter(&self) -> Option<&HciFilter> {
        match &self.link {
            Link::Filtering { saved_filter, .. } => Some(saved_filter),
            _ => None,
        }
    }

    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }

    /// Message of the last recorded failure
    pub fn error(&self) -> Option<&str> {
        self.last_error.as_ref().map(|e| e.message.as_str())
    }

    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    fn fail(&mut self, kind: SessionErrorKind, source: impl fmt::Display) -> ScanError {
        let err = SessionError::new(kind, source);
        self.record(err.clone());
        err.into()
    }

    fn record(&mut self, err: SessionError) {
        error!("{}", err);
        if let Some(handler) = self.error_handler.as_mut() {
            handler(&err);
        }
        self.last_error = Some(err);
    }
}

impl<H: HciHandle> fmt::Debug for DeviceSession<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("controller_id", &self.controller_id)
            .field("state", &self.state())
            .field("saved_filter", &self.saved_filter())
            .field("last_error", &self.last_error)
            .finish()
    }
}
