//! HCI Socket implementation for Bluetooth communication
//!
//! This module provides a wrapper around the raw HCI socket interface,
//! allowing for communication with Bluetooth controllers.

use crate::error::HciError;
use crate::hci::constants::*;
use crate::hci::filter::HciFilter;
use crate::hci::packet::{HciCommand, HciEvent};
use crate::hci::transport::{Adapter, HciHandle, ReadStatus};
use log::{debug, trace, warn};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::{Duration, Instant};

/// Represents an HCI socket
#[derive(Debug)]
pub struct HciSocket {
    fd: RawFd,
    dev_id: Option<u16>,
}

// Define the sockaddr_hci structure
#[repr(C)]
struct SockaddrHci {
    hci_family: libc::sa_family_t,
    hci_dev: u16,
    hci_channel: u16,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct HciDevReq {
    dev_id: u16,
    dev_opt: u32,
}

#[repr(C)]
struct HciDevListReq {
    dev_num: u16,
    dev_req: [HciDevReq; HCI_MAX_DEV],
}

#[repr(C)]
#[derive(Default)]
#[allow(dead_code)]
struct HciDevInfo {
    dev_id: u16,
    name: [libc::c_char; 8],
    bdaddr: [u8; 6],
    flags: u32,
    dev_type: u8,
    features: [u8; 8],
    pkt_type: u32,
    link_policy: u32,
    link_mode: u32,
    acl_mtu: u16,
    acl_pkts: u16,
    sco_mtu: u16,
    sco_pkts: u16,
    stat: [u32; 10],
}

impl HciSocket {
    /// Gets the raw file descriptor for the socket
    pub fn as_raw_fd(&self) -> RawFd {
        self.fd
    }

    /// The controller this socket is bound to
    pub fn dev_id(&self) -> Option<u16> {
        self.dev_id
    }

    fn unbound() -> Result<Self, HciError> {
        let fd = unsafe {
            libc::socket(
                AF_BLUETOOTH,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                BTPROTO_HCI,
            )
        };

        if fd < 0 {
            return Err(HciError::SocketError(io::Error::last_os_error()));
        }

        Ok(HciSocket { fd, dev_id: None })
    }

    /// Opens a new HCI socket
    ///
    /// # Arguments
    ///
    /// * `dev_id` - The device ID to open (0 for the first device)
    ///
    /// # Returns
    ///
    /// A new `HciSocket` instance or an error if the socket could not be opened
    pub fn open(dev_id: u16) -> Result<Self, HciError> {
        let mut socket = Self::unbound()?;

        let addr = SockaddrHci {
            hci_family: AF_BLUETOOTH as libc::sa_family_t,
            hci_dev: dev_id,
            hci_channel: HCI_CHANNEL_RAW,
        };

        let result = unsafe {
            libc::bind(
                socket.fd,
                &addr as *const _ as *const libc::sockaddr,
                std::mem::size_of::<SockaddrHci>() as libc::socklen_t,
            )
        };

        // The socket is closed on drop
        if result < 0 {
            return Err(HciError::BindError(io::Error::last_os_error()));
        }

        socket.dev_id = Some(dev_id);
        debug!("Opened HCI socket {} for hci{}", socket.fd, dev_id);

        Ok(socket)
    }

    /// Switch `FIONBIO` on or off
    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        let mut on: libc::c_int = nonblocking as libc::c_int;

        if unsafe { libc::ioctl(self.fd, libc::FIONBIO, &mut on) } < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    pub fn filter(&self) -> io::Result<HciFilter> {
        let mut filter = HciFilter::default();
        let mut len = std::mem::size_of::<HciFilter>() as libc::socklen_t;

        let result = unsafe {
            libc::getsockopt(
                self.fd,
                SOL_HCI,
                HCI_FILTER,
                &mut filter as *mut HciFilter as *mut libc::c_void,
                &mut len,
            )
        };

        if result < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(filter)
    }

    pub fn set_filter(&self, filter: &HciFilter) -> io::Result<()> {
        let result = unsafe {
            libc::setsockopt(
                self.fd,
                SOL_HCI,
                HCI_FILTER,
                filter as *const HciFilter as *const libc::c_void,
                std::mem::size_of::<HciFilter>() as libc::socklen_t,
            )
        };

        if result < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Read one raw packet into `buf`
    pub fn read(&self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        let bytes_read =
            unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };

        if bytes_read < 0 {
            return ReadStatus::from_io_error(io::Error::last_os_error());
        }

        Ok(ReadStatus::Data(bytes_read as usize))
    }

    /// Read an HCI event from the socket
    pub fn read_event(&self) -> Result<HciEvent, HciError> {
        let mut buffer = [0u8; HCI_MAX_EVENT_SIZE];

        let bytes_read = unsafe {
            libc::read(
                self.fd,
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len(),
            )
        };

        if bytes_read < 0 {
            return Err(HciError::ReceiveError(io::Error::last_os_error()));
        }

        let bytes_read = bytes_read as usize;
        if bytes_read < 1 + HCI_EVENT_HDR_SIZE || buffer[0] != HCI_EVENT_PKT {
            return Err(HciError::InvalidPacketFormat);
        }

        HciEvent::parse(&buffer[1..bytes_read]).ok_or(HciError::InvalidPacketFormat)
    }

    /// Wait until the socket is readable. `Ok(false)` means the timeout expired.
    fn wait_readable(&self, timeout: Duration) -> Result<bool, HciError> {
        let mut read_fds: libc::fd_set = unsafe { std::mem::zeroed() };
        unsafe {
            libc::FD_ZERO(&mut read_fds);
            libc::FD_SET(self.fd, &mut read_fds);
        }

        let mut timeout_val = libc::timeval {
            tv_sec: timeout.as_secs() as libc::time_t,
            tv_usec: timeout.subsec_micros() as libc::suseconds_t,
        };

        let result = unsafe {
            libc::select(
                self.fd + 1,
                &mut read_fds,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                &mut timeout_val,
            )
        };

        if result < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(true);
            }
            return Err(HciError::ReceiveError(err));
        }

        Ok(result > 0)
    }

    /// Sends an HCI command to the controller
    pub fn send_command(&self, command: &HciCommand) -> Result<(), HciError> {
        let packet = command.to_packet();
        match unsafe {
            libc::write(
                self.fd,
                packet.as_ptr() as *const libc::c_void,
                packet.len(),
            )
        } {
            -1 => Err(HciError::SendError(io::Error::last_os_error())),
            _ => Ok(()),
        }
    }

    /// Send `command` and wait for the matching Command Complete event
    ///
    /// The socket filter is narrowed to completion events for the duration of
    /// the request and put back afterwards.
    pub fn send_request(
        &self,
        command: &HciCommand,
        timeout: Duration,
    ) -> Result<HciEvent, HciError> {
        let opcode = command.opcode();
        let previous = self.filter()?;

        self.set_filter(&HciFilter::command_completion(opcode))?;

        let result = self
            .send_command(command)
            .and_then(|_| self.await_completion(opcode, timeout));

        if let Err(e) = self.set_filter(&previous) {
            warn!("Failed to restore HCI filter after command {:#06x}: {}", opcode, e);
        }

        result
    }

    fn await_completion(&self, opcode: u16, timeout: Duration) -> Result<HciEvent, HciError> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !self.wait_readable(remaining)? {
                return Err(HciError::Timeout { opcode });
            }

            let event = match self.read_event() {
                Ok(event) => event,
                Err(HciError::ReceiveError(e))
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                    ) =>
                {
                    continue
                }
                Err(HciError::InvalidPacketFormat) => continue,
                Err(e) => return Err(e),
            };

            if event.command_opcode() != Some(opcode) {
                trace!("Ignoring event {:#04x} while waiting for {:#06x}", event.event_code, opcode);
                continue;
            }

            match (event.event_code, event.get_status()) {
                (_, None) => return Err(HciError::InvalidPacketFormat),
                // Pending; the Command Complete follows
                (EVT_CMD_STATUS, Some(0)) => continue,
                (_, Some(0)) => return Ok(event),
                (_, Some(status)) => return Err(HciError::CommandFailed { opcode, status }),
            }
        }
    }
}

impl AsRawFd for HciSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for HciSocket {
    fn drop(&mut self) {
        if unsafe { libc::close(self.fd) } < 0 {
            warn!("Failed to close HCI socket {}: {}", self.fd, io::Error::last_os_error());
        }
    }
}

impl HciHandle for HciSocket {
    fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
        HciSocket::set_nonblocking(self, nonblocking)
    }

    fn send_request(&mut self, command: &HciCommand, timeout: Duration) -> Result<HciEvent, HciError> {
        HciSocket::send_request(self, command, timeout)
    }

    fn filter(&self) -> io::Result<HciFilter> {
        HciSocket::filter(self)
    }

    fn set_filter(&mut self, filter: &HciFilter) -> io::Result<()> {
        HciSocket::set_filter(self, filter)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        HciSocket::read(self, buf)
    }
}

/// The host's Bluetooth controllers, reached through raw HCI sockets
#[derive(Debug, Default, Clone, Copy)]
pub struct HciAdapter;

impl HciAdapter {
    pub fn new() -> Self {
        HciAdapter
    }
}

impl Adapter for HciAdapter {
    type Handle = HciSocket;

    /// First controller that is up, configured and has an address
    fn default_route(&self) -> Result<u16, HciError> {
        let control = HciSocket::unbound()?;

        let mut list = HciDevListReq {
            dev_num: HCI_MAX_DEV as u16,
            dev_req: [HciDevReq::default(); HCI_MAX_DEV],
        };

        let result = unsafe {
            libc::ioctl(
                control.fd,
                HCIGETDEVLIST as _,
                &mut list as *mut HciDevListReq as *mut libc::c_void,
            )
        };

        if result < 0 {
            return Err(HciError::SocketError(io::Error::last_os_error()));
        }

        let count = (list.dev_num as usize).min(HCI_MAX_DEV);

        for req in &list.dev_req[..count] {
            if req.dev_opt & (1 << HCI_UP) == 0 {
                continue;
            }

            let mut info = HciDevInfo {
                dev_id: req.dev_id,
                ..Default::default()
            };

            let result = unsafe {
                libc::ioctl(
                    control.fd,
                    HCIGETDEVINFO as _,
                    &mut info as *mut HciDevInfo as *mut libc::c_void,
                )
            };

            if result < 0 || info.flags & (1 << HCI_RAW) != 0 || info.bdaddr == [0u8; 6] {
                continue;
            }

            debug!("Default route is hci{}", req.dev_id);
            return Ok(req.dev_id);
        }

        Err(HciError::NoAdapter)
    }

    fn open(&self, dev_id: u16) -> Result<HciSocket, HciError> {
        HciSocket::open(dev_id)
    }
}
