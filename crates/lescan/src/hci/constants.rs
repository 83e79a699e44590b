//! HCI protocol constants
//!
//! This module contains constants used in the Bluetooth HCI protocol and the
//! Linux `AF_BLUETOOTH` socket interface.

use std::time::Duration;

// HCI packet types
pub const HCI_COMMAND_PKT: u8 = 0x01;
pub const HCI_EVENT_PKT: u8 = 0x04;
pub const HCI_VENDOR_PKT: u8 = 0xFF;

// Event code and parameter total length
pub const HCI_EVENT_HDR_SIZE: usize = 2;
pub const HCI_MAX_EVENT_SIZE: usize = 260;

// Every control command waits this long for its completion event
pub const HCI_COMMAND_TIMEOUT: Duration = Duration::from_millis(1000);

// Common OGF (Opcode Group Field) values
pub const OGF_LE: u8 = 0x08;

// LE Command OCF values (OGF: 0x08)
pub const OCF_LE_SET_SCAN_PARAMETERS: u16 = 0x000B;
pub const OCF_LE_SET_SCAN_ENABLE: u16 = 0x000C;

// HCI Events
pub const EVT_CMD_COMPLETE: u8 = 0x0E;
pub const EVT_CMD_STATUS: u8 = 0x0F;
pub const EVT_LE_META_EVENT: u8 = 0x3E;

// LE Meta Events
pub const EVT_LE_CONN_COMPLETE: u8 = 0x01;
pub const EVT_LE_ADVERTISING_REPORT: u8 = 0x02;

// Socket layer (linux/include/net/bluetooth/hci_sock.h)
pub const AF_BLUETOOTH: i32 = 31;
pub const BTPROTO_HCI: i32 = 1;
pub const SOL_HCI: i32 = 0;
pub const HCI_FILTER: i32 = 2;
pub const HCI_CHANNEL_RAW: u16 = 0;

pub const HCI_FLT_TYPE_BITS: u8 = 31;
pub const HCI_FLT_EVENT_BITS: u8 = 63;

// Device ioctls, `_IOR('H', nr, int)`
pub const HCIGETDEVLIST: libc::c_ulong = ior_int(210);
pub const HCIGETDEVINFO: libc::c_ulong = ior_int(211);

pub const HCI_MAX_DEV: usize = 16;

// Bits of `hci_dev_info.flags`
pub const HCI_UP: u32 = 0;
pub const HCI_RAW: u32 = 6;

const fn ior_int(nr: libc::c_ulong) -> libc::c_ulong {
    const IOC_READ: libc::c_ulong = 2;
    (IOC_READ << 30)
        | ((std::mem::size_of::<libc::c_int>() as libc::c_ulong) << 16)
        | ((b'H' as libc::c_ulong) << 8)
        | nr
}
