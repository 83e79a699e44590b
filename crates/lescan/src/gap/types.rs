use crate::gap::constants::*;
use crate::hci::HciCommand;
use bitflags::bitflags;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    Public,
    Random,
    PublicIdentity,
    RandomIdentity,
    Other(u8),
}

impl From<u8> for AddressType {
    fn from(value: u8) -> Self {
        match value {
            PUBLIC_DEVICE_ADDRESS => AddressType::Public,
            RANDOM_DEVICE_ADDRESS => AddressType::Random,
            PUBLIC_IDENTITY_ADDRESS => AddressType::PublicIdentity,
            RANDOM_IDENTITY_ADDRESS => AddressType::RandomIdentity,
            other => AddressType::Other(other),
        }
    }
}

impl From<AddressType> for u8 {
    fn from(value: AddressType) -> Self {
        match value {
            AddressType::Public => PUBLIC_DEVICE_ADDRESS,
            AddressType::Random => RANDOM_DEVICE_ADDRESS,
            AddressType::PublicIdentity => PUBLIC_IDENTITY_ADDRESS,
            AddressType::RandomIdentity => RANDOM_IDENTITY_ADDRESS,
            AddressType::Other(other) => other,
        }
    }
}

/// Bluetooth device address, stored in over-the-air (little endian) order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BdAddr {
    pub bytes: [u8; 6],
}

impl BdAddr {
    pub fn new(bytes: [u8; 6]) -> Self {
        Self { bytes }
    }

    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes = slice.get(0..6)?.try_into().ok()?;
        Some(Self { bytes })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.bytes[5],
            self.bytes[4],
            self.bytes[3],
            self.bytes[2],
            self.bytes[1],
            self.bytes[0]
        )
    }
}

/// Event type of an LE advertising report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisingEventType {
    ConnectableUndirected,
    ConnectableDirected,
    ScannableUndirected,
    NonConnectableUndirected,
    ScanResponse,
    Other(u8),
}

impl From<u8> for AdvertisingEventType {
    fn from(value: u8) -> Self {
        match value {
            ADV_IND => Self::ConnectableUndirected,
            ADV_DIRECT_IND => Self::ConnectableDirected,
            ADV_SCAN_IND => Self::ScannableUndirected,
            ADV_NONCONN_IND => Self::NonConnectableUndirected,
            SCAN_RSP => Self::ScanResponse,
            other => Self::Other(other),
        }
    }
}

impl From<AdvertisingEventType> for u8 {
    fn from(value: AdvertisingEventType) -> Self {
        match value {
            AdvertisingEventType::ConnectableUndirected => ADV_IND,
            AdvertisingEventType::ConnectableDirected => ADV_DIRECT_IND,
            AdvertisingEventType::ScannableUndirected => ADV_SCAN_IND,
            AdvertisingEventType::NonConnectableUndirected => ADV_NONCONN_IND,
            AdvertisingEventType::ScanResponse => SCAN_RSP,
            AdvertisingEventType::Other(other) => other,
        }
    }
}

bitflags! {
    /// Bits of the first octet of a Flags AD structure
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AdFlags: u8 {
        const LE_LIMITED_DISCOVERABLE = 0x01;
        const LE_GENERAL_DISCOVERABLE = 0x02;
        const BR_EDR_NOT_SUPPORTED = 0x04;
        const LE_BR_EDR_CONTROLLER = 0x08;
        const LE_BR_EDR_HOST = 0x10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    Passive,
    Active,
}

impl From<ScanType> for u8 {
    fn from(value: ScanType) -> Self {
        match value {
            ScanType::Passive => LE_SCAN_PASSIVE,
            ScanType::Active => LE_SCAN_ACTIVE,
        }
    }
}

/// LE scan configuration applied when a scan starts
///
/// Interval and window are in units of 0.625 ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanParameters {
    pub scan_type: ScanType,
    pub interval: u16,
    pub window: u16,
    pub own_address_type: AddressType,
    pub filter_policy: u8,
    pub filter_duplicates: bool,
}

impl Default for ScanParameters {
    fn default() -> Self {
        Self {
            scan_type: ScanType::Active,
            interval: LE_SCAN_INTERVAL,
            window: LE_SCAN_WINDOW,
            own_address_type: AddressType::Public,
            filter_policy: LE_SCAN_FILTER_ACCEPT_ALL,
            filter_duplicates: true,
        }
    }
}

impl ScanParameters {
    /// The LE Set Scan Parameters command for this configuration
    pub fn to_command(&self) -> HciCommand {
        HciCommand::LeSetScanParameters {
            scan_type: self.scan_type.into(),
            scan_interval: self.interval,
            scan_window: self.window,
            own_address_type: self.own_address_type.into(),
            filter_policy: self.filter_policy,
        }
    }
}
