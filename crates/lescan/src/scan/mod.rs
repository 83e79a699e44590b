//! LE advertising report parsing
//!
//! Decodes one raw HCI event buffer into an [`AdvertisingReport`]:
//! packet indicator, event header, LE meta subevent, the first advertising
//! info block and finally its EIR/AD elements. Every length byte is checked
//! against the bytes that are actually present before it is used.

use crate::gap::constants::*;
use crate::gap::{AdFlags, AddressType, AdvertisingEventType, BdAddr};
use crate::hci::constants::*;
use crate::hci::HciEvent;
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};
use std::fmt;
use thiserror::Error;

/// One decoded EIR/AD element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EirElement {
    Flags(Vec<u8>),
    NameShort(String),
    NameComplete(String),
    ManufacturerSpecific(Vec<u8>),
    Unknown(u8, Vec<u8>),
}

impl EirElement {
    /// Decode the data of an element of the given AD type
    pub fn decode(ad_type: u8, data: &[u8]) -> Self {
        match ad_type {
            ADV_TYPE_FLAGS => Self::Flags(data.to_vec()),
            ADV_TYPE_SHORT_LOCAL_NAME => Self::NameShort(String::from_utf8_lossy(data).into_owned()),
            ADV_TYPE_COMPLETE_LOCAL_NAME => {
                Self::NameComplete(String::from_utf8_lossy(data).into_owned())
            }
            ADV_TYPE_MANUFACTURER_SPECIFIC => Self::ManufacturerSpecific(data.to_vec()),
            other => Self::Unknown(other, data.to_vec()),
        }
    }

    pub fn ad_type(&self) -> u8 {
        match self {
            Self::Flags(_) => ADV_TYPE_FLAGS,
            Self::NameShort(_) => ADV_TYPE_SHORT_LOCAL_NAME,
            Self::NameComplete(_) => ADV_TYPE_COMPLETE_LOCAL_NAME,
            Self::ManufacturerSpecific(_) => ADV_TYPE_MANUFACTURER_SPECIFIC,
            Self::Unknown(ad_type, _) => *ad_type,
        }
    }

    /// Element data as it appeared on the wire
    pub fn data(&self) -> &[u8] {
        match self {
            Self::Flags(data) | Self::ManufacturerSpecific(data) | Self::Unknown(_, data) => data,
            Self::NameShort(name) | Self::NameComplete(name) => name.as_bytes(),
        }
    }

    /// The flag bits of a Flags element. Undefined bits are dropped.
    pub fn flags(&self) -> Option<AdFlags> {
        match self {
            Self::Flags(data) => data.first().map(|&b| AdFlags::from_bits_truncate(b)),
            _ => None,
        }
    }

    /// Company identifier leading a manufacturer specific element
    pub fn company_id(&self) -> Option<u16> {
        match self {
            Self::ManufacturerSpecific(data) if data.len() >= 2 => {
                Some(LittleEndian::read_u16(&data[..2]))
            }
            _ => None,
        }
    }
}

impl fmt::Display for EirElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flags(data) => {
                write!(f, "flags={}", hex::encode(data))?;
                if let Some(flags) = self.flags() {
                    write!(f, " {:?}", flags)?;
                }
                Ok(())
            }
            Self::NameShort(name) => write!(f, "short name={}", name),
            Self::NameComplete(name) => write!(f, "name={}", name),
            Self::ManufacturerSpecific(data) => match self.company_id() {
                Some(company) => write!(
                    f,
                    "manufacturer={:#06x} data={}",
                    company,
                    hex::encode(&data[2..])
                ),
                None => write!(f, "manufacturer data={}", hex::encode(data)),
            },
            Self::Unknown(ad_type, data) => {
                write!(f, "type={:#04x} data={}", ad_type, hex::encode(data))
            }
        }
    }
}

/// Element whose declared length runs past the end of the advertising data
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("EIR element at offset {offset} declares {length} + 1 bytes but only {remaining} remain")]
pub struct MalformedElement {
    pub offset: usize,
    pub length: u8,
    pub remaining: usize,
}

/// Why a buffer did not produce a report
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    #[error("empty buffer")]
    Empty,

    #[error("packet type {0:#04x} is not an HCI event")]
    NotAnEvent(u8),

    #[error("event header or parameters truncated")]
    Truncated,

    #[error("event {0:#04x} is not an LE meta event")]
    NotLeMeta(u8),

    #[error("LE subevent {0:#04x} is not an advertising report")]
    OtherSubevent(u8),

    #[error("advertising report event carries no reports")]
    NoReports,

    #[error("advertising report has no data")]
    EmptyReport,
}

/// LE Advertising Report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingReport {
    pub event_type: u8,
    pub address_type: AddressType,
    pub address: BdAddr,
    pub elements: Vec<EirElement>,
    /// Set when the element walk stopped early on a bad length
    pub malformed: Option<MalformedElement>,
    pub rssi: Option<i8>,
}

impl AdvertisingReport {
    /// Parse the report carried by an LE Advertising Report subevent
    ///
    /// `data` starts at the Num_Reports byte, right after the subevent code.
    /// Only the first report is decoded.
    pub fn parse(data: &[u8]) -> Result<Self, SkipReason> {
        let (&num_reports, rest) = data.split_first().ok_or(SkipReason::Truncated)?;

        if num_reports == 0 {
            return Err(SkipReason::NoReports);
        }
        if num_reports > 1 {
            debug!("Decoding 1 of {} reports in the event", num_reports);
        }

        let [event_type, address_type, rest @ ..] = rest else {
            return Err(SkipReason::Truncated);
        };

        let address = BdAddr::from_slice(rest).ok_or(SkipReason::Truncated)?;
        let length = *rest.get(6).ok_or(SkipReason::Truncated)? as usize;
        let payload = &rest[7..];

        if length == 0 {
            return Err(SkipReason::EmptyReport);
        }

        if length > payload.len() {
            debug!(
                "Advertising data declares {} bytes but the buffer holds {}",
                length,
                payload.len()
            );
        }

        let available = length.min(payload.len());
        let (elements, malformed) = parse_advertising_data(&payload[..available]);

        Ok(AdvertisingReport {
            event_type: *event_type,
            address_type: AddressType::from(*address_type),
            address,
            elements,
            malformed,
            rssi: payload.get(length).map(|&b| b as i8),
        })
    }

    /// Parse a raw buffer as read from the HCI socket, packet indicator first
    pub fn from_packet(buf: &[u8]) -> Result<Self, SkipReason> {
        let (&indicator, rest) = buf.split_first().ok_or(SkipReason::Empty)?;

        if indicator != HCI_EVENT_PKT {
            return Err(SkipReason::NotAnEvent(indicator));
        }

        let event = HciEvent::parse(rest).ok_or(SkipReason::Truncated)?;

        Self::from_event(&event)
    }

    /// Parse the report carried by an HCI LE Meta Event
    pub fn from_event(event: &HciEvent) -> Result<Self, SkipReason> {
        if event.event_code != EVT_LE_META_EVENT {
            return Err(SkipReason::NotLeMeta(event.event_code));
        }

        let (&subevent, data) = event
            .parameters
            .split_first()
            .ok_or(SkipReason::Truncated)?;

        if subevent != EVT_LE_ADVERTISING_REPORT {
            return Err(SkipReason::OtherSubevent(subevent));
        }

        Self::parse(data)
    }

    pub fn kind(&self) -> AdvertisingEventType {
        AdvertisingEventType::from(self.event_type)
    }

    /// The complete local name, or the shortened one if that is all there is
    pub fn name(&self) -> Option<&str> {
        let mut short = None;
        for element in &self.elements {
            match element {
                EirElement::NameComplete(name) => return Some(name.as_str()),
                EirElement::NameShort(name) => short = short.or(Some(name.as_str())),
                _ => {}
            }
        }
        short
    }
}

/// Walk EIR/AD elements
///
/// Each element is a length byte `L`, a type byte and `L - 1` data bytes.
/// The walk stops at a zero length (end of significant data) or at the first
/// element whose `L + 1` bytes do not fit in what remains; everything decoded
/// before that point is returned.
pub fn parse_advertising_data(data: &[u8]) -> (Vec<EirElement>, Option<MalformedElement>) {
    let mut elements = Vec::new();
    let mut cursor = 0;

    while cursor < data.len() {
        let length = data[cursor];
        if length == 0 {
            break;
        }

        let remaining = data.len() - cursor;
        if length as usize + 1 > remaining {
            let malformed = MalformedElement {
                offset: cursor,
                length,
                remaining,
            };
            debug!("{}", malformed);
            return (elements, Some(malformed));
        }

        let ad_type = data[cursor + 1];
        let element = EirElement::decode(ad_type, &data[cursor + 2..cursor + 1 + length as usize]);
        trace!("EIR element at {}: {}", cursor, element);
        elements.push(element);

        cursor += length as usize + 1;
    }

    (elements, None)
}
