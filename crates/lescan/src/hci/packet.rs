//! HCI packet structures and parsing
//!
//! This module contains the commands the scanner sends to the controller and
//! the generic event framing it reads back.

use crate::hci::constants::*;
use byteorder::{ByteOrder, LittleEndian};

/// HCI commands issued by the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HciCommand {
    LeSetScanParameters {
        scan_type: u8,
        scan_interval: u16,
        scan_window: u16,
        own_address_type: u8,
        filter_policy: u8,
    },
    LeSetScanEnable { enable: bool, filter_duplicates: bool },
}

/// Build an opcode from its group and command fields
pub fn opcode(ogf: u8, ocf: u16) -> u16 {
    ((ogf as u16) << 10) | (ocf & 0x3ff)
}

impl HciCommand {
    /// Get the OGF and OCF for this command
    pub fn opcode_parts(&self) -> (u8, u16) {
        match self {
            Self::LeSetScanParameters { .. } => (OGF_LE, OCF_LE_SET_SCAN_PARAMETERS),
            Self::LeSetScanEnable { .. } => (OGF_LE, OCF_LE_SET_SCAN_ENABLE),
        }
    }

    /// The packed 16 bit opcode
    pub fn opcode(&self) -> u16 {
        let (ogf, ocf) = self.opcode_parts();
        opcode(ogf, ocf)
    }

    /// Convert the command to its raw parameter bytes
    fn parameters(&self) -> Vec<u8> {
        match *self {
            Self::LeSetScanParameters {
                scan_type,
                scan_interval,
                scan_window,
                own_address_type,
                filter_policy,
            } => {
                let mut params = vec![0u8; 7];
                params[0] = scan_type;
                LittleEndian::write_u16(&mut params[1..3], scan_interval);
                LittleEndian::write_u16(&mut params[3..5], scan_window);
                params[5] = own_address_type;
                params[6] = filter_policy;
                params
            }

            Self::LeSetScanEnable {
                enable,
                filter_duplicates,
            } => vec![enable as u8, filter_duplicates as u8],
        }
    }

    /// Convert the command to a raw HCI packet
    pub fn to_packet(&self) -> Vec<u8> {
        let params = self.parameters();

        let mut packet = vec![HCI_COMMAND_PKT, 0, 0];
        LittleEndian::write_u16(&mut packet[1..3], self.opcode());
        packet.push(params.len() as u8);
        packet.extend_from_slice(&params);
        packet
    }
}

/// HCI Event packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HciEvent {
    pub event_code: u8,
    pub parameter_total_length: u8,
    pub parameters: Vec<u8>,
}

impl HciEvent {
    /// Parse an HCI event from raw bytes (packet indicator already stripped)
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < HCI_EVENT_HDR_SIZE {
            return None;
        }

        let event_code = data[0];
        let parameter_total_length = data[1];
        let end = HCI_EVENT_HDR_SIZE + parameter_total_length as usize;

        let parameters = data.get(HCI_EVENT_HDR_SIZE..end)?.to_vec();

        Some(HciEvent {
            event_code,
            parameter_total_length,
            parameters,
        })
    }

    pub fn get_parameters(&self) -> &[u8] {
        &self.parameters
    }

    /// The opcode a Command Complete or Command Status event refers to
    pub fn command_opcode(&self) -> Option<u16> {
        let raw = match self.event_code {
            EVT_CMD_COMPLETE => self.parameters.get(1..3)?,
            EVT_CMD_STATUS => self.parameters.get(2..4)?,
            _ => return None,
        };

        Some(LittleEndian::read_u16(raw))
    }

    /// The status byte of a Command Complete or Command Status event
    pub fn get_status(&self) -> Option<u8> {
        match self.event_code {
            EVT_CMD_COMPLETE => self.parameters.get(3).copied(),
            EVT_CMD_STATUS => self.parameters.first().copied(),
            _ => None,
        }
    }

    pub fn is_command_complete(&self, ogf: u8, ocf: u16) -> bool {
        self.event_code == EVT_CMD_COMPLETE && self.command_opcode() == Some(opcode(ogf, ocf))
    }
}
