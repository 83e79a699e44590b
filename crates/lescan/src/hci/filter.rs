//! HCI socket filter
//!
//! A raw HCI socket only delivers the packets its filter lets through. The
//! filter is per-socket state, so anything that changes it is expected to put
//! the previous value back when it is done.

use crate::hci::constants::*;

/// `struct hci_filter` as exchanged through `SOL_HCI`/`HCI_FILTER`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HciFilter {
    pub type_mask: u32,
    pub event_mask: [u32; 2],
    pub opcode: u16,
}

impl HciFilter {
    /// A filter that passes nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Only HCI event packets carrying an LE meta event
    pub fn le_meta_events() -> Self {
        let mut filter = Self::new();
        filter.set_ptype(HCI_EVENT_PKT);
        filter.set_event(EVT_LE_META_EVENT);
        filter
    }

    /// Only the completion events of the command with the given opcode
    pub fn command_completion(opcode: u16) -> Self {
        let mut filter = Self::new();
        filter.set_ptype(HCI_EVENT_PKT);
        filter.set_event(EVT_CMD_COMPLETE);
        filter.set_event(EVT_CMD_STATUS);
        filter.set_opcode(opcode);
        filter
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn set_ptype(&mut self, packet_type: u8) {
        let bit = if packet_type == HCI_VENDOR_PKT {
            0
        } else {
            packet_type & HCI_FLT_TYPE_BITS
        };
        self.type_mask |= 1 << bit;
    }

    pub fn has_ptype(&self, packet_type: u8) -> bool {
        let bit = if packet_type == HCI_VENDOR_PKT {
            0
        } else {
            packet_type & HCI_FLT_TYPE_BITS
        };
        self.type_mask & (1 << bit) != 0
    }

    pub fn set_event(&mut self, event: u8) {
        let bit = event & HCI_FLT_EVENT_BITS;
        self.event_mask[(bit >> 5) as usize] |= 1 << (bit & 31);
    }

    pub fn has_event(&self, event: u8) -> bool {
        let bit = event & HCI_FLT_EVENT_BITS;
        self.event_mask[(bit >> 5) as usize] & (1 << (bit & 31)) != 0
    }

    pub fn set_opcode(&mut self, opcode: u16) {
        self.opcode = opcode.to_le();
    }
}
