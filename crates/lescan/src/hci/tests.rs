//! Unit tests for HCI packet parsing and serialization

use super::constants::*;
use super::filter::*;
use super::packet::*;
use super::transport::ReadStatus;
use std::io;

#[test]
fn test_hci_command_serialization() {
    // Test LE Set Scan Parameters command
    let command = HciCommand::LeSetScanParameters {
        scan_type: 0x01,
        scan_interval: 0x0010,
        scan_window: 0x0010,
        own_address_type: 0x00,
        filter_policy: 0x00,
    };

    let packet = command.to_packet();

    assert_eq!(packet[0], HCI_COMMAND_PKT);

    // Opcode: LE Set Scan Parameters (0x000B)
    let opcode = u16::from_le_bytes([packet[1], packet[2]]);
    assert_eq!(opcode, 0x200B); // OGF_LE << 10 | OCF_LE_SET_SCAN_PARAMETERS
    assert_eq!(command.opcode(), 0x200B);

    // Param length: 7
    assert_eq!(packet[3], 7);
    assert_eq!(packet.len(), 4 + 7);

    // Parameters
    assert_eq!(packet[4], 0x01); // scan_type
    assert_eq!(u16::from_le_bytes([packet[5], packet[6]]), 0x0010); // scan_interval
    assert_eq!(u16::from_le_bytes([packet[7], packet[8]]), 0x0010); // scan_window
    assert_eq!(packet[9], 0x00); // own_address_type
    assert_eq!(packet[10], 0x00); // filter_policy

    // Test LE Set Scan Enable command
    let command = HciCommand::LeSetScanEnable {
        enable: true,
        filter_duplicates: false,
    };

    let packet = command.to_packet();

    assert_eq!(packet, vec![HCI_COMMAND_PKT, 0x0C, 0x20, 2, 0x01, 0x00]);
    assert_eq!(command.opcode_parts(), (OGF_LE, OCF_LE_SET_SCAN_ENABLE));
}

#[test]
fn test_scan_interval_is_little_endian() {
    let command = HciCommand::LeSetScanParameters {
        scan_type: 0x00,
        scan_interval: 0x1234,
        scan_window: 0x0102,
        own_address_type: 0x01,
        filter_policy: 0x02,
    };

    assert_eq!(
        command.to_packet()[4..],
        [0x00, 0x34, 0x12, 0x02, 0x01, 0x01, 0x02]
    );
}

#[test]
fn test_hci_event_parsing() {
    // Command Complete for LE Set Scan Enable
    let data = [
        EVT_CMD_COMPLETE, // Event code
        4,                // Parameter length
        1,                // Num_HCI_Command_Packets
        0x0C,             // Command_Opcode (low byte)
        0x20,             // Command_Opcode (high byte)
        0x00,             // Status
    ];

    let event = HciEvent::parse(&data).unwrap();

    assert_eq!(event.event_code, EVT_CMD_COMPLETE);
    assert_eq!(event.parameter_total_length, 4);
    assert_eq!(event.get_parameters(), &[1, 0x0C, 0x20, 0x00]);

    assert!(event.is_command_complete(OGF_LE, OCF_LE_SET_SCAN_ENABLE));
    assert!(!event.is_command_complete(OGF_LE, OCF_LE_SET_SCAN_PARAMETERS));
    assert_eq!(event.command_opcode(), Some(0x200C));
    assert_eq!(event.get_status(), Some(0x00));

    // Command Status carries the status first
    let data = [EVT_CMD_STATUS, 4, 0x0C, 1, 0x0B, 0x20];
    let event = HciEvent::parse(&data).unwrap();

    assert_eq!(event.command_opcode(), Some(0x200B));
    assert_eq!(event.get_status(), Some(0x0C));
    assert!(!event.is_command_complete(OGF_LE, OCF_LE_SET_SCAN_PARAMETERS));

    // Trailing bytes past the declared length are ignored
    let data = [EVT_LE_META_EVENT, 1, EVT_LE_CONN_COMPLETE, 0xAA, 0xBB];
    let event = HciEvent::parse(&data).unwrap();
    assert_eq!(event.parameters, vec![EVT_LE_CONN_COMPLETE]);
    assert_eq!(event.command_opcode(), None);
    assert_eq!(event.get_status(), None);

    // Invalid data tests
    assert!(HciEvent::parse(&[]).is_none()); // Empty data
    assert!(HciEvent::parse(&[EVT_CMD_COMPLETE]).is_none()); // No length byte
    assert!(HciEvent::parse(&[EVT_CMD_COMPLETE, 10, 1, 2]).is_none()); // Too short for parameter length
}

#[test]
fn test_le_meta_filter() {
    let filter = HciFilter::le_meta_events();

    assert_eq!(filter.type_mask, 1 << HCI_EVENT_PKT);
    // 0x3E is bit 30 of the second word
    assert_eq!(filter.event_mask, [0, 1 << 30]);
    assert_eq!(filter.opcode, 0);

    assert!(filter.has_ptype(HCI_EVENT_PKT));
    assert!(!filter.has_ptype(HCI_COMMAND_PKT));
    assert!(filter.has_event(EVT_LE_META_EVENT));
    assert!(!filter.has_event(EVT_CMD_COMPLETE));
}

#[test]
fn test_command_completion_filter() {
    let filter = HciFilter::command_completion(0x200C);

    assert!(filter.has_ptype(HCI_EVENT_PKT));
    assert!(filter.has_event(EVT_CMD_COMPLETE));
    assert!(filter.has_event(EVT_CMD_STATUS));
    assert!(!filter.has_event(EVT_LE_META_EVENT));
    assert_eq!(u16::from_le(filter.opcode), 0x200C);

    let mut filter = filter;
    filter.clear();
    assert_eq!(filter, HciFilter::new());
}

#[test]
fn test_vendor_packets_use_bit_zero() {
    let mut filter = HciFilter::new();
    filter.set_ptype(HCI_VENDOR_PKT);

    assert_eq!(filter.type_mask, 1);
    assert!(filter.has_ptype(HCI_VENDOR_PKT));
}

#[test]
fn test_filter_matches_kernel_layout() {
    // struct hci_filter { u32 type_mask; u32 event_mask[2]; u16 opcode; }
    assert_eq!(std::mem::size_of::<HciFilter>(), 16);
}

#[test]
fn test_read_status_from_io_error() {
    let would_block = io::Error::from(io::ErrorKind::WouldBlock);
    assert_eq!(
        ReadStatus::from_io_error(would_block).unwrap(),
        ReadStatus::WouldBlock
    );

    let interrupted = io::Error::from(io::ErrorKind::Interrupted);
    assert_eq!(
        ReadStatus::from_io_error(interrupted).unwrap(),
        ReadStatus::Interrupted
    );

    let broken = io::Error::from(io::ErrorKind::BrokenPipe);
    assert_eq!(
        ReadStatus::from_io_error(broken).unwrap_err().kind(),
        io::ErrorKind::BrokenPipe
    );
}

#[test]
fn test_device_ioctl_numbers() {
    // _IOR('H', 210, int) and _IOR('H', 211, int)
    assert_eq!(HCIGETDEVLIST, 0x800448D2);
    assert_eq!(HCIGETDEVINFO, 0x800448D3);
}
