//! # Aurora Frame Codec
//!
//! Builds request frames and validates/decodes response frames for the
//! Aurora RTU dialect. Everything here is a pure function: malformed input
//! yields an empty result or `false`, never an error. Deciding what to do
//! with a bad frame is the driver's job.
//!
//! ## Frame Layout
//!
//! ```text
//! [unit=0x01][function][payload...][crc_lo][crc_hi]
//! ```
//!
//! ## Function Codes
//!
//! | Code | Function | Request payload |
//! |------|----------|-----------------|
//! | 0x06 | Write Single Register | address, value |
//! | 0x41 | Read Ranges | (start, count) per range |
//! | 0x42 | Read Registers | address per entry |
//! | 0x43 | Write Registers | (address, value) per entry |
//!
//! All 16-bit payload fields are big-endian; the CRC trailer is little-endian.

use crate::constants::{
    CRC_LEN, ERROR_FLAG, ERROR_RESPONSE_LEN, FC_READ_RANGES, FC_READ_REGISTERS, FC_WRITE_REGISTERS,
    FC_WRITE_SINGLE, MIN_FRAME_SIZE, RESPONSE_PREFIX_LEN, UNIT_ADDRESS, WRITE_REGISTERS_RESPONSE_LEN,
    WRITE_SINGLE_RESPONSE_LEN,
};

/// A contiguous block of registers: `count` addresses starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterRange {
    pub start: u16,
    pub count: u16,
}

impl RegisterRange {
    #[inline]
    pub const fn new(start: u16, count: u16) -> Self {
        Self { start, count }
    }

    /// Addresses covered by this range, in ascending order.
    #[inline]
    pub fn addresses(&self) -> impl Iterator<Item = u16> {
        let start = self.start;
        (0..self.count).map(move |i| start.wrapping_add(i))
    }
}

// ============================================================================
// CRC
// ============================================================================

/// CRC16/MODBUS computed bit by bit (reflected polynomial 0xA001, init 0xFFFF).
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Check the trailing CRC (low byte first) against the preceding bytes.
pub fn validate_frame_crc(frame: &[u8]) -> bool {
    if frame.len() < MIN_FRAME_SIZE {
        return false;
    }
    let split = frame.len() - CRC_LEN;
    let received = u16::from_le_bytes([frame[split], frame[split + 1]]);
    crc16(&frame[..split]) == received
}

// ============================================================================
// Request Builders
// ============================================================================

fn start_frame(function_code: u8, payload_len: usize) -> Vec<u8> {
    let mut frame = Vec::with_capacity(2 + payload_len + CRC_LEN);
    frame.push(UNIT_ADDRESS);
    frame.push(function_code);
    frame
}

fn finish_frame(mut frame: Vec<u8>) -> Vec<u8> {
    let crc = crc16(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

/// FC65: read one or more address ranges in a single exchange.
pub fn build_read_ranges(ranges: &[RegisterRange]) -> Vec<u8> {
    let mut frame = start_frame(FC_READ_RANGES, ranges.len() * 4);
    for range in ranges {
        frame.extend_from_slice(&range.start.to_be_bytes());
        frame.extend_from_slice(&range.count.to_be_bytes());
    }
    finish_frame(frame)
}

/// FC66: read a flat, possibly sparse list of addresses.
///
/// The controller accepts at most
/// [`MAX_REGISTERS_PER_REQUEST`](crate::constants::MAX_REGISTERS_PER_REQUEST)
/// addresses; callers split longer lists.
pub fn build_read_registers(addresses: &[u16]) -> Vec<u8> {
    let mut frame = start_frame(FC_READ_REGISTERS, addresses.len() * 2);
    for address in addresses {
        frame.extend_from_slice(&address.to_be_bytes());
    }
    finish_frame(frame)
}

/// FC67: write (address, value) pairs in order.
pub fn build_write_registers(writes: &[(u16, u16)]) -> Vec<u8> {
    let mut frame = start_frame(FC_WRITE_REGISTERS, writes.len() * 4);
    for (address, value) in writes {
        frame.extend_from_slice(&address.to_be_bytes());
        frame.extend_from_slice(&value.to_be_bytes());
    }
    finish_frame(frame)
}

/// FC06: standard single register write.
pub fn build_write_single(address: u16, value: u16) -> Vec<u8> {
    let mut frame = start_frame(FC_WRITE_SINGLE, 4);
    frame.extend_from_slice(&address.to_be_bytes());
    frame.extend_from_slice(&value.to_be_bytes());
    finish_frame(frame)
}

// ============================================================================
// Response Helpers
// ============================================================================

/// Error responses echo the function code with the high bit set.
#[inline]
pub fn is_error_response(function_code: u8) -> bool {
    function_code & ERROR_FLAG != 0
}

/// Minimum bytes to buffer before a response of this kind can be judged.
///
/// For the read codes this is only the prefix up to the byte-count field;
/// the full length is `3 + byte_count + 2` once that field has arrived.
pub fn response_header_size(function_code: u8) -> usize {
    if is_error_response(function_code) {
        return ERROR_RESPONSE_LEN;
    }
    match function_code {
        FC_READ_RANGES | FC_READ_REGISTERS => RESPONSE_PREFIX_LEN,
        FC_WRITE_REGISTERS => WRITE_REGISTERS_RESPONSE_LEN,
        FC_WRITE_SINGLE => WRITE_SINGLE_RESPONSE_LEN,
        _ => RESPONSE_PREFIX_LEN,
    }
}

/// Decode consecutive big-endian register values. An odd trailing byte is dropped.
pub fn parse_register_values(data: &[u8]) -> Vec<u16> {
    data.chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

/// Format raw bytes as a hex string for packet logging.
pub fn format_hex_packet(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crc::{Crc, CRC_16_MODBUS};
    use proptest::prelude::*;

    const CRC_MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

    #[test]
    fn test_crc16_known_vectors() {
        assert_eq!(crc16(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]), 0x0A84);
        assert_eq!(crc16(&[0x01, 0x41, 0x00, 0x58, 0x00, 0x04]), 0xD5BD);
        assert_eq!(crc16(&[0x01, 0x42, 0x02, 0xE9, 0x02, 0xEA]), 0x6629);
        assert_eq!(crc16(&[0x01, 0x41]), 0x10C0);
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn test_build_read_ranges_frame() {
        let frame = build_read_ranges(&[RegisterRange::new(88, 4)]);
        assert_eq!(frame, vec![0x01, 0x41, 0x00, 0x58, 0x00, 0x04, 0xBD, 0xD5]);
    }

    #[test]
    fn test_build_read_ranges_multiple() {
        let frame = build_read_ranges(&[RegisterRange::new(19, 2), RegisterRange::new(740, 3)]);
        assert_eq!(frame.len(), 2 + 8 + 2);
        assert_eq!(&frame[2..10], &[0x00, 0x13, 0x00, 0x02, 0x02, 0xE4, 0x00, 0x03]);
        assert!(validate_frame_crc(&frame));
    }

    #[test]
    fn test_build_read_registers_frame() {
        let frame = build_read_registers(&[745, 746]);
        assert_eq!(frame, vec![0x01, 0x42, 0x02, 0xE9, 0x02, 0xEA, 0x29, 0x66]);
    }

    #[test]
    fn test_build_write_registers_frame() {
        let frame = build_write_registers(&[(12619, 700), (12620, 730)]);
        assert_eq!(frame.len(), 12);
        assert_eq!(&frame[..6], &[0x01, 0x43, 0x31, 0x4B, 0x02, 0xBC]);
        assert_eq!(&frame[6..10], &[0x31, 0x4C, 0x02, 0xDA]);
        assert!(validate_frame_crc(&frame));
    }

    #[test]
    fn test_build_write_single_frame() {
        let frame = build_write_single(400, 1);
        assert_eq!(&frame[..6], &[0x01, 0x06, 0x01, 0x90, 0x00, 0x01]);
        assert_eq!(frame.len(), 8);
        assert!(validate_frame_crc(&frame));
    }

    #[test]
    fn test_validate_frame_crc_rejects_short_and_corrupt() {
        assert!(!validate_frame_crc(&[]));
        assert!(!validate_frame_crc(&[0x01, 0x41, 0xC0]));

        let mut frame = build_read_registers(&[745]);
        assert!(validate_frame_crc(&frame));
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        assert!(!validate_frame_crc(&frame));
    }

    #[test]
    fn test_is_error_response() {
        assert!(is_error_response(0xC1));
        assert!(is_error_response(0x80));
        assert!(!is_error_response(FC_READ_RANGES));
        assert!(!is_error_response(FC_WRITE_SINGLE));
    }

    #[test]
    fn test_response_header_size() {
        assert_eq!(response_header_size(0xC2), 5);
        assert_eq!(response_header_size(FC_READ_RANGES), 3);
        assert_eq!(response_header_size(FC_READ_REGISTERS), 3);
        assert_eq!(response_header_size(FC_WRITE_REGISTERS), 4);
        assert_eq!(response_header_size(FC_WRITE_SINGLE), 8);
        assert_eq!(response_header_size(0x10), 3);
    }

    #[test]
    fn test_parse_register_values() {
        assert_eq!(parse_register_values(&[0x02, 0xBC, 0x02, 0xDA]), vec![700, 730]);
        assert_eq!(parse_register_values(&[0x02, 0xBC, 0x02]), vec![700]);
        assert!(parse_register_values(&[0x02]).is_empty());
        assert!(parse_register_values(&[]).is_empty());
    }

    #[test]
    fn test_register_range_addresses() {
        let addrs: Vec<u16> = RegisterRange::new(740, 3).addresses().collect();
        assert_eq!(addrs, vec![740, 741, 742]);
        assert_eq!(RegisterRange::new(5, 0).addresses().count(), 0);
    }

    #[test]
    fn test_format_hex_packet() {
        assert_eq!(format_hex_packet(&[0x01, 0x41, 0xBD]), "01 41 BD");
        assert_eq!(format_hex_packet(&[]), "");
    }

    proptest! {
        #[test]
        fn prop_crc16_matches_crc_crate(data in proptest::collection::vec(any::<u8>(), 0..300)) {
            prop_assert_eq!(crc16(&data), CRC_MODBUS.checksum(&data));
        }

        #[test]
        fn prop_read_ranges_frame_is_valid(
            ranges in proptest::collection::vec((any::<u16>(), 1u16..=100), 1..20)
        ) {
            let ranges: Vec<RegisterRange> =
                ranges.into_iter().map(|(s, c)| RegisterRange::new(s, c)).collect();
            let frame = build_read_ranges(&ranges);
            prop_assert_eq!(frame.len(), 4 + ranges.len() * 4);
            prop_assert!(validate_frame_crc(&frame));
        }

        #[test]
        fn prop_single_bit_flip_is_detected(
            ranges in proptest::collection::vec((any::<u16>(), 1u16..=100), 1..20),
            byte_seed in any::<usize>(),
            bit in 0u8..8,
        ) {
            let ranges: Vec<RegisterRange> =
                ranges.into_iter().map(|(s, c)| RegisterRange::new(s, c)).collect();
            let mut frame = build_read_ranges(&ranges);
            // Flip one bit somewhere in the payload
            let payload_len = frame.len() - 2 - CRC_LEN;
            let index = 2 + byte_seed % payload_len;
            frame[index] ^= 1 << bit;
            prop_assert!(!validate_frame_crc(&frame));
        }
    }
}
