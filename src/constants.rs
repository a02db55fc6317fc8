//! Aurora wire-protocol constants
//!
//! The Aurora ABC board speaks an RTU-framed dialect of Modbus with three
//! vendor function codes next to the standard write-single code:
//! - Frame size is capped at the RS-485 ADU limit of 256 bytes
//! - Multi-register requests are capped at 100 addresses by the controller

// ============================================================================
// Frame Size Constants
// ============================================================================

/// Unit address of the ABC board. Fixed for every request.
pub const UNIT_ADDRESS: u8 = 0x01;

/// Maximum RTU frame size (unit + function + payload + CRC)
pub const MAX_FRAME_SIZE: usize = 256;

/// Smallest frame that can carry a checksum: unit + function + CRC(2)
pub const MIN_FRAME_SIZE: usize = 4;

/// Trailing CRC length
pub const CRC_LEN: usize = 2;

/// Bytes needed before a response's length can be decided
/// (unit + function + byte count)
pub const RESPONSE_PREFIX_LEN: usize = 3;

// ============================================================================
// Request Limits
// ============================================================================

/// Maximum number of register addresses in one read request
///
/// Applies to the flattened address list of FC65 and FC66 requests.
/// A full response then carries 3 + 200 + 2 = 205 bytes.
pub const MAX_REGISTERS_PER_REQUEST: usize = 100;

/// Maximum (address, value) pairs in one FC67 request
///
/// Calculation for request frame:
/// - Unit + Function: 2 bytes
/// - Pairs: N × 4 bytes
/// - CRC: 2 bytes
/// - Total: 4 + 4N ≤ 256, therefore N ≤ 63
pub const MAX_WRITES_PER_REQUEST: usize = 63;

// ============================================================================
// Function Codes
// ============================================================================

/// Write Single Register (FC06, standard)
pub const FC_WRITE_SINGLE: u8 = 0x06;

/// Read Register Ranges (FC65, vendor): list of (start, count) pairs
pub const FC_READ_RANGES: u8 = 0x41;

/// Read Registers (FC66, vendor): list of individual addresses
pub const FC_READ_REGISTERS: u8 = 0x42;

/// Write Registers (FC67, vendor): list of (address, value) pairs
pub const FC_WRITE_REGISTERS: u8 = 0x43;

/// Bit set on the echoed function code of an error response
pub const ERROR_FLAG: u8 = 0x80;

// ============================================================================
// Response Lengths
// ============================================================================

/// Error response: unit + function + error code + CRC(2)
pub const ERROR_RESPONSE_LEN: usize = 5;

/// FC67 echo: unit + function + CRC(2)
pub const WRITE_REGISTERS_RESPONSE_LEN: usize = 4;

/// FC06 echo: unit + function + address(2) + value(2) + CRC(2)
pub const WRITE_SINGLE_RESPONSE_LEN: usize = 8;

// ============================================================================
// Timing Defaults
// ============================================================================

/// Time allowed between sending a request and receiving a complete frame
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 2000;

/// Enforced quiet period after a failed exchange
pub const DEFAULT_ERROR_BACKOFF_MS: u64 = 5000;

/// Default line speed of the AID tool port
pub const DEFAULT_BAUD_RATE: u32 = 19200;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_constants() {
        assert_eq!(MAX_FRAME_SIZE, 256);
        assert_eq!(MIN_FRAME_SIZE, 2 + CRC_LEN);
    }

    #[test]
    fn test_request_limits_fit_frame() {
        // Largest read response
        let read_response = RESPONSE_PREFIX_LEN + MAX_REGISTERS_PER_REQUEST * 2 + CRC_LEN;
        assert!(read_response <= MAX_FRAME_SIZE);

        // Largest FC66 request
        let read_request = 2 + MAX_REGISTERS_PER_REQUEST * 2 + CRC_LEN;
        assert!(read_request <= MAX_FRAME_SIZE);

        // Largest FC67 request, one more pair would overflow
        let write_request = 2 + MAX_WRITES_PER_REQUEST * 4 + CRC_LEN;
        assert!(write_request <= MAX_FRAME_SIZE);
        assert!(write_request + 4 > MAX_FRAME_SIZE);
    }

    #[test]
    fn test_vendor_codes_are_not_error_codes() {
        for fc in [FC_WRITE_SINGLE, FC_READ_RANGES, FC_READ_REGISTERS, FC_WRITE_REGISTERS] {
            assert_eq!(fc & ERROR_FLAG, 0);
        }
    }
}
