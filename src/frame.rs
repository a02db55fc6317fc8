//! Receive accumulator for split RTU responses
//!
//! Serial reads hand over whatever happens to be buffered, so a response can
//! arrive in any number of pieces. `RxBuffer` collects those pieces in a
//! fixed-size stack array and cuts a complete frame off the front once the
//! function code (and, for reads, the byte count) says how long it is.

use tracing::debug;

use crate::codec::{is_error_response, response_header_size};
use crate::constants::{
    CRC_LEN, ERROR_RESPONSE_LEN, FC_WRITE_REGISTERS, FC_WRITE_SINGLE, MAX_FRAME_SIZE,
    RESPONSE_PREFIX_LEN,
};
use crate::error::{ModbusError, ModbusResult};

/// One complete response frame, CRC trailer included.
#[derive(Debug, Clone)]
pub struct ResponseFrame {
    data: [u8; MAX_FRAME_SIZE],
    len: usize,
}

impl ResponseFrame {
    fn from_slice(bytes: &[u8]) -> Self {
        let mut data = [0; MAX_FRAME_SIZE];
        data[..bytes.len()].copy_from_slice(bytes);
        Self {
            data,
            len: bytes.len(),
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Echoed function code (second byte)
    #[inline]
    pub fn function_code(&self) -> u8 {
        self.data[1]
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        is_error_response(self.function_code())
    }

    /// Device error code of an error response
    #[inline]
    pub fn error_code(&self) -> Option<u8> {
        if self.is_error() {
            Some(self.data[2])
        } else {
            None
        }
    }

    /// Bytes between the header and the CRC.
    ///
    /// For read responses this is the register data following the byte
    /// count; for other frames everything after the function code.
    pub fn payload(&self) -> &[u8] {
        let end = self.len - CRC_LEN;
        if self.is_error() {
            return &self.data[2..end];
        }
        match self.function_code() {
            FC_WRITE_REGISTERS | FC_WRITE_SINGLE => &self.data[2..end],
            _ => &self.data[RESPONSE_PREFIX_LEN..end],
        }
    }
}

/// Fixed-capacity accumulator for inbound bytes.
#[derive(Debug, Clone)]
pub struct RxBuffer {
    data: [u8; MAX_FRAME_SIZE],
    len: usize,
}

impl RxBuffer {
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0; MAX_FRAME_SIZE],
            len: 0,
        }
    }

    /// Append received bytes.
    ///
    /// Fails without appending anything when the bytes would not fit; no
    /// valid response is longer than the buffer, so the caller should drop
    /// what has been collected.
    pub fn extend(&mut self, bytes: &[u8]) -> ModbusResult<()> {
        if self.len + bytes.len() > MAX_FRAME_SIZE {
            return Err(ModbusError::frame(format!(
                "receive buffer overflow: {} + {} > {}",
                self.len,
                bytes.len(),
                MAX_FRAME_SIZE
            )));
        }
        self.data[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Total length of the frame at the front of the buffer, once decidable.
    ///
    /// Needs three bytes: unit, function code and either the error code or
    /// the byte count of a read response. Unknown function codes are assumed
    /// to carry a byte count like the read responses.
    pub fn expected_frame_len(&self) -> Option<usize> {
        if self.len < RESPONSE_PREFIX_LEN {
            return None;
        }
        let function_code = self.data[1];
        let expected = if is_error_response(function_code) {
            ERROR_RESPONSE_LEN
        } else {
            match function_code {
                FC_WRITE_REGISTERS | FC_WRITE_SINGLE => response_header_size(function_code),
                _ => RESPONSE_PREFIX_LEN + usize::from(self.data[2]) + CRC_LEN,
            }
        };
        Some(expected)
    }

    /// Cut the next complete frame off the front of the buffer.
    ///
    /// Returns `Ok(None)` while more bytes are needed. Any bytes after the
    /// frame stay buffered. The CRC is not checked here.
    pub fn take_frame(&mut self) -> ModbusResult<Option<ResponseFrame>> {
        let expected = match self.expected_frame_len() {
            Some(expected) => expected,
            None => return Ok(None),
        };
        if expected > MAX_FRAME_SIZE {
            return Err(ModbusError::frame(format!(
                "declared frame length {} exceeds {}",
                expected, MAX_FRAME_SIZE
            )));
        }
        if self.len < expected {
            return Ok(None);
        }

        let frame = ResponseFrame::from_slice(&self.data[..expected]);
        self.data.copy_within(expected..self.len, 0);
        self.len -= expected;

        debug!(
            "Frame assembled: FC={:02X}, {} bytes, {} left buffered",
            frame.function_code(),
            frame.len(),
            self.len
        );
        Ok(Some(frame))
    }
}

impl Default for RxBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{build_write_single, crc16};

    fn with_crc(mut bytes: Vec<u8>) -> Vec<u8> {
        let crc = crc16(&bytes);
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes
    }

    #[test]
    fn test_waits_for_prefix() {
        let mut rx = RxBuffer::new();
        rx.extend(&[0x01, 0x41]).unwrap();
        assert_eq!(rx.expected_frame_len(), None);
        assert!(rx.take_frame().unwrap().is_none());
        assert_eq!(rx.len(), 2);
    }

    #[test]
    fn test_read_response_split_across_chunks() {
        let frame = with_crc(vec![0x01, 0x42, 0x04, 0x02, 0xBC, 0x02, 0xDA]);
        let mut rx = RxBuffer::new();

        rx.extend(&frame[..4]).unwrap();
        assert_eq!(rx.expected_frame_len(), Some(9));
        assert!(rx.take_frame().unwrap().is_none());

        rx.extend(&frame[4..]).unwrap();
        let taken = rx.take_frame().unwrap().unwrap();
        assert_eq!(taken.as_slice(), frame.as_slice());
        assert_eq!(taken.payload(), &[0x02, 0xBC, 0x02, 0xDA]);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_fixed_length_responses() {
        let mut rx = RxBuffer::new();
        rx.extend(&[0x01, 0xC1, 0x02]).unwrap();
        assert_eq!(rx.expected_frame_len(), Some(5));

        rx.clear();
        rx.extend(&[0x01, 0x43, 0x00]).unwrap();
        assert_eq!(rx.expected_frame_len(), Some(4));

        rx.clear();
        rx.extend(&build_write_single(400, 1)[..3]).unwrap();
        assert_eq!(rx.expected_frame_len(), Some(8));
    }

    #[test]
    fn test_error_frame_accessors() {
        let frame = with_crc(vec![0x01, 0xC2, 0x03]);
        let mut rx = RxBuffer::new();
        rx.extend(&frame).unwrap();
        let taken = rx.take_frame().unwrap().unwrap();
        assert!(taken.is_error());
        assert_eq!(taken.error_code(), Some(0x03));
        assert_eq!(taken.payload(), &[0x03]);
    }

    #[test]
    fn test_trailing_bytes_stay_buffered() {
        let echo = build_write_single(400, 1);
        let mut rx = RxBuffer::new();
        rx.extend(&echo).unwrap();
        rx.extend(&[0x01, 0x41]).unwrap();

        let taken = rx.take_frame().unwrap().unwrap();
        assert_eq!(taken.payload(), &[0x01, 0x90, 0x00, 0x01]);
        assert_eq!(rx.as_slice(), &[0x01, 0x41]);
    }

    #[test]
    fn test_overflow_is_rejected() {
        let mut rx = RxBuffer::new();
        rx.extend(&[0u8; 200]).unwrap();
        assert!(rx.extend(&[0u8; 57]).is_err());
        assert_eq!(rx.len(), 200);
    }

    #[test]
    fn test_oversized_declared_length() {
        let mut rx = RxBuffer::new();
        rx.extend(&[0x01, 0x41, 0xFF]).unwrap();
        assert!(rx.take_frame().is_err());
    }
}
