//! Error types for the Aurora driver
//!
//! The communication state machine recovers from every fault on its own, so
//! these errors surface only at the edges: transport I/O, configuration
//! validation and poll-group construction.

use thiserror::Error;

/// Errors produced by transports and by configuration checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModbusError {
    /// Underlying byte-stream failure
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serial port could not be opened or was lost
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// No complete frame arrived in time
    #[error("Timeout: {operation} after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Frame violates the wire protocol
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Frame could not be assembled or failed its checksum
    #[error("Frame error: {message}")]
    Frame { message: String },

    /// Controller answered with the error bit set on the function code
    #[error("Device error: function 0x{function:02X}, code 0x{code:02X}")]
    DeviceError { function: u8, code: u8 },

    /// Payload did not match what the request implied
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Host-supplied configuration is unusable
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Result alias used across the crate.
pub type ModbusResult<T> = Result<T, ModbusError>;

impl ModbusError {
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn frame(message: impl Into<String>) -> Self {
        Self::Frame {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ModbusError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                Self::timeout(err.to_string(), 0)
            }
            _ => Self::io(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helper_constructors() {
        assert_eq!(
            ModbusError::io("port closed"),
            ModbusError::Io {
                message: "port closed".to_string()
            }
        );
        assert_eq!(
            ModbusError::timeout("read", 2000).to_string(),
            "Timeout: read after 2000ms"
        );
    }

    #[test]
    fn test_display_device_error() {
        let err = ModbusError::DeviceError {
            function: 0xC1,
            code: 0x02,
        };
        assert_eq!(err.to_string(), "Device error: function 0xC1, code 0x02");
    }

    #[test]
    fn test_from_io_error() {
        let err: ModbusError =
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(matches!(err, ModbusError::Io { .. }));

        let err: ModbusError = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow").into();
        assert!(matches!(err, ModbusError::Timeout { .. }));
    }
}
