//! # Driver Configuration
//!
//! Timing and batching knobs supplied by the host when the driver is built.
//!
//! ## Defaults
//!
//! - **Response timeout**: 2000 ms from sending a request to a complete frame
//! - **Error backoff**: 5000 ms of enforced quiet after a failed exchange
//! - **Write batch**: 63 pairs per FC67 request, the most a 256-byte frame holds

use crate::constants::{DEFAULT_ERROR_BACKOFF_MS, DEFAULT_RESPONSE_TIMEOUT_MS, MAX_WRITES_PER_REQUEST};
use crate::error::{ModbusError, ModbusResult};

/// Host-supplied driver settings.
///
/// # Example
///
/// ```rust
/// use aurora_modbus::DriverConfig;
///
/// let config = DriverConfig::new()
///     .with_response_timeout_ms(1500)
///     .with_error_backoff_ms(10_000);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.response_timeout_ms, 1500);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Time allowed for a complete response (milliseconds).
    pub response_timeout_ms: u64,
    /// Quiet period after a timeout or setup failure (milliseconds).
    pub error_backoff_ms: u64,
    /// Maximum queued writes sent in one FC67 request.
    pub max_writes_per_request: usize,
}

impl DriverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.response_timeout_ms = timeout_ms;
        self
    }

    pub fn with_error_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.error_backoff_ms = backoff_ms;
        self
    }

    pub fn with_max_writes_per_request(mut self, count: usize) -> Self {
        self.max_writes_per_request = count;
        self
    }

    /// Reject settings the state machine cannot run with.
    pub fn validate(&self) -> ModbusResult<()> {
        if self.response_timeout_ms == 0 {
            return Err(ModbusError::configuration("response timeout must be non-zero"));
        }
        if self.error_backoff_ms == 0 {
            return Err(ModbusError::configuration("error backoff must be non-zero"));
        }
        if self.max_writes_per_request == 0 || self.max_writes_per_request > MAX_WRITES_PER_REQUEST
        {
            return Err(ModbusError::configuration(format!(
                "writes per request must be 1..={} (got {})",
                MAX_WRITES_PER_REQUEST, self.max_writes_per_request
            )));
        }
        Ok(())
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            error_backoff_ms: DEFAULT_ERROR_BACKOFF_MS,
            max_writes_per_request: MAX_WRITES_PER_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DriverConfig::default();
        assert_eq!(config.response_timeout_ms, 2000);
        assert_eq!(config.error_backoff_ms, 5000);
        assert_eq!(config.max_writes_per_request, 63);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = DriverConfig::new()
            .with_response_timeout_ms(500)
            .with_error_backoff_ms(1000)
            .with_max_writes_per_request(8);

        assert_eq!(config.response_timeout_ms, 500);
        assert_eq!(config.error_backoff_ms, 1000);
        assert_eq!(config.max_writes_per_request, 8);
    }

    #[test]
    fn test_validate_rejects_zero_durations() {
        assert!(DriverConfig::new().with_response_timeout_ms(0).validate().is_err());
        assert!(DriverConfig::new().with_error_backoff_ms(0).validate().is_err());
    }

    #[test]
    fn test_validate_write_batch_bounds() {
        assert!(DriverConfig::new().with_max_writes_per_request(0).validate().is_err());
        assert!(DriverConfig::new().with_max_writes_per_request(64).validate().is_err());
        assert!(DriverConfig::new().with_max_writes_per_request(1).validate().is_ok());
    }
}
