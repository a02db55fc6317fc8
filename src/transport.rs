//! Transport boundary for the Aurora driver
//!
//! The driver never blocks: every tick it asks the transport for whatever
//! bytes are already buffered and moves on if there are none. A transport
//! therefore only needs a non-blocking read, a write with an explicit flush,
//! a monotonic millisecond clock and, for RS-485 adapters without automatic
//! direction control, a way to switch the line driver.
//!
//! ## Serial (`rtu` feature)
//!
//! ```rust,no_run
//! # #[cfg(feature = "rtu")]
//! # fn main() -> aurora_modbus::ModbusResult<()> {
//! use aurora_modbus::transport::SerialTransport;
//!
//! let transport = SerialTransport::new("/dev/ttyUSB0", 19200)?.with_rts_direction(true);
//! # let _ = transport;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "rtu"))]
//! # fn main() {}
//! ```

use crate::error::ModbusResult;

/// Byte stream plus clock consumed by [`AuroraDriver`](crate::driver::AuroraDriver).
pub trait AuroraTransport {
    /// Copy currently buffered bytes into `buf` and return how many were copied.
    ///
    /// Must return `Ok(0)` immediately when nothing is available.
    fn read_available(&mut self, buf: &mut [u8]) -> ModbusResult<usize>;

    /// Queue `data` for transmission.
    fn write_all(&mut self, data: &[u8]) -> ModbusResult<()>;

    /// Block until queued bytes have left the transmitter.
    fn flush(&mut self) -> ModbusResult<()>;

    /// Drive the half-duplex direction signal: `true` to transmit, `false` to receive.
    ///
    /// Transports without a direction signal keep the default no-op.
    fn set_direction(&mut self, _transmit: bool) -> ModbusResult<()> {
        Ok(())
    }

    /// Monotonic milliseconds since an arbitrary origin.
    fn now_ms(&self) -> u64;
}

#[cfg(feature = "rtu")]
pub use serial::SerialTransport;

#[cfg(feature = "rtu")]
mod serial {
    use std::io::{Read, Write};
    use std::time::{Duration, Instant};

    use tokio_serial::{DataBits, Parity, SerialPort, StopBits};
    use tracing::{debug, info};

    use super::AuroraTransport;
    use crate::error::{ModbusError, ModbusResult};

    /// RS-485 serial port driven without blocking reads.
    ///
    /// When `rts_direction` is enabled the RTS line is raised while a frame
    /// is being sent and dropped right after the flush.
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
        port_name: String,
        rts_direction: bool,
        origin: Instant,
    }

    impl SerialTransport {
        /// Open `port` with the ABC board's line format (8 data bits, even parity, 1 stop bit).
        pub fn new(port: &str, baud_rate: u32) -> ModbusResult<Self> {
            Self::new_with_config(port, baud_rate, DataBits::Eight, Parity::Even, StopBits::One)
        }

        pub fn new_with_config(
            port: &str,
            baud_rate: u32,
            data_bits: DataBits,
            parity: Parity,
            stop_bits: StopBits,
        ) -> ModbusResult<Self> {
            let handle = tokio_serial::new(port, baud_rate)
                .data_bits(data_bits)
                .parity(parity)
                .stop_bits(stop_bits)
                .timeout(Duration::from_millis(100))
                .open()
                .map_err(|e| {
                    ModbusError::connection(format!("Failed to open serial port {}: {}", port, e))
                })?;

            info!("Opened {} at {} baud", port, baud_rate);

            Ok(Self {
                port: handle,
                port_name: port.to_string(),
                rts_direction: false,
                origin: Instant::now(),
            })
        }

        /// Use RTS as the RS-485 driver-enable signal.
        pub fn with_rts_direction(mut self, enabled: bool) -> Self {
            self.rts_direction = enabled;
            self
        }

        pub fn port_name(&self) -> &str {
            &self.port_name
        }
    }

    impl AuroraTransport for SerialTransport {
        fn read_available(&mut self, buf: &mut [u8]) -> ModbusResult<usize> {
            let available = self
                .port
                .bytes_to_read()
                .map_err(|e| ModbusError::io(format!("{}: {}", self.port_name, e)))?;
            if available == 0 || buf.is_empty() {
                return Ok(0);
            }
            let want = buf.len().min(available as usize);
            let read = self.port.read(&mut buf[..want])?;
            Ok(read)
        }

        fn write_all(&mut self, data: &[u8]) -> ModbusResult<()> {
            self.port.write_all(data)?;
            Ok(())
        }

        fn flush(&mut self) -> ModbusResult<()> {
            self.port.flush()?;
            Ok(())
        }

        fn set_direction(&mut self, transmit: bool) -> ModbusResult<()> {
            if !self.rts_direction {
                return Ok(());
            }
            debug!("RTS {}", if transmit { "high" } else { "low" });
            self.port
                .write_request_to_send(transmit)
                .map_err(|e| ModbusError::io(format!("{}: {}", self.port_name, e)))
        }

        fn now_ms(&self) -> u64 {
            self.origin.elapsed().as_millis() as u64
        }
    }
}
