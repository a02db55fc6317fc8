//! # Aurora Modbus - WaterFurnace Aurora Heat Pump Driver
//!
//! Non-blocking driver for the ABC board of WaterFurnace Aurora geothermal
//! heat pumps, spoken over a half-duplex RS-485 line with the controller's
//! Modbus-RTU dialect.
//!
//! ## Features
//!
//! - **Cooperative**: one `tick()` per host loop iteration, never blocks on I/O
//! - **Self-configuring**: reads the system identity, detects installed
//!   components and builds its poll plan from what it finds
//! - **Batched**: vendor range reads cover up to 100 registers per exchange,
//!   queued writes go out in a single request
//! - **Consumer API**: register listeners, queued writes and cache reads,
//!   plus ready-made climate, sensor, switch and text entities
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Direction |
//! |------|----------|-----------|
//! | 0x06 | Write Single Register | echo handled |
//! | 0x41 | Read Register Ranges (vendor) | ✅ |
//! | 0x42 | Read Registers (vendor) | ✅ |
//! | 0x43 | Write Registers (vendor) | ✅ |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "rtu")]
//! # fn main() -> aurora_modbus::ModbusResult<()> {
//! use aurora_modbus::transport::SerialTransport;
//! use aurora_modbus::registers::REG_AMBIENT_TEMP;
//! use aurora_modbus::{AuroraDriver, DriverConfig};
//!
//! let transport = SerialTransport::new("/dev/ttyUSB0", 19200)?;
//! let mut driver = AuroraDriver::new(transport, DriverConfig::default())?;
//!
//! driver.register_listener(REG_AMBIENT_TEMP, |raw| {
//!     println!("ambient: {:.1} °F", f64::from(raw as i16) / 10.0);
//! });
//!
//! loop {
//!     driver.tick();
//!     // call driver.update() once per poll interval
//! #   break;
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "rtu"))]
//! # fn main() {}
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Protocol constants: function codes, frame limits, default timings
pub mod constants;

/// Frame building, CRC16 and response decoding
pub mod codec;

/// Receive accumulator and response framing
pub mod frame;

/// Register map, value conversions and poll range lists
pub mod registers;

/// Batched read requests
pub mod poll_group;

/// Register cache, listeners and the pending-write queue
pub mod cache;

/// Transport boundary and the serial implementation
pub mod transport;

/// Driver timing configuration
pub mod config;

/// Detected hardware and the poll plan
pub mod capabilities;

/// Communication state machine
pub mod driver;

// ============================================================================
// Consumer entities
// ============================================================================

/// Thermostat and IZ2 zone climate control
pub mod climate;

/// Numeric, binary, switch and text entities
pub mod entities;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Error handling ===
pub use error::{ModbusError, ModbusResult};

// === Driver ===
pub use config::DriverConfig;
pub use driver::{AuroraDriver, DriverState, DriverStats, SystemIdentity};
pub use transport::AuroraTransport;

// === Register model ===
pub use cache::{RegisterAccess, RegisterCache, RegisterCallback};
pub use capabilities::Capabilities;
pub use codec::RegisterRange;
pub use poll_group::PollGroup;
pub use registers::{FanMode, FaultStatus, HeatingMode, RegisterType};

// === Entities ===
pub use climate::{Climate, ClimateCall, ClimateMode, ClimatePreset, ClimateState, ClimateZone};
pub use entities::{BinarySensor, NumericSensor, Switch, TextKind, TextSensor};

#[cfg(feature = "rtu")]
pub use transport::SerialTransport;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
