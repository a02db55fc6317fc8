//! Aurora Demo
//!
//! Connects to an ABC board over RS-485, runs setup, then polls forever and
//! logs a handful of readings as they change.
//!
//! Usage: cargo run --features demo --bin demo -- --port /dev/ttyUSB0
//! Log level: RUST_LOG=aurora_modbus=debug for TX/RX hex dumps

use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use aurora_modbus::constants::DEFAULT_BAUD_RATE;
use aurora_modbus::registers::{OUTPUT_CC, REG_DHW_ENABLE, REG_LEAVING_AIR, REG_SYSTEM_OUTPUTS};
use aurora_modbus::transport::SerialTransport;
use aurora_modbus::{
    AuroraDriver, BinarySensor, Climate, ClimateZone, DriverConfig, DriverState, ModbusResult,
    NumericSensor, RegisterType, Switch, TextKind, TextSensor,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Poll a WaterFurnace Aurora heat pump", long_about = None)]
struct Args {
    #[arg(long, help = "Serial device of the RS-485 adapter")]
    port: String,

    #[arg(long, default_value_t = DEFAULT_BAUD_RATE, help = "Baud rate")]
    baud: u32,

    #[arg(long, default_value_t = 10, help = "Seconds between poll cycles")]
    poll_interval: u64,

    #[arg(long, default_value_t = 2000, help = "Response timeout in milliseconds")]
    timeout_ms: u64,

    #[arg(long, default_value_t = 5000, help = "Backoff after errors in milliseconds")]
    backoff_ms: u64,

    #[arg(long, help = "Use RTS as the RS-485 direction signal")]
    rts: bool,

    #[arg(long, help = "IZ2 zone to show instead of the main thermostat")]
    zone: Option<u8>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ModbusResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let transport = SerialTransport::new(&args.port, args.baud)?.with_rts_direction(args.rts);
    let config = DriverConfig::new()
        .with_response_timeout_ms(args.timeout_ms)
        .with_error_backoff_ms(args.backoff_ms);
    let mut driver = AuroraDriver::new(transport, config)?;

    let zone = match args.zone {
        Some(n) => ClimateZone::Iz2(n),
        None => ClimateZone::Single,
    };
    let climate = Climate::attach(&mut driver, zone)?;
    let leaving_air =
        NumericSensor::attach(&mut driver, "Leaving Air", REG_LEAVING_AIR, RegisterType::SignedTenths);
    let compressor = BinarySensor::attach(&mut driver, "Compressor", REG_SYSTEM_OUTPUTS, OUTPUT_CC);
    let dhw = Switch::attach(&mut driver, "DHW", REG_DHW_ENABLE, REG_DHW_ENABLE);
    let mode = TextSensor::attach(&mut driver, "Mode", TextKind::Mode);
    let fault = TextSensor::attach(&mut driver, "Last Fault", TextKind::Fault);

    let mut ticker = tokio::time::interval(Duration::from_millis(10));
    let mut poller = tokio::time::interval(Duration::from_secs(args.poll_interval.max(1)));
    let mut reported = 0u64;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => driver.tick(),
            _ = poller.tick() => {
                if driver.state() == DriverState::Idle {
                    driver.update();
                } else if !driver.is_ready() {
                    info!("Setup in progress ({})", driver.state());
                }
            }
            _ = &mut ctrl_c => {
                info!("Stopping, stats: {:?}", driver.stats());
                return Ok(());
            }
        }

        let completed = driver.stats().responses_received;
        if driver.state() == DriverState::Idle && driver.is_ready() && completed != reported {
            reported = completed;
            let state = climate.state();
            info!(
                "{} | ambient {:?} °C, heat {:?} / cool {:?}, mode {:?} {:?}, fan {:?}",
                zone,
                state.current_temperature,
                state.target_temperature_low,
                state.target_temperature_high,
                state.mode,
                state.preset,
                state.fan_mode
            );
            info!(
                "{} {:?} °F | compressor {:?} | DHW {:?} | {} | {}",
                leaving_air.name(),
                leaving_air.state(),
                compressor.state(),
                dhw.state(),
                mode.state().unwrap_or_default(),
                fault.state().unwrap_or_default()
            );
            if let Some(err) = driver.last_error() {
                warn!("Last error: {}", err);
            }
        }
    }
}
