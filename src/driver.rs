//! # Aurora Communication State Machine
//!
//! Non-blocking driver for the ABC board. The host calls [`AuroraDriver::tick`]
//! as often as it likes and [`AuroraDriver::update`] once per poll interval.
//! Neither call ever waits on the line: a tick moves bytes that are already
//! buffered, checks the response deadline, and sends at most one request.
//!
//! ```text
//!  SetupReadId ──▶ WaitingResponse ──▶ SetupDetectComponents ──▶ WaitingResponse ──▶ Idle
//!                        │                                            │               │ ▲
//!                        ▼                                            ▼               ▼ │
//!                   ErrorBackoff ◀──────────── timeout / setup error ─┘      WaitingResponse
//! ```
//!
//! At most one request is in flight. Every response is matched against the
//! request that produced it, so values land on the addresses they were read
//! from and a poll cycle advances one group per response.

use std::fmt;

use tracing::{debug, error, info, warn};

use crate::cache::{RegisterAccess, RegisterCache, RegisterCallback};
use crate::capabilities::{plan_poll_groups, Capabilities};
use crate::codec::{
    build_read_ranges, build_write_registers, format_hex_packet, parse_register_values,
    validate_frame_crc, RegisterRange,
};
use crate::config::DriverConfig;
use crate::constants::{FC_READ_RANGES, FC_READ_REGISTERS, FC_WRITE_REGISTERS, FC_WRITE_SINGLE};
use crate::error::{ModbusError, ModbusResult};
use crate::frame::{ResponseFrame, RxBuffer};
use crate::poll_group::PollGroup;
use crate::registers::{
    decode_string, is_vs_drive_program, ABC_PROGRAM_LEN, COMPONENT_DETECT_RANGES,
    MODEL_NUMBER_LEN, REG_ABC_PROGRAM, REG_ABC_VERSION, REG_MODEL_NUMBER, REG_SERIAL_NUMBER,
    SERIAL_NUMBER_LEN, SYSTEM_ID_RANGES,
};
use crate::transport::AuroraTransport;

/// Bytes pulled from the transport per read call.
const READ_CHUNK: usize = 64;

/// Driver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    SetupReadId,
    SetupDetectComponents,
    Idle,
    WaitingResponse,
    ErrorBackoff,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverState::SetupReadId => "setup: read identity",
            DriverState::SetupDetectComponents => "setup: detect components",
            DriverState::Idle => "idle",
            DriverState::WaitingResponse => "waiting for response",
            DriverState::ErrorBackoff => "error backoff",
        };
        f.write_str(name)
    }
}

/// The request currently awaiting a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InFlight {
    SystemId,
    ComponentDetect,
    PollGroup(usize),
    Write,
}

/// Identity strings decoded during setup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemIdentity {
    pub abc_program: String,
    pub model_number: String,
    pub serial_number: String,
    /// ABC firmware version in hundredths.
    pub abc_version: u16,
}

/// Traffic and error counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub requests_sent: u64,
    pub responses_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub timeouts: u64,
    pub crc_errors: u64,
    pub device_errors: u64,
    pub count_mismatches: u64,
    pub transport_errors: u64,
    pub stale_bytes_discarded: u64,
}

/// Poll-driven Aurora driver over any [`AuroraTransport`].
pub struct AuroraDriver<T: AuroraTransport> {
    transport: T,
    config: DriverConfig,
    state: DriverState,
    setup_in_progress: bool,
    identity_read: bool,
    components_detected: bool,
    identity: SystemIdentity,
    capabilities: Capabilities,
    cache: RegisterCache,
    poll_groups: Vec<PollGroup>,
    current_poll_group: usize,
    in_flight: Option<InFlight>,
    expected_addresses: Vec<u16>,
    rx: RxBuffer,
    last_request_ms: u64,
    backoff_until_ms: u64,
    stats: DriverStats,
    last_error: Option<ModbusError>,
}

impl<T: AuroraTransport> AuroraDriver<T> {
    /// Create a driver and put the line into receive mode.
    ///
    /// The first [`tick`](Self::tick) starts the identity read.
    pub fn new(mut transport: T, config: DriverConfig) -> ModbusResult<Self> {
        config.validate()?;
        transport.set_direction(false)?;

        Ok(Self {
            transport,
            config,
            state: DriverState::SetupReadId,
            setup_in_progress: false,
            identity_read: false,
            components_detected: false,
            identity: SystemIdentity::default(),
            capabilities: Capabilities::default(),
            cache: RegisterCache::new(),
            poll_groups: Vec::new(),
            current_poll_group: 0,
            in_flight: None,
            expected_addresses: Vec::new(),
            rx: RxBuffer::new(),
            last_request_ms: 0,
            backoff_until_ms: 0,
            stats: DriverStats::default(),
            last_error: None,
        })
    }

    // ========================================================================
    // Host entry points
    // ========================================================================

    /// Start a poll cycle. Ignored unless the driver is idle.
    pub fn update(&mut self) {
        if self.state != DriverState::Idle {
            debug!("Poll skipped, driver is {}", self.state);
            return;
        }
        self.current_poll_group = 0;
        self.poll_next_group();
    }

    /// Advance the state machine by one step.
    pub fn tick(&mut self) {
        let now = self.transport.now_ms();
        match self.state {
            DriverState::SetupReadId => {
                info!("Reading system identity");
                self.setup_in_progress = true;
                self.send_request(
                    build_read_ranges(&SYSTEM_ID_RANGES),
                    InFlight::SystemId,
                    flatten(&SYSTEM_ID_RANGES),
                );
            }
            DriverState::SetupDetectComponents => {
                info!("Detecting installed components");
                self.setup_in_progress = true;
                self.send_request(
                    build_read_ranges(&COMPONENT_DETECT_RANGES),
                    InFlight::ComponentDetect,
                    flatten(&COMPONENT_DETECT_RANGES),
                );
            }
            DriverState::Idle => {
                if self.cache.has_pending_writes() {
                    self.flush_writes();
                }
            }
            DriverState::WaitingResponse => self.poll_response(now),
            DriverState::ErrorBackoff => {
                if now >= self.backoff_until_ms {
                    self.resume_after_backoff();
                }
            }
        }
    }

    /// Subscribe to a register. Listeners fire in registration order.
    pub fn register_listener<F>(&mut self, address: u16, callback: F)
    where
        F: FnMut(u16) + 'static,
    {
        self.cache.register_listener(address, Box::new(callback));
    }

    /// Queue a register write for the next idle tick.
    pub fn write_register(&mut self, address: u16, value: u16) {
        self.cache.enqueue_write(address, value);
    }

    /// Last value read for `address`.
    pub fn get_register(&self, address: u16) -> Option<u16> {
        self.cache.get(address)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// `true` once identity and component detection have both completed.
    pub fn is_ready(&self) -> bool {
        self.identity_read && self.components_detected
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn identity(&self) -> &SystemIdentity {
        &self.identity
    }

    pub fn has_thermostat(&self) -> bool {
        self.capabilities.has_thermostat
    }

    pub fn has_axb(&self) -> bool {
        self.capabilities.has_axb
    }

    pub fn has_iz2(&self) -> bool {
        self.capabilities.has_iz2
    }

    pub fn has_aoc(&self) -> bool {
        self.capabilities.has_aoc
    }

    pub fn has_moc(&self) -> bool {
        self.capabilities.has_moc
    }

    pub fn has_eev2(&self) -> bool {
        self.capabilities.has_eev2
    }

    pub fn has_awl(&self) -> bool {
        self.capabilities.has_awl
    }

    pub fn has_vs_drive(&self) -> bool {
        self.capabilities.has_vs_drive
    }

    pub fn has_energy_monitoring(&self) -> bool {
        self.capabilities.has_energy_monitoring
    }

    pub fn awl_thermostat(&self) -> bool {
        self.capabilities.awl_thermostat
    }

    pub fn awl_axb(&self) -> bool {
        self.capabilities.awl_axb
    }

    pub fn awl_iz2(&self) -> bool {
        self.capabilities.awl_iz2
    }

    pub fn iz2_zone_count(&self) -> u8 {
        self.capabilities.iz2_zone_count
    }

    pub fn abc_program(&self) -> &str {
        &self.identity.abc_program
    }

    pub fn model_number(&self) -> &str {
        &self.identity.model_number
    }

    pub fn serial_number(&self) -> &str {
        &self.identity.serial_number
    }

    /// ABC firmware version in hundredths.
    pub fn abc_version(&self) -> u16 {
        self.identity.abc_version
    }

    pub fn poll_groups(&self) -> &[PollGroup] {
        &self.poll_groups
    }

    pub fn cache(&self) -> &RegisterCache {
        &self.cache
    }

    pub fn stats(&self) -> &DriverStats {
        &self.stats
    }

    /// Most recent failure, kept until replaced by the next one.
    pub fn last_error(&self) -> Option<&ModbusError> {
        self.last_error.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ========================================================================
    // Requests
    // ========================================================================

    fn poll_next_group(&mut self) {
        let index = self.current_poll_group;
        let (name, frame, expected) = match self.poll_groups.get(index) {
            Some(group) => (group.name(), group.build_request(), group.expected_addresses()),
            None => {
                self.state = DriverState::Idle;
                return;
            }
        };
        debug!(
            "Polling group {}/{} '{}' ({} registers)",
            index + 1,
            self.poll_groups.len(),
            name,
            expected.len()
        );
        self.send_request(frame, InFlight::PollGroup(index), expected);
    }

    fn flush_writes(&mut self) {
        let writes = self.cache.take_writes(self.config.max_writes_per_request);
        if writes.is_empty() {
            return;
        }
        debug!(
            "Sending {} register writes ({} still queued)",
            writes.len(),
            self.cache.pending_writes().len()
        );
        self.send_request(build_write_registers(&writes), InFlight::Write, Vec::new());
    }

    fn send_request(&mut self, frame: Vec<u8>, request: InFlight, expected: Vec<u16>) {
        self.rx.clear();
        self.discard_stale_input();
        self.expected_addresses = expected;
        self.in_flight = Some(request);

        debug!("TX {:?} ({} bytes): {}", request, frame.len(), format_hex_packet(&frame));

        if let Err(e) = self.transmit(&frame) {
            warn!("Failed to send {:?} request: {}", request, e);
            self.stats.transport_errors += 1;
            let now = self.transport.now_ms();
            self.enter_backoff(e, now);
            return;
        }

        self.stats.requests_sent += 1;
        self.stats.bytes_sent += frame.len() as u64;
        self.last_request_ms = self.transport.now_ms();
        self.state = DriverState::WaitingResponse;
    }

    /// Drop bytes left over from an earlier exchange, such as a reply that
    /// arrived after its timeout.
    fn discard_stale_input(&mut self) {
        let mut scratch = [0u8; READ_CHUNK];
        loop {
            match self.transport.read_available(&mut scratch) {
                Ok(0) => return,
                Ok(read) => {
                    debug!(
                        "Discarding {} stale bytes: {}",
                        read,
                        format_hex_packet(&scratch[..read])
                    );
                    self.stats.stale_bytes_discarded += read as u64;
                }
                Err(e) => {
                    debug!("Could not clear stale input: {}", e);
                    return;
                }
            }
        }
    }

    /// Raise the driver, send, drain and drop back to receive.
    ///
    /// The direction is released even when the write fails.
    fn transmit(&mut self, frame: &[u8]) -> ModbusResult<()> {
        self.transport.set_direction(true)?;
        let sent = self
            .transport
            .write_all(frame)
            .and_then(|()| self.transport.flush());
        let released = self.transport.set_direction(false);
        sent?;
        released
    }

    // ========================================================================
    // Responses
    // ========================================================================

    fn poll_response(&mut self, now: u64) {
        if let Err(e) = self.drain_transport() {
            warn!("Transport read failed: {}", e);
            self.stats.transport_errors += 1;
            self.rx.clear();
            self.enter_backoff(e, now);
            return;
        }

        match self.rx.take_frame() {
            Ok(Some(frame)) => {
                if validate_frame_crc(frame.as_slice()) {
                    self.stats.responses_received += 1;
                    debug!(
                        "RX ({} bytes): {}",
                        frame.len(),
                        format_hex_packet(frame.as_slice())
                    );
                    self.process_response(&frame, now);
                } else {
                    warn!(
                        "CRC check failed, dropping {} bytes: {}",
                        frame.len(),
                        format_hex_packet(frame.as_slice())
                    );
                    self.stats.crc_errors += 1;
                    self.last_error = Some(ModbusError::frame("CRC mismatch"));
                    self.rx.clear();
                }
                return;
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Discarding receive buffer: {}", e);
                self.rx.clear();
                self.last_error = Some(e);
            }
        }

        let elapsed = now.saturating_sub(self.last_request_ms);
        if elapsed > self.config.response_timeout_ms {
            warn!(
                "Response timeout after {}ms ({} bytes buffered)",
                elapsed,
                self.rx.len()
            );
            self.stats.timeouts += 1;
            self.rx.clear();
            let request = self.in_flight.map(|r| format!("{:?}", r)).unwrap_or_default();
            self.enter_backoff(
                ModbusError::timeout(request, self.config.response_timeout_ms),
                now,
            );
        }
    }

    /// Move everything the transport has buffered into the accumulator.
    fn drain_transport(&mut self) -> ModbusResult<()> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let read = self.transport.read_available(&mut chunk)?;
            if read == 0 {
                return Ok(());
            }
            self.stats.bytes_received += read as u64;
            if let Err(e) = self.rx.extend(&chunk[..read]) {
                warn!("Receive buffer overflow, discarding: {}", e);
                self.rx.clear();
                self.last_error = Some(e);
                return Ok(());
            }
        }
    }

    fn process_response(&mut self, frame: &ResponseFrame, now: u64) {
        let request = self.in_flight.take();
        let function = frame.function_code();

        if frame.is_error() {
            let code = frame.error_code().unwrap_or(0);
            warn!(
                "Device error response: function 0x{:02X}, code 0x{:02X}",
                function, code
            );
            self.stats.device_errors += 1;
            let err = ModbusError::DeviceError { function, code };
            if !self.identity_read || self.poll_groups.is_empty() {
                self.enter_backoff(err, now);
            } else {
                self.last_error = Some(err);
                self.state = DriverState::Idle;
            }
            return;
        }

        let applied = match function {
            FC_READ_RANGES | FC_READ_REGISTERS => self.apply_read(frame.payload()),
            FC_WRITE_REGISTERS => {
                debug!("Write acknowledged");
                true
            }
            FC_WRITE_SINGLE => {
                self.apply_write_echo(frame.payload());
                true
            }
            other => {
                warn!("Unexpected function code 0x{:02X}", other);
                self.last_error = Some(ModbusError::protocol(format!(
                    "unexpected function code 0x{:02X}",
                    other
                )));
                false
            }
        };

        match request {
            Some(InFlight::SystemId) if applied => self.finish_identity(),
            Some(InFlight::ComponentDetect) if applied => self.finish_detection(now),
            Some(InFlight::SystemId) | Some(InFlight::ComponentDetect) => {
                let err = self
                    .last_error
                    .clone()
                    .unwrap_or_else(|| ModbusError::invalid_data("setup read rejected"));
                self.enter_backoff(err, now);
            }
            Some(InFlight::PollGroup(index)) => {
                self.current_poll_group = index + 1;
                if self.current_poll_group < self.poll_groups.len() {
                    self.poll_next_group();
                } else {
                    debug!("Poll cycle complete");
                    self.state = DriverState::Idle;
                }
            }
            Some(InFlight::Write) | None => self.state = DriverState::Idle,
        }
    }

    /// Store read values against the addresses of the request.
    ///
    /// Returns `false` and leaves the cache untouched on a count mismatch.
    fn apply_read(&mut self, data: &[u8]) -> bool {
        let values = parse_register_values(data);
        if values.len() != self.expected_addresses.len() {
            warn!(
                "Register count mismatch: got {}, expected {}",
                values.len(),
                self.expected_addresses.len()
            );
            self.stats.count_mismatches += 1;
            self.last_error = Some(ModbusError::invalid_data(format!(
                "got {} registers, expected {}",
                values.len(),
                self.expected_addresses.len()
            )));
            return false;
        }
        for (&address, value) in self.expected_addresses.iter().zip(values) {
            self.cache.update(address, value);
        }
        true
    }

    fn apply_write_echo(&mut self, data: &[u8]) {
        if data.len() < 4 {
            warn!("Short write-single echo ({} bytes)", data.len());
            return;
        }
        let address = u16::from_be_bytes([data[0], data[1]]);
        let value = u16::from_be_bytes([data[2], data[3]]);
        debug!("Write-single echo: register {} = {}", address, value);
        self.cache.update(address, value);
    }

    fn finish_identity(&mut self) {
        let cache = &self.cache;
        let lookup = |address: u16| cache.get(address);
        let abc_program = decode_string(lookup, REG_ABC_PROGRAM, ABC_PROGRAM_LEN);
        let model_number = decode_string(lookup, REG_MODEL_NUMBER, MODEL_NUMBER_LEN);
        let serial_number = decode_string(lookup, REG_SERIAL_NUMBER, SERIAL_NUMBER_LEN);
        let abc_version = cache.get(REG_ABC_VERSION).unwrap_or(0);

        self.capabilities.has_vs_drive = is_vs_drive_program(&abc_program);
        info!(
            "ABC v{:.2} program '{}' model '{}' serial '{}' (VS drive: {})",
            f64::from(abc_version) / 100.0,
            abc_program,
            model_number,
            serial_number,
            self.capabilities.has_vs_drive
        );

        self.identity = SystemIdentity {
            abc_program,
            model_number,
            serial_number,
            abc_version,
        };
        self.identity_read = true;
        self.setup_in_progress = false;
        self.state = DriverState::SetupDetectComponents;
    }

    fn finish_detection(&mut self, now: u64) {
        let cache = &self.cache;
        let capabilities =
            Capabilities::detect(|address| cache.get(address), self.capabilities.has_vs_drive);
        capabilities.log_summary();

        match plan_poll_groups(&capabilities) {
            Ok(groups) => {
                info!(
                    "Setup complete, {} poll groups: {}",
                    groups.len(),
                    groups.iter().map(|g| g.name()).collect::<Vec<_>>().join(", ")
                );
                self.capabilities = capabilities;
                self.poll_groups = groups;
                self.components_detected = true;
                self.setup_in_progress = false;
                self.state = DriverState::Idle;
            }
            Err(e) => {
                error!("Could not build poll groups: {}", e);
                self.enter_backoff(e, now);
            }
        }
    }

    // ========================================================================
    // Recovery
    // ========================================================================

    fn enter_backoff(&mut self, err: ModbusError, now: u64) {
        debug!("Backing off for {}ms after: {}", self.config.error_backoff_ms, err);
        self.last_error = Some(err);
        self.in_flight = None;
        self.backoff_until_ms = now.saturating_add(self.config.error_backoff_ms);
        self.state = DriverState::ErrorBackoff;
    }

    fn resume_after_backoff(&mut self) {
        self.state = if self.setup_in_progress {
            self.setup_in_progress = false;
            if !self.identity_read {
                DriverState::SetupReadId
            } else if !self.components_detected {
                DriverState::SetupDetectComponents
            } else {
                DriverState::Idle
            }
        } else {
            DriverState::Idle
        };
        info!("Backoff elapsed, resuming in {}", self.state);
    }
}

impl<T: AuroraTransport> RegisterAccess for AuroraDriver<T> {
    fn register_listener(&mut self, address: u16, callback: RegisterCallback) {
        self.cache.register_listener(address, callback);
    }

    fn write_register(&mut self, address: u16, value: u16) {
        self.cache.enqueue_write(address, value);
    }

    fn get_register(&self, address: u16) -> Option<u16> {
        self.cache.get(address)
    }
}

impl<T: AuroraTransport> fmt::Debug for AuroraDriver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuroraDriver")
            .field("state", &self.state)
            .field("identity", &self.identity)
            .field("capabilities", &self.capabilities)
            .field("poll_groups", &self.poll_groups.len())
            .field("cache", &self.cache)
            .field("stats", &self.stats)
            .field("last_error", &self.last_error)
            .finish()
    }
}

fn flatten(ranges: &[RegisterRange]) -> Vec<u16> {
    ranges.iter().flat_map(|r| r.addresses()).collect()
}
