//! # Climate Entity
//!
//! Thermostat view of either the single-zone thermostat or one IZ2 zone.
//!
//! ## Registers
//!
//! | Zone | Ambient | Setpoints | Mode / fan | Writes |
//! |------|---------|-----------|------------|--------|
//! | Single | 747 (signed °F×10) | 745 heat, 746 cool (°F×10) | 12006 bits 8-10, 12005 | 12606 mode, 12619/12620 SP, 12621 fan |
//! | IZ2 N | 31007+(N-1)×3 | packed in config 1/2 (whole °F) | config 2 bits 8-9, config 1 | 21202+(N-1)×9, +0 mode, +1/+2 SP, +3 fan |
//!
//! Temperatures are exposed in °C. Emergency heat is reported as heat mode
//! with the boost preset.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::cache::RegisterAccess;
use crate::error::{ModbusError, ModbusResult};
use crate::registers::{
    extract_fan_mode, extract_mode_config, iz2_extract_cooling_setpoint,
    iz2_extract_fan_mode, iz2_extract_heating_setpoint, iz2_extract_mode, iz2_zone_read_base,
    iz2_zone_write_base, FanMode, HeatingMode, MAX_IZ2_ZONES, REG_AMBIENT_TEMP,
    REG_COOLING_SETPOINT, REG_FAN_CONFIG, REG_HEATING_SETPOINT, REG_MODE_CONFIG,
    REG_WRITE_COOLING_SP, REG_WRITE_FAN_MODE, REG_WRITE_HEATING_SP, REG_WRITE_MODE,
};

/// Which thermostat the entity controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimateZone {
    Single,
    /// IZ2 zone number, 1-based
    Iz2(u8),
}

impl fmt::Display for ClimateZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClimateZone::Single => write!(f, "single zone"),
            ClimateZone::Iz2(zone) => write!(f, "IZ2 zone {}", zone),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimateMode {
    Off,
    HeatCool,
    Cool,
    Heat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClimatePreset {
    #[default]
    None,
    /// Emergency heat
    Boost,
}

/// Last published climate state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClimateState {
    pub current_temperature: Option<f32>,
    pub target_temperature_low: Option<f32>,
    pub target_temperature_high: Option<f32>,
    pub mode: Option<ClimateMode>,
    pub preset: ClimatePreset,
    pub fan_mode: Option<FanMode>,
}

/// Requested changes; unset fields are left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClimateCall {
    pub mode: Option<ClimateMode>,
    pub preset: Option<ClimatePreset>,
    pub target_temperature_low: Option<f32>,
    pub target_temperature_high: Option<f32>,
    pub fan_mode: Option<FanMode>,
}

impl ClimateCall {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: ClimateMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_preset(mut self, preset: ClimatePreset) -> Self {
        self.preset = Some(preset);
        self
    }

    pub fn with_target_temperature_low(mut self, celsius: f32) -> Self {
        self.target_temperature_low = Some(celsius);
        self
    }

    pub fn with_target_temperature_high(mut self, celsius: f32) -> Self {
        self.target_temperature_high = Some(celsius);
        self
    }

    pub fn with_fan_mode(mut self, fan_mode: FanMode) -> Self {
        self.fan_mode = Some(fan_mode);
        self
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: ClimateState,
    publishes: u32,
    iz2_config1: u16,
    iz2_config2: u16,
}

impl Shared {
    fn publish(&mut self) {
        self.publishes += 1;
    }
}

/// Climate entity bound to a driver's listener and write API.
#[derive(Debug, Clone)]
pub struct Climate {
    zone: ClimateZone,
    shared: Rc<RefCell<Shared>>,
}

impl Climate {
    /// Subscribe to the zone's registers.
    ///
    /// IZ2 zones outside `1..=6` are rejected.
    pub fn attach<H: RegisterAccess>(host: &mut H, zone: ClimateZone) -> ModbusResult<Self> {
        if let ClimateZone::Iz2(n) = zone {
            if n == 0 || u16::from(n) > MAX_IZ2_ZONES {
                return Err(ModbusError::configuration(format!(
                    "IZ2 zone must be 1..={} (got {})",
                    MAX_IZ2_ZONES, n
                )));
            }
        }

        let shared = Rc::new(RefCell::new(Shared::default()));
        match zone {
            ClimateZone::Single => {
                listen(host, &shared, REG_AMBIENT_TEMP, on_ambient_temp);
                listen(host, &shared, REG_HEATING_SETPOINT, |s, v| {
                    s.state.target_temperature_low = Some(tenths_f_to_c(v));
                });
                listen(host, &shared, REG_COOLING_SETPOINT, |s, v| {
                    s.state.target_temperature_high = Some(tenths_f_to_c(v));
                });
                listen(host, &shared, REG_MODE_CONFIG, |s, v| {
                    if let Some(mode) = extract_mode_config(v) {
                        apply_heating_mode(&mut s.state, mode);
                    }
                });
                listen(host, &shared, REG_FAN_CONFIG, |s, v| {
                    s.state.fan_mode = Some(extract_fan_mode(v));
                });
            }
            ClimateZone::Iz2(n) => {
                let base = iz2_zone_read_base(n);
                listen(host, &shared, base, on_ambient_temp);
                listen(host, &shared, base + 1, on_iz2_config1);
                listen(host, &shared, base + 2, on_iz2_config2);
            }
        }
        debug!("Climate entity attached to {}", zone);

        Ok(Self { zone, shared })
    }

    pub fn zone(&self) -> ClimateZone {
        self.zone
    }

    pub fn state(&self) -> ClimateState {
        self.shared.borrow().state
    }

    /// Number of state publications so far.
    pub fn publish_count(&self) -> u32 {
        self.shared.borrow().publishes
    }

    /// Queue the writes for a call, in mode, preset, setpoints, fan order.
    ///
    /// State is not changed here; it follows the next poll.
    pub fn control<H: RegisterAccess>(&self, host: &mut H, call: &ClimateCall) {
        if let Some(mode) = call.mode {
            let raw = match mode {
                ClimateMode::Off => HeatingMode::Off,
                ClimateMode::HeatCool => HeatingMode::Auto,
                ClimateMode::Cool => HeatingMode::Cool,
                ClimateMode::Heat => HeatingMode::Heat,
            };
            host.write_register(self.mode_write_register(), raw.raw());
        }
        if call.preset == Some(ClimatePreset::Boost) {
            host.write_register(self.mode_write_register(), HeatingMode::EmergencyHeat.raw());
        }
        if let Some(celsius) = call.target_temperature_low {
            host.write_register(self.heating_setpoint_write_register(), c_to_tenths_f(celsius));
        }
        if let Some(celsius) = call.target_temperature_high {
            host.write_register(self.cooling_setpoint_write_register(), c_to_tenths_f(celsius));
        }
        if let Some(fan_mode) = call.fan_mode {
            host.write_register(self.fan_mode_write_register(), fan_mode.raw());
        }
    }

    fn mode_write_register(&self) -> u16 {
        match self.zone {
            ClimateZone::Single => REG_WRITE_MODE,
            ClimateZone::Iz2(n) => iz2_zone_write_base(n),
        }
    }

    fn heating_setpoint_write_register(&self) -> u16 {
        match self.zone {
            ClimateZone::Single => REG_WRITE_HEATING_SP,
            ClimateZone::Iz2(n) => iz2_zone_write_base(n) + 1,
        }
    }

    fn cooling_setpoint_write_register(&self) -> u16 {
        match self.zone {
            ClimateZone::Single => REG_WRITE_COOLING_SP,
            ClimateZone::Iz2(n) => iz2_zone_write_base(n) + 2,
        }
    }

    fn fan_mode_write_register(&self) -> u16 {
        match self.zone {
            ClimateZone::Single => REG_WRITE_FAN_MODE,
            ClimateZone::Iz2(n) => iz2_zone_write_base(n) + 3,
        }
    }
}

/// Register a listener that updates the shared state and publishes it.
fn listen<H, F>(host: &mut H, shared: &Rc<RefCell<Shared>>, address: u16, apply: F)
where
    H: RegisterAccess,
    F: Fn(&mut Shared, u16) + 'static,
{
    let shared = Rc::clone(shared);
    host.register_listener(
        address,
        Box::new(move |value| {
            let mut s = shared.borrow_mut();
            apply(&mut s, value);
            s.publish();
        }),
    );
}

fn on_ambient_temp(s: &mut Shared, value: u16) {
    s.state.current_temperature = Some(f_to_c(f32::from(value as i16) / 10.0));
}

fn on_iz2_config1(s: &mut Shared, value: u16) {
    s.iz2_config1 = value;
    s.state.fan_mode = Some(iz2_extract_fan_mode(value));
    s.state.target_temperature_high =
        Some(f_to_c(f32::from(iz2_extract_cooling_setpoint(value))));
    // the heating setpoint straddles both registers
    if s.iz2_config2 != 0 {
        let heat = iz2_extract_heating_setpoint(value, s.iz2_config2);
        s.state.target_temperature_low = Some(f_to_c(f32::from(heat)));
    }
}

fn on_iz2_config2(s: &mut Shared, value: u16) {
    s.iz2_config2 = value;
    if let Some(mode) = HeatingMode::from_raw(u16::from(iz2_extract_mode(value))) {
        apply_heating_mode(&mut s.state, mode);
    }
    if s.iz2_config1 != 0 {
        let heat = iz2_extract_heating_setpoint(s.iz2_config1, value);
        s.state.target_temperature_low = Some(f_to_c(f32::from(heat)));
    }
}

fn apply_heating_mode(state: &mut ClimateState, mode: HeatingMode) {
    let (mode, preset) = match mode {
        HeatingMode::Off => (ClimateMode::Off, ClimatePreset::None),
        HeatingMode::Auto => (ClimateMode::HeatCool, ClimatePreset::None),
        HeatingMode::Cool => (ClimateMode::Cool, ClimatePreset::None),
        HeatingMode::Heat => (ClimateMode::Heat, ClimatePreset::None),
        HeatingMode::EmergencyHeat => (ClimateMode::Heat, ClimatePreset::Boost),
    };
    state.mode = Some(mode);
    state.preset = preset;
}

#[inline]
fn f_to_c(fahrenheit: f32) -> f32 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

#[inline]
fn tenths_f_to_c(raw: u16) -> f32 {
    f_to_c(f32::from(raw) / 10.0)
}

/// °C to the controller's °F×10, rounded to the nearest tenth.
#[inline]
fn c_to_tenths_f(celsius: f32) -> u16 {
    let tenths = ((celsius * 9.0 / 5.0 + 32.0) * 10.0).round();
    tenths.clamp(0.0, f32::from(u16::MAX)) as u16
}
