//! # Aurora Register Map
//!
//! Static knowledge about the ABC board's register space: addresses, value
//! types and their conversions, the bit-packed thermostat/zone configuration
//! fields, the fault table and the address lists that make up each poll
//! request.
//!
//! ## Register Types
//!
//! | Type | Registers | Conversion |
//! |------|-----------|------------|
//! | Unsigned | 1 | raw |
//! | Signed | 1 | two's complement |
//! | Tenths | 1 | raw / 10 |
//! | SignedTenths | 1 | signed / 10 |
//! | Hundredths | 1 | raw / 100 |
//! | Boolean | 1 | nonzero → 1.0 |
//! | Uint32 / Int32 | 2 | high word first |
//!
//! Temperatures are reported in °F; tenths types carry one decimal.

use std::fmt;
use std::str::FromStr;

use crate::codec::RegisterRange;
use crate::error::{ModbusError, ModbusResult};

// ============================================================================
// Register Types and Conversions
// ============================================================================

/// How a raw 16-bit register value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterType {
    Unsigned,
    Signed,
    Tenths,
    SignedTenths,
    Hundredths,
    Boolean,
    /// High word of a two-register unsigned value
    Uint32,
    /// High word of a two-register signed value
    Int32,
}

impl RegisterType {
    /// Whether this type spans two consecutive registers.
    #[inline]
    pub fn is_32bit(&self) -> bool {
        matches!(self, Self::Uint32 | Self::Int32)
    }
}

impl FromStr for RegisterType {
    type Err = ModbusError;

    fn from_str(s: &str) -> ModbusResult<Self> {
        match s.to_lowercase().as_str() {
            "unsigned" | "uint16" | "u16" => Ok(Self::Unsigned),
            "signed" | "int16" | "i16" => Ok(Self::Signed),
            "tenths" => Ok(Self::Tenths),
            "signed_tenths" => Ok(Self::SignedTenths),
            "hundredths" => Ok(Self::Hundredths),
            "boolean" | "bool" => Ok(Self::Boolean),
            "uint32" | "u32" => Ok(Self::Uint32),
            "int32" | "i32" => Ok(Self::Int32),
            _ => Err(ModbusError::invalid_data(format!(
                "Unsupported register type: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for RegisterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unsigned => "unsigned",
            Self::Signed => "signed",
            Self::Tenths => "tenths",
            Self::SignedTenths => "signed_tenths",
            Self::Hundredths => "hundredths",
            Self::Boolean => "boolean",
            Self::Uint32 => "uint32",
            Self::Int32 => "int32",
        };
        write!(f, "{}", name)
    }
}

/// Convert a raw register value to its physical quantity.
///
/// 32-bit types need both words; given a single word they pass it through
/// unchanged. Use [`to_u32`] / [`to_i32`] for the pair.
pub fn convert(raw: u16, register_type: RegisterType) -> f64 {
    match register_type {
        RegisterType::Unsigned | RegisterType::Uint32 | RegisterType::Int32 => f64::from(raw),
        RegisterType::Signed => f64::from(raw as i16),
        RegisterType::Tenths => f64::from(raw) / 10.0,
        RegisterType::SignedTenths => f64::from(raw as i16) / 10.0,
        RegisterType::Hundredths => f64::from(raw) / 100.0,
        RegisterType::Boolean => {
            if raw != 0 {
                1.0
            } else {
                0.0
            }
        }
    }
}

/// Combine two registers, high word first.
#[inline]
pub fn to_u32(hi: u16, lo: u16) -> u32 {
    (u32::from(hi) << 16) | u32::from(lo)
}

/// Combine two registers, high word first, as two's complement.
#[inline]
pub fn to_i32(hi: u16, lo: u16) -> i32 {
    to_u32(hi, lo) as i32
}

// ============================================================================
// System Identification
// ============================================================================

/// ABC firmware version (hundredths)
pub const REG_ABC_VERSION: u16 = 2;
/// ABC program name, 4 registers of packed ASCII
pub const REG_ABC_PROGRAM: u16 = 88;
pub const ABC_PROGRAM_LEN: u16 = 4;
/// Model number, 12 registers of packed ASCII
pub const REG_MODEL_NUMBER: u16 = 92;
pub const MODEL_NUMBER_LEN: u16 = 12;
/// Serial number, 5 registers of packed ASCII
pub const REG_SERIAL_NUMBER: u16 = 105;
pub const SERIAL_NUMBER_LEN: u16 = 5;
pub const REG_IZ2_ZONE_COUNT: u16 = 483;

pub const REG_BLOWER_TYPE: u16 = 404;
pub const REG_COMPRESSOR_HZ: u16 = 412;
pub const REG_PUMP_TYPE: u16 = 413;

pub const BLOWER_PSC: u16 = 0;
pub const BLOWER_ECM_230: u16 = 1;
pub const BLOWER_ECM_277: u16 = 2;
pub const BLOWER_5SPD_460: u16 = 3;

/// Program names of ABC boards driving a variable-speed compressor
pub const VS_DRIVE_PROGRAMS: [&str; 3] = ["ABCVSP", "ABCVSPR", "ABCSPLVS"];

#[inline]
pub fn is_vs_drive_program(program: &str) -> bool {
    VS_DRIVE_PROGRAMS.contains(&program)
}

/// Decode packed ASCII, two characters per register (high byte first).
///
/// Zero bytes are skipped, decoding stops at the first register `lookup`
/// does not know, and trailing spaces/NULs are trimmed.
pub fn decode_string<F>(lookup: F, start: u16, num_regs: u16) -> String
where
    F: Fn(u16) -> Option<u16>,
{
    let mut result = String::with_capacity(usize::from(num_regs) * 2);
    for address in RegisterRange::new(start, num_regs).addresses() {
        let value = match lookup(address) {
            Some(value) => value,
            None => break,
        };
        for byte in value.to_be_bytes() {
            if byte != 0 {
                result.push(char::from(byte));
            }
        }
    }
    let trimmed = result.trim_end_matches([' ', '\0']).len();
    result.truncate(trimmed);
    result
}

// ============================================================================
// Component Detection
// ============================================================================

pub const REG_THERMOSTAT_STATUS: u16 = 800;
pub const REG_THERMOSTAT_VERSION: u16 = 801;
pub const REG_AXB_STATUS: u16 = 806;
pub const REG_AXB_VERSION: u16 = 807;
pub const REG_IZ2_STATUS: u16 = 812;
pub const REG_IZ2_VERSION: u16 = 813;
pub const REG_AOC_STATUS: u16 = 815;
pub const REG_MOC_STATUS: u16 = 818;
pub const REG_EEV2_STATUS: u16 = 824;
pub const REG_AWL_STATUS: u16 = 827;

pub const COMPONENT_ACTIVE: u16 = 1;
pub const COMPONENT_ADDED: u16 = 2;
pub const COMPONENT_REMOVED: u16 = 3;
pub const COMPONENT_MISSING: u16 = 0xFFFF;

/// A component counts as installed unless it reports removed, missing or zero.
#[inline]
pub fn component_present(status: u16) -> bool {
    !matches!(status, 0 | COMPONENT_REMOVED | COMPONENT_MISSING)
}

/// Minimum thermostat firmware (hundredths) for AWL register semantics
pub const AWL_THERMOSTAT_MIN_VERSION: u16 = 300;
/// Minimum AXB / IZ2 firmware (hundredths) for AWL register semantics
pub const AWL_AXB_MIN_VERSION: u16 = 200;
pub const AWL_IZ2_MIN_VERSION: u16 = 200;

/// Largest zone count an IZ2 controller reports
pub const MAX_IZ2_ZONES: u16 = 6;

// ============================================================================
// Status Registers
// ============================================================================

pub const REG_LINE_VOLTAGE: u16 = 16;
/// Cooling liquid line temperature (signed tenths)
pub const REG_FP1_TEMP: u16 = 19;
/// Air coil temperature (signed tenths)
pub const REG_FP2_TEMP: u16 = 20;
/// Bit 15 = lockout, bits 0-14 = fault code
pub const REG_LAST_FAULT: u16 = 25;
pub const REG_LAST_LOCKOUT: u16 = 26;
pub const REG_SYSTEM_OUTPUTS: u16 = 30;
pub const REG_SYSTEM_INPUTS: u16 = 31;
pub const REG_STATUS1: u16 = 344;
pub const REG_STATUS2: u16 = 362;
/// Compressor demand (signed tenths)
pub const REG_DEMAND: u16 = 502;

// System output bits (register 30)
pub const OUTPUT_CC: u16 = 0x01;
pub const OUTPUT_CC2: u16 = 0x02;
pub const OUTPUT_RV: u16 = 0x04;
pub const OUTPUT_BLOWER: u16 = 0x08;
pub const OUTPUT_EH1: u16 = 0x10;
pub const OUTPUT_EH2: u16 = 0x20;
pub const OUTPUT_ACCESSORY: u16 = 0x200;
pub const OUTPUT_LOCKOUT: u16 = 0x400;
pub const OUTPUT_ALARM: u16 = 0x800;

// ============================================================================
// Thermostat (single zone)
// ============================================================================

pub const REG_ENTERING_AIR: u16 = 740;
pub const REG_HUMIDITY: u16 = 741;
pub const REG_OUTDOOR_TEMP: u16 = 742;
/// Heating setpoint (tenths °F)
pub const REG_HEATING_SETPOINT: u16 = 745;
/// Cooling setpoint (tenths °F)
pub const REG_COOLING_SETPOINT: u16 = 746;
/// Ambient temperature (signed tenths °F)
pub const REG_AMBIENT_TEMP: u16 = 747;

/// Bit-packed fan configuration
pub const REG_FAN_CONFIG: u16 = 12005;
/// Bit-packed heating mode, mode in bits 8-10
pub const REG_MODE_CONFIG: u16 = 12006;

pub const REG_WRITE_MODE: u16 = 12606;
/// Heating setpoint write (tenths °F)
pub const REG_WRITE_HEATING_SP: u16 = 12619;
/// Cooling setpoint write (tenths °F)
pub const REG_WRITE_COOLING_SP: u16 = 12620;
pub const REG_WRITE_FAN_MODE: u16 = 12621;
pub const REG_WRITE_FAN_ON_TIME: u16 = 12622;
pub const REG_WRITE_FAN_OFF_TIME: u16 = 12623;

/// Heating mode values shared by the thermostat and IZ2 zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeatingMode {
    Off = 0,
    Auto = 1,
    Cool = 2,
    Heat = 3,
    EmergencyHeat = 4,
}

impl HeatingMode {
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Self::Off),
            1 => Some(Self::Auto),
            2 => Some(Self::Cool),
            3 => Some(Self::Heat),
            4 => Some(Self::EmergencyHeat),
            _ => None,
        }
    }

    #[inline]
    pub fn raw(self) -> u16 {
        self as u16
    }
}

/// Fan mode values shared by the thermostat and IZ2 zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FanMode {
    Auto = 0,
    Continuous = 1,
    Intermittent = 2,
}

impl FanMode {
    #[inline]
    pub fn raw(self) -> u16 {
        self as u16
    }
}

/// Single-zone mode field of register 12006.
#[inline]
pub fn extract_mode_config(value: u16) -> Option<HeatingMode> {
    HeatingMode::from_raw((value >> 8) & 0x07)
}

/// Fan mode bits of register 12005 and of IZ2 configuration 1.
///
/// The continuous bit wins over the intermittent bit.
#[inline]
pub fn extract_fan_mode(value: u16) -> FanMode {
    if value & 0x80 != 0 {
        FanMode::Continuous
    } else if value & 0x100 != 0 {
        FanMode::Intermittent
    } else {
        FanMode::Auto
    }
}

// ============================================================================
// IZ2 Zones
// ============================================================================

/// Per zone +0 ambient, +1 configuration 1, +2 configuration 2
pub const REG_IZ2_ZONE_BASE: u16 = 31007;
/// Per zone +0 priority/size
pub const REG_IZ2_ZONE_CONFIG3_BASE: u16 = 31200;
/// Per zone +0 mode, +1 heating SP, +2 cooling SP, +3 fan, +4 fan on, +5 fan off
pub const REG_IZ2_WRITE_BASE: u16 = 21202;

const IZ2_READ_STRIDE: u16 = 3;
const IZ2_WRITE_STRIDE: u16 = 9;
const IZ2_SETPOINT_FLOOR: u8 = 36;

/// First read register of a 1-based zone number.
#[inline]
pub fn iz2_zone_read_base(zone: u8) -> u16 {
    REG_IZ2_ZONE_BASE + u16::from(zone.saturating_sub(1)) * IZ2_READ_STRIDE
}

/// First write register of a 1-based zone number.
#[inline]
pub fn iz2_zone_write_base(zone: u8) -> u16 {
    REG_IZ2_WRITE_BASE + u16::from(zone.saturating_sub(1)) * IZ2_WRITE_STRIDE
}

/// Operating mode from configuration 2, bits 8-9.
#[inline]
pub fn iz2_extract_mode(config2: u16) -> u8 {
    ((config2 >> 8) & 0x03) as u8
}

/// Fan mode from configuration 1.
#[inline]
pub fn iz2_extract_fan_mode(config1: u16) -> FanMode {
    extract_fan_mode(config1)
}

/// Cooling setpoint (whole °F) from configuration 1, bits 1-6.
#[inline]
pub fn iz2_extract_cooling_setpoint(config1: u16) -> u8 {
    ((config1 & 0x7E) >> 1) as u8 + IZ2_SETPOINT_FLOOR
}

/// Heating setpoint (whole °F): carry bit 0 of configuration 1 above
/// bits 11-15 of configuration 2.
#[inline]
pub fn iz2_extract_heating_setpoint(config1: u16, config2: u16) -> u8 {
    let carry = config1 & 0x01;
    ((carry << 5) | ((config2 & 0xF800) >> 11)) as u8 + IZ2_SETPOINT_FLOOR
}

#[inline]
pub fn iz2_damper_open(config2: u16) -> bool {
    config2 & 0x10 != 0
}

// ============================================================================
// AXB, Power and VS Drive Registers
// ============================================================================

pub const REG_AXB_INPUTS: u16 = 1103;
pub const REG_AXB_OUTPUTS: u16 = 1104;
pub const REG_BLOWER_AMPS: u16 = 1105;
pub const REG_AUX_AMPS: u16 = 1106;
pub const REG_COMPRESSOR_AMPS: u16 = 1107;
pub const REG_AIR_COIL_AMPS: u16 = 1108;

pub const REG_LEAVING_AIR: u16 = 900;
pub const REG_OUTDOOR_TEMP2: u16 = 1109;
pub const REG_LEAVING_WATER: u16 = 1110;
pub const REG_ENTERING_WATER: u16 = 1111;
pub const REG_SUPERHEAT_TEMP: u16 = 1112;
pub const REG_SUCTION_TEMP: u16 = 1113;
pub const REG_DHW_TEMP: u16 = 1114;
pub const REG_DISCHARGE_PRESSURE: u16 = 1115;
pub const REG_SUCTION_PRESSURE: u16 = 1116;
pub const REG_WATERFLOW: u16 = 1117;
pub const REG_LOOP_PRESSURE: u16 = 1119;
pub const REG_SUBCOOLING: u16 = 1124;
pub const REG_SUPERHEAT: u16 = 1125;
pub const REG_APPROACH: u16 = 1134;
pub const REG_EEV_OPEN: u16 = 1135;
pub const REG_EEV_CALC: u16 = 1136;

// 32-bit values, high word at the listed address
pub const REG_COMPRESSOR_WATTS: u16 = 1146;
pub const REG_BLOWER_WATTS: u16 = 1148;
pub const REG_AUX_HEAT_WATTS: u16 = 1150;
pub const REG_TOTAL_WATTS: u16 = 1152;
pub const REG_HEAT_EXTRACTION: u16 = 1154;
pub const REG_HEAT_REJECTION: u16 = 1156;
pub const REG_PUMP_WATTS: u16 = 1164;

pub const REG_VS_SPEED_DESIRED: u16 = 3000;
pub const REG_VS_SPEED_ACTUAL: u16 = 3001;
pub const REG_VS_DRIVE_STATUS: u16 = 3220;
pub const REG_VS_DISCHARGE_PRESS: u16 = 3322;
pub const REG_VS_SUCTION_PRESS: u16 = 3323;
pub const REG_VS_DISCHARGE_TEMP: u16 = 3325;
pub const REG_VS_INVERTER_TEMP: u16 = 3522;
pub const REG_VS_FAN_SPEED: u16 = 3524;

pub const REG_DHW_ENABLE: u16 = 400;
/// DHW setpoint (tenths °F)
pub const REG_DHW_SETPOINT: u16 = 401;

// ============================================================================
// Faults
// ============================================================================

/// Fault code descriptions reported in the low 15 bits of register 25.
pub const FAULT_TABLE: [(u16, &str); 26] = [
    (1, "Input Error"),
    (2, "High Pressure"),
    (3, "Low Pressure"),
    (4, "Freeze Detect FP2"),
    (5, "Freeze Detect FP1"),
    (7, "Condensate Overflow"),
    (8, "Over/Under Voltage"),
    (9, "AirF/RPM"),
    (10, "Compressor Monitor"),
    (11, "FP1/2 Sensor Error"),
    (12, "RefPerfrm Error"),
    (13, "Non-Critical AXB Sensor Error"),
    (14, "Critical AXB Sensor Error"),
    (15, "Hot Water Limit"),
    (16, "VS Pump Error"),
    (17, "Communicating Thermostat Error"),
    (18, "Non-Critical Comms Error"),
    (19, "Critical Comms Error"),
    (21, "Low Loop Pressure"),
    (22, "Communicating ECM Error"),
    (23, "HA Alarm 1"),
    (24, "HA Alarm 2"),
    (25, "AxbEev Error"),
    (41, "High Drive Temp"),
    (42, "High Discharge Temp"),
    (99, "System Reset"),
];

pub const UNKNOWN_FAULT: &str = "Unknown Fault";

/// Description of a fault code, or "Unknown Fault".
pub fn fault_description(code: u16) -> &'static str {
    FAULT_TABLE
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, description)| *description)
        .unwrap_or(UNKNOWN_FAULT)
}

/// Decoded fault register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultStatus {
    pub code: u16,
    pub lockout: bool,
}

impl FaultStatus {
    #[inline]
    pub fn from_raw(raw: u16) -> Self {
        Self {
            code: raw & 0x7FFF,
            lockout: raw & 0x8000 != 0,
        }
    }

    #[inline]
    pub fn is_fault(&self) -> bool {
        self.code != 0
    }

    #[inline]
    pub fn description(&self) -> &'static str {
        fault_description(self.code)
    }
}

impl fmt::Display for FaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_fault() {
            return write!(f, "No Fault");
        }
        write!(f, "E{} {}", self.code, self.description())?;
        if self.lockout {
            write!(f, " (LOCKOUT)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Poll Range Lists
// ============================================================================

/// Read once at setup: versions, identity strings, DHW, blower and pump type
pub const SYSTEM_ID_RANGES: [RegisterRange; 7] = [
    RegisterRange::new(REG_ABC_VERSION, 1),
    RegisterRange::new(REG_ABC_PROGRAM, ABC_PROGRAM_LEN),
    RegisterRange::new(REG_MODEL_NUMBER, MODEL_NUMBER_LEN),
    RegisterRange::new(REG_SERIAL_NUMBER, SERIAL_NUMBER_LEN),
    RegisterRange::new(REG_DHW_ENABLE, 2),
    RegisterRange::new(REG_BLOWER_TYPE, 1),
    RegisterRange::new(REG_COMPRESSOR_HZ, 2),
];

/// Read once at setup: status, version and revision of each component
pub const COMPONENT_DETECT_RANGES: [RegisterRange; 8] = [
    RegisterRange::new(REG_THERMOSTAT_STATUS, 3),
    RegisterRange::new(REG_AXB_STATUS, 3),
    RegisterRange::new(REG_IZ2_STATUS, 3),
    RegisterRange::new(REG_AOC_STATUS, 3),
    RegisterRange::new(REG_MOC_STATUS, 3),
    RegisterRange::new(REG_EEV2_STATUS, 3),
    RegisterRange::new(REG_AWL_STATUS, 3),
    RegisterRange::new(REG_IZ2_ZONE_COUNT, 1),
];

/// Always polled
pub const THERMOSTAT_RANGES: [RegisterRange; 6] = [
    RegisterRange::new(REG_FP1_TEMP, 2),
    RegisterRange::new(REG_LAST_FAULT, 2),
    RegisterRange::new(REG_SYSTEM_OUTPUTS, 2),
    RegisterRange::new(REG_DEMAND, 1),
    RegisterRange::new(REG_ENTERING_AIR, 3),
    RegisterRange::new(REG_HEATING_SETPOINT, 3),
];

/// AWL thermostat without IZ2
pub const THERMOSTAT_CONFIG_REGISTERS: [u16; 2] = [REG_FAN_CONFIG, REG_MODE_CONFIG];

/// AXB performance block
pub const AXB_RANGES: [RegisterRange; 6] = [
    RegisterRange::new(REG_DHW_ENABLE, 2),
    RegisterRange::new(REG_LEAVING_AIR, 1),
    RegisterRange::new(REG_AXB_INPUTS, 6),
    RegisterRange::new(REG_OUTDOOR_TEMP2, 11),
    RegisterRange::new(REG_SUBCOOLING, 2),
    RegisterRange::new(REG_APPROACH, 3),
];

/// Line voltage and 32-bit power readings
pub const POWER_RANGES: [RegisterRange; 3] = [
    RegisterRange::new(REG_LINE_VOLTAGE, 1),
    RegisterRange::new(REG_COMPRESSOR_WATTS, 12),
    RegisterRange::new(REG_PUMP_WATTS, 2),
];

/// Variable-speed compressor drive telemetry
pub const VS_DRIVE_RANGES: [RegisterRange; 5] = [
    RegisterRange::new(REG_VS_SPEED_DESIRED, 2),
    RegisterRange::new(REG_VS_DRIVE_STATUS, 8),
    RegisterRange::new(REG_VS_DISCHARGE_PRESS, 9),
    RegisterRange::new(REG_VS_INVERTER_TEMP, 1),
    RegisterRange::new(REG_VS_FAN_SPEED, 1),
];

/// Zone blocks for `zone_count` zones, three registers per zone at each base.
pub fn iz2_ranges(zone_count: u8) -> Vec<RegisterRange> {
    if zone_count == 0 {
        return Vec::new();
    }
    let count = u16::from(zone_count) * IZ2_READ_STRIDE;
    vec![
        RegisterRange::new(REG_IZ2_ZONE_BASE, count),
        RegisterRange::new(REG_IZ2_ZONE_CONFIG3_BASE, count),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn total(ranges: &[RegisterRange]) -> usize {
        ranges.iter().map(|r| usize::from(r.count)).sum()
    }

    #[test]
    fn test_convert() {
        assert_eq!(convert(705, RegisterType::Unsigned), 705.0);
        assert_eq!(convert(0xFF9C, RegisterType::Signed), -100.0);
        assert!((convert(705, RegisterType::Tenths) - 70.5).abs() < 1e-9);
        assert!((convert((-105i16) as u16, RegisterType::SignedTenths) + 10.5).abs() < 1e-9);
        assert!((convert(705, RegisterType::Hundredths) - 7.05).abs() < 1e-9);
        assert_eq!(convert(42, RegisterType::Boolean), 1.0);
        assert_eq!(convert(0, RegisterType::Boolean), 0.0);
    }

    #[test]
    fn test_32bit_assembly() {
        assert_eq!(to_u32(0x0001, 0x0002), 0x0001_0002);
        assert_eq!(to_u32(0, 3500), 3500);
        assert_eq!(to_i32(0xFFFF, 0xFFFF), -1);
        assert_eq!(to_i32(0xFFFF, 0xFF38), -200);
    }

    #[test]
    fn test_register_type_from_str() {
        assert_eq!("signed_tenths".parse::<RegisterType>().unwrap(), RegisterType::SignedTenths);
        assert_eq!("UINT32".parse::<RegisterType>().unwrap(), RegisterType::Uint32);
        assert!("float".parse::<RegisterType>().is_err());
        assert!(RegisterType::Int32.is_32bit());
        assert!(!RegisterType::Tenths.is_32bit());
        assert_eq!(RegisterType::Hundredths.to_string(), "hundredths");
    }

    #[test]
    fn test_decode_string() {
        let regs: HashMap<u16, u16> =
            [(88, 16706), (89, 17235), (90, 20556), (91, 22099)].into_iter().collect();
        assert_eq!(decode_string(|a| regs.get(&a).copied(), 88, 4), "ABCSPLVS");
    }

    #[test]
    fn test_decode_string_skips_zero_and_trims() {
        // "SN1" then a zero byte, then padding spaces
        let regs: HashMap<u16, u16> =
            [(105, 0x534E), (106, 0x3100), (107, 0x2020)].into_iter().collect();
        assert_eq!(decode_string(|a| regs.get(&a).copied(), 105, 5), "SN1");
    }

    #[test]
    fn test_decode_string_stops_at_missing_register() {
        let regs: HashMap<u16, u16> = [(92, 0x4142), (94, 0x4344)].into_iter().collect();
        assert_eq!(decode_string(|a| regs.get(&a).copied(), 92, 12), "AB");
    }

    #[test]
    fn test_vs_drive_programs() {
        assert!(is_vs_drive_program("ABCVSP"));
        assert!(is_vs_drive_program("ABCVSPR"));
        assert!(is_vs_drive_program("ABCSPLVS"));
        assert!(!is_vs_drive_program("ABCSPL"));
        assert!(!is_vs_drive_program(""));
    }

    #[test]
    fn test_component_present() {
        assert!(component_present(COMPONENT_ACTIVE));
        assert!(component_present(COMPONENT_ADDED));
        assert!(!component_present(COMPONENT_REMOVED));
        assert!(!component_present(COMPONENT_MISSING));
        assert!(!component_present(0));
    }

    #[test]
    fn test_iz2_setpoints() {
        assert_eq!(iz2_extract_cooling_setpoint(0x007E), 99);
        assert_eq!(iz2_extract_cooling_setpoint(0x0000), 36);
        assert_eq!(iz2_extract_cooling_setpoint(0x004E), 75);
        assert_eq!(iz2_extract_heating_setpoint(0x0001, 0x0000), 68);
        assert_eq!(iz2_extract_heating_setpoint(0x0001, 0x2000), 72);
        assert_eq!(iz2_extract_heating_setpoint(0x0000, 0x0000), 36);
    }

    #[test]
    fn test_iz2_mode_fan_damper() {
        assert_eq!(iz2_extract_mode(0x0100), 1);
        assert_eq!(iz2_extract_mode(0x0200), 2);
        assert_eq!(iz2_extract_mode(0x0300), 3);
        assert_eq!(iz2_extract_fan_mode(0x0080), FanMode::Continuous);
        assert_eq!(iz2_extract_fan_mode(0x0180), FanMode::Continuous);
        assert_eq!(iz2_extract_fan_mode(0x0100), FanMode::Intermittent);
        assert_eq!(iz2_extract_fan_mode(0x0000), FanMode::Auto);
        assert!(iz2_damper_open(0x0010));
        assert!(!iz2_damper_open(0x0020));
    }

    #[test]
    fn test_iz2_zone_addresses() {
        assert_eq!(iz2_zone_read_base(1), 31007);
        assert_eq!(iz2_zone_read_base(3), 31013);
        assert_eq!(iz2_zone_write_base(1), 21202);
        assert_eq!(iz2_zone_write_base(2), 21211);
    }

    #[test]
    fn test_single_zone_mode_config() {
        assert_eq!(extract_mode_config(0x0100), Some(HeatingMode::Auto));
        assert_eq!(extract_mode_config(0x0400), Some(HeatingMode::EmergencyHeat));
        assert_eq!(extract_mode_config(0x0000), Some(HeatingMode::Off));
        assert_eq!(extract_mode_config(0x0700), None);
    }

    #[test]
    fn test_fault_status() {
        assert_eq!(FaultStatus::from_raw(0).to_string(), "No Fault");
        assert_eq!(FaultStatus::from_raw(2).to_string(), "E2 High Pressure");
        assert_eq!(
            FaultStatus::from_raw(0x8000 | 5).to_string(),
            "E5 Freeze Detect FP1 (LOCKOUT)"
        );
        assert_eq!(FaultStatus::from_raw(6).description(), UNKNOWN_FAULT);
        assert_eq!(fault_description(99), "System Reset");
    }

    #[test]
    fn test_poll_range_sizes() {
        assert_eq!(total(&SYSTEM_ID_RANGES), 27);
        assert_eq!(total(&COMPONENT_DETECT_RANGES), 22);
        assert_eq!(total(&THERMOSTAT_RANGES), 13);
        assert_eq!(total(&AXB_RANGES), 25);
        assert_eq!(total(&POWER_RANGES), 15);
        assert_eq!(total(&VS_DRIVE_RANGES), 21);
    }

    #[test]
    fn test_iz2_ranges() {
        assert!(iz2_ranges(0).is_empty());
        assert_eq!(
            iz2_ranges(2),
            vec![RegisterRange::new(31007, 6), RegisterRange::new(31200, 6)]
        );
        assert_eq!(total(&iz2_ranges(6)), 36);
    }

    #[test]
    fn test_power_pairs_share_a_range() {
        // Both words of every 32-bit reading must come back in one response
        for hi in [
            REG_COMPRESSOR_WATTS,
            REG_BLOWER_WATTS,
            REG_AUX_HEAT_WATTS,
            REG_TOTAL_WATTS,
            REG_HEAT_EXTRACTION,
            REG_HEAT_REJECTION,
            REG_PUMP_WATTS,
        ] {
            assert!(POWER_RANGES.iter().any(|r| {
                let addrs: Vec<u16> = r.addresses().collect();
                addrs.contains(&hi) && addrs.contains(&(hi + 1))
            }));
        }
    }
}
