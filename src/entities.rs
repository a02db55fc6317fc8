//! Sensor, switch and text entities
//!
//! Each entity subscribes to one or more registers when attached and keeps
//! its last published state behind an `Rc<RefCell<_>>` shared with the
//! listener closures. Nothing here does I/O: switches queue writes through
//! the host like every other consumer.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::cache::RegisterAccess;
use crate::registers::{
    convert, decode_string, to_i32, to_u32, FaultStatus, RegisterType, ABC_PROGRAM_LEN,
    MODEL_NUMBER_LEN, OUTPUT_BLOWER, OUTPUT_CC, OUTPUT_EH1, OUTPUT_LOCKOUT, OUTPUT_RV,
    REG_ABC_PROGRAM, REG_LAST_FAULT, REG_MODEL_NUMBER, REG_SERIAL_NUMBER, REG_SYSTEM_OUTPUTS,
    SERIAL_NUMBER_LEN,
};

/// Last published value and how many times it was published.
#[derive(Debug)]
struct Published<T> {
    value: Option<T>,
    count: u32,
}

impl<T> Default for Published<T> {
    fn default() -> Self {
        Self {
            value: None,
            count: 0,
        }
    }
}

type Shared<T> = Rc<RefCell<Published<T>>>;

fn publish<T>(shared: &Shared<T>, value: T) {
    let mut slot = shared.borrow_mut();
    slot.value = Some(value);
    slot.count += 1;
}

// ============================================================================
// Numeric sensor
// ============================================================================

/// Register value converted to its physical quantity.
///
/// 32-bit types listen to the high word at `address` and the low word at
/// `address + 1`; a value is published on the low word once a high word has
/// been seen.
#[derive(Debug, Clone)]
pub struct NumericSensor {
    name: String,
    address: u16,
    register_type: RegisterType,
    state: Shared<f64>,
}

impl NumericSensor {
    pub fn attach<H: RegisterAccess>(
        host: &mut H,
        name: impl Into<String>,
        address: u16,
        register_type: RegisterType,
    ) -> Self {
        let name = name.into();
        let state: Shared<f64> = Rc::default();

        if register_type.is_32bit() {
            let hi_word = Rc::new(RefCell::new(None::<u16>));

            let hi = Rc::clone(&hi_word);
            host.register_listener(address, Box::new(move |v| *hi.borrow_mut() = Some(v)));

            let hi = Rc::clone(&hi_word);
            let out = Rc::clone(&state);
            host.register_listener(
                address.wrapping_add(1),
                Box::new(move |lo| {
                    let Some(hi) = *hi.borrow() else {
                        return;
                    };
                    let value = match register_type {
                        RegisterType::Int32 => f64::from(to_i32(hi, lo)),
                        _ => f64::from(to_u32(hi, lo)),
                    };
                    publish(&out, value);
                }),
            );
        } else {
            let out = Rc::clone(&state);
            host.register_listener(
                address,
                Box::new(move |v| publish(&out, convert(v, register_type))),
            );
        }
        debug!(
            "Sensor '{}' on register {} ({}, 32-bit: {})",
            name,
            address,
            register_type,
            register_type.is_32bit()
        );

        Self {
            name,
            address,
            register_type,
            state,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn register_type(&self) -> RegisterType {
        self.register_type
    }

    pub fn state(&self) -> Option<f64> {
        self.state.borrow().value
    }

    pub fn publish_count(&self) -> u32 {
        self.state.borrow().count
    }
}

// ============================================================================
// Binary sensor
// ============================================================================

/// `true` while any bit of `mask` is set in the register.
#[derive(Debug, Clone)]
pub struct BinarySensor {
    name: String,
    address: u16,
    mask: u16,
    state: Shared<bool>,
}

impl BinarySensor {
    pub fn attach<H: RegisterAccess>(
        host: &mut H,
        name: impl Into<String>,
        address: u16,
        mask: u16,
    ) -> Self {
        let name = name.into();
        let state: Shared<bool> = Rc::default();
        let out = Rc::clone(&state);
        host.register_listener(address, Box::new(move |v| publish(&out, v & mask != 0)));
        debug!("Binary sensor '{}' on register {} mask 0x{:04X}", name, address, mask);

        Self {
            name,
            address,
            mask,
            state,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn mask(&self) -> u16 {
        self.mask
    }

    pub fn state(&self) -> Option<bool> {
        self.state.borrow().value
    }
}

// ============================================================================
// Switch
// ============================================================================

/// On/off register with a separate write address.
///
/// Turning the switch queues a write and publishes the new state right
/// away; the next poll confirms or corrects it.
#[derive(Debug, Clone)]
pub struct Switch {
    name: String,
    read_address: u16,
    write_address: u16,
    state: Shared<bool>,
}

impl Switch {
    pub fn attach<H: RegisterAccess>(
        host: &mut H,
        name: impl Into<String>,
        read_address: u16,
        write_address: u16,
    ) -> Self {
        let name = name.into();
        let state: Shared<bool> = Rc::default();
        let out = Rc::clone(&state);
        host.register_listener(read_address, Box::new(move |v| publish(&out, v != 0)));
        debug!(
            "Switch '{}' reads register {}, writes register {}",
            name, read_address, write_address
        );

        Self {
            name,
            read_address,
            write_address,
            state,
        }
    }

    pub fn turn_on<H: RegisterAccess>(&self, host: &mut H) {
        self.write_state(host, true);
    }

    pub fn turn_off<H: RegisterAccess>(&self, host: &mut H) {
        self.write_state(host, false);
    }

    fn write_state<H: RegisterAccess>(&self, host: &mut H, on: bool) {
        host.write_register(self.write_address, u16::from(on));
        publish(&self.state, on);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn read_address(&self) -> u16 {
        self.read_address
    }

    pub fn write_address(&self) -> u16 {
        self.write_address
    }

    pub fn state(&self) -> Option<bool> {
        self.state.borrow().value
    }
}

// ============================================================================
// Text sensors
// ============================================================================

/// What a [`TextSensor`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    /// Last fault with description and lockout marker
    Fault,
    /// Operating mode derived from the system outputs
    Mode,
    Model,
    Serial,
    Program,
}

impl TextKind {
    /// Registers behind an identity string: (start, count).
    fn identity_block(self) -> Option<(u16, u16)> {
        match self {
            TextKind::Model => Some((REG_MODEL_NUMBER, MODEL_NUMBER_LEN)),
            TextKind::Serial => Some((REG_SERIAL_NUMBER, SERIAL_NUMBER_LEN)),
            TextKind::Program => Some((REG_ABC_PROGRAM, ABC_PROGRAM_LEN)),
            TextKind::Fault | TextKind::Mode => None,
        }
    }
}

/// Operating mode text for the system-outputs register, highest priority first.
pub fn operating_mode_text(outputs: u16) -> &'static str {
    if outputs & OUTPUT_LOCKOUT != 0 {
        "Lockout"
    } else if outputs & OUTPUT_EH1 != 0 {
        "Emergency Heat"
    } else if outputs & OUTPUT_CC != 0 && outputs & OUTPUT_RV != 0 {
        "Cooling"
    } else if outputs & OUTPUT_CC != 0 {
        "Heating"
    } else if outputs & OUTPUT_BLOWER != 0 {
        "Fan Only"
    } else {
        "Idle"
    }
}

fn fault_text(raw: u16) -> String {
    FaultStatus::from_raw(raw).to_string()
}

fn mode_text(outputs: u16) -> String {
    operating_mode_text(outputs).to_string()
}

/// Human-readable status string.
#[derive(Debug, Clone)]
pub struct TextSensor {
    name: String,
    kind: TextKind,
    state: Shared<String>,
}

impl TextSensor {
    /// Subscribe to the registers behind `kind`.
    ///
    /// Identity strings are rebuilt from their own register block whenever
    /// the last register of the block updates. If the host already holds the
    /// whole block, the string is published immediately.
    pub fn attach<H: RegisterAccess>(host: &mut H, name: impl Into<String>, kind: TextKind) -> Self {
        let name = name.into();
        let state: Shared<String> = Rc::default();

        match kind.identity_block() {
            None => {
                let out = Rc::clone(&state);
                let address = if kind == TextKind::Fault {
                    REG_LAST_FAULT
                } else {
                    REG_SYSTEM_OUTPUTS
                };
                host.register_listener(
                    address,
                    Box::new(move |v| {
                        let text = match kind {
                            TextKind::Fault => fault_text(v),
                            _ => mode_text(v),
                        };
                        publish(&out, text);
                    }),
                );
            }
            Some((start, count)) => {
                let words: Rc<RefCell<HashMap<u16, u16>>> = Rc::default();
                let last = start + count - 1;
                for address in start..=last {
                    let words = Rc::clone(&words);
                    let out = Rc::clone(&state);
                    host.register_listener(
                        address,
                        Box::new(move |v| {
                            words.borrow_mut().insert(address, v);
                            if address == last {
                                let words = words.borrow();
                                let text =
                                    decode_string(|a| words.get(&a).copied(), start, count);
                                publish(&out, text);
                            }
                        }),
                    );
                }
                if (start..=last).all(|a| host.get_register(a).is_some()) {
                    publish(
                        &state,
                        decode_string(|a| host.get_register(a), start, count),
                    );
                }
            }
        }
        debug!("Text sensor '{}' ({:?})", name, kind);

        Self { name, kind, state }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TextKind {
        self.kind
    }

    pub fn state(&self) -> Option<String> {
        self.state.borrow().value.clone()
    }
}
