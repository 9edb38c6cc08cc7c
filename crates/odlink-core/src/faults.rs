//! Device error registers and their flag names

use std::fmt;

/// Number of motor axes a device exposes
pub const AXIS_COUNT: u8 = 2;

/// Subsystem an error register belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSource {
    Axis,
    Motor,
    Encoder,
    Controller,
}

impl ErrorSource {
    pub const ALL: [ErrorSource; 4] = [Self::Axis, Self::Motor, Self::Encoder, Self::Controller];

    /// Bit flags known for this register
    pub fn flags(&self) -> &'static [(u32, &'static str)] {
        match self {
            Self::Axis => AXIS_ERRORS,
            Self::Motor => MOTOR_ERRORS,
            Self::Encoder => ENCODER_ERRORS,
            Self::Controller => CONTROLLER_ERRORS,
        }
    }

    /// Names of the set bits in `value`. Unknown bits are ignored.
    pub fn decode(&self, value: u32) -> Vec<&'static str> {
        self.flags()
            .iter()
            .filter(|(bit, _)| value & bit != 0)
            .map(|(_, name)| *name)
            .collect()
    }
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Axis => "axis",
            Self::Motor => "motor",
            Self::Encoder => "encoder",
            Self::Controller => "controller",
        };
        f.write_str(name)
    }
}

/// One of the error registers of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorRegister {
    pub axis: u8,
    pub source: ErrorSource,
}

impl ErrorRegister {
    /// Endpoint identifier, e.g. `axis0.error` or `axis1.encoder.error`
    pub fn identifier(&self) -> String {
        match self.source {
            ErrorSource::Axis => format!("axis{}.error", self.axis),
            source => format!("axis{}.{}.error", self.axis, source),
        }
    }

    /// All registers, axis by axis
    pub fn all() -> impl Iterator<Item = ErrorRegister> {
        (0..AXIS_COUNT).flat_map(|axis| {
            ErrorSource::ALL
                .into_iter()
                .map(move |source| ErrorRegister { axis, source })
        })
    }

    fn slot(&self) -> usize {
        let source = match self.source {
            ErrorSource::Axis => 0,
            ErrorSource::Motor => 1,
            ErrorSource::Encoder => 2,
            ErrorSource::Controller => 3,
        };
        self.axis as usize * ErrorSource::ALL.len() + source
    }
}

/// Cached values of all eight error registers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorRegisters {
    values: [u32; (AXIS_COUNT as usize) * 4],
}

impl ErrorRegisters {
    pub fn get(&self, register: ErrorRegister) -> u32 {
        self.values.get(register.slot()).copied().unwrap_or(0)
    }

    pub fn set(&mut self, register: ErrorRegister, value: u32) {
        if let Some(slot) = self.values.get_mut(register.slot()) {
            *slot = value;
        }
    }

    /// Whether any register reports an error
    pub fn any(&self) -> bool {
        self.values.iter().any(|v| *v != 0)
    }

    /// Registers with at least one bit set, with the names of those bits
    pub fn active(&self) -> Vec<(ErrorRegister, u32, Vec<&'static str>)> {
        ErrorRegister::all()
            .filter_map(|register| {
                let value = self.get(register);
                (value != 0).then(|| (register, value, register.source.decode(value)))
            })
            .collect()
    }
}

/// Extra guidance for flags whose meaning is not obvious from the name
pub fn flag_hint(name: &str) -> Option<&'static str> {
    match name {
        "CONTROL_DEADLINE_MISSED" => Some("Is a result of other errors"),
        "INVALID_INPUT_MODE" => Some("axis.requested_state might have been invalid"),
        _ => None,
    }
}

const AXIS_ERRORS: &[(u32, &str)] = &[
    (0x1, "INVALID_STATE"),
    (0x800, "WATCHDOG_TIMER_EXPIRED"),
    (0x1000, "MIN_ENDSTOP_PRESSED"),
    (0x2000, "MAX_ENDSTOP_PRESSED"),
    (0x4000, "ESTOP_REQUESTED"),
    (0x20000, "HOMING_WITHOUT_ENDSTOP"),
    (0x40000, "OVER_TEMP"),
    (0x80000, "UNKNOWN_POSITION"),
];

// Bits above 31 exist on newer firmware but are outside the 32-bit register
const MOTOR_ERRORS: &[(u32, &str)] = &[
    (0x1, "PHASE_RESISTANCE_OUT_OF_RANGE"),
    (0x2, "PHASE_INDUCTANCE_OUT_OF_RANGE"),
    (0x8, "DRV_FAULT"),
    (0x10, "CONTROL_DEADLINE_MISSED"),
    (0x80, "MODULATION_MAGNITUDE"),
    (0x400, "CURRENT_SENSE_SATURATION"),
    (0x1000, "CURRENT_LIMIT_VIOLATION"),
    (0x10000, "MODULATION_IS_NAN"),
    (0x20000, "MOTOR_THERMISTOR_OVER_TEMP"),
    (0x40000, "FET_THERMISTOR_OVER_TEMP"),
    (0x80000, "TIMER_UPDATE_MISSED"),
    (0x100000, "CURRENT_MEASUREMENT_UNAVAILABLE"),
    (0x200000, "CONTROLLER_FAILED"),
    (0x400000, "I_BUS_OUT_OF_RANGE"),
    (0x800000, "BRAKE_RESISTOR_DISARMED"),
    (0x1000000, "SYSTEM_LEVEL"),
    (0x2000000, "BAD_TIMING"),
    (0x4000000, "UNKNOWN_PHASE_ESTIMATE"),
    (0x8000000, "UNKNOWN_PHASE_VEL"),
    (0x10000000, "UNKNOWN_TORQUE"),
    (0x20000000, "UNKNOWN_CURRENT_COMMAND"),
    (0x40000000, "UNKNOWN_CURRENT_MEASUREMENT"),
    (0x80000000, "UNKNOWN_VBUS_VOLTAGE"),
];

const ENCODER_ERRORS: &[(u32, &str)] = &[
    (0x1, "UNSTABLE_GAIN"),
    (0x2, "CPR_POLEPAIRS_MISMATCH"),
    (0x4, "NO_RESPONSE"),
    (0x8, "UNSUPPORTED_ENCODER_MODE"),
    (0x10, "ILLEGAL_HALL_STATE"),
    (0x20, "INDEX_NOT_FOUND_YET"),
    (0x40, "ABS_SPI_TIMEOUT"),
    (0x80, "ABS_SPI_COM_FAIL"),
    (0x100, "ABS_SPI_NOT_READY"),
    (0x200, "HALL_NOT_CALIBRATED_YET"),
];

const CONTROLLER_ERRORS: &[(u32, &str)] = &[
    (0x1, "OVERSPEED"),
    (0x2, "INVALID_INPUT_MODE"),
    (0x4, "UNSTABLE_GAIN"),
    (0x8, "INVALID_MIRROR_AXIS"),
    (0x10, "INVALID_LOAD_ENCODER"),
    (0x20, "INVALID_ESTIMATE"),
    (0x40, "INVALID_CIRCULAR_RANGE"),
    (0x80, "SPINOUT_DETECTED"),
];
