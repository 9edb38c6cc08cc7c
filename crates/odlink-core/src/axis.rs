//! Axis state machine values

use std::fmt;

/// Values of `axisN.requested_state` and `axisN.current_state`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AxisState {
    Undefined = 0x00,
    Idle = 0x01,
    StartupSequence = 0x02,
    FullCalibrationSequence = 0x03,
    MotorCalibration = 0x04,
    EncoderIndexSearch = 0x05,
    EncoderOffsetCalibration = 0x06,
    ClosedLoopControl = 0x07,
    LockinSpin = 0x08,
    EncoderDirFind = 0x09,
    Homing = 0x0a,
    EncoderHallPolarityCalibration = 0x0b,
    EncoderHallPhaseCalibration = 0x0c,
}

impl AxisState {
    pub const ALL: [AxisState; 13] = [
        Self::Undefined,
        Self::Idle,
        Self::StartupSequence,
        Self::FullCalibrationSequence,
        Self::MotorCalibration,
        Self::EncoderIndexSearch,
        Self::EncoderOffsetCalibration,
        Self::ClosedLoopControl,
        Self::LockinSpin,
        Self::EncoderDirFind,
        Self::Homing,
        Self::EncoderHallPolarityCalibration,
        Self::EncoderHallPhaseCalibration,
    ];

    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|state| *state as u32 == value)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Undefined => "AXIS_STATE_UNDEFINED",
            Self::Idle => "AXIS_STATE_IDLE",
            Self::StartupSequence => "AXIS_STATE_STARTUP_SEQUENCE",
            Self::FullCalibrationSequence => "AXIS_STATE_FULL_CALIBRATION_SEQUENCE",
            Self::MotorCalibration => "AXIS_STATE_MOTOR_CALIBRATION",
            Self::EncoderIndexSearch => "AXIS_STATE_ENCODER_INDEX_SEARCH",
            Self::EncoderOffsetCalibration => "AXIS_STATE_ENCODER_OFFSET_CALIBRATION",
            Self::ClosedLoopControl => "AXIS_STATE_CLOSED_LOOP_CONTROL",
            Self::LockinSpin => "AXIS_STATE_LOCKIN_SPIN",
            Self::EncoderDirFind => "AXIS_STATE_ENCODER_DIR_FIND",
            Self::Homing => "AXIS_STATE_HOMING",
            Self::EncoderHallPolarityCalibration => "AXIS_STATE_ENCODER_HALL_POLARITY_CALIBRATION",
            Self::EncoderHallPhaseCalibration => "AXIS_STATE_ENCODER_HALL_PHASE_CALIBRATION",
        }
    }

    /// Whether values of this endpoint are axis states
    pub fn applies_to(identifier: &str) -> bool {
        let Some(rest) = identifier.strip_prefix("axis") else {
            return false;
        };
        let Some((index, field)) = rest.split_once('.') else {
            return false;
        };
        !index.is_empty()
            && index.chars().all(|c| c.is_ascii_digit())
            && matches!(field, "requested_state" | "current_state")
    }
}

impl fmt::Display for AxisState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
