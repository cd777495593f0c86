use serde::Deserialize;

use crate::config::{DriveConfig, MotorConfig};
use crate::error::HardwareError;
use crate::hardware::{HardwareMap, HubCommand, HubState, MotorChannel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveType {
    /// Left and right sides driven together, no strafing.
    Tank,
    /// Four independently driven mecanum wheels.
    Mecanum,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelPowers {
    pub front_left: f64,
    pub front_right: f64,
    pub back_left: f64,
    pub back_right: f64,
}

impl WheelPowers {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(front_left: f64, front_right: f64, back_left: f64, back_right: f64) -> Self {
        Self {
            front_left,
            front_right,
            back_left,
            back_right,
        }
    }

    pub fn to_array(self) -> [f64; 4] {
        [
            self.front_left,
            self.front_right,
            self.back_left,
            self.back_right,
        ]
    }

    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(
            f(self.front_left),
            f(self.front_right),
            f(self.back_left),
            f(self.back_right),
        )
    }

    pub fn max_abs(self) -> f64 {
        self.to_array().iter().fold(0.0_f64, |acc, p| acc.max(p.abs()))
    }

    /// Scale down so no wheel exceeds 1.0 while keeping the ratios between them.
    pub fn normalised(self) -> Self {
        let max = self.max_abs();
        if max > 1.0 {
            self.map(|p| p / max)
        } else {
            self
        }
    }
}

/// Combine joystick axes into wheel powers, normalised then limited to `max_power`.
pub fn mix(drive_type: DriveType, axial: f64, lateral: f64, yaw: f64, max_power: f64) -> WheelPowers {
    let raw = match drive_type {
        DriveType::Tank => {
            let left = axial + yaw;
            let right = axial - yaw;
            WheelPowers::new(left, right, left, right)
        }
        DriveType::Mecanum => WheelPowers::new(
            axial + lateral + yaw,
            axial - lateral - yaw,
            axial - lateral + yaw,
            axial + lateral - yaw,
        ),
    };
    raw.normalised().map(|p| p * max_power)
}

#[derive(Debug, Clone)]
pub struct Drivebase {
    front_left: MotorChannel,
    front_right: MotorChannel,
    back_left: MotorChannel,
    back_right: MotorChannel,
    drive_type: DriveType,
    max_power: f64,
    last: WheelPowers,
    // raw counts at the last reset, in wheel direction
    encoder_zero: [i32; 4],
}

impl Drivebase {
    pub const DEFAULT_MAX_POWER: f64 = 0.8;

    pub fn new(
        [front_left, front_right, back_left, back_right]: [MotorChannel; 4],
        drive_type: DriveType,
    ) -> Self {
        Self {
            front_left,
            front_right,
            back_left,
            back_right,
            drive_type,
            max_power: Self::DEFAULT_MAX_POWER,
            last: WheelPowers::ZERO,
            encoder_zero: [0; 4],
        }
    }

    /// Look up the four drive motors. Fails on the first missing one.
    pub fn from_hardware(map: &HardwareMap, config: &DriveConfig) -> Result<Self, HardwareError> {
        let motor = |m: &MotorConfig| -> Result<MotorChannel, HardwareError> {
            Ok(map.motor(&m.name)?.reversed(m.reversed))
        };
        let channels = [
            motor(&config.front_left)?,
            motor(&config.front_right)?,
            motor(&config.back_left)?,
            motor(&config.back_right)?,
        ];
        let mut drivebase = Self::new(channels, config.drive_type);
        drivebase.set_max_power(config.max_power);
        Ok(drivebase)
    }

    /// Inputs are expected in [-1, 1] but are not rejected outside it.
    /// Tank mode ignores `lateral`.
    pub fn drive(&mut self, axial: f64, lateral: f64, yaw: f64, pkt: &mut HubCommand) {
        let powers = mix(self.drive_type, axial, lateral, yaw, self.max_power);
        self.write_powers(powers, pkt);
    }

    pub fn stop(&mut self, pkt: &mut HubCommand) {
        self.write_powers(WheelPowers::ZERO, pkt);
    }

    fn write_powers(&mut self, powers: WheelPowers, pkt: &mut HubCommand) {
        pkt.set_motor(self.front_left, powers.front_left);
        pkt.set_motor(self.front_right, powers.front_right);
        pkt.set_motor(self.back_left, powers.back_left);
        pkt.set_motor(self.back_right, powers.back_right);
        self.last = powers;
    }

    pub fn set_max_power(&mut self, max_power: f64) {
        self.max_power = max_power.clamp(0.0, 1.0);
    }

    pub fn max_power(&self) -> f64 {
        self.max_power
    }

    pub fn drive_type(&self) -> DriveType {
        self.drive_type
    }

    pub fn last_powers(&self) -> WheelPowers {
        self.last
    }

    fn raw_encoders(&self, state: &HubState) -> [i32; 4] {
        [
            state.encoder(self.front_left),
            state.encoder(self.front_right),
            state.encoder(self.back_left),
            state.encoder(self.back_right),
        ]
    }

    /// Wheel positions in counts since the last [`reset_encoders`](Self::reset_encoders),
    /// positive when the wheel turns forward. Order is fl, fr, bl, br.
    pub fn encoder_positions(&self, state: &HubState) -> [i32; 4] {
        let raw = self.raw_encoders(state);
        std::array::from_fn(|i| raw[i].wrapping_sub(self.encoder_zero[i]))
    }

    /// Make the current wheel positions read as zero.
    pub fn reset_encoders(&mut self, state: &HubState) {
        self.encoder_zero = self.raw_encoders(state);
        log::debug!("drive encoders zeroed at {:?}", self.encoder_zero);
    }
}
