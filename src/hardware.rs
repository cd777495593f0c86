//! Named device lookup and the packets exchanged with the hub every cycle.
//!
//! Subsystems never talk to hardware directly: they read a [`HubState`]
//! snapshot and write into a [`HubCommand`], which the harness flushes once
//! per control cycle.

use std::fmt;

use crate::controller::GamepadState;
use crate::error::HardwareError;

/// Control hub plus one expansion hub.
pub const MOTOR_PORTS: usize = 8;
pub const SERVO_PORTS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Motor,
    Servo,
    Sensor,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Motor => "motor",
            Self::Servo => "servo",
            Self::Sensor => "sensor",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorChannel {
    port: usize,
    reversed: bool,
}

impl MotorChannel {
    pub fn port(&self) -> usize {
        self.port
    }
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }
    pub fn reversed(self, reversed: bool) -> Self {
        Self { reversed, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoChannel {
    port: usize,
}

impl ServoChannel {
    pub fn port(&self) -> usize {
        self.port
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorChannel {
    port: usize,
}

impl SensorChannel {
    pub fn port(&self) -> usize {
        self.port
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Device {
    Motor(usize),
    Servo(usize),
    Sensor(usize),
}

impl Device {
    fn kind(&self) -> DeviceKind {
        match self {
            Self::Motor(_) => DeviceKind::Motor,
            Self::Servo(_) => DeviceKind::Servo,
            Self::Sensor(_) => DeviceKind::Sensor,
        }
    }

    fn port(&self) -> usize {
        match *self {
            Self::Motor(port) | Self::Servo(port) | Self::Sensor(port) => port,
        }
    }
}

/// The robot configuration as seen by the host: which name lives on which port.
#[derive(Debug, Clone, Default)]
pub struct HardwareMap {
    devices: Vec<(String, Device)>,
}

impl HardwareMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_motor(&mut self, name: &str, port: usize) -> &mut Self {
        assert!(port < MOTOR_PORTS);
        self.insert(name, Device::Motor(port))
    }

    pub fn add_servo(&mut self, name: &str, port: usize) -> &mut Self {
        assert!(port < SERVO_PORTS);
        self.insert(name, Device::Servo(port))
    }

    pub fn add_sensor(&mut self, name: &str, port: usize) -> &mut Self {
        self.insert(name, Device::Sensor(port))
    }

    fn insert(&mut self, name: &str, device: Device) -> &mut Self {
        self.devices.retain(|(n, _)| n != name);
        self.devices.push((name.to_owned(), device));
        self
    }

    /// Port of `name`, provided it is a device of the `expected` kind.
    fn lookup(&self, name: &str, expected: DeviceKind) -> Result<usize, HardwareError> {
        let Some((_, device)) = self.devices.iter().find(|(n, _)| n == name) else {
            return Err(HardwareError::MissingDevice {
                name: name.to_owned(),
                kind: expected,
            });
        };
        if device.kind() != expected {
            return Err(HardwareError::WrongKind {
                name: name.to_owned(),
                expected,
                found: device.kind(),
            });
        }
        Ok(device.port())
    }

    pub fn motor(&self, name: &str) -> Result<MotorChannel, HardwareError> {
        Ok(MotorChannel {
            port: self.lookup(name, DeviceKind::Motor)?,
            reversed: false,
        })
    }

    pub fn servo(&self, name: &str) -> Result<ServoChannel, HardwareError> {
        Ok(ServoChannel {
            port: self.lookup(name, DeviceKind::Servo)?,
        })
    }

    pub fn sensor(&self, name: &str) -> Result<SensorChannel, HardwareError> {
        Ok(SensorChannel {
            port: self.lookup(name, DeviceKind::Sensor)?,
        })
    }
}

/// Outgoing packet: actuator powers for this cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HubCommand {
    pub motors: [f64; MOTOR_PORTS],
    pub servos: [f64; SERVO_PORTS],
}

impl Default for HubCommand {
    fn default() -> Self {
        Self {
            motors: [0.0; MOTOR_PORTS],
            servos: [0.0; SERVO_PORTS],
        }
    }
}

impl HubCommand {
    pub fn set_motor(&mut self, channel: MotorChannel, power: f64) {
        let power = power.clamp(-1.0, 1.0);
        self.motors[channel.port] = if channel.reversed { -power } else { power };
    }

    /// Power as the subsystem commanded it, i.e. with the direction flip undone.
    pub fn motor(&self, channel: MotorChannel) -> f64 {
        let raw = self.motors[channel.port];
        if channel.reversed {
            -raw
        } else {
            raw
        }
    }

    pub fn set_servo(&mut self, channel: ServoChannel, power: f64) {
        self.servos[channel.port] = power.clamp(-1.0, 1.0);
    }

    pub fn servo(&self, channel: ServoChannel) -> f64 {
        self.servos[channel.port]
    }
}

/// Incoming packet: sensor readings and gamepads sampled at the start of the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HubState {
    pub encoders: [i32; MOTOR_PORTS],
    pub gamepads: [GamepadState; 2],
}

impl HubState {
    pub fn encoder(&self, channel: MotorChannel) -> i32 {
        let ticks = self.encoders[channel.port];
        if channel.reversed {
            ticks.wrapping_neg()
        } else {
            ticks
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> HardwareMap {
        let mut map = HardwareMap::new();
        map.add_motor("shooter", 4)
            .add_servo("feedServo", 0)
            .add_sensor("odo", 0);
        map
    }

    #[test]
    fn lookup_by_name() {
        let map = map();
        assert_eq!(map.motor("shooter").unwrap().port(), 4);
        assert_eq!(map.servo("feedServo").unwrap().port(), 0);
        assert_eq!(map.sensor("odo").unwrap().port(), 0);
    }

    #[test]
    fn missing_device_names_the_device() {
        let err = map().motor("frontLeft").unwrap_err();
        assert!(matches!(
            err,
            HardwareError::MissingDevice { ref name, kind: DeviceKind::Motor } if name == "frontLeft"
        ));
        assert_eq!(
            err.to_string(),
            "no motor named \"frontLeft\" in the hardware map"
        );
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let err = map().motor("feedServo").unwrap_err();
        assert!(matches!(
            err,
            HardwareError::WrongKind {
                expected: DeviceKind::Motor,
                found: DeviceKind::Servo,
                ..
            }
        ));
    }

    #[test]
    fn reversed_channels_flip_sign() {
        let channel = map().motor("shooter").unwrap().reversed(true);
        let mut cmd = HubCommand::default();
        cmd.set_motor(channel, 0.5);
        assert_eq!(cmd.motors[4], -0.5);
        assert_eq!(cmd.motor(channel), 0.5);

        let mut state = HubState::default();
        state.encoders[4] = -100;
        assert_eq!(state.encoder(channel), 100);

        state.encoders[4] = i32::MIN;
        assert_eq!(state.encoder(channel), i32::MIN);
    }

    #[test]
    fn motor_power_is_clamped() {
        let channel = map().motor("shooter").unwrap();
        let mut cmd = HubCommand::default();
        cmd.set_motor(channel, 3.0);
        assert_eq!(cmd.motor(channel), 1.0);
    }
}
