//! Robot configuration.
//!
//! Every field falls back to the starter-kit value, so an empty JSON object is
//! a complete configuration and teams only write down what they change.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::drivebase::DriveType;
use crate::error::ConfigError;
use crate::robot::DriverMode;
use crate::sequence::SHOT_INTERVAL;
use crate::shooter::ShootingPreset;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RobotConfig {
    pub driver_mode: DriverMode,
    pub drive: DriveConfig,
    pub shooter: ShooterConfig,
    pub follower: FollowerConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MotorConfig {
    pub name: String,
    pub reversed: bool,
}

impl MotorConfig {
    fn new(name: &str, reversed: bool) -> Self {
        Self {
            name: name.to_owned(),
            reversed,
        }
    }
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self::new("", false)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriveConfig {
    pub drive_type: DriveType,
    pub max_power: f64,
    pub front_left: MotorConfig,
    pub front_right: MotorConfig,
    pub back_left: MotorConfig,
    pub back_right: MotorConfig,
}

impl Default for DriveConfig {
    fn default() -> Self {
        // left side reversed so positive power drives forward on both sides
        Self {
            drive_type: DriveType::Mecanum,
            max_power: 0.8,
            front_left: MotorConfig::new("frontLeft", true),
            front_right: MotorConfig::new("frontRight", false),
            back_left: MotorConfig::new("backLeft", true),
            back_right: MotorConfig::new("backRight", false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShooterConfig {
    pub motor: MotorConfig,
    pub feed_servo: String,
    pub preset: ShootingPreset,
    pub counts_per_rev: f64,
    /// Milliseconds between RPM samples.
    pub rpm_interval_ms: u64,
    /// Milliseconds the feed servo runs per shot. Must be shorter than the burst shot interval.
    pub fire_duration_ms: u64,
    /// Fraction of target RPM counted as "at speed".
    pub speed_tolerance: f64,
}

impl Default for ShooterConfig {
    fn default() -> Self {
        Self {
            motor: MotorConfig::new("shooter", false),
            feed_servo: "feedServo".to_owned(),
            preset: ShootingPreset::ShortRange,
            counts_per_rev: 28.0,
            rpm_interval_ms: 100,
            fire_duration_ms: 300,
            speed_tolerance: 0.1,
        }
    }
}

impl ShooterConfig {
    pub fn rpm_interval(&self) -> Duration {
        Duration::from_millis(self.rpm_interval_ms)
    }
    pub fn fire_duration(&self) -> Duration {
        Duration::from_millis(self.fire_duration_ms)
    }
}

/// Path-following constraints, in inches, seconds and radians.
///
/// Velocities are at full power; the follower scales them by `max_power`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FollowerConfig {
    pub odometry: String,
    pub max_power: f64,
    pub max_acceleration: f64,
    pub max_deceleration: f64,
    pub max_angular_velocity: f64,
    pub x_velocity: f64,
    pub y_velocity: f64,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            odometry: "odo".to_owned(),
            max_power: 0.85,
            max_acceleration: 80.0,
            max_deceleration: 100.0,
            max_angular_velocity: 2.0,
            x_velocity: 60.0,
            y_velocity: 50.0,
        }
    }
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            driver_mode: DriverMode::Single,
            drive: DriveConfig::default(),
            shooter: ShooterConfig::default(),
            follower: FollowerConfig::default(),
        }
    }
}

impl RobotConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("{value} is outside [0, 1]"),
                })
            }
        }
        fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("{value} must be positive"),
                })
            }
        }

        unit("drive.max_power", self.drive.max_power)?;
        unit("shooter.speed_tolerance", self.shooter.speed_tolerance)?;
        unit("follower.max_power", self.follower.max_power)?;
        positive("shooter.counts_per_rev", self.shooter.counts_per_rev)?;
        if self.shooter.rpm_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "shooter.rpm_interval_ms",
                reason: "sampling interval must be non-zero".to_owned(),
            });
        }
        if self.shooter.fire_duration() >= SHOT_INTERVAL {
            return Err(ConfigError::Invalid {
                field: "shooter.fire_duration_ms",
                reason: format!(
                    "{} ms feed pulse overlaps the next shot, must be under {} ms",
                    self.shooter.fire_duration_ms,
                    SHOT_INTERVAL.as_millis()
                ),
            });
        }
        positive("follower.x_velocity", self.follower.x_velocity)?;
        positive("follower.y_velocity", self.follower.y_velocity)?;
        positive("follower.max_acceleration", self.follower.max_acceleration)?;
        positive("follower.max_deceleration", self.follower.max_deceleration)?;
        positive("follower.max_angular_velocity", self.follower.max_angular_velocity)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = RobotConfig::from_json_str("{}").unwrap();
        assert_eq!(config, RobotConfig::default());
        assert_eq!(config.drive.max_power, 0.8);
        assert_eq!(config.shooter.counts_per_rev, 28.0);
        assert_eq!(config.follower.odometry, "odo");
    }

    #[test]
    fn partial_override() {
        let config = RobotConfig::from_json_str(
            r#"{
                "driver_mode": "dual",
                "drive": { "drive_type": "tank", "max_power": 0.5 },
                "shooter": { "preset": "safe_test" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.driver_mode, DriverMode::Dual);
        assert_eq!(config.drive.drive_type, DriveType::Tank);
        assert_eq!(config.drive.max_power, 0.5);
        assert_eq!(config.drive.front_left.name, "frontLeft");
        assert_eq!(config.shooter.preset, ShootingPreset::SafeTest);
    }

    #[test]
    fn out_of_range_power_is_rejected() {
        let err = RobotConfig::from_json_str(r#"{ "drive": { "max_power": 1.5 } }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "drive.max_power",
                ..
            }
        ));
    }

    #[test]
    fn feed_pulse_must_fit_between_shots() {
        let err = RobotConfig::from_json_str(r#"{ "shooter": { "fire_duration_ms": 600 } }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "shooter.fire_duration_ms",
                ..
            }
        ));
        assert!(RobotConfig::from_json_str(r#"{ "shooter": { "fire_duration_ms": 499 } }"#).is_ok());
    }

    #[test]
    fn follower_limits_must_be_positive() {
        let err = RobotConfig::from_json_str(r#"{ "follower": { "max_deceleration": 0.0 } }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "follower.max_deceleration",
                ..
            }
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = RobotConfig::from_json_str(r#"{ "drvie": {} }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn durations() {
        let shooter = ShooterConfig::default();
        assert_eq!(shooter.rpm_interval(), Duration::from_millis(100));
        assert_eq!(shooter.fire_duration(), Duration::from_millis(300));
    }
}
