//! TeleOp coordinator for the drivebase and shooter.
//!
//! A subsystem whose hardware is missing is recorded as absent once at
//! construction. Every later call skips it; nothing retries the lookup.

use std::time::Duration;

use serde::Deserialize;

use crate::config::RobotConfig;
use crate::controller::Gamepad;
use crate::drivebase::Drivebase;
use crate::error::HardwareError;
use crate::hardware::{HardwareMap, HubCommand, HubState};
use crate::shooter::Shooter;
use crate::telemetry::Telemetry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverMode {
    /// Primary gamepad drives and shoots.
    #[default]
    Single,
    /// Primary drives, secondary runs the shooter.
    Dual,
}

#[derive(Debug, Clone)]
pub enum Subsystem<T> {
    Present(T),
    Absent { reason: String },
}

impl<T> Subsystem<T> {
    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Self::Present(s) => Some(s),
            Self::Absent { .. } => None,
        }
    }

    pub fn as_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Present(s) => Some(s),
            Self::Absent { .. } => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

impl<T> From<Result<T, HardwareError>> for Subsystem<T> {
    fn from(result: Result<T, HardwareError>) -> Self {
        match result {
            Ok(s) => Self::Present(s),
            Err(e) => Self::Absent {
                reason: e.to_string(),
            },
        }
    }
}

pub struct RobotManager {
    drive: Subsystem<Drivebase>,
    shooter: Subsystem<Shooter>,
    driver_mode: DriverMode,
}

impl RobotManager {
    /// Build every subsystem, reporting each one's outcome on `telemetry`.
    pub fn new(map: &HardwareMap, config: &RobotConfig, telemetry: &mut Telemetry) -> Self {
        telemetry.log_line("Initializing Robot Systems...");

        let drive: Subsystem<Drivebase> = Drivebase::from_hardware(map, &config.drive).into();
        let drive_names = [
            &config.drive.front_left.name,
            &config.drive.front_right.name,
            &config.drive.back_left.name,
            &config.drive.back_right.name,
        ]
        .map(String::as_str)
        .join(", ");
        report_init(telemetry, "Drive", &drive, &drive_names);

        let shooter: Subsystem<Shooter> = Shooter::from_hardware(map, &config.shooter).into();
        let shooter_names = format!(
            "{} (motor), {} (servo)",
            config.shooter.motor.name, config.shooter.feed_servo
        );
        report_init(telemetry, "Shooter", &shooter, &shooter_names);

        let summary = match (drive.is_present(), shooter.is_present()) {
            (true, true) => "All systems operational",
            (false, false) => "No systems initialized, check hardware config",
            _ => "Partial functionality, some systems failed",
        };
        telemetry.log_line(summary);
        telemetry.update();

        Self {
            drive,
            shooter,
            driver_mode: config.driver_mode,
        }
    }

    /// Sticks on `primary` always drive. The shooter listens to `primary` or
    /// `secondary` depending on the driver mode.
    pub fn update(
        &mut self,
        now: Duration,
        state: &HubState,
        primary: &Gamepad,
        secondary: &Gamepad,
        pkt: &mut HubCommand,
    ) {
        if let Some(drive) = self.drive.as_mut() {
            // stick y is reported inverted
            drive.drive(-primary.left_y(), primary.left_x(), primary.right_x(), pkt);
        }
        if let Some(shooter) = self.shooter.as_mut() {
            let operator = match self.driver_mode {
                DriverMode::Single => primary,
                DriverMode::Dual => secondary,
            };
            shooter.handle_input(operator, now, pkt);
            shooter.update(now, state, pkt);
        }
    }

    pub fn stop(&mut self, pkt: &mut HubCommand) {
        if let Some(drive) = self.drive.as_mut() {
            drive.stop(pkt);
        }
        if let Some(shooter) = self.shooter.as_mut() {
            shooter.stop(pkt);
        }
    }

    pub fn cycle_preset(&mut self, pkt: &mut HubCommand) {
        if let Some(shooter) = self.shooter.as_mut() {
            shooter.cycle_preset(pkt);
        }
    }

    /// Per-cycle status block for the driver station.
    pub fn write_status(&self, telemetry: &mut Telemetry) {
        match self.drive.as_ref() {
            Some(drive) => {
                telemetry.log("Drive Type", format!("{:?}", drive.drive_type()));
                telemetry.log("Max Power", format!("{:.0}%", drive.max_power() * 100.0));
            }
            None => telemetry.log_line("Drive System: OFFLINE"),
        }
        match self.shooter.as_ref() {
            Some(shooter) => {
                telemetry.log("Status", shooter.state());
                telemetry.log("Current RPM", format!("{:.0}", shooter.current_rpm()));
                telemetry.log("Target RPM", format!("{:.0}", shooter.target_rpm()));
                telemetry.log("Preset", format!("{:?}", shooter.preset()));
                if shooter.is_running() {
                    telemetry.log_line(if shooter.is_at_speed() {
                        "READY TO FIRE!"
                    } else {
                        "Spinning up..."
                    });
                }
            }
            None => telemetry.log_line("Shooter System: OFFLINE"),
        }
        if !self.is_healthy() {
            telemetry.log_line("Some systems offline, check init screen");
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.drive.is_present() && self.shooter.is_present()
    }

    pub fn drive(&self) -> Option<&Drivebase> {
        self.drive.as_ref()
    }

    pub fn drive_mut(&mut self) -> Option<&mut Drivebase> {
        self.drive.as_mut()
    }

    pub fn shooter(&self) -> Option<&Shooter> {
        self.shooter.as_ref()
    }

    pub fn shooter_mut(&mut self) -> Option<&mut Shooter> {
        self.shooter.as_mut()
    }

    pub fn driver_mode(&self) -> DriverMode {
        self.driver_mode
    }

    pub fn set_driver_mode(&mut self, mode: DriverMode) {
        if mode != self.driver_mode {
            log::info!("driver mode: {mode:?}");
        }
        self.driver_mode = mode;
    }
}

fn report_init<T>(telemetry: &mut Telemetry, name: &str, subsystem: &Subsystem<T>, hint: &str) {
    match subsystem {
        Subsystem::Present(_) => {
            log::info!("{name} system initialized");
            telemetry.log_line(format!("{name} system initialized"));
        }
        Subsystem::Absent { reason } => {
            log::warn!("{name} system disabled: {reason}");
            telemetry.log_line(format!("{name} system FAILED: {reason}"));
            telemetry.log_line("   Check hardware config:");
            telemetry.log_line(format!("   - {hint}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{GamepadState, X, Y};

    fn full_map() -> HardwareMap {
        let mut map = HardwareMap::new();
        map.add_motor("frontLeft", 0)
            .add_motor("frontRight", 1)
            .add_motor("backLeft", 2)
            .add_motor("backRight", 3)
            .add_motor("shooter", 4)
            .add_servo("feedServo", 0);
        map
    }

    fn pad(state: GamepadState) -> Gamepad {
        let mut pad = Gamepad::default();
        pad.advance(state);
        pad
    }

    fn manager(map: &HardwareMap, config: &RobotConfig) -> (RobotManager, Vec<String>) {
        let mut telemetry = Telemetry::new(None);
        let robot = RobotManager::new(map, config, &mut telemetry);
        (robot, telemetry.last_frame().to_vec())
    }

    #[test]
    fn all_systems_present() {
        let (robot, lines) = manager(&full_map(), &RobotConfig::default());
        assert!(robot.is_healthy());
        assert!(lines.contains(&"Drive system initialized".to_owned()));
        assert!(lines.contains(&"Shooter system initialized".to_owned()));
        assert_eq!(lines.last().map(String::as_str), Some("All systems operational"));
    }

    #[test]
    fn missing_shooter_leaves_drive_working() {
        let mut map = HardwareMap::new();
        map.add_motor("frontLeft", 0)
            .add_motor("frontRight", 1)
            .add_motor("backLeft", 2)
            .add_motor("backRight", 3);
        let (mut robot, lines) = manager(&map, &RobotConfig::default());
        assert!(!robot.is_healthy());
        assert!(robot.shooter().is_none());
        assert!(lines
            .iter()
            .any(|l| l.starts_with("Shooter system FAILED") && l.contains("shooter")));
        assert!(lines.contains(&"   - shooter (motor), feedServo (servo)".to_owned()));
        assert_eq!(
            lines.last().map(String::as_str),
            Some("Partial functionality, some systems failed")
        );

        let stick = pad(GamepadState {
            left_y: -1.0,
            buttons: Y,
            ..Default::default()
        });
        let mut pkt = HubCommand::default();
        robot.update(Duration::ZERO, &HubState::default(), &stick, &Gamepad::default(), &mut pkt);
        assert_eq!(robot.drive().unwrap().last_powers().front_right, 0.8);
        // shooter port stays untouched
        assert_eq!(pkt.motors[4], 0.0);
        robot.stop(&mut pkt);
        robot.cycle_preset(&mut pkt);
    }

    #[test]
    fn empty_map_has_no_systems() {
        let (robot, lines) = manager(&HardwareMap::new(), &RobotConfig::default());
        assert!(robot.drive().is_none());
        assert!(robot.shooter().is_none());
        assert_eq!(
            lines.last().map(String::as_str),
            Some("No systems initialized, check hardware config")
        );
    }

    #[test]
    fn driver_mode_routes_shooter_input() {
        let map = full_map();
        let (mut robot, _) = manager(&map, &RobotConfig::default());
        let mut pkt = HubCommand::default();
        let state = HubState::default();
        let y = pad(GamepadState::with_buttons(Y));
        let idle = Gamepad::default();

        // single: secondary is ignored
        robot.update(Duration::ZERO, &state, &idle, &y, &mut pkt);
        assert!(!robot.shooter().unwrap().is_running());
        robot.update(Duration::ZERO, &state, &y, &idle, &mut pkt);
        assert!(robot.shooter().unwrap().is_running());

        robot.set_driver_mode(DriverMode::Dual);
        robot.stop(&mut pkt);
        robot.update(Duration::ZERO, &state, &y, &idle, &mut pkt);
        assert!(!robot.shooter().unwrap().is_running());
        robot.update(Duration::ZERO, &state, &idle, &y, &mut pkt);
        assert!(robot.shooter().unwrap().is_running());
    }

    #[test]
    fn stop_zeroes_every_output() {
        let (mut robot, _) = manager(&full_map(), &RobotConfig::default());
        let mut pkt = HubCommand::default();
        let go = pad(GamepadState {
            left_y: -0.5,
            right_x: 0.3,
            buttons: Y | X,
            ..Default::default()
        });
        robot.update(Duration::ZERO, &HubState::default(), &go, &go, &mut pkt);
        robot.cycle_preset(&mut pkt);
        assert_eq!(pkt.motors[4], 0.5);

        robot.stop(&mut pkt);
        assert_eq!(pkt.motors, [0.0; 8]);
        assert_eq!(pkt.servos, [0.0; 12]);
    }

    #[test]
    fn status_reports_offline_subsystems() {
        let (robot, _) = manager(&HardwareMap::new(), &RobotConfig::default());
        let mut telemetry = Telemetry::new(None);
        robot.write_status(&mut telemetry);
        telemetry.update();
        let frame = telemetry.last_frame();
        assert!(frame.contains(&"Drive System: OFFLINE".to_owned()));
        assert!(frame.contains(&"Shooter System: OFFLINE".to_owned()));
    }
}
