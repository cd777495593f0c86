use std::time::Duration;

use decode_starter::config::RobotConfig;
use decode_starter::controller::{self, Gamepad, GamepadState};
use decode_starter::hardware::HubCommand;
use decode_starter::robot::RobotManager;
use decode_starter::sim::{self, SimHub};
use decode_starter::telemetry::{LogDashboard, Telemetry};

const PERIOD: Duration = Duration::from_millis(20);
const MATCH_LENGTH: Duration = Duration::from_secs(120);
const REPORT_EVERY: u32 = 25;

/// Stand-in for a driver on gamepad 1.
fn scripted_driver(now: Duration) -> GamepadState {
    let t = now.as_secs_f64();
    let mut pad = GamepadState::default();
    if t < 2.0 {
        pad.left_y = -0.6;
    } else if t < 3.0 {
        pad.right_x = 0.4;
    } else if t < 4.0 {
        pad.left_x = 0.5;
    }
    let tap = |at: f64| (at..at + 0.1).contains(&t);
    if tap(3.0) || tap(12.0) {
        pad.buttons |= controller::Y;
    }
    if tap(5.0) || tap(6.0) || tap(10.0) {
        pad.buttons |= controller::A;
    }
    if tap(8.0) {
        pad.buttons |= controller::X;
    }
    pad
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let config = match std::env::args().nth(1) {
        Some(path) => RobotConfig::load(path)?,
        None => RobotConfig::default(),
    };

    let map = sim::standard_map(&config);
    let mut hub = SimHub::new(PERIOD, config.shooter.counts_per_rev);
    let mut telemetry = Telemetry::new(Some(Box::new(LogDashboard)));
    let mut robot = RobotManager::new(&map, &config, &mut telemetry);
    if let Some(drive) = robot.drive_mut() {
        drive.reset_encoders(&hub.state());
    }
    log::info!("teleop ready, driver mode {:?}", robot.driver_mode());

    let mut primary = Gamepad::default();
    let mut secondary = Gamepad::default();
    let mut pkt = HubCommand::default();
    let mut now = Duration::ZERO;
    let mut cycle = 0u32;

    while now < MATCH_LENGTH {
        hub.set_gamepads([scripted_driver(now), GamepadState::default()]);
        let state = hub.state();
        primary.advance(state.gamepads[0]);
        secondary.advance(state.gamepads[1]);

        robot.update(now, &state, &primary, &secondary, &mut pkt);
        if primary.pressed(controller::X) {
            robot.cycle_preset(&mut pkt);
        }

        if cycle % REPORT_EVERY == 0 {
            telemetry.log("Match Time", format!("{:.1} sec", now.as_secs_f64()));
            robot.write_status(&mut telemetry);
            if let Some(drive) = robot.drive() {
                telemetry.log("Encoders", format!("{:?}", drive.encoder_positions(&state)));
            }
            telemetry.update();
        }

        hub.apply(&pkt);
        now += PERIOD;
        cycle += 1;
    }

    robot.stop(&mut pkt);
    hub.apply(&pkt);
    telemetry.log_line("Match ended. Robot stopped.");
    telemetry.update();
    Ok(())
}
