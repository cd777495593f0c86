use std::time::Duration;

use decode_starter::auto::{self, Alliance};
use decode_starter::config::RobotConfig;
use decode_starter::shooter::Shooter;
use decode_starter::sim::{self, SimFollower, SimHub};
use decode_starter::telemetry::{LogDashboard, Telemetry};

const PERIOD: Duration = Duration::from_millis(20);
const AUTO_LENGTH: Duration = Duration::from_secs(30);

/// `pedro_auto [blue|red] [config.json]`
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let mut args = std::env::args().skip(1);
    let alliance: Alliance = match args.next() {
        Some(arg) => arg.parse()?,
        None => Alliance::Blue,
    };
    let config = match args.next() {
        Some(path) => RobotConfig::load(path)?,
        None => RobotConfig::default(),
    };

    let map = sim::standard_map(&config);
    let mut telemetry = Telemetry::new(Some(Box::new(LogDashboard)));
    telemetry.log_line(format!("Pedro auto, {alliance} alliance"));

    let follower = match SimFollower::from_hardware(&map, &config.follower, PERIOD) {
        Ok(follower) => {
            telemetry.log_line("Pedro Pathing initialized");
            follower
        }
        Err(e) => {
            log::error!("no follower, autonomous will not run: {e}");
            telemetry.log_line(format!("Pedro Pathing FAILED: {e}"));
            telemetry.log_line(format!(
                "   Check: odometry hardware '{}'",
                config.follower.odometry
            ));
            telemetry.update();
            return Ok(());
        }
    };

    let shooter = match Shooter::from_hardware(&map, &config.shooter) {
        Ok(shooter) => {
            telemetry.log_line("Shooter initialized");
            Some(shooter)
        }
        Err(e) => {
            log::warn!("running without shooter: {e}");
            telemetry.log_line(format!("Shooter failed: {e}"));
            None
        }
    };
    let mut sequence = auto::pedro_routine(follower, shooter, alliance)?;
    telemetry.log_line(format!("{} steps queued", sequence.total_steps()));
    telemetry.update();

    let mut hub = SimHub::new(PERIOD, config.shooter.counts_per_rev);
    match sim::run_sequence(&mut sequence, &mut hub, &mut telemetry, AUTO_LENGTH) {
        Some(at) => telemetry.log_line(format!(
            "Autonomous complete in {:.1}s at {}",
            at.as_secs_f64(),
            sequence.pose()
        )),
        None => telemetry.log_line("Autonomous ran out of time"),
    }
    telemetry.update();
    Ok(())
}
