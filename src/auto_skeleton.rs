use std::time::Duration;

use decode_starter::auto;
use decode_starter::config::RobotConfig;
use decode_starter::shooter::Shooter;
use decode_starter::sim::{self, SimFollower, SimHub};
use decode_starter::telemetry::Telemetry;

const PERIOD: Duration = Duration::from_millis(20);
const AUTO_LENGTH: Duration = Duration::from_secs(30);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let config = match std::env::args().nth(1) {
        Some(path) => RobotConfig::load(path)?,
        None => RobotConfig::default(),
    };

    let map = sim::standard_map(&config);
    let mut telemetry = Telemetry::new(None);
    let shooter = Shooter::from_hardware(&map, &config.shooter)
        .map_err(|e| {
            telemetry.log_line(format!("Shooter failed: {e}"));
            e
        })
        .ok();
    telemetry.log_line("Strategy: leave launch line, shoot, park");
    telemetry.update();

    let follower = SimFollower::new(&config.follower, PERIOD);
    let mut sequence = auto::skeleton_routine(follower, shooter)?;
    let mut hub = SimHub::new(PERIOD, config.shooter.counts_per_rev);
    if sim::run_sequence(&mut sequence, &mut hub, &mut telemetry, AUTO_LENGTH).is_some() {
        telemetry.log_line("Autonomous sequence complete!");
    }
    telemetry.update();
    Ok(())
}
