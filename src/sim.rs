//! Desk simulation of the hub and drivetrain, used by the binaries and the integration tests.
//!
//! Motors are modelled as first-order lags towards `power * FREE_SPEED_RPM`;
//! the drivetrain is purely kinematic and never slips. Path following ramps
//! speed with the configured acceleration and deceleration limits.

use std::f64::consts::FRAC_PI_2;
use std::time::Duration;

use crate::config::{FollowerConfig, RobotConfig};
use crate::controller::GamepadState;
use crate::error::HardwareError;
use crate::follower::Follower;
use crate::hardware::{HardwareMap, HubCommand, HubState, MOTOR_PORTS};
use crate::path::PathChain;
use crate::pose::{heading_error, normalize_angle, Pose};
use crate::sequence::Sequence;
use crate::telemetry::Telemetry;
use crate::vec::Vec2;

pub const FREE_SPEED_RPM: f64 = 2800.0;
const MOTOR_TIME_CONSTANT: f64 = 0.25;
// path end is only reported once the heading is within this of the final heading
const HEADING_SETTLE: f64 = 0.0175;
// driver station refresh, in control cycles
const REPORT_EVERY: u32 = 25;
const TARGET_RADIUS: f64 = 3.0;

/// Hardware map with the default device names on fixed ports.
pub fn standard_map(config: &RobotConfig) -> HardwareMap {
    let mut map = HardwareMap::new();
    map.add_motor(&config.drive.front_left.name, 0)
        .add_motor(&config.drive.front_right.name, 1)
        .add_motor(&config.drive.back_left.name, 2)
        .add_motor(&config.drive.back_right.name, 3)
        .add_motor(&config.shooter.motor.name, 4)
        .add_servo(&config.shooter.feed_servo, 0)
        .add_sensor(&config.follower.odometry, 0);
    map
}

#[derive(Debug, Clone)]
pub struct SimHub {
    period: Duration,
    counts_per_rev: f64,
    rpm: [f64; MOTOR_PORTS],
    // fractional encoder position so slow motors still accumulate ticks
    position: [f64; MOTOR_PORTS],
    state: HubState,
}

impl SimHub {
    pub fn new(period: Duration, counts_per_rev: f64) -> Self {
        Self {
            period,
            counts_per_rev,
            rpm: [0.0; MOTOR_PORTS],
            position: [0.0; MOTOR_PORTS],
            state: HubState::default(),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sensor snapshot for the coming cycle.
    pub fn state(&self) -> HubState {
        self.state
    }

    pub fn set_gamepads(&mut self, gamepads: [GamepadState; 2]) {
        self.state.gamepads = gamepads;
    }

    /// Apply one cycle worth of commanded power.
    pub fn apply(&mut self, pkt: &HubCommand) {
        let dt = self.period.as_secs_f64();
        let alpha = (dt / MOTOR_TIME_CONSTANT).min(1.0);
        for port in 0..MOTOR_PORTS {
            let target = pkt.motors[port] * FREE_SPEED_RPM;
            self.rpm[port] += (target - self.rpm[port]) * alpha;
            self.position[port] += self.rpm[port] / 60.0 * self.counts_per_rev * dt;
            self.state.encoders[port] = self.position[port].round() as i32;
        }
    }

    /// Raw wheel speed on `port`, ignoring any direction flip.
    pub fn rpm(&self, port: usize) -> f64 {
        self.rpm[port]
    }
}

#[derive(Debug, Clone)]
struct ActivePath {
    chain: PathChain,
    lengths: Vec<f64>,
    travelled: f64,
}

impl ActivePath {
    fn new(chain: PathChain) -> Self {
        let lengths = chain.segments().iter().map(|s| s.curve.length()).collect();
        Self {
            chain,
            lengths,
            travelled: 0.0,
        }
    }

    fn total(&self) -> f64 {
        self.lengths.iter().sum()
    }

    fn pose_at(&self, distance: f64) -> Pose {
        let mut remaining = distance;
        let last = self.lengths.len() - 1;
        for (i, (seg, &len)) in self.chain.segments().iter().zip(&self.lengths).enumerate() {
            if remaining <= len || i == last {
                let t = if len > 0.0 { remaining / len } else { 1.0 };
                return seg.pose_at(t);
            }
            remaining -= len;
        }
        self.chain.end_pose()
    }
}

/// Kinematic follower: slides along the path under a trapezoidal speed
/// profile and slews the heading at a fixed rate, both scaled by the max power.
#[derive(Debug, Clone)]
pub struct SimFollower {
    pose: Pose,
    path: Option<ActivePath>,
    teleop: [f64; 3],
    max_power: f64,
    // along-path speed, in/s
    velocity: f64,
    speed: f64,
    strafe_speed: f64,
    acceleration: f64,
    deceleration: f64,
    turn_rate: f64,
    dt: f64,
}

impl SimFollower {
    pub fn new(config: &FollowerConfig, period: Duration) -> Self {
        Self {
            pose: Pose::default(),
            path: None,
            teleop: [0.0; 3],
            max_power: config.max_power,
            velocity: 0.0,
            speed: config.x_velocity,
            strafe_speed: config.y_velocity,
            acceleration: config.max_acceleration,
            deceleration: config.max_deceleration,
            turn_rate: config.max_angular_velocity,
            dt: period.as_secs_f64(),
        }
    }

    /// Fails when the odometry device named in `config` is not in the map.
    pub fn from_hardware(
        map: &HardwareMap,
        config: &FollowerConfig,
        period: Duration,
    ) -> Result<Self, HardwareError> {
        let odometry = map.sensor(&config.odometry)?;
        log::info!(
            "sim follower using odometry '{}' on port {}",
            config.odometry,
            odometry.port()
        );
        Ok(Self::new(config, period))
    }

    pub fn teleop_command(&self) -> [f64; 3] {
        self.teleop
    }

    fn slew_heading(&mut self, target: f64) {
        let step = self.turn_rate * self.max_power * self.dt;
        let error = heading_error(self.pose.heading, target);
        self.pose.heading = normalize_angle(self.pose.heading + error.clamp(-step, step));
    }
}

impl Follower for SimFollower {
    fn update(&mut self) {
        let speed = self.speed * self.max_power;
        if let Some(active) = self.path.as_mut() {
            let remaining = active.total() - active.travelled;
            // fastest speed that can still stop at the path end
            let stopping = (2.0 * self.deceleration * remaining).sqrt();
            self.velocity = (self.velocity + self.acceleration * self.dt)
                .min(speed)
                .min(stopping);
            active.travelled = (active.travelled + self.velocity * self.dt).min(active.total());
            let target = active.pose_at(active.travelled);
            let arrived = active.travelled >= active.total();
            let end_heading = active.chain.end_pose().heading;

            self.pose = self.pose.with_pos(target.pos());
            self.slew_heading(if arrived { end_heading } else { target.heading });
            if arrived && heading_error(self.pose.heading, end_heading).abs() < HEADING_SETTLE {
                log::debug!("sim follower reached {}", self.pose);
                self.path = None;
                self.velocity = 0.0;
            }
            return;
        }

        let [axial, lateral, yaw] = self.teleop;
        let forward = axial * speed * self.dt;
        let sideways = lateral * self.strafe_speed * self.max_power * self.dt;
        let offset = Vec2::from_polar(forward, self.pose.heading)
            + Vec2::from_polar(sideways, self.pose.heading - FRAC_PI_2);
        // positive yaw turns clockwise
        let heading = self.pose.heading - yaw * self.turn_rate * self.max_power * self.dt;
        self.pose = self.pose.translated(offset).with_heading(normalize_angle(heading));
    }

    fn follow_path(&mut self, path: PathChain) {
        self.teleop = [0.0; 3];
        self.velocity = 0.0;
        self.path = Some(ActivePath::new(path));
    }

    fn is_busy(&self) -> bool {
        self.path.is_some()
    }

    fn pose(&self) -> Pose {
        self.pose
    }

    fn set_starting_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    fn set_max_power(&mut self, power: f64) {
        self.max_power = power.clamp(0.0, 1.0);
    }

    fn max_power(&self) -> f64 {
        self.max_power
    }

    fn set_teleop_drive(&mut self, axial: f64, lateral: f64, yaw: f64) {
        self.path = None;
        self.velocity = 0.0;
        self.teleop = [axial, lateral, yaw];
    }
}

/// Start `sequence` at t = 0 and run it against `hub` until it finishes or `limit` passes.
///
/// Returns the time at which the last step completed, or `None` on timeout.
pub fn run_sequence<F: Follower>(
    sequence: &mut Sequence<F>,
    hub: &mut SimHub,
    telemetry: &mut Telemetry,
    limit: Duration,
) -> Option<Duration> {
    let mut pkt = HubCommand::default();
    let mut now = Duration::ZERO;
    let mut cycle = 0u32;
    let mut last_step = String::new();
    sequence.start(now, &mut pkt);

    while now <= limit {
        let state = hub.state();
        let step = sequence.update(now, &state, &mut pkt);

        if step != last_step || cycle % REPORT_EVERY == 0 {
            telemetry.log(
                "Step",
                format!(
                    "{}/{}: {step}",
                    (sequence.current_step_index() + 1).min(sequence.total_steps()),
                    sequence.total_steps()
                ),
            );
            telemetry.log("Pose", sequence.pose());
            if let Some(shooter) = sequence.shooter() {
                telemetry.log("Shooter", shooter.state());
                telemetry.log(
                    "RPM",
                    format!("{:.0} / {:.0}", shooter.current_rpm(), shooter.target_rpm()),
                );
            }
            if let Some(path) = sequence.current_path() {
                telemetry.draw_path(path);
                telemetry.draw_target(path.end_pose().pos(), TARGET_RADIUS);
            }
            telemetry.set_robot_pose(sequence.pose());
            telemetry.update();
            last_step = step;
        }

        hub.apply(&pkt);
        if sequence.is_finished() {
            return Some(now);
        }
        now += hub.period();
        cycle += 1;
    }
    log::warn!("sequence still running after {:.1}s", limit.as_secs_f64());
    None
}
