//! Flywheel shooter with a timed feed servo.
//!
//! The flywheel runs open loop at the preset's power; the measured RPM is only
//! used to decide when the wheel is ready to fire.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::config::ShooterConfig;
use crate::controller::{self, Gamepad};
use crate::error::HardwareError;
use crate::hardware::{HardwareMap, HubCommand, HubState, MotorChannel, ServoChannel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShootingPreset {
    ShortRange,
    SafeTest,
}

impl ShootingPreset {
    pub fn power(&self) -> f64 {
        match self {
            Self::ShortRange => 1.0,
            Self::SafeTest => 0.5,
        }
    }
    pub fn target_rpm(&self) -> f64 {
        match self {
            Self::ShortRange => 2780.0,
            Self::SafeTest => 1390.0,
        }
    }
    pub fn description(&self) -> &'static str {
        match self {
            Self::ShortRange => "Short Range - Fast shooting for close goals",
            Self::SafeTest => "Safe Test - Slow speed for testing",
        }
    }
    pub fn next(&self) -> Self {
        match self {
            Self::ShortRange => Self::SafeTest,
            Self::SafeTest => Self::ShortRange,
        }
    }
}

/// Derived from the running and firing flags and the last RPM sample, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShooterState {
    Idle,
    SpinningUp,
    Ready,
    Firing,
}

impl fmt::Display for ShooterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::SpinningUp => "Spinning Up",
            Self::Ready => "Ready",
            Self::Firing => "Firing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Shooter {
    flywheel: MotorChannel,
    feed: ServoChannel,
    preset: ShootingPreset,
    running: bool,
    firing: bool,
    fire_start: Duration,
    // (encoder ticks, time) of the last RPM sample
    last_sample: Option<(i32, Duration)>,
    current_rpm: f64,
    counts_per_rev: f64,
    rpm_interval: Duration,
    fire_duration: Duration,
    speed_tolerance: f64,
}

impl Shooter {
    pub fn new(flywheel: MotorChannel, feed: ServoChannel, config: &ShooterConfig) -> Self {
        Self {
            flywheel,
            feed,
            preset: config.preset,
            running: false,
            firing: false,
            fire_start: Duration::ZERO,
            last_sample: None,
            current_rpm: 0.0,
            counts_per_rev: config.counts_per_rev,
            rpm_interval: config.rpm_interval(),
            fire_duration: config.fire_duration(),
            speed_tolerance: config.speed_tolerance,
        }
    }

    pub fn from_hardware(map: &HardwareMap, config: &ShooterConfig) -> Result<Self, HardwareError> {
        let flywheel = map.motor(&config.motor.name)?.reversed(config.motor.reversed);
        let feed = map.servo(&config.feed_servo)?;
        Ok(Self::new(flywheel, feed, config))
    }

    /// Sample the flywheel speed and run the feed pulse. Call once per cycle.
    pub fn update(&mut self, now: Duration, state: &HubState, pkt: &mut HubCommand) {
        self.sample_rpm(now, state.encoder(self.flywheel));

        if self.firing {
            if now.saturating_sub(self.fire_start) < self.fire_duration {
                pkt.set_servo(self.feed, 1.0);
            } else {
                pkt.set_servo(self.feed, 0.0);
                self.firing = false;
            }
        }
    }

    fn sample_rpm(&mut self, now: Duration, position: i32) {
        let Some((last_position, last_time)) = self.last_sample else {
            self.last_sample = Some((position, now));
            return;
        };
        let elapsed = now.saturating_sub(last_time);
        // sampling too often makes the tick delta too noisy to be useful
        if elapsed < self.rpm_interval {
            return;
        }
        // the hub counter is free running and may wrap
        let revolutions = position.wrapping_sub(last_position) as f64 / self.counts_per_rev;
        let minutes = elapsed.as_secs_f64() / 60.0;
        self.current_rpm = revolutions / minutes;
        self.last_sample = Some((position, now));
    }

    /// Y toggles the flywheel, A fires. Edges only, holding a button does nothing extra.
    pub fn handle_input(&mut self, gamepad: &Gamepad, now: Duration, pkt: &mut HubCommand) {
        if gamepad.pressed(controller::Y) {
            if self.running {
                self.stop(pkt);
            } else {
                self.spin_up(pkt);
            }
        }
        if gamepad.pressed(controller::A) && !self.fire_once(now, pkt) {
            log::debug!("fire ignored while {}", self.state());
        }
    }

    pub fn spin_up(&mut self, pkt: &mut HubCommand) {
        if !self.running {
            log::info!("shooter spinning up ({:?})", self.preset);
        }
        pkt.set_motor(self.flywheel, self.preset.power());
        self.running = true;
    }

    pub fn stop(&mut self, pkt: &mut HubCommand) {
        if self.running {
            log::info!("shooter stopped");
        }
        pkt.set_motor(self.flywheel, 0.0);
        pkt.set_servo(self.feed, 0.0);
        self.running = false;
        self.firing = false;
    }

    /// Start one feed pulse. Ignored unless the flywheel is running and idle.
    ///
    /// Returns whether a pulse was started.
    pub fn fire_once(&mut self, now: Duration, pkt: &mut HubCommand) -> bool {
        if !self.running || self.firing {
            return false;
        }
        log::debug!("firing at {:.0} rpm", self.current_rpm);
        self.firing = true;
        self.fire_start = now;
        pkt.set_servo(self.feed, 1.0);
        true
    }

    /// Takes effect on the flywheel immediately when it is already running.
    pub fn set_preset(&mut self, preset: ShootingPreset, pkt: &mut HubCommand) {
        if preset != self.preset {
            log::info!("shooter preset: {}", preset.description());
        }
        self.preset = preset;
        if self.running {
            pkt.set_motor(self.flywheel, preset.power());
        }
    }

    pub fn cycle_preset(&mut self, pkt: &mut HubCommand) {
        self.set_preset(self.preset.next(), pkt);
    }

    pub fn is_at_speed(&self) -> bool {
        if !self.running {
            return false;
        }
        let target = self.preset.target_rpm();
        (self.current_rpm - target).abs() < target * self.speed_tolerance
    }

    pub fn state(&self) -> ShooterState {
        if !self.running {
            ShooterState::Idle
        } else if self.firing {
            ShooterState::Firing
        } else if self.is_at_speed() {
            ShooterState::Ready
        } else {
            ShooterState::SpinningUp
        }
    }

    pub fn current_rpm(&self) -> f64 {
        self.current_rpm
    }
    pub fn target_rpm(&self) -> f64 {
        self.preset.target_rpm()
    }
    pub fn preset(&self) -> ShootingPreset {
        self.preset
    }
    pub fn is_running(&self) -> bool {
        self.running
    }
    pub fn is_firing(&self) -> bool {
        self.firing
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::controller::{GamepadState, A, Y};
    use approx::assert_relative_eq;

    pub(crate) fn hardware() -> HardwareMap {
        let mut map = HardwareMap::new();
        map.add_motor("shooter", 4).add_servo("feedServo", 0);
        map
    }

    fn shooter() -> Shooter {
        Shooter::from_hardware(&hardware(), &ShooterConfig::default()).unwrap()
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn encoder(ticks: i32) -> HubState {
        let mut state = HubState::default();
        state.encoders[4] = ticks;
        state
    }

    #[test]
    fn rpm_from_tick_delta() {
        let mut s = shooter();
        let mut pkt = HubCommand::default();
        s.update(ms(0), &encoder(0), &mut pkt);
        s.update(ms(100), &encoder(28), &mut pkt);
        assert_relative_eq!(s.current_rpm(), 600.0, epsilon = 1e-9);
    }

    #[test]
    fn rpm_survives_encoder_wrap() {
        let mut s = shooter();
        let mut pkt = HubCommand::default();
        s.update(ms(0), &encoder(i32::MAX - 10), &mut pkt);
        s.update(ms(100), &encoder(i32::MIN + 10), &mut pkt);
        // 21 ticks forward across the wrap
        assert_relative_eq!(s.current_rpm(), 450.0, epsilon = 1e-9);
    }

    #[test]
    fn rpm_holds_between_samples() {
        let mut s = shooter();
        let mut pkt = HubCommand::default();
        s.update(ms(0), &encoder(0), &mut pkt);
        s.update(ms(100), &encoder(28), &mut pkt);
        // too soon, keeps the previous value
        s.update(ms(150), &encoder(1000), &mut pkt);
        assert_relative_eq!(s.current_rpm(), 600.0, epsilon = 1e-9);
        s.update(ms(200), &encoder(1028), &mut pkt);
        assert_relative_eq!(s.current_rpm(), 600.0 * 1000.0 / 28.0, epsilon = 1e-6);
    }

    #[test]
    fn at_speed_only_inside_band_and_while_running() {
        let mut s = shooter();
        let mut pkt = HubCommand::default();
        s.update(ms(0), &encoder(0), &mut pkt);
        s.spin_up(&mut pkt);
        assert!(!s.is_at_speed());
        assert_eq!(s.state(), ShooterState::SpinningUp);

        // 130 ticks per 100ms is ~2786 rpm, target 2780
        s.update(ms(100), &encoder(130), &mut pkt);
        assert!(s.is_at_speed());
        assert_eq!(s.state(), ShooterState::Ready);

        s.stop(&mut pkt);
        assert!(!s.is_at_speed());
        assert_eq!(s.state(), ShooterState::Idle);
    }

    #[test]
    fn fire_requires_running() {
        let mut s = shooter();
        let mut pkt = HubCommand::default();
        assert!(!s.fire_once(ms(0), &mut pkt));
        assert!(!s.is_firing());
        assert_eq!(pkt.servos[0], 0.0);
    }

    #[test]
    fn feed_pulse_lasts_fire_duration() {
        let mut s = shooter();
        let mut pkt = HubCommand::default();
        s.spin_up(&mut pkt);
        assert!(s.fire_once(ms(1000), &mut pkt));
        assert_eq!(s.state(), ShooterState::Firing);
        assert_eq!(pkt.servos[0], 1.0);

        // firing again mid-pulse does not restart it
        assert!(!s.fire_once(ms(1200), &mut pkt));
        s.update(ms(1250), &encoder(0), &mut pkt);
        assert!(s.is_firing());
        assert_eq!(pkt.servos[0], 1.0);

        s.update(ms(1300), &encoder(0), &mut pkt);
        assert!(!s.is_firing());
        assert_eq!(pkt.servos[0], 0.0);
    }

    #[test]
    fn preset_change_applies_immediately_when_running() {
        let mut s = shooter();
        let mut pkt = HubCommand::default();
        s.set_preset(ShootingPreset::SafeTest, &mut pkt);
        assert_eq!(pkt.motors[4], 0.0);

        s.spin_up(&mut pkt);
        assert_eq!(pkt.motors[4], 0.5);
        s.cycle_preset(&mut pkt);
        assert_eq!(s.preset(), ShootingPreset::ShortRange);
        assert_eq!(pkt.motors[4], 1.0);
        assert_eq!(s.target_rpm(), 2780.0);
    }

    #[test]
    fn spin_up_is_idempotent() {
        let mut s = shooter();
        let mut pkt = HubCommand::default();
        s.spin_up(&mut pkt);
        let once = pkt;
        s.spin_up(&mut pkt);
        assert_eq!(pkt, once);
        assert!(s.is_running());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut s = shooter();
        let mut pkt = HubCommand::default();
        s.spin_up(&mut pkt);
        s.fire_once(ms(0), &mut pkt);
        s.stop(&mut pkt);
        let once = pkt;
        s.stop(&mut pkt);
        assert_eq!(pkt, once);
        assert_eq!(pkt.motors[4], 0.0);
        assert_eq!(pkt.servos[0], 0.0);
        assert!(!s.is_firing());
    }

    #[test]
    fn buttons_trigger_on_edges() {
        let mut s = shooter();
        let mut pkt = HubCommand::default();
        let mut pad = Gamepad::default();

        pad.advance(GamepadState::with_buttons(Y));
        s.handle_input(&pad, ms(0), &mut pkt);
        assert!(s.is_running());

        // still held, must not toggle back off
        pad.advance(GamepadState::with_buttons(Y));
        s.handle_input(&pad, ms(20), &mut pkt);
        assert!(s.is_running());

        pad.advance(GamepadState::with_buttons(A));
        s.handle_input(&pad, ms(40), &mut pkt);
        assert!(s.is_firing());

        pad.advance(GamepadState::with_buttons(Y));
        s.handle_input(&pad, ms(60), &mut pkt);
        assert!(!s.is_running());
        assert!(!s.is_firing());
    }

    #[test]
    fn state_names() {
        assert_eq!(ShooterState::SpinningUp.to_string(), "Spinning Up");
        assert_eq!(ShooterState::Ready.to_string(), "Ready");
    }
}
