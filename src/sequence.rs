//! Autonomous step sequencer.
//!
//! Steps run strictly one after another. A step only ever sees the time
//! elapsed since it started; the sequence owns the clock bookkeeping and the
//! cursor, which never moves backwards.

use std::fmt;
use std::time::Duration;

use crate::error::SequenceError;
use crate::follower::Follower;
use crate::hardware::{HubCommand, HubState};
use crate::path::PathChain;
use crate::pose::{heading_error, Pose};
use crate::shooter::{Shooter, ShootingPreset};
use crate::vec::Vec2;

pub const FINISHED: &str = "FINISHED";
pub const NOT_STARTED: &str = "NOT STARTED";

const TURN_TOLERANCE_DEG: f64 = 3.0;
const TURN_SETTLED_TOLERANCE_DEG: f64 = 5.0;
const TURN_TIMEOUT: Duration = Duration::from_secs(2);
// length of the stub path used to ask the follower for a heading change
const TURN_STUB_LENGTH: f64 = 0.1;
/// Minimum time between the feed pulses of a burst.
pub const SHOT_INTERVAL: Duration = Duration::from_millis(500);

/// Completion predicate for a custom step: gets the follower and the time since the step started.
pub type Action<F> = Box<dyn FnMut(&mut F, Duration) -> bool>;

pub enum Step<F> {
    PathFollow {
        path: PathChain,
        name: String,
    },
    TurnToHeading {
        target: f64,
    },
    ShootBurst {
        shots: u32,
        preset: ShootingPreset,
        fired: u32,
        spinning_up: bool,
        last_shot: Duration,
        /// Fire anyway once spin-up has taken this long. `None` waits forever.
        spin_up_limit: Option<Duration>,
    },
    Wait {
        duration: Duration,
    },
    Custom {
        name: String,
        action: Action<F>,
    },
}

impl<F> fmt::Debug for Step<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathFollow { path, name } => f
                .debug_struct("PathFollow")
                .field("name", name)
                .field("end", &path.end_pose())
                .finish(),
            Self::TurnToHeading { target } => f
                .debug_struct("TurnToHeading")
                .field("target_deg", &target.to_degrees())
                .finish(),
            Self::ShootBurst {
                shots,
                preset,
                fired,
                ..
            } => f
                .debug_struct("ShootBurst")
                .field("shots", shots)
                .field("preset", preset)
                .field("fired", fired)
                .finish(),
            Self::Wait { duration } => f.debug_struct("Wait").field("duration", duration).finish(),
            Self::Custom { name, .. } => f.debug_struct("Custom").field("name", name).finish(),
        }
    }
}

/// Everything a step may touch during one cycle.
struct StepContext<'a, F> {
    follower: &'a mut F,
    shooter: Option<&'a mut Shooter>,
    now: Duration,
    pkt: &'a mut HubCommand,
}

impl<F: Follower> Step<F> {
    pub fn name(&self) -> String {
        match self {
            Self::PathFollow { name, .. } => name.clone(),
            Self::TurnToHeading { target } => format!("Turn to {:.1}°", target.to_degrees()),
            Self::ShootBurst {
                shots,
                fired,
                spinning_up,
                ..
            } => {
                if *spinning_up {
                    "Shooting (Spinning up...)".to_owned()
                } else {
                    format!("Shooting ({fired}/{shots})")
                }
            }
            Self::Wait { duration } => format!("Wait ({:.1}s)", duration.as_secs_f64()),
            Self::Custom { name, .. } => name.clone(),
        }
    }

    fn start(&mut self, ctx: StepContext<'_, F>) {
        match self {
            Self::PathFollow { path, .. } => ctx.follower.follow_path(path.clone()),
            Self::TurnToHeading { target } => {
                let pose = ctx.follower.pose();
                let end = pose.pos() + Vec2::from_polar(TURN_STUB_LENGTH, pose.heading);
                let stub = ctx
                    .follower
                    .path_builder()
                    .add_line(pose.pos(), end)
                    .linear_heading(pose.heading, *target)
                    .build();
                match stub {
                    Ok(stub) => ctx.follower.follow_path(stub),
                    // the step still ends through its tolerance or timeout checks
                    Err(e) => log::error!("could not build turn path: {e}"),
                }
            }
            Self::ShootBurst {
                preset,
                fired,
                spinning_up,
                last_shot,
                ..
            } => {
                *fired = 0;
                *spinning_up = true;
                *last_shot = Duration::ZERO;
                // the builder refuses shoot steps without a shooter
                if let Some(shooter) = ctx.shooter {
                    shooter.set_preset(*preset, ctx.pkt);
                    shooter.spin_up(ctx.pkt);
                }
            }
            Self::Wait { .. } | Self::Custom { .. } => {}
        }
    }

    fn update(&mut self, elapsed: Duration, ctx: StepContext<'_, F>) -> bool {
        match self {
            Self::PathFollow { .. } => !ctx.follower.is_busy(),
            Self::TurnToHeading { target } => {
                if elapsed >= TURN_TIMEOUT {
                    log::warn!(
                        "turn to {:.1}° timed out at {}",
                        target.to_degrees(),
                        ctx.follower.pose()
                    );
                    return true;
                }
                let error = heading_error(ctx.follower.pose().heading, *target).abs();
                error < TURN_TOLERANCE_DEG.to_radians()
                    || (!ctx.follower.is_busy() && error < TURN_SETTLED_TOLERANCE_DEG.to_radians())
            }
            Self::ShootBurst {
                shots,
                fired,
                spinning_up,
                last_shot,
                spin_up_limit,
                ..
            } => {
                let Some(shooter) = ctx.shooter else {
                    return true;
                };
                // without a limit a flywheel that never reaches speed stalls the sequence here
                if *spinning_up {
                    if shooter.is_at_speed() {
                        *spinning_up = false;
                        *last_shot = elapsed;
                    } else if spin_up_limit.is_some_and(|limit| elapsed >= limit) {
                        log::warn!(
                            "shooter not ready after {:.1}s ({:.0} rpm), firing anyway",
                            elapsed.as_secs_f64(),
                            shooter.current_rpm()
                        );
                        *spinning_up = false;
                        *last_shot = elapsed;
                    }
                    return false;
                }
                // a shot only counts once its feed pulse has actually started
                if *fired < *shots
                    && elapsed.saturating_sub(*last_shot) >= SHOT_INTERVAL
                    && shooter.fire_once(ctx.now, ctx.pkt)
                {
                    *fired += 1;
                    *last_shot = elapsed;
                }
                // let the last feed pulse finish before cutting power
                if *fired >= *shots && !shooter.is_firing() {
                    shooter.stop(ctx.pkt);
                    return true;
                }
                false
            }
            Self::Wait { duration } => elapsed >= *duration,
            Self::Custom { action, .. } => action(ctx.follower, elapsed),
        }
    }
}

pub struct SequenceBuilder<F> {
    follower: F,
    shooter: Option<Shooter>,
    steps: Vec<Step<F>>,
}

impl<F: Follower> SequenceBuilder<F> {
    pub fn new(follower: F) -> Self {
        Self {
            follower,
            shooter: None,
            steps: Vec::new(),
        }
    }

    pub fn with_shooter(mut self, shooter: Shooter) -> Self {
        self.shooter = Some(shooter);
        self
    }

    pub fn path(self, path: PathChain) -> Self {
        self.named_path(path, "Path")
    }

    pub fn named_path(mut self, path: PathChain, name: impl Into<String>) -> Self {
        self.steps.push(Step::PathFollow {
            path,
            name: name.into(),
        });
        self
    }

    /// Spin up, wait for speed however long it takes, then fire `shots` times.
    pub fn shoot(self, shots: u32, preset: ShootingPreset) -> Result<Self, SequenceError> {
        self.push_burst(shots, preset, None)
    }

    /// Like [`shoot`](Self::shoot), but starts firing after `spin_up_limit`
    /// even if the flywheel is still below speed.
    pub fn shoot_within(
        self,
        shots: u32,
        preset: ShootingPreset,
        spin_up_limit: Duration,
    ) -> Result<Self, SequenceError> {
        self.push_burst(shots, preset, Some(spin_up_limit))
    }

    fn push_burst(
        mut self,
        shots: u32,
        preset: ShootingPreset,
        spin_up_limit: Option<Duration>,
    ) -> Result<Self, SequenceError> {
        if self.shooter.is_none() {
            return Err(SequenceError::ShooterNotConfigured);
        }
        self.steps.push(Step::ShootBurst {
            shots,
            preset,
            fired: 0,
            spinning_up: true,
            last_shot: Duration::ZERO,
            spin_up_limit,
        });
        Ok(self)
    }

    /// Heading in radians.
    pub fn turn_to(mut self, target: f64) -> Self {
        self.steps.push(Step::TurnToHeading { target });
        self
    }

    pub fn wait(mut self, duration: Duration) -> Self {
        self.steps.push(Step::Wait { duration });
        self
    }

    pub fn custom(
        mut self,
        name: impl Into<String>,
        action: impl FnMut(&mut F, Duration) -> bool + 'static,
    ) -> Self {
        self.steps.push(Step::Custom {
            name: name.into(),
            action: Box::new(action),
        });
        self
    }

    pub fn build(self) -> Sequence<F> {
        Sequence {
            follower: self.follower,
            shooter: self.shooter,
            steps: self.steps,
            cursor: 0,
            step_start: Duration::ZERO,
            started: false,
        }
    }
}

pub struct Sequence<F> {
    follower: F,
    shooter: Option<Shooter>,
    steps: Vec<Step<F>>,
    cursor: usize,
    step_start: Duration,
    started: bool,
}

impl<F: Follower> Sequence<F> {
    pub fn builder(follower: F) -> SequenceBuilder<F> {
        SequenceBuilder::new(follower)
    }

    /// Begin with the first step. Does nothing for an empty sequence.
    pub fn start(&mut self, now: Duration, pkt: &mut HubCommand) {
        if self.steps.is_empty() {
            return;
        }
        self.cursor = 0;
        self.step_start = now;
        self.started = true;
        log::info!("autonomous started with {} steps", self.steps.len());
        self.start_current(now, pkt);
    }

    fn start_current(&mut self, now: Duration, pkt: &mut HubCommand) {
        let step = &mut self.steps[self.cursor];
        log::info!("step {}: started {step:?}", self.cursor);
        step.start(StepContext {
            follower: &mut self.follower,
            shooter: self.shooter.as_mut(),
            now,
            pkt,
        });
    }

    /// Run one control cycle and return the name of the step that was active during it.
    ///
    /// The follower is always updated first so every completion check sees a
    /// fresh pose, including during stationary steps.
    pub fn update(&mut self, now: Duration, state: &HubState, pkt: &mut HubCommand) -> String {
        self.follower.update();
        if let Some(shooter) = self.shooter.as_mut() {
            shooter.update(now, state, pkt);
        }

        if !self.started {
            return if self.steps.is_empty() {
                FINISHED.to_owned()
            } else {
                NOT_STARTED.to_owned()
            };
        }
        if self.cursor >= self.steps.len() {
            return FINISHED.to_owned();
        }

        let elapsed = now.saturating_sub(self.step_start);
        let step = &mut self.steps[self.cursor];
        let complete = step.update(
            elapsed,
            StepContext {
                follower: &mut self.follower,
                shooter: self.shooter.as_mut(),
                now,
                pkt,
            },
        );
        let name = step.name();

        if complete {
            log::info!(
                "step {}: \"{name}\" ended after {:.2}s at {}",
                self.cursor,
                elapsed.as_secs_f64(),
                self.follower.pose()
            );
            self.cursor += 1;
            if self.cursor < self.steps.len() {
                self.step_start = now;
                self.start_current(now, pkt);
            } else {
                log::info!("autonomous finished");
            }
        }
        name
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.steps.len() && (self.started || self.steps.is_empty())
    }

    pub fn current_step_index(&self) -> usize {
        self.cursor
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn current_step_name(&self) -> String {
        match self.steps.get(self.cursor) {
            Some(step) if self.started => step.name(),
            Some(_) => NOT_STARTED.to_owned(),
            None => FINISHED.to_owned(),
        }
    }

    pub fn pose(&self) -> Pose {
        self.follower.pose()
    }

    /// Path of the active step, for drawing.
    pub fn current_path(&self) -> Option<&PathChain> {
        match self.steps.get(self.cursor) {
            Some(Step::PathFollow { path, .. }) if self.started => Some(path),
            _ => None,
        }
    }

    pub fn follower(&self) -> &F {
        &self.follower
    }

    pub fn follower_mut(&mut self) -> &mut F {
        &mut self.follower
    }

    pub fn shooter(&self) -> Option<&Shooter> {
        self.shooter.as_ref()
    }

    pub fn shooter_mut(&mut self) -> Option<&mut Shooter> {
        self.shooter.as_mut()
    }
}
