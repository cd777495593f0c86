//! Autonomous routines.
//!
//! Routines are authored for the blue alliance. The red versions are the same
//! routine reflected across the field's Y axis.

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RoutineError, UnknownAlliance};
use crate::follower::Follower;
use crate::pose::{normalize_angle, Pose};
use crate::sequence::{Sequence, SequenceBuilder};
use crate::shooter::{Shooter, ShootingPreset};
use crate::vec::Vec2;

pub const BLUE_START: Pose = Pose::new(56.5, 8.5, FRAC_PI_2);
const LEAVE_DISTANCE: f64 = 30.0;
const BASE_OFFSET: Vec2 = Vec2::new(-20.0, 20.0);
const GOAL_HEADING_DEG: f64 = 114.0;
const BASE_HEADING_DEG: f64 = 45.0;
const TURN_MAX_POWER: f64 = 0.5;
const PRELOADED: u32 = 2;
// the timed routine gives up waiting for flywheel speed after this and fires anyway
const SKELETON_SPIN_UP_LIMIT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alliance {
    #[default]
    Blue,
    Red,
}

impl Alliance {
    pub fn mirror_point(self, point: Vec2) -> Vec2 {
        match self {
            Self::Blue => point,
            Self::Red => Vec2::new(-point.x, point.y),
        }
    }

    pub fn mirror_heading(self, heading: f64) -> f64 {
        match self {
            Self::Blue => heading,
            Self::Red => normalize_angle(PI - heading),
        }
    }

    /// Blue pose to this alliance's pose.
    pub fn mirror(self, pose: Pose) -> Pose {
        let pos = self.mirror_point(pose.pos());
        Pose::new(pos.x, pos.y, self.mirror_heading(pose.heading))
    }
}

impl fmt::Display for Alliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Blue => "Blue",
            Self::Red => "Red",
        })
    }
}

impl FromStr for Alliance {
    type Err = UnknownAlliance;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blue" => Ok(Self::Blue),
            "red" => Ok(Self::Red),
            _ => Err(UnknownAlliance(s.to_owned())),
        }
    }
}

fn with_optional_shooter<F: Follower>(
    builder: SequenceBuilder<F>,
    shooter: Option<Shooter>,
) -> SequenceBuilder<F> {
    match shooter {
        Some(shooter) => builder.with_shooter(shooter),
        None => builder,
    }
}

/// Leave the launch line, turn to the goal, shoot the preloads, park on the base.
///
/// Without a shooter the routine still drives and skips the shooting step.
pub fn pedro_routine<F: Follower + 'static>(
    mut follower: F,
    shooter: Option<Shooter>,
    alliance: Alliance,
) -> Result<Sequence<F>, RoutineError> {
    let start = alliance.mirror(BLUE_START);
    let after_leaving = start.translated(Vec2::new(0.0, LEAVE_DISTANCE));
    let goal_heading = alliance.mirror_heading(GOAL_HEADING_DEG.to_radians());
    let base = after_leaving.pos() + alliance.mirror_point(BASE_OFFSET);
    let base_heading = alliance.mirror_heading(BASE_HEADING_DEG.to_radians());

    follower.set_starting_pose(start);
    let cruise_power = follower.max_power();

    let leave = follower
        .path_builder()
        .add_line(start.pos(), after_leaving.pos())
        .constant_heading(start.heading)
        .build()?;
    let to_base = follower
        .path_builder()
        .add_line(after_leaving.pos(), base)
        .linear_heading(goal_heading, base_heading)
        .build()?;

    let has_shooter = shooter.is_some();
    let mut builder = with_optional_shooter(Sequence::builder(follower), shooter)
        .named_path(leave, "Leave launch line")
        .custom("Slow down for turn", |f: &mut F, _| {
            f.set_max_power(TURN_MAX_POWER);
            true
        })
        .turn_to(goal_heading)
        .custom("Restore drive power", move |f: &mut F, _| {
            f.set_max_power(cruise_power);
            true
        });
    if has_shooter {
        builder = builder.shoot(PRELOADED, ShootingPreset::ShortRange)?;
    } else {
        log::warn!("{alliance} auto running without a shooter, preloads stay on the robot");
    }
    let sequence = builder.named_path(to_base, "Move to base").build();

    log::info!(
        "{alliance} auto: {} steps from {start}",
        sequence.total_steps()
    );
    Ok(sequence)
}

/// Open-loop drive for a fixed time, then stop.
fn timed_drive<F: Follower + 'static>(
    axial: f64,
    duration: Duration,
) -> impl FnMut(&mut F, Duration) -> bool + 'static {
    move |follower, elapsed| {
        if elapsed >= duration {
            follower.set_teleop_drive(0.0, 0.0, 0.0);
            true
        } else {
            follower.set_teleop_drive(axial, 0.0, 0.0);
            false
        }
    }
}

/// Time based fallback: drive off the line, shoot, back up toward the base.
pub fn skeleton_routine<F: Follower + 'static>(
    follower: F,
    shooter: Option<Shooter>,
) -> Result<Sequence<F>, RoutineError> {
    let has_shooter = shooter.is_some();
    let mut builder = with_optional_shooter(Sequence::builder(follower), shooter)
        .custom("Leave launch line", timed_drive(0.5, Duration::from_secs(1)))
        .wait(Duration::from_millis(500));
    if has_shooter {
        builder =
            builder.shoot_within(PRELOADED, ShootingPreset::ShortRange, SKELETON_SPIN_UP_LIMIT)?;
    }
    Ok(builder
        .custom(
            "Drive toward base",
            timed_drive(-0.4, Duration::from_millis(800)),
        )
        .build())
}
