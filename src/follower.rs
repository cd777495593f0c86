use crate::path::{PathBuilder, PathChain};
use crate::pose::Pose;

/// Path-following engine with its own localizer.
///
/// The sequencer only drives this through the capability set below; how the
/// pose is estimated and how a path is tracked is up to the implementation.
/// `update` must run once per control cycle before anything reads `pose`.
pub trait Follower {
    /// Advance the pose estimate and the tracking controller by one cycle.
    fn update(&mut self);
    /// Replace whatever is being followed with `path`.
    fn follow_path(&mut self, path: PathChain);
    /// True while a path is being tracked and its end has not been reached.
    fn is_busy(&self) -> bool;
    fn pose(&self) -> Pose;
    fn set_starting_pose(&mut self, pose: Pose);
    /// Ceiling applied to drive output, in [0, 1].
    fn set_max_power(&mut self, power: f64);
    fn max_power(&self) -> f64;
    /// Open-loop drive, cancels any active path.
    fn set_teleop_drive(&mut self, axial: f64, lateral: f64, yaw: f64);

    fn path_builder(&self) -> PathBuilder {
        PathChain::builder()
    }
}

impl<F: Follower + ?Sized> Follower for Box<F> {
    fn update(&mut self) {
        (**self).update()
    }
    fn follow_path(&mut self, path: PathChain) {
        (**self).follow_path(path)
    }
    fn is_busy(&self) -> bool {
        (**self).is_busy()
    }
    fn pose(&self) -> Pose {
        (**self).pose()
    }
    fn set_starting_pose(&mut self, pose: Pose) {
        (**self).set_starting_pose(pose)
    }
    fn set_max_power(&mut self, power: f64) {
        (**self).set_max_power(power)
    }
    fn max_power(&self) -> f64 {
        (**self).max_power()
    }
    fn set_teleop_drive(&mut self, axial: f64, lateral: f64, yaw: f64) {
        (**self).set_teleop_drive(axial, lateral, yaw)
    }
}
