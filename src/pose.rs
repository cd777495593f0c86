use std::f64::consts::{PI, TAU};
use std::fmt;

use crate::vec::Vec2;

/// Position in inches and heading in radians, counter-clockwise from +x.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

impl Pose {
    pub const fn new(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }
    pub fn from_degrees(x: f64, y: f64, heading_deg: f64) -> Self {
        Self::new(x, y, heading_deg.to_radians())
    }
    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
    pub fn with_pos(self, pos: Vec2) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            ..self
        }
    }
    pub fn with_heading(self, heading: f64) -> Self {
        Self { heading, ..self }
    }
    /// Pose shifted by `offset` while keeping the heading.
    pub fn translated(self, offset: Vec2) -> Self {
        self.with_pos(self.pos() + offset)
    }
    pub fn is_finite(&self) -> bool {
        self.pos().is_finite() && self.heading.is_finite()
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.1} in, {:.1} in, {:.1}°)",
            self.x,
            self.y,
            self.heading.to_degrees()
        )
    }
}

/// Map any angle into (-PI, PI].
pub fn normalize_angle(angle: f64) -> f64 {
    // map into [0, TAU)
    let mut angle = angle.rem_euclid(TAU);
    // map into (-PI, PI]
    if angle > PI {
        angle -= TAU;
    }
    angle
}

/// Signed shortest rotation that takes `from` to `to`.
pub fn heading_error(from: f64, to: f64) -> f64 {
    normalize_angle(to - from)
}
