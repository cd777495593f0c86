//! Path descriptions handed to the follower.
//!
//! The follower owns the actual tracking; this module only describes where
//! to go and how the heading should evolve along the way.

use crate::error::PathError;
use crate::pose::{normalize_angle, Pose};
use crate::vec::Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeadingInterpolation {
    /// Blend from `start` to `end` over the segment, taking the short way round.
    Linear { start: f64, end: f64 },
    Constant(f64),
    /// Face along the direction of travel.
    Tangent,
}

impl HeadingInterpolation {
    fn heading_at(&self, t: f64, tangent: Vec2) -> f64 {
        match *self {
            Self::Linear { start, end } => {
                normalize_angle(start + normalize_angle(end - start) * t.clamp(0.0, 1.0))
            }
            Self::Constant(heading) => heading,
            Self::Tangent => tangent.angle(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Curve {
    Line { start: Vec2, end: Vec2 },
    /// Bezier curve through the given control points, first and last are the endpoints.
    Bezier { points: Vec<Vec2> },
}

impl Curve {
    pub fn start(&self) -> Vec2 {
        match self {
            Self::Line { start, .. } => *start,
            Self::Bezier { points } => points[0],
        }
    }

    pub fn end(&self) -> Vec2 {
        match self {
            Self::Line { end, .. } => *end,
            Self::Bezier { points } => points[points.len() - 1],
        }
    }

    pub fn point_at(&self, t: f64) -> Vec2 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Line { start, end } => start.lerp(*end, t),
            Self::Bezier { points } => {
                // de Casteljau
                let mut work = points.clone();
                for level in (1..work.len()).rev() {
                    for i in 0..level {
                        work[i] = work[i].lerp(work[i + 1], t);
                    }
                }
                work[0]
            }
        }
    }

    fn tangent_at(&self, t: f64) -> Vec2 {
        const DT: f64 = 1e-3;
        let (a, b) = if t >= 1.0 - DT {
            (t - DT, t)
        } else {
            (t, t + DT)
        };
        self.point_at(b) - self.point_at(a)
    }

    /// Polyline approximation of the arc length.
    pub fn length(&self) -> f64 {
        match self {
            Self::Line { start, end } => (*end - *start).mag(),
            Self::Bezier { .. } => {
                const SAMPLES: usize = 32;
                (0..SAMPLES)
                    .map(|i| {
                        let a = self.point_at(i as f64 / SAMPLES as f64);
                        let b = self.point_at((i + 1) as f64 / SAMPLES as f64);
                        (b - a).mag()
                    })
                    .sum()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub curve: Curve,
    pub heading: HeadingInterpolation,
}

impl PathSegment {
    pub fn pose_at(&self, t: f64) -> Pose {
        let pos = self.curve.point_at(t);
        let heading = self.heading.heading_at(t, self.curve.tangent_at(t));
        Pose::new(pos.x, pos.y, heading)
    }
}

/// Ordered list of segments followed back to back.
#[derive(Debug, Clone, PartialEq)]
pub struct PathChain {
    segments: Vec<PathSegment>,
}

impl PathChain {
    pub fn builder() -> PathBuilder {
        PathBuilder::default()
    }
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }
    pub fn len(&self) -> usize {
        self.segments.len()
    }
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
    pub fn start_pose(&self) -> Pose {
        self.segments[0].pose_at(0.0)
    }
    pub fn end_pose(&self) -> Pose {
        self.segments[self.segments.len() - 1].pose_at(1.0)
    }
    pub fn length(&self) -> f64 {
        self.segments.iter().map(|s| s.curve.length()).sum()
    }
    /// Points for drawing, `per_segment` samples on each segment.
    pub fn sample(&self, per_segment: usize) -> Vec<Vec2> {
        let per_segment = per_segment.max(1);
        let mut points = vec![self.segments[0].curve.start()];
        for seg in &self.segments {
            points.extend(
                (1..=per_segment).map(|i| seg.curve.point_at(i as f64 / per_segment as f64)),
            );
        }
        points
    }
}

/// Heading setters apply to the most recently added segment.
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    segments: Vec<PathSegment>,
    error: Option<PathError>,
}

impl PathBuilder {
    pub fn add_line(mut self, start: impl Into<Vec2>, end: impl Into<Vec2>) -> Self {
        self.segments.push(PathSegment {
            curve: Curve::Line {
                start: start.into(),
                end: end.into(),
            },
            heading: HeadingInterpolation::Tangent,
        });
        self
    }

    pub fn add_curve(mut self, points: Vec<Vec2>) -> Self {
        if points.len() < 2 {
            self.error.get_or_insert(PathError::DegenerateCurve);
            return self;
        }
        self.segments.push(PathSegment {
            curve: Curve::Bezier { points },
            heading: HeadingInterpolation::Tangent,
        });
        self
    }

    fn set_heading(mut self, heading: HeadingInterpolation) -> Self {
        if let Some(last) = self.segments.last_mut() {
            last.heading = heading;
        }
        self
    }

    pub fn linear_heading(self, start: f64, end: f64) -> Self {
        self.set_heading(HeadingInterpolation::Linear { start, end })
    }

    pub fn constant_heading(self, heading: f64) -> Self {
        self.set_heading(HeadingInterpolation::Constant(heading))
    }

    pub fn tangent_heading(self) -> Self {
        self.set_heading(HeadingInterpolation::Tangent)
    }

    pub fn build(self) -> Result<PathChain, PathError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.segments.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(PathChain {
            segments: self.segments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn empty_chain_is_rejected() {
        assert_eq!(PathChain::builder().build(), Err(PathError::Empty));
        assert_eq!(
            PathChain::builder()
                .add_curve(vec![Vec2::ZERO])
                .build(),
            Err(PathError::DegenerateCurve)
        );
    }

    #[test]
    fn line_endpoints_and_heading() {
        let chain = PathChain::builder()
            .add_line((0.0, 0.0), (0.0, 30.0))
            .constant_heading(FRAC_PI_2)
            .build()
            .unwrap();
        assert_eq!(chain.end_pose(), Pose::new(0.0, 30.0, FRAC_PI_2));
        assert_relative_eq!(chain.length(), 30.0);
    }

    #[test]
    fn linear_heading_takes_short_way() {
        let seg = PathSegment {
            curve: Curve::Line {
                start: Vec2::ZERO,
                end: Vec2::new(1.0, 0.0),
            },
            heading: HeadingInterpolation::Linear {
                start: 170f64.to_radians(),
                end: -170f64.to_radians(),
            },
        };
        assert_relative_eq!(
            seg.pose_at(0.5).heading.abs(),
            180f64.to_radians(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn bezier_passes_through_endpoints() {
        let curve = Curve::Bezier {
            points: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(10.0, 20.0),
                Vec2::new(20.0, 0.0),
            ],
        };
        assert_eq!(curve.point_at(0.0), Vec2::new(0.0, 0.0));
        assert_eq!(curve.point_at(1.0), Vec2::new(20.0, 0.0));
        assert_relative_eq!(curve.point_at(0.5).y, 10.0);
        assert!(curve.length() > 20.0);
    }

    #[test]
    fn tangent_heading_follows_direction() {
        let chain = PathChain::builder()
            .add_line((0.0, 0.0), (-10.0, 0.0))
            .build()
            .unwrap();
        assert_relative_eq!(chain.end_pose().heading.abs(), std::f64::consts::PI, epsilon = 1e-9);
    }

    #[test]
    fn sample_includes_every_endpoint() {
        let chain = PathChain::builder()
            .add_line((0.0, 0.0), (10.0, 0.0))
            .add_line((10.0, 0.0), (10.0, 10.0))
            .build()
            .unwrap();
        let pts = chain.sample(4);
        assert_eq!(pts.len(), 9);
        assert_eq!(pts[0], Vec2::ZERO);
        assert_eq!(pts[8], Vec2::new(10.0, 10.0));
    }
}
