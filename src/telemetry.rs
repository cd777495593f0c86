//! Driver station telemetry with an optional field dashboard.
//!
//! Driver station lines always go out through the `log` facade. The dashboard
//! is best effort: the first error it returns disables it for the rest of the
//! run and nothing retries it.

use std::fmt::Display;

use crate::error::DashboardError;
use crate::path::PathChain;
use crate::pose::Pose;
use crate::vec::Vec2;

pub const ROBOT_RADIUS: f64 = 9.0;
const PATH_SAMPLES: usize = 16;

/// External field-view renderer.
pub trait Dashboard {
    fn debug(&mut self, key: &str, value: &str) -> Result<(), DashboardError>;
    fn draw_robot(&mut self, pose: Pose, radius: f64) -> Result<(), DashboardError>;
    fn draw_path(&mut self, points: &[Vec2]) -> Result<(), DashboardError>;
    fn draw_target(&mut self, center: Vec2, radius: f64) -> Result<(), DashboardError>;
    fn flush(&mut self) -> Result<(), DashboardError>;
}

/// Dashboard that writes draw calls to the debug log, for running without a field view.
#[derive(Debug, Default)]
pub struct LogDashboard;

impl Dashboard for LogDashboard {
    fn debug(&mut self, key: &str, value: &str) -> Result<(), DashboardError> {
        log::trace!("dashboard {key}: {value}");
        Ok(())
    }
    fn draw_robot(&mut self, pose: Pose, _radius: f64) -> Result<(), DashboardError> {
        log::debug!("robot at {pose}");
        Ok(())
    }
    fn draw_path(&mut self, points: &[Vec2]) -> Result<(), DashboardError> {
        log::debug!("path with {} points", points.len());
        Ok(())
    }
    fn draw_target(&mut self, center: Vec2, radius: f64) -> Result<(), DashboardError> {
        log::debug!("target at ({:.1}, {:.1}) r={radius:.1}", center.x, center.y);
        Ok(())
    }
    fn flush(&mut self) -> Result<(), DashboardError> {
        Ok(())
    }
}

pub struct Telemetry {
    pending: Vec<String>,
    last_frame: Vec<String>,
    dashboard: Option<Box<dyn Dashboard>>,
}

impl Telemetry {
    pub fn new(dashboard: Option<Box<dyn Dashboard>>) -> Self {
        let mut telemetry = Self {
            pending: Vec::new(),
            last_frame: Vec::new(),
            dashboard,
        };
        if telemetry.dashboard_available() {
            telemetry.log_line("Panels dashboard connected");
        } else {
            telemetry.log_line("Panels dashboard not available, using driver station only");
        }
        telemetry
    }

    pub fn dashboard_available(&self) -> bool {
        self.dashboard.is_some()
    }

    fn with_dashboard(&mut self, f: impl FnOnce(&mut dyn Dashboard) -> Result<(), DashboardError>) {
        let Some(dashboard) = self.dashboard.as_deref_mut() else {
            return;
        };
        if let Err(e) = f(dashboard) {
            log::warn!("dashboard disabled for the rest of the run: {e}");
            self.dashboard = None;
        }
    }

    pub fn log(&mut self, key: &str, value: impl Display) {
        let value = value.to_string();
        self.with_dashboard(|d| d.debug(key, &value));
        self.pending.push(format!("{key}: {value}"));
    }

    pub fn log_line(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.with_dashboard(|d| d.debug("", &text));
        self.pending.push(text);
    }

    pub fn set_robot_pose(&mut self, pose: Pose) {
        if !pose.is_finite() {
            return;
        }
        self.with_dashboard(|d| d.draw_robot(pose, ROBOT_RADIUS));
    }

    pub fn draw_path(&mut self, path: &PathChain) {
        let points: Vec<Vec2> = path
            .sample(PATH_SAMPLES)
            .into_iter()
            .map(|p| if p.is_finite() { p } else { Vec2::ZERO })
            .collect();
        self.with_dashboard(|d| d.draw_path(&points));
    }

    pub fn draw_target(&mut self, center: Vec2, radius: f64) {
        self.with_dashboard(|d| d.draw_target(center, radius));
    }

    /// Push the accumulated lines to the driver station and flush the dashboard.
    pub fn update(&mut self) {
        for line in &self.pending {
            log::info!("{line}");
        }
        self.last_frame = std::mem::take(&mut self.pending);
        self.with_dashboard(|d| d.flush());
    }

    /// Lines shown by the most recent `update`.
    pub fn last_frame(&self) -> &[String] {
        &self.last_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Calls {
        debug: usize,
        robot: usize,
        flush: usize,
    }

    struct FlakyDashboard {
        calls: Rc<RefCell<Calls>>,
        fail_after: usize,
    }

    impl FlakyDashboard {
        fn check(&self) -> Result<(), DashboardError> {
            let c = self.calls.borrow();
            if c.debug + c.robot + c.flush > self.fail_after {
                Err(DashboardError::Disconnected)
            } else {
                Ok(())
            }
        }
    }

    impl Dashboard for FlakyDashboard {
        fn debug(&mut self, _: &str, _: &str) -> Result<(), DashboardError> {
            self.calls.borrow_mut().debug += 1;
            self.check()
        }
        fn draw_robot(&mut self, _: Pose, _: f64) -> Result<(), DashboardError> {
            self.calls.borrow_mut().robot += 1;
            self.check()
        }
        fn draw_path(&mut self, _: &[Vec2]) -> Result<(), DashboardError> {
            self.check()
        }
        fn draw_target(&mut self, _: Vec2, _: f64) -> Result<(), DashboardError> {
            self.check()
        }
        fn flush(&mut self) -> Result<(), DashboardError> {
            self.calls.borrow_mut().flush += 1;
            self.check()
        }
    }

    fn flaky(fail_after: usize) -> (Telemetry, Rc<RefCell<Calls>>) {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let dashboard = FlakyDashboard {
            calls: Rc::clone(&calls),
            fail_after,
        };
        (Telemetry::new(Some(Box::new(dashboard))), calls)
    }

    #[test]
    fn lines_reach_driver_station_without_dashboard() {
        let mut t = Telemetry::new(None);
        t.log("State", "TURN");
        t.log_line("hello");
        t.update();
        assert_eq!(
            t.last_frame(),
            &[
                "Panels dashboard not available, using driver station only".to_owned(),
                "State: TURN".to_owned(),
                "hello".to_owned()
            ]
        );
        t.update();
        assert!(t.last_frame().is_empty());
    }

    #[test]
    fn first_failure_disables_dashboard_for_good() {
        // connect banner is call 1, then one more succeeds
        let (mut t, calls) = flaky(2);
        assert!(t.dashboard_available());
        t.log("a", 1);
        t.log("b", 2);
        assert!(!t.dashboard_available());

        t.log("c", 3);
        t.set_robot_pose(Pose::new(1.0, 2.0, 0.0));
        t.update();
        assert_eq!(calls.borrow().debug, 3);
        assert_eq!(calls.borrow().robot, 0);
        assert_eq!(calls.borrow().flush, 0);
        // driver station is unaffected
        assert_eq!(t.last_frame().len(), 4);
    }

    #[test]
    fn failing_line_still_reaches_driver_station_in_order() {
        for line_first in [true, false] {
            // the banner succeeds, the next call fails
            let (mut t, _) = flaky(1);
            if line_first {
                t.log_line("x");
                t.log("k", 1);
            } else {
                t.log("k", 1);
                t.log_line("x");
            }
            t.update();
            assert!(!t.dashboard_available());
            let expected: &[&str] = if line_first {
                &["Panels dashboard connected", "x", "k: 1"]
            } else {
                &["Panels dashboard connected", "k: 1", "x"]
            };
            assert_eq!(t.last_frame(), expected);
        }
    }

    #[test]
    fn nan_pose_is_not_drawn() {
        let (mut t, calls) = flaky(usize::MAX);
        t.set_robot_pose(Pose::new(f64::NAN, 0.0, 0.0));
        assert_eq!(calls.borrow().robot, 0);
        t.set_robot_pose(Pose::new(0.0, 0.0, 0.0));
        assert_eq!(calls.borrow().robot, 1);
    }
}
