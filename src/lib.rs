//! Starter robot code for the DECODE season: a drive mixer, a flywheel shooter,
//! an autonomous step sequencer and the TeleOp coordinator tying them together.
//!
//! Everything runs from a single control loop. Each cycle the harness reads a
//! [`hardware::HubState`], calls `update` on whatever is active and writes the
//! resulting [`hardware::HubCommand`] back out.

pub mod auto;
pub mod config;
pub mod controller;
pub mod drivebase;
pub mod error;
pub mod follower;
pub mod hardware;
pub mod path;
pub mod pose;
pub mod robot;
pub mod sequence;
pub mod shooter;
pub mod sim;
pub mod telemetry;
pub mod vec;
