//! Testing utilities for the Waypoint flow engine.
//!
//! This crate provides the pieces the other crates' tests share: an observer
//! that records what a runner delivered, a renderer driven by a script of
//! emissions, assertion helpers for flow state, a small configurable fixture
//! flow and a logging setup for tests.

pub mod assertions;
pub mod builders;
pub mod mocks;
pub mod util;

pub use assertions::*;
pub use builders::{FixtureContext, FixtureFlowBuilder};
pub use mocks::{RecordingObserver, Rendered, ScriptedRenderer};
pub use util::init_test_logging;
