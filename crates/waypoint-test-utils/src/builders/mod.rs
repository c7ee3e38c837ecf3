//! Builders for fixture flows used across test suites.

mod fixture_flow;

pub use fixture_flow::{FixtureContext, FixtureFlowBuilder, NEXT};
