//! Assertion utilities for validating flow instances and runner output.
//!
//! Each helper returns a `Result` so tests can either `?` them or unwrap
//! with a readable message.

mod flow_state;

pub use flow_state::*;
