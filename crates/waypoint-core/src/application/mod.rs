/// Sub-flow invocation
pub mod subflow;

/// Flow runner and rendering bridge
pub mod runner;
