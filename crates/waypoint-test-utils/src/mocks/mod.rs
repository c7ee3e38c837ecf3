//! Test doubles for the runner's collaborators.
//!
//! The observer and renderer here stand in for the host application: one
//! records every event the runner delivered, the other plays back a script
//! of view emissions.

mod observer;
mod renderer;

pub use observer::RecordingObserver;
pub use renderer::{Rendered, ScriptedRenderer};
