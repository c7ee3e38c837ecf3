//!
//! Waypoint Core - the flow orchestration engine
//!
//! A flow is a finite-state machine over an immutable context. Each state
//! holds an ordered list of transition rules; the first rule whose event
//! name matches and whose guard passes picks the next state, and its
//! reducer builds the next context. Events no rule accepts bubble out to
//! the host. States may invoke a nested flow whose final event is handed
//! back to the parent as an ordinary event.
//!
//! ```
//! use waypoint_core::{
//!     FlowContext, FlowDefinition, FlowEvent, FlowInstance, StateNode, TransitionRule,
//! };
//!
//! #[derive(Debug, Clone)]
//! struct Wizard { step: u32 }
//!
//! impl FlowContext for Wizard {
//!     type View = u32;
//!     type Seed = ();
//!     fn current_view(&self) -> Option<&u32> { Some(&self.step) }
//! }
//!
//! let definition = FlowDefinition::builder("wizard")
//!     .context_factory(|_: ()| Wizard { step: 0 })
//!     .state("start", StateNode::new().rule(
//!         TransitionRule::on("NEXT", "end").update(|w: &Wizard, _| Wizard { step: w.step + 1 }),
//!     ))
//!     .state("end", StateNode::terminal())
//!     .build()?;
//!
//! let mut flow = FlowInstance::start(definition, ())?;
//! flow.dispatch(FlowEvent::new("NEXT"))?;
//! assert_eq!(flow.state().as_str(), "end");
//! assert_eq!(flow.current_view(), Some(&1));
//! # Ok::<(), waypoint_core::FlowError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - context contract, rules, definitions and instances
pub mod domain;

/// Application layer - sub-flows and the runner
pub mod application;

/// Runtime configuration
pub mod config;

/// Core types
pub mod types;

/// Error types
pub mod error;

pub use application::runner::{
    render_instance, render_nested, Emitter, EventObserver, FlowRunner, NoopObserver, Renderer,
};
pub use application::subflow::{
    downcast_nested, expect_nested, Delivery, NestedFlow, SubflowSpec, MAX_SUBFLOW_DEPTH,
};
pub use config::{RunnerConfig, RuntimeConfig};
pub use domain::context::{FlowContext, Progress};
pub use domain::events::LifecycleEvent;
pub use domain::flow_definition::{ContextFactory, FlowDefinition, FlowDefinitionBuilder};
pub use domain::flow_instance::{DispatchOutcome, FlowId, FlowInstance, FlowInstanceId, StateId};
pub use domain::transition::{Guard, Reducer, StateNode, TransitionRule};
pub use domain::validation::{
    codes, validate_graph, Severity, ValidationIssue, ValidationMode, ValidationReport,
};
pub use error::FlowError;
pub use types::{DataPacket, FlowEvent};
