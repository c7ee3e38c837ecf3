//! Sub-flow invocation.
//!
//! A state built with [`StateNode::invoking`](crate::StateNode::invoking)
//! starts a child [`FlowInstance`] whenever the parent enters it. The child
//! runs with its own state and context. Events reach it first; when it
//! lands in a terminal state its final event is dispatched to the parent
//! like any other event. The child is dropped once the parent moves on
//! that event; until then it stays attached in its terminal state.
//!
//! Children are stored type-erased as `Box<dyn NestedFlow>` so a flow over
//! one context type can invoke a flow over another.

use crate::domain::context::FlowContext;
use crate::domain::flow_definition::FlowDefinition;
use crate::domain::flow_instance::{FlowId, FlowInstance, FlowInstanceId, StateId};
use crate::{FlowError, FlowEvent};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// How deep sub-flows may nest before spawning is refused
pub const MAX_SUBFLOW_DEPTH: usize = 16;

/// What delivering an event through a flow (and its active children) did
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Some flow in the chain moved to a non-terminal state
    Transitioned {
        /// Flow that moved
        flow: FlowId,
        /// State before
        from: StateId,
        /// State after
        to: StateId,
    },

    /// The flow entered a terminal state; `event` is the one that got it there
    Completed {
        /// Flow that finished
        flow: FlowId,
        /// Terminal state reached
        state: StateId,
        /// Final event, handed to the parent when there is one
        event: FlowEvent,
    },

    /// Nobody in the chain accepted the event
    Bubbled(FlowEvent),
}

impl Delivery {
    /// Whether the event escaped the flow unhandled
    pub fn is_bubbled(&self) -> bool {
        matches!(self, Delivery::Bubbled(_))
    }
}

/// Object-safe view of a running flow of any context type
pub trait NestedFlow: Send + fmt::Debug {
    /// Definition being run
    fn flow_id(&self) -> &FlowId;

    /// Unique id of the running instance
    fn instance_id(&self) -> &FlowInstanceId;

    /// Current state name
    fn current_state(&self) -> &StateId;

    /// Whether the current state accepts no events
    fn is_terminal(&self) -> bool;

    /// Nesting depth, zero for a top-level flow
    fn depth(&self) -> usize;

    /// Route an event through this flow and its own children
    fn deliver(&mut self, event: FlowEvent) -> Result<Delivery, FlowError>;

    /// The child this flow is currently running, if any
    fn active_subflow(&self) -> Option<&dyn NestedFlow>;

    /// Upcast for [`downcast_nested`]
    fn as_any(&self) -> &dyn Any;
}

/// Typed access to a nested flow
pub fn downcast_nested<C: FlowContext>(nested: &dyn NestedFlow) -> Option<&FlowInstance<C>> {
    nested.as_any().downcast_ref::<FlowInstance<C>>()
}

/// Like [`downcast_nested`], failing with [`FlowError::SubflowTypeMismatch`]
pub fn expect_nested<C: FlowContext>(
    nested: &dyn NestedFlow,
) -> Result<&FlowInstance<C>, FlowError> {
    downcast_nested(nested).ok_or_else(|| FlowError::SubflowTypeMismatch {
        flow: nested.flow_id().0.clone(),
        expected: std::any::type_name::<C>(),
    })
}

type Spawner<C> = Arc<
    dyn Fn(&C, Option<&StateId>, usize) -> Result<Box<dyn NestedFlow>, FlowError> + Send + Sync,
>;

/// The child flow an invoking state starts, and how to seed it
pub struct SubflowSpec<C> {
    child_flow: FlowId,
    initial_state: Option<StateId>,
    spawner: Spawner<C>,
}

impl<C: FlowContext> SubflowSpec<C> {
    /// Run `child` seeded from the parent context by `seed`
    pub fn new<Child, F>(child: Arc<FlowDefinition<Child>>, seed: F) -> Self
    where
        Child: FlowContext,
        F: Fn(&C) -> Child::Seed + Send + Sync + 'static,
    {
        let child_flow = child.id().clone();
        let spawner: Spawner<C> = Arc::new(move |parent, initial, depth| {
            let state = initial
                .cloned()
                .unwrap_or_else(|| child.initial_state().clone());
            let instance =
                FlowInstance::create_nested(Arc::clone(&child), state, seed(parent), depth)?;
            Ok(Box::new(instance) as Box<dyn NestedFlow>)
        });

        Self {
            child_flow,
            initial_state: None,
            spawner,
        }
    }

    /// Start the child somewhere other than its default initial state
    pub fn starting_at(mut self, state: impl Into<StateId>) -> Self {
        self.initial_state = Some(state.into());
        self
    }

    /// Id of the child flow definition
    pub fn child_flow(&self) -> &FlowId {
        &self.child_flow
    }

    pub(crate) fn spawn(
        &self,
        parent: &C,
        depth: usize,
    ) -> Result<Box<dyn NestedFlow>, FlowError> {
        (self.spawner)(parent, self.initial_state.as_ref(), depth)
    }
}

impl<C> fmt::Debug for SubflowSpec<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubflowSpec")
            .field("child_flow", &self.child_flow)
            .field("initial_state", &self.initial_state)
            .finish()
    }
}
