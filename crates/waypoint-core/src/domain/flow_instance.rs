use crate::application::subflow::{Delivery, NestedFlow, MAX_SUBFLOW_DEPTH};
use crate::domain::context::FlowContext;
use crate::domain::events::LifecycleEvent;
use crate::domain::flow_definition::FlowDefinition;
use crate::{FlowError, FlowEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Value object: Flow Instance ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowInstanceId(pub String);

/// Value object: Flow ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowId(pub String);

/// Value object: State ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub String);

macro_rules! string_id {
    ($($ty:ident),*) => {$(
        impl $ty {
            /// The id as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $ty {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    )*};
}

string_id!(FlowInstanceId, FlowId, StateId);

impl Borrow<str> for StateId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for StateId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StateId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// What a single `dispatch` did
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A rule fired; state and context were replaced together
    Transitioned {
        /// State before the transition
        from: StateId,
        /// State after the transition
        to: StateId,
        /// Declaration index of the rule that fired
        rule: usize,
    },

    /// No rule accepted the event; it is handed back untouched for bubbling
    Unmatched(FlowEvent),
}

impl DispatchOutcome {
    /// Whether the instance moved
    pub fn is_transition(&self) -> bool {
        matches!(self, DispatchOutcome::Transitioned { .. })
    }
}

/// Aggregate: one running flow
///
/// Holds the current state name and context of a flow and changes only
/// through [`dispatch`](Self::dispatch) (or [`deliver`](Self::deliver),
/// which routes through an active sub-flow first). The context is
/// replaced, never edited: a handle obtained from [`context`](Self::context)
/// before a transition still reads the old values afterwards.
pub struct FlowInstance<C: FlowContext> {
    id: FlowInstanceId,
    definition: Arc<FlowDefinition<C>>,
    state: StateId,
    context: Arc<C>,
    subflow: Option<Box<dyn NestedFlow>>,
    depth: usize,
    created_at: DateTime<Utc>,
    events: Vec<LifecycleEvent>,
}

/// How a transition out of an invoking state treats its child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChildExit {
    Discarded,
    Completed,
}

impl<C: FlowContext> FlowInstance<C> {
    /// Create an instance in `initial_state`, seeding the context factory with `seed`
    pub fn create(
        definition: Arc<FlowDefinition<C>>,
        initial_state: impl Into<StateId>,
        seed: C::Seed,
    ) -> Result<Self, FlowError> {
        Self::create_nested(definition, initial_state.into(), seed, 0)
    }

    /// Create an instance in the definition's default initial state
    pub fn start(definition: Arc<FlowDefinition<C>>, seed: C::Seed) -> Result<Self, FlowError> {
        let initial = definition.initial_state().clone();
        Self::create_nested(definition, initial, seed, 0)
    }

    pub(crate) fn create_nested(
        definition: Arc<FlowDefinition<C>>,
        initial_state: StateId,
        seed: C::Seed,
        depth: usize,
    ) -> Result<Self, FlowError> {
        if depth > MAX_SUBFLOW_DEPTH {
            return Err(FlowError::SubflowDepthExceeded {
                flow: definition.id().0.clone(),
                limit: MAX_SUBFLOW_DEPTH,
            });
        }

        if !definition.contains_state(initial_state.as_str()) {
            return Err(FlowError::UnknownState {
                flow: definition.id().0.clone(),
                state: initial_state.0,
            });
        }

        let context = Arc::new(definition.initial_context(seed));
        let id = FlowInstanceId(Uuid::new_v4().to_string());
        let now = Utc::now();

        let mut instance = Self {
            events: vec![LifecycleEvent::FlowStarted {
                flow_instance_id: id.clone(),
                flow_id: definition.id().clone(),
                state: initial_state.clone(),
                timestamp: now,
            }],
            id,
            definition,
            state: initial_state,
            context,
            subflow: None,
            depth,
            created_at: now,
        };

        let child = instance.spawn_for(&instance.state, &instance.context)?;
        if let Some(child) = child {
            instance.record_subflow_started(child.flow_id().clone());
            instance.subflow = Some(child);
        }

        debug!(
            flow = %instance.definition.id(),
            instance = %instance.id,
            state = %instance.state,
            depth = instance.depth,
            "Flow instance created"
        );

        Ok(instance)
    }

    /// Apply one event to this instance only, ignoring any active sub-flow
    ///
    /// The first rule of the current state whose event name matches and
    /// whose guard passes is applied. Its reducer runs against the current
    /// context; only if it succeeds are the state and context swapped, so a
    /// failing reducer leaves the instance exactly as it was. An event no
    /// rule accepts comes back as [`DispatchOutcome::Unmatched`].
    pub fn dispatch(&mut self, event: FlowEvent) -> Result<DispatchOutcome, FlowError> {
        self.dispatch_with(event, ChildExit::Discarded)
    }

    fn dispatch_with(
        &mut self,
        event: FlowEvent,
        exit: ChildExit,
    ) -> Result<DispatchOutcome, FlowError> {
        let definition = Arc::clone(&self.definition);
        let node = definition
            .state(self.state.as_str())
            .ok_or_else(|| FlowError::UnknownState {
                flow: definition.id().0.clone(),
                state: self.state.0.clone(),
            })?;

        let Some((index, rule)) = node.matching_rule(&self.context, &event) else {
            trace!(
                flow = %definition.id(),
                state = %self.state,
                event = %event.name,
                "No rule matched, bubbling event"
            );
            self.events.push(LifecycleEvent::EventBubbled {
                flow_instance_id: self.id.clone(),
                event: event.name.clone(),
                state: self.state.clone(),
                timestamp: Utc::now(),
            });
            return Ok(DispatchOutcome::Unmatched(event));
        };

        let next = rule.apply(&self.context, &event).map_err(|e| {
            warn!(
                flow = %definition.id(),
                state = %self.state,
                event = %event.name,
                error = %e,
                "Reducer failed, keeping previous state"
            );
            FlowError::Reducer {
                flow: definition.id().0.clone(),
                state: self.state.0.clone(),
                event: event.name.clone(),
                message: e.to_string(),
            }
        })?;
        let next = Arc::new(next);

        let target = rule.target().clone();
        let child = self.spawn_for(&target, &next)?;

        if let Some(previous) = self.subflow.take() {
            self.events.push(match exit {
                ChildExit::Discarded => LifecycleEvent::SubflowDiscarded {
                    flow_instance_id: self.id.clone(),
                    child_flow_id: previous.flow_id().clone(),
                    child_state: previous.current_state().clone(),
                    timestamp: Utc::now(),
                },
                ChildExit::Completed => LifecycleEvent::SubflowCompleted {
                    flow_instance_id: self.id.clone(),
                    child_flow_id: previous.flow_id().clone(),
                    event: event.name.clone(),
                    timestamp: Utc::now(),
                },
            });
        }

        let from = std::mem::replace(&mut self.state, target);
        self.context = next;

        debug!(
            flow = %definition.id(),
            event = %event.name,
            from = %from,
            to = %self.state,
            rule = rule.label().unwrap_or(""),
            "Transition applied"
        );

        self.events.push(LifecycleEvent::TransitionApplied {
            flow_instance_id: self.id.clone(),
            event: event.name,
            from: from.clone(),
            to: self.state.clone(),
            timestamp: Utc::now(),
        });

        if let Some(child) = child {
            self.record_subflow_started(child.flow_id().clone());
            self.subflow = Some(child);
        }

        Ok(DispatchOutcome::Transitioned {
            from,
            to: self.state.clone(),
            rule: index,
        })
    }

    /// Deliver an event through the active sub-flow, then this instance
    ///
    /// A running child sees the event first. If the child moves without
    /// finishing, that is the result. If the child finishes, its final event
    /// is dispatched here exactly once, and the child is released only when
    /// that dispatch moves this instance. A finished child whose final event
    /// fails or matches nothing here stays attached and bubbles whatever
    /// arrives next, so a later event can still complete the handoff. If the
    /// child does not accept the event, it is dispatched here instead.
    pub fn deliver(&mut self, event: FlowEvent) -> Result<Delivery, FlowError> {
        let Some(child) = self.subflow.as_mut() else {
            return self.dispatch_here(event, ChildExit::Discarded);
        };

        let delivery = child.deliver(event)?;
        let exit = if child.is_terminal() {
            ChildExit::Completed
        } else {
            ChildExit::Discarded
        };
        match delivery {
            Delivery::Bubbled(event) | Delivery::Completed { event, .. } => {
                self.dispatch_here(event, exit)
            }
            transitioned => Ok(transitioned),
        }
    }

    fn dispatch_here(&mut self, event: FlowEvent, exit: ChildExit) -> Result<Delivery, FlowError> {
        let final_event = event.clone();
        match self.dispatch_with(event, exit)? {
            DispatchOutcome::Transitioned { from, to, .. } => {
                let flow = self.definition.id().clone();
                if self.is_terminal() {
                    Ok(Delivery::Completed {
                        flow,
                        state: to,
                        event: final_event,
                    })
                } else {
                    Ok(Delivery::Transitioned { flow, from, to })
                }
            }
            DispatchOutcome::Unmatched(event) => Ok(Delivery::Bubbled(event)),
        }
    }

    fn spawn_for(
        &self,
        state: &StateId,
        context: &C,
    ) -> Result<Option<Box<dyn NestedFlow>>, FlowError> {
        match self
            .definition
            .state(state.as_str())
            .and_then(|node| node.subflow())
        {
            Some(spec) => spec.spawn(context, self.depth + 1).map(Some),
            None => Ok(None),
        }
    }

    fn record_subflow_started(&mut self, child_flow_id: FlowId) {
        debug!(
            flow = %self.definition.id(),
            child = %child_flow_id,
            state = %self.state,
            "Sub-flow started"
        );
        self.events.push(LifecycleEvent::SubflowStarted {
            flow_instance_id: self.id.clone(),
            child_flow_id,
            state: self.state.clone(),
            timestamp: Utc::now(),
        });
    }

    /// Unique id of this instance
    pub fn id(&self) -> &FlowInstanceId {
        &self.id
    }

    /// Definition being run
    pub fn definition(&self) -> &Arc<FlowDefinition<C>> {
        &self.definition
    }

    /// Current state name
    pub fn state(&self) -> &StateId {
        &self.state
    }

    /// Shared handle on the current context
    pub fn context(&self) -> Arc<C> {
        Arc::clone(&self.context)
    }

    /// The view the current context names
    pub fn current_view(&self) -> Option<&C::View> {
        self.context.current_view()
    }

    /// Whether the current state accepts no events
    pub fn is_terminal(&self) -> bool {
        self.definition
            .state(self.state.as_str())
            .map_or(true, |node| node.is_terminal())
    }

    /// The nested flow running while this instance sits in an invoking state
    pub fn subflow(&self) -> Option<&dyn NestedFlow> {
        self.subflow.as_deref()
    }

    /// Nesting depth, zero for a top-level flow
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// When the instance was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Drain the lifecycle journal
    pub fn take_events(&mut self) -> Vec<LifecycleEvent> {
        std::mem::take(&mut self.events)
    }
}

impl<C: FlowContext> NestedFlow for FlowInstance<C> {
    fn flow_id(&self) -> &FlowId {
        self.definition.id()
    }

    fn instance_id(&self) -> &FlowInstanceId {
        &self.id
    }

    fn current_state(&self) -> &StateId {
        &self.state
    }

    fn is_terminal(&self) -> bool {
        FlowInstance::is_terminal(self)
    }

    fn depth(&self) -> usize {
        self.depth
    }

    fn deliver(&mut self, event: FlowEvent) -> Result<Delivery, FlowError> {
        FlowInstance::deliver(self, event)
    }

    fn active_subflow(&self) -> Option<&dyn NestedFlow> {
        self.subflow()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<C: FlowContext> fmt::Debug for FlowInstance<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowInstance")
            .field("id", &self.id)
            .field("flow_id", self.definition.id())
            .field("state", &self.state)
            .field("context", &self.context)
            .field("subflow", &self.subflow)
            .field("depth", &self.depth)
            .finish()
    }
}
