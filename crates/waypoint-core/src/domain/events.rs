use crate::domain::flow_instance::{FlowId, FlowInstanceId, StateId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Something that happened to a flow instance
///
/// Instances append these to an in-memory journal which hosts drain with
/// [`FlowInstance::take_events`](crate::FlowInstance::take_events). The
/// journal is write-only from the engine's side; nothing reads it back
/// to decide a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The instance was created and entered its initial state
    FlowStarted {
        /// Instance the event belongs to
        flow_instance_id: FlowInstanceId,
        /// Definition being run
        flow_id: FlowId,
        /// Initial state
        state: StateId,
        /// When it happened
        timestamp: DateTime<Utc>,
    },

    /// A rule fired and the instance moved
    TransitionApplied {
        /// Instance the event belongs to
        flow_instance_id: FlowInstanceId,
        /// Event that triggered the rule
        event: String,
        /// State before the transition
        from: StateId,
        /// State after the transition
        to: StateId,
        /// When it happened
        timestamp: DateTime<Utc>,
    },

    /// No rule accepted the event and it was handed outwards
    EventBubbled {
        /// Instance the event belongs to
        flow_instance_id: FlowInstanceId,
        /// Event name
        event: String,
        /// State the instance stayed in
        state: StateId,
        /// When it happened
        timestamp: DateTime<Utc>,
    },

    /// Entering an invoking state started a nested flow
    SubflowStarted {
        /// Parent instance
        flow_instance_id: FlowInstanceId,
        /// Child flow definition
        child_flow_id: FlowId,
        /// Invoking state of the parent
        state: StateId,
        /// When it happened
        timestamp: DateTime<Utc>,
    },

    /// The nested flow reached a terminal state and handed its final event back
    SubflowCompleted {
        /// Parent instance
        flow_instance_id: FlowInstanceId,
        /// Child flow definition
        child_flow_id: FlowId,
        /// Final event of the child
        event: String,
        /// When it happened
        timestamp: DateTime<Utc>,
    },

    /// The parent left the invoking state before the child finished
    SubflowDiscarded {
        /// Parent instance
        flow_instance_id: FlowInstanceId,
        /// Child flow definition
        child_flow_id: FlowId,
        /// State the child was in
        child_state: StateId,
        /// When it happened
        timestamp: DateTime<Utc>,
    },
}

impl LifecycleEvent {
    /// Dotted event type, e.g. `flow.transition_applied`
    pub fn event_type(&self) -> &'static str {
        match self {
            LifecycleEvent::FlowStarted { .. } => "flow.started",
            LifecycleEvent::TransitionApplied { .. } => "flow.transition_applied",
            LifecycleEvent::EventBubbled { .. } => "flow.event_bubbled",
            LifecycleEvent::SubflowStarted { .. } => "flow.subflow_started",
            LifecycleEvent::SubflowCompleted { .. } => "flow.subflow_completed",
            LifecycleEvent::SubflowDiscarded { .. } => "flow.subflow_discarded",
        }
    }

    /// Instance the event belongs to
    pub fn flow_instance_id(&self) -> &FlowInstanceId {
        match self {
            LifecycleEvent::FlowStarted {
                flow_instance_id, ..
            }
            | LifecycleEvent::TransitionApplied {
                flow_instance_id, ..
            }
            | LifecycleEvent::EventBubbled {
                flow_instance_id, ..
            }
            | LifecycleEvent::SubflowStarted {
                flow_instance_id, ..
            }
            | LifecycleEvent::SubflowCompleted {
                flow_instance_id, ..
            }
            | LifecycleEvent::SubflowDiscarded {
                flow_instance_id, ..
            } => flow_instance_id,
        }
    }

    /// When the event occurred
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LifecycleEvent::FlowStarted { timestamp, .. }
            | LifecycleEvent::TransitionApplied { timestamp, .. }
            | LifecycleEvent::EventBubbled { timestamp, .. }
            | LifecycleEvent::SubflowStarted { timestamp, .. }
            | LifecycleEvent::SubflowCompleted { timestamp, .. }
            | LifecycleEvent::SubflowDiscarded { timestamp, .. } => *timestamp,
        }
    }
}
