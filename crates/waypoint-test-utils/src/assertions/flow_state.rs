//! Assertion utilities for validating flow instance states.

use thiserror::Error;
use waypoint_core::{Delivery, FlowContext, FlowInstance, LifecycleEvent};

/// Error type for flow state validation failures
#[derive(Debug, Error)]
pub enum FlowStateValidationError {
    #[error("Invalid flow state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("Invalid view: expected {expected}, got {actual}")]
    InvalidView { expected: String, actual: String },

    #[error("Flow ID mismatch: expected {expected}, got {actual}")]
    FlowIdMismatch { expected: String, actual: String },

    #[error("Unexpected delivery: expected {expected}, got {actual:?}")]
    UnexpectedDelivery { expected: String, actual: Delivery },

    #[error("Sub-flow mismatch: expected {expected}, got {actual}")]
    SubflowMismatch { expected: String, actual: String },

    #[error("Journal mismatch: expected {expected:?}, got {actual:?}")]
    JournalMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Flow validation error: {0}")]
    Other(String),
}

/// Asserts that a flow instance is in the expected state.
pub fn assert_flow_state<C: FlowContext>(
    instance: &FlowInstance<C>,
    expected_state: &str,
) -> Result<(), FlowStateValidationError> {
    if instance.state().as_str() != expected_state {
        return Err(FlowStateValidationError::InvalidState {
            expected: expected_state.to_string(),
            actual: instance.state().to_string(),
        });
    }

    Ok(())
}

/// Asserts that the current context names the expected view.
pub fn assert_view<C: FlowContext>(
    instance: &FlowInstance<C>,
    expected_view: &C::View,
) -> Result<(), FlowStateValidationError> {
    match instance.current_view() {
        Some(view) if view == expected_view => Ok(()),
        actual => Err(FlowStateValidationError::InvalidView {
            expected: format!("{:?}", expected_view),
            actual: format!("{:?}", actual),
        }),
    }
}

/// Asserts that a flow instance runs the expected flow definition.
pub fn assert_flow_id<C: FlowContext>(
    instance: &FlowInstance<C>,
    expected_flow_id: &str,
) -> Result<(), FlowStateValidationError> {
    let actual = instance.definition().id();
    if actual.as_str() != expected_flow_id {
        return Err(FlowStateValidationError::FlowIdMismatch {
            expected: expected_flow_id.to_string(),
            actual: actual.to_string(),
        });
    }

    Ok(())
}

/// Asserts that an event escaped the flow unhandled under the expected name.
pub fn assert_bubbled(
    delivery: &Delivery,
    expected_event: &str,
) -> Result<(), FlowStateValidationError> {
    match delivery {
        Delivery::Bubbled(event) if event.is(expected_event) => Ok(()),
        other => Err(unexpected(format!("bubbled '{}'", expected_event), other)),
    }
}

/// Asserts that `flow` moved into `expected_state` without finishing.
pub fn assert_transitioned(
    delivery: &Delivery,
    flow: &str,
    expected_state: &str,
) -> Result<(), FlowStateValidationError> {
    match delivery {
        Delivery::Transitioned { flow: f, to, .. }
            if f.as_str() == flow && to.as_str() == expected_state =>
        {
            Ok(())
        }
        other => Err(unexpected(
            format!("'{}' transitioned to '{}'", flow, expected_state),
            other,
        )),
    }
}

/// Asserts that `flow` finished in `expected_state`.
pub fn assert_completed(
    delivery: &Delivery,
    flow: &str,
    expected_state: &str,
) -> Result<(), FlowStateValidationError> {
    match delivery {
        Delivery::Completed { flow: f, state, .. }
            if f.as_str() == flow && state.as_str() == expected_state =>
        {
            Ok(())
        }
        other => Err(unexpected(
            format!("'{}' completed in '{}'", flow, expected_state),
            other,
        )),
    }
}

fn unexpected(expected: String, actual: &Delivery) -> FlowStateValidationError {
    FlowStateValidationError::UnexpectedDelivery {
        expected,
        actual: actual.clone(),
    }
}

/// Asserts which nested flow, if any, the instance is running.
pub fn assert_subflow<C: FlowContext>(
    instance: &FlowInstance<C>,
    expected: Option<(&str, &str)>,
) -> Result<(), FlowStateValidationError> {
    let actual = instance
        .subflow()
        .map(|child| (child.flow_id().to_string(), child.current_state().to_string()));
    let matches = match (&actual, expected) {
        (None, None) => true,
        (Some((flow, state)), Some((expected_flow, expected_state))) => {
            flow == expected_flow && state == expected_state
        }
        _ => false,
    };

    if !matches {
        return Err(FlowStateValidationError::SubflowMismatch {
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        });
    }

    Ok(())
}

/// Asserts the event types recorded in a drained lifecycle journal.
pub fn assert_journal(
    events: &[LifecycleEvent],
    expected_types: &[&str],
) -> Result<(), FlowStateValidationError> {
    let actual: Vec<String> = events.iter().map(|e| e.event_type().to_string()).collect();
    if actual != expected_types {
        return Err(FlowStateValidationError::JournalMismatch {
            expected: expected_types.iter().map(|s| s.to_string()).collect(),
            actual,
        });
    }

    Ok(())
}
