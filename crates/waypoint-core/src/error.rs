use crate::domain::validation::ValidationIssue;
use std::fmt;
use thiserror::Error;

/// Core error type for the Waypoint flow engine
///
/// Unmatched events are deliberately absent: an event no rule accepts is
/// bubbled to the host, not reported as a failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// The flow graph failed its load-time validation pass
    #[error("Invalid flow definition '{flow}': {}", IssueList(.issues))]
    InvalidDefinition {
        /// Flow whose definition was rejected
        flow: String,
        /// Every problem found, in discovery order
        issues: Vec<ValidationIssue>,
    },

    /// A state name that is not part of the flow definition
    #[error("Unknown state '{state}' in flow '{flow}'")]
    UnknownState {
        /// Flow being addressed
        flow: String,
        /// The missing state
        state: String,
    },

    /// A reducer returned an error; the instance kept its previous state and context
    #[error("Reducer failed in flow '{flow}' at state '{state}' for event '{event}': {message}")]
    Reducer {
        /// Flow whose rule failed
        flow: String,
        /// State the instance stayed in
        state: String,
        /// Event that was being applied
        event: String,
        /// Underlying failure
        message: String,
    },

    /// The context does not name a view the renderer can show
    #[error("No view can be resolved for flow '{flow}' in state '{state}': {reason}")]
    UnresolvedView {
        /// Flow being rendered
        flow: String,
        /// Current state of that flow
        state: String,
        /// Why resolution failed
        reason: String,
    },

    /// An event payload did not have the shape its reducer expects
    #[error("Payload error: {0}")]
    Payload(String),

    /// Sub-flows nested deeper than the engine allows
    #[error("Sub-flow '{flow}' exceeds the maximum nesting depth of {limit}")]
    SubflowDepthExceeded {
        /// Flow that would have been spawned
        flow: String,
        /// Configured limit
        limit: usize,
    },

    /// A nested flow was accessed with the wrong context type
    #[error("Sub-flow '{flow}' is not a flow over context type {expected}")]
    SubflowTypeMismatch {
        /// Nested flow id
        flow: String,
        /// Type name the caller asked for
        expected: &'static str,
    },

    /// The renderer has no way to show nested flows
    #[error("Renderer cannot display sub-flow '{0}'")]
    SubflowUnsupported(String),

    /// A single pump processed more events than configured
    #[error("Event limit of {limit} exceeded while pumping flow '{flow}'")]
    EventLimitExceeded {
        /// Flow being pumped
        flow: String,
        /// Configured limit
        limit: usize,
    },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

struct IssueList<'a>(&'a [ValidationIssue]);

impl fmt::Display for IssueList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} issue(s)", self.0.len())?;
        for (i, issue) in self.0.iter().enumerate() {
            write!(f, "\n  {}. {}", i + 1, issue)?;
        }
        Ok(())
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        FlowError::Payload(err.to_string())
    }
}

impl From<String> for FlowError {
    fn from(err: String) -> Self {
        FlowError::Other(err)
    }
}

impl From<&str> for FlowError {
    fn from(err: &str) -> Self {
        FlowError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::validation::{codes, Severity};

    #[test]
    fn test_error_display() {
        let errors = vec![
            (
                FlowError::UnknownState {
                    flow: "payroll".to_string(),
                    state: "nowhere".to_string(),
                },
                "Unknown state 'nowhere' in flow 'payroll'",
            ),
            (
                FlowError::Payload("missing field `id`".to_string()),
                "Payload error: missing field `id`",
            ),
            (
                FlowError::SubflowDepthExceeded {
                    flow: "loop".to_string(),
                    limit: 16,
                },
                "Sub-flow 'loop' exceeds the maximum nesting depth of 16",
            ),
            (FlowError::Other("other_err".to_string()), "other_err"),
        ];

        for (error, expected_msg) in errors {
            assert_eq!(error.to_string(), expected_msg);
        }
    }

    #[test]
    fn test_invalid_definition_lists_every_issue() {
        let error = FlowError::InvalidDefinition {
            flow: "broken".to_string(),
            issues: vec![
                ValidationIssue {
                    code: codes::UNKNOWN_TARGET_STATE,
                    severity: Severity::Error,
                    message: "rule 0 of 'a' targets 'x'".to_string(),
                    state: Some("a".to_string()),
                },
                ValidationIssue {
                    code: codes::UNREACHABLE_STATE,
                    severity: Severity::Warning,
                    message: "'b' is never entered".to_string(),
                    state: Some("b".to_string()),
                },
            ],
        };

        let text = error.to_string();
        assert!(text.starts_with("Invalid flow definition 'broken': 2 issue(s)"));
        assert!(text.contains("1. ERR_FLOW_UNKNOWN_TARGET_STATE"));
        assert!(text.contains("2. WARN_FLOW_UNREACHABLE_STATE"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: FlowError = json_error.into();

        match error {
            FlowError::Payload(msg) => assert!(msg.contains("expected value")),
            _ => panic!("Expected Payload variant"),
        }
    }

    #[test]
    fn test_from_str_and_string() {
        assert_eq!(FlowError::from("boom"), FlowError::Other("boom".to_string()));
        assert_eq!(
            FlowError::from("boom".to_string()),
            FlowError::Other("boom".to_string())
        );
    }
}
