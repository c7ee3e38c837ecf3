//! Load-time validation of flow graphs.
//!
//! Every definition goes through [`validate_graph`] when it is built, so a
//! rule naming a missing state is reported before any instance of the flow
//! can run.

use crate::domain::context::FlowContext;
use crate::domain::flow_instance::{FlowId, StateId};
use crate::domain::transition::StateNode;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// Validation issue codes
pub mod codes {
    /// The definition declares no states
    pub const EMPTY_FLOW: &str = "ERR_FLOW_EMPTY";

    /// Two states share a name
    pub const DUPLICATE_STATE: &str = "ERR_FLOW_DUPLICATE_STATE";

    /// The initial state is not declared
    pub const UNKNOWN_INITIAL_STATE: &str = "ERR_FLOW_UNKNOWN_INITIAL_STATE";

    /// A rule targets a state that is not declared
    pub const UNKNOWN_TARGET_STATE: &str = "ERR_FLOW_UNKNOWN_TARGET_STATE";

    /// A rule reacts to the empty event name
    pub const EMPTY_EVENT_NAME: &str = "ERR_FLOW_EMPTY_EVENT_NAME";

    /// No initial-context factory was supplied
    pub const MISSING_CONTEXT_FACTORY: &str = "ERR_FLOW_MISSING_CONTEXT_FACTORY";

    /// An invoking state has no rule to consume the child's final event
    pub const INVOKE_WITHOUT_EXIT: &str = "ERR_FLOW_INVOKE_WITHOUT_EXIT";

    /// A state cannot be reached from the initial state
    pub const UNREACHABLE_STATE: &str = "WARN_FLOW_UNREACHABLE_STATE";

    /// A rule sits behind an unguarded rule for the same event and never fires
    pub const SHADOWED_RULE: &str = "WARN_FLOW_SHADOWED_RULE";
}

/// How serious an issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// The definition cannot be used
    Error,
    /// Suspicious but runnable; rejected only in strict mode
    Warning,
}

/// Whether warnings reject a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Warnings are logged
    #[default]
    Lenient,
    /// Warnings are treated as errors
    Strict,
}

/// A single problem found in a flow graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Issue code (one of [`codes`])
    pub code: &'static str,

    /// Error or warning
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// The state the issue was found in, when there is one
    pub state: Option<String>,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            Some(state) => write!(f, "{}: {} (at state '{}')", self.code, self.message, state),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

/// Everything the validation pass found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Issues in discovery order
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn error(&mut self, code: &'static str, state: Option<&StateId>, message: String) {
        self.push(code, Severity::Error, state, message);
    }

    fn warning(&mut self, code: &'static str, state: Option<&StateId>, message: String) {
        self.push(code, Severity::Warning, state, message);
    }

    fn push(
        &mut self,
        code: &'static str,
        severity: Severity,
        state: Option<&StateId>,
        message: String,
    ) {
        self.issues.push(ValidationIssue {
            code,
            severity,
            message,
            state: state.map(|s| s.0.clone()),
        });
    }

    /// Issues with [`Severity::Error`]
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    /// Issues with [`Severity::Warning`]
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// Whether the definition may be used under `mode`
    pub fn accepts(&self, mode: ValidationMode) -> bool {
        match mode {
            ValidationMode::Lenient => self.errors().next().is_none(),
            ValidationMode::Strict => self.issues.is_empty(),
        }
    }

    /// Whether any issue carries `code`
    pub fn has(&self, code: &str) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }
}

/// Run every check over a graph under construction
pub fn validate_graph<C: FlowContext>(
    flow: &FlowId,
    initial_state: Option<&StateId>,
    states: &[(StateId, StateNode<C>)],
    has_context_factory: bool,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    if states.is_empty() {
        report.error(
            codes::EMPTY_FLOW,
            None,
            format!("flow '{}' must declare at least one state", flow),
        );
        return report;
    }

    let mut index: HashMap<&StateId, &StateNode<C>> = HashMap::with_capacity(states.len());
    for (name, node) in states {
        if index.insert(name, node).is_some() {
            report.error(
                codes::DUPLICATE_STATE,
                Some(name),
                format!("state '{}' is declared more than once", name),
            );
        }
    }

    if !has_context_factory {
        report.error(
            codes::MISSING_CONTEXT_FACTORY,
            None,
            "no initial-context factory was supplied".to_string(),
        );
    }

    let initial = initial_state.unwrap_or(&states[0].0);
    if !index.contains_key(initial) {
        report.error(
            codes::UNKNOWN_INITIAL_STATE,
            None,
            format!("initial state '{}' is not declared", initial),
        );
    }

    for (name, node) in states {
        check_rules(&mut report, name, node, &index);
    }

    if index.contains_key(initial) {
        for unreachable in unreachable_states(initial, states, &index) {
            report.warning(
                codes::UNREACHABLE_STATE,
                Some(unreachable),
                format!("state is never entered from initial state '{}'", initial),
            );
        }
    }

    report
}

fn check_rules<C: FlowContext>(
    report: &mut ValidationReport,
    name: &StateId,
    node: &StateNode<C>,
    index: &HashMap<&StateId, &StateNode<C>>,
) {
    if node.subflow().is_some() && node.is_terminal() {
        report.error(
            codes::INVOKE_WITHOUT_EXIT,
            Some(name),
            "invoking state has no rule for the sub-flow's final event".to_string(),
        );
    }

    let mut unguarded: HashSet<&str> = HashSet::new();
    for (position, rule) in node.rules().iter().enumerate() {
        if rule.event().is_empty() {
            report.error(
                codes::EMPTY_EVENT_NAME,
                Some(name),
                format!("rule {} reacts to an empty event name", position),
            );
        }

        if !index.contains_key(rule.target()) {
            report.error(
                codes::UNKNOWN_TARGET_STATE,
                Some(name),
                format!(
                    "rule {} on '{}' targets undeclared state '{}'",
                    position,
                    rule.event(),
                    rule.target()
                ),
            );
        }

        if unguarded.contains(rule.event()) {
            report.warning(
                codes::SHADOWED_RULE,
                Some(name),
                format!(
                    "rule {} on '{}' follows an unguarded rule for the same event and never fires",
                    position,
                    rule.event()
                ),
            );
        } else if !rule.is_guarded() {
            unguarded.insert(rule.event());
        }
    }
}

fn unreachable_states<'a, C: FlowContext>(
    initial: &'a StateId,
    states: &'a [(StateId, StateNode<C>)],
    index: &HashMap<&'a StateId, &'a StateNode<C>>,
) -> Vec<&'a StateId> {
    let mut visited: HashSet<&StateId> = HashSet::with_capacity(states.len());
    let mut queue = VecDeque::from([initial]);
    visited.insert(initial);

    while let Some(current) = queue.pop_front() {
        let Some(node) = index.get(current) else {
            continue;
        };
        for rule in node.rules() {
            if let Some((target, _)) = index.get_key_value(rule.target()) {
                if visited.insert(*target) {
                    queue.push_back(*target);
                }
            }
        }
    }

    let mut seen = HashSet::new();
    states
        .iter()
        .map(|(name, _)| name)
        .filter(|name| !visited.contains(name) && seen.insert(*name))
        .collect()
}
