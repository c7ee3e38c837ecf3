use crate::application::subflow::SubflowSpec;
use crate::domain::context::FlowContext;
use crate::domain::flow_instance::StateId;
use crate::{FlowError, FlowEvent};
use std::fmt;
use std::sync::Arc;

/// Predicate deciding whether a rule may fire
pub type Guard<C> = Arc<dyn Fn(&C, &FlowEvent) -> bool + Send + Sync>;

/// Pure function computing the next context from the current one and the event
pub type Reducer<C> = Arc<dyn Fn(&C, &FlowEvent) -> Result<C, FlowError> + Send + Sync>;

/// Event name, optional guard, target state and reducer
///
/// Rules only ever see `(&context, &event)`. They have no handle on the
/// instance, so a reducer cannot dispatch; a follow-up event has to be
/// raised by the next render instead.
pub struct TransitionRule<C> {
    event: String,
    guard: Option<Guard<C>>,
    target: StateId,
    reducer: Option<Reducer<C>>,
    label: Option<&'static str>,
}

impl<C: FlowContext> TransitionRule<C> {
    /// A rule reacting to `event` by moving to `target`
    pub fn on(event: impl Into<String>, target: impl Into<StateId>) -> Self {
        Self {
            event: event.into(),
            guard: None,
            target: target.into(),
            reducer: None,
            label: None,
        }
    }

    /// Only fire when `guard` holds
    pub fn when<G>(mut self, guard: G) -> Self
    where
        G: Fn(&C, &FlowEvent) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Compute the next context, possibly failing (e.g. on a malformed payload)
    pub fn reduce<R>(mut self, reducer: R) -> Self
    where
        R: Fn(&C, &FlowEvent) -> Result<C, FlowError> + Send + Sync + 'static,
    {
        self.reducer = Some(Arc::new(reducer));
        self
    }

    /// Compute the next context with an infallible reducer
    pub fn update<F>(self, update: F) -> Self
    where
        F: Fn(&C, &FlowEvent) -> C + Send + Sync + 'static,
    {
        self.reduce(move |ctx, event| Ok(update(ctx, event)))
    }

    /// Name shown in logs and validation messages
    pub fn labelled(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    /// Event name this rule reacts to
    pub fn event(&self) -> &str {
        &self.event
    }

    /// State entered when the rule fires
    pub fn target(&self) -> &StateId {
        &self.target
    }

    /// Whether a guard restricts this rule
    pub fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }

    /// Optional label
    pub fn label(&self) -> Option<&'static str> {
        self.label
    }

    /// Event name matches and the guard, if any, passes
    pub fn matches(&self, context: &C, event: &FlowEvent) -> bool {
        self.event == event.name
            && self
                .guard
                .as_ref()
                .map_or(true, |guard| guard(context, event))
    }

    /// Run the reducer, or copy the context when the rule has none
    pub fn apply(&self, context: &C, event: &FlowEvent) -> Result<C, FlowError> {
        match &self.reducer {
            Some(reducer) => reducer(context, event),
            None => Ok(context.clone()),
        }
    }
}

impl<C> fmt::Debug for TransitionRule<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionRule")
            .field("event", &self.event)
            .field("guarded", &self.guard.is_some())
            .field("target", &self.target)
            .field("label", &self.label)
            .finish()
    }
}

/// A named node of the flow graph
///
/// Rules are kept in declaration order, which is the only tie-break: the
/// first rule whose event matches and whose guard passes wins. A node with
/// no rules is terminal.
pub struct StateNode<C> {
    rules: Vec<TransitionRule<C>>,
    subflow: Option<SubflowSpec<C>>,
}

impl<C: FlowContext> StateNode<C> {
    /// A state with no rules yet
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            subflow: None,
        }
    }

    /// A terminal state
    pub fn terminal() -> Self {
        Self::new()
    }

    /// A state that runs a nested flow while the parent sits in it
    pub fn invoking(subflow: SubflowSpec<C>) -> Self {
        Self {
            rules: Vec::new(),
            subflow: Some(subflow),
        }
    }

    /// Append a rule; later rules lose ties to earlier ones
    pub fn rule(mut self, rule: TransitionRule<C>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Rules in declaration order
    pub fn rules(&self) -> &[TransitionRule<C>] {
        &self.rules
    }

    /// The nested flow started on entry, if any
    pub fn subflow(&self) -> Option<&SubflowSpec<C>> {
        self.subflow.as_ref()
    }

    /// Accepts no events at all
    pub fn is_terminal(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule that accepts `event` in `context`, with its index
    pub fn matching_rule(
        &self,
        context: &C,
        event: &FlowEvent,
    ) -> Option<(usize, &TransitionRule<C>)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches(context, event))
    }
}

impl<C: FlowContext> Default for StateNode<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for StateNode<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateNode")
            .field("rules", &self.rules)
            .field("subflow", &self.subflow)
            .finish()
    }
}
