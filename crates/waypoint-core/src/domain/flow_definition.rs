use crate::config::RuntimeConfig;
use crate::domain::context::FlowContext;
use crate::domain::flow_instance::{FlowId, StateId};
use crate::domain::transition::StateNode;
use crate::domain::validation::{validate_graph, ValidationMode, ValidationReport};
use crate::FlowError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds the initial context of a flow from caller-supplied parameters
pub type ContextFactory<C> = Arc<dyn Fn(<C as FlowContext>::Seed) -> C + Send + Sync>;

/// A validated, immutable flow graph
///
/// Definitions are built once and shared behind an `Arc` by every instance
/// that runs them. Nothing on a definition changes after [`FlowDefinitionBuilder::build`].
pub struct FlowDefinition<C: FlowContext> {
    id: FlowId,
    name: String,
    description: Option<String>,
    initial_state: StateId,
    states: Vec<(StateId, StateNode<C>)>,
    index: HashMap<StateId, usize>,
    context_factory: ContextFactory<C>,
}

impl<C: FlowContext> FlowDefinition<C> {
    /// Start describing a flow
    pub fn builder(id: impl Into<String>) -> FlowDefinitionBuilder<C> {
        FlowDefinitionBuilder::new(id)
    }

    /// ID of the flow
    pub fn id(&self) -> &FlowId {
        &self.id
    }

    /// Human-readable name of the flow
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description of the flow
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// State a flow starts in unless the caller picks another
    pub fn initial_state(&self) -> &StateId {
        &self.initial_state
    }

    /// Look up a state node
    pub fn state(&self, name: &str) -> Option<&StateNode<C>> {
        self.index.get(name).map(|&i| &self.states[i].1)
    }

    /// Resolve a state name to the id stored in the definition
    pub fn state_id(&self, name: &str) -> Option<&StateId> {
        self.index.get(name).map(|&i| &self.states[i].0)
    }

    /// Whether `name` is a declared state
    pub fn contains_state(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// States in declaration order
    pub fn states(&self) -> impl Iterator<Item = (&StateId, &StateNode<C>)> {
        self.states.iter().map(|(id, node)| (id, node))
    }

    /// Names of the states with no rules
    pub fn terminal_states(&self) -> Vec<&StateId> {
        self.states
            .iter()
            .filter(|(_, node)| node.is_terminal())
            .map(|(id, _)| id)
            .collect()
    }

    /// Run the initial-context factory
    pub fn initial_context(&self, seed: C::Seed) -> C {
        (self.context_factory)(seed)
    }
}

impl<C: FlowContext> fmt::Debug for FlowDefinition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("initial_state", &self.initial_state)
            .field("states", &self.states)
            .finish()
    }
}

/// Collects states for a [`FlowDefinition`] and validates them on `build`
pub struct FlowDefinitionBuilder<C: FlowContext> {
    id: FlowId,
    name: Option<String>,
    description: Option<String>,
    initial_state: Option<StateId>,
    states: Vec<(StateId, StateNode<C>)>,
    context_factory: Option<ContextFactory<C>>,
    mode: ValidationMode,
}

impl<C: FlowContext> FlowDefinitionBuilder<C> {
    /// A builder for the flow `id`
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: FlowId(id.into()),
            name: None,
            description: None,
            initial_state: None,
            states: Vec::new(),
            context_factory: None,
            mode: ValidationMode::default(),
        }
    }

    /// Human-readable name, defaults to the id
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Description of the flow
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Default initial state, defaults to the first declared state
    pub fn initial_state(mut self, state: impl Into<StateId>) -> Self {
        self.initial_state = Some(state.into());
        self
    }

    /// Factory producing the initial context from the caller's seed
    pub fn context_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(C::Seed) -> C + Send + Sync + 'static,
    {
        self.context_factory = Some(Arc::new(factory));
        self
    }

    /// Declare a state
    pub fn state(mut self, name: impl Into<StateId>, node: StateNode<C>) -> Self {
        self.states.push((name.into(), node));
        self
    }

    /// Reject definitions that only have warnings as well
    pub fn strict(self) -> Self {
        self.validation_mode(ValidationMode::Strict)
    }

    /// Choose how warnings are handled
    pub fn validation_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Take the validation mode from the runtime configuration
    pub fn configured(self, config: &RuntimeConfig) -> Self {
        self.validation_mode(config.validation_mode)
    }

    /// Run the validation pass without building
    pub fn validate(&self) -> ValidationReport {
        validate_graph(
            &self.id,
            self.initial_state.as_ref(),
            &self.states,
            self.context_factory.is_some(),
        )
    }

    /// Validate the graph and freeze it
    pub fn build(self) -> Result<Arc<FlowDefinition<C>>, FlowError> {
        let report = self.validate();

        for issue in report.warnings() {
            warn!(flow = %self.id, code = issue.code, "{}", issue);
        }

        if !report.accepts(self.mode) {
            return Err(FlowError::InvalidDefinition {
                flow: self.id.0,
                issues: report.issues,
            });
        }

        let (Some(context_factory), Some(first)) = (self.context_factory, self.states.first())
        else {
            return Err(FlowError::Other(format!(
                "flow '{}' passed validation without states or context factory",
                self.id
            )));
        };

        let initial_state = self.initial_state.unwrap_or_else(|| first.0.clone());
        let index = self
            .states
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), i))
            .collect();

        debug!(
            flow = %self.id,
            states = self.states.len(),
            initial = %initial_state,
            "Flow definition built"
        );

        Ok(Arc::new(FlowDefinition {
            name: self.name.unwrap_or_else(|| self.id.0.clone()),
            id: self.id,
            description: self.description,
            initial_state,
            states: self.states,
            index,
            context_factory,
        }))
    }
}
