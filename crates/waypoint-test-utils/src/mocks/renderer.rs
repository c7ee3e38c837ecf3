use std::collections::VecDeque;
use std::sync::Arc;
use waypoint_core::{
    Emitter, FlowContext, FlowError, FlowEvent, FlowId, NestedFlow, Renderer, StateId,
};

/// What a [`ScriptedRenderer`] produced for one render call
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered<V> {
    /// The context named this view
    View(V),
    /// A nested flow had the screen
    Subflow {
        /// Child flow definition
        flow: FlowId,
        /// State the child was in
        state: StateId,
    },
    /// The error screen
    Error(FlowError),
}

impl<V> Rendered<V> {
    /// Whether this is the error screen
    pub fn is_error(&self) -> bool {
        matches!(self, Rendered::Error(_))
    }
}

/// Renderer that plays back a script of view emissions
///
/// Each scripted step pairs a view with the event it emits. When the
/// renderer is asked for the view at the head of the script, it pushes that
/// event into the emitter and advances. Every output is also kept in a
/// history for later assertions.
#[derive(Debug, Clone)]
pub struct ScriptedRenderer<V> {
    script: VecDeque<(V, FlowEvent)>,
    rejected: Vec<V>,
    history: Vec<Rendered<V>>,
    render_subflows: bool,
}

impl<V: Clone + PartialEq> Default for ScriptedRenderer<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + PartialEq> ScriptedRenderer<V> {
    /// A renderer with an empty script
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            rejected: Vec::new(),
            history: Vec::new(),
            render_subflows: true,
        }
    }

    /// When `view` is rendered next, emit `event`
    pub fn then(mut self, view: V, event: FlowEvent) -> Self {
        self.script.push_back((view, event));
        self
    }

    /// Fail to render `view`, as a host with no component for it would
    pub fn rejecting(mut self, view: V) -> Self {
        self.rejected.push(view);
        self
    }

    /// Report sub-flows as unsupported instead of recording them
    pub fn without_subflows(mut self) -> Self {
        self.render_subflows = false;
        self
    }

    /// Every output so far, oldest first
    pub fn history(&self) -> &[Rendered<V>] {
        &self.history
    }

    /// Scripted steps not yet played
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl<C: FlowContext> Renderer<C> for ScriptedRenderer<C::View> {
    type Output = Rendered<C::View>;

    fn render_view(
        &mut self,
        view: &C::View,
        _context: &Arc<C>,
        emitter: &Emitter,
    ) -> Result<Self::Output, FlowError> {
        if self.rejected.contains(view) {
            return Err(FlowError::Other(format!("no component for {:?}", view)));
        }

        if matches!(self.script.front(), Some((next, _)) if next == view) {
            if let Some((_, event)) = self.script.pop_front() {
                emitter.emit(event);
            }
        }

        let output = Rendered::View(view.clone());
        self.history.push(output.clone());
        Ok(output)
    }

    fn render_subflow(
        &mut self,
        nested: &dyn NestedFlow,
        _emitter: &Emitter,
    ) -> Result<Self::Output, FlowError> {
        if !self.render_subflows {
            return Err(FlowError::SubflowUnsupported(nested.flow_id().0.clone()));
        }

        let output = Rendered::Subflow {
            flow: nested.flow_id().clone(),
            state: nested.current_state().clone(),
        };
        self.history.push(output.clone());
        Ok(output)
    }

    fn render_error(&mut self, error: &FlowError) -> Self::Output {
        let output = Rendered::Error(error.clone());
        self.history.push(output.clone());
        output
    }
}
