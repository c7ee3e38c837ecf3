use serde_json::{Map, Value};
use std::sync::Arc;
use waypoint_core::{
    FlowContext, FlowDefinition, FlowError, FlowEvent, Progress, StateNode, SubflowSpec,
    TransitionRule,
};

/// Event moving a fixture flow to its next step
pub const NEXT: &str = "NEXT";

/// Context of fixture flows
///
/// The view is the name of the step being shown. Object payloads of every
/// accepted event are merged into `values`, so tests can check what a
/// parent saw from a child's final event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FixtureContext {
    /// Seed the flow was started with
    pub owner: String,
    /// Name of the step to render
    pub screen: Option<String>,
    /// Position along the declared steps
    pub progress: Progress,
    /// Merged event payloads
    pub values: Map<String, Value>,
}

impl FlowContext for FixtureContext {
    type View = String;
    type Seed = String;

    fn current_view(&self) -> Option<&String> {
        self.screen.as_ref()
    }
}

fn enter(target: String) -> impl Fn(&FixtureContext, &FlowEvent) -> FixtureContext {
    move |ctx, event| {
        let mut values = ctx.values.clone();
        if let Value::Object(payload) = event.payload.as_value() {
            values.extend(payload.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        FixtureContext {
            screen: Some(target.clone()),
            progress: ctx.progress.advance(),
            values,
            ..ctx.clone()
        }
    }
}

/// Builds linear test flows with optional branches and sub-flows
///
/// Steps are chained with [`NEXT`]; the last step is terminal unless extra
/// rules are attached to it.
pub struct FixtureFlowBuilder {
    id: String,
    steps: Vec<String>,
    rules: Vec<(String, TransitionRule<FixtureContext>)>,
    subflows: Vec<(String, SubflowSpec<FixtureContext>)>,
}

impl FixtureFlowBuilder {
    /// A fixture flow named `id`
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            steps: Vec::new(),
            rules: Vec::new(),
            subflows: Vec::new(),
        }
    }

    /// Append a step
    pub fn step(mut self, name: impl Into<String>) -> Self {
        self.steps.push(name.into());
        self
    }

    /// Append several steps
    pub fn steps<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps.extend(names.into_iter().map(Into::into));
        self
    }

    /// Move from `from` to `to` on `event`
    pub fn on(mut self, from: &str, event: &str, to: &str) -> Self {
        let rule = TransitionRule::on(event, to).update(enter(to.to_string()));
        self.rules.push((from.to_string(), rule));
        self
    }

    /// Move from `from` to `to` on `event` when the payload's `flag` equals `value`
    pub fn on_flag(
        mut self,
        from: &str,
        event: &str,
        flag: &'static str,
        value: bool,
        to: &str,
    ) -> Self {
        let rule = TransitionRule::on(event, to)
            .when(move |_: &FixtureContext, e: &FlowEvent| e.payload.flag(flag) == Some(value))
            .update(enter(to.to_string()));
        self.rules.push((from.to_string(), rule));
        self
    }

    /// Attach a hand-built rule to `from`
    pub fn rule(mut self, from: &str, rule: TransitionRule<FixtureContext>) -> Self {
        self.rules.push((from.to_string(), rule));
        self
    }

    /// Run `child` while the flow sits in `step`, seeded with the parent's owner
    pub fn invoking(mut self, step: &str, child: Arc<FlowDefinition<FixtureContext>>) -> Self {
        let spec = SubflowSpec::new(child, |parent: &FixtureContext| parent.owner.clone());
        self.subflows.push((step.to_string(), spec));
        self
    }

    /// Validate and freeze the flow
    pub fn build(self) -> Result<Arc<FlowDefinition<FixtureContext>>, FlowError> {
        let Self {
            id,
            steps,
            mut rules,
            mut subflows,
        } = self;

        let first = steps.first().cloned();
        let total = steps.len().saturating_sub(1) as u32;

        let mut builder = FlowDefinition::builder(id.clone()).context_factory(move |owner: String| {
            FixtureContext {
                owner,
                screen: first.clone(),
                progress: Progress::new(total),
                values: Map::new(),
            }
        });

        for (index, name) in steps.iter().enumerate() {
            let mut node = match subflows.iter().position(|(step, _)| step == name) {
                Some(position) => StateNode::invoking(subflows.remove(position).1),
                None => StateNode::new(),
            };

            let mut remaining = Vec::with_capacity(rules.len());
            for (from, rule) in rules.drain(..) {
                if &from == name {
                    node = node.rule(rule);
                } else {
                    remaining.push((from, rule));
                }
            }
            rules = remaining;

            if let Some(next) = steps.get(index + 1) {
                node = node
                    .rule(TransitionRule::on(NEXT, next.as_str()).update(enter(next.clone())));
            }

            builder = builder.state(name.as_str(), node);
        }

        if let Some((from, _)) = rules.first() {
            return Err(FlowError::UnknownState {
                flow: id,
                state: from.clone(),
            });
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use waypoint_core::FlowInstance;

    #[test]
    fn test_linear_fixture_walks_steps() {
        let definition = FixtureFlowBuilder::new("wizard")
            .steps(["one", "two", "three"])
            .build()
            .unwrap();

        let mut flow = FlowInstance::start(definition, "owner-1".to_string()).unwrap();
        assert_eq!(flow.current_view().map(String::as_str), Some("one"));

        flow.dispatch(FlowEvent::with_payload(NEXT, json!({"name": "Ada"})))
            .unwrap();
        flow.dispatch(FlowEvent::new(NEXT)).unwrap();

        assert_eq!(flow.state().as_str(), "three");
        assert!(flow.is_terminal());
        let ctx = flow.context();
        assert_eq!(ctx.values.get("name"), Some(&json!("Ada")));
        assert!(ctx.progress.is_last());
    }

    #[test]
    fn test_rules_for_undeclared_steps_are_rejected() {
        let result = FixtureFlowBuilder::new("wizard")
            .step("only")
            .on("missing", "GO", "only")
            .build();

        assert!(matches!(
            result,
            Err(FlowError::UnknownState { ref state, .. }) if state == "missing"
        ));
    }
}
