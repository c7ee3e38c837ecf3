//! The bridge between a flow instance, the views that render it and the host.

use crate::application::subflow::{expect_nested, Delivery, NestedFlow};
use crate::config::RunnerConfig;
use crate::domain::context::FlowContext;
use crate::domain::flow_instance::FlowInstance;
use crate::{FlowError, FlowEvent};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// Turns the view named by a context into output
///
/// `Output` is whatever the host's UI layer consumes: a widget tree, a
/// string, a test record. Views that want to move the flow on push events
/// into the [`Emitter`] they are given.
pub trait Renderer<C: FlowContext> {
    /// Rendered form of a view
    type Output;

    /// Render `view` with the full current context
    fn render_view(
        &mut self,
        view: &C::View,
        context: &Arc<C>,
        emitter: &Emitter,
    ) -> Result<Self::Output, FlowError>;

    /// Render a sub-flow the parent is waiting on
    fn render_subflow(
        &mut self,
        nested: &dyn NestedFlow,
        _emitter: &Emitter,
    ) -> Result<Self::Output, FlowError> {
        Err(FlowError::SubflowUnsupported(nested.flow_id().0.clone()))
    }

    /// Explicit error screen for engine failures
    fn render_error(&mut self, error: &FlowError) -> Self::Output;
}

/// Queue views push events into
///
/// Cloning gives another handle on the same queue. Events come out in the
/// order they were emitted.
#[derive(Clone, Default)]
pub struct Emitter {
    queue: Arc<Mutex<VecDeque<FlowEvent>>>,
}

impl Emitter {
    /// An empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event
    pub fn emit(&self, event: FlowEvent) {
        self.queue.lock().push_back(event);
    }

    /// Queue an event that carries no payload
    pub fn emit_named(&self, name: impl Into<String>) {
        self.emit(FlowEvent::new(name));
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Drop everything queued
    pub fn clear(&self) {
        self.queue.lock().clear();
    }

    fn pop(&self) -> Option<FlowEvent> {
        self.queue.lock().pop_front()
    }

    fn push_front(&self, event: FlowEvent) {
        self.queue.lock().push_front(event);
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("pending", &self.len())
            .finish()
    }
}

/// The host's observation channel
///
/// Called once for every event a runner delivers, after the flow has
/// applied it, whether it caused a transition or bubbled.
#[cfg_attr(test, mockall::automock)]
pub trait EventObserver: Send {
    /// An event was delivered
    fn on_event(&mut self, event: &FlowEvent, delivery: &Delivery);
}

impl<F> EventObserver for F
where
    F: FnMut(&FlowEvent, &Delivery) + Send,
{
    fn on_event(&mut self, event: &FlowEvent, delivery: &Delivery) {
        self(event, delivery)
    }
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl EventObserver for NoopObserver {
    fn on_event(&mut self, _event: &FlowEvent, _delivery: &Delivery) {}
}

/// Drives one top-level flow instance
pub struct FlowRunner<C: FlowContext, R: Renderer<C>> {
    instance: FlowInstance<C>,
    renderer: R,
    emitter: Emitter,
    observer: Box<dyn EventObserver>,
    config: RunnerConfig,
}

impl<C: FlowContext, R: Renderer<C>> FlowRunner<C, R> {
    /// Runner with no observer and default settings
    pub fn new(instance: FlowInstance<C>, renderer: R) -> Self {
        Self {
            instance,
            renderer,
            emitter: Emitter::new(),
            observer: Box::new(NoopObserver),
            config: RunnerConfig::default(),
        }
    }

    /// Forward every delivered event to `observer`
    pub fn with_observer(mut self, observer: impl EventObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Replace the runner settings
    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Render whatever the flow shows right now
    pub fn render(&mut self) -> R::Output {
        render_instance(&self.instance, &mut self.renderer, &self.emitter)
    }

    /// Handle on the queue views emit into
    pub fn emitter(&self) -> Emitter {
        self.emitter.clone()
    }

    /// Deliver one event now and notify the observer
    ///
    /// The observer sees the event only after the flow has applied it; on
    /// error it is not notified and the flow keeps its previous state.
    pub fn send(&mut self, event: FlowEvent) -> Result<Delivery, FlowError> {
        let delivery = self.instance.deliver(event.clone())?;
        self.observer.on_event(&event, &delivery);
        Ok(delivery)
    }

    /// Deliver queued events in order until the queue is empty
    ///
    /// Stops with [`FlowError::EventLimitExceeded`] after
    /// `max_events_per_pump` deliveries, leaving the rest queued. An error
    /// from a delivery also stops the pump; the failing event is dropped and
    /// later ones stay queued.
    pub fn pump(&mut self) -> Result<Vec<Delivery>, FlowError> {
        let limit = self.config.max_events_per_pump;
        let mut deliveries = Vec::new();

        while let Some(event) = self.emitter.pop() {
            if deliveries.len() >= limit {
                self.emitter.push_front(event);
                error!(
                    flow = %self.instance.definition().id(),
                    limit,
                    "Event limit exceeded, stopping pump"
                );
                return Err(FlowError::EventLimitExceeded {
                    flow: self.instance.definition().id().0.clone(),
                    limit,
                });
            }
            deliveries.push(self.send(event)?);
        }

        debug!(
            flow = %self.instance.definition().id(),
            delivered = deliveries.len(),
            state = %self.instance.state(),
            "Pump finished"
        );
        Ok(deliveries)
    }

    /// The flow being driven
    pub fn instance(&self) -> &FlowInstance<C> {
        &self.instance
    }

    /// The renderer
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Settings in use
    pub fn config(&self) -> RunnerConfig {
        self.config
    }

    /// Whether the flow sits in a terminal state with no child running
    pub fn is_finished(&self) -> bool {
        self.instance.is_terminal() && self.instance.subflow().is_none()
    }

    /// Give back the flow instance
    pub fn into_instance(self) -> FlowInstance<C> {
        self.instance
    }
}

impl<C: FlowContext, R: Renderer<C>> fmt::Debug for FlowRunner<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowRunner")
            .field("instance", &self.instance)
            .field("emitter", &self.emitter)
            .field("config", &self.config)
            .finish()
    }
}

/// Render a flow instance directly
///
/// A running child takes the screen through [`Renderer::render_subflow`]
/// unless it already sits in a terminal state. Otherwise the view named by
/// the context is rendered. Every failure ends in [`Renderer::render_error`].
pub fn render_instance<C, R>(
    instance: &FlowInstance<C>,
    renderer: &mut R,
    emitter: &Emitter,
) -> R::Output
where
    C: FlowContext,
    R: Renderer<C>,
{
    if let Some(child) = instance.subflow().filter(|child| !child.is_terminal()) {
        return match renderer.render_subflow(child, emitter) {
            Ok(output) => output,
            Err(e) => {
                error!(
                    flow = %instance.definition().id(),
                    child = %child.flow_id(),
                    error = %e,
                    "Sub-flow could not be rendered"
                );
                renderer.render_error(&e)
            }
        };
    }

    let unresolved = |reason: String| FlowError::UnresolvedView {
        flow: instance.definition().id().0.clone(),
        state: instance.state().0.clone(),
        reason,
    };

    let context = instance.context();
    let result = match context.current_view() {
        Some(view) => renderer.render_view(view, &context, emitter).map_err(|e| match e {
            e @ FlowError::UnresolvedView { .. } => e,
            other => unresolved(other.to_string()),
        }),
        None => Err(unresolved("context names no view".to_string())),
    };

    match result {
        Ok(output) => output,
        Err(e) => {
            error!(
                flow = %instance.definition().id(),
                state = %instance.state(),
                error = %e,
                "View could not be resolved"
            );
            renderer.render_error(&e)
        }
    }
}

/// Render a type-erased nested flow with a renderer for its context type
///
/// Hosts call this from [`Renderer::render_subflow`]. A nested flow over a
/// different context type renders the error screen.
pub fn render_nested<C, R>(
    nested: &dyn NestedFlow,
    renderer: &mut R,
    emitter: &Emitter,
) -> R::Output
where
    C: FlowContext,
    R: Renderer<C>,
{
    match expect_nested::<C>(nested) {
        Ok(instance) => render_instance(instance, renderer, emitter),
        Err(e) => {
            error!(child = %nested.flow_id(), error = %e, "Nested flow has an unexpected type");
            renderer.render_error(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::flow_definition::FlowDefinition;
    use crate::domain::flow_instance::{FlowId, StateId};
    use crate::domain::transition::{StateNode, TransitionRule};
    use mockall::predicate::always;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Screen {
        Landing,
        Configuration,
        Broken,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Payroll {
        screen: Option<Screen>,
    }

    impl FlowContext for Payroll {
        type View = Screen;
        type Seed = ();

        fn current_view(&self) -> Option<&Screen> {
            self.screen.as_ref()
        }
    }

    fn show(screen: Option<Screen>) -> impl Fn(&Payroll, &FlowEvent) -> Payroll {
        move |_, _| Payroll { screen }
    }

    fn definition() -> Arc<FlowDefinition<Payroll>> {
        FlowDefinition::builder("payroll")
            .context_factory(|_: ()| Payroll {
                screen: Some(Screen::Landing),
            })
            .state(
                "landing",
                StateNode::new()
                    .rule(
                        TransitionRule::on("START", "configuration")
                            .update(show(Some(Screen::Configuration))),
                    )
                    .rule(TransitionRule::on("CORRUPT", "configuration").update(show(None)))
                    .rule(
                        TransitionRule::on("BREAK", "configuration")
                            .update(show(Some(Screen::Broken))),
                    ),
            )
            .state(
                "configuration",
                StateNode::new().rule(TransitionRule::on("SUBMIT", "receipts")),
            )
            .state("receipts", StateNode::terminal())
            .build()
            .unwrap()
    }

    #[derive(Default)]
    struct TextRenderer {
        auto_emit: Option<&'static str>,
    }

    impl Renderer<Payroll> for TextRenderer {
        type Output = String;

        fn render_view(
            &mut self,
            view: &Screen,
            _context: &Arc<Payroll>,
            emitter: &Emitter,
        ) -> Result<String, FlowError> {
            if let Some(name) = self.auto_emit.take() {
                emitter.emit_named(name);
            }
            match view {
                Screen::Landing => Ok("landing".to_string()),
                Screen::Configuration => Ok("configuration".to_string()),
                Screen::Broken => Err(FlowError::Other("no component for Broken".to_string())),
            }
        }

        fn render_error(&mut self, error: &FlowError) -> String {
            format!("error: {}", error)
        }
    }

    fn runner(renderer: TextRenderer) -> FlowRunner<Payroll, TextRenderer> {
        FlowRunner::new(FlowInstance::start(definition(), ()).unwrap(), renderer)
    }

    #[test]
    fn test_render_emit_pump_cycle() {
        let mut runner = runner(TextRenderer {
            auto_emit: Some("START"),
        });

        assert_eq!(runner.render(), "landing");
        assert_eq!(runner.emitter().len(), 1);

        let deliveries = runner.pump().unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(runner.instance().state().as_str(), "configuration");
        assert_eq!(runner.render(), "configuration");
        assert!(runner.emitter().is_empty());
    }

    #[test]
    fn test_observer_sees_transitions_and_bubbles_in_order() {
        let mut observer = MockEventObserver::new();
        let mut seq = mockall::Sequence::new();
        observer
            .expect_on_event()
            .withf(|event, delivery| event.is("START") && !delivery.is_bubbled())
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        observer
            .expect_on_event()
            .withf(|event, delivery| event.is("HELP") && delivery.is_bubbled())
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let mut runner = runner(TextRenderer::default()).with_observer(observer);
        let emitter = runner.emitter();
        emitter.emit_named("START");
        emitter.emit_named("HELP");

        runner.pump().unwrap();
        assert_eq!(runner.instance().state().as_str(), "configuration");
    }

    #[test]
    fn test_observer_runs_after_transition() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut runner = runner(TextRenderer::default()).with_observer(
            move |event: &FlowEvent, delivery: &Delivery| {
                sink.lock().push((event.name.clone(), delivery.clone()));
            },
        );

        runner.send(FlowEvent::new("START")).unwrap();
        runner.send(FlowEvent::new("SUBMIT")).unwrap();

        let seen = seen.lock();
        assert_eq!(
            seen[0],
            (
                "START".to_string(),
                Delivery::Transitioned {
                    flow: FlowId::from("payroll"),
                    from: StateId::from("landing"),
                    to: StateId::from("configuration"),
                }
            )
        );
        assert!(matches!(seen[1].1, Delivery::Completed { .. }));
        assert!(runner.is_finished());
    }

    #[test]
    fn test_missing_view_renders_error_state() {
        let mut runner = runner(TextRenderer::default());
        runner.send(FlowEvent::new("CORRUPT")).unwrap();

        let output = runner.render();
        assert!(output.starts_with("error: No view can be resolved for flow 'payroll'"));
        assert!(output.contains("context names no view"));
    }

    #[test]
    fn test_rejected_view_renders_error_state() {
        let mut runner = runner(TextRenderer::default());
        runner.send(FlowEvent::new("BREAK")).unwrap();

        let output = runner.render();
        assert!(output.contains("state 'configuration'"));
        assert!(output.contains("no component for Broken"));
    }

    #[test]
    fn test_pump_stops_at_event_limit() {
        let mut observer = MockEventObserver::new();
        observer.expect_on_event().with(always(), always()).times(2).return_const(());

        let mut runner = runner(TextRenderer::default())
            .with_observer(observer)
            .with_config(RunnerConfig {
                max_events_per_pump: 2,
            });
        let emitter = runner.emitter();
        for _ in 0..3 {
            emitter.emit_named("PING");
        }

        let err = runner.pump().unwrap_err();
        assert_eq!(
            err,
            FlowError::EventLimitExceeded {
                flow: "payroll".to_string(),
                limit: 2,
            }
        );
        assert_eq!(emitter.len(), 1);
    }

    #[test]
    fn test_subflow_without_support_renders_error() {
        #[derive(Debug, Clone)]
        struct Host;

        impl FlowContext for Host {
            type View = ();
            type Seed = ();

            fn current_view(&self) -> Option<&()> {
                None
            }
        }

        struct HostRenderer;

        impl Renderer<Host> for HostRenderer {
            type Output = String;

            fn render_view(
                &mut self,
                _: &(),
                _: &Arc<Host>,
                _: &Emitter,
            ) -> Result<String, FlowError> {
                Ok("host".to_string())
            }

            fn render_error(&mut self, error: &FlowError) -> String {
                error.to_string()
            }
        }

        let host = FlowDefinition::builder("host")
            .context_factory(|_: ()| Host)
            .state(
                "payroll",
                StateNode::invoking(crate::SubflowSpec::new(definition(), |_: &Host| ()))
                    .rule(TransitionRule::on("SUBMIT", "done")),
            )
            .state("done", StateNode::terminal())
            .build()
            .unwrap();

        let mut runner = FlowRunner::new(FlowInstance::start(host, ()).unwrap(), HostRenderer);
        assert_eq!(runner.render(), "Renderer cannot display sub-flow 'payroll'");

        let mut payroll_renderer = TextRenderer::default();
        let child = runner.instance().subflow().unwrap();
        assert_eq!(
            render_nested::<Payroll, _>(child, &mut payroll_renderer, &runner.emitter()),
            "landing"
        );
    }
}
