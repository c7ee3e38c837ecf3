use pretty_assertions::assert_eq;
use serde_json::json;
use waypoint_core::{FlowError, FlowEvent, FlowInstance, FlowRunner, RunnerConfig};
use waypoint_test_utils::{
    assert_bubbled, assert_completed, assert_flow_state, assert_transitioned, init_test_logging,
    FixtureFlowBuilder, RecordingObserver, Rendered, ScriptedRenderer,
};
use waypoint_test_utils::builders::NEXT;

fn onboarding() -> FlowInstance<waypoint_test_utils::FixtureContext> {
    let definition = FixtureFlowBuilder::new("onboarding")
        .steps(["profile", "address", "summary"])
        .on("address", "BACK", "profile")
        .build()
        .expect("fixture flow is valid");
    FlowInstance::start(definition, "company-1".to_string()).expect("flow starts")
}

#[test]
fn runner_drives_flow_from_view_emissions() {
    init_test_logging();

    let renderer = ScriptedRenderer::new()
        .then("profile".to_string(), FlowEvent::with_payload(NEXT, json!({"first_name": "Grace"})))
        .then("address".to_string(), FlowEvent::new(NEXT));
    let observer = RecordingObserver::new();
    let mut runner = FlowRunner::new(onboarding(), renderer).with_observer(observer.clone());

    assert_eq!(runner.render(), Rendered::View("profile".to_string()));
    runner.pump().unwrap();
    assert_eq!(runner.render(), Rendered::View("address".to_string()));
    let deliveries = runner.pump().unwrap();

    assert_completed(&deliveries[0], "onboarding", "summary").unwrap();
    assert!(runner.is_finished());
    assert_eq!(runner.render(), Rendered::View("summary".to_string()));
    assert_eq!(runner.renderer().remaining(), 0);
    assert_eq!(observer.event_names(), vec![NEXT.to_string(), NEXT.to_string()]);
    assert_eq!(
        runner.instance().context().values.get("first_name"),
        Some(&json!("Grace"))
    );
}

#[test]
fn unmatched_events_bubble_and_are_observed() {
    let observer = RecordingObserver::new();
    let mut runner =
        FlowRunner::new(onboarding(), ScriptedRenderer::new()).with_observer(observer.clone());
    let before = runner.instance().context();

    let delivery = runner
        .send(FlowEvent::with_payload("CONTRACTOR_CREATED", json!({"id": "ctr-1"})))
        .unwrap();

    assert_bubbled(&delivery, "CONTRACTOR_CREATED").unwrap();
    assert_flow_state(runner.instance(), "profile").unwrap();
    assert_eq!(*runner.instance().context(), *before);
    assert_eq!(
        observer.bubbled(),
        vec![FlowEvent::with_payload("CONTRACTOR_CREATED", json!({"id": "ctr-1"}))]
    );
}

#[test]
fn observer_sees_handled_and_bubbled_events_in_order() {
    let observer = RecordingObserver::new();
    let mut runner =
        FlowRunner::new(onboarding(), ScriptedRenderer::new()).with_observer(observer.clone());
    let emitter = runner.emitter();

    emitter.emit_named(NEXT);
    emitter.emit_named("HELP");
    emitter.emit_named("BACK");
    let deliveries = runner.pump().unwrap();

    assert_transitioned(&deliveries[0], "onboarding", "address").unwrap();
    assert_bubbled(&deliveries[1], "HELP").unwrap();
    assert_transitioned(&deliveries[2], "onboarding", "profile").unwrap();
    assert_eq!(
        observer.event_names(),
        vec![NEXT.to_string(), "HELP".to_string(), "BACK".to_string()]
    );
}

#[test]
fn terminal_state_absorbs_nothing() {
    let observer = RecordingObserver::new();
    let mut runner =
        FlowRunner::new(onboarding(), ScriptedRenderer::new()).with_observer(observer.clone());
    runner.send(FlowEvent::new(NEXT)).unwrap();
    runner.send(FlowEvent::new(NEXT)).unwrap();
    assert!(runner.is_finished());

    for name in [NEXT, "BACK", "X"] {
        let delivery = runner.send(FlowEvent::new(name)).unwrap();
        assert_bubbled(&delivery, name).unwrap();
        assert_flow_state(runner.instance(), "summary").unwrap();
    }
    assert_eq!(observer.bubbled().len(), 3);
}

#[test]
fn unrenderable_view_shows_error_state() {
    let renderer = ScriptedRenderer::new().rejecting("address".to_string());
    let mut runner = FlowRunner::new(onboarding(), renderer);
    runner.send(FlowEvent::new(NEXT)).unwrap();

    match runner.render() {
        Rendered::Error(FlowError::UnresolvedView { flow, state, .. }) => {
            assert_eq!(flow, "onboarding");
            assert_eq!(state, "address");
        }
        other => panic!("expected error screen, got {:?}", other),
    }
}

#[test]
fn pump_respects_event_limit() {
    let mut runner = FlowRunner::new(onboarding(), ScriptedRenderer::new())
        .with_config(RunnerConfig {
            max_events_per_pump: 1,
        });
    let emitter = runner.emitter();
    emitter.emit_named(NEXT);
    emitter.emit_named(NEXT);

    let err = runner.pump().unwrap_err();
    assert!(matches!(err, FlowError::EventLimitExceeded { limit: 1, .. }));
    assert_flow_state(runner.instance(), "address").unwrap();

    runner.pump().unwrap();
    assert_flow_state(runner.instance(), "summary").unwrap();
}
