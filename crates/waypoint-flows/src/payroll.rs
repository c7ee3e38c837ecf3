//! Running a payroll
//!
//! ```text
//! landing --START--> configuration --CALCULATED--> overview --SUBMITTED--> receipts
//!    |                  |   ^                         |
//!    |       EDIT_EMPLOYEE  EMPLOYEE_SAVED/CANCEL     CANCEL -> configuration
//!    |                  v   |
//!    |               edit_employee
//!    +--SKIP[not blocked]--> receipts
//! ```

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use waypoint_core::{
    FlowContext, FlowDefinition, FlowError, FlowEvent, Progress, StateNode, TransitionRule,
};

pub const FLOW_ID: &str = "payroll";

/// A payroll was picked; payload is [`PayrollSelected`]
pub const START: &str = "RUN_PAYROLL_SELECTED";
/// Skip the payroll; payload may set `blocked`
pub const SKIP: &str = "RUN_PAYROLL_SKIPPED";
/// Payload is [`EmployeeSelected`]
pub const EDIT_EMPLOYEE: &str = "RUN_PAYROLL_EMPLOYEE_EDIT";
pub const EMPLOYEE_SAVED: &str = "RUN_PAYROLL_EMPLOYEE_SAVED";
pub const CANCEL: &str = "CANCEL";
pub const CALCULATED: &str = "RUN_PAYROLL_CALCULATED";
pub const SUBMITTED: &str = "RUN_PAYROLL_SUBMITTED";

const STEPS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollSelected {
    pub payroll_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeSelected {
    pub employee_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayrollView {
    Landing,
    Configuration,
    EditEmployee { employee_id: String },
    Overview,
    Receipts,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PayrollContext {
    pub company_id: String,
    pub payroll_id: Option<String>,
    pub employee_id: Option<String>,
    pub skipped: bool,
    pub view: Option<PayrollView>,
    pub progress: Progress,
}

impl FlowContext for PayrollContext {
    type View = PayrollView;
    type Seed = String;

    fn current_view(&self) -> Option<&PayrollView> {
        self.view.as_ref()
    }
}

fn payroll_selected(ctx: &PayrollContext, event: &FlowEvent) -> Result<PayrollContext, FlowError> {
    let PayrollSelected { payroll_id } = event.payload_as()?;
    Ok(PayrollContext {
        payroll_id: Some(payroll_id),
        view: Some(PayrollView::Configuration),
        progress: Progress::at(1, STEPS),
        ..ctx.clone()
    })
}

fn not_blocked(_: &PayrollContext, event: &FlowEvent) -> bool {
    !event.payload.flag("blocked").unwrap_or(false)
}

fn skipped(ctx: &PayrollContext, event: &FlowEvent) -> PayrollContext {
    PayrollContext {
        payroll_id: event.payload.str_field("payroll_id").map(str::to_string),
        skipped: true,
        view: Some(PayrollView::Receipts),
        progress: Progress::at(STEPS, STEPS),
        ..ctx.clone()
    }
}

fn edit_employee(ctx: &PayrollContext, event: &FlowEvent) -> Result<PayrollContext, FlowError> {
    let EmployeeSelected { employee_id } = event.payload_as()?;
    Ok(PayrollContext {
        employee_id: Some(employee_id.clone()),
        view: Some(PayrollView::EditEmployee { employee_id }),
        ..ctx.clone()
    })
}

fn configuration(ctx: &PayrollContext, _: &FlowEvent) -> PayrollContext {
    PayrollContext {
        employee_id: None,
        view: Some(PayrollView::Configuration),
        progress: Progress::at(1, STEPS),
        ..ctx.clone()
    }
}

fn next(view: PayrollView) -> impl Fn(&PayrollContext, &FlowEvent) -> PayrollContext {
    move |ctx, _| PayrollContext {
        view: Some(view.clone()),
        progress: ctx.progress.advance(),
        ..ctx.clone()
    }
}

fn build() -> Result<Arc<FlowDefinition<PayrollContext>>, FlowError> {
    FlowDefinition::builder(FLOW_ID)
        .name("Run payroll")
        .context_factory(|company_id: String| PayrollContext {
            company_id,
            view: Some(PayrollView::Landing),
            progress: Progress::new(STEPS),
            ..PayrollContext::default()
        })
        .state(
            "landing",
            StateNode::new()
                .rule(TransitionRule::on(START, "configuration").reduce(payroll_selected))
                .rule(TransitionRule::on(SKIP, "receipts").when(not_blocked).update(skipped)),
        )
        .state(
            "configuration",
            StateNode::new()
                .rule(TransitionRule::on(EDIT_EMPLOYEE, "edit_employee").reduce(edit_employee))
                .rule(
                    TransitionRule::on(CALCULATED, "overview").update(next(PayrollView::Overview)),
                ),
        )
        .state(
            "edit_employee",
            StateNode::new()
                .rule(TransitionRule::on(EMPLOYEE_SAVED, "configuration").update(configuration))
                .rule(TransitionRule::on(CANCEL, "configuration").update(configuration)),
        )
        .state(
            "overview",
            StateNode::new()
                .rule(TransitionRule::on(SUBMITTED, "receipts").update(next(PayrollView::Receipts)))
                .rule(TransitionRule::on(CANCEL, "configuration").update(configuration)),
        )
        .state("receipts", StateNode::terminal())
        .strict()
        .build()
}

static DEFINITION: Lazy<Result<Arc<FlowDefinition<PayrollContext>>, FlowError>> = Lazy::new(build);

/// The payroll execution graph
pub fn definition() -> Result<Arc<FlowDefinition<PayrollContext>>, FlowError> {
    DEFINITION.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use waypoint_core::{Delivery, DispatchOutcome, FlowInstance, FlowRunner};
    use waypoint_test_utils::{RecordingObserver, ScriptedRenderer};

    fn start() -> FlowInstance<PayrollContext> {
        FlowInstance::start(definition().unwrap(), "co-1".to_string()).unwrap()
    }

    #[test]
    fn test_run_payroll_with_employee_edit() {
        let mut flow = start();

        flow.dispatch(FlowEvent::with_payload(START, json!({"payroll_id": "pr-1"})))
            .unwrap();
        flow.dispatch(FlowEvent::with_payload(EDIT_EMPLOYEE, json!({"employee_id": "emp-1"})))
            .unwrap();
        assert_eq!(
            flow.current_view(),
            Some(&PayrollView::EditEmployee {
                employee_id: "emp-1".to_string()
            })
        );

        flow.dispatch(FlowEvent::new(EMPLOYEE_SAVED)).unwrap();
        flow.dispatch(FlowEvent::new(CALCULATED)).unwrap();
        flow.dispatch(FlowEvent::new(CANCEL)).unwrap();
        assert_eq!(flow.state().as_str(), "configuration");

        flow.dispatch(FlowEvent::new(CALCULATED)).unwrap();
        flow.dispatch(FlowEvent::new(SUBMITTED)).unwrap();

        assert!(flow.is_terminal());
        let ctx = flow.context();
        assert_eq!(ctx.payroll_id.as_deref(), Some("pr-1"));
        assert_eq!(ctx.employee_id, None);
        assert!(ctx.progress.is_last());
    }

    #[test]
    fn test_selection_reaches_observer() {
        let observer = RecordingObserver::new();
        let mut runner = FlowRunner::new(start(), ScriptedRenderer::<PayrollView>::new())
            .with_observer(observer.clone());
        let before = runner.instance().context();

        runner
            .send(FlowEvent::with_payload(START, json!({"payroll_id": "pr-9"})))
            .unwrap();

        assert_eq!(observer.event_names(), vec![START.to_string()]);
        assert_matches!(observer.last(), Some((_, Delivery::Transitioned { .. })));
        assert_eq!(
            *before,
            PayrollContext {
                company_id: "co-1".to_string(),
                view: Some(PayrollView::Landing),
                progress: Progress::new(STEPS),
                ..PayrollContext::default()
            }
        );
        assert_eq!(runner.instance().context().payroll_id.as_deref(), Some("pr-9"));
    }

    #[test]
    fn test_skip_jumps_to_receipts_unless_blocked() {
        let mut flow = start();
        let outcome = flow
            .dispatch(FlowEvent::with_payload(SKIP, json!({"payroll_id": "pr-2", "blocked": true})))
            .unwrap();
        assert_matches!(outcome, DispatchOutcome::Unmatched(_));
        assert_eq!(flow.state().as_str(), "landing");

        flow.dispatch(FlowEvent::with_payload(SKIP, json!({"payroll_id": "pr-2"})))
            .unwrap();
        assert_eq!(flow.state().as_str(), "receipts");
        assert!(flow.context().skipped);
    }
}
