//! Admin-driven employee onboarding
//!
//! An administrator starts from the employee list, adds or edits an
//! employee and walks the profile, compensation, tax, payment and deduction
//! screens. When the profile marks the employee as self-onboarding, the
//! employee fills in taxes and payment later, so the admin path skips them.
//!
//! Leaving the list with [`LIST_DONE`] ends the flow; that is the event a
//! parent flow receives when this graph runs as a sub-flow.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use waypoint_core::{
    FlowContext, FlowDefinition, FlowError, FlowEvent, Progress, StateNode, TransitionRule,
};

pub const FLOW_ID: &str = "employee_onboarding";

/// Start a new employee
pub const ADD: &str = "EMPLOYEE_ADD";
/// Open an existing employee; payload is [`EmployeeSelected`]
pub const EDIT: &str = "EMPLOYEE_EDIT";
/// Return to the employee list
pub const CANCEL: &str = "CANCEL";
/// Profile saved; payload is [`ProfileSaved`]
pub const PROFILE_DONE: &str = "EMPLOYEE_PROFILE_DONE";
pub const COMPENSATION_DONE: &str = "EMPLOYEE_COMPENSATION_DONE";
pub const FEDERAL_TAXES_DONE: &str = "EMPLOYEE_FEDERAL_TAXES_DONE";
pub const STATE_TAXES_DONE: &str = "EMPLOYEE_STATE_TAXES_DONE";
pub const PAYMENT_METHOD_DONE: &str = "EMPLOYEE_PAYMENT_METHOD_DONE";
pub const DEDUCTIONS_DONE: &str = "EMPLOYEE_DEDUCTIONS_DONE";
/// Summary confirmed, back to the list
pub const ONBOARDING_DONE: &str = "EMPLOYEE_ONBOARDING_DONE";
/// Leave the employee list
pub const LIST_DONE: &str = "EMPLOYEES_LIST_DONE";

/// Steps from profile to summary when the admin fills in everything
pub const ADMIN_STEPS: u32 = 7;
/// Steps from profile to summary when the employee completes the rest
pub const SELF_ONBOARDING_STEPS: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeSelected {
    pub employee_id: String,
}

/// Payload of [`PROFILE_DONE`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSaved {
    pub employee_id: String,
    #[serde(default)]
    pub self_onboarding: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmployeeView {
    EmployeeList,
    Profile { employee_id: Option<String> },
    Compensation,
    FederalTaxes,
    StateTaxes,
    PaymentMethod,
    Deductions,
    Summary,
}

/// Parameters an embedding host starts the flow with
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmployeeSeed {
    pub company_id: String,
}

impl EmployeeSeed {
    pub fn new(company_id: impl Into<String>) -> Self {
        Self {
            company_id: company_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmployeeOnboardingContext {
    pub company_id: String,
    pub employee_id: Option<String>,
    pub self_onboarding: bool,
    pub view: Option<EmployeeView>,
    pub progress: Progress,
}

impl FlowContext for EmployeeOnboardingContext {
    type View = EmployeeView;
    type Seed = EmployeeSeed;

    fn current_view(&self) -> Option<&EmployeeView> {
        self.view.as_ref()
    }
}

impl EmployeeOnboardingContext {
    fn showing(&self, view: EmployeeView) -> Self {
        Self {
            view: Some(view),
            progress: self.progress.advance(),
            ..self.clone()
        }
    }

    fn total_steps(&self) -> u32 {
        if self.self_onboarding {
            SELF_ONBOARDING_STEPS
        } else {
            ADMIN_STEPS
        }
    }
}

fn is_self_onboarding(event: &FlowEvent) -> bool {
    event.payload.flag("self_onboarding").unwrap_or(false)
}

fn list(ctx: &EmployeeOnboardingContext, _: &FlowEvent) -> EmployeeOnboardingContext {
    EmployeeOnboardingContext {
        employee_id: None,
        self_onboarding: false,
        view: Some(EmployeeView::EmployeeList),
        progress: Progress::new(ADMIN_STEPS),
        ..ctx.clone()
    }
}

fn new_profile(ctx: &EmployeeOnboardingContext, _: &FlowEvent) -> EmployeeOnboardingContext {
    EmployeeOnboardingContext {
        employee_id: None,
        self_onboarding: false,
        view: Some(EmployeeView::Profile { employee_id: None }),
        progress: Progress::at(1, ADMIN_STEPS),
        ..ctx.clone()
    }
}

fn selected_profile(
    ctx: &EmployeeOnboardingContext,
    event: &FlowEvent,
) -> Result<EmployeeOnboardingContext, FlowError> {
    let EmployeeSelected { employee_id } = event.payload_as()?;
    Ok(EmployeeOnboardingContext {
        employee_id: Some(employee_id.clone()),
        view: Some(EmployeeView::Profile {
            employee_id: Some(employee_id),
        }),
        progress: Progress::at(1, ctx.total_steps()),
        ..ctx.clone()
    })
}

fn reopen_profile(ctx: &EmployeeOnboardingContext, _: &FlowEvent) -> EmployeeOnboardingContext {
    EmployeeOnboardingContext {
        view: Some(EmployeeView::Profile {
            employee_id: ctx.employee_id.clone(),
        }),
        progress: Progress::at(1, ctx.total_steps()),
        ..ctx.clone()
    }
}

fn profile_saved(
    ctx: &EmployeeOnboardingContext,
    event: &FlowEvent,
) -> Result<EmployeeOnboardingContext, FlowError> {
    let ProfileSaved {
        employee_id,
        self_onboarding,
    } = event.payload_as()?;
    let total = if self_onboarding {
        SELF_ONBOARDING_STEPS
    } else {
        ADMIN_STEPS
    };
    Ok(EmployeeOnboardingContext {
        employee_id: Some(employee_id),
        self_onboarding,
        view: Some(EmployeeView::Compensation),
        progress: Progress::at(2, total),
        ..ctx.clone()
    })
}

fn show(
    view: EmployeeView,
) -> impl Fn(&EmployeeOnboardingContext, &FlowEvent) -> EmployeeOnboardingContext {
    move |ctx, _| ctx.showing(view.clone())
}

fn skip_to_deductions(ctx: &EmployeeOnboardingContext, _: &FlowEvent) -> EmployeeOnboardingContext {
    ctx.showing(EmployeeView::Deductions)
}

fn build() -> Result<Arc<FlowDefinition<EmployeeOnboardingContext>>, FlowError> {
    FlowDefinition::builder(FLOW_ID)
        .name("Employee onboarding")
        .context_factory(|seed: EmployeeSeed| EmployeeOnboardingContext {
            company_id: seed.company_id,
            view: Some(EmployeeView::EmployeeList),
            progress: Progress::new(ADMIN_STEPS),
            ..EmployeeOnboardingContext::default()
        })
        .state(
            "list",
            StateNode::new()
                .rule(TransitionRule::on(ADD, "profile").update(new_profile))
                .rule(TransitionRule::on(EDIT, "profile").reduce(selected_profile))
                .rule(TransitionRule::on(LIST_DONE, "done")),
        )
        .state(
            "profile",
            StateNode::new()
                .rule(
                    TransitionRule::on(PROFILE_DONE, "compensation")
                        .when(|_: &EmployeeOnboardingContext, e: &FlowEvent| !is_self_onboarding(e))
                        .reduce(profile_saved)
                        .labelled("admin"),
                )
                .rule(
                    TransitionRule::on(PROFILE_DONE, "compensation")
                        .when(|_: &EmployeeOnboardingContext, e: &FlowEvent| is_self_onboarding(e))
                        .reduce(profile_saved)
                        .labelled("self_onboarding"),
                )
                .rule(TransitionRule::on(CANCEL, "list").update(list)),
        )
        .state(
            "compensation",
            StateNode::new()
                .rule(
                    TransitionRule::on(COMPENSATION_DONE, "deductions")
                        .when(|ctx: &EmployeeOnboardingContext, _: &FlowEvent| ctx.self_onboarding)
                        .update(skip_to_deductions)
                        .labelled("self_onboarding"),
                )
                .rule(
                    TransitionRule::on(COMPENSATION_DONE, "federal_taxes")
                        .update(show(EmployeeView::FederalTaxes)),
                ),
        )
        .state(
            "federal_taxes",
            StateNode::new().rule(
                TransitionRule::on(FEDERAL_TAXES_DONE, "state_taxes")
                    .update(show(EmployeeView::StateTaxes)),
            ),
        )
        .state(
            "state_taxes",
            StateNode::new().rule(
                TransitionRule::on(STATE_TAXES_DONE, "payment_method")
                    .update(show(EmployeeView::PaymentMethod)),
            ),
        )
        .state(
            "payment_method",
            StateNode::new().rule(
                TransitionRule::on(PAYMENT_METHOD_DONE, "deductions")
                    .update(show(EmployeeView::Deductions)),
            ),
        )
        .state(
            "deductions",
            StateNode::new().rule(
                TransitionRule::on(DEDUCTIONS_DONE, "summary").update(show(EmployeeView::Summary)),
            ),
        )
        .state(
            "summary",
            StateNode::new()
                .rule(TransitionRule::on(EDIT, "profile").update(reopen_profile))
                .rule(TransitionRule::on(ONBOARDING_DONE, "list").update(list)),
        )
        .state("done", StateNode::terminal())
        .strict()
        .build()
}

static DEFINITION: Lazy<Result<Arc<FlowDefinition<EmployeeOnboardingContext>>, FlowError>> =
    Lazy::new(build);

/// The admin employee onboarding graph
pub fn definition() -> Result<Arc<FlowDefinition<EmployeeOnboardingContext>>, FlowError> {
    DEFINITION.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use waypoint_core::FlowInstance;

    fn start() -> FlowInstance<EmployeeOnboardingContext> {
        FlowInstance::start(definition().unwrap(), EmployeeSeed::new("co-1")).unwrap()
    }

    fn walk(
        flow: &mut FlowInstance<EmployeeOnboardingContext>,
        events: &[FlowEvent],
    ) -> Vec<String> {
        events
            .iter()
            .map(|event| {
                flow.dispatch(event.clone()).unwrap();
                flow.state().to_string()
            })
            .collect()
    }

    #[test]
    fn test_admin_path_visits_every_screen() {
        let mut flow = start();

        let states = walk(
            &mut flow,
            &[
                FlowEvent::new(ADD),
                FlowEvent::with_payload(
                    PROFILE_DONE,
                    json!({"employee_id": "emp-1", "self_onboarding": false}),
                ),
                FlowEvent::new(COMPENSATION_DONE),
                FlowEvent::new(FEDERAL_TAXES_DONE),
                FlowEvent::new(STATE_TAXES_DONE),
                FlowEvent::new(PAYMENT_METHOD_DONE),
                FlowEvent::new(DEDUCTIONS_DONE),
            ],
        );

        assert_eq!(
            states,
            vec![
                "profile",
                "compensation",
                "federal_taxes",
                "state_taxes",
                "payment_method",
                "deductions",
                "summary"
            ]
        );
        let ctx = flow.context();
        assert_eq!(ctx.progress, Progress::at(ADMIN_STEPS, ADMIN_STEPS));
        assert_eq!(ctx.view, Some(EmployeeView::Summary));
    }

    #[test]
    fn test_self_onboarding_skips_taxes_and_payment() {
        let mut flow = start();

        let states = walk(
            &mut flow,
            &[
                FlowEvent::new(ADD),
                FlowEvent::with_payload(
                    PROFILE_DONE,
                    json!({"employee_id": "emp-2", "self_onboarding": true}),
                ),
                FlowEvent::new(COMPENSATION_DONE),
                FlowEvent::new(DEDUCTIONS_DONE),
            ],
        );

        assert_eq!(states, vec!["profile", "compensation", "deductions", "summary"]);
        let ctx = flow.context();
        assert!(ctx.self_onboarding);
        assert!(ctx.progress.is_last());
        assert_eq!(ctx.progress.total_steps, SELF_ONBOARDING_STEPS);
    }

    #[test]
    fn test_edit_from_summary_reopens_selected_employee() {
        let mut flow = start();
        walk(
            &mut flow,
            &[
                FlowEvent::with_payload(EDIT, json!({"employee_id": "emp-3"})),
                FlowEvent::with_payload(
                    PROFILE_DONE,
                    json!({"employee_id": "emp-3", "self_onboarding": true}),
                ),
                FlowEvent::new(COMPENSATION_DONE),
                FlowEvent::new(DEDUCTIONS_DONE),
            ],
        );

        flow.dispatch(FlowEvent::new(EDIT)).unwrap();

        assert_eq!(flow.state().as_str(), "profile");
        assert_eq!(
            flow.current_view(),
            Some(&EmployeeView::Profile {
                employee_id: Some("emp-3".to_string())
            })
        );
    }

    #[test]
    fn test_cancel_returns_to_list_and_clears_selection() {
        let mut flow = start();
        walk(
            &mut flow,
            &[
                FlowEvent::with_payload(EDIT, json!({"employee_id": "emp-4"})),
                FlowEvent::new(CANCEL),
            ],
        );

        assert_eq!(flow.state().as_str(), "list");
        assert_eq!(flow.context().employee_id, None);
        assert_eq!(flow.current_view(), Some(&EmployeeView::EmployeeList));
    }

    #[test]
    fn test_list_done_finishes_flow() {
        let mut flow = start();
        flow.dispatch(FlowEvent::new(LIST_DONE)).unwrap();
        assert!(flow.is_terminal());
    }
}
