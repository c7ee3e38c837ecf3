//! Company onboarding
//!
//! The longest graph. Two of its steps hand the screen to complete nested
//! flows: `employees` runs [`employee_onboarding`](crate::employee_onboarding)
//! and `documents` runs [`document_signer`](crate::document_signer). Each
//! child's final event is matched by the step's own rules like any other
//! event.
//!
//! Leaving `documents` with unsigned documents restarts the signer, so the
//! company can only reach the summary with everything signed.

use crate::document_signer::{self, SignerContext};
use crate::employee_onboarding::{self, EmployeeOnboardingContext, EmployeeSeed};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use waypoint_core::{
    FlowContext, FlowDefinition, FlowError, FlowEvent, Progress, StateNode, SubflowSpec,
    TransitionRule,
};

pub const FLOW_ID: &str = "company_onboarding";

pub const START: &str = "COMPANY_ONBOARDING_START";
pub const LOCATIONS_DONE: &str = "COMPANY_LOCATIONS_DONE";
pub const FEDERAL_TAXES_DONE: &str = "COMPANY_FEDERAL_TAXES_DONE";
pub const INDUSTRY_DONE: &str = "COMPANY_INDUSTRY_DONE";
pub const BANK_ACCOUNT_DONE: &str = "COMPANY_BANK_ACCOUNT_DONE";
pub const PAY_SCHEDULE_DONE: &str = "COMPANY_PAY_SCHEDULE_DONE";
pub const STATE_TAXES_DONE: &str = "COMPANY_STATE_TAXES_DONE";

const STEPS: u32 = 9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompanyView {
    Overview,
    Locations,
    FederalTaxes,
    Industry,
    BankAccount,
    Employees,
    PaySchedule,
    StateTaxes,
    Documents,
    Summary,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompanyOnboardingContext {
    pub company_id: String,
    pub view: Option<CompanyView>,
    pub signed_all: bool,
    pub progress: Progress,
}

impl FlowContext for CompanyOnboardingContext {
    type View = CompanyView;
    type Seed = String;

    fn current_view(&self) -> Option<&CompanyView> {
        self.view.as_ref()
    }
}

fn next(
    view: CompanyView,
) -> impl Fn(&CompanyOnboardingContext, &FlowEvent) -> CompanyOnboardingContext {
    move |ctx, _| CompanyOnboardingContext {
        view: Some(view.clone()),
        progress: ctx.progress.advance(),
        ..ctx.clone()
    }
}

fn all_signed(_: &CompanyOnboardingContext, event: &FlowEvent) -> bool {
    event.payload.flag("signed_all") == Some(true)
}

fn documents_signed(ctx: &CompanyOnboardingContext, _: &FlowEvent) -> CompanyOnboardingContext {
    CompanyOnboardingContext {
        view: Some(CompanyView::Summary),
        signed_all: true,
        progress: ctx.progress.advance(),
        ..ctx.clone()
    }
}

fn documents_pending(ctx: &CompanyOnboardingContext, _: &FlowEvent) -> CompanyOnboardingContext {
    CompanyOnboardingContext {
        view: Some(CompanyView::Documents),
        signed_all: false,
        ..ctx.clone()
    }
}

fn employee_seed(ctx: &CompanyOnboardingContext) -> EmployeeSeed {
    EmployeeSeed::new(ctx.company_id.clone())
}

fn signer_seed(ctx: &CompanyOnboardingContext) -> String {
    ctx.company_id.clone()
}

fn build() -> Result<Arc<FlowDefinition<CompanyOnboardingContext>>, FlowError> {
    let employees: Arc<FlowDefinition<EmployeeOnboardingContext>> =
        employee_onboarding::definition()?;
    let signer: Arc<FlowDefinition<SignerContext>> = document_signer::definition()?;

    FlowDefinition::builder(FLOW_ID)
        .name("Company onboarding")
        .context_factory(|company_id: String| CompanyOnboardingContext {
            company_id,
            view: Some(CompanyView::Overview),
            signed_all: false,
            progress: Progress::new(STEPS),
        })
        .state(
            "overview",
            StateNode::new().rule(
                TransitionRule::on(START, "locations").update(next(CompanyView::Locations)),
            ),
        )
        .state(
            "locations",
            StateNode::new().rule(
                TransitionRule::on(LOCATIONS_DONE, "federal_taxes")
                    .update(next(CompanyView::FederalTaxes)),
            ),
        )
        .state(
            "federal_taxes",
            StateNode::new().rule(
                TransitionRule::on(FEDERAL_TAXES_DONE, "industry")
                    .update(next(CompanyView::Industry)),
            ),
        )
        .state(
            "industry",
            StateNode::new().rule(
                TransitionRule::on(INDUSTRY_DONE, "bank_account")
                    .update(next(CompanyView::BankAccount)),
            ),
        )
        .state(
            "bank_account",
            StateNode::new().rule(
                TransitionRule::on(BANK_ACCOUNT_DONE, "employees")
                    .update(next(CompanyView::Employees)),
            ),
        )
        .state(
            "employees",
            StateNode::invoking(SubflowSpec::new(employees, employee_seed)).rule(
                TransitionRule::on(employee_onboarding::LIST_DONE, "pay_schedule")
                    .update(next(CompanyView::PaySchedule)),
            ),
        )
        .state(
            "pay_schedule",
            StateNode::new().rule(
                TransitionRule::on(PAY_SCHEDULE_DONE, "state_taxes")
                    .update(next(CompanyView::StateTaxes)),
            ),
        )
        .state(
            "state_taxes",
            StateNode::new().rule(
                TransitionRule::on(STATE_TAXES_DONE, "documents")
                    .update(next(CompanyView::Documents)),
            ),
        )
        .state(
            "documents",
            StateNode::invoking(SubflowSpec::new(signer, signer_seed))
                .rule(
                    TransitionRule::on(document_signer::DONE, "summary")
                        .when(all_signed)
                        .update(documents_signed)
                        .labelled("signed"),
                )
                .rule(
                    TransitionRule::on(document_signer::DONE, "documents")
                        .update(documents_pending)
                        .labelled("pending"),
                ),
        )
        .state("summary", StateNode::terminal())
        .strict()
        .build()
}

static DEFINITION: Lazy<Result<Arc<FlowDefinition<CompanyOnboardingContext>>, FlowError>> =
    Lazy::new(build);

pub fn definition() -> Result<Arc<FlowDefinition<CompanyOnboardingContext>>, FlowError> {
    DEFINITION.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use waypoint_core::FlowInstance;

    fn start() -> FlowInstance<CompanyOnboardingContext> {
        FlowInstance::start(definition().unwrap(), "co-1".to_string()).unwrap()
    }

    fn send_all(flow: &mut FlowInstance<CompanyOnboardingContext>, names: &[&str]) {
        for name in names {
            flow.deliver(FlowEvent::new(*name)).unwrap();
        }
    }

    #[test]
    fn test_employees_step_runs_employee_onboarding() {
        let mut flow = start();
        send_all(
            &mut flow,
            &[START, LOCATIONS_DONE, FEDERAL_TAXES_DONE, INDUSTRY_DONE, BANK_ACCOUNT_DONE],
        );

        assert_eq!(flow.state().as_str(), "employees");
        let child = flow.subflow().unwrap();
        assert_eq!(child.flow_id().as_str(), employee_onboarding::FLOW_ID);
        assert_eq!(child.current_state().as_str(), "list");

        send_all(&mut flow, &[employee_onboarding::LIST_DONE]);
        assert_eq!(flow.state().as_str(), "pay_schedule");
        assert!(flow.subflow().is_none());
    }

    #[test]
    fn test_unsigned_documents_restart_signer() {
        let mut flow = start();
        send_all(
            &mut flow,
            &[
                START,
                LOCATIONS_DONE,
                FEDERAL_TAXES_DONE,
                INDUSTRY_DONE,
                BANK_ACCOUNT_DONE,
                employee_onboarding::LIST_DONE,
                PAY_SCHEDULE_DONE,
                STATE_TAXES_DONE,
            ],
        );
        assert_eq!(flow.state().as_str(), "documents");
        let first = flow.subflow().unwrap().instance_id().clone();

        flow.deliver(document_signer::done(false)).unwrap();

        assert_eq!(flow.state().as_str(), "documents");
        let restarted = flow.subflow().unwrap();
        assert_ne!(restarted.instance_id(), &first);
        assert_eq!(restarted.current_state().as_str(), "document_list");

        flow.deliver(document_signer::done(true)).unwrap();
        assert!(flow.is_terminal());
        let ctx = flow.context();
        assert!(ctx.signed_all);
        assert_eq!(ctx.progress, Progress::at(STEPS, STEPS));
    }
}
