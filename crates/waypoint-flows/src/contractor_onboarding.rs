//! Contractor onboarding
//!
//! ```text
//! list --CREATE--> profile --PROFILE_DONE[admin]--> address --> payment_method
//!                          --PROFILE_DONE[self]--> new_hire_report --> submit
//!
//! payment_method --> new_hire_report
//! ```

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use waypoint_core::{
    FlowContext, FlowDefinition, FlowError, FlowEvent, Progress, StateNode, TransitionRule,
};

pub const FLOW_ID: &str = "contractor_onboarding";

pub const CREATE: &str = "CONTRACTOR_CREATE";
pub const EDIT: &str = "CONTRACTOR_EDIT";
pub const CANCEL: &str = "CANCEL";
/// Profile saved; payload is [`ContractorSaved`]
pub const PROFILE_DONE: &str = "CONTRACTOR_PROFILE_DONE";
pub const ADDRESS_DONE: &str = "CONTRACTOR_ADDRESS_DONE";
pub const PAYMENT_METHOD_DONE: &str = "CONTRACTOR_PAYMENT_METHOD_DONE";
pub const NEW_HIRE_REPORT_DONE: &str = "CONTRACTOR_NEW_HIRE_REPORT_DONE";
/// Raised by the submit screen once the flow has ended; always bubbles
pub const SUBMIT: &str = "CONTRACTOR_SUBMIT";

const ADMIN_STEPS: u32 = 5;
const SELF_ONBOARDING_STEPS: u32 = 3;

/// Payload of [`PROFILE_DONE`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractorSaved {
    pub contractor_id: String,
    pub self_onboarding: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractorView {
    ContractorList,
    Profile { contractor_id: Option<String> },
    Address,
    PaymentMethod,
    NewHireReport,
    Submit,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContractorOnboardingContext {
    pub company_id: String,
    pub contractor_id: Option<String>,
    pub self_onboarding: bool,
    pub view: Option<ContractorView>,
    pub progress: Progress,
}

impl FlowContext for ContractorOnboardingContext {
    type View = ContractorView;
    /// Company the contractors belong to
    type Seed = String;

    fn current_view(&self) -> Option<&ContractorView> {
        self.view.as_ref()
    }
}

fn self_onboarding_is(expected: bool) -> impl Fn(&ContractorOnboardingContext, &FlowEvent) -> bool {
    move |_, event| event.payload.flag("self_onboarding") == Some(expected)
}

fn create(ctx: &ContractorOnboardingContext, _: &FlowEvent) -> ContractorOnboardingContext {
    ContractorOnboardingContext {
        contractor_id: None,
        view: Some(ContractorView::Profile { contractor_id: None }),
        progress: Progress::at(1, ADMIN_STEPS),
        ..ctx.clone()
    }
}

fn edit(
    ctx: &ContractorOnboardingContext,
    event: &FlowEvent,
) -> Result<ContractorOnboardingContext, FlowError> {
    let contractor_id = event
        .payload
        .str_field("contractor_id")
        .ok_or_else(|| FlowError::Payload(format!("'{}' needs a contractor_id", event.name)))?
        .to_string();
    Ok(ContractorOnboardingContext {
        contractor_id: Some(contractor_id.clone()),
        view: Some(ContractorView::Profile {
            contractor_id: Some(contractor_id),
        }),
        progress: Progress::at(1, ADMIN_STEPS),
        ..ctx.clone()
    })
}

fn back_to_list(ctx: &ContractorOnboardingContext, _: &FlowEvent) -> ContractorOnboardingContext {
    ContractorOnboardingContext {
        contractor_id: None,
        self_onboarding: false,
        view: Some(ContractorView::ContractorList),
        progress: Progress::new(ADMIN_STEPS),
        ..ctx.clone()
    }
}

fn saved(
    ctx: &ContractorOnboardingContext,
    event: &FlowEvent,
) -> Result<ContractorOnboardingContext, FlowError> {
    let ContractorSaved {
        contractor_id,
        self_onboarding,
    } = event.payload_as()?;

    let (view, total) = if self_onboarding {
        (ContractorView::NewHireReport, SELF_ONBOARDING_STEPS)
    } else {
        (ContractorView::Address, ADMIN_STEPS)
    };
    Ok(ContractorOnboardingContext {
        contractor_id: Some(contractor_id),
        self_onboarding,
        view: Some(view),
        progress: Progress::at(2, total),
        ..ctx.clone()
    })
}

fn next(
    view: ContractorView,
) -> impl Fn(&ContractorOnboardingContext, &FlowEvent) -> ContractorOnboardingContext {
    move |ctx, _| ContractorOnboardingContext {
        view: Some(view.clone()),
        progress: ctx.progress.advance(),
        ..ctx.clone()
    }
}

fn build() -> Result<Arc<FlowDefinition<ContractorOnboardingContext>>, FlowError> {
    FlowDefinition::builder(FLOW_ID)
        .name("Contractor onboarding")
        .context_factory(|company_id: String| ContractorOnboardingContext {
            company_id,
            view: Some(ContractorView::ContractorList),
            progress: Progress::new(ADMIN_STEPS),
            ..ContractorOnboardingContext::default()
        })
        .state(
            "list",
            StateNode::new()
                .rule(TransitionRule::on(CREATE, "profile").update(create))
                .rule(TransitionRule::on(EDIT, "profile").reduce(edit)),
        )
        .state(
            "profile",
            StateNode::new()
                .rule(
                    TransitionRule::on(PROFILE_DONE, "address")
                        .when(self_onboarding_is(false))
                        .reduce(saved),
                )
                .rule(
                    TransitionRule::on(PROFILE_DONE, "new_hire_report")
                        .when(self_onboarding_is(true))
                        .reduce(saved),
                )
                .rule(TransitionRule::on(CANCEL, "list").update(back_to_list)),
        )
        .state(
            "address",
            StateNode::new().rule(
                TransitionRule::on(ADDRESS_DONE, "payment_method")
                    .update(next(ContractorView::PaymentMethod)),
            ),
        )
        .state(
            "payment_method",
            StateNode::new().rule(
                TransitionRule::on(PAYMENT_METHOD_DONE, "new_hire_report")
                    .update(next(ContractorView::NewHireReport)),
            ),
        )
        .state(
            "new_hire_report",
            StateNode::new().rule(
                TransitionRule::on(NEW_HIRE_REPORT_DONE, "submit")
                    .update(next(ContractorView::Submit)),
            ),
        )
        .state("submit", StateNode::terminal())
        .strict()
        .build()
}

static DEFINITION: Lazy<Result<Arc<FlowDefinition<ContractorOnboardingContext>>, FlowError>> =
    Lazy::new(build);

/// The contractor onboarding graph
pub fn definition() -> Result<Arc<FlowDefinition<ContractorOnboardingContext>>, FlowError> {
    DEFINITION.clone()
}
