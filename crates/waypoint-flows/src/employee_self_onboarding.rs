//! Onboarding completed by the employee, ending with document signing

use crate::document_signer::{self, SignerContext};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use waypoint_core::{
    FlowContext, FlowDefinition, FlowError, FlowEvent, Progress, StateNode, SubflowSpec,
    TransitionRule,
};

pub const FLOW_ID: &str = "employee_self_onboarding";

pub const START: &str = "SELF_ONBOARDING_START";
pub const PROFILE_DONE: &str = "SELF_ONBOARDING_PROFILE_DONE";
pub const FEDERAL_TAXES_DONE: &str = "SELF_ONBOARDING_FEDERAL_TAXES_DONE";
pub const STATE_TAXES_DONE: &str = "SELF_ONBOARDING_STATE_TAXES_DONE";
pub const PAYMENT_METHOD_DONE: &str = "SELF_ONBOARDING_PAYMENT_METHOD_DONE";

const STEPS: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelfOnboardingView {
    Landing,
    Profile,
    FederalTaxes,
    StateTaxes,
    PaymentMethod,
    Documents,
    Summary,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelfOnboardingSeed {
    pub company_id: String,
    pub employee_id: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelfOnboardingContext {
    pub company_id: String,
    pub employee_id: String,
    pub view: Option<SelfOnboardingView>,
    pub documents_signed: bool,
    pub progress: Progress,
}

impl FlowContext for SelfOnboardingContext {
    type View = SelfOnboardingView;
    type Seed = SelfOnboardingSeed;

    fn current_view(&self) -> Option<&SelfOnboardingView> {
        self.view.as_ref()
    }
}

fn next(
    view: SelfOnboardingView,
) -> impl Fn(&SelfOnboardingContext, &FlowEvent) -> SelfOnboardingContext {
    move |ctx, _| SelfOnboardingContext {
        view: Some(view.clone()),
        progress: ctx.progress.advance(),
        ..ctx.clone()
    }
}

fn documents_finished(ctx: &SelfOnboardingContext, event: &FlowEvent) -> SelfOnboardingContext {
    SelfOnboardingContext {
        view: Some(SelfOnboardingView::Summary),
        documents_signed: event.payload.flag("signed_all").unwrap_or(false),
        progress: ctx.progress.advance(),
        ..ctx.clone()
    }
}

fn signer_seed(ctx: &SelfOnboardingContext) -> String {
    ctx.employee_id.clone()
}

fn build() -> Result<Arc<FlowDefinition<SelfOnboardingContext>>, FlowError> {
    let signer: Arc<FlowDefinition<SignerContext>> = document_signer::definition()?;

    FlowDefinition::builder(FLOW_ID)
        .name("Employee self-onboarding")
        .context_factory(|seed: SelfOnboardingSeed| SelfOnboardingContext {
            company_id: seed.company_id,
            employee_id: seed.employee_id,
            view: Some(SelfOnboardingView::Landing),
            documents_signed: false,
            progress: Progress::new(STEPS),
        })
        .state(
            "landing",
            StateNode::new().rule(
                TransitionRule::on(START, "profile").update(next(SelfOnboardingView::Profile)),
            ),
        )
        .state(
            "profile",
            StateNode::new().rule(
                TransitionRule::on(PROFILE_DONE, "federal_taxes")
                    .update(next(SelfOnboardingView::FederalTaxes)),
            ),
        )
        .state(
            "federal_taxes",
            StateNode::new().rule(
                TransitionRule::on(FEDERAL_TAXES_DONE, "state_taxes")
                    .update(next(SelfOnboardingView::StateTaxes)),
            ),
        )
        .state(
            "state_taxes",
            StateNode::new().rule(
                TransitionRule::on(STATE_TAXES_DONE, "payment_method")
                    .update(next(SelfOnboardingView::PaymentMethod)),
            ),
        )
        .state(
            "payment_method",
            StateNode::new().rule(
                TransitionRule::on(PAYMENT_METHOD_DONE, "documents")
                    .update(next(SelfOnboardingView::Documents)),
            ),
        )
        .state(
            "documents",
            StateNode::invoking(SubflowSpec::new(signer, signer_seed))
                .rule(
                    TransitionRule::on(document_signer::DONE, "summary").update(documents_finished),
                ),
        )
        .state("summary", StateNode::terminal())
        .strict()
        .build()
}

static DEFINITION: Lazy<Result<Arc<FlowDefinition<SelfOnboardingContext>>, FlowError>> =
    Lazy::new(build);

pub fn definition() -> Result<Arc<FlowDefinition<SelfOnboardingContext>>, FlowError> {
    DEFINITION.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use waypoint_core::{downcast_nested, FlowInstance};

    fn at_documents() -> FlowInstance<SelfOnboardingContext> {
        let seed = SelfOnboardingSeed {
            company_id: "co-1".to_string(),
            employee_id: "emp-7".to_string(),
        };
        let mut flow = FlowInstance::start(definition().unwrap(), seed).unwrap();
        for name in [
            START,
            PROFILE_DONE,
            FEDERAL_TAXES_DONE,
            STATE_TAXES_DONE,
            PAYMENT_METHOD_DONE,
        ] {
            flow.deliver(FlowEvent::new(name)).unwrap();
        }
        flow
    }

    #[test]
    fn test_documents_step_runs_signer_for_employee() {
        let flow = at_documents();

        assert_eq!(flow.state().as_str(), "documents");
        let child = downcast_nested::<SignerContext>(flow.subflow().unwrap()).unwrap();
        assert_eq!(child.context().signatory_id, "emp-7");
    }

    #[test]
    fn test_signing_completes_onboarding() {
        let mut flow = at_documents();

        flow.deliver(FlowEvent::with_payload(document_signer::SIGN, json!({"document_id": "w4"})))
            .unwrap();
        flow.deliver(FlowEvent::with_payload(document_signer::SIGNED, json!({"document_id": "w4"})))
            .unwrap();
        flow.deliver(document_signer::done(true)).unwrap();

        assert!(flow.is_terminal());
        assert!(flow.subflow().is_none());
        let ctx = flow.context();
        assert!(ctx.documents_signed);
        assert!(ctx.progress.is_last());
    }
}
