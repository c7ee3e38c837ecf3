//! Document signing, run on its own or as a sub-flow of the onboarding flows
//!
//! ```text
//! document_list --SIGN--> sign_form --SIGNED/BACK--> document_list --DONE--> done
//! ```
//!
//! The `DONE` event is what a parent flow sees when signing finishes. Its
//! payload carries `signed_all`, which parents branch on.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use waypoint_core::{
    FlowContext, FlowDefinition, FlowError, FlowEvent, Progress, StateNode, TransitionRule,
};

/// Flow id
pub const FLOW_ID: &str = "document_signer";

/// A document was picked from the list
pub const SIGN: &str = "SIGN";
/// The open document was signed
pub const SIGNED: &str = "SIGNED";
/// The sign form was closed without signing
pub const BACK: &str = "BACK";
/// Signing is over; payload is [`DonePayload`]
pub const DONE: &str = "DONE";

/// Payload of [`SIGN`] and [`SIGNED`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPayload {
    pub document_id: String,
}

/// Payload of [`DONE`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonePayload {
    pub signed_all: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignerView {
    DocumentList,
    SignForm { document_id: String },
    Done,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignerContext {
    /// Company or employee whose documents are listed
    pub signatory_id: String,
    pub view: Option<SignerView>,
    pub signed: Vec<String>,
    pub signed_all: bool,
    pub progress: Progress,
}

impl FlowContext for SignerContext {
    type View = SignerView;
    type Seed = String;

    fn current_view(&self) -> Option<&SignerView> {
        self.view.as_ref()
    }
}

fn open_form(ctx: &SignerContext, event: &FlowEvent) -> Result<SignerContext, FlowError> {
    let DocumentPayload { document_id } = event.payload_as()?;
    Ok(SignerContext {
        view: Some(SignerView::SignForm { document_id }),
        progress: Progress::at(2, 2),
        ..ctx.clone()
    })
}

fn record_signature(ctx: &SignerContext, event: &FlowEvent) -> Result<SignerContext, FlowError> {
    let DocumentPayload { document_id } = event.payload_as()?;
    let mut signed = ctx.signed.clone();
    if !signed.contains(&document_id) {
        signed.push(document_id);
    }
    Ok(SignerContext {
        view: Some(SignerView::DocumentList),
        signed,
        progress: Progress::at(1, 2),
        ..ctx.clone()
    })
}

fn back_to_list(ctx: &SignerContext, _: &FlowEvent) -> SignerContext {
    SignerContext {
        view: Some(SignerView::DocumentList),
        progress: Progress::at(1, 2),
        ..ctx.clone()
    }
}

fn finish(ctx: &SignerContext, event: &FlowEvent) -> Result<SignerContext, FlowError> {
    let DonePayload { signed_all } = event.payload_as()?;
    Ok(SignerContext {
        view: Some(SignerView::Done),
        signed_all,
        ..ctx.clone()
    })
}

fn build() -> Result<Arc<FlowDefinition<SignerContext>>, FlowError> {
    FlowDefinition::builder(FLOW_ID)
        .name("Document signer")
        .description("Lists outstanding documents and collects signatures")
        .context_factory(|signatory_id: String| SignerContext {
            signatory_id,
            view: Some(SignerView::DocumentList),
            progress: Progress::at(1, 2),
            ..SignerContext::default()
        })
        .state(
            "document_list",
            StateNode::new()
                .rule(TransitionRule::on(SIGN, "sign_form").reduce(open_form))
                .rule(TransitionRule::on(DONE, "done").reduce(finish)),
        )
        .state(
            "sign_form",
            StateNode::new()
                .rule(TransitionRule::on(SIGNED, "document_list").reduce(record_signature))
                .rule(TransitionRule::on(BACK, "document_list").update(back_to_list)),
        )
        .state("done", StateNode::terminal())
        .strict()
        .build()
}

static DEFINITION: Lazy<Result<Arc<FlowDefinition<SignerContext>>, FlowError>> = Lazy::new(build);

/// The document signing graph
pub fn definition() -> Result<Arc<FlowDefinition<SignerContext>>, FlowError> {
    DEFINITION.clone()
}

/// The final event a signing view emits
pub fn done(signed_all: bool) -> FlowEvent {
    FlowEvent::with_payload(DONE, serde_json::json!({ "signed_all": signed_all }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use waypoint_core::{Delivery, FlowInstance};

    fn start() -> FlowInstance<SignerContext> {
        FlowInstance::start(definition().unwrap(), "emp-1".to_string()).unwrap()
    }

    #[test]
    fn test_sign_documents_then_finish() {
        let mut flow = start();

        flow.dispatch(FlowEvent::with_payload(SIGN, json!({"document_id": "i9"})))
            .unwrap();
        assert_eq!(
            flow.current_view(),
            Some(&SignerView::SignForm {
                document_id: "i9".to_string()
            })
        );

        flow.dispatch(FlowEvent::with_payload(SIGNED, json!({"document_id": "i9"})))
            .unwrap();
        let delivery = flow.deliver(done(true)).unwrap();

        assert_matches!(
            delivery,
            Delivery::Completed { ref event, .. } if event.payload.flag("signed_all") == Some(true)
        );
        let ctx = flow.context();
        assert_eq!(ctx.signed, vec!["i9".to_string()]);
        assert!(ctx.signed_all);
        assert!(flow.is_terminal());
    }

    #[test]
    fn test_back_keeps_signatures() {
        let mut flow = start();
        flow.dispatch(FlowEvent::with_payload(SIGN, json!({"document_id": "w4"})))
            .unwrap();
        flow.dispatch(FlowEvent::new(BACK)).unwrap();

        assert_eq!(flow.state().as_str(), "document_list");
        assert!(flow.context().signed.is_empty());
    }

    #[test]
    fn test_malformed_payload_keeps_state() {
        let mut flow = start();

        let err = flow.dispatch(FlowEvent::new(DONE)).unwrap_err();

        assert_matches!(err, FlowError::Reducer { .. });
        assert_eq!(flow.state().as_str(), "document_list");
    }
}
