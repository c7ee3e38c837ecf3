//! Flow graphs for onboarding, payroll and document signing
//!
//! Every module exposes its event names as constants, the payload shapes
//! its reducers expect, a context type with a `View` enum, and a
//! `definition()` that builds and validates the graph once per process.
//!

pub mod company_onboarding;
pub mod contractor_onboarding;
pub mod document_signer;
pub mod employee_onboarding;
pub mod employee_self_onboarding;
pub mod payroll;

/// Lookup of the bundled flows by id
pub mod catalog {
    use crate::{
        company_onboarding, contractor_onboarding, document_signer, employee_onboarding,
        employee_self_onboarding, payroll,
    };
    use serde::Serialize;
    use std::sync::Arc;
    use tracing::info;
    use waypoint_core::{FlowContext, FlowDefinition, FlowError};

    /// Ids of every bundled flow
    pub const FLOW_IDS: [&str; 6] = [
        crate::company_onboarding::FLOW_ID,
        crate::contractor_onboarding::FLOW_ID,
        crate::document_signer::FLOW_ID,
        crate::employee_onboarding::FLOW_ID,
        crate::employee_self_onboarding::FLOW_ID,
        crate::payroll::FLOW_ID,
    ];

    /// Shape of a flow graph, independent of its context type
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct FlowSummary {
        pub id: String,
        pub name: String,
        pub initial_state: String,
        pub states: Vec<String>,
        pub terminal_states: Vec<String>,
        /// Child flow ids, keyed by the invoking state
        pub subflows: Vec<(String, String)>,
    }

    fn summarize<C: FlowContext>(definition: Arc<FlowDefinition<C>>) -> FlowSummary {
        FlowSummary {
            id: definition.id().to_string(),
            name: definition.name().to_string(),
            initial_state: definition.initial_state().to_string(),
            states: definition.states().map(|(name, _)| name.to_string()).collect(),
            terminal_states: definition
                .terminal_states()
                .into_iter()
                .map(ToString::to_string)
                .collect(),
            subflows: definition
                .states()
                .filter_map(|(name, node)| {
                    node.subflow()
                        .map(|spec| (name.to_string(), spec.child_flow().to_string()))
                })
                .collect(),
        }
    }

    /// Describe a bundled flow by id
    pub fn describe(flow_id: &str) -> Result<FlowSummary, FlowError> {
        match flow_id {
            company_onboarding::FLOW_ID => company_onboarding::definition().map(summarize),
            contractor_onboarding::FLOW_ID => contractor_onboarding::definition().map(summarize),
            document_signer::FLOW_ID => document_signer::definition().map(summarize),
            employee_onboarding::FLOW_ID => employee_onboarding::definition().map(summarize),
            employee_self_onboarding::FLOW_ID => {
                employee_self_onboarding::definition().map(summarize)
            }
            payroll::FLOW_ID => payroll::definition().map(summarize),
            _ => Err(FlowError::Other(format!("Unknown flow: {}", flow_id))),
        }
    }

    /// Build every bundled flow, failing on the first invalid graph
    ///
    /// Hosts call this at startup so a broken graph stops the process
    /// before any user reaches it.
    pub fn validate_all() -> Result<Vec<FlowSummary>, FlowError> {
        let summaries = FLOW_IDS
            .iter()
            .map(|id| describe(id))
            .collect::<Result<Vec<_>, _>>()?;
        info!(flows = summaries.len(), "Bundled flows validated");
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::catalog::{describe, validate_all, FLOW_IDS};
    use waypoint_core::FlowError;

    #[test]
    fn test_every_bundled_flow_is_valid() {
        let summaries = validate_all().unwrap();
        assert_eq!(summaries.len(), FLOW_IDS.len());
        assert!(summaries.iter().all(|s| !s.terminal_states.is_empty()));
    }

    #[test]
    fn test_describe() {
        let company = describe("company_onboarding").unwrap();
        assert_eq!(company.initial_state, "overview");
        assert_eq!(
            company.subflows,
            vec![
                ("employees".to_string(), "employee_onboarding".to_string()),
                ("documents".to_string(), "document_signer".to_string()),
            ]
        );

        assert!(matches!(describe("Unknown"), Err(FlowError::Other(_))));
    }
}
