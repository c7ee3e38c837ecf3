/// Context contract
pub mod context;

/// Lifecycle journal
pub mod events;

/// Flow definition and builder
pub mod flow_definition;

/// Flow instance and dispatch
pub mod flow_instance;

/// Transition rules and state nodes
pub mod transition;

/// Load-time graph validation
pub mod validation;
