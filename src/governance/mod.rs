//! Governance: operation gating rules and explicit operator actions.

pub mod actions;
pub mod evaluator;

pub use actions::GovernanceActions;
pub use evaluator::{
    evaluate, GateState, GovernancePolicy, GovernanceReport, KindHealth, OperationClass,
};
