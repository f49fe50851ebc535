//! Interactive connection creation flow.

pub mod session;
pub mod types;

pub use session::WizardSession;
pub use types::{ValidateOutcome, WizardStep};
