//! Advisory Workflow
//!
//! Request lifecycle rules:
//! - Which statuses may follow the current one, and who may move there
//! - Freezing the estimate when estimation is handed over for review
//! - The once-per-cycle billability write during Review
//! - Completion history on entry to a terminal status
//! - Reassignment with the original-assignee and history ledger rules
//!
//! Every operation takes the current request by reference and returns the
//! updated copy plus the records to persist. A rejected operation returns an
//! error and leaves the caller's request untouched.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod actor;
mod engine;
mod error;
mod transitions;

pub use actor::{ActorContext, Guard};
pub use engine::{
    apply_transition, reassign, save_estimation, set_billability, set_billability_value, Effect,
    FreezeInputs, ReassignOutcome, TransitionContext, TransitionOutcome,
};
pub use error::WorkflowError;
pub use transitions::{
    allowed_transitions, legal_next_states, next_states, requires_billability,
    validate_transition,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
