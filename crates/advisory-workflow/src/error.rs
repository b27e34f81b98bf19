//! Workflow errors

use crate::actor::Guard;
use advisory_model::{BillabilityPercentage, ModelError, RequestStatus};

/// Reasons a workflow operation is refused
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorkflowError {
    /// Target status is not reachable from the current one
    #[error("cannot move a request from {from} to {to}")]
    IllegalTransition {
        /// Current status
        from: RequestStatus,
        /// Requested status
        to: RequestStatus,
    },

    /// Reachable, but not by this actor
    #[error("only {required} can move a request from {from} to {to}")]
    Unauthorized {
        /// Current status
        from: RequestStatus,
        /// Requested status
        to: RequestStatus,
        /// Privilege the edge needs
        required: Guard,
    },

    /// Action other than a status change is not allowed for this actor
    #[error("only {required} can {action}")]
    NotPermitted {
        /// What was attempted
        action: &'static str,
        /// Privilege needed
        required: Guard,
    },

    /// Review cannot be handed on without a billability percentage
    #[error("set the billability percentage before submitting the review")]
    BillabilityRequired,

    /// Billability input failed validation
    #[error(transparent)]
    InvalidBillability(#[from] ModelError),

    /// Billability was already set in this estimation cycle
    #[error("billability is already set to {0} for this review")]
    BillabilityAlreadySet(BillabilityPercentage),

    /// Only the current assignee may set billability
    #[error("only the assigned consultant can set billability")]
    NotAssignee,

    /// Billability can only be set during Review
    #[error("billability can only be set while the request is in Review (currently {status})")]
    BillabilityNotEditable {
        /// Current status
        status: RequestStatus,
    },

    /// Estimation can only be saved during Estimation
    #[error("estimates can only be saved while the request is in Estimation (currently {status})")]
    EstimationNotEditable {
        /// Current status
        status: RequestStatus,
    },

    /// Timesheets are only kept while the work is being delivered
    #[error("the timesheet can only be updated during implementation (currently {status})")]
    TimesheetNotEditable {
        /// Current status
        status: RequestStatus,
    },

    /// Freezing needs live totals that the caller did not supply
    #[error("no live estimate supplied for freezing")]
    MissingEstimate,

    /// Request is in a terminal status
    #[error("request is {status} and can no longer change")]
    RequestClosed {
        /// Terminal status
        status: RequestStatus,
    },

    /// Reassignment target is already the assignee
    #[error("request is already assigned to this consultant")]
    AlreadyAssigned,

    /// Reassignment target is deactivated
    #[error("cannot assign a deactivated team member")]
    AssigneeInactive,
}

impl WorkflowError {
    /// Input validation failure, as opposed to an authorization or state problem
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidBillability(_) | Self::BillabilityRequired | Self::MissingEstimate
        )
    }

    /// Actor lacks the privilege
    #[inline]
    #[must_use]
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. } | Self::NotPermitted { .. } | Self::NotAssignee
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_statuses() {
        let err = WorkflowError::IllegalTransition {
            from: RequestStatus::New,
            to: RequestStatus::Implemented,
        };
        assert_eq!(err.to_string(), "cannot move a request from New to Implemented");

        let err = WorkflowError::Unauthorized {
            from: RequestStatus::Review,
            to: RequestStatus::PendingReview,
            required: Guard::AssigneeOrAdmin,
        };
        assert!(err.to_string().contains("the assignee or an admin"));
        assert!(err.is_authorization());
    }

    #[test]
    fn billability_model_errors_are_validation() {
        let err = WorkflowError::from(ModelError::BillabilityOutOfRange(101));
        assert!(err.is_validation());
        assert!(!err.is_authorization());
    }
}
