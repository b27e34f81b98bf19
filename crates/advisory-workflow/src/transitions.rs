//! Status transition table and the guard on each edge

use crate::actor::{ActorContext, Guard};
use crate::error::WorkflowError;
use advisory_model::RequestStatus;

/// Outgoing edges of `from`, each with the privilege it needs.
///
/// Terminal statuses have no edges.
#[must_use]
pub fn allowed_transitions(from: RequestStatus) -> &'static [(RequestStatus, Guard)] {
    use Guard::*;
    use RequestStatus::*;
    match from {
        New => &[(Submitted, RequestorOrAdmin), (Cancelled, RequestorOrAdmin)],
        Submitted => &[
            (InReview, Admin),
            (Rejected, Admin),
            (Cancelled, RequestorOrAdmin),
        ],
        InReview => &[
            (Estimation, AssigneeOrAdmin),
            (UnderDiscussion, AssigneeOrAdmin),
            (OnHold, Admin),
            (Rejected, Admin),
        ],
        UnderDiscussion => &[
            (InReview, AssigneeOrAdmin),
            (Estimation, AssigneeOrAdmin),
            (Rejected, Admin),
            (Cancelled, RequestorOrAdmin),
        ],
        Estimation => &[
            (Review, AssigneeOrAdmin),
            (UnderDiscussion, AssigneeOrAdmin),
            (OnHold, Admin),
        ],
        Review => &[(PendingReview, AssigneeOrAdmin), (Estimation, AssigneeOrAdmin)],
        PendingReview => &[
            (PendingReviewByAdvisoryHead, LeadOrAdmin),
            (Estimation, LeadOrAdmin),
            (Rejected, Admin),
        ],
        PendingReviewByAdvisoryHead => &[
            (Approval, Admin),
            (Approved, Admin),
            (Estimation, Admin),
            (Rejected, Admin),
        ],
        Approval => &[
            (Approved, RequestorOrAdmin),
            (UnderDiscussion, RequestorOrAdmin),
            (Rejected, RequestorOrAdmin),
        ],
        Approved => &[
            (Implementing, AssigneeOrAdmin),
            (OnHold, Admin),
            (Cancelled, Admin),
        ],
        Implementing => &[
            (AwaitingFeedback, AssigneeOrAdmin),
            (Completed, AssigneeOrAdmin),
            (Implemented, AssigneeOrAdmin),
            (OnHold, Admin),
        ],
        AwaitingFeedback => &[(FeedbackReceived, Participant), (Implementing, AssigneeOrAdmin)],
        FeedbackReceived => &[
            (Implementing, AssigneeOrAdmin),
            (Completed, AssigneeOrAdmin),
            (Implemented, AssigneeOrAdmin),
        ],
        Completed => &[(Implemented, AssigneeOrAdmin), (Closed, AssigneeOrAdmin)],
        OnHold => &[
            (InReview, Admin),
            (Estimation, Admin),
            (Implementing, Admin),
            (Cancelled, Admin),
        ],
        Implemented | Rejected | Cancelled | Closed => &[],
    }
}

/// Every status reachable from `from`, regardless of actor
#[must_use]
pub fn next_states(from: RequestStatus) -> Vec<RequestStatus> {
    allowed_transitions(from).iter().map(|(to, _)| *to).collect()
}

/// Statuses `actor` may move the request to from `from`
#[must_use]
pub fn legal_next_states(from: RequestStatus, actor: &ActorContext) -> Vec<RequestStatus> {
    allowed_transitions(from)
        .iter()
        .filter(|(_, guard)| guard.permits(actor))
        .map(|(to, _)| *to)
        .collect()
}

/// Handing a review on needs the assignee's billability percentage
#[inline]
#[must_use]
pub fn requires_billability(from: RequestStatus, to: RequestStatus) -> bool {
    from == RequestStatus::Review && to == RequestStatus::PendingReview
}

/// Check an edge exists and `actor` may take it.
///
/// # Errors
/// - `WorkflowError::IllegalTransition` if `to` is not reachable from `from`
/// - `WorkflowError::Unauthorized` if the edge's guard rejects `actor`
pub fn validate_transition(
    from: RequestStatus,
    to: RequestStatus,
    actor: &ActorContext,
) -> Result<(), WorkflowError> {
    let Some((_, guard)) = allowed_transitions(from).iter().find(|(s, _)| *s == to) else {
        return Err(WorkflowError::IllegalTransition { from, to });
    };
    if guard.permits(actor) {
        Ok(())
    } else {
        Err(WorkflowError::Unauthorized {
            from,
            to,
            required: *guard,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisory_model::{Role, Title, UserId};

    fn consultant(is_assignee: bool) -> ActorContext {
        ActorContext {
            user_id: UserId::new(),
            role: Role::StandardUser,
            title: Some(Title::AdvisoryConsultant),
            is_assignee,
            is_requestor: false,
        }
    }

    #[test]
    fn terminal_statuses_have_no_exits() {
        for status in RequestStatus::ALL {
            assert_eq!(
                status.is_terminal(),
                allowed_transitions(status).is_empty(),
                "{status}"
            );
        }
    }

    #[test]
    fn no_self_loops() {
        for status in RequestStatus::ALL {
            assert!(!next_states(status).contains(&status), "{status}");
        }
    }

    #[test]
    fn assignee_moves_estimation_to_review() {
        assert!(validate_transition(
            RequestStatus::Estimation,
            RequestStatus::Review,
            &consultant(true)
        )
        .is_ok());
    }

    #[test]
    fn non_assignee_is_unauthorized_not_illegal() {
        assert_eq!(
            validate_transition(
                RequestStatus::Review,
                RequestStatus::PendingReview,
                &consultant(false)
            ),
            Err(WorkflowError::Unauthorized {
                from: RequestStatus::Review,
                to: RequestStatus::PendingReview,
                required: Guard::AssigneeOrAdmin,
            })
        );
    }

    #[test]
    fn skipping_ahead_is_illegal() {
        assert!(matches!(
            validate_transition(
                RequestStatus::Submitted,
                RequestStatus::Implemented,
                &consultant(true)
            ),
            Err(WorkflowError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn consultant_options_in_review() {
        assert_eq!(
            legal_next_states(RequestStatus::Review, &consultant(true)),
            vec![RequestStatus::PendingReview, RequestStatus::Estimation]
        );
        assert!(legal_next_states(RequestStatus::Review, &consultant(false)).is_empty());
    }

    #[test]
    fn only_review_handover_needs_billability() {
        let count = RequestStatus::ALL
            .iter()
            .flat_map(|from| next_states(*from).into_iter().map(move |to| (*from, to)))
            .filter(|(from, to)| requires_billability(*from, *to))
            .count();
        assert_eq!(count, 1);
    }
}
