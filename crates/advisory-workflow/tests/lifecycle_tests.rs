//! A request walked through its whole life by the people who would move it

use advisory_estimation::EstimateTotals;
use advisory_model::{NewRequest, Profile, Request, RequestNumber, RequestStatus, Role, Title};
use advisory_workflow::{
    apply_transition, reassign, set_billability, ActorContext, Effect, FreezeInputs,
    TransitionContext, WorkflowError,
};
use chrono::Utc;
use pretty_assertions::assert_eq;

struct Cast {
    requestor: Profile,
    admin: Profile,
    consultant: Profile,
    lead: Profile,
}

impl Cast {
    fn new() -> Self {
        Self {
            requestor: Profile::new("Rita", "rita@example.com").with_title(Title::Stakeholder),
            admin: Profile::new("Ada", "ada@example.com").with_role(Role::Admin),
            consultant: Profile::new("Cy", "cy@example.com")
                .with_title(Title::AdvisoryConsultant)
                .with_rate(50.0),
            lead: Profile::new("Lee", "lee@example.com").with_title(Title::AdvisoryServiceLead),
        }
    }
}

fn step(request: &Request, who: &Profile, to: RequestStatus) -> Request {
    let actor = ActorContext::for_request(who, request);
    apply_transition(request, &actor, to, &TransitionContext::new(Utc::now()))
        .unwrap_or_else(|e| panic!("{} -> {to}: {e}", request.status))
        .request
}

#[test]
fn happy_path_to_closed() {
    let cast = Cast::new();
    let request = NewRequest::new("Review our procurement process")
        .with_service("svc-process")
        .submitted()
        .into_request(cast.requestor.id, RequestNumber::format(2024, 42), Utc::now())
        .unwrap();
    assert_eq!(request.status, RequestStatus::Submitted);

    let request = step(&request, &cast.admin, RequestStatus::InReview);
    let admin_actor = ActorContext::for_request(&cast.admin, &request);
    let request = reassign(&request, &admin_actor, &cast.consultant, Utc::now())
        .unwrap()
        .request;
    let request = step(&request, &cast.consultant, RequestStatus::Estimation);

    let actor = ActorContext::for_request(&cast.consultant, &request);
    let ctx = TransitionContext::new(Utc::now()).with_freeze(FreezeInputs::new(
        EstimateTotals::from_hours(38.0, 50.0, 8.0),
        Some(&cast.consultant),
    ));
    let outcome = apply_transition(&request, &actor, RequestStatus::Review, &ctx).unwrap();
    assert!(matches!(outcome.effects[0], Effect::EstimationFrozen(_)));
    let request = outcome.request;

    let actor = ActorContext::for_request(&cast.consultant, &request);
    let request = set_billability(&request, &actor, "50", Utc::now()).unwrap();
    let request = step(&request, &cast.consultant, RequestStatus::PendingReview);
    let request = step(&request, &cast.lead, RequestStatus::PendingReviewByAdvisoryHead);
    let request = step(&request, &cast.admin, RequestStatus::Approval);
    let request = step(&request, &cast.requestor, RequestStatus::Approved);
    let request = step(&request, &cast.consultant, RequestStatus::Implementing);
    let request = step(&request, &cast.consultant, RequestStatus::AwaitingFeedback);
    let request = step(&request, &cast.requestor, RequestStatus::FeedbackReceived);
    let request = step(&request, &cast.consultant, RequestStatus::Completed);

    let actor = ActorContext::for_request(&cast.consultant, &request);
    let outcome = apply_transition(
        &request,
        &actor,
        RequestStatus::Closed,
        &TransitionContext::new(Utc::now()),
    )
    .unwrap();
    let record = outcome.completion().cloned().unwrap();
    assert_eq!(record.assignee_id, Some(cast.consultant.id));
    assert_eq!(outcome.request.estimation.map(|s| s.total_hours), Some(38.0));
}

#[test]
fn sending_back_to_estimation_clears_billability_on_next_review() {
    let cast = Cast::new();
    let mut request = NewRequest::new("Tooling audit")
        .with_service("svc-tools")
        .into_request(cast.requestor.id, RequestNumber::format(2024, 7), Utc::now())
        .unwrap();
    request.status = RequestStatus::Review;
    request.assignee_id = Some(cast.consultant.id);

    let actor = ActorContext::for_request(&cast.consultant, &request);
    let request = set_billability(&request, &actor, "80", Utc::now()).unwrap();
    let request = step(&request, &cast.consultant, RequestStatus::Estimation);
    assert!(request.billability_percentage.is_some());

    let actor = ActorContext::for_request(&cast.consultant, &request);
    let ctx = TransitionContext::new(Utc::now()).with_freeze(FreezeInputs::new(
        EstimateTotals::from_hours(10.0, 50.0, 8.0),
        Some(&cast.consultant),
    ));
    let request = apply_transition(&request, &actor, RequestStatus::Review, &ctx)
        .unwrap()
        .request;
    assert_eq!(request.billability_percentage, None);

    let actor = ActorContext::for_request(&cast.consultant, &request);
    assert_eq!(
        apply_transition(
            &request,
            &actor,
            RequestStatus::PendingReview,
            &TransitionContext::new(Utc::now())
        )
        .unwrap_err(),
        WorkflowError::BillabilityRequired
    );
}

#[test]
fn rejected_transition_leaves_request_untouched() {
    let cast = Cast::new();
    let request = NewRequest::new("Anything")
        .with_service("svc")
        .submitted()
        .into_request(cast.requestor.id, RequestNumber::format(2024, 1), Utc::now())
        .unwrap();
    let before = request.clone();
    let actor = ActorContext::for_request(&cast.consultant, &request);
    assert!(apply_transition(
        &request,
        &actor,
        RequestStatus::InReview,
        &TransitionContext::new(Utc::now())
    )
    .is_err());
    assert_eq!(request, before);
}
