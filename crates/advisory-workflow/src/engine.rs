//! Applying workflow operations to a request
//!
//! Operations are pure: they validate, then return an updated copy of the
//! request together with the append-only records the caller must persist.

use crate::actor::{ActorContext, Guard};
use crate::error::WorkflowError;
use crate::transitions::{requires_billability, validate_transition};
use advisory_estimation::EstimateTotals;
use advisory_model::{
    AdvisoryTeamMember, AssigneeHistoryEntry, BillabilityPercentage, CompletionRecord, EstimationSnapshot, Profile,
    RecordId, Request, RequestStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Live estimate and assignee details captured when an estimate is frozen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreezeInputs {
    /// Live totals at freeze time
    pub totals: EstimateTotals,
    /// Assignee's current hourly rate
    pub assignee_rate: f64,
    /// Assignee's current role/title label
    pub assignee_role: String,
}

impl FreezeInputs {
    /// Capture totals with rate and role taken from the assignee's profile
    #[must_use]
    pub fn new(totals: EstimateTotals, assignee: Option<&Profile>) -> Self {
        Self {
            totals,
            assignee_rate: assignee.and_then(|p| p.rate_per_hour).unwrap_or(0.0),
            assignee_role: assignee.map(Profile::role_label).unwrap_or_default(),
        }
    }

    /// Capture totals with the assignee's current roster entry
    #[must_use]
    pub fn from_roster(totals: EstimateTotals, member: &AdvisoryTeamMember) -> Self {
        Self {
            totals,
            assignee_rate: member.rate_per_hour.unwrap_or(0.0),
            assignee_role: member.title.to_string(),
        }
    }

    fn snapshot(&self, now: DateTime<Utc>) -> EstimationSnapshot {
        EstimationSnapshot {
            total_hours: self.totals.total_hours,
            total_pd: self.totals.total_pd,
            total_cost: self.totals.total_cost,
            assignee_rate: self.assignee_rate,
            assignee_role: self.assignee_role.clone(),
            saved_at: now,
        }
    }
}

/// Inputs a transition may need besides the request and actor
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionContext {
    /// Clock reading for timestamps
    pub now: DateTime<Utc>,
    /// Needed when leaving Estimation for Review
    pub freeze: Option<FreezeInputs>,
}

impl TransitionContext {
    /// Context with only a timestamp
    #[inline]
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now, freeze: None }
    }

    /// Attach live estimate data
    #[inline]
    #[must_use]
    pub fn with_freeze(mut self, freeze: FreezeInputs) -> Self {
        self.freeze = Some(freeze);
        self
    }
}

/// Side effect of a transition, for the caller to persist or announce
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Estimate snapshot written
    EstimationFrozen(EstimationSnapshot),
    /// Billability cleared for a new review cycle
    BillabilityReset,
    /// Terminal status entered; history row to append
    Completed(CompletionRecord),
}

/// Result of a successful transition
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    /// Updated request
    pub request: Request,
    /// Status before the transition
    pub from: RequestStatus,
    /// Side effects, in the order applied
    pub effects: Vec<Effect>,
}

impl TransitionOutcome {
    /// Completion record, when a terminal status was entered
    #[must_use]
    pub fn completion(&self) -> Option<&CompletionRecord> {
        self.effects.iter().find_map(|effect| match effect {
            Effect::Completed(record) => Some(record),
            _ => None,
        })
    }
}

/// Move `request` to `to` on behalf of `actor`.
///
/// # Errors
/// - `WorkflowError::IllegalTransition` / `WorkflowError::Unauthorized` from the table
/// - `WorkflowError::BillabilityRequired` when leaving Review without billability
/// - `WorkflowError::MissingEstimate` when leaving Estimation without freeze inputs
pub fn apply_transition(
    request: &Request,
    actor: &ActorContext,
    to: RequestStatus,
    ctx: &TransitionContext,
) -> Result<TransitionOutcome, WorkflowError> {
    let from = request.status;
    if let Err(e) = validate_transition(from, to, actor) {
        tracing::warn!(request = %request.request_number, %from, %to, actor = %actor.user_id, error = %e, "transition rejected");
        return Err(e);
    }
    if requires_billability(from, to) && request.billability_percentage.is_none() {
        return Err(WorkflowError::BillabilityRequired);
    }

    let mut updated = request.clone();
    let mut effects = Vec::new();
    updated.status = to;
    updated.touch(ctx.now);

    if from == RequestStatus::Estimation && to == RequestStatus::Review {
        let freeze = ctx.freeze.as_ref().ok_or(WorkflowError::MissingEstimate)?;
        let snapshot = freeze.snapshot(ctx.now);
        updated.estimation = Some(snapshot.clone());
        effects.push(Effect::EstimationFrozen(snapshot));
    }

    if to == RequestStatus::Review {
        updated.billability_percentage = None;
        effects.push(Effect::BillabilityReset);
    }

    if to.is_terminal() {
        effects.push(Effect::Completed(CompletionRecord {
            id: RecordId::new(),
            request_id: request.id,
            status: to,
            assignee_id: request.assignee_id,
            completed_at: ctx.now,
        }));
    }

    tracing::info!(request = %request.request_number, %from, %to, actor = %actor.user_id, "request status changed");
    Ok(TransitionOutcome {
        request: updated,
        from,
        effects,
    })
}

/// Explicitly re-save the estimate while still in Estimation.
///
/// This is the only way to replace an existing snapshot outside of the
/// Estimation → Review handover.
///
/// # Errors
/// - `WorkflowError::EstimationNotEditable` outside Estimation
/// - `WorkflowError::NotPermitted` for actors other than the assignee or an admin
pub fn save_estimation(
    request: &Request,
    actor: &ActorContext,
    freeze: &FreezeInputs,
    now: DateTime<Utc>,
) -> Result<Request, WorkflowError> {
    if request.status != RequestStatus::Estimation {
        return Err(WorkflowError::EstimationNotEditable {
            status: request.status,
        });
    }
    if !Guard::AssigneeOrAdmin.permits(actor) {
        return Err(WorkflowError::NotPermitted {
            action: "save the estimate",
            required: Guard::AssigneeOrAdmin,
        });
    }

    let mut updated = request.clone();
    updated.estimation = Some(freeze.snapshot(now));
    updated.touch(now);
    tracing::info!(request = %request.request_number, total_hours = freeze.totals.total_hours, "estimate saved");
    Ok(updated)
}

/// Set billability from raw form input.
///
/// # Errors
/// See [`set_billability_value`]; additionally rejects non-numeric input.
pub fn set_billability(
    request: &Request,
    actor: &ActorContext,
    raw: &str,
    now: DateTime<Utc>,
) -> Result<Request, WorkflowError> {
    check_billability_write(request, actor)?;
    let value: BillabilityPercentage = raw.parse()?;
    Ok(write_billability(request, value, now))
}

/// Set billability from an integer.
///
/// # Errors
/// - `WorkflowError::BillabilityNotEditable` outside Review
/// - `WorkflowError::NotAssignee` for anyone but the current assignee
/// - `WorkflowError::BillabilityAlreadySet` for a second write in the same cycle
/// - `WorkflowError::InvalidBillability` outside `[1, 100]`
pub fn set_billability_value(
    request: &Request,
    actor: &ActorContext,
    value: i64,
    now: DateTime<Utc>,
) -> Result<Request, WorkflowError> {
    check_billability_write(request, actor)?;
    let value = BillabilityPercentage::try_from(value)?;
    Ok(write_billability(request, value, now))
}

fn check_billability_write(request: &Request, actor: &ActorContext) -> Result<(), WorkflowError> {
    if request.status != RequestStatus::Review {
        return Err(WorkflowError::BillabilityNotEditable {
            status: request.status,
        });
    }
    if !request.is_assigned_to(actor.user_id) {
        return Err(WorkflowError::NotAssignee);
    }
    if let Some(existing) = request.billability_percentage {
        return Err(WorkflowError::BillabilityAlreadySet(existing));
    }
    Ok(())
}

fn write_billability(request: &Request, value: BillabilityPercentage, now: DateTime<Utc>) -> Request {
    let mut updated = request.clone();
    updated.billability_percentage = Some(value);
    updated.touch(now);
    tracing::info!(request = %request.request_number, billability = %value, "billability set");
    updated
}

/// Result of a reassignment
#[derive(Debug, Clone, PartialEq)]
pub struct ReassignOutcome {
    /// Updated request
    pub request: Request,
    /// Ledger row for the replaced assignee, if there was one
    pub ledger_entry: Option<AssigneeHistoryEntry>,
}

/// Hand the request to `new_assignee`.
///
/// `original_assignee_id` is written on the first assignment only. Replacing
/// an existing assignee yields exactly one ledger row for them.
///
/// # Errors
/// - `WorkflowError::NotPermitted` for non-admin actors
/// - `WorkflowError::RequestClosed` on terminal requests
/// - `WorkflowError::AssigneeInactive` / `WorkflowError::AlreadyAssigned`
pub fn reassign(
    request: &Request,
    actor: &ActorContext,
    new_assignee: &Profile,
    now: DateTime<Utc>,
) -> Result<ReassignOutcome, WorkflowError> {
    if !Guard::Admin.permits(actor) {
        return Err(WorkflowError::NotPermitted {
            action: "reassign requests",
            required: Guard::Admin,
        });
    }
    if request.status.is_terminal() {
        return Err(WorkflowError::RequestClosed {
            status: request.status,
        });
    }
    if !new_assignee.is_active {
        return Err(WorkflowError::AssigneeInactive);
    }
    if request.is_assigned_to(new_assignee.id) {
        return Err(WorkflowError::AlreadyAssigned);
    }

    let mut updated = request.clone();
    let ledger_entry = request.assignee_id.map(|previous| AssigneeHistoryEntry {
        id: RecordId::new(),
        request_id: request.id,
        assignee_id: previous,
        unassigned_at: now,
    });
    updated.assignee_id = Some(new_assignee.id);
    updated.original_assignee_id.get_or_insert(new_assignee.id);
    updated.touch(now);

    tracing::info!(
        request = %request.request_number,
        previous = ?request.assignee_id,
        assignee = %new_assignee.id,
        "request reassigned"
    );
    Ok(ReassignOutcome {
        request: updated,
        ledger_entry,
    })
}
