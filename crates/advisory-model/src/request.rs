//! Requests and their append-only companions

use crate::error::ModelError;
use crate::ids::{CatalogId, RecordId, RequestId, RequestNumber, UserId};
use crate::selection::{LegacySelection, MultiOfferingSelection};
use crate::status::RequestStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Share of the assignee's day billed to a request, validated to `[1, 100]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct BillabilityPercentage(u8);

impl BillabilityPercentage {
    /// Lowest accepted value
    pub const MIN: u8 = 1;
    /// Highest accepted value
    pub const MAX: u8 = 100;

    /// Percentage as integer
    #[inline]
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    /// Percentage as a fraction in `(0, 1]`
    #[inline]
    #[must_use]
    pub fn fraction(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl TryFrom<i64> for BillabilityPercentage {
    type Error = ModelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(ModelError::BillabilityOutOfRange(value))
    }
}

impl FromStr for BillabilityPercentage {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| ModelError::BillabilityNotNumeric(s.to_string()))?;
        Self::try_from(value)
    }
}

impl From<BillabilityPercentage> for u8 {
    fn from(value: BillabilityPercentage) -> Self {
        value.0
    }
}

impl fmt::Display for BillabilityPercentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Frozen estimate; once present it is authoritative over live activity data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationSnapshot {
    /// Hours at freeze time
    pub total_hours: f64,
    /// Person-days at freeze time
    pub total_pd: f64,
    /// Cost at freeze time
    pub total_cost: f64,
    /// Assignee hourly rate at freeze time
    pub assignee_rate: f64,
    /// Assignee role/title label at freeze time
    pub assignee_role: String,
    /// Freeze timestamp
    pub saved_at: DateTime<Utc>,
}

/// Per-day completion flags keyed by sub-activity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimesheetData(pub BTreeMap<CatalogId, BTreeMap<NaiveDate, bool>>);

impl TimesheetData {
    /// Record completion for one day
    pub fn mark(&mut self, sub_activity: CatalogId, day: NaiveDate, completed: bool) {
        self.0.entry(sub_activity).or_default().insert(day, completed);
    }

    /// Whether a day is marked complete
    #[must_use]
    pub fn is_complete(&self, sub_activity: &str, day: NaiveDate) -> bool {
        self.0
            .get(sub_activity)
            .and_then(|days| days.get(&day))
            .copied()
            .unwrap_or(false)
    }

    /// Number of completed days for a sub-activity
    #[must_use]
    pub fn completed_days(&self, sub_activity: &str) -> usize {
        self.0
            .get(sub_activity)
            .map_or(0, |days| days.values().filter(|done| **done).count())
    }
}

/// Advisory service request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Opaque id
    pub id: RequestId,
    /// Human-readable number
    pub request_number: RequestNumber,
    /// Owner, immutable
    pub requestor_id: UserId,
    /// Current assignee
    pub assignee_id: Option<UserId>,
    /// First assignee ever, set once
    pub original_assignee_id: Option<UserId>,
    /// Lifecycle status
    pub status: RequestStatus,
    /// Free-text description
    pub description: String,
    /// Selected advisory services
    pub advisory_services: BTreeSet<CatalogId>,
    /// Selected offerings/tools
    pub service_offerings: BTreeSet<CatalogId>,
    /// Free-form project details
    pub project_data: Map<String, Value>,
    /// Free-form service-specific answers
    pub service_specific_data: Map<String, Value>,
    /// Single-offering selection
    pub selected_activities: Option<LegacySelection>,
    /// Multi-offering selection
    pub service_offering_activities: Option<MultiOfferingSelection>,
    /// Frozen estimate, absent while estimates are live
    pub estimation: Option<EstimationSnapshot>,
    /// Set by the assignee during Review
    pub billability_percentage: Option<BillabilityPercentage>,
    /// Execution tracking
    pub timesheet_data: TimesheetData,
    /// Immutable submission time
    pub submission_date: DateTime<Utc>,
    /// Bumped on every mutation
    pub updated_at: DateTime<Utc>,
}

impl Request {
    /// Whether `user` owns the request
    #[inline]
    #[must_use]
    pub fn is_requested_by(&self, user: UserId) -> bool {
        self.requestor_id == user
    }

    /// Whether `user` is the current assignee
    #[inline]
    #[must_use]
    pub fn is_assigned_to(&self, user: UserId) -> bool {
        self.assignee_id == Some(user)
    }

    /// Whether the estimate is frozen
    #[inline]
    #[must_use]
    pub fn is_estimation_frozen(&self) -> bool {
        self.estimation.is_some()
    }

    /// Bump `updated_at`
    #[inline]
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// Submission form contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRequest {
    /// Free-text description
    pub description: String,
    /// Selected advisory services
    pub advisory_services: BTreeSet<CatalogId>,
    /// Selected offerings/tools
    #[serde(default)]
    pub service_offerings: BTreeSet<CatalogId>,
    /// Free-form project details
    #[serde(default)]
    pub project_data: Map<String, Value>,
    /// Free-form service-specific answers
    #[serde(default)]
    pub service_specific_data: Map<String, Value>,
    /// Submit immediately instead of saving as New
    #[serde(default)]
    pub submit: bool,
}

impl NewRequest {
    /// Create a form with a description
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Add an advisory service
    #[must_use]
    pub fn with_service(mut self, id: impl Into<CatalogId>) -> Self {
        self.advisory_services.insert(id.into());
        self
    }

    /// Add an offering/tool
    #[must_use]
    pub fn with_offering(mut self, id: impl Into<CatalogId>) -> Self {
        self.service_offerings.insert(id.into());
        self
    }

    /// Submit right away
    #[must_use]
    pub fn submitted(mut self) -> Self {
        self.submit = true;
        self
    }

    /// Field checks done before any backend call
    ///
    /// # Errors
    /// `ModelError::MissingField` for an empty description or no service.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.description.trim().is_empty() {
            return Err(ModelError::MissingField {
                field: "description",
            });
        }
        if self.advisory_services.is_empty() {
            return Err(ModelError::MissingField {
                field: "advisory service",
            });
        }
        Ok(())
    }

    /// Build the request row for insertion
    ///
    /// # Errors
    /// Same as [`validate`](Self::validate).
    pub fn into_request(
        self,
        requestor_id: UserId,
        request_number: RequestNumber,
        now: DateTime<Utc>,
    ) -> Result<Request, ModelError> {
        self.validate()?;
        Ok(Request {
            id: RequestId::new(),
            request_number,
            requestor_id,
            assignee_id: None,
            original_assignee_id: None,
            status: if self.submit {
                RequestStatus::Submitted
            } else {
                RequestStatus::New
            },
            description: self.description.trim().to_string(),
            advisory_services: self.advisory_services,
            service_offerings: self.service_offerings,
            project_data: self.project_data,
            service_specific_data: self.service_specific_data,
            selected_activities: None,
            service_offering_activities: None,
            estimation: None,
            billability_percentage: None,
            timesheet_data: TimesheetData::default(),
            submission_date: now,
            updated_at: now,
        })
    }
}

/// Request as stored by the backend (flat `saved_*` columns)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRow {
    /// Opaque id
    pub id: RequestId,
    /// Human-readable number
    pub request_id: RequestNumber,
    /// Owner
    pub requestor_id: UserId,
    /// Current assignee
    #[serde(default)]
    pub assignee_id: Option<UserId>,
    /// First assignee
    #[serde(default)]
    pub original_assignee_id: Option<UserId>,
    /// Lifecycle status
    pub status: RequestStatus,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Advisory service ids
    #[serde(default)]
    pub selected_advisory_services: Vec<CatalogId>,
    /// Offering/tool ids
    #[serde(default)]
    pub selected_tools: Vec<CatalogId>,
    /// Free-form project details
    #[serde(default)]
    pub project_data: Option<Value>,
    /// Free-form service answers
    #[serde(default)]
    pub service_specific_data: Option<Value>,
    /// Single-offering selection
    #[serde(default)]
    pub selected_activities: Option<LegacySelection>,
    /// Multi-offering selection
    #[serde(default)]
    pub service_offering_activities: Option<MultiOfferingSelection>,
    /// Frozen hours
    #[serde(default)]
    pub saved_total_hours: Option<f64>,
    /// Frozen person-days
    #[serde(default)]
    pub saved_total_pd_estimate: Option<f64>,
    /// Frozen cost
    #[serde(default)]
    pub saved_total_cost: Option<f64>,
    /// Frozen rate
    #[serde(default)]
    pub saved_assignee_rate: Option<f64>,
    /// Frozen role label
    #[serde(default)]
    pub saved_assignee_role: Option<String>,
    /// Freeze timestamp; null means live estimates
    #[serde(default)]
    pub estimation_saved_at: Option<DateTime<Utc>>,
    /// Raw billability column
    #[serde(default)]
    pub billability_percentage: Option<i64>,
    /// Timesheet column
    #[serde(default)]
    pub timesheet_data: Option<TimesheetData>,
    /// Submission time
    pub submission_date: DateTime<Utc>,
    /// Last mutation
    pub updated_at: DateTime<Utc>,
}

fn into_object(value: Option<Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

impl TryFrom<RequestRow> for Request {
    type Error = ModelError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        // 0 is how an unset percentage is stored
        let billability_percentage = row
            .billability_percentage
            .filter(|raw| *raw != 0)
            .map(BillabilityPercentage::try_from)
            .transpose()
            .map_err(|e| ModelError::InconsistentRow {
                status: row.status,
                reason: e.to_string(),
            })?;

        let estimation = row.estimation_saved_at.map(|saved_at| EstimationSnapshot {
            total_hours: row.saved_total_hours.unwrap_or(0.0),
            total_pd: row.saved_total_pd_estimate.unwrap_or(0.0),
            total_cost: row.saved_total_cost.unwrap_or(0.0),
            assignee_rate: row.saved_assignee_rate.unwrap_or(0.0),
            assignee_role: row.saved_assignee_role.clone().unwrap_or_default(),
            saved_at,
        });

        Ok(Self {
            id: row.id,
            request_number: row.request_id,
            requestor_id: row.requestor_id,
            assignee_id: row.assignee_id,
            original_assignee_id: row.original_assignee_id,
            status: row.status,
            description: row.description.unwrap_or_default(),
            advisory_services: row.selected_advisory_services.into_iter().collect(),
            service_offerings: row.selected_tools.into_iter().collect(),
            project_data: into_object(row.project_data),
            service_specific_data: into_object(row.service_specific_data),
            selected_activities: row.selected_activities,
            service_offering_activities: row.service_offering_activities,
            estimation,
            billability_percentage,
            timesheet_data: row.timesheet_data.unwrap_or_default(),
            submission_date: row.submission_date,
            updated_at: row.updated_at,
        })
    }
}

impl From<&Request> for RequestRow {
    fn from(request: &Request) -> Self {
        let snapshot = request.estimation.as_ref();
        Self {
            id: request.id,
            request_id: request.request_number.clone(),
            requestor_id: request.requestor_id,
            assignee_id: request.assignee_id,
            original_assignee_id: request.original_assignee_id,
            status: request.status,
            description: Some(request.description.clone()),
            selected_advisory_services: request.advisory_services.iter().cloned().collect(),
            selected_tools: request.service_offerings.iter().cloned().collect(),
            project_data: Some(Value::Object(request.project_data.clone())),
            service_specific_data: Some(Value::Object(request.service_specific_data.clone())),
            selected_activities: request.selected_activities.clone(),
            service_offering_activities: request.service_offering_activities.clone(),
            saved_total_hours: snapshot.map(|s| s.total_hours),
            saved_total_pd_estimate: snapshot.map(|s| s.total_pd),
            saved_total_cost: snapshot.map(|s| s.total_cost),
            saved_assignee_rate: snapshot.map(|s| s.assignee_rate),
            saved_assignee_role: snapshot.map(|s| s.assignee_role.clone()),
            estimation_saved_at: snapshot.map(|s| s.saved_at),
            billability_percentage: request.billability_percentage.map(|b| i64::from(b.get())),
            timesheet_data: Some(request.timesheet_data.clone()),
            submission_date: request.submission_date,
            updated_at: request.updated_at,
        }
    }
}

/// Comment on a request; immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Row id
    pub id: RecordId,
    /// Request commented on
    pub request_id: RequestId,
    /// Author
    pub author_id: UserId,
    /// Text
    pub body: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Create a comment
    ///
    /// # Errors
    /// `ModelError::MissingField` for an empty body.
    pub fn new(
        request_id: RequestId,
        author_id: UserId,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ModelError> {
        let body = body.into();
        if body.trim().is_empty() {
            return Err(ModelError::MissingField { field: "comment" });
        }
        Ok(Self {
            id: RecordId::new(),
            request_id,
            author_id,
            body,
            created_at: now,
        })
    }
}

/// Ledger row written when an assignee is replaced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssigneeHistoryEntry {
    /// Row id
    pub id: RecordId,
    /// Request reassigned
    pub request_id: RequestId,
    /// The assignee that was replaced
    pub assignee_id: UserId,
    /// When they were replaced
    pub unassigned_at: DateTime<Utc>,
}

/// History row written on entry to a terminal status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    /// Row id
    pub id: RecordId,
    /// Request completed
    pub request_id: RequestId,
    /// Terminal status entered
    pub status: RequestStatus,
    /// Assignee at completion time
    pub assignee_id: Option<UserId>,
    /// Completion time
    pub completed_at: DateTime<Utc>,
}
