//! Request lists and dashboard figures
//!
//! Everything here is pure over already-fetched rows. Catalog names are
//! resolved through a [`CatalogMaps`] built from one catalog fetch per view.

use crate::backend::CatalogSet;
use advisory_estimation::{
    estimate_days_with, DayEstimate, EstimateTotals, EstimateView, HoursAggregator,
    SubActivityResolver,
};
use advisory_model::{
    AdvisoryTeamMember, AssigneeHistoryEntry, CatalogEntry, CatalogId, Profile, Request, RequestId, RequestNumber,
    RequestStatus, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Id → name lookups for one view
#[derive(Debug, Clone, Default)]
pub struct CatalogMaps {
    services: HashMap<CatalogId, String>,
    offerings: HashMap<CatalogId, String>,
    people: HashMap<UserId, Profile>,
    rates: HashMap<UserId, Option<f64>>,
}

impl CatalogMaps {
    /// Build from a catalog fetch and the visible profiles
    #[must_use]
    pub fn new(catalog: &CatalogSet, profiles: &[Profile]) -> Self {
        Self {
            services: catalog
                .services
                .iter()
                .map(|s| (s.id().clone(), s.name().to_string()))
                .collect(),
            offerings: catalog
                .offerings
                .iter()
                .map(|o| (o.id().clone(), o.name().to_string()))
                .collect(),
            people: profiles.iter().map(|p| (p.id, p.clone())).collect(),
            rates: HashMap::new(),
        }
    }

    /// Take hourly rates from the advisory team roster
    #[must_use]
    pub fn with_roster(mut self, roster: &[AdvisoryTeamMember]) -> Self {
        self.rates = roster
            .iter()
            .map(|m| (m.user_id, m.rate_per_hour))
            .collect();
        self
    }

    /// Service name, falling back to the raw id
    #[must_use]
    pub fn service_name(&self, id: &CatalogId) -> String {
        self.services.get(id).cloned().unwrap_or_else(|| id.to_string())
    }

    /// Offering/tool name, falling back to the raw id
    #[must_use]
    pub fn offering_name(&self, id: &CatalogId) -> String {
        self.offerings.get(id).cloned().unwrap_or_else(|| id.to_string())
    }

    /// Profile by id
    #[must_use]
    pub fn person(&self, id: UserId) -> Option<&Profile> {
        self.people.get(&id)
    }

    /// Display name, or "Unassigned"/"Unknown user"
    #[must_use]
    pub fn person_name(&self, id: Option<UserId>) -> String {
        match id {
            None => "Unassigned".to_string(),
            Some(id) => self
                .people
                .get(&id)
                .map_or_else(|| "Unknown user".to_string(), |p| p.full_name.clone()),
        }
    }

    /// Hourly rate of a person, 0 when unknown.
    ///
    /// A roster entry wins over the profile; people off the roster fall
    /// back to the rate on their profile.
    #[must_use]
    pub fn rate_of(&self, id: Option<UserId>) -> f64 {
        let Some(id) = id else { return 0.0 };
        match self.rates.get(&id) {
            Some(rate) => rate.unwrap_or(0.0),
            None => self
                .people
                .get(&id)
                .and_then(|p| p.rate_per_hour)
                .unwrap_or(0.0),
        }
    }
}

/// One row of a request list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSummary {
    /// Opaque id
    pub id: RequestId,
    /// Human-readable number
    pub request_number: RequestNumber,
    /// Current status
    pub status: RequestStatus,
    /// Owner
    pub requestor_id: UserId,
    /// Owner's name
    pub requestor_name: String,
    /// Current assignee
    pub assignee_id: Option<UserId>,
    /// Assignee's name
    pub assignee_name: String,
    /// Description
    pub description: String,
    /// Service names
    pub services: Vec<String>,
    /// Offering/tool names
    pub offerings: Vec<String>,
    /// Frozen or live totals
    pub estimate: EstimateView,
    /// Elapsed-day estimate
    pub days: DayEstimate,
    /// Submission time
    pub submission_date: DateTime<Utc>,
}

impl RequestSummary {
    /// Build a row; live totals use the current assignee's rate
    #[must_use]
    pub fn build<R: SubActivityResolver + ?Sized>(
        request: &Request,
        maps: &CatalogMaps,
        aggregator: &HoursAggregator<'_, R>,
    ) -> Self {
        let estimate = EstimateView::resolve(request, aggregator, maps.rate_of(request.assignee_id));
        let days = estimate_days_with(
            estimate.totals().total_hours,
            request.billability_percentage,
            aggregator.hours_per_day(),
        );
        Self {
            id: request.id,
            request_number: request.request_number.clone(),
            status: request.status,
            requestor_id: request.requestor_id,
            requestor_name: maps.person_name(Some(request.requestor_id)),
            assignee_id: request.assignee_id,
            assignee_name: maps.person_name(request.assignee_id),
            description: request.description.clone(),
            services: request
                .advisory_services
                .iter()
                .map(|id| maps.service_name(id))
                .collect(),
            offerings: request
                .service_offerings
                .iter()
                .map(|id| maps.offering_name(id))
                .collect(),
            estimate,
            days,
            submission_date: request.submission_date,
        }
    }
}

/// Requests owned by `user`
pub fn my_requests(requests: &[Request], user: UserId) -> impl Iterator<Item = &Request> {
    requests.iter().filter(move |r| r.is_requested_by(user))
}

/// Requests currently assigned to `user`
pub fn my_items(requests: &[Request], user: UserId) -> impl Iterator<Item = &Request> {
    requests.iter().filter(move |r| r.is_assigned_to(user))
}

/// Requests `user` was assigned to before, but is no longer
pub fn my_queue<'a>(
    requests: &'a [Request],
    ledger: &[AssigneeHistoryEntry],
    user: UserId,
) -> impl Iterator<Item = &'a Request> {
    let previously: HashSet<RequestId> = ledger
        .iter()
        .filter(|e| e.assignee_id == user)
        .map(|e| e.request_id)
        .collect();
    requests
        .iter()
        .filter(move |r| previously.contains(&r.id) && !r.is_assigned_to(user))
}

/// List filter; empty fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestFilter {
    /// Exact status
    pub status: Option<RequestStatus>,
    /// Owner
    pub requestor: Option<UserId>,
    /// Current assignee
    pub assignee: Option<UserId>,
    /// Case-insensitive text in number, description, names or services
    pub search: Option<String>,
}

impl RequestFilter {
    /// Match everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With status
    #[must_use]
    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// With requestor
    #[must_use]
    pub fn with_requestor(mut self, user: UserId) -> Self {
        self.requestor = Some(user);
        self
    }

    /// With assignee
    #[must_use]
    pub fn with_assignee(mut self, user: UserId) -> Self {
        self.assignee = Some(user);
        self
    }

    /// With search text
    #[must_use]
    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    /// Whether one row matches
    #[must_use]
    pub fn matches(&self, row: &RequestSummary) -> bool {
        if self.status.is_some_and(|s| s != row.status) {
            return false;
        }
        if self.requestor.is_some_and(|u| u != row.requestor_id) {
            return false;
        }
        if self.assignee.is_some() && self.assignee != row.assignee_id {
            return false;
        }
        let Some(needle) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
        else {
            return true;
        };
        [
            row.request_number.as_str(),
            row.description.as_str(),
            row.requestor_name.as_str(),
            row.assignee_name.as_str(),
        ]
        .into_iter()
        .chain(row.services.iter().map(String::as_str))
        .chain(row.offerings.iter().map(String::as_str))
        .any(|field| field.to_lowercase().contains(&needle))
    }

    /// Matching rows, newest submission first
    #[must_use]
    pub fn apply(&self, rows: Vec<RequestSummary>) -> Vec<RequestSummary> {
        let mut rows: Vec<_> = rows.into_iter().filter(|r| self.matches(r)).collect();
        rows.sort_by(|a, b| b.submission_date.cmp(&a.submission_date));
        rows
    }
}

/// Admin dashboard figures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Requests per status
    pub by_status: BTreeMap<RequestStatus, usize>,
    /// Requests not in a terminal status
    pub active: usize,
    /// Requests in a terminal status
    pub terminal: usize,
    /// Sum of displayed totals
    pub totals: EstimateTotals,
}

impl DashboardStats {
    /// Aggregate over list rows
    #[must_use]
    pub fn from_rows(rows: &[RequestSummary]) -> Self {
        let mut stats = Self::default();
        for row in rows {
            *stats.by_status.entry(row.status).or_default() += 1;
            if row.status.is_terminal() {
                stats.terminal += 1;
            } else {
                stats.active += 1;
            }
            let totals = row.estimate.totals();
            stats.totals.total_hours += totals.total_hours;
            stats.totals.total_pd += totals.total_pd;
            stats.totals.total_cost += totals.total_cost;
        }
        stats
    }

    /// Count for one status
    #[must_use]
    pub fn count(&self, status: RequestStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}
