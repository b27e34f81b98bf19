//! Backend boundary
//!
//! Persistence, authentication and row-level authorization live in an
//! external service. The portal talks to it only through these traits;
//! every call is a single attempt and the last write wins.

use crate::error::{AuthError, BackendError};
use advisory_estimation::CatalogSnapshot;
use advisory_model::{
    Activity, AdvisoryService, AdvisoryTeamMember, AssigneeHistoryEntry, CatalogEntry, CatalogId,
    Comment, CompletionRecord, DropdownValue, Profile, RequestId, RequestRow, ServiceOffering,
    SubActivity, UserId,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Every catalog table, fetched together once per view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSet {
    /// Advisory services
    pub services: Vec<AdvisoryService>,
    /// Offerings/tools
    pub offerings: Vec<ServiceOffering>,
    /// Activities
    pub activities: Vec<Activity>,
    /// Sub-activities
    pub sub_activities: Vec<SubActivity>,
    /// Dropdown options
    pub dropdowns: Vec<DropdownValue>,
}

impl CatalogSet {
    /// Hours lookup for bare `true` sub-activities.
    ///
    /// Inactive rows are kept so historical selections still resolve.
    #[must_use]
    pub fn sub_activity_hours(&self) -> CatalogSnapshot {
        CatalogSnapshot::from_sub_activities(&self.sub_activities)
    }

    /// Active dropdown options of one category, in display order
    #[must_use]
    pub fn dropdown(&self, category: &str) -> Vec<&DropdownValue> {
        let mut values: Vec<_> = self
            .dropdowns
            .iter()
            .filter(|v| v.category == category && v.is_active)
            .collect();
        values.sort_by_key(|v| v.display_order);
        values
    }
}

/// One catalog row, for create/update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "table", content = "row", rename_all = "snake_case")]
pub enum CatalogRecord {
    /// `advisory_services`
    Service(AdvisoryService),
    /// `service_offerings`
    Offering(ServiceOffering),
    /// `activities`
    Activity(Activity),
    /// `sub_activities`
    SubActivity(SubActivity),
    /// `dropdown_values`
    Dropdown(DropdownValue),
}

impl CatalogRecord {
    /// Row id
    #[must_use]
    pub fn id(&self) -> &CatalogId {
        match self {
            Self::Service(row) => row.id(),
            Self::Offering(row) => row.id(),
            Self::Activity(row) => row.id(),
            Self::SubActivity(row) => row.id(),
            Self::Dropdown(row) => row.id(),
        }
    }

    /// Table label for logs and errors
    #[must_use]
    pub fn table(&self) -> &'static str {
        match self {
            Self::Service(_) => "advisory service",
            Self::Offering(_) => "service offering",
            Self::Activity(_) => "activity",
            Self::SubActivity(_) => "sub-activity",
            Self::Dropdown(_) => "dropdown value",
        }
    }
}

/// Authenticated session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Signed-in user
    pub user_id: UserId,
    /// Login e-mail
    pub email: String,
}

/// Data access to the hosted backend
#[async_trait]
pub trait PortalBackend: Send + Sync {
    /// All request rows visible to the caller
    async fn list_requests(&self) -> Result<Vec<RequestRow>, BackendError>;

    /// One request row
    async fn fetch_request(&self, id: RequestId) -> Result<Option<RequestRow>, BackendError>;

    /// Insert a new request row
    async fn insert_request(&self, row: RequestRow) -> Result<(), BackendError>;

    /// Overwrite a request row
    async fn update_request(&self, row: RequestRow) -> Result<(), BackendError>;

    /// Requests submitted in `year`, for numbering
    async fn count_requests_in_year(&self, year: i32) -> Result<u32, BackendError>;

    /// Comments on a request, oldest first
    async fn list_comments(&self, request_id: RequestId) -> Result<Vec<Comment>, BackendError>;

    /// Append a comment
    async fn insert_comment(&self, comment: Comment) -> Result<(), BackendError>;

    /// Every catalog table
    async fn fetch_catalog(&self) -> Result<CatalogSet, BackendError>;

    /// Create or replace a catalog row
    async fn upsert_catalog(&self, record: CatalogRecord) -> Result<(), BackendError>;

    /// One profile
    async fn fetch_profile(&self, id: UserId) -> Result<Option<Profile>, BackendError>;

    /// Every profile visible to the caller
    async fn list_profiles(&self) -> Result<Vec<Profile>, BackendError>;

    /// Privileged roster call; includes hourly rates
    async fn team_members(&self) -> Result<Vec<AdvisoryTeamMember>, BackendError>;

    /// Privileged roster update
    async fn update_team_member(&self, member: AdvisoryTeamMember) -> Result<(), BackendError>;

    /// Append to the assignee-history ledger
    async fn append_assignee_history(
        &self,
        entry: AssigneeHistoryEntry,
    ) -> Result<(), BackendError>;

    /// Entire assignee-history ledger
    async fn assignee_history(&self) -> Result<Vec<AssigneeHistoryEntry>, BackendError>;

    /// Append a completion record
    async fn append_completion(&self, record: CompletionRecord) -> Result<(), BackendError>;

    /// Completion records for a request
    async fn completions(&self, request_id: RequestId)
        -> Result<Vec<CompletionRecord>, BackendError>;

    /// Read an admin setting
    async fn get_setting(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Write an admin setting
    async fn set_setting(&self, key: &str, value: &str) -> Result<(), BackendError>;
}

/// Hosted authentication
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Password sign-in
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Create an account
    async fn sign_up(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError>;

    /// Current session, if any
    async fn session(&self) -> Result<Option<Session>, AuthError>;

    /// End the session
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Send a password-reset e-mail
    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError>;

    /// Change the signed-in user's password
    async fn update_password(&self, new_password: &str) -> Result<(), AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dropdown(id: &str, category: &str, order: i32, active: bool) -> DropdownValue {
        DropdownValue {
            id: CatalogId::new(id),
            category: category.to_string(),
            name: id.to_uppercase(),
            display_order: order,
            is_active: active,
        }
    }

    #[test]
    fn dropdown_filters_and_sorts() {
        let catalog = CatalogSet {
            dropdowns: vec![
                dropdown("b", "business_unit", 2, true),
                dropdown("a", "business_unit", 1, true),
                dropdown("x", "business_unit", 0, false),
                dropdown("r", "region", 0, true),
            ],
            ..CatalogSet::default()
        };
        let names: Vec<_> = catalog
            .dropdown("business_unit")
            .into_iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[test]
    fn record_serializes_with_table_tag() {
        let record = CatalogRecord::Dropdown(dropdown("a", "region", 0, true));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["table"], "dropdown");
        assert_eq!(record.table(), "dropdown value");
    }
}
