//! Testing utilities for the advisory workspace
//!
//! Shared in-memory backend, auth provider and fixtures.

#![allow(missing_docs)]

mod memory;

pub use memory::{InMemoryAuth, InMemoryBackend};

use advisory_core::{CatalogSet, PortalConfig, RequestService};
use advisory_model::{
    Activity, AdvisoryService, AdvisoryTeamMember, LegacySelection, NewRequest, Profile, Request,
    RequestNumber, RequestStatus, Role, ServiceOffering, SubActivity, Title,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

/// Everyone who takes part in a request's life
#[derive(Debug, Clone)]
pub struct Cast {
    pub requestor: Profile,
    pub admin: Profile,
    pub consultant: Profile,
    pub second_consultant: Profile,
    pub lead: Profile,
    pub head: Profile,
}

impl Cast {
    pub fn new() -> Self {
        Self {
            requestor: Profile::new("Rita Requestor", "rita@example.com")
                .with_title(Title::Stakeholder),
            admin: Profile::new("Ada Admin", "ada@example.com").with_role(Role::Admin),
            consultant: Profile::new("Cy Consultant", "cy@example.com")
                .with_title(Title::AdvisoryConsultant)
                .with_rate(50.0),
            second_consultant: Profile::new("Dee Consultant", "dee@example.com")
                .with_title(Title::AdvisoryConsultant)
                .with_rate(80.0),
            lead: Profile::new("Lee Lead", "lee@example.com")
                .with_title(Title::AdvisoryServiceLead)
                .with_rate(90.0),
            head: Profile::new("Hal Head", "hal@example.com")
                .with_title(Title::AdvisoryServiceHead),
        }
    }

    pub fn everyone(&self) -> [&Profile; 6] {
        [
            &self.requestor,
            &self.admin,
            &self.consultant,
            &self.second_consultant,
            &self.lead,
            &self.head,
        ]
    }
}

impl Default for Cast {
    fn default() -> Self {
        Self::new()
    }
}

/// One service, one offering, `act1` (10h) with `sub1` (5h)
pub fn sample_catalog() -> CatalogSet {
    CatalogSet {
        services: vec![AdvisoryService {
            id: "svc-process".into(),
            name: "Process Advisory".into(),
            display_order: 1,
            is_active: true,
        }],
        offerings: vec![ServiceOffering {
            id: "off-audit".into(),
            advisory_service_id: "svc-process".into(),
            name: "Process Audit".into(),
            display_order: 1,
            is_active: true,
        }],
        activities: vec![Activity {
            id: "act1".into(),
            service_offering_id: "off-audit".into(),
            name: "Stakeholder interviews".into(),
            estimated_hours: 10.0,
            display_order: 1,
            is_active: true,
        }],
        sub_activities: vec![SubActivity {
            id: "sub1".into(),
            activity_id: "act1".into(),
            name: "Interview prep".into(),
            estimated_hours: 5.0,
            display_order: 1,
            is_active: true,
        }],
        dropdowns: Vec::new(),
    }
}

/// `act1` at 10h with a bare `true` for `sub1`
pub fn sample_selection() -> LegacySelection {
    LegacySelection::from_value(&json!({
        "act1": { "selected": true, "estimated_hours": 10, "subActivities": { "sub1": true } }
    }))
}

/// Request owned by `requestor` in `status`, carrying [`sample_selection`]
pub fn request_in(requestor: &Profile, status: RequestStatus, sequence: u32) -> Request {
    let mut request = NewRequest::new(format!("Sample request {sequence}"))
        .with_service("svc-process")
        .with_offering("off-audit")
        .submitted()
        .into_request(requestor.id, RequestNumber::format(2024, sequence), Utc::now())
        .unwrap();
    request.status = status;
    request.selected_activities = Some(sample_selection());
    request
}

fn team_member(profile: &Profile, order: i32) -> Option<AdvisoryTeamMember> {
    Some(AdvisoryTeamMember {
        user_id: profile.id,
        name: profile.full_name.clone(),
        title: profile.title?,
        rate_per_hour: profile.rate_per_hour,
        display_order: order,
        is_active: profile.is_active,
    })
}

/// Backend holding the cast, their roster entries and [`sample_catalog`]
pub fn seeded_backend(cast: &Cast) -> Arc<InMemoryBackend> {
    let backend = Arc::new(InMemoryBackend::new());
    for (order, profile) in cast.everyone().into_iter().enumerate() {
        backend.add_profile(profile.clone());
        if let Some(member) = team_member(profile, i32::try_from(order).unwrap_or(i32::MAX)) {
            backend.add_team_member(member);
        }
    }
    backend.set_catalog(sample_catalog());
    backend
}

/// Request service over [`seeded_backend`]
pub fn setup_service(cast: &Cast) -> (Arc<InMemoryBackend>, RequestService) {
    let backend = seeded_backend(cast);
    let service = RequestService::new(backend.clone(), PortalConfig::new());
    (backend, service)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_backend_has_roster_for_titled_people() {
        let cast = Cast::new();
        let backend = seeded_backend(&cast);
        assert_eq!(backend.catalog().sub_activities.len(), 1);
        assert!(!sample_selection().is_empty());
    }
}
