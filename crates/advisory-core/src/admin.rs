//! Administration: catalogs, team roster and portal settings
//!
//! Every operation requires the admin role. Activities and sub-activities
//! are never deleted, only deactivated, so old selections keep resolving.

use crate::backend::{CatalogRecord, CatalogSet, PortalBackend};
use crate::error::{AuthError, PortalError, ValidationError};
use crate::validation::validate_email;
use advisory_model::{AdvisoryTeamMember, CatalogEntry, CatalogId, Profile, Role};
use std::sync::Arc;

/// Refuse anyone without the admin role
///
/// # Errors
/// `AuthError::AdminRequired`.
pub fn require_admin(actor: &Profile) -> Result<(), AuthError> {
    if actor.role == Role::Admin {
        Ok(())
    } else {
        Err(AuthError::AdminRequired)
    }
}

fn check_hours(hours: f64) -> Result<(), ValidationError> {
    if hours.is_finite() && hours >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidHours(hours))
    }
}

fn check_parent<'a, T: CatalogEntry + 'a>(
    rows: impl IntoIterator<Item = &'a T>,
    entity: &'static str,
    id: &CatalogId,
) -> Result<(), ValidationError> {
    if rows.into_iter().any(|row| row.id() == id) {
        Ok(())
    } else {
        Err(ValidationError::UnknownParent {
            entity,
            id: id.to_string(),
        })
    }
}

/// Field checks for a catalog row against the current catalog
///
/// # Errors
/// Empty name, invalid hours or an unknown parent.
pub fn validate_record(record: &CatalogRecord, catalog: &CatalogSet) -> Result<(), ValidationError> {
    let name = match record {
        CatalogRecord::Service(row) => row.name(),
        CatalogRecord::Offering(row) => row.name(),
        CatalogRecord::Activity(row) => row.name(),
        CatalogRecord::SubActivity(row) => row.name(),
        CatalogRecord::Dropdown(row) => row.name(),
    };
    if name.trim().is_empty() {
        return Err(ValidationError::Required("name"));
    }

    match record {
        CatalogRecord::Service(_) => Ok(()),
        CatalogRecord::Offering(row) => {
            check_parent(&catalog.services, "advisory service", &row.advisory_service_id)
        }
        CatalogRecord::Activity(row) => {
            check_hours(row.estimated_hours)?;
            check_parent(&catalog.offerings, "service offering", &row.service_offering_id)
        }
        CatalogRecord::SubActivity(row) => {
            check_hours(row.estimated_hours)?;
            check_parent(&catalog.activities, "activity", &row.activity_id)
        }
        CatalogRecord::Dropdown(row) if row.category.trim().is_empty() => {
            Err(ValidationError::Required("category"))
        }
        CatalogRecord::Dropdown(_) => Ok(()),
    }
}

/// Admin operations over the backend
#[derive(Clone)]
pub struct AdminService {
    backend: Arc<dyn PortalBackend>,
    team_email_key: String,
}

impl std::fmt::Debug for AdminService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminService")
            .field("team_email_key", &self.team_email_key)
            .finish_non_exhaustive()
    }
}

impl AdminService {
    /// Create a service; `team_email_key` names the settings row
    pub fn new(backend: Arc<dyn PortalBackend>, team_email_key: impl Into<String>) -> Self {
        Self {
            backend,
            team_email_key: team_email_key.into(),
        }
    }

    /// Create or update a catalog row
    ///
    /// # Errors
    /// Authorization, validation or backend failure.
    pub async fn save_catalog_entry(
        &self,
        actor: &Profile,
        record: CatalogRecord,
    ) -> Result<(), PortalError> {
        require_admin(actor)?;
        let catalog = self.backend.fetch_catalog().await?;
        validate_record(&record, &catalog)?;
        tracing::info!(table = record.table(), id = %record.id(), actor = %actor.id, "catalog row saved");
        self.backend.upsert_catalog(record).await?;
        Ok(())
    }

    /// Soft-delete an activity
    ///
    /// # Errors
    /// Authorization failure, unknown id or backend failure.
    pub async fn deactivate_activity(&self, actor: &Profile, id: &CatalogId) -> Result<(), PortalError> {
        require_admin(actor)?;
        let catalog = self.backend.fetch_catalog().await?;
        let mut row = catalog
            .activities
            .into_iter()
            .find(|a| &a.id == id)
            .ok_or_else(|| PortalError::not_found("activity", id))?;
        row.is_active = false;
        tracing::info!(activity = %id, actor = %actor.id, "activity deactivated");
        self.backend.upsert_catalog(CatalogRecord::Activity(row)).await?;
        Ok(())
    }

    /// Soft-delete a sub-activity
    ///
    /// # Errors
    /// Authorization failure, unknown id or backend failure.
    pub async fn deactivate_sub_activity(
        &self,
        actor: &Profile,
        id: &CatalogId,
    ) -> Result<(), PortalError> {
        require_admin(actor)?;
        let catalog = self.backend.fetch_catalog().await?;
        let mut row = catalog
            .sub_activities
            .into_iter()
            .find(|s| &s.id == id)
            .ok_or_else(|| PortalError::not_found("sub-activity", id))?;
        row.is_active = false;
        tracing::info!(sub_activity = %id, actor = %actor.id, "sub-activity deactivated");
        self.backend.upsert_catalog(CatalogRecord::SubActivity(row)).await?;
        Ok(())
    }

    /// Roster including hourly rates, ordered for display
    ///
    /// # Errors
    /// Authorization or backend failure.
    pub async fn team_members(&self, actor: &Profile) -> Result<Vec<AdvisoryTeamMember>, PortalError> {
        require_admin(actor)?;
        let mut members = self.backend.team_members().await?;
        members.sort_by(|a, b| a.display_order.cmp(&b.display_order).then_with(|| a.name.cmp(&b.name)));
        Ok(members)
    }

    /// Update a roster entry (title, rate, order, active flag)
    ///
    /// # Errors
    /// Authorization, validation or backend failure.
    pub async fn update_team_member(
        &self,
        actor: &Profile,
        member: AdvisoryTeamMember,
    ) -> Result<(), PortalError> {
        require_admin(actor)?;
        if member.name.trim().is_empty() {
            return Err(ValidationError::Required("name").into());
        }
        if let Some(rate) = member.rate_per_hour.filter(|r| !(r.is_finite() && *r >= 0.0)) {
            return Err(ValidationError::InvalidRate(rate).into());
        }
        tracing::info!(member = %member.user_id, actor = %actor.id, "team member updated");
        self.backend.update_team_member(member).await?;
        Ok(())
    }

    /// Team distribution e-mail, if configured
    ///
    /// # Errors
    /// Backend failure.
    pub async fn team_distribution_email(&self) -> Result<Option<String>, PortalError> {
        Ok(self.backend.get_setting(&self.team_email_key).await?)
    }

    /// Change the team distribution e-mail
    ///
    /// # Errors
    /// Authorization, validation or backend failure.
    pub async fn set_team_distribution_email(
        &self,
        actor: &Profile,
        email: &str,
    ) -> Result<(), PortalError> {
        require_admin(actor)?;
        validate_email(email)?;
        self.backend
            .set_setting(&self.team_email_key, email.trim())
            .await?;
        tracing::info!(actor = %actor.id, "team distribution email changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisory_model::{Activity, AdvisoryService, ServiceOffering, SubActivity};

    fn catalog() -> CatalogSet {
        CatalogSet {
            services: vec![AdvisoryService {
                id: "svc".into(),
                name: "Process".into(),
                display_order: 0,
                is_active: true,
            }],
            offerings: vec![ServiceOffering {
                id: "off".into(),
                advisory_service_id: "svc".into(),
                name: "Audit".into(),
                display_order: 0,
                is_active: true,
            }],
            ..CatalogSet::default()
        }
    }

    #[test]
    fn activity_needs_known_offering_and_sane_hours() {
        let mut activity = Activity {
            id: "act".into(),
            service_offering_id: "off".into(),
            name: "Interviews".into(),
            estimated_hours: 4.0,
            display_order: 0,
            is_active: true,
        };
        assert_eq!(
            validate_record(&CatalogRecord::Activity(activity.clone()), &catalog()),
            Ok(())
        );

        activity.estimated_hours = -1.0;
        assert_eq!(
            validate_record(&CatalogRecord::Activity(activity.clone()), &catalog()),
            Err(ValidationError::InvalidHours(-1.0))
        );

        activity.estimated_hours = 1.0;
        activity.service_offering_id = "ghost".into();
        assert!(matches!(
            validate_record(&CatalogRecord::Activity(activity), &catalog()),
            Err(ValidationError::UnknownParent { entity: "service offering", .. })
        ));
    }

    #[test]
    fn sub_activity_parent_is_an_activity() {
        let sub = SubActivity {
            id: "sub".into(),
            activity_id: "act".into(),
            name: "Prep".into(),
            estimated_hours: 1.0,
            display_order: 0,
            is_active: true,
        };
        assert!(validate_record(&CatalogRecord::SubActivity(sub), &catalog()).is_err());
    }

    #[test]
    fn only_admin_role_passes() {
        let head = Profile::new("Hal", "hal@example.com")
            .with_title(advisory_model::Title::AdvisoryServiceHead);
        assert_eq!(require_admin(&head), Err(AuthError::AdminRequired));
        let admin = Profile::new("Ada", "ada@example.com").with_role(Role::Admin);
        assert_eq!(require_admin(&admin), Ok(()));
    }
}
