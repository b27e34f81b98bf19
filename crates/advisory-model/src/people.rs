//! Profiles, roles and titles

use crate::ids::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Access role stored on the profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Portal administrator
    #[serde(rename = "Admin")]
    Admin,
    /// Everyone else
    #[serde(rename = "Standard User")]
    StandardUser,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("Admin"),
            Self::StandardUser => f.write_str("Standard User"),
        }
    }
}

/// Job title of an advisory team member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Title {
    /// Estimates and delivers requests
    #[serde(rename = "Advisory Consultant")]
    AdvisoryConsultant,
    /// Reviews estimates before the head
    #[serde(rename = "Advisory Service Lead")]
    AdvisoryServiceLead,
    /// Admin-equivalent for workflow purposes
    #[serde(rename = "Advisory Service Head")]
    AdvisoryServiceHead,
    /// Business-side participant
    #[serde(rename = "Stakeholder")]
    Stakeholder,
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::AdvisoryConsultant => "Advisory Consultant",
            Self::AdvisoryServiceLead => "Advisory Service Lead",
            Self::AdvisoryServiceHead => "Advisory Service Head",
            Self::Stakeholder => "Stakeholder",
        };
        f.write_str(label)
    }
}

/// User profile as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile id (same as the auth user id)
    pub id: UserId,
    /// Display name
    pub full_name: String,
    /// Login e-mail
    pub email: String,
    /// Access role
    pub role: Role,
    /// Job title, absent for plain requestors
    #[serde(default)]
    pub title: Option<Title>,
    /// Hourly rate used for cost estimates
    #[serde(default)]
    pub rate_per_hour: Option<f64>,
    /// Deactivated profiles keep their history but cannot be assigned
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl Profile {
    /// Create an active standard user without a title
    pub fn new(full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            full_name: full_name.into(),
            email: email.into(),
            role: Role::StandardUser,
            title: None,
            rate_per_hour: None,
            is_active: true,
        }
    }

    /// Set role
    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Set title
    #[must_use]
    pub fn with_title(mut self, title: Title) -> Self {
        self.title = Some(title);
        self
    }

    /// Set hourly rate
    #[must_use]
    pub fn with_rate(mut self, rate_per_hour: f64) -> Self {
        self.rate_per_hour = Some(rate_per_hour);
        self
    }

    /// Admin role or the advisory head title
    #[inline]
    #[must_use]
    pub fn is_admin_equivalent(&self) -> bool {
        self.role == Role::Admin || self.title == Some(Title::AdvisoryServiceHead)
    }

    /// Label recorded in the estimation snapshot
    #[must_use]
    pub fn role_label(&self) -> String {
        self.title
            .map_or_else(|| self.role.to_string(), |title| title.to_string())
    }
}

/// Advisory team roster entry, including fields only the privileged RPC returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryTeamMember {
    /// Profile behind the roster entry
    pub user_id: UserId,
    /// Display name
    pub name: String,
    /// Job title
    pub title: Title,
    /// Hourly rate (sensitive)
    #[serde(default)]
    pub rate_per_hour: Option<f64>,
    /// Roster ordering
    #[serde(default)]
    pub display_order: i32,
    /// Soft-delete flag
    #[serde(default = "default_true")]
    pub is_active: bool,
}
