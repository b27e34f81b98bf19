//! Who is acting, and what a transition requires of them

use advisory_model::{Profile, Request, Role, Title, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Acting user, seen relative to one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    /// Acting user
    pub user_id: UserId,
    /// Access role
    pub role: Role,
    /// Job title
    pub title: Option<Title>,
    /// Current assignee of the request
    pub is_assignee: bool,
    /// Owner of the request
    pub is_requestor: bool,
}

impl ActorContext {
    /// Derive from the actor's profile and the request
    #[must_use]
    pub fn for_request(profile: &Profile, request: &Request) -> Self {
        Self {
            user_id: profile.id,
            role: profile.role,
            title: profile.title,
            is_assignee: request.is_assigned_to(profile.id),
            is_requestor: request.is_requested_by(profile.id),
        }
    }

    /// Admin role or the advisory head title
    #[inline]
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin || self.title == Some(Title::AdvisoryServiceHead)
    }

    /// Advisory service lead
    #[inline]
    #[must_use]
    pub fn is_lead(&self) -> bool {
        self.title == Some(Title::AdvisoryServiceLead)
    }
}

/// Privilege a transition edge requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Guard {
    /// Admin-equivalent actors only
    Admin,
    /// Current assignee or admin
    AssigneeOrAdmin,
    /// Request owner or admin
    RequestorOrAdmin,
    /// Service lead or admin
    LeadOrAdmin,
    /// Owner, assignee or admin
    Participant,
}

impl Guard {
    /// Whether `actor` satisfies the guard
    #[must_use]
    pub fn permits(self, actor: &ActorContext) -> bool {
        actor.is_admin()
            || match self {
                Self::Admin => false,
                Self::AssigneeOrAdmin => actor.is_assignee,
                Self::RequestorOrAdmin => actor.is_requestor,
                Self::LeadOrAdmin => actor.is_lead(),
                Self::Participant => actor.is_assignee || actor.is_requestor,
            }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Admin => "an admin",
            Self::AssigneeOrAdmin => "the assignee or an admin",
            Self::RequestorOrAdmin => "the requestor or an admin",
            Self::LeadOrAdmin => "a service lead or an admin",
            Self::Participant => "a participant on the request",
        };
        f.write_str(label)
    }
}
