//! Advisory Model
//!
//! Data model shared by every layer of the advisory portal:
//! - Requests and their estimation snapshot
//! - Statuses, roles and titles
//! - Service catalogs (services, offerings, activities, sub-activities)
//! - Activity selections in both stored shapes, plus the normalized form
//! - Append-only records (comments, assignee history, completions)
//!
//! # Example
//!
//! ```rust,ignore
//! use advisory_model::{LegacySelection, NormalizedSelection};
//!
//! let raw = serde_json::json!({
//!     "act1": { "selected": true, "estimated_hours": 10, "subActivities": { "sub1": true } }
//! });
//! let selection = LegacySelection::from_value(&raw);
//! let normalized = NormalizedSelection::from_legacy(&selection);
//! assert_eq!(normalized.len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod catalog;
mod error;
mod ids;
mod people;
mod request;
mod selection;
mod status;

pub use catalog::{
    Activity, AdvisoryService, CatalogEntry, DropdownValue, ServiceOffering, SubActivity,
};
pub use error::ModelError;
pub use ids::{CatalogId, RecordId, RequestId, RequestNumber, UserId};
pub use people::{AdvisoryTeamMember, Profile, Role, Title};
pub use request::{
    AssigneeHistoryEntry, BillabilityPercentage, Comment, CompletionRecord, EstimationSnapshot,
    NewRequest, Request, RequestRow, TimesheetData,
};
pub use selection::{
    ActivityNode, ActivitySelection, ItemHours, LegacySelection, MultiOfferingSelection, NormalizedSelection,
    OfferingSelection, SelectedItem, SelectionNode,
};
pub use status::RequestStatus;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
