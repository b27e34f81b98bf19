//! Service catalog records
//!
//! Catalog rows are flat reference data. Activities and sub-activities are
//! soft-deleted through `is_active` so historical selections keep resolving.

use crate::ids::CatalogId;
use serde::{Deserialize, Serialize};

/// Common accessors over catalog rows
pub trait CatalogEntry {
    /// Row id
    fn id(&self) -> &CatalogId;
    /// Display name
    fn name(&self) -> &str;
    /// Sort key
    fn display_order(&self) -> i32;
    /// Soft-delete flag
    fn is_active(&self) -> bool;
}

macro_rules! catalog_entry {
    ($ty:ty) => {
        impl CatalogEntry for $ty {
            fn id(&self) -> &CatalogId {
                &self.id
            }
            fn name(&self) -> &str {
                &self.name
            }
            fn display_order(&self) -> i32 {
                self.display_order
            }
            fn is_active(&self) -> bool {
                self.is_active
            }
        }
    };
}

fn default_true() -> bool {
    true
}

/// Top-level advisory service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryService {
    /// Row id
    pub id: CatalogId,
    /// Display name
    pub name: String,
    /// Sort key
    #[serde(default)]
    pub display_order: i32,
    /// Soft-delete flag
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Offering (or tool) under an advisory service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOffering {
    /// Row id
    pub id: CatalogId,
    /// Owning service
    pub advisory_service_id: CatalogId,
    /// Display name
    pub name: String,
    /// Sort key
    #[serde(default)]
    pub display_order: i32,
    /// Soft-delete flag
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Billable activity under an offering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Row id
    pub id: CatalogId,
    /// Owning offering
    pub service_offering_id: CatalogId,
    /// Display name
    pub name: String,
    /// Canonical hours
    #[serde(default)]
    pub estimated_hours: f64,
    /// Sort key
    #[serde(default)]
    pub display_order: i32,
    /// Soft-delete flag
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Billable sub-activity under an activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubActivity {
    /// Row id
    pub id: CatalogId,
    /// Owning activity
    pub activity_id: CatalogId,
    /// Display name
    pub name: String,
    /// Canonical hours, used when a selection stores a bare `true`
    #[serde(default)]
    pub estimated_hours: f64,
    /// Sort key
    #[serde(default)]
    pub display_order: i32,
    /// Soft-delete flag
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Admin-configurable dropdown option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropdownValue {
    /// Row id
    pub id: CatalogId,
    /// Dropdown the value belongs to, e.g. `business_unit`
    pub category: String,
    /// Option label
    pub name: String,
    /// Sort key
    #[serde(default)]
    pub display_order: i32,
    /// Soft-delete flag
    #[serde(default = "default_true")]
    pub is_active: bool,
}

catalog_entry!(AdvisoryService);
catalog_entry!(ServiceOffering);
catalog_entry!(Activity);
catalog_entry!(SubActivity);
catalog_entry!(DropdownValue);
