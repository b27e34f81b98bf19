//! Sub-activity hour lookup
//!
//! Selections store some sub-activities as a bare `true`; their hours live
//! in the catalog. The aggregator resolves them through this trait so the
//! lookup source (a fetched snapshot, a test map) stays injectable.

use advisory_model::{CatalogId, SubActivity};
use std::collections::{BTreeMap, HashMap};

/// Resolver failures; the aggregator logs them and counts zero hours
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    /// Catalog could not be read
    #[error("sub-activity catalog unavailable: {0}")]
    Unavailable(String),

    /// Catalog row holds unusable hours
    #[error("invalid hours {hours} for sub-activity {id}")]
    InvalidHours {
        /// Sub-activity id
        id: CatalogId,
        /// Offending value
        hours: f64,
    },
}

/// Looks up canonical hours for a sub-activity
#[cfg_attr(test, mockall::automock)]
pub trait SubActivityResolver {
    /// Hours for `id`; `Ok(None)` when the catalog has no such row
    ///
    /// # Errors
    /// Implementation-specific; callers treat any error as zero hours.
    fn resolve_hours(&self, id: &CatalogId) -> Result<Option<f64>, ResolveError>;
}

impl<T: SubActivityResolver + ?Sized> SubActivityResolver for &T {
    fn resolve_hours(&self, id: &CatalogId) -> Result<Option<f64>, ResolveError> {
        (**self).resolve_hours(id)
    }
}

impl SubActivityResolver for HashMap<CatalogId, f64> {
    fn resolve_hours(&self, id: &CatalogId) -> Result<Option<f64>, ResolveError> {
        Ok(self.get(id).copied())
    }
}

impl SubActivityResolver for BTreeMap<CatalogId, f64> {
    fn resolve_hours(&self, id: &CatalogId) -> Result<Option<f64>, ResolveError> {
        Ok(self.get(id).copied())
    }
}

/// Sub-activity hours captured from one catalog fetch
///
/// Inactive rows are kept: historical selections still reference them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    hours: HashMap<CatalogId, f64>,
}

impl CatalogSnapshot {
    /// Empty snapshot
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from fetched catalog rows
    pub fn from_sub_activities<'a>(rows: impl IntoIterator<Item = &'a SubActivity>) -> Self {
        Self {
            hours: rows
                .into_iter()
                .map(|row| (row.id.clone(), row.estimated_hours))
                .collect(),
        }
    }

    /// Build from `(id, hours)` pairs
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<CatalogId>,
    {
        Self {
            hours: pairs.into_iter().map(|(k, h)| (k.into(), h)).collect(),
        }
    }

    /// Add or replace one row
    pub fn insert(&mut self, id: impl Into<CatalogId>, hours: f64) {
        self.hours.insert(id.into(), hours);
    }

    /// Number of rows
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.hours.len()
    }

    /// No rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }
}

impl SubActivityResolver for CatalogSnapshot {
    fn resolve_hours(&self, id: &CatalogId) -> Result<Option<f64>, ResolveError> {
        match self.hours.get(id) {
            Some(&hours) if !hours.is_finite() || hours < 0.0 => Err(ResolveError::InvalidHours {
                id: id.clone(),
                hours,
            }),
            other => Ok(other.copied()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_resolves_known_rows() {
        let snapshot = CatalogSnapshot::from_pairs([("sub1", 5.0)]);
        assert_eq!(snapshot.resolve_hours(&CatalogId::new("sub1")), Ok(Some(5.0)));
        assert_eq!(snapshot.resolve_hours(&CatalogId::new("nope")), Ok(None));
    }

    #[test]
    fn snapshot_flags_unusable_hours() {
        let mut snapshot = CatalogSnapshot::new();
        snapshot.insert("bad", -1.0);
        assert!(matches!(
            snapshot.resolve_hours(&CatalogId::new("bad")),
            Err(ResolveError::InvalidHours { .. })
        ));
    }

    #[test]
    fn snapshot_keeps_inactive_rows() {
        let rows = vec![SubActivity {
            id: CatalogId::new("old"),
            activity_id: CatalogId::new("act1"),
            name: "Retired".into(),
            estimated_hours: 3.0,
            display_order: 0,
            is_active: false,
        }];
        let snapshot = CatalogSnapshot::from_sub_activities(&rows);
        assert_eq!(snapshot.resolve_hours(&CatalogId::new("old")), Ok(Some(3.0)));
    }
}
