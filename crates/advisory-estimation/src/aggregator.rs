//! Hours/cost aggregation
//!
//! Both stored selection shapes are normalized first, then summed. Every
//! missing or wrong-typed field contributes zero; nothing here fails.

use crate::resolver::SubActivityResolver;
use advisory_model::{
    EstimationSnapshot, ItemHours, LegacySelection, MultiOfferingSelection, NormalizedSelection,
    Request,
};
use serde::{Deserialize, Serialize};

/// Working hours in one person-day
pub const HOURS_PER_DAY: f64 = 8.0;

/// Round to two decimal places, half away from zero
#[inline]
#[must_use]
pub fn round_two_places(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// How totals from the two selection shapes combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapePrecedence {
    /// Multi-offering total when nonzero, otherwise the legacy total
    #[default]
    PreferMultiOffering,
    /// Add both totals
    Sum,
}

/// Hours, person-days and cost for one request
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EstimateTotals {
    /// Sum of selected hours
    pub total_hours: f64,
    /// `total_hours / hours_per_day`, two decimals
    pub total_pd: f64,
    /// `total_hours × rate`
    pub total_cost: f64,
}

impl EstimateTotals {
    /// All zeros
    pub const ZERO: Self = Self {
        total_hours: 0.0,
        total_pd: 0.0,
        total_cost: 0.0,
    };

    /// Derive person-days and cost from hours
    ///
    /// A negative or non-finite rate is treated as unknown (zero cost).
    #[must_use]
    pub fn from_hours(total_hours: f64, rate_per_hour: f64, hours_per_day: f64) -> Self {
        let rate = if rate_per_hour.is_finite() && rate_per_hour > 0.0 {
            rate_per_hour
        } else {
            0.0
        };
        Self {
            total_hours,
            total_pd: round_two_places(total_hours / hours_per_day),
            total_cost: total_hours * rate,
        }
    }
}

impl From<&EstimationSnapshot> for EstimateTotals {
    fn from(snapshot: &EstimationSnapshot) -> Self {
        Self {
            total_hours: snapshot.total_hours,
            total_pd: snapshot.total_pd,
            total_cost: snapshot.total_cost,
        }
    }
}

/// Reduces activity selections to [`EstimateTotals`]
///
/// Pure with respect to the resolver: the same selections and the same
/// catalog snapshot always give the same totals.
pub struct HoursAggregator<'a, R: SubActivityResolver + ?Sized> {
    resolver: &'a R,
    precedence: ShapePrecedence,
    hours_per_day: f64,
}

impl<R: SubActivityResolver + ?Sized> Clone for HoursAggregator<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: SubActivityResolver + ?Sized> Copy for HoursAggregator<'_, R> {}

impl<R: SubActivityResolver + ?Sized> std::fmt::Debug for HoursAggregator<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoursAggregator")
            .field("precedence", &self.precedence)
            .field("hours_per_day", &self.hours_per_day)
            .finish_non_exhaustive()
    }
}

impl<'a, R: SubActivityResolver + ?Sized> HoursAggregator<'a, R> {
    /// Create with default precedence and an 8-hour day
    #[inline]
    #[must_use]
    pub fn new(resolver: &'a R) -> Self {
        Self {
            resolver,
            precedence: ShapePrecedence::default(),
            hours_per_day: HOURS_PER_DAY,
        }
    }

    /// Set shape precedence
    #[inline]
    #[must_use]
    pub fn with_precedence(mut self, precedence: ShapePrecedence) -> Self {
        self.precedence = precedence;
        self
    }

    /// Set person-day length; non-positive values keep the default
    #[inline]
    #[must_use]
    pub fn with_hours_per_day(mut self, hours_per_day: f64) -> Self {
        if hours_per_day.is_finite() && hours_per_day > 0.0 {
            self.hours_per_day = hours_per_day;
        }
        self
    }

    /// Configured person-day length
    #[inline]
    #[must_use]
    pub fn hours_per_day(&self) -> f64 {
        self.hours_per_day
    }

    /// Hours of one normalized selection
    #[must_use]
    pub fn selection_hours(&self, selection: &NormalizedSelection) -> f64 {
        selection
            .iter()
            .map(|item| match item.hours {
                ItemHours::Embedded(hours) => hours,
                ItemHours::Unspecified => 0.0,
                ItemHours::FromCatalog => item
                    .sub_activity_id
                    .as_ref()
                    .map_or(0.0, |id| match self.resolver.resolve_hours(id) {
                        Ok(Some(hours)) => hours,
                        Ok(None) => {
                            tracing::debug!(sub_activity = %id, "sub-activity not in catalog, counting zero hours");
                            0.0
                        }
                        Err(e) => {
                            tracing::warn!(sub_activity = %id, error = %e, "sub-activity lookup failed, counting zero hours");
                            0.0
                        }
                    }),
            })
            .sum()
    }

    /// Total hours across both shapes, honoring the precedence rule
    #[must_use]
    pub fn total_hours(
        &self,
        legacy: Option<&LegacySelection>,
        multi: Option<&MultiOfferingSelection>,
    ) -> f64 {
        let multi_hours = multi.map_or(0.0, |m| {
            self.selection_hours(&NormalizedSelection::from_multi(m))
        });
        let legacy_hours = || {
            legacy.map_or(0.0, |l| {
                self.selection_hours(&NormalizedSelection::from_legacy(l))
            })
        };

        match self.precedence {
            ShapePrecedence::PreferMultiOffering if multi_hours > 0.0 => multi_hours,
            ShapePrecedence::PreferMultiOffering => legacy_hours(),
            ShapePrecedence::Sum => multi_hours + legacy_hours(),
        }
    }

    /// Totals for the given selections at `rate_per_hour` (0 = unknown)
    #[must_use]
    pub fn aggregate(
        &self,
        legacy: Option<&LegacySelection>,
        multi: Option<&MultiOfferingSelection>,
        rate_per_hour: f64,
    ) -> EstimateTotals {
        let hours = self.total_hours(legacy, multi);
        let totals = EstimateTotals::from_hours(hours, rate_per_hour, self.hours_per_day);
        tracing::debug!(
            total_hours = totals.total_hours,
            total_pd = totals.total_pd,
            total_cost = totals.total_cost,
            "aggregated activity selection"
        );
        totals
    }

    /// Live totals for a request, ignoring any frozen snapshot
    #[must_use]
    pub fn for_request(&self, request: &Request, rate_per_hour: f64) -> EstimateTotals {
        self.aggregate(
            request.selected_activities.as_ref(),
            request.service_offering_activities.as_ref(),
            rate_per_hour,
        )
    }
}

/// Totals to display for a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum EstimateView {
    /// Frozen snapshot, authoritative
    Frozen(EstimationSnapshot),
    /// Computed from current activity data
    Live(EstimateTotals),
}

impl EstimateView {
    /// Snapshot if present, otherwise live totals; a snapshot is never recomputed
    #[must_use]
    pub fn resolve<R: SubActivityResolver + ?Sized>(
        request: &Request,
        aggregator: &HoursAggregator<'_, R>,
        rate_per_hour: f64,
    ) -> Self {
        match &request.estimation {
            Some(snapshot) => Self::Frozen(snapshot.clone()),
            None => Self::Live(aggregator.for_request(request, rate_per_hour)),
        }
    }

    /// Displayed totals
    #[must_use]
    pub fn totals(&self) -> EstimateTotals {
        match self {
            Self::Frozen(snapshot) => EstimateTotals::from(snapshot),
            Self::Live(totals) => *totals,
        }
    }

    /// Whether the totals come from a snapshot
    #[inline]
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        matches!(self, Self::Frozen(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{CatalogSnapshot, MockSubActivityResolver, ResolveError};
    use advisory_model::{CatalogId, NewRequest, RequestNumber, UserId};
    use chrono::Utc;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn legacy(value: serde_json::Value) -> LegacySelection {
        LegacySelection::from_value(&value)
    }

    fn multi(value: serde_json::Value) -> MultiOfferingSelection {
        MultiOfferingSelection::from_value(&value)
    }

    #[test]
    fn empty_inputs_give_zero() {
        let catalog = CatalogSnapshot::new();
        let totals = HoursAggregator::new(&catalog).aggregate(None, None, 50.0);
        assert_eq!(totals, EstimateTotals::ZERO);
    }

    #[test]
    fn bare_sub_activity_resolves_from_catalog() {
        let catalog = CatalogSnapshot::from_pairs([("sub1", 5.0)]);
        let selection = legacy(json!({
            "act1": { "selected": true, "estimated_hours": 10, "subActivities": { "sub1": true } }
        }));

        let totals = HoursAggregator::new(&catalog).aggregate(Some(&selection), None, 50.0);

        assert_eq!(
            totals,
            EstimateTotals {
                total_hours: 15.0,
                total_pd: 1.88,
                total_cost: 750.0,
            }
        );
    }

    #[test]
    fn person_days_round_to_two_places() {
        let catalog = CatalogSnapshot::new();
        let selection = legacy(json!({ "a": { "selected": true, "estimated_hours": 38 } }));
        let totals = HoursAggregator::new(&catalog).aggregate(Some(&selection), None, 0.0);
        assert_eq!(totals.total_pd, 4.75);
        assert_eq!(totals.total_cost, 0.0);
    }

    #[test]
    fn resolver_is_called_once_per_bare_sub_activity() {
        let mut resolver = MockSubActivityResolver::new();
        resolver
            .expect_resolve_hours()
            .with(eq(CatalogId::new("sub1")))
            .times(1)
            .returning(|_| Ok(Some(5.0)));

        let selection = legacy(json!({
            "act1": { "selected": false, "subActivities": {
                "sub1": true,
                "sub2": { "selected": true, "estimated_hours": 2 }
            } }
        }));
        let hours = HoursAggregator::new(&resolver).total_hours(Some(&selection), None);
        assert_eq!(hours, 7.0);
    }

    #[test]
    fn resolver_failure_counts_zero() {
        let mut resolver = MockSubActivityResolver::new();
        resolver
            .expect_resolve_hours()
            .returning(|_| Err(ResolveError::Unavailable("timeout".into())));

        let selection = legacy(json!({
            "activities": { "a1": { "selected": true, "estimated_hours": 4 } },
            "subActivities": { "s1": true }
        }));
        let hours = HoursAggregator::new(&resolver).total_hours(Some(&selection), None);
        assert_eq!(hours, 4.0);
    }

    #[test]
    fn multi_offering_wins_when_nonzero() {
        let catalog = CatalogSnapshot::new();
        let l = legacy(json!({ "a": { "selected": true, "estimated_hours": 10 } }));
        let m = multi(json!({ "off": { "activities": { "b": { "selected": true, "estimated_hours": 3 } } } }));

        let aggregator = HoursAggregator::new(&catalog);
        assert_eq!(aggregator.total_hours(Some(&l), Some(&m)), 3.0);

        let summing = aggregator.with_precedence(ShapePrecedence::Sum);
        assert_eq!(summing.total_hours(Some(&l), Some(&m)), 13.0);
    }

    #[test]
    fn legacy_is_the_fallback_when_multi_is_zero() {
        let catalog = CatalogSnapshot::new();
        let l = legacy(json!({ "a": { "selected": true, "estimated_hours": 10 } }));
        let m = multi(json!({ "off": { "activities": { "b": { "selected": false, "estimated_hours": 3 } } } }));
        assert_eq!(
            HoursAggregator::new(&catalog).total_hours(Some(&l), Some(&m)),
            10.0
        );
    }

    #[test]
    fn custom_day_length() {
        let catalog = CatalogSnapshot::new();
        let l = legacy(json!({ "a": { "selected": true, "estimated_hours": 15 } }));
        let totals = HoursAggregator::new(&catalog)
            .with_hours_per_day(7.5)
            .aggregate(Some(&l), None, 0.0);
        assert_eq!(totals.total_pd, 2.0);

        let ignored = HoursAggregator::new(&catalog).with_hours_per_day(0.0);
        assert_eq!(ignored.hours_per_day(), HOURS_PER_DAY);
    }

    #[test]
    fn negative_rate_means_unknown() {
        let totals = EstimateTotals::from_hours(10.0, -4.0, HOURS_PER_DAY);
        assert_eq!(totals.total_cost, 0.0);
    }

    #[test]
    fn frozen_snapshot_is_not_recomputed() {
        let now = Utc::now();
        let mut request = NewRequest::new("Audit")
            .with_service("svc")
            .into_request(UserId::new(), RequestNumber::format(2024, 7), now)
            .unwrap();
        request.selected_activities =
            Some(legacy(json!({ "a": { "selected": true, "estimated_hours": 99 } })));

        let catalog = CatalogSnapshot::new();
        let aggregator = HoursAggregator::new(&catalog);

        let live = EstimateView::resolve(&request, &aggregator, 10.0);
        assert!(!live.is_frozen());
        assert_eq!(live.totals().total_hours, 99.0);

        request.estimation = Some(EstimationSnapshot {
            total_hours: 0.0,
            total_pd: 0.0,
            total_cost: 0.0,
            assignee_rate: 10.0,
            assignee_role: "Advisory Consultant".into(),
            saved_at: now,
        });
        let frozen = EstimateView::resolve(&request, &aggregator, 10.0);
        assert!(frozen.is_frozen());
        // a zero snapshot is still authoritative
        assert_eq!(frozen.totals(), EstimateTotals::ZERO);
    }
}
