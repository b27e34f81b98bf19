use advisory_estimation::{
    estimate_days, CatalogSnapshot, DayEstimate, EstimateTotals, HoursAggregator,
};
use advisory_model::{BillabilityPercentage, LegacySelection, MultiOfferingSelection};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// Nested legacy selection plus the expected hour total
fn arb_selection() -> impl Strategy<Value = (Value, f64)> {
    prop::collection::vec(
        (
            any::<bool>(),
            0u32..40,
            prop::collection::vec((any::<bool>(), 0u32..10, any::<bool>()), 0..4),
        ),
        0..6,
    )
    .prop_map(|activities| {
        let mut obj = Map::new();
        let mut expected = 0.0;
        for (i, (selected, hours, subs)) in activities.into_iter().enumerate() {
            if selected {
                expected += f64::from(hours);
            }
            let mut sub_obj = Map::new();
            for (j, (sub_selected, sub_hours, bare)) in subs.into_iter().enumerate() {
                let id = format!("s{i}_{j}");
                if bare {
                    // bare flags resolve to 2 hours from the catalog below
                    sub_obj.insert(id, Value::Bool(sub_selected));
                    if sub_selected {
                        expected += 2.0;
                    }
                } else {
                    sub_obj.insert(
                        id,
                        json!({ "selected": sub_selected, "estimated_hours": sub_hours }),
                    );
                    if sub_selected {
                        expected += f64::from(sub_hours);
                    }
                }
            }
            obj.insert(
                format!("a{i}"),
                json!({ "selected": selected, "estimated_hours": hours, "subActivities": sub_obj }),
            );
        }
        (Value::Object(obj), expected)
    })
}

fn catalog_for(raw: &Value) -> CatalogSnapshot {
    let mut catalog = CatalogSnapshot::new();
    if let Some(obj) = raw.as_object() {
        for activity in obj.values() {
            if let Some(subs) = activity.get("subActivities").and_then(Value::as_object) {
                for id in subs.keys() {
                    catalog.insert(id.as_str(), 2.0);
                }
            }
        }
    }
    catalog
}

proptest! {
    #[test]
    fn total_is_sum_over_selected_nodes((raw, expected) in arb_selection()) {
        let catalog = catalog_for(&raw);
        let selection = LegacySelection::from_value(&raw);
        let hours = HoursAggregator::new(&catalog).total_hours(Some(&selection), None);
        prop_assert!((hours - expected).abs() < 1e-9);
    }

    #[test]
    fn aggregation_is_idempotent((raw, _) in arb_selection(), rate in 0u32..500) {
        let catalog = catalog_for(&raw);
        let selection = LegacySelection::from_value(&raw);
        let aggregator = HoursAggregator::new(&catalog);
        let first = aggregator.aggregate(Some(&selection), None, f64::from(rate));
        let second = aggregator.aggregate(Some(&selection), None, f64::from(rate));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn days_cover_the_hours(hours in 1u32..2000, pct in 1i64..=100) {
        let billability = BillabilityPercentage::try_from(pct).unwrap();
        match estimate_days(f64::from(hours), Some(billability)) {
            DayEstimate::Days { days, effective_hours_per_day } => {
                let capacity = f64::from(days) * effective_hours_per_day;
                prop_assert!(capacity + 1e-9 >= f64::from(hours));
                prop_assert!(capacity - effective_hours_per_day < f64::from(hours) + 1e-9);
            }
            DayEstimate::NotCalculated => prop_assert!(false, "expected a day count"),
        }
    }
}

#[test]
fn end_to_end_example() {
    let catalog = CatalogSnapshot::from_pairs([("sub1", 5.0)]);
    let selection = LegacySelection::from_value(&json!({
        "act1": { "selected": true, "estimated_hours": 10, "subActivities": { "sub1": true } }
    }));
    let totals = HoursAggregator::new(&catalog).aggregate(Some(&selection), None, 50.0);
    assert_eq!(
        totals,
        EstimateTotals {
            total_hours: 15.0,
            total_pd: 1.88,
            total_cost: 750.0
        }
    );
}

#[test]
fn empty_selections_aggregate_to_zero() {
    let catalog = CatalogSnapshot::new();
    let aggregator = HoursAggregator::new(&catalog);
    assert_eq!(aggregator.aggregate(None, None, 80.0), EstimateTotals::ZERO);

    let empty_legacy = LegacySelection::from_value(&json!({}));
    let empty_multi = MultiOfferingSelection::from_value(&json!({}));
    assert_eq!(
        aggregator.aggregate(Some(&empty_legacy), Some(&empty_multi), 80.0),
        EstimateTotals::ZERO
    );
}

#[test]
fn thirty_eight_hours_at_half_billability() {
    let billability = BillabilityPercentage::try_from(50).unwrap();
    assert_eq!(estimate_days(38.0, Some(billability)).days(), Some(10));
}
