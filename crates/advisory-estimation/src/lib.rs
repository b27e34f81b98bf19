//! Advisory Estimation
//!
//! Pure estimation logic over request activity selections.
//!
//! # Core Concepts
//!
//! - [`HoursAggregator`]: reduces both selection shapes to hours, person-days and cost
//! - [`SubActivityResolver`]: seam for looking up catalog hours of bare `true` sub-activities
//! - [`CatalogSnapshot`]: per-view snapshot of sub-activity hours
//! - [`EstimateView`]: frozen snapshot if the request has one, live totals otherwise
//! - [`estimate_days`]: billable-day estimate from hours and billability
//!
//! # Example
//!
//! ```rust,ignore
//! use advisory_estimation::{CatalogSnapshot, HoursAggregator};
//!
//! let catalog = CatalogSnapshot::from_pairs([("sub1", 5.0)]);
//! let totals = HoursAggregator::new(&catalog).aggregate(Some(&legacy), None, 50.0);
//! assert_eq!(totals.total_hours, 15.0);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod aggregator;
mod billability;
mod resolver;

pub use aggregator::{
    round_two_places, EstimateTotals, EstimateView, HoursAggregator, ShapePrecedence,
    HOURS_PER_DAY,
};
pub use billability::{estimate_days, estimate_days_with, DayEstimate};
pub use resolver::{CatalogSnapshot, ResolveError, SubActivityResolver};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
