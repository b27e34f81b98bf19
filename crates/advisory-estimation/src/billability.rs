//! Billable-day estimation
//!
//! `days = ceil(hours / (hours_per_day × billability / 100))`. Without hours
//! or without a billability percentage there is nothing meaningful to show,
//! so the estimate is reported as not calculated.

use crate::aggregator::HOURS_PER_DAY;
use advisory_model::BillabilityPercentage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Elapsed-day estimate for a request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DayEstimate {
    /// Hours or billability missing
    NotCalculated,
    /// Estimate available
    Days {
        /// Calendar working days needed
        days: u32,
        /// Billable hours per working day
        effective_hours_per_day: f64,
    },
}

impl DayEstimate {
    /// Days, when calculated
    #[inline]
    #[must_use]
    pub fn days(&self) -> Option<u32> {
        match self {
            Self::NotCalculated => None,
            Self::Days { days, .. } => Some(*days),
        }
    }
}

impl fmt::Display for DayEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotCalculated => f.write_str("Not calculated"),
            Self::Days { days: 1, .. } => f.write_str("1 day"),
            Self::Days { days, .. } => write!(f, "{days} days"),
        }
    }
}

/// Day estimate with an 8-hour day
#[must_use]
pub fn estimate_days(total_hours: f64, billability: Option<BillabilityPercentage>) -> DayEstimate {
    estimate_days_with(total_hours, billability, HOURS_PER_DAY)
}

/// Day estimate with a custom day length
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn estimate_days_with(
    total_hours: f64,
    billability: Option<BillabilityPercentage>,
    hours_per_day: f64,
) -> DayEstimate {
    let Some(billability) = billability else {
        return DayEstimate::NotCalculated;
    };
    if !total_hours.is_finite() || total_hours <= 0.0 || hours_per_day <= 0.0 {
        return DayEstimate::NotCalculated;
    }

    // Integer percentage keeps the divisor exact for whole-hour days.
    let divisor = hours_per_day * f64::from(billability.get());
    let days = (total_hours * 100.0 / divisor).ceil();

    DayEstimate::Days {
        days: days.min(f64::from(u32::MAX)) as u32,
        effective_hours_per_day: divisor / 100.0,
    }
}
