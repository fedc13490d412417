//! Billing and reporting period types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A monthly billing period for dues runs.
///
/// # Example
///
/// ```
/// use dues_engine::models::BillingPeriod;
///
/// let period = BillingPeriod { year: 2025, month: 3 };
/// assert_eq!(period.to_string(), "2025-03");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BillingPeriod {
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
}

impl BillingPeriod {
    /// First calendar day of the period, used for rule effectiveness
    /// lookups. `None` if the month is out of range.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A fiscal quarter for per-capita remittance reporting.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ReportingPeriod {
    /// Fiscal year.
    pub year: i32,
    /// Fiscal quarter (1-4).
    pub quarter: u8,
}

impl ReportingPeriod {
    /// True when the quarter is in the 1-4 range.
    pub fn is_valid(&self) -> bool {
        (1..=4).contains(&self.quarter)
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-Q{}", self.year, self.quarter)
    }
}
