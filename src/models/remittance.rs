//! Per-capita remittance models.
//!
//! A [`RemittanceRecord`] captures what one affiliate owes its federation for
//! a reporting period. Records are created in `draft` by the aggregator,
//! transition to `calculated` once every affiliate has reported, and to
//! `submitted` only via an explicit external action.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ReportingPeriod;

/// Lifecycle status of a remittance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemittanceStatus {
    /// Created by the aggregator; affiliate inputs may still be pending.
    Draft,
    /// All affiliate inputs were present when the period was aggregated.
    Calculated,
    /// Submitted to the statutory recipient (external action).
    Submitted,
}

/// A jurisdiction's per-capita formula constants.
///
/// The statutory obligation is `member_count * rate_per_member`, clamped to
/// the optional minimum and cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionFormula {
    /// Unique identifier for the formula (e.g., "clc_national_2025").
    pub id: String,
    /// The rate owed per remittable member.
    pub rate_per_member: Decimal,
    /// Minimum remittance per affiliate per period, if the jurisdiction sets one.
    #[serde(default)]
    pub minimum: Option<Decimal>,
    /// Maximum remittance per affiliate per period, if the jurisdiction sets one.
    #[serde(default)]
    pub cap: Option<Decimal>,
}

/// One affiliate's membership return for a reporting period, supplied by the
/// external membership-count collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffiliateReturn {
    /// The reporting affiliate organization.
    pub affiliate_id: String,
    /// Total members at the reporting date.
    pub member_count: u32,
    /// Members in good standing; only these are remittable.
    pub good_standing_count: u32,
    /// Dues collected by the affiliate in the period.
    pub dues_collected: Decimal,
}

/// The per-capita remittance obligation of one affiliate for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemittanceRecord {
    /// The federation the remittance is owed to.
    pub federation_id: String,
    /// The affiliate organization that owes it.
    pub affiliate_id: String,
    /// The fiscal reporting period.
    pub period: ReportingPeriod,
    /// Total members at the reporting date.
    pub member_count: u32,
    /// Members in good standing (the remittable count).
    pub good_standing_count: u32,
    /// Dues the affiliate collected in the period.
    pub dues_collected: Decimal,
    /// The computed per-capita obligation.
    pub per_capita_amount: Decimal,
    /// The jurisdiction formula that was applied.
    pub formula_id: String,
    /// Lifecycle status.
    pub status: RemittanceStatus,
}
