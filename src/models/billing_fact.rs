//! Member billing fact model.
//!
//! A [`MemberBillingFact`] is an immutable snapshot of the compensation and
//! standing data a dues calculation needs, captured from roster state when a
//! billing run starts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::BillingPeriod;

/// A member's standing at the end of a billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    /// Member in good standing; dues are calculated normally.
    Active,
    /// Membership lapsed; produces a zero-amount skipped entry.
    Inactive,
    /// Membership suspended; produces a zero-amount skipped entry.
    Suspended,
    /// Exempt from dues; produces a zero-amount skipped entry.
    Exempt,
}

impl MembershipStatus {
    /// Returns true if dues should be calculated for this status.
    pub fn is_billable(self) -> bool {
        matches!(self, MembershipStatus::Active)
    }
}

/// Immutable compensation snapshot for one member and billing period.
///
/// # Example
///
/// ```
/// use dues_engine::models::{BillingPeriod, MemberBillingFact, MembershipStatus};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let fact = MemberBillingFact {
///     member_id: "mem_001".to_string(),
///     organization_id: "local_456".to_string(),
///     period: BillingPeriod { year: 2025, month: 3 },
///     gross_wages: Decimal::from_str("4200.00").unwrap(),
///     hours_worked: Decimal::from_str("152").unwrap(),
///     arrears_balance: Decimal::ZERO,
///     days_overdue: 0,
///     dues_override: None,
///     status: MembershipStatus::Active,
/// };
/// assert!(fact.status.is_billable());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberBillingFact {
    /// The member this snapshot is for.
    pub member_id: String,
    /// The organization the member belongs to.
    pub organization_id: String,
    /// The billing period the snapshot covers.
    pub period: BillingPeriod,
    /// Gross wages earned in the period.
    pub gross_wages: Decimal,
    /// Hours worked in the period.
    pub hours_worked: Decimal,
    /// Unpaid balance carried forward from prior periods.
    #[serde(default)]
    pub arrears_balance: Decimal,
    /// Days the carried balance is overdue, relative to its original due date.
    #[serde(default)]
    pub days_overdue: i64,
    /// Manual base-dues amount set for this member and period. When present
    /// it replaces the rule's calculation method entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dues_override: Option<Decimal>,
    /// Membership status at period end.
    pub status: MembershipStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_only_active_is_billable() {
        assert!(MembershipStatus::Active.is_billable());
        assert!(!MembershipStatus::Inactive.is_billable());
        assert!(!MembershipStatus::Suspended.is_billable());
        assert!(!MembershipStatus::Exempt.is_billable());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&MembershipStatus::Active).unwrap(),
            "\"active\""
        );
        assert_eq!(
            serde_json::to_string(&MembershipStatus::Suspended).unwrap(),
            "\"suspended\""
        );
    }

    #[test]
    fn test_deserialize_fact_with_defaults() {
        let json = r#"{
            "member_id": "mem_001",
            "organization_id": "local_456",
            "period": { "year": 2025, "month": 3 },
            "gross_wages": "4200.00",
            "hours_worked": "152",
            "status": "active"
        }"#;

        let fact: MemberBillingFact = serde_json::from_str(json).unwrap();
        assert_eq!(fact.gross_wages, dec("4200.00"));
        assert_eq!(fact.arrears_balance, Decimal::ZERO);
        assert_eq!(fact.days_overdue, 0);
        assert_eq!(fact.dues_override, None);
    }

    #[test]
    fn test_fact_serde_round_trip() {
        let fact = MemberBillingFact {
            member_id: "mem_002".to_string(),
            organization_id: "local_456".to_string(),
            period: BillingPeriod {
                year: 2025,
                month: 3,
            },
            gross_wages: dec("3890.50"),
            hours_worked: dec("140.5"),
            arrears_balance: dec("52.10"),
            days_overdue: 45,
            dues_override: Some(dec("40.00")),
            status: MembershipStatus::Suspended,
        };

        let json = serde_json::to_string(&fact).unwrap();
        let back: MemberBillingFact = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fact);
    }
}
