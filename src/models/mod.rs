//! Core data models for the Dues & Remittance Calculation Engine.
//!
//! This module contains all the domain models used throughout the engine.

mod billing_fact;
mod dues_rule;
mod ledger;
mod period;
mod remittance;

pub use billing_fact::{MemberBillingFact, MembershipStatus};
pub use dues_rule::{CalculationMethod, ContributionSchedule, DuesRule, RuleMethod, TierBracket};
pub use ledger::{AuditStep, FailureRecord, LedgerEntry, RunSummary, SkipReason};
pub use period::{BillingPeriod, ReportingPeriod};
pub use remittance::{
    AffiliateReturn, JurisdictionFormula, RemittanceRecord, RemittanceStatus,
};
