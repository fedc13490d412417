//! Ledger models for billing runs.
//!
//! This module contains the [`LedgerEntry`] produced per member per run, the
//! [`FailureRecord`] written when a member's evaluation fails, the
//! [`RunSummary`] for a completed run, and the [`AuditStep`] trace recorded
//! for every calculation decision.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BillingPeriod, CalculationMethod};

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for one stage of a
/// member's dues calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number within the entry's trace.
    pub step_number: u32,
    /// The calculation stage (e.g., "tiered_dues", "late_fee").
    pub stage: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// Why a member's entry was skipped rather than calculated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Membership was inactive at period end.
    Inactive,
    /// Membership was suspended at period end.
    Suspended,
    /// The member is exempt from dues.
    Exempt,
}

/// One ledger entry: the computed dues obligation for one member in one run.
///
/// Entries are append-only. A re-run for the same organization and period
/// writes entries under a new run id; prior entries are never mutated, only
/// superseded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier for this entry.
    pub entry_id: Uuid,
    /// The run that produced this entry.
    pub run_id: Uuid,
    /// The member this entry is for.
    pub member_id: String,
    /// The member's organization.
    pub organization_id: String,
    /// The billing period.
    pub period: BillingPeriod,
    /// The base dues amount before contributions and late fees. Includes
    /// the initiation fee when the rule charges one.
    pub base_amount: Decimal,
    /// COPE contribution collected with this entry.
    #[serde(default)]
    pub cope: Decimal,
    /// PAC contribution collected with this entry.
    #[serde(default)]
    pub pac: Decimal,
    /// Strike fund contribution collected with this entry.
    #[serde(default)]
    pub strike_fund: Decimal,
    /// The late fee applied, zero if none.
    pub late_fee: Decimal,
    /// Total due: base amount plus contributions plus late fee.
    pub total_due: Decimal,
    /// Arrears balance after this entry (prior arrears + total due).
    pub updated_arrears: Decimal,
    /// The calculation method that was applied.
    pub method: CalculationMethod,
    /// Set when the entry was skipped (zero amount, retained for audit).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    /// The rule that was applied.
    pub rule_id: String,
    /// The version of the rule that was applied.
    pub rule_version: u32,
    /// When the entry was computed.
    pub timestamp: DateTime<Utc>,
    /// Ordered trace of calculation decisions.
    pub audit: Vec<AuditStep>,
}

/// A per-member failure recorded during a batch run.
///
/// Failures never abort the run; each one carries the member's identity, the
/// machine-readable error kind, and a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// The member whose evaluation failed.
    pub member_id: String,
    /// Machine-readable error kind (e.g., "INVALID_BILLING_FACT").
    pub error_kind: String,
    /// Human-readable failure reason.
    pub reason: String,
    /// When the failure was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Summary of one completed (or cancelled) batch dues run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique identifier for the run.
    pub run_id: Uuid,
    /// The organization the run was for.
    pub organization_id: String,
    /// The billing period the run covered.
    pub period: BillingPeriod,
    /// Members with a successfully computed entry.
    pub succeeded: u32,
    /// Members with a zero-amount skipped entry.
    pub skipped: u32,
    /// Members with a failure record.
    pub failed: u32,
    /// Sum of total dues across successful entries.
    pub total_dues: Decimal,
    /// Sum of COPE, PAC, and strike-fund contributions across successful
    /// entries.
    pub total_contributions: Decimal,
    /// True if the run was cancelled before all members were evaluated.
    pub cancelled: bool,
    /// Run duration in microseconds.
    pub duration_us: u64,
}

impl RunSummary {
    /// Total number of members the run accounted for.
    pub fn total_processed(&self) -> u32 {
        self.succeeded + self.skipped + self.failed
    }
}
