//! Request types for the dues engine API.
//!
//! All three endpoints carry their inputs inline: the engine owns no
//! storage, so rules, rosters, and affiliate returns arrive with the
//! request and results are returned in the response.

use serde::{Deserialize, Serialize};

use crate::calculation::LateFeePolicy;
use crate::models::{
    AffiliateReturn, BillingPeriod, DuesRule, JurisdictionFormula, MemberBillingFact,
    ReportingPeriod,
};

/// Request body for the `/evaluate` endpoint: one member under one rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    /// The dues rule to apply.
    pub rule: DuesRule,
    /// The member's billing fact.
    pub fact: MemberBillingFact,
    /// Overrides the configured late-fee policy when present.
    #[serde(default)]
    pub late_fee_policy: Option<LateFeePolicy>,
}

/// Request body for the `/runs` endpoint: a batch dues run with its roster
/// and rules inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    /// The organization to run dues for.
    pub organization_id: String,
    /// The billing period.
    pub period: BillingPeriod,
    /// The organization's rules; the one effective at the period start applies.
    pub rules: Vec<DuesRule>,
    /// The member roster with billing facts.
    pub facts: Vec<MemberBillingFact>,
    /// Overrides the configured late-fee policy when present.
    #[serde(default)]
    pub late_fee_policy: Option<LateFeePolicy>,
}

/// Request body for the `/remittances/aggregate` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateRequest {
    /// The federation the remittances are owed to.
    pub federation_id: String,
    /// The jurisdiction whose configured formula applies.
    #[serde(default = "default_jurisdiction")]
    pub jurisdiction_id: String,
    /// The fiscal reporting period.
    pub period: ReportingPeriod,
    /// Every affiliate expected to report.
    pub expected_affiliates: Vec<String>,
    /// The returns received so far.
    pub returns: Vec<AffiliateReturn>,
    /// Overrides the configured jurisdiction formula when present.
    #[serde(default)]
    pub formula: Option<JurisdictionFormula>,
    /// When set, pending affiliates fail the request instead of producing
    /// draft records.
    #[serde(default)]
    pub require_complete: bool,
}

fn default_jurisdiction() -> String {
    "national".to_string()
}
