//! Per-capita remittance aggregation.
//!
//! One aggregation call covers a whole federation and reporting period. Each
//! reporting affiliate gets a [`RemittanceRecord`] priced by the jurisdiction
//! formula over its good-standing member count. Records transition to
//! `calculated` only when every expected affiliate has reported; until then
//! they stay `draft` and the pending affiliates are listed. Missing data is
//! never estimated.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AffiliateReturn, JurisdictionFormula, RemittanceRecord, RemittanceStatus, ReportingPeriod,
};
use crate::money::MoneyContext;
use crate::providers::{JurisdictionFormulaProvider, LedgerSink, MembershipProvider};

/// The outcome of one aggregation call.
#[derive(Debug, Clone)]
pub struct AggregationOutcome {
    /// One record per reporting affiliate, all sharing the same status.
    pub records: Vec<RemittanceRecord>,
    /// Expected affiliates that have not reported, sorted.
    pub pending: Vec<String>,
}

impl AggregationOutcome {
    /// True when every expected affiliate has reported.
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Aggregates affiliate returns into per-capita remittance records.
pub struct RemittanceAggregator {
    membership: Arc<dyn MembershipProvider>,
    formulas: Arc<dyn JurisdictionFormulaProvider>,
    sink: Arc<dyn LedgerSink>,
    money: MoneyContext,
}

impl RemittanceAggregator {
    /// Creates an aggregator over the collaborator seams.
    pub fn new(
        membership: Arc<dyn MembershipProvider>,
        formulas: Arc<dyn JurisdictionFormulaProvider>,
        sink: Arc<dyn LedgerSink>,
        money: MoneyContext,
    ) -> Self {
        Self {
            membership,
            formulas,
            sink,
            money,
        }
    }

    /// Aggregates the federation's reporting period under the jurisdiction's
    /// formula, writing one record per reporting affiliate.
    ///
    /// All records of the period share one status: `calculated` when every
    /// expected affiliate has reported, otherwise `draft`. Re-running after
    /// late returns arrive replaces the drafts.
    pub fn aggregate(
        &self,
        federation_id: &str,
        jurisdiction_id: &str,
        period: ReportingPeriod,
    ) -> EngineResult<AggregationOutcome> {
        if !period.is_valid() {
            return Err(EngineError::InputsUnavailable {
                provider: "period".to_string(),
                message: format!("invalid reporting period {}", period),
            });
        }
        let formula = self.formulas.formula(federation_id, jurisdiction_id)?;
        validate_formula(&formula)?;

        let expected = self.membership.expected_affiliates(federation_id)?;
        let returns = self.membership.affiliate_returns(federation_id, period)?;

        let mut reported: Vec<&str> = Vec::with_capacity(returns.len());
        for ret in &returns {
            validate_return(ret)?;
            if !expected.iter().any(|a| a == &ret.affiliate_id) {
                return Err(EngineError::InvalidAffiliateReturn {
                    affiliate_id: ret.affiliate_id.clone(),
                    message: format!(
                        "affiliate is not expected to report for federation '{}'",
                        federation_id
                    ),
                });
            }
            if reported.contains(&ret.affiliate_id.as_str()) {
                return Err(EngineError::InvalidAffiliateReturn {
                    affiliate_id: ret.affiliate_id.clone(),
                    message: "duplicate return for the period".to_string(),
                });
            }
            reported.push(&ret.affiliate_id);
        }

        let mut pending: Vec<String> = expected
            .iter()
            .filter(|a| !reported.contains(&a.as_str()))
            .cloned()
            .collect();
        pending.sort();

        let status = if pending.is_empty() {
            RemittanceStatus::Calculated
        } else {
            RemittanceStatus::Draft
        };

        let mut records = Vec::with_capacity(returns.len());
        for ret in &returns {
            let per_capita_amount = self.per_capita(&formula, ret)?;
            let record = RemittanceRecord {
                federation_id: federation_id.to_string(),
                affiliate_id: ret.affiliate_id.clone(),
                period,
                member_count: ret.member_count,
                good_standing_count: ret.good_standing_count,
                dues_collected: ret.dues_collected,
                per_capita_amount,
                formula_id: formula.id.clone(),
                status,
            };
            self.sink.upsert_remittance(record.clone())?;
            records.push(record);
        }

        tracing::info!(
            federation_id,
            period = %period,
            reported = records.len(),
            pending = pending.len(),
            status = ?status,
            "Aggregated per-capita remittances"
        );

        Ok(AggregationOutcome { records, pending })
    }

    /// Aggregates and requires completeness: fails with
    /// [`EngineError::IncompleteAggregation`] when affiliates are pending.
    pub fn aggregate_complete(
        &self,
        federation_id: &str,
        jurisdiction_id: &str,
        period: ReportingPeriod,
    ) -> EngineResult<AggregationOutcome> {
        let outcome = self.aggregate(federation_id, jurisdiction_id, period)?;
        if !outcome.is_complete() {
            return Err(EngineError::IncompleteAggregation {
                federation_id: federation_id.to_string(),
                pending: outcome.pending,
            });
        }
        Ok(outcome)
    }

    // per_capita = good_standing_count × rate_per_member, clamped to the
    // formula's minimum and cap, rounded to the money scale.
    fn per_capita(
        &self,
        formula: &JurisdictionFormula,
        ret: &AffiliateReturn,
    ) -> EngineResult<Decimal> {
        let raw = self.money.multiply(
            Decimal::from(ret.good_standing_count),
            formula.rate_per_member,
        )?;
        let mut amount = raw;
        if let Some(minimum) = formula.minimum {
            amount = amount.max(minimum);
        }
        if let Some(cap) = formula.cap {
            amount = amount.min(cap);
        }
        Ok(self.money.round_to_scale(amount))
    }
}

fn validate_formula(formula: &JurisdictionFormula) -> EngineResult<()> {
    if formula.rate_per_member < Decimal::ZERO {
        return Err(EngineError::InvalidRule {
            rule_id: formula.id.clone(),
            message: format!(
                "rate_per_member must be non-negative, got {}",
                formula.rate_per_member
            ),
        });
    }
    if let (Some(minimum), Some(cap)) = (formula.minimum, formula.cap) {
        if minimum > cap {
            return Err(EngineError::InvalidRule {
                rule_id: formula.id.clone(),
                message: format!("minimum {} exceeds cap {}", minimum, cap),
            });
        }
    }
    Ok(())
}

fn validate_return(ret: &AffiliateReturn) -> EngineResult<()> {
    if ret.good_standing_count > ret.member_count {
        return Err(EngineError::InvalidAffiliateReturn {
            affiliate_id: ret.affiliate_id.clone(),
            message: format!(
                "good-standing count {} exceeds member count {}",
                ret.good_standing_count, ret.member_count
            ),
        });
    }
    if ret.dues_collected < Decimal::ZERO {
        return Err(EngineError::InvalidAffiliateReturn {
            affiliate_id: ret.affiliate_id.clone(),
            message: format!("dues_collected must be non-negative, got {}", ret.dues_collected),
        });
    }
    Ok(())
}
