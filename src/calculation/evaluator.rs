//! Single-member dues evaluation.
//!
//! Validates the rule and the billing fact, dispatches to the configured
//! calculation method (or applies a manual override), folds in the rule's
//! initiation fee and recurring contributions, assesses late fees, and
//! assembles the full [`LedgerEntry`] with its audit trace. Rounding happens
//! once, here, at the final output: intermediate amounts keep full precision.

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::calculation::{
    FormulaContext, LateFeePolicy, assess_late_fee, calculate_flat_rate_dues,
    calculate_formula_dues, calculate_hourly_dues, calculate_percentage_dues,
    calculate_tiered_dues,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditStep, DuesRule, LedgerEntry, MemberBillingFact, MembershipStatus, RuleMethod, SkipReason,
};
use crate::money::MoneyContext;

fn validate_fact(fact: &MemberBillingFact, rule: &DuesRule) -> EngineResult<()> {
    if fact.organization_id != rule.organization_id {
        return Err(EngineError::InvalidBillingFact {
            member_id: fact.member_id.clone(),
            message: format!(
                "fact belongs to organization '{}' but rule '{}' belongs to '{}'",
                fact.organization_id, rule.id, rule.organization_id
            ),
        });
    }
    if fact.gross_wages < Decimal::ZERO {
        return Err(EngineError::InvalidBillingFact {
            member_id: fact.member_id.clone(),
            message: format!("gross_wages must be non-negative, got {}", fact.gross_wages),
        });
    }
    if fact.hours_worked < Decimal::ZERO {
        return Err(EngineError::InvalidBillingFact {
            member_id: fact.member_id.clone(),
            message: format!(
                "hours_worked must be non-negative, got {}",
                fact.hours_worked
            ),
        });
    }
    if let Some(amount) = fact.dues_override {
        if amount < Decimal::ZERO {
            return Err(EngineError::InvalidBillingFact {
                member_id: fact.member_id.clone(),
                message: format!("dues_override must be non-negative, got {}", amount),
            });
        }
    }
    Ok(())
}

fn skipped_entry(
    rule: &DuesRule,
    fact: &MemberBillingFact,
    reason: SkipReason,
    run_id: Uuid,
) -> LedgerEntry {
    let audit_step = AuditStep {
        step_number: 1,
        stage: "status_check".to_string(),
        input: serde_json::json!({
            "member_id": fact.member_id,
            "status": fact.status,
        }),
        output: serde_json::json!({
            "skipped": reason,
            "total_due": "0",
        }),
        reasoning: format!(
            "Member status {:?} is not billable; zero-amount entry recorded",
            fact.status
        ),
    };

    LedgerEntry {
        entry_id: Uuid::new_v4(),
        run_id,
        member_id: fact.member_id.clone(),
        organization_id: fact.organization_id.clone(),
        period: fact.period,
        base_amount: Decimal::ZERO,
        cope: Decimal::ZERO,
        pac: Decimal::ZERO,
        strike_fund: Decimal::ZERO,
        late_fee: Decimal::ZERO,
        total_due: Decimal::ZERO,
        updated_arrears: fact.arrears_balance,
        method: rule.method.calculation_method(),
        skipped: Some(reason),
        rule_id: rule.id.clone(),
        rule_version: rule.version,
        timestamp: Utc::now(),
        audit: vec![audit_step],
    }
}

/// Evaluates one member's dues obligation under the given rule and late-fee
/// policy, producing a complete ledger entry.
///
/// Members whose status is not billable (inactive, suspended, exempt) get a
/// zero-amount entry marked with the skip reason rather than being dropped;
/// a roster of N members always yields N ledger outcomes.
pub fn evaluate_member(
    rule: &DuesRule,
    fact: &MemberBillingFact,
    policy: &LateFeePolicy,
    money: &MoneyContext,
    run_id: Uuid,
) -> EngineResult<LedgerEntry> {
    rule.validate()?;
    validate_fact(fact, rule)?;

    match fact.status {
        MembershipStatus::Active => {}
        MembershipStatus::Inactive => {
            return Ok(skipped_entry(rule, fact, SkipReason::Inactive, run_id));
        }
        MembershipStatus::Suspended => {
            return Ok(skipped_entry(rule, fact, SkipReason::Suspended, run_id));
        }
        MembershipStatus::Exempt => {
            return Ok(skipped_entry(rule, fact, SkipReason::Exempt, run_id));
        }
    }

    let mut audit: Vec<AuditStep> = Vec::new();

    let base_raw = if let Some(override_amount) = fact.dues_override {
        audit.push(AuditStep {
            step_number: 1,
            stage: "manual_override".to_string(),
            input: serde_json::json!({
                "member_id": fact.member_id,
                "dues_override": override_amount.normalize().to_string(),
            }),
            output: serde_json::json!({
                "amount": override_amount.normalize().to_string(),
            }),
            reasoning: format!(
                "Manual override set for this member and period; base dues {} replace the {:?} calculation",
                override_amount.normalize(),
                rule.method.calculation_method()
            ),
        });
        override_amount
    } else {
        match &rule.method {
            RuleMethod::Percentage { rate } => {
                let result = calculate_percentage_dues(fact.gross_wages, *rate, money, 1)?;
                audit.push(result.audit_step);
                result.amount
            }
            RuleMethod::Flat { amount } => {
                let result = calculate_flat_rate_dues(*amount, 1);
                audit.push(result.audit_step);
                result.amount
            }
            RuleMethod::Hourly { rate } => {
                let result = calculate_hourly_dues(fact.hours_worked, *rate, money, 1)?;
                audit.push(result.audit_step);
                result.amount
            }
            RuleMethod::Tiered { brackets } => {
                let result = calculate_tiered_dues(fact.gross_wages, brackets, money, 1)?;
                audit.extend(result.audit_steps);
                result.amount
            }
            RuleMethod::Formula {
                expression,
                base_dues,
            } => {
                let ctx = FormulaContext {
                    gross_wages: fact.gross_wages,
                    hours_worked: fact.hours_worked,
                    base_dues: *base_dues,
                };
                let result = calculate_formula_dues(expression, &ctx, money, 1)?;
                audit.push(result.audit_step);
                result.amount
            }
        }
    };

    let initiation_fee = rule.contributions.initiation_fee;
    let base_raw = if initiation_fee > Decimal::ZERO {
        let with_fee = money.add(base_raw, initiation_fee)?;
        let step_number = audit.last().map(|s| s.step_number + 1).unwrap_or(2);
        audit.push(AuditStep {
            step_number,
            stage: "initiation_fee".to_string(),
            input: serde_json::json!({
                "base_dues": base_raw.normalize().to_string(),
                "initiation_fee": initiation_fee.normalize().to_string(),
            }),
            output: serde_json::json!({
                "base_dues": with_fee.normalize().to_string(),
            }),
            reasoning: format!(
                "Initiation fee {} added to base dues",
                initiation_fee.normalize()
            ),
        });
        with_fee
    } else {
        base_raw
    };

    let base_amount = money.round_to_scale(base_raw);

    let cope = money.round_to_scale(rule.contributions.cope);
    let pac = money.round_to_scale(rule.contributions.pac);
    let strike_fund = money.round_to_scale(rule.contributions.strike_fund);
    let contributions_total = money.add(money.add(cope, pac)?, strike_fund)?;
    if rule.contributions.has_recurring() {
        let step_number = audit.last().map(|s| s.step_number + 1).unwrap_or(2);
        audit.push(AuditStep {
            step_number,
            stage: "contributions".to_string(),
            input: serde_json::json!({
                "cope": cope.normalize().to_string(),
                "pac": pac.normalize().to_string(),
                "strike_fund": strike_fund.normalize().to_string(),
            }),
            output: serde_json::json!({
                "contributions_total": contributions_total.normalize().to_string(),
            }),
            reasoning: format!(
                "Contributions {} = COPE {} + PAC {} + strike fund {}",
                contributions_total.normalize(),
                cope.normalize(),
                pac.normalize(),
                strike_fund.normalize()
            ),
        });
    }

    let next_step = audit.last().map(|s| s.step_number + 1).unwrap_or(2);
    let fee_result = assess_late_fee(
        policy,
        base_amount,
        fact.arrears_balance,
        fact.days_overdue,
        money,
        next_step,
    )?;
    audit.push(fee_result.audit_step);

    let late_fee = money.round_to_scale(fee_result.late_fee);
    let total_due = money.add(money.add(base_amount, contributions_total)?, late_fee)?;
    let updated_arrears = money.round_to_scale(fee_result.updated_arrears);

    audit.push(AuditStep {
        step_number: next_step + 1,
        stage: "total_due".to_string(),
        input: serde_json::json!({
            "base_amount": base_amount.normalize().to_string(),
            "contributions": contributions_total.normalize().to_string(),
            "late_fee": late_fee.normalize().to_string(),
        }),
        output: serde_json::json!({
            "total_due": total_due.normalize().to_string(),
            "updated_arrears": updated_arrears.normalize().to_string(),
        }),
        reasoning: format!(
            "Total due {} = base {} + contributions {} + late fee {}",
            total_due.normalize(),
            base_amount.normalize(),
            contributions_total.normalize(),
            late_fee.normalize()
        ),
    });

    Ok(LedgerEntry {
        entry_id: Uuid::new_v4(),
        run_id,
        member_id: fact.member_id.clone(),
        organization_id: fact.organization_id.clone(),
        period: fact.period,
        base_amount,
        cope,
        pac,
        strike_fund,
        late_fee,
        total_due,
        updated_arrears,
        method: rule.method.calculation_method(),
        skipped: None,
        rule_id: rule.id.clone(),
        rule_version: rule.version,
        timestamp: Utc::now(),
        audit,
    })
}
