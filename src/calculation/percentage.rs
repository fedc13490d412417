//! Percentage-based dues calculation.
//!
//! Dues as a fraction of gross wages, e.g. a rate of `0.025` collects 2.5%
//! of the member's gross wages for the period.

use rust_decimal::Decimal;

use crate::error::EngineResult;
use crate::models::AuditStep;
use crate::money::MoneyContext;

/// The result of a percentage dues calculation.
#[derive(Debug, Clone)]
pub struct PercentageDuesResult {
    /// The computed dues amount (full precision, not yet rounded).
    pub amount: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates dues as `gross_wages * rate`.
///
/// The rate is a fraction (`0.02` for 2%). The result keeps full precision;
/// rounding happens once, at the final output step of the evaluator.
///
/// # Arguments
///
/// * `gross_wages` - The member's gross wages for the period
/// * `rate` - The fractional dues rate
/// * `money` - The monetary arithmetic context
/// * `step_number` - The starting step number for audit trail sequencing
pub fn calculate_percentage_dues(
    gross_wages: Decimal,
    rate: Decimal,
    money: &MoneyContext,
    step_number: u32,
) -> EngineResult<PercentageDuesResult> {
    let amount = money.multiply(gross_wages, rate)?;

    let audit_step = AuditStep {
        step_number,
        stage: "percentage_dues".to_string(),
        input: serde_json::json!({
            "gross_wages": gross_wages.normalize().to_string(),
            "rate": rate.normalize().to_string(),
        }),
        output: serde_json::json!({
            "amount": amount.normalize().to_string(),
        }),
        reasoning: format!(
            "Gross wages {} × rate {} = {}",
            gross_wages.normalize(),
            rate.normalize(),
            amount.normalize()
        ),
    };

    Ok(PercentageDuesResult { amount, audit_step })
}
