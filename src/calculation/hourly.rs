//! Hourly dues calculation.
//!
//! Dues per hour worked, e.g. a rate of `0.50` collects fifty cents for each
//! hour the member worked in the period.

use rust_decimal::Decimal;

use crate::error::EngineResult;
use crate::models::AuditStep;
use crate::money::MoneyContext;

/// The result of an hourly dues calculation.
#[derive(Debug, Clone)]
pub struct HourlyDuesResult {
    /// The computed dues amount (full precision, not yet rounded).
    pub amount: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates dues as `hours_worked * hourly_rate`.
pub fn calculate_hourly_dues(
    hours_worked: Decimal,
    hourly_rate: Decimal,
    money: &MoneyContext,
    step_number: u32,
) -> EngineResult<HourlyDuesResult> {
    let amount = money.multiply(hours_worked, hourly_rate)?;

    let audit_step = AuditStep {
        step_number,
        stage: "hourly_dues".to_string(),
        input: serde_json::json!({
            "hours_worked": hours_worked.normalize().to_string(),
            "hourly_rate": hourly_rate.normalize().to_string(),
        }),
        output: serde_json::json!({
            "amount": amount.normalize().to_string(),
        }),
        reasoning: format!(
            "{} hours × rate {} = {}",
            hours_worked.normalize(),
            hourly_rate.normalize(),
            amount.normalize()
        ),
    };

    Ok(HourlyDuesResult { amount, audit_step })
}
