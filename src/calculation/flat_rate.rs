//! Flat-rate dues calculation.

use rust_decimal::Decimal;

use crate::models::AuditStep;

/// The result of a flat-rate dues calculation.
#[derive(Debug, Clone)]
pub struct FlatRateResult {
    /// The computed dues amount.
    pub amount: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Returns the configured flat amount, independent of the member's facts.
pub fn calculate_flat_rate_dues(amount: Decimal, step_number: u32) -> FlatRateResult {
    let audit_step = AuditStep {
        step_number,
        stage: "flat_rate_dues".to_string(),
        input: serde_json::json!({
            "flat_amount": amount.normalize().to_string(),
        }),
        output: serde_json::json!({
            "amount": amount.normalize().to_string(),
        }),
        reasoning: format!("Flat rate dues: {}", amount.normalize()),
    };

    FlatRateResult { amount, audit_step }
}
