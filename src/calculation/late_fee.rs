//! Late-fee assessment over a member's arrears balance.
//!
//! A fee is only assessed when the member carries prior arrears AND is past
//! the grace period. Fees never compound: the percentage component applies
//! to the prior arrears balance only, never to previously assessed fees or
//! to the current period's base dues.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::AuditStep;
use crate::money::MoneyContext;

/// Configuration for late-fee assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LateFeePolicy {
    /// Days overdue before any fee applies.
    pub grace_period_days: i64,
    /// Length of one overdue period in days.
    #[serde(default = "default_period_length_days")]
    pub period_length_days: i64,
    /// Flat fee charged per overdue period, if configured.
    #[serde(default)]
    pub flat_fee_per_period: Option<Decimal>,
    /// Fractional rate applied to the prior arrears balance, if configured.
    #[serde(default)]
    pub balance_rate: Option<Decimal>,
    /// When both components are configured: sum them if true, otherwise
    /// apply whichever is larger.
    #[serde(default)]
    pub stack: bool,
}

fn default_period_length_days() -> i64 {
    30
}

impl Default for LateFeePolicy {
    fn default() -> Self {
        Self {
            grace_period_days: 30,
            period_length_days: default_period_length_days(),
            flat_fee_per_period: None,
            balance_rate: None,
            stack: false,
        }
    }
}

impl LateFeePolicy {
    /// Validates the policy configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.grace_period_days < 0 {
            return Err(EngineError::Arithmetic {
                message: format!(
                    "grace_period_days must be non-negative, got {}",
                    self.grace_period_days
                ),
            });
        }
        if self.period_length_days <= 0 {
            return Err(EngineError::Arithmetic {
                message: format!(
                    "period_length_days must be positive, got {}",
                    self.period_length_days
                ),
            });
        }
        for (name, value) in [
            ("flat_fee_per_period", self.flat_fee_per_period),
            ("balance_rate", self.balance_rate),
        ] {
            if let Some(v) = value {
                if v < Decimal::ZERO {
                    return Err(EngineError::Arithmetic {
                        message: format!("{} must be non-negative, got {}", name, v),
                    });
                }
            }
        }
        Ok(())
    }
}

/// The result of a late-fee assessment.
#[derive(Debug, Clone)]
pub struct LateFeeResult {
    /// The assessed fee (zero within grace or with no prior arrears).
    pub late_fee: Decimal,
    /// The member's arrears balance after this billing:
    /// prior arrears + current base dues + assessed fee.
    pub updated_arrears: Decimal,
    /// The audit step recording this assessment.
    pub audit_step: AuditStep,
}

/// Assesses a late fee against a member's prior arrears balance.
///
/// No fee is assessed when `days_overdue` is within the grace period or
/// when there is no positive prior arrears balance. Past the grace period,
/// the flat component charges per started overdue period and the percentage
/// component applies once to the prior arrears balance.
pub fn assess_late_fee(
    policy: &LateFeePolicy,
    base_amount: Decimal,
    prior_arrears: Decimal,
    days_overdue: i64,
    money: &MoneyContext,
    step_number: u32,
) -> EngineResult<LateFeeResult> {
    policy.validate()?;

    let within_grace = days_overdue <= policy.grace_period_days;
    let no_arrears = prior_arrears <= Decimal::ZERO;

    let (late_fee, reasoning) = if within_grace || no_arrears {
        let reason = if no_arrears {
            "No prior arrears balance; no late fee assessed".to_string()
        } else {
            format!(
                "{} days overdue is within the {}-day grace period; no late fee assessed",
                days_overdue, policy.grace_period_days
            )
        };
        (Decimal::ZERO, reason)
    } else {
        let days_past_grace = days_overdue - policy.grace_period_days;
        // Ceiling division; both operands are validated positive above.
        let overdue_periods =
            ((days_past_grace + policy.period_length_days - 1) / policy.period_length_days).max(1);

        let flat_component = match policy.flat_fee_per_period {
            Some(fee) => Some(money.multiply(fee, Decimal::from(overdue_periods))?),
            None => None,
        };
        let rate_component = match policy.balance_rate {
            Some(rate) => Some(money.multiply(prior_arrears, rate)?),
            None => None,
        };

        let (fee, how) = match (flat_component, rate_component) {
            (Some(flat), Some(pct)) if policy.stack => {
                (money.add(flat, pct)?, format!("flat {} + rate {}", flat, pct))
            }
            (Some(flat), Some(pct)) => {
                let larger = flat.max(pct);
                (larger, format!("larger of flat {} and rate {}", flat, pct))
            }
            (Some(flat), None) => (flat, format!("flat {}", flat)),
            (None, Some(pct)) => (pct, format!("rate {}", pct)),
            (None, None) => (Decimal::ZERO, "no fee components configured".to_string()),
        };

        (
            fee,
            format!(
                "{} days overdue ({} overdue period(s) past grace): {}",
                days_overdue, overdue_periods, how
            ),
        )
    };

    let updated_arrears = money.add(money.add(prior_arrears, base_amount)?, late_fee)?;

    let audit_step = AuditStep {
        step_number,
        stage: "late_fee".to_string(),
        input: serde_json::json!({
            "prior_arrears": prior_arrears.normalize().to_string(),
            "base_amount": base_amount.normalize().to_string(),
            "days_overdue": days_overdue,
            "grace_period_days": policy.grace_period_days,
        }),
        output: serde_json::json!({
            "late_fee": late_fee.normalize().to_string(),
            "updated_arrears": updated_arrears.normalize().to_string(),
        }),
        reasoning,
    };

    Ok(LateFeeResult {
        late_fee,
        updated_arrears,
        audit_step,
    })
}
