//! Tiered (progressive bracket) dues calculation.
//!
//! Each bracket `[lower, upper)` taxes the portion of gross wages that falls
//! inside it at the bracket's own rate; the portions are summed. The final
//! bracket has no upper bound. This is the progressive mechanic of tax
//! brackets: increasing wages never decreases the computed amount.

use rust_decimal::Decimal;

use crate::error::EngineResult;
use crate::models::{AuditStep, TierBracket};
use crate::money::MoneyContext;

/// The result of a tiered dues calculation.
#[derive(Debug, Clone)]
pub struct TieredDuesResult {
    /// The computed dues amount (full precision, not yet rounded).
    pub amount: Decimal,
    /// One audit step per bracket that contributed to the amount.
    pub audit_steps: Vec<AuditStep>,
}

/// Calculates dues by progressive bracket application over gross wages.
///
/// Brackets are assumed validated (contiguous, strictly increasing, final
/// bracket open-ended) by [`DuesRule::validate`](crate::models::DuesRule::validate).
///
/// # Example
///
/// ```
/// use dues_engine::calculation::calculate_tiered_dues;
/// use dues_engine::models::TierBracket;
/// use dues_engine::money::MoneyContext;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let brackets = vec![
///     TierBracket {
///         lower: Decimal::ZERO,
///         upper: Some(Decimal::from(1000)),
///         rate: Decimal::from_str("0.02").unwrap(),
///     },
///     TierBracket {
///         lower: Decimal::from(1000),
///         upper: None,
///         rate: Decimal::from_str("0.03").unwrap(),
///     },
/// ];
/// let money = MoneyContext::default();
///
/// // 1000 × 2% + 500 × 3% = 35.00
/// let result = calculate_tiered_dues(Decimal::from(1500), &brackets, &money, 1).unwrap();
/// assert_eq!(money.round_to_scale(result.amount), Decimal::from_str("35.00").unwrap());
/// ```
pub fn calculate_tiered_dues(
    gross_wages: Decimal,
    brackets: &[TierBracket],
    money: &MoneyContext,
    step_number_start: u32,
) -> EngineResult<TieredDuesResult> {
    let mut amount = Decimal::ZERO;
    let mut audit_steps = Vec::new();
    let mut step_number = step_number_start;

    for bracket in brackets {
        if gross_wages <= bracket.lower {
            break;
        }

        let portion_top = match bracket.upper {
            Some(upper) if gross_wages > upper => upper,
            _ => gross_wages,
        };
        let portion = money.subtract(portion_top, bracket.lower)?;
        if portion <= Decimal::ZERO {
            continue;
        }

        let bracket_dues = money.multiply(portion, bracket.rate)?;
        amount = money.add(amount, bracket_dues)?;

        let upper_str = bracket
            .upper
            .map(|u| u.normalize().to_string())
            .unwrap_or_else(|| "open".to_string());

        audit_steps.push(AuditStep {
            step_number,
            stage: "tiered_dues".to_string(),
            input: serde_json::json!({
                "bracket_lower": bracket.lower.normalize().to_string(),
                "bracket_upper": upper_str,
                "rate": bracket.rate.normalize().to_string(),
                "portion": portion.normalize().to_string(),
            }),
            output: serde_json::json!({
                "bracket_dues": bracket_dues.normalize().to_string(),
                "running_total": amount.normalize().to_string(),
            }),
            reasoning: format!(
                "Bracket [{}, {}): {} × {} = {}",
                bracket.lower.normalize(),
                upper_str,
                portion.normalize(),
                bracket.rate.normalize(),
                bracket_dues.normalize()
            ),
        });
        step_number += 1;
    }

    Ok(TieredDuesResult {
        amount,
        audit_steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn two_brackets() -> Vec<TierBracket> {
        vec![
            TierBracket {
                lower: dec("0"),
                upper: Some(dec("1000")),
                rate: dec("0.02"),
            },
            TierBracket {
                lower: dec("1000"),
                upper: None,
                rate: dec("0.03"),
            },
        ]
    }

    /// TD-001: wages 1500 over [0,1000)@2% and [1000,∞)@3% yields 35.00
    #[test]
    fn test_bracket_sum_matches_manual_computation() {
        let money = MoneyContext::default();
        let result = calculate_tiered_dues(dec("1500"), &two_brackets(), &money, 1).unwrap();

        // 1000 × 0.02 + 500 × 0.03 = 20 + 15 = 35
        assert_eq!(money.round_to_scale(result.amount), dec("35.00"));
        assert_eq!(result.audit_steps.len(), 2);
    }

    /// TD-002: wages inside the first bracket touch only that bracket
    #[test]
    fn test_wages_within_first_bracket() {
        let money = MoneyContext::default();
        let result = calculate_tiered_dues(dec("800"), &two_brackets(), &money, 1).unwrap();

        assert_eq!(money.round_to_scale(result.amount), dec("16.00"));
        assert_eq!(result.audit_steps.len(), 1);
    }

    /// TD-003: wages exactly at a boundary belong to the lower bracket
    #[test]
    fn test_wages_at_boundary() {
        let money = MoneyContext::default();
        let result = calculate_tiered_dues(dec("1000"), &two_brackets(), &money, 1).unwrap();

        // Entire 1000 in the first bracket; [1000, ∞) contributes nothing
        assert_eq!(money.round_to_scale(result.amount), dec("20.00"));
        assert_eq!(result.audit_steps.len(), 1);
    }

    /// TD-004: zero wages yield zero dues and no audit steps
    #[test]
    fn test_zero_wages() {
        let money = MoneyContext::default();
        let result = calculate_tiered_dues(Decimal::ZERO, &two_brackets(), &money, 1).unwrap();

        assert_eq!(result.amount, Decimal::ZERO);
        assert!(result.audit_steps.is_empty());
    }

    /// TD-005: three brackets
    #[test]
    fn test_three_brackets() {
        let money = MoneyContext::default();
        let brackets = vec![
            TierBracket {
                lower: dec("0"),
                upper: Some(dec("1000")),
                rate: dec("0.01"),
            },
            TierBracket {
                lower: dec("1000"),
                upper: Some(dec("3000")),
                rate: dec("0.02"),
            },
            TierBracket {
                lower: dec("3000"),
                upper: None,
                rate: dec("0.04"),
            },
        ];

        // 1000×0.01 + 2000×0.02 + 2000×0.04 = 10 + 40 + 80 = 130
        let result = calculate_tiered_dues(dec("5000"), &brackets, &money, 1).unwrap();
        assert_eq!(money.round_to_scale(result.amount), dec("130.00"));
        assert_eq!(result.audit_steps.len(), 3);
    }

    #[test]
    fn test_audit_steps_sequential_from_start() {
        let money = MoneyContext::default();
        let result = calculate_tiered_dues(dec("1500"), &two_brackets(), &money, 4).unwrap();

        assert_eq!(result.audit_steps[0].step_number, 4);
        assert_eq!(result.audit_steps[1].step_number, 5);
    }

    proptest! {
        /// Increasing gross wages never decreases the computed amount.
        #[test]
        fn prop_tiered_is_monotonic(wages_a in 0u64..1_000_000, wages_b in 0u64..1_000_000) {
            let money = MoneyContext::default();
            let brackets = two_brackets();
            let (lo, hi) = if wages_a <= wages_b {
                (wages_a, wages_b)
            } else {
                (wages_b, wages_a)
            };

            let lo_amount =
                calculate_tiered_dues(Decimal::from(lo), &brackets, &money, 1).unwrap().amount;
            let hi_amount =
                calculate_tiered_dues(Decimal::from(hi), &brackets, &money, 1).unwrap().amount;

            prop_assert!(lo_amount <= hi_amount);
        }

        /// The computed amount is never negative.
        #[test]
        fn prop_tiered_is_non_negative(wages in 0u64..1_000_000) {
            let money = MoneyContext::default();
            let amount = calculate_tiered_dues(Decimal::from(wages), &two_brackets(), &money, 1)
                .unwrap()
                .amount;
            prop_assert!(amount >= Decimal::ZERO);
        }
    }
}
