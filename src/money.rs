//! Fixed-point monetary arithmetic.
//!
//! All currency values in the engine are [`rust_decimal::Decimal`] and flow
//! through a [`MoneyContext`], which enforces a magnitude ceiling on every
//! operation and applies the rounding policy exactly once, at the final
//! output step. Intermediate computations keep full precision.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Default output scale: 2 decimal places (cents).
pub const DEFAULT_SCALE: u32 = 2;

/// Arithmetic context for monetary values.
///
/// # Example
///
/// ```
/// use dues_engine::money::MoneyContext;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let money = MoneyContext::default();
/// let amount = money
///     .multiply(Decimal::from_str("1500").unwrap(), Decimal::from_str("0.025").unwrap())
///     .unwrap();
/// assert_eq!(money.round_to_scale(amount), Decimal::from_str("37.50").unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyContext {
    /// The output scale (decimal places) for final amounts.
    pub scale: u32,
    /// The maximum absolute magnitude any value may reach.
    pub max_magnitude: Decimal,
}

impl Default for MoneyContext {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            // 10^12 per the engine contract
            max_magnitude: Decimal::from(1_000_000_000_000i64),
        }
    }
}

impl MoneyContext {
    /// Creates a context with the given scale and the default magnitude limit.
    pub fn with_scale(scale: u32) -> Self {
        Self {
            scale,
            ..Self::default()
        }
    }

    fn check_magnitude(&self, value: Decimal) -> EngineResult<Decimal> {
        if value.abs() > self.max_magnitude {
            return Err(EngineError::Arithmetic {
                message: format!(
                    "value {} exceeds maximum magnitude {}",
                    value, self.max_magnitude
                ),
            });
        }
        Ok(value)
    }

    /// Adds two monetary values.
    pub fn add(&self, a: Decimal, b: Decimal) -> EngineResult<Decimal> {
        let sum = a.checked_add(b).ok_or_else(|| EngineError::Arithmetic {
            message: format!("overflow adding {} and {}", a, b),
        })?;
        self.check_magnitude(sum)
    }

    /// Subtracts `b` from `a`.
    pub fn subtract(&self, a: Decimal, b: Decimal) -> EngineResult<Decimal> {
        let diff = a.checked_sub(b).ok_or_else(|| EngineError::Arithmetic {
            message: format!("overflow subtracting {} from {}", b, a),
        })?;
        self.check_magnitude(diff)
    }

    /// Multiplies two values (e.g., wages by a fractional rate).
    pub fn multiply(&self, a: Decimal, b: Decimal) -> EngineResult<Decimal> {
        let product = a.checked_mul(b).ok_or_else(|| EngineError::Arithmetic {
            message: format!("overflow multiplying {} by {}", a, b),
        })?;
        self.check_magnitude(product)
    }

    /// Divides `amount * numerator / denominator`, for prorating an amount
    /// across a partial period.
    ///
    /// Fails with an arithmetic error when `denominator` is zero.
    pub fn divide_prorated(
        &self,
        amount: Decimal,
        numerator: Decimal,
        denominator: Decimal,
    ) -> EngineResult<Decimal> {
        if denominator.is_zero() {
            return Err(EngineError::Arithmetic {
                message: "division by zero in proration".to_string(),
            });
        }
        let scaled = self.multiply(amount, numerator)?;
        let result = scaled
            .checked_div(denominator)
            .ok_or_else(|| EngineError::Arithmetic {
                message: format!("overflow dividing {} by {}", scaled, denominator),
            })?;
        self.check_magnitude(result)
    }

    /// Rounds a value to an explicit scale, half-up (midpoint away from zero).
    pub fn round_to(&self, value: Decimal, scale: u32) -> Decimal {
        value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Rounds a value to the context's configured output scale.
    pub fn round_to_scale(&self, value: Decimal) -> Decimal {
        self.round_to(value, self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_default_scale_is_two() {
        let money = MoneyContext::default();
        assert_eq!(money.scale, 2);
        assert_eq!(money.max_magnitude, dec("1000000000000"));
    }

    #[test]
    fn test_add_and_subtract() {
        let money = MoneyContext::default();
        assert_eq!(money.add(dec("10.25"), dec("0.75")).unwrap(), dec("11.00"));
        assert_eq!(
            money.subtract(dec("10.25"), dec("0.25")).unwrap(),
            dec("10.00")
        );
    }

    #[test]
    fn test_multiply_keeps_full_precision() {
        let money = MoneyContext::default();
        // Intermediate values are not rounded
        let result = money.multiply(dec("28.54"), dec("1.875")).unwrap();
        assert_eq!(result, dec("53.5125"));
    }

    #[test]
    fn test_round_half_up_at_midpoint() {
        let money = MoneyContext::default();
        assert_eq!(money.round_to_scale(dec("2.005")), dec("2.01"));
        assert_eq!(money.round_to_scale(dec("2.004")), dec("2.00"));
        assert_eq!(money.round_to(dec("2.0049"), 3), dec("2.005"));
    }

    #[test]
    fn test_divide_prorated() {
        let money = MoneyContext::default();
        // 30.00 prorated 10/30 days = 10.00
        let result = money
            .divide_prorated(dec("30.00"), dec("10"), dec("30"))
            .unwrap();
        assert_eq!(money.round_to_scale(result), dec("10.00"));
    }

    #[test]
    fn test_divide_by_zero_is_arithmetic_error() {
        let money = MoneyContext::default();
        let result = money.divide_prorated(dec("30.00"), dec("1"), Decimal::ZERO);
        match result.unwrap_err() {
            EngineError::Arithmetic { message } => {
                assert!(message.contains("division by zero"));
            }
            other => panic!("Expected Arithmetic, got {:?}", other),
        }
    }

    #[test]
    fn test_magnitude_limit_enforced() {
        let money = MoneyContext::default();
        let huge = dec("999999999999");
        let result = money.multiply(huge, dec("2"));
        match result.unwrap_err() {
            EngineError::Arithmetic { message } => {
                assert!(message.contains("maximum magnitude"));
            }
            other => panic!("Expected Arithmetic, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_magnitude_also_limited() {
        let money = MoneyContext::default();
        let result = money.multiply(dec("-999999999999"), dec("2"));
        assert!(result.is_err());
    }
}
