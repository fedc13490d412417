//! Dues rule model and related types.
//!
//! A [`DuesRule`] carries exactly one calculation method's parameter set as a
//! tagged union, so a rule can never be populated for two methods at once.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// The calculation method a rule uses, as recorded on ledger entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMethod {
    /// Percentage of gross wages.
    Percentage,
    /// Fixed amount per period.
    Flat,
    /// Rate per hour worked.
    Hourly,
    /// Progressive brackets over gross wages.
    Tiered,
    /// Custom arithmetic formula.
    Formula,
}

/// One bracket of a tiered (progressive) dues structure.
///
/// The bracket covers gross wages in `[lower, upper)`; the final bracket of a
/// rule has no upper bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBracket {
    /// Inclusive lower wage boundary.
    pub lower: Decimal,
    /// Exclusive upper wage boundary; `None` for the open-ended final bracket.
    pub upper: Option<Decimal>,
    /// Fractional rate applied to the wage portion inside this bracket
    /// (e.g., `0.02` for 2%).
    pub rate: Decimal,
}

/// Flat additional amounts a rule collects on top of base dues.
///
/// COPE, PAC, and strike-fund contributions are recurring and are added to
/// each billable member's total. The initiation fee is folded into the base
/// dues amount when positive (new-member onboarding periods).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionSchedule {
    /// Committee on Political Education contribution per period.
    #[serde(default)]
    pub cope: Decimal,
    /// Political action committee contribution per period.
    #[serde(default)]
    pub pac: Decimal,
    /// Strike fund contribution per period.
    #[serde(default)]
    pub strike_fund: Decimal,
    /// One-time initiation fee, folded into base dues when positive.
    #[serde(default)]
    pub initiation_fee: Decimal,
}

impl ContributionSchedule {
    /// True when any recurring contribution (COPE, PAC, strike fund) is set.
    pub fn has_recurring(&self) -> bool {
        !self.cope.is_zero() || !self.pac.is_zero() || !self.strike_fund.is_zero()
    }
}

/// The method-specific parameters of a dues rule.
///
/// Exactly one variant is populated by construction.
///
/// # Example
///
/// ```
/// use dues_engine::models::RuleMethod;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let method = RuleMethod::Percentage {
///     rate: Decimal::from_str("0.025").unwrap(),
/// };
/// let json = serde_json::to_string(&method).unwrap();
/// assert!(json.contains("\"method\":\"percentage\""));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum RuleMethod {
    /// Dues as a fraction of gross wages (e.g., `0.02` for 2%).
    Percentage {
        /// The fractional rate applied to gross wages.
        rate: Decimal,
    },
    /// A fixed amount per billing period, independent of facts.
    Flat {
        /// The flat dues amount.
        amount: Decimal,
    },
    /// Dues per hour worked.
    Hourly {
        /// The rate per hour worked.
        rate: Decimal,
    },
    /// Progressive brackets over gross wages.
    Tiered {
        /// The brackets, ordered by ascending lower boundary.
        brackets: Vec<TierBracket>,
    },
    /// A custom arithmetic expression over a fixed variable set.
    Formula {
        /// The expression, over `grossWages`, `hoursWorked` and `baseDues`.
        expression: String,
        /// The constant bound to the `baseDues` variable.
        #[serde(default)]
        base_dues: Decimal,
    },
}

impl RuleMethod {
    /// Returns the method tag for ledger entries.
    pub fn calculation_method(&self) -> CalculationMethod {
        match self {
            RuleMethod::Percentage { .. } => CalculationMethod::Percentage,
            RuleMethod::Flat { .. } => CalculationMethod::Flat,
            RuleMethod::Hourly { .. } => CalculationMethod::Hourly,
            RuleMethod::Tiered { .. } => CalculationMethod::Tiered,
            RuleMethod::Formula { .. } => CalculationMethod::Formula,
        }
    }
}

/// A dues calculation rule for an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuesRule {
    /// Unique identifier for the rule.
    pub id: String,
    /// The organization this rule belongs to.
    pub organization_id: String,
    /// The calculation method and its parameters.
    #[serde(flatten)]
    pub method: RuleMethod,
    /// Additional contributions collected alongside base dues.
    #[serde(default)]
    pub contributions: ContributionSchedule,
    /// ISO 4217 currency code (e.g., "CAD").
    pub currency: String,
    /// First date (inclusive) the rule is effective.
    pub effective_from: NaiveDate,
    /// Last date (inclusive) the rule is effective; `None` if open-ended.
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    /// Monotonically increasing rule version, recorded on ledger entries.
    pub version: u32,
}

impl DuesRule {
    /// Returns true if the rule is effective on the given date.
    pub fn is_effective(&self, date: NaiveDate) -> bool {
        if date < self.effective_from {
            return false;
        }
        match self.effective_to {
            Some(end) => date <= end,
            None => true,
        }
    }

    /// Validates the rule's structural invariants.
    ///
    /// Tiered rules must have at least one bracket, contiguous strictly
    /// increasing boundaries, and an open-ended final bracket. Rates and
    /// amounts must be non-negative for every method.
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |message: String| EngineError::InvalidRule {
            rule_id: self.id.clone(),
            message,
        };

        match &self.method {
            RuleMethod::Percentage { rate } | RuleMethod::Hourly { rate } => {
                if rate.is_sign_negative() {
                    return Err(invalid("rate cannot be negative".to_string()));
                }
            }
            RuleMethod::Flat { amount } => {
                if amount.is_sign_negative() {
                    return Err(invalid("flat amount cannot be negative".to_string()));
                }
            }
            RuleMethod::Tiered { brackets } => {
                if brackets.is_empty() {
                    return Err(invalid("tiered rule requires at least one bracket".to_string()));
                }
                for (i, bracket) in brackets.iter().enumerate() {
                    if bracket.rate.is_sign_negative() {
                        return Err(invalid(format!("bracket {} rate cannot be negative", i)));
                    }
                    let is_last = i == brackets.len() - 1;
                    match bracket.upper {
                        Some(upper) if upper <= bracket.lower => {
                            return Err(invalid(format!(
                                "bracket {} upper boundary {} must exceed lower boundary {}",
                                i, upper, bracket.lower
                            )));
                        }
                        Some(upper) => {
                            if is_last {
                                return Err(invalid(
                                    "final bracket must be open-ended".to_string(),
                                ));
                            }
                            if brackets[i + 1].lower != upper {
                                return Err(invalid(format!(
                                    "bracket {} upper boundary {} does not meet next lower boundary {}",
                                    i,
                                    upper,
                                    brackets[i + 1].lower
                                )));
                            }
                        }
                        None if !is_last => {
                            return Err(invalid(format!(
                                "bracket {} is open-ended but not the final bracket",
                                i
                            )));
                        }
                        None => {}
                    }
                }
            }
            RuleMethod::Formula { expression, .. } => {
                if expression.trim().is_empty() {
                    return Err(invalid("formula expression cannot be empty".to_string()));
                }
            }
        }

        for (name, amount) in [
            ("cope", self.contributions.cope),
            ("pac", self.contributions.pac),
            ("strike_fund", self.contributions.strike_fund),
            ("initiation_fee", self.contributions.initiation_fee),
        ] {
            if amount.is_sign_negative() {
                return Err(invalid(format!(
                    "{} contribution cannot be negative",
                    name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn rule_with(method: RuleMethod) -> DuesRule {
        DuesRule {
            id: "rule_001".to_string(),
            organization_id: "local_456".to_string(),
            method,
            contributions: ContributionSchedule::default(),
            currency: "CAD".to_string(),
            effective_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            effective_to: None,
            version: 1,
        }
    }

    #[test]
    fn test_method_union_serializes_with_tag() {
        let rule = rule_with(RuleMethod::Percentage { rate: dec("0.025") });
        let json = serde_json::to_string(&rule).unwrap();
        assert!(json.contains("\"method\":\"percentage\""));
        assert!(json.contains("\"rate\":\"0.025\""));
    }

    #[test]
    fn test_method_union_deserializes_exactly_one_variant() {
        let json = r#"{
            "id": "rule_002",
            "organization_id": "local_456",
            "method": "tiered",
            "brackets": [
                { "lower": "0", "upper": "1000", "rate": "0.02" },
                { "lower": "1000", "upper": null, "rate": "0.03" }
            ],
            "currency": "CAD",
            "effective_from": "2025-01-01",
            "version": 3
        }"#;

        let rule: DuesRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.method.calculation_method(), CalculationMethod::Tiered);
        assert_eq!(rule.version, 3);
        match &rule.method {
            RuleMethod::Tiered { brackets } => assert_eq!(brackets.len(), 2),
            other => panic!("Expected Tiered, got {:?}", other),
        }
    }

    #[test]
    fn test_is_effective_respects_date_range() {
        let mut rule = rule_with(RuleMethod::Flat { amount: dec("25.00") });
        rule.effective_to = Some(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());

        assert!(!rule.is_effective(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
        assert!(rule.is_effective(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
        assert!(rule.is_effective(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()));
        assert!(!rule.is_effective(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()));
    }

    #[test]
    fn test_validate_accepts_contiguous_brackets() {
        let rule = rule_with(RuleMethod::Tiered {
            brackets: vec![
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
            ],
        });
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_increasing_boundaries() {
        let rule = rule_with(RuleMethod::Tiered {
            brackets: vec![
                TierBracket {
                    lower: dec("1000"),
                    upper: Some(dec("1000")),
                    rate: dec("0.02"),
                },
                TierBracket {
                    lower: dec("1000"),
                    upper: None,
                    rate: dec("0.03"),
                },
            ],
        });
        match rule.validate().unwrap_err() {
            EngineError::InvalidRule { message, .. } => {
                assert!(message.contains("must exceed lower boundary"));
            }
            other => panic!("Expected InvalidRule, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_gap_between_brackets() {
        let rule = rule_with(RuleMethod::Tiered {
            brackets: vec![
                TierBracket {
                    lower: dec("0"),
                    upper: Some(dec("500")),
                    rate: dec("0.02"),
                },
                TierBracket {
                    lower: dec("1000"),
                    upper: None,
                    rate: dec("0.03"),
                },
            ],
        });
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_closed_final_bracket() {
        let rule = rule_with(RuleMethod::Tiered {
            brackets: vec![TierBracket {
                lower: dec("0"),
                upper: Some(dec("1000")),
                rate: dec("0.02"),
            }],
        });
        match rule.validate().unwrap_err() {
            EngineError::InvalidRule { message, .. } => {
                assert!(message.contains("open-ended"));
            }
            other => panic!("Expected InvalidRule, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_negative_rate() {
        let rule = rule_with(RuleMethod::Percentage { rate: dec("-0.01") });
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_contributions_default_to_zero_when_absent() {
        let json = r#"{
            "id": "rule_003",
            "organization_id": "local_456",
            "method": "flat",
            "amount": "25.00",
            "currency": "CAD",
            "effective_from": "2025-01-01",
            "version": 1
        }"#;

        let rule: DuesRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.contributions, ContributionSchedule::default());
        assert!(!rule.contributions.has_recurring());
    }

    #[test]
    fn test_validate_rejects_negative_contribution() {
        let mut rule = rule_with(RuleMethod::Flat { amount: dec("25.00") });
        rule.contributions.cope = dec("-2.00");
        match rule.validate().unwrap_err() {
            EngineError::InvalidRule { message, .. } => {
                assert!(message.contains("cope"));
            }
            other => panic!("Expected InvalidRule, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_empty_formula() {
        let rule = rule_with(RuleMethod::Formula {
            expression: "   ".to_string(),
            base_dues: Decimal::ZERO,
        });
        assert!(rule.validate().is_err());
    }
}
