//! Calculation logic for the Dues & Remittance Calculation Engine.
//!
//! This module contains the per-method dues calculation functions
//! (percentage, flat rate, hourly, tiered, and custom formula), the late-fee
//! and arrears policy, and the member evaluator that dispatches a rule
//! against a billing fact and assembles a ledger entry.

mod evaluator;
mod flat_rate;
mod formula;
mod hourly;
mod late_fee;
mod percentage;
mod tiered;

pub use evaluator::evaluate_member;
pub use flat_rate::{FlatRateResult, calculate_flat_rate_dues};
pub use formula::{
    FormulaContext, FormulaDuesResult, MAX_FORMULA_LENGTH, calculate_formula_dues,
    evaluate_formula,
};
pub use hourly::{HourlyDuesResult, calculate_hourly_dues};
pub use late_fee::{LateFeePolicy, LateFeeResult, assess_late_fee};
pub use percentage::{PercentageDuesResult, calculate_percentage_dues};
pub use tiered::{TieredDuesResult, calculate_tiered_dues};
