//! Error types for the Dues & Remittance Calculation Engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all failure conditions that can occur during dues calculation,
//! batch runs, and remittance aggregation.

use thiserror::Error;

/// The main error type for the Dues & Remittance Calculation Engine.
///
/// All operations in the engine return this error type, making it easy
/// to handle errors consistently throughout the application.
///
/// # Example
///
/// ```
/// use dues_engine::error::EngineError;
///
/// let error = EngineError::InvalidBillingFact {
///     member_id: "mem_001".to_string(),
///     message: "gross wages cannot be negative".to_string(),
/// };
/// assert_eq!(
///     error.to_string(),
///     "Invalid billing fact for member 'mem_001': gross wages cannot be negative"
/// );
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// A billing fact contained invalid data (e.g., negative wages or hours).
    #[error("Invalid billing fact for member '{member_id}': {message}")]
    InvalidBillingFact {
        /// The member the fact belongs to.
        member_id: String,
        /// A description of what made the fact invalid.
        message: String,
    },

    /// A dues rule was misconfigured (e.g., non-increasing tier boundaries).
    #[error("Invalid dues rule '{rule_id}': {message}")]
    InvalidRule {
        /// The id of the invalid rule.
        rule_id: String,
        /// A description of what made the rule invalid.
        message: String,
    },

    /// A custom formula contained a disallowed token.
    #[error("Unsafe formula: disallowed token '{token}' in '{expression}'")]
    UnsafeFormula {
        /// The offending token.
        token: String,
        /// The full expression that was rejected.
        expression: String,
    },

    /// A custom formula failed during evaluation.
    #[error("Formula evaluation failed for '{expression}': {message}")]
    FormulaEvaluation {
        /// The expression that failed to evaluate.
        expression: String,
        /// A description of the evaluation failure.
        message: String,
    },

    /// Monetary arithmetic failed (division by zero or overflow).
    #[error("Arithmetic error: {message}")]
    Arithmetic {
        /// A description of the arithmetic failure.
        message: String,
    },

    /// A second run was attempted for an organization and period already
    /// being processed.
    #[error("Run conflict: a billing run for organization '{organization_id}' period {period} is already in progress")]
    RunConflict {
        /// The organization with the in-flight run.
        organization_id: String,
        /// The contested billing period, formatted `YYYY-MM`.
        period: String,
    },

    /// Aggregation was forced to `calculated` while affiliate inputs were
    /// still missing.
    #[error("Incomplete aggregation for federation '{federation_id}': pending affiliates: {}", pending.join(", "))]
    IncompleteAggregation {
        /// The federation whose aggregation is incomplete.
        federation_id: String,
        /// Affiliates that have not yet reported.
        pending: Vec<String>,
    },

    /// An affiliate's reported counts were inconsistent.
    #[error("Invalid affiliate return from '{affiliate_id}': {message}")]
    InvalidAffiliateReturn {
        /// The affiliate whose return was rejected.
        affiliate_id: String,
        /// A description of the inconsistency.
        message: String,
    },

    /// No active dues rule was found for an organization and date.
    #[error("No active dues rule for organization '{organization_id}' on {date}")]
    RuleNotFound {
        /// The organization the lookup was for.
        organization_id: String,
        /// The effective date of the lookup, formatted `YYYY-MM-DD`.
        date: String,
    },

    /// No per-capita formula was found for a federation and jurisdiction.
    #[error("No per-capita formula for federation '{federation_id}' jurisdiction '{jurisdiction_id}'")]
    FormulaNotFound {
        /// The federation the lookup was for.
        federation_id: String,
        /// The jurisdiction the lookup was for.
        jurisdiction_id: String,
    },

    /// A collaborator could not supply required inputs (roster, returns).
    #[error("Inputs unavailable from {provider}: {message}")]
    InputsUnavailable {
        /// The collaborator that failed (e.g., "roster provider").
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParse {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },
}

impl EngineError {
    /// Returns a stable machine-readable kind for failure records and API
    /// error codes.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidBillingFact { .. } => "INVALID_BILLING_FACT",
            EngineError::InvalidRule { .. } => "INVALID_RULE",
            EngineError::UnsafeFormula { .. } => "UNSAFE_FORMULA",
            EngineError::FormulaEvaluation { .. } => "FORMULA_EVALUATION",
            EngineError::Arithmetic { .. } => "ARITHMETIC_ERROR",
            EngineError::RunConflict { .. } => "RUN_CONFLICT",
            EngineError::IncompleteAggregation { .. } => "INCOMPLETE_AGGREGATION",
            EngineError::InvalidAffiliateReturn { .. } => "INVALID_AFFILIATE_RETURN",
            EngineError::RuleNotFound { .. } => "RULE_NOT_FOUND",
            EngineError::FormulaNotFound { .. } => "FORMULA_NOT_FOUND",
            EngineError::InputsUnavailable { .. } => "INPUTS_UNAVAILABLE",
            EngineError::ConfigNotFound { .. } => "CONFIG_ERROR",
            EngineError::ConfigParse { .. } => "CONFIG_ERROR",
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
