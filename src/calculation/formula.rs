//! Custom formula dues calculation.
//!
//! Formulas are evaluated by a restricted grammar interpreter: a tokenizer
//! and a recursive-descent parser over arithmetic operators, parentheses,
//! decimal literals, and the fixed variable set `grossWages`, `hoursWorked`,
//! `baseDues`. There is no general-purpose evaluator behind this module; any
//! token outside the grammar is rejected before evaluation, which removes
//! the injection risk the "custom formula" feature would otherwise carry.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::AuditStep;
use crate::money::MoneyContext;

/// Maximum accepted formula length in characters.
pub const MAX_FORMULA_LENGTH: usize = 500;

/// The variable bindings a formula may reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormulaContext {
    /// Bound to the `grossWages` variable.
    pub gross_wages: Decimal,
    /// Bound to the `hoursWorked` variable.
    pub hours_worked: Decimal,
    /// Bound to the `baseDues` variable.
    pub base_dues: Decimal,
}

/// The result of a formula dues calculation.
#[derive(Debug, Clone)]
pub struct FormulaDuesResult {
    /// The computed dues amount (clamped to zero if the formula evaluated
    /// negative; full precision, not yet rounded).
    pub amount: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Variable {
    GrossWages,
    HoursWorked,
    BaseDues,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Decimal),
    Variable(Variable),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn unsafe_token(token: impl Into<String>, expression: &str) -> EngineError {
    EngineError::UnsafeFormula {
        token: token.into(),
        expression: expression.to_string(),
    }
}

fn eval_error(expression: &str, message: impl Into<String>) -> EngineError {
    EngineError::FormulaEvaluation {
        expression: expression.to_string(),
        message: message.into(),
    }
}

fn tokenize(expression: &str) -> EngineResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expression.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let number = literal
                    .parse::<Decimal>()
                    .map_err(|_| unsafe_token(literal.clone(), expression))?;
                tokens.push(Token::Number(number));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let variable = match ident.as_str() {
                    "grossWages" => Variable::GrossWages,
                    "hoursWorked" => Variable::HoursWorked,
                    "baseDues" => Variable::BaseDues,
                    _ => return Err(unsafe_token(ident, expression)),
                };
                tokens.push(Token::Variable(variable));
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            other => return Err(unsafe_token(other.to_string(), expression)),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    expression: &'a str,
    ctx: &'a FormulaContext,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> EngineResult<Decimal> {
        let mut value = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    value = value.checked_add(rhs).ok_or_else(|| {
                        eval_error(self.expression, "arithmetic overflow")
                    })?;
                }
                Token::Minus => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    value = value.checked_sub(rhs).ok_or_else(|| {
                        eval_error(self.expression, "arithmetic overflow")
                    })?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self) -> EngineResult<Decimal> {
        let mut value = self.factor()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.pos += 1;
                    let rhs = self.factor()?;
                    value = value.checked_mul(rhs).ok_or_else(|| {
                        eval_error(self.expression, "arithmetic overflow")
                    })?;
                }
                Token::Slash => {
                    self.pos += 1;
                    let rhs = self.factor()?;
                    if rhs.is_zero() {
                        return Err(eval_error(self.expression, "division by zero"));
                    }
                    value = value.checked_div(rhs).ok_or_else(|| {
                        eval_error(self.expression, "arithmetic overflow")
                    })?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // factor := number | variable | '(' expression ')' | '-' factor
    fn factor(&mut self) -> EngineResult<Decimal> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Variable(var)) => Ok(match var {
                Variable::GrossWages => self.ctx.gross_wages,
                Variable::HoursWorked => self.ctx.hours_worked,
                Variable::BaseDues => self.ctx.base_dues,
            }),
            Some(Token::LParen) => {
                let value = self.expression()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(eval_error(self.expression, "expected closing parenthesis")),
                }
            }
            Some(Token::Minus) => {
                let value = self.factor()?;
                Ok(-value)
            }
            Some(other) => Err(eval_error(
                self.expression,
                format!("unexpected token {:?}", other),
            )),
            None => Err(eval_error(self.expression, "unexpected end of expression")),
        }
    }
}

/// Evaluates a formula against the given variable bindings.
///
/// Fails with [`EngineError::UnsafeFormula`] on any disallowed token
/// (unknown identifiers, property access, function calls) and with
/// [`EngineError::FormulaEvaluation`] on syntax errors, division by zero,
/// or arithmetic overflow.
///
/// # Example
///
/// ```
/// use dues_engine::calculation::{FormulaContext, evaluate_formula};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let ctx = FormulaContext {
///     gross_wages: Decimal::from(4200),
///     hours_worked: Decimal::from(152),
///     base_dues: Decimal::ZERO,
/// };
/// let amount = evaluate_formula("grossWages * 0.02 + 5", &ctx).unwrap();
/// assert_eq!(amount, Decimal::from_str("89.00").unwrap());
/// ```
pub fn evaluate_formula(expression: &str, ctx: &FormulaContext) -> EngineResult<Decimal> {
    if expression.len() > MAX_FORMULA_LENGTH {
        return Err(eval_error(
            expression,
            format!("expression exceeds {} characters", MAX_FORMULA_LENGTH),
        ));
    }

    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(eval_error(expression, "empty expression"));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        expression,
        ctx,
    };
    let value = parser.expression()?;

    if parser.pos != parser.tokens.len() {
        return Err(eval_error(expression, "unexpected trailing tokens"));
    }

    Ok(value)
}

/// Calculates dues from a custom formula.
///
/// A negative result is clamped to zero and noted in the audit trace; dues
/// obligations are never negative.
pub fn calculate_formula_dues(
    expression: &str,
    ctx: &FormulaContext,
    money: &MoneyContext,
    step_number: u32,
) -> EngineResult<FormulaDuesResult> {
    let raw = evaluate_formula(expression, ctx)?;
    // Magnitude check on the formula output
    let raw = money.add(raw, Decimal::ZERO)?;

    let clamped = raw < Decimal::ZERO;
    let amount = if clamped { Decimal::ZERO } else { raw };

    let reasoning = if clamped {
        format!(
            "Formula '{}' evaluated to {}; clamped to 0 (dues are never negative)",
            expression,
            raw.normalize()
        )
    } else {
        format!("Formula '{}' evaluated to {}", expression, raw.normalize())
    };

    let audit_step = AuditStep {
        step_number,
        stage: "formula_dues".to_string(),
        input: serde_json::json!({
            "expression": expression,
            "gross_wages": ctx.gross_wages.normalize().to_string(),
            "hours_worked": ctx.hours_worked.normalize().to_string(),
            "base_dues": ctx.base_dues.normalize().to_string(),
        }),
        output: serde_json::json!({
            "raw": raw.normalize().to_string(),
            "amount": amount.normalize().to_string(),
        }),
        reasoning,
    };

    Ok(FormulaDuesResult { amount, audit_step })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn ctx() -> FormulaContext {
        FormulaContext {
            gross_wages: dec("4200"),
            hours_worked: dec("152"),
            base_dues: dec("10"),
        }
    }

    /// FE-001: the reference expression from the engine contract
    #[test]
    fn test_accepts_gross_wages_times_rate_plus_constant() {
        let amount = evaluate_formula("grossWages * 0.02 + 5", &ctx()).unwrap();
        assert_eq!(amount, dec("89.00"));
    }

    /// FE-002: all three variables bind
    #[test]
    fn test_all_variables_bind() {
        let amount = evaluate_formula("baseDues + hoursWorked * 0.5", &ctx()).unwrap();
        assert_eq!(amount, dec("86.0"));
    }

    /// FE-003: parentheses override precedence
    #[test]
    fn test_parentheses() {
        let amount = evaluate_formula("(2 + 3) * 4", &ctx()).unwrap();
        assert_eq!(amount, dec("20"));
    }

    /// FE-004: multiplication binds tighter than addition
    #[test]
    fn test_precedence() {
        let amount = evaluate_formula("2 + 3 * 4", &ctx()).unwrap();
        assert_eq!(amount, dec("14"));
    }

    /// FE-005: unary minus
    #[test]
    fn test_unary_minus() {
        let amount = evaluate_formula("-5 + 10", &ctx()).unwrap();
        assert_eq!(amount, dec("5"));
    }

    /// FE-006: property access is a disallowed token
    #[test]
    fn test_rejects_property_access() {
        let result = evaluate_formula("member.wages * 2", &ctx());
        match result.unwrap_err() {
            EngineError::UnsafeFormula { token, .. } => {
                assert_eq!(token, "member");
            }
            other => panic!("Expected UnsafeFormula, got {:?}", other),
        }
    }

    /// FE-007: unknown identifiers are rejected
    #[test]
    fn test_rejects_unknown_identifier() {
        let result = evaluate_formula("grossWages + salary", &ctx());
        match result.unwrap_err() {
            EngineError::UnsafeFormula { token, .. } => {
                assert_eq!(token, "salary");
            }
            other => panic!("Expected UnsafeFormula, got {:?}", other),
        }
    }

    /// FE-008: function-call syntax is rejected at the identifier
    #[test]
    fn test_rejects_function_call() {
        let result = evaluate_formula("max(grossWages, 100)", &ctx());
        assert!(matches!(
            result.unwrap_err(),
            EngineError::UnsafeFormula { .. }
        ));
    }

    /// FE-009: stray characters are rejected
    #[test]
    fn test_rejects_stray_characters() {
        for expr in ["grossWages; 1", "1 = 2", "2 ^ 3", "[1]"] {
            assert!(
                matches!(
                    evaluate_formula(expr, &ctx()).unwrap_err(),
                    EngineError::UnsafeFormula { .. }
                ),
                "expected UnsafeFormula for {:?}",
                expr
            );
        }
    }

    /// FE-010: division by zero is an evaluation error, not unsafe
    #[test]
    fn test_division_by_zero() {
        let result = evaluate_formula("grossWages / 0", &ctx());
        match result.unwrap_err() {
            EngineError::FormulaEvaluation { message, .. } => {
                assert!(message.contains("division by zero"));
            }
            other => panic!("Expected FormulaEvaluation, got {:?}", other),
        }
    }

    /// FE-011: syntax errors are evaluation errors
    #[test]
    fn test_syntax_errors() {
        for expr in ["(1 + 2", "1 +", "1 2", ""] {
            assert!(
                matches!(
                    evaluate_formula(expr, &ctx()).unwrap_err(),
                    EngineError::FormulaEvaluation { .. }
                ),
                "expected FormulaEvaluation for {:?}",
                expr
            );
        }
    }

    /// FE-012: over-length expressions are rejected
    #[test]
    fn test_rejects_overlong_expression() {
        let expr = "1+".repeat(MAX_FORMULA_LENGTH) + "1";
        let result = evaluate_formula(&expr, &ctx());
        match result.unwrap_err() {
            EngineError::FormulaEvaluation { message, .. } => {
                assert!(message.contains("exceeds"));
            }
            other => panic!("Expected FormulaEvaluation, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_result_clamped_to_zero() {
        let money = MoneyContext::default();
        let result = calculate_formula_dues("baseDues - 100", &ctx(), &money, 1).unwrap();

        assert_eq!(result.amount, Decimal::ZERO);
        assert!(result.audit_step.reasoning.contains("clamped to 0"));
        assert_eq!(result.audit_step.output["raw"].as_str().unwrap(), "-90");
    }

    #[test]
    fn test_audit_step_records_expression_and_bindings() {
        let money = MoneyContext::default();
        let result =
            calculate_formula_dues("grossWages * 0.02 + 5", &ctx(), &money, 2).unwrap();

        assert_eq!(result.amount, dec("89.00"));
        assert_eq!(result.audit_step.step_number, 2);
        assert_eq!(
            result.audit_step.input["expression"].as_str().unwrap(),
            "grossWages * 0.02 + 5"
        );
        assert_eq!(
            result.audit_step.input["gross_wages"].as_str().unwrap(),
            "4200"
        );
    }
}
