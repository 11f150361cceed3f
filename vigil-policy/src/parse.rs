//! Condition expression parser.
//!
//! Grammar (no parentheses, no `not`):
//!
//! ```text
//! expr    := and ("or" and)*
//! and     := cmp ("and" cmp)*
//! cmp     := ident OP operand
//! OP      := > | < | >= | <= | == | !=
//! operand := number | 'string' | "string" | ident
//! ```
//!
//! `and` binds tighter than `or`: conjunction lists are evaluated before
//! the disjunction over them. This precedence is part of the contract and
//! will not change.
//!
//! Evaluation is fail-safe. A condition that references a feature absent
//! from the namespace (or compares incompatible types) does not match,
//! even when another arm of a disjunction would. Strings support `==` and
//! `!=` only; ordering a string is a type mismatch.

use std::collections::BTreeMap;

use thiserror::Error;

/// Condition parse errors. Surfaced at load time; a condition that fails
/// to parse never reaches evaluation.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    /// The expression ended where a token was required.
    #[error("unexpected end of condition")]
    UnexpectedEnd,

    /// Something other than the expected token appeared.
    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),

    /// A quoted string literal was not closed.
    #[error("unterminated string literal")]
    UnterminatedString,

    /// A character outside the grammar appeared.
    #[error("invalid character `{0}`")]
    InvalidCharacter(char),

    /// A comparison operator was expected.
    #[error("expected comparison operator, found `{0}`")]
    ExpectedOperator(String),

    /// The left side of a comparison must be a feature name.
    #[error("expected feature name, found `{0}`")]
    ExpectedFeature(String),
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

/// The right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    Number(f64),
    Str(String),
    Feature(String),
}

/// One `feature OP operand` comparison.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Comparison {
    pub(crate) feature: String,
    pub(crate) op: CmpOp,
    pub(crate) operand: Operand,
}

/// A parsed condition: a disjunction of conjunctions of comparisons.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    clauses: Vec<Vec<Comparison>>,
}

impl Condition {
    /// Evaluate against a feature namespace.
    ///
    /// Returns `true` iff some conjunction clause holds and **no**
    /// comparison anywhere in the condition touched an absent feature or
    /// mismatched types (fail-safe: such a condition never matches).
    #[must_use]
    pub fn matches(&self, namespace: &BTreeMap<String, serde_json::Value>) -> bool {
        let mut any_clause = false;
        for clause in &self.clauses {
            let mut all = true;
            for cmp in clause {
                match eval_comparison(cmp, namespace) {
                    Some(value) => all = all && value,
                    None => return false,
                }
            }
            any_clause = any_clause || all;
        }
        any_clause
    }
}

fn eval_comparison(
    cmp: &Comparison,
    namespace: &BTreeMap<String, serde_json::Value>,
) -> Option<bool> {
    let lhs = namespace.get(&cmp.feature)?;
    match &cmp.operand {
        Operand::Number(rhs) => compare_numbers(lhs.as_f64()?, *rhs, cmp.op),
        Operand::Str(rhs) => compare_strings(lhs.as_str()?, rhs, cmp.op),
        Operand::Feature(name) => {
            let rhs = namespace.get(name)?;
            if let (Some(l), Some(r)) = (lhs.as_f64(), rhs.as_f64()) {
                compare_numbers(l, r, cmp.op)
            } else if let (Some(l), Some(r)) = (lhs.as_str(), rhs.as_str()) {
                compare_strings(l, r, cmp.op)
            } else {
                None
            }
        }
    }
}

fn compare_numbers(lhs: f64, rhs: f64, op: CmpOp) -> Option<bool> {
    Some(match op {
        CmpOp::Gt => lhs > rhs,
        CmpOp::Lt => lhs < rhs,
        CmpOp::Ge => lhs >= rhs,
        CmpOp::Le => lhs <= rhs,
        CmpOp::Eq => lhs == rhs,
        CmpOp::Ne => lhs != rhs,
    })
}

fn compare_strings(lhs: &str, rhs: &str, op: CmpOp) -> Option<bool> {
    match op {
        CmpOp::Eq => Some(lhs == rhs),
        CmpOp::Ne => Some(lhs != rhs),
        _ => None,
    }
}

// --- Lexer ---

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Op(CmpOp),
    And,
    Or,
}

fn lex(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match ident.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    _ => Token::Ident(ident),
                });
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut number = String::new();
                number.push(c);
                chars.next();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        number.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = number
                    .parse::<f64>()
                    .map_err(|_| ParseError::UnexpectedToken(number.clone()))?;
                tokens.push(Token::Number(value));
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => break,
                        Some(c) => literal.push(c),
                        None => return Err(ParseError::UnterminatedString),
                    }
                }
                tokens.push(Token::Str(literal));
            }
            '>' | '<' | '=' | '!' => {
                chars.next();
                let eq = chars.peek() == Some(&'=');
                if eq {
                    chars.next();
                }
                let op = match (c, eq) {
                    ('>', false) => CmpOp::Gt,
                    ('>', true) => CmpOp::Ge,
                    ('<', false) => CmpOp::Lt,
                    ('<', true) => CmpOp::Le,
                    ('=', true) => CmpOp::Eq,
                    ('!', true) => CmpOp::Ne,
                    _ => return Err(ParseError::InvalidCharacter(c)),
                };
                tokens.push(Token::Op(op));
            }
            other => return Err(ParseError::InvalidCharacter(other)),
        }
    }

    Ok(tokens)
}

// --- Recursive descent over the token stream ---

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
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

    fn expr(&mut self) -> Result<Vec<Vec<Comparison>>, ParseError> {
        let mut clauses = vec![self.and_clause()?];
        while self.peek() == Some(&Token::Or) {
            self.next();
            clauses.push(self.and_clause()?);
        }
        Ok(clauses)
    }

    fn and_clause(&mut self) -> Result<Vec<Comparison>, ParseError> {
        let mut comparisons = vec![self.comparison()?];
        while self.peek() == Some(&Token::And) {
            self.next();
            comparisons.push(self.comparison()?);
        }
        Ok(comparisons)
    }

    fn comparison(&mut self) -> Result<Comparison, ParseError> {
        let feature = match self.next() {
            Some(Token::Ident(name)) => name,
            Some(other) => return Err(ParseError::ExpectedFeature(describe(&other))),
            None => return Err(ParseError::UnexpectedEnd),
        };
        let op = match self.next() {
            Some(Token::Op(op)) => op,
            Some(other) => return Err(ParseError::ExpectedOperator(describe(&other))),
            None => return Err(ParseError::UnexpectedEnd),
        };
        let operand = match self.next() {
            Some(Token::Number(value)) => Operand::Number(value),
            Some(Token::Str(value)) => Operand::Str(value),
            Some(Token::Ident(name)) => Operand::Feature(name),
            Some(other) => return Err(ParseError::UnexpectedToken(describe(&other))),
            None => return Err(ParseError::UnexpectedEnd),
        };
        Ok(Comparison {
            feature,
            op,
            operand,
        })
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Ident(s) => s.clone(),
        Token::Number(n) => n.to_string(),
        Token::Str(s) => format!("'{s}'"),
        Token::Op(_) => "operator".to_owned(),
        Token::And => "and".to_owned(),
        Token::Or => "or".to_owned(),
    }
}

/// Parse a condition expression. Rejects anything outside the grammar.
pub fn parse(input: &str) -> Result<Condition, ParseError> {
    let tokens = lex(input)?;
    if tokens.is_empty() {
        return Err(ParseError::UnexpectedEnd);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let clauses = parser.expr()?;
    if let Some(trailing) = parser.peek() {
        return Err(ParseError::UnexpectedToken(describe(trailing)));
    }
    Ok(Condition { clauses })
}
