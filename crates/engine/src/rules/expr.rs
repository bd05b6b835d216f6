//! Restricted condition expression language.
//!
//! Rule conditions originate from a remote, untrusted provider, so they are
//! never executed as code. This module is a small hand-written lexer,
//! recursive-descent parser, and tree-walking evaluator limited to:
//!
//! - boolean combination: `&&`, `||`, `!`, parentheses
//! - comparison: `==`, `!=`, `<`, `<=`, `>`, `>=`
//! - builtins: `matches(operand, "pattern")` (case-insensitive regex test),
//!   `exists(path)`, `count(path)`
//! - dotted parameter paths and string/number/boolean/null literals
//!
//! Evaluation sees only the rule's bound parameter scope. Referencing any
//! identifier outside it is an error, not an ambient lookup.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExprError {
    #[error("parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}

// ── AST ─────────────────────────────────────────────────────────────

/// A parsed condition expression. Compiled once at rule normalization and
/// reused across sessions; regex patterns are compiled here, never during
/// evaluation.
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    /// Dotted parameter path; the head segment must be a bound parameter.
    Path(Vec<String>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cmp {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Matches {
        operand: Box<Expr>,
        regex: Regex,
    },
    Exists(Vec<String>),
    Count(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

// ── Evaluation scope ────────────────────────────────────────────────

/// The parameter bindings one rule's conditions may see. Built per session
/// from the snapshot; deliberately contains nothing else.
#[derive(Debug, Default)]
pub struct Scope {
    bindings: HashMap<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }
}

// ── Evaluation ──────────────────────────────────────────────────────

impl Expr {
    /// Evaluate to a boolean under JS-like truthiness.
    pub fn eval(&self, scope: &Scope) -> Result<bool, ExprError> {
        Ok(match self {
            Expr::Not(inner) => !inner.eval(scope)?,
            Expr::And(lhs, rhs) => lhs.eval(scope)? && rhs.eval(scope)?,
            Expr::Or(lhs, rhs) => lhs.eval(scope)? || rhs.eval(scope)?,
            Expr::Cmp { op, lhs, rhs } => {
                compare(*op, &lhs.eval_value(scope)?, &rhs.eval_value(scope)?)?
            }
            Expr::Matches { operand, regex } => match operand.eval_value(scope)? {
                Value::Null => false,
                Value::String(s) => regex.is_match(&s),
                other => {
                    return Err(ExprError::TypeMismatch(format!(
                        "matches() needs a string operand, got {}",
                        type_name(&other)
                    )))
                }
            },
            Expr::Exists(path) => !resolve_path(scope, path)?.is_null(),
            _ => truthy(&self.eval_value(scope)?),
        })
    }

    fn eval_value(&self, scope: &Scope) -> Result<Value, ExprError> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Path(path) => resolve_path(scope, path),
            Expr::Count(path) => {
                let value = resolve_path(scope, path)?;
                let count = match &value {
                    Value::Array(items) => items.len(),
                    Value::Object(fields) => fields.len(),
                    Value::String(s) => s.chars().count(),
                    other => {
                        return Err(ExprError::TypeMismatch(format!(
                            "count() needs an array, object, or string, got {}",
                            type_name(other)
                        )))
                    }
                };
                Ok(Value::from(count as u64))
            }
            // Boolean-producing forms used as operands.
            other => other.eval(scope).map(Value::Bool),
        }
    }
}

fn resolve_path(scope: &Scope, path: &[String]) -> Result<Value, ExprError> {
    let (head, rest) = path
        .split_first()
        .expect("parser never yields an empty path");
    let Some(mut current) = scope.get(head) else {
        return Err(ExprError::UnknownIdentifier(head.clone()));
    };
    for segment in rest {
        match current.get(segment) {
            Some(value) => current = value,
            // Descending past the data is an absent value, not an error.
            None => return Ok(Value::Null),
        }
    }
    Ok(current.clone())
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<bool, ExprError> {
    match op {
        CmpOp::Eq => Ok(values_equal(lhs, rhs)),
        CmpOp::Ne => Ok(!values_equal(lhs, rhs)),
        _ => {
            let ordering = match (lhs, rhs) {
                (Value::Number(a), Value::Number(b)) => {
                    let (a, b) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
                    a.partial_cmp(&b).ok_or_else(|| {
                        ExprError::TypeMismatch("cannot order NaN".to_string())
                    })?
                }
                (Value::String(a), Value::String(b)) => a.cmp(b),
                (a, b) => {
                    return Err(ExprError::TypeMismatch(format!(
                        "cannot order {} against {}",
                        type_name(a),
                        type_name(b)
                    )))
                }
            };
            Ok(match op {
                CmpOp::Lt => ordering.is_lt(),
                CmpOp::Le => ordering.is_le(),
                CmpOp::Gt => ordering.is_gt(),
                CmpOp::Ge => ordering.is_ge(),
                CmpOp::Eq | CmpOp::Ne => unreachable!(),
            })
        }
    }
}

/// Equality with numeric normalization; distinct JSON types are unequal,
/// never an error, so `param == true` stays false for an absent parameter.
fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => {
            a.as_f64().zip(b.as_f64()).map(|(a, b)| a == b).unwrap_or(false)
        }
        (a, b) => a == b,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Lexer ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    True,
    False,
    Null,
    LParen,
    RParen,
    Comma,
    Dot,
    Not,
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

fn lex(source: &str) -> Result<Vec<(Token, usize)>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\r' | '\n' => {
                i += 1;
            }
            '(' => {
                tokens.push((Token::LParen, start));
                i += 1;
            }
            ')' => {
                tokens.push((Token::RParen, start));
                i += 1;
            }
            ',' => {
                tokens.push((Token::Comma, start));
                i += 1;
            }
            '.' => {
                tokens.push((Token::Dot, start));
                i += 1;
            }
            '&' => {
                if bytes.get(i + 1) == Some(&b'&') {
                    tokens.push((Token::AndAnd, start));
                    i += 2;
                } else {
                    return Err(parse_err(start, "expected '&&'"));
                }
            }
            '|' => {
                if bytes.get(i + 1) == Some(&b'|') {
                    tokens.push((Token::OrOr, start));
                    i += 2;
                } else {
                    return Err(parse_err(start, "expected '||'"));
                }
            }
            '=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    // Accept the provider's sloppy `===` as `==`.
                    i += if bytes.get(i + 2) == Some(&b'=') { 3 } else { 2 };
                    tokens.push((Token::EqEq, start));
                } else {
                    return Err(parse_err(start, "expected '=='"));
                }
            }
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    i += if bytes.get(i + 2) == Some(&b'=') { 3 } else { 2 };
                    tokens.push((Token::NotEq, start));
                } else {
                    tokens.push((Token::Not, start));
                    i += 1;
                }
            }
            '<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((Token::Le, start));
                    i += 2;
                } else {
                    tokens.push((Token::Lt, start));
                    i += 1;
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((Token::Ge, start));
                    i += 2;
                } else {
                    tokens.push((Token::Gt, start));
                    i += 1;
                }
            }
            '"' | '\'' => {
                let (literal, next) = lex_string(source, i, c)?;
                tokens.push((Token::Str(literal), start));
                i = next;
            }
            '-' | '0'..='9' => {
                let (number, next) = lex_number(source, i)?;
                tokens.push((Token::Num(number), start));
                i = next;
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let mut end = i + 1;
                while end < bytes.len()
                    && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                let word = &source[i..end];
                let token = match word {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    _ => Token::Ident(word.to_string()),
                };
                tokens.push((token, start));
                i = end;
            }
            other => {
                return Err(parse_err(start, &format!("unexpected character '{}'", other)));
            }
        }
    }

    Ok(tokens)
}

fn lex_string(source: &str, start: usize, quote: char) -> Result<(String, usize), ExprError> {
    let bytes = source.as_bytes();
    let mut literal = String::new();
    let mut i = start + 1;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            '\\' => {
                let escaped = bytes
                    .get(i + 1)
                    .ok_or_else(|| parse_err(i, "unterminated escape"))?;
                match *escaped as char {
                    'n' => literal.push('\n'),
                    't' => literal.push('\t'),
                    other => literal.push(other),
                }
                i += 2;
            }
            c if c == quote => return Ok((literal, i + 1)),
            _ => {
                // Multi-byte characters pass through untouched.
                let ch_len = source[i..].chars().next().map(char::len_utf8).unwrap_or(1);
                literal.push_str(&source[i..i + ch_len]);
                i += ch_len;
            }
        }
    }
    Err(parse_err(start, "unterminated string literal"))
}

fn lex_number(source: &str, start: usize) -> Result<(f64, usize), ExprError> {
    let bytes = source.as_bytes();
    let mut end = start;
    if bytes[end] == b'-' {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
        end += 1;
    }
    if end == digits_start {
        return Err(parse_err(start, "expected a number"));
    }
    source[start..end]
        .parse::<f64>()
        .map(|n| (n, end))
        .map_err(|_| parse_err(start, "malformed number literal"))
}

fn parse_err(position: usize, message: &str) -> ExprError {
    ExprError::Parse {
        position,
        message: message.to_string(),
    }
}

// ── Parser ──────────────────────────────────────────────────────────

/// Parse a condition expression. Regex patterns inside `matches(...)` are
/// compiled here; an invalid pattern fails the parse.
pub fn parse(source: &str) -> Result<Expr, ExprError> {
    let tokens = lex(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        len: source.len(),
    };
    let expr = parser.or_expr()?;
    parser.expect_end()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, p)| *p)
            .unwrap_or(self.len)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ExprError> {
        let position = self.position();
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            _ => Err(parse_err(position, &format!("expected {}", what))),
        }
    }

    fn expect_end(&self) -> Result<(), ExprError> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(parse_err(self.position(), "trailing input after expression"))
        }
    }

    fn or_expr(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.and_expr()?;
        while self.peek() == Some(&Token::OrOr) {
            self.advance();
            expr = Expr::Or(Box::new(expr), Box::new(self.and_expr()?));
        }
        Ok(expr)
    }

    fn and_expr(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.unary()?;
        while self.peek() == Some(&Token::AndAnd) {
            self.advance();
            expr = Expr::And(Box::new(expr), Box::new(self.unary()?));
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let lhs = self.operand()?;
        let op = match self.peek() {
            Some(Token::EqEq) => CmpOp::Eq,
            Some(Token::NotEq) => CmpOp::Ne,
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::Le) => CmpOp::Le,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::Ge) => CmpOp::Ge,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.operand()?;
        Ok(Expr::Cmp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn operand(&mut self) -> Result<Expr, ExprError> {
        let position = self.position();
        match self.advance() {
            Some(Token::Num(n)) => Ok(Expr::Literal(number_value(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Null) => Ok(Expr::Literal(Value::Null)),
            Some(Token::LParen) => {
                let expr = self.or_expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.call(&name, position)
                } else {
                    Ok(Expr::Path(self.path_tail(name)?))
                }
            }
            _ => Err(parse_err(position, "expected an operand")),
        }
    }

    fn path_tail(&mut self, head: String) -> Result<Vec<String>, ExprError> {
        let mut path = vec![head];
        while self.peek() == Some(&Token::Dot) {
            self.advance();
            let position = self.position();
            match self.advance() {
                Some(Token::Ident(segment)) => path.push(segment),
                _ => return Err(parse_err(position, "expected a path segment after '.'")),
            }
        }
        Ok(path)
    }

    fn call(&mut self, name: &str, position: usize) -> Result<Expr, ExprError> {
        self.expect(Token::LParen, "'('")?;
        let expr = match name {
            "matches" => {
                let operand = self.operand()?;
                self.expect(Token::Comma, "','")?;
                let pattern_pos = self.position();
                let pattern = match self.advance() {
                    Some(Token::Str(p)) => p,
                    _ => {
                        return Err(parse_err(
                            pattern_pos,
                            "matches() needs a string literal pattern",
                        ))
                    }
                };
                let regex = RegexBuilder::new(&pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ExprError::InvalidPattern {
                        pattern: pattern.clone(),
                        message: e.to_string(),
                    })?;
                Expr::Matches {
                    operand: Box::new(operand),
                    regex,
                }
            }
            "exists" => Expr::Exists(self.call_path()?),
            "count" => Expr::Count(self.call_path()?),
            other => {
                return Err(parse_err(
                    position,
                    &format!("unknown function '{}'", other),
                ))
            }
        };
        self.expect(Token::RParen, "')'")?;
        Ok(expr)
    }

    fn call_path(&mut self) -> Result<Vec<String>, ExprError> {
        let position = self.position();
        match self.advance() {
            Some(Token::Ident(head)) => self.path_tail(head),
            _ => Err(parse_err(position, "expected a parameter path")),
        }
    }
}

fn number_value(n: f64) -> Value {
    // Keep integral literals as integers so equality against wire values
    // (which serde_json parses as u64/i64) normalizes cleanly.
    if n.fract() == 0.0 && n.abs() < (i64::MAX as f64) {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scope(bindings: &[(&str, Value)]) -> Scope {
        let mut scope = Scope::new();
        for (name, value) in bindings {
            scope.bind(*name, value.clone());
        }
        scope
    }

    fn eval(source: &str, scope: &Scope) -> Result<bool, ExprError> {
        parse(source)?.eval(scope)
    }

    #[test]
    fn comparisons() {
        let s = scope(&[("hardwareConcurrency", json!(2)), ("platform", json!("Win32"))]);
        assert!(eval("hardwareConcurrency <= 2", &s).unwrap());
        assert!(eval("hardwareConcurrency < 4 && platform == 'Win32'", &s).unwrap());
        assert!(!eval("hardwareConcurrency > 2", &s).unwrap());
        assert!(eval("platform != 'MacIntel'", &s).unwrap());
    }

    #[test]
    fn boolean_combinators_and_grouping() {
        let s = scope(&[("a", json!(true)), ("b", json!(false))]);
        assert!(eval("a || b", &s).unwrap());
        assert!(!eval("a && b", &s).unwrap());
        assert!(eval("!(a && b)", &s).unwrap());
        assert!(eval("!b", &s).unwrap());
    }

    #[test]
    fn matches_builtin_is_case_insensitive() {
        let s = scope(&[("userAgent", json!("Mozilla/5.0 HeadlessChrome/120.0"))]);
        assert!(eval("matches(userAgent, \"headlesschrome\")", &s).unwrap());
        assert!(!eval("matches(userAgent, \"phantomjs\")", &s).unwrap());
    }

    #[test]
    fn matches_on_null_is_false_not_an_error() {
        let s = scope(&[("userAgent", Value::Null)]);
        assert!(!eval("matches(userAgent, \"bot\")", &s).unwrap());
    }

    #[test]
    fn matches_rejects_invalid_pattern_at_parse_time() {
        let err = parse("matches(userAgent, \"[\")").unwrap_err();
        assert!(matches!(err, ExprError::InvalidPattern { .. }));
    }

    #[test]
    fn unknown_identifier_is_an_error_not_an_ambient_lookup() {
        let s = scope(&[("userAgent", json!("x"))]);
        let err = eval("window == 1", &s).unwrap_err();
        assert!(matches!(err, ExprError::UnknownIdentifier(name) if name == "window"));
    }

    #[test]
    fn dotted_paths_descend_bound_values() {
        let s = scope(&[(
            "windowSize",
            json!({"outerWidth": 0, "outerHeight": 0}),
        )]);
        assert!(eval("windowSize.outerWidth == 0", &s).unwrap());
        // Missing leaves resolve to null rather than erroring.
        assert!(eval("windowSize.scrollX == null", &s).unwrap());
    }

    #[test]
    fn equality_across_types_is_false_not_an_error() {
        let s = scope(&[("webDriver", Value::Null)]);
        assert!(!eval("webDriver == true", &s).unwrap());
        assert!(eval("webDriver == null", &s).unwrap());
    }

    #[test]
    fn ordering_across_types_is_an_error() {
        let s = scope(&[("languages", json!(["en"]))]);
        assert!(matches!(
            eval("languages > 2", &s).unwrap_err(),
            ExprError::TypeMismatch(_)
        ));
    }

    #[test]
    fn count_and_exists() {
        let s = scope(&[
            ("languages", json!([])),
            ("plugins", json!(["pdf", "nacl"])),
            ("missing", Value::Null),
        ]);
        assert!(eval("count(languages) == 0", &s).unwrap());
        assert!(eval("count(plugins) >= 2", &s).unwrap());
        assert!(eval("exists(plugins)", &s).unwrap());
        assert!(!eval("exists(missing)", &s).unwrap());
    }

    #[test]
    fn tolerates_javascript_style_triple_equals() {
        let s = scope(&[("webDriver", json!(true))]);
        assert!(eval("webDriver === true", &s).unwrap());
        assert!(!eval("webDriver !== true", &s).unwrap());
    }

    #[test]
    fn numeric_literal_normalization() {
        let s = scope(&[("rtt", json!(0))]);
        assert!(eval("rtt == 0", &s).unwrap());
        let s = scope(&[("ratio", json!(1.5))]);
        assert!(eval("ratio == 1.5", &s).unwrap());
        assert!(eval("ratio > -2", &s).unwrap());
    }

    #[test]
    fn truthiness_of_bare_paths() {
        let s = scope(&[
            ("webDriver", json!(true)),
            ("languages", json!([])),
            ("name", json!("")),
        ]);
        assert!(eval("webDriver", &s).unwrap());
        assert!(!eval("languages", &s).unwrap());
        assert!(!eval("name", &s).unwrap());
    }

    #[test]
    fn parse_errors_carry_positions() {
        match parse("userAgent &") {
            Err(ExprError::Parse { position, .. }) => assert_eq!(position, 10),
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(parse("").is_err());
        assert!(parse("a == ").is_err());
        assert!(parse("(a == 1").is_err());
        assert!(parse("a == 1 b").is_err());
        assert!(parse("fetch(userAgent)").is_err());
        assert!(parse("'unterminated").is_err());
    }
}
