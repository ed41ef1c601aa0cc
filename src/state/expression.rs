//! Expression evaluation for computed state values and text templates.
//!
//! Expressions are small: literals, state paths, arithmetic, comparison,
//! boolean logic and a ternary. Paths may be written bare (`count + 1`) or
//! wrapped as `${count}`.
//!
//! ```text
//! expr     := or ( "?" expr ":" expr )?
//! or       := and ( "||" and )*
//! and      := equality ( "&&" equality )*
//! equality := compare ( ( "==" | "!=" ) compare )*
//! compare  := sum ( ( "<" | "<=" | ">" | ">=" ) sum )*
//! sum      := product ( ( "+" | "-" ) product )*
//! product  := unary ( ( "*" | "/" | "%" ) unary )*
//! unary    := ( "!" | "-" ) unary | primary
//! primary  := number | string | true | false | null | path | "(" expr ")"
//! ```
//!
//! Missing paths read as `null`, and `null` counts as zero in arithmetic so
//! `count + 1` works before `count` is first written.

use std::cmp::Ordering;

use crate::error::EvalError;
use super::path::StatePath;
use super::value::StateValue;

// =============================================================================
// Tokens
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Value(StateValue),
    Path(String),
    Op(&'static str),
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    position: usize,
}

const OPERATORS: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "<", ">", "+", "-", "*", "/", "%", "!", "?", ":", "(",
    ")",
];

fn tokenize(source: &str) -> Result<Vec<Spanned>, EvalError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        // ${path}
        if source[pos..].starts_with("${") {
            let start = pos + 2;
            let end = source[start..]
                .find('}')
                .map(|offset| start + offset)
                .ok_or(EvalError::UnexpectedEnd)?;
            let path = source[start..end].trim();
            StatePath::parse(path)?;
            tokens.push(Spanned {
                token: Token::Path(path.to_string()),
                position: pos,
            });
            pos = end + 1;
            continue;
        }

        // Numbers
        if c.is_ascii_digit()
            || (c == b'.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit))
        {
            let start = pos;
            while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
                pos += 1;
            }
            let raw = &source[start..pos];
            let value = match raw.parse::<i64>() {
                Ok(i) => StateValue::Int(i),
                Err(_) => StateValue::Float(
                    raw.parse::<f64>()
                        .map_err(|_| EvalError::InvalidNumber(raw.to_string()))?,
                ),
            };
            tokens.push(Spanned {
                token: Token::Value(value),
                position: start,
            });
            continue;
        }

        // Strings
        if c == b'"' || c == b'\'' {
            let (text, next) = read_string(source, pos)?;
            tokens.push(Spanned {
                token: Token::Value(StateValue::String(text)),
                position: pos,
            });
            pos = next;
            continue;
        }

        // Identifiers, keywords and paths
        if c.is_ascii_alphabetic() || c == b'_' || c == b'$' || c == b'@' {
            let start = pos;
            while pos < bytes.len() {
                match bytes[pos] {
                    b if b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'@' | b'.') => {
                        pos += 1;
                    }
                    b'[' => match source[pos..].find(']') {
                        Some(offset) => pos += offset + 1,
                        None => return Err(EvalError::UnexpectedEnd),
                    },
                    _ => break,
                }
            }
            let word = &source[start..pos];
            let token = match word {
                "true" => Token::Value(StateValue::Bool(true)),
                "false" => Token::Value(StateValue::Bool(false)),
                "null" | "nil" => Token::Value(StateValue::Null),
                _ => {
                    StatePath::parse(word)?;
                    Token::Path(word.to_string())
                }
            };
            tokens.push(Spanned {
                token,
                position: start,
            });
            continue;
        }

        match OPERATORS.iter().copied().find(|op| source[pos..].starts_with(*op)) {
            Some(op) => {
                tokens.push(Spanned {
                    token: Token::Op(op),
                    position: pos,
                });
                pos += op.len();
            }
            None => {
                return Err(EvalError::UnexpectedToken {
                    token: source[pos..].chars().next().unwrap_or('?').to_string(),
                    position: pos,
                });
            }
        }
    }

    Ok(tokens)
}

fn read_string(source: &str, start: usize) -> Result<(String, usize), EvalError> {
    let mut chars = source[start..].char_indices();
    let quote = chars.next().map(|(_, q)| q).ok_or(EvalError::UnexpectedEnd)?;
    let mut text = String::new();
    let mut escaped = false;

    for (offset, c) in chars {
        if escaped {
            text.push(match c {
                'n' => '\n',
                't' => '\t',
                other => other,
            });
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Ok((text, start + offset + c.len_utf8()));
        } else {
            text.push(c);
        }
    }

    Err(EvalError::UnterminatedString { position: start })
}

// =============================================================================
// AST
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    fn from_token(op: &str) -> Option<Self> {
        Some(match op {
            "||" => Self::Or,
            "&&" => Self::And,
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Rem,
            _ => return None,
        })
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(StateValue),
    Path(String),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

// =============================================================================
// Parser
// =============================================================================

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

/// Binary precedence levels, loosest first.
const LEVELS: &[&[&str]] = &[
    &["||"],
    &["&&"],
    &["==", "!="],
    &["<", "<=", ">", ">="],
    &["+", "-"],
    &["*", "/", "%"],
];

impl Parser {
    fn peek_op(&self) -> Option<&'static str> {
        match self.tokens.get(self.pos) {
            Some(Spanned {
                token: Token::Op(op),
                ..
            }) => Some(*op),
            _ => None,
        }
    }

    fn expect_op(&mut self, expected: &'static str) -> Result<(), EvalError> {
        match self.tokens.get(self.pos) {
            Some(Spanned {
                token: Token::Op(op),
                ..
            }) if *op == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(other) => Err(unexpected(other)),
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    fn expression(&mut self) -> Result<Expr, EvalError> {
        let condition = self.binary(0)?;
        if self.peek_op() == Some("?") {
            self.pos += 1;
            let then = self.expression()?;
            self.expect_op(":")?;
            let otherwise = self.expression()?;
            return Ok(Expr::Conditional(
                Box::new(condition),
                Box::new(then),
                Box::new(otherwise),
            ));
        }
        Ok(condition)
    }

    fn binary(&mut self, level: usize) -> Result<Expr, EvalError> {
        if level == LEVELS.len() {
            return self.unary();
        }
        let mut left = self.binary(level + 1)?;
        while let Some(op) = self.peek_op().filter(|op| LEVELS[level].contains(op)) {
            self.pos += 1;
            let right = self.binary(level + 1)?;
            let op = BinaryOp::from_token(op).ok_or(EvalError::UnexpectedEnd)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        match self.peek_op() {
            Some("!") => {
                self.pos += 1;
                Ok(Expr::Not(Box::new(self.unary()?)))
            }
            Some("-") => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        let spanned = self.tokens.get(self.pos).cloned().ok_or(EvalError::UnexpectedEnd)?;
        self.pos += 1;
        match spanned.token {
            Token::Value(value) => Ok(Expr::Literal(value)),
            Token::Path(path) => Ok(Expr::Path(path)),
            Token::Op("(") => {
                let inner = self.expression()?;
                self.expect_op(")")?;
                Ok(inner)
            }
            Token::Op(_) => Err(unexpected(&spanned)),
        }
    }
}

fn unexpected(spanned: &Spanned) -> EvalError {
    let token = match &spanned.token {
        Token::Value(v) => v.to_string(),
        Token::Path(p) => p.clone(),
        Token::Op(op) => (*op).to_string(),
    };
    EvalError::UnexpectedToken {
        token,
        position: spanned.position,
    }
}

fn parse(source: &str) -> Result<Expr, EvalError> {
    let mut parser = Parser {
        tokens: tokenize(source)?,
        pos: 0,
    };
    let expr = parser.expression()?;
    match parser.tokens.get(parser.pos) {
        Some(extra) => Err(unexpected(extra)),
        None => Ok(expr),
    }
}

// =============================================================================
// Evaluation
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn of(value: &StateValue) -> Option<Self> {
        match value {
            StateValue::Int(i) => Some(Self::Int(*i)),
            StateValue::Float(f) => Some(Self::Float(*f)),
            StateValue::Null => Some(Self::Int(0)),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

fn eval(expr: &Expr, lookup: &dyn Fn(&str) -> Option<StateValue>) -> Result<StateValue, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Path(path) => Ok(lookup(path).unwrap_or_default()),
        Expr::Not(inner) => Ok(StateValue::Bool(!eval(inner, lookup)?.is_truthy())),
        Expr::Neg(inner) => {
            let value = eval(inner, lookup)?;
            match Number::of(&value) {
                Some(Number::Int(i)) => i.checked_neg().map(StateValue::Int).ok_or(EvalError::Overflow),
                Some(Number::Float(f)) => Ok(StateValue::Float(-f)),
                None => Err(EvalError::InvalidNegation(value.kind())),
            }
        }
        Expr::Conditional(condition, then, otherwise) => {
            if eval(condition, lookup)?.is_truthy() {
                eval(then, lookup)
            } else {
                eval(otherwise, lookup)
            }
        }
        Expr::Binary(BinaryOp::Or, left, right) => {
            let truthy = eval(left, lookup)?.is_truthy() || eval(right, lookup)?.is_truthy();
            Ok(StateValue::Bool(truthy))
        }
        Expr::Binary(BinaryOp::And, left, right) => {
            let truthy = eval(left, lookup)?.is_truthy() && eval(right, lookup)?.is_truthy();
            Ok(StateValue::Bool(truthy))
        }
        Expr::Binary(op, left, right) => {
            let left = eval(left, lookup)?;
            let right = eval(right, lookup)?;
            apply(*op, &left, &right)
        }
    }
}

fn apply(op: BinaryOp, left: &StateValue, right: &StateValue) -> Result<StateValue, EvalError> {
    let mismatch = || EvalError::TypeMismatch {
        op: op.symbol(),
        left: left.kind(),
        right: right.kind(),
    };

    match op {
        BinaryOp::Eq => return Ok(StateValue::Bool(left == right)),
        BinaryOp::Ne => return Ok(StateValue::Bool(left != right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(left, right).ok_or_else(mismatch)?;
            let result = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            return Ok(StateValue::Bool(result));
        }
        BinaryOp::Add
            if matches!(left, StateValue::String(_)) || matches!(right, StateValue::String(_)) =>
        {
            return Ok(StateValue::String(format!("{left}{right}")));
        }
        _ => {}
    }

    let (a, b) = match (Number::of(left), Number::of(right)) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(mismatch()),
    };

    match (a, b) {
        (Number::Int(x), Number::Int(y)) => {
            let result = match op {
                BinaryOp::Add => x.checked_add(y),
                BinaryOp::Sub => x.checked_sub(y),
                BinaryOp::Mul => x.checked_mul(y),
                BinaryOp::Div => {
                    if y == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    match x.checked_rem(y) {
                        None => return Err(EvalError::Overflow),
                        Some(0) => x.checked_div(y),
                        Some(_) => return Ok(StateValue::Float(x as f64 / y as f64)),
                    }
                }
                BinaryOp::Rem => {
                    if y == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    x.checked_rem(y)
                }
                _ => return Err(mismatch()),
            };
            result.map(StateValue::Int).ok_or(EvalError::Overflow)
        }
        (a, b) => {
            let (x, y) = (a.as_f64(), b.as_f64());
            let result = match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                BinaryOp::Div | BinaryOp::Rem if y == 0.0 => return Err(EvalError::DivisionByZero),
                BinaryOp::Div => x / y,
                BinaryOp::Rem => x % y,
                _ => return Err(mismatch()),
            };
            Ok(StateValue::Float(result))
        }
    }
}

fn compare(left: &StateValue, right: &StateValue) -> Option<Ordering> {
    match (left, right) {
        (StateValue::String(a), StateValue::String(b)) => Some(a.cmp(b)),
        _ => {
            let a = Number::of(left)?;
            let b = Number::of(right)?;
            a.as_f64().partial_cmp(&b.as_f64())
        }
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Evaluate `source`, resolving paths through `lookup`.
pub fn evaluate(
    source: &str,
    lookup: &dyn Fn(&str) -> Option<StateValue>,
) -> Result<StateValue, EvalError> {
    let expr = parse(source)?;
    eval(&expr, lookup)
}

/// Expand `${...}` placeholders in `template`.
///
/// Each placeholder is evaluated as an expression. Placeholders that fail to
/// evaluate expand to nothing; an unterminated `${` is kept verbatim.
pub fn interpolate(template: &str, lookup: &dyn Fn(&str) -> Option<StateValue>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let body = &rest[start + 2..];
        let Some(end) = placeholder_end(body) else {
            out.push_str(&rest[start..]);
            return out;
        };

        match evaluate(&body[..end], lookup) {
            Ok(value) => out.push_str(&value.to_string()),
            Err(err) => {
                tracing::warn!(placeholder = &body[..end], %err, "interpolation placeholder failed");
            }
        }
        rest = &body[end + 1..];
    }

    out.push_str(rest);
    out
}

/// Byte offset of the `}` closing a placeholder body, skipping quoted text.
fn placeholder_end(body: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '}') => return Some(i),
            (None, _) => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> StateValue {
        StateValue::from(json!({
            "count": 2,
            "price": 1.5,
            "name": "Ada",
            "items": ["a", "b", "c"],
            "flags": {"on": true}
        }))
    }

    fn eval_str(source: &str) -> Result<StateValue, EvalError> {
        let root = state();
        let lookup = |path: &str| StatePath::parse(path).ok()?.lookup(&root).cloned();
        evaluate(source, &lookup)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_str("count + 1"), Ok(StateValue::Int(3)));
        assert_eq!(eval_str("${count} * 3 - 1"), Ok(StateValue::Int(5)));
        assert_eq!(eval_str("count * price"), Ok(StateValue::Float(3.0)));
        assert_eq!(eval_str("7 / 2"), Ok(StateValue::Float(3.5)));
        assert_eq!(eval_str("8 / 2"), Ok(StateValue::Int(4)));
        assert_eq!(eval_str("(1 + 2) * 3"), Ok(StateValue::Int(9)));
        assert_eq!(eval_str("-count"), Ok(StateValue::Int(-2)));
        assert_eq!(eval_str("7 % 4"), Ok(StateValue::Int(3)));
    }

    #[test]
    fn test_missing_path_counts_as_zero() {
        assert_eq!(eval_str("missing + 1"), Ok(StateValue::Int(1)));
    }

    #[test]
    fn test_boolean_and_comparison() {
        assert_eq!(eval_str("count > 1 && flags.on"), Ok(StateValue::Bool(true)));
        assert_eq!(eval_str("!flags.on || count == 3"), Ok(StateValue::Bool(false)));
        assert_eq!(eval_str("name == 'Ada'"), Ok(StateValue::Bool(true)));
        assert_eq!(eval_str("items[1] != \"b\""), Ok(StateValue::Bool(false)));
        assert_eq!(eval_str("count >= 2.0"), Ok(StateValue::Bool(true)));
    }

    #[test]
    fn test_conditional() {
        assert_eq!(eval_str("count > 1 ? 'many' : 'one'"), Ok(StateValue::from("many")));
        assert_eq!(eval_str("missing ? 1 : 2"), Ok(StateValue::Int(2)));
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(eval_str("'Hi ' + name"), Ok(StateValue::from("Hi Ada")));
        assert_eq!(eval_str("name + count"), Ok(StateValue::from("Ada2")));
    }

    #[test]
    fn test_errors() {
        assert_eq!(eval_str("1 / 0"), Err(EvalError::DivisionByZero));
        assert!(matches!(eval_str("1 +"), Err(EvalError::UnexpectedEnd)));
        assert!(matches!(eval_str("(1"), Err(EvalError::UnexpectedEnd)));
        assert!(matches!(eval_str("1 2"), Err(EvalError::UnexpectedToken { .. })));
        assert!(matches!(eval_str("'open"), Err(EvalError::UnterminatedString { .. })));
        assert!(matches!(eval_str("flags - 1"), Err(EvalError::TypeMismatch { .. })));
        assert!(matches!(eval_str("1 # 2"), Err(EvalError::UnexpectedToken { .. })));
    }

    #[test]
    fn test_integer_overflow_is_an_error() {
        let root = StateValue::from(json!({ "min": i64::MIN, "max": i64::MAX }));
        let lookup = |path: &str| StatePath::parse(path).ok()?.lookup(&root).cloned();
        assert_eq!(evaluate("min / -1", &lookup), Err(EvalError::Overflow));
        assert_eq!(evaluate("min % -1", &lookup), Err(EvalError::Overflow));
        assert_eq!(evaluate("-min", &lookup), Err(EvalError::Overflow));
        assert_eq!(evaluate("max + 1", &lookup), Err(EvalError::Overflow));
        assert_eq!(evaluate("min * -1", &lookup), Err(EvalError::Overflow));
        assert_eq!(evaluate("min / 1", &lookup), Ok(StateValue::Int(i64::MIN)));
        assert_eq!(evaluate("min % 2", &lookup), Ok(StateValue::Int(0)));
    }

    #[test]
    fn test_interpolate() {
        let root = state();
        let lookup = |path: &str| StatePath::parse(path).ok()?.lookup(&root).cloned();
        assert_eq!(interpolate("Hello ${name}!", &lookup), "Hello Ada!");
        assert_eq!(interpolate("${count} of ${items[2]}", &lookup), "2 of c");
        assert_eq!(interpolate("Total: ${count * price}", &lookup), "Total: 3");
        assert_eq!(interpolate("${missing}|", &lookup), "|");
        assert_eq!(interpolate("cost ${", &lookup), "cost ${");
        assert_eq!(interpolate("${name == '}' ? 1 : 0}", &lookup), "0");
    }
}
