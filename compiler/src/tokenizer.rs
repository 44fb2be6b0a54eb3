use std::fmt;

use serde::Serialize;

use crate::{error::NifError, utils::quote};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operator {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
    And,
    Or,
    BitAnd,
    BitOr,
    Sub,
    Add,
    Div,
    Mul,
    Not,
}

/// Binary operators, two-character spellings first so `&&` never matches as `&`.
const BINARY_OPERATORS: [(&str, Operator); 14] = [
    ("==", Operator::Eq),
    ("!=", Operator::Ne),
    (">=", Operator::Ge),
    ("<=", Operator::Le),
    ("&&", Operator::And),
    ("||", Operator::Or),
    ("&", Operator::BitAnd),
    ("|", Operator::BitOr),
    ("-", Operator::Sub),
    ("+", Operator::Add),
    (">", Operator::Gt),
    ("<", Operator::Lt),
    ("/", Operator::Div),
    ("*", Operator::Mul),
];

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Not => "!",
            op => BINARY_OPERATORS
                .iter()
                .find(|(_, o)| *o == op)
                .map(|(s, _)| *s)
                .unwrap_or("?"),
        }
    }

    /// Matches a binary operator at the start of `text`, longest spelling first.
    pub fn match_prefix(text: &str) -> Option<Operator> {
        BINARY_OPERATORS
            .iter()
            .find(|(s, _)| text.starts_with(s))
            .map(|(_, op)| *op)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One level of an expression split at its top-level operator.
#[derive(Debug, PartialEq)]
pub struct Partition<'a> {
    pub left:  &'a str,
    pub op:    Option<Operator>,
    pub right: &'a str,
}

impl<'a> Partition<'a> {
    fn terminal(text: &'a str) -> Self {
        Partition { left: text, op: None, right: "" }
    }
}

fn syntax_error(expr: &str, msg: String) -> NifError {
    NifError::SyntaxError { expr: quote(expr), msg }
}

/// Finds the first `(` in `text` and its matching `)`.
///
/// Returns `Ok(None)` when there are no brackets and an error when an opening
/// bracket is never closed.
pub fn scan_brackets(text: &str) -> Result<Option<(usize, usize)>, NifError> {
    let mut start = None;
    let mut depth = 0i32;
    for (pos, b) in text.bytes().enumerate() {
        match b {
            b'(' => {
                start.get_or_insert(pos);
                depth += 1;
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    if let Some(start) = start {
                        return Ok(Some((start, pos)));
                    }
                }
            }
            _ => {}
        }
    }
    if start.is_some() {
        return Err(syntax_error(text, "non-matching brackets".to_string()));
    }
    Ok(None)
}

/// Splits `text` into left operand, operator and right operand.
///
/// A leading `!` makes a unary partition over the rest. A leading bracketed
/// group becomes the left operand and must be followed by an operator or by
/// nothing at all. Otherwise the first operator outside brackets splits the
/// text; hitting a bracket before any operator is an error. Without an operator
/// the whole text is a terminal.
pub fn partition(text: &str) -> Result<Partition<'_>, NifError> {
    let trimmed = text.trim();

    if trimmed.starts_with('!') && !trimmed.starts_with("!=") {
        let operand = trimmed[1..].trim();
        if operand.is_empty() {
            return Err(syntax_error(text, "missing operand after '!'".to_string()));
        }
        return Ok(Partition { left: operand, op: Some(Operator::Not), right: "" });
    }

    if trimmed.starts_with('(') {
        let (_, close) = scan_brackets(trimmed)?
            .ok_or_else(|| syntax_error(text, "non-matching brackets".to_string()))?;
        let inner = trimmed[1..close].trim();
        let rest = trimmed[close + 1..].trim_start();
        if rest.is_empty() {
            return partition(inner);
        }
        let op = Operator::match_prefix(rest).ok_or_else(|| {
            syntax_error(text, format!("expected operator at {}", quote(rest)))
        })?;
        let right = rest[op.symbol().len()..].trim();
        if right.is_empty() {
            return Err(syntax_error(text, format!("missing right operand after '{}'", op)));
        }
        return Ok(Partition { left: inner, op: Some(op), right });
    }

    let bytes = trimmed.as_bytes();
    for (pos, &b) in bytes.iter().enumerate() {
        match b {
            b' ' => continue,
            b if !b.is_ascii() => continue,
            b'(' | b')' => {
                return Err(syntax_error(
                    text,
                    format!("expected operator before {}", quote(&trimmed[pos..])),
                ));
            }
            // Sign of a leading integer literal.
            b'-' if pos == 0 && bytes.get(1).is_some_and(u8::is_ascii_digit) => continue,
            _ => {}
        }
        if let Some(op) = Operator::match_prefix(&trimmed[pos..]) {
            let left = trimmed[..pos].trim();
            let right = trimmed[pos + op.symbol().len()..].trim();
            if left.is_empty() {
                return Err(syntax_error(text, format!("missing left operand before '{}'", op)));
            }
            if right.is_empty() {
                return Err(syntax_error(text, format!("missing right operand after '{}'", op)));
            }
            return Ok(Partition { left, op: Some(op), right });
        }
    }

    Ok(Partition::terminal(trimmed))
}
