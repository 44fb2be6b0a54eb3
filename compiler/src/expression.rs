use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::{
    error::NifError,
    tokenizer::{partition, Operator},
    traits::FieldContext,
    utils::quote,
    version::VersionOrdinal,
};

lazy_static! {
    static ref VERSION_LITERAL: Regex = Regex::new(r"^\d+\.\d+\.\d+\.\d+$").unwrap();
    static ref HEX_LITERAL:     Regex = Regex::new(r"^0[xX][0-9A-Fa-f]+$").unwrap();
    static ref INTEGER_LITERAL: Regex = Regex::new(r"^-?\d+$").unwrap();
}

/// Rewrites raw names found in an expression (e.g. into member identifiers).
pub type NameHook<'a> = &'a dyn Fn(&str) -> String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    Integer(i64),
    /// A packed version, written as `0x%08X`.
    HexLiteral(u32),
    /// The name of a block type, checked with `IsDerivedType`.
    TypeRef(String),
    FieldRef(String),
    /// No expression at all.
    Empty,
}

impl Terminal {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Terminal::Integer(_) | Terminal::HexLiteral(_))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Terminal::TypeRef(name) | Terminal::FieldRef(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminal::Integer(n) => write!(f, "{}", n),
            Terminal::HexLiteral(v) => f.write_str(&VersionOrdinal(*v).hex_literal()),
            Terminal::TypeRef(name) | Terminal::FieldRef(name) => f.write_str(name),
            Terminal::Empty => Ok(()),
        }
    }
}

/// A parsed length, width, condition or version condition.
///
/// Binary operators split at the first top-level operator, so `a == 1 && b`
/// reads as `a == (1 && b)`. Explicit brackets are the only way to group
/// differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Terminal(Terminal),
    Unary {
        op:      Operator,
        operand: Box<Expr>,
    },
    Binary {
        op:    Operator,
        left:  Box<Expr>,
        right: Box<Expr>,
    },
}

impl Default for Expr {
    fn default() -> Self {
        Expr::Terminal(Terminal::Empty)
    }
}

/// Options for `Expr::render`.
#[derive(Clone, Copy)]
pub struct RenderOptions<'a> {
    /// Prepended to every field name.
    pub prefix:    &'a str,
    /// Wrap the outermost operator expression in brackets.
    pub brackets:  bool,
    pub name_hook: Option<NameHook<'a>>,
    /// Names for which a type check is emitted instead of a field access.
    pub is_type:   Option<&'a dyn Fn(&str) -> bool>,
}

impl Default for RenderOptions<'_> {
    fn default() -> Self {
        RenderOptions {
            prefix:    "",
            brackets:  true,
            name_hook: None,
            is_type:   None,
        }
    }
}

impl Expr {
    pub fn parse(text: &str) -> Result<Expr, NifError> {
        Self::parse_with(text, None)
    }

    /// Parses `text`, passing every name through `name_hook`.
    pub fn parse_with(text: &str, name_hook: Option<NameHook>) -> Result<Expr, NifError> {
        let parts = partition(text)?;
        let operand = |side: &str, op: Operator| -> Result<Box<Expr>, NifError> {
            let expr = Self::parse_with(side, name_hook)?;
            if expr.is_empty() {
                return Err(NifError::SyntaxError {
                    expr: quote(text),
                    msg:  format!("empty operand for '{}'", op),
                });
            }
            Ok(Box::new(expr))
        };
        match parts.op {
            None => Ok(Expr::Terminal(classify_terminal(parts.left, name_hook)?)),
            Some(Operator::Not) => Ok(Expr::Unary {
                op:      Operator::Not,
                operand: operand(parts.left, Operator::Not)?,
            }),
            Some(op) => Ok(Expr::Binary {
                op,
                left:  operand(parts.left, op)?,
                right: operand(parts.right, op)?,
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Expr::Terminal(Terminal::Empty))
    }

    pub fn op(&self) -> Option<Operator> {
        match self {
            Expr::Terminal(_) => None,
            Expr::Unary { op, .. } | Expr::Binary { op, .. } => Some(*op),
        }
    }

    /// The left operand; a terminal is its own left operand.
    pub fn left(&self) -> &Expr {
        match self {
            Expr::Terminal(_) => self,
            Expr::Unary { operand, .. } => operand,
            Expr::Binary { left, .. } => left,
        }
    }

    pub fn right(&self) -> Option<&Expr> {
        match self {
            Expr::Binary { right, .. } => Some(&**right),
            _ => None,
        }
    }

    pub fn as_terminal(&self) -> Option<&Terminal> {
        match self {
            Expr::Terminal(t) => Some(t),
            _ => None,
        }
    }

    /// The name in the left operand, when that operand is a plain name.
    pub fn left_name(&self) -> Option<&str> {
        self.left().as_terminal().and_then(Terminal::name)
    }

    /// True when the right operand is absent or a numeric literal.
    pub fn right_is_numeric_or_absent(&self) -> bool {
        match self.right() {
            None => true,
            Some(right) => right.as_terminal().is_some_and(Terminal::is_numeric),
        }
    }

    /// The value of a lone integer literal.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Expr::Terminal(Terminal::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    /// Field names referenced anywhere in the expression, left to right.
    pub fn field_refs(&self) -> Vec<&str> {
        fn walk<'a>(e: &'a Expr, out: &mut Vec<&'a str>) {
            match e {
                Expr::Terminal(Terminal::FieldRef(name)) => out.push(name),
                Expr::Terminal(_) => {}
                Expr::Unary { operand, .. } => walk(operand, out),
                Expr::Binary { left, right, .. } => {
                    walk(left, out);
                    walk(right, out);
                }
            }
        }

        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }

    /// Returns a copy in which field names accepted by `is_type` are type references.
    pub fn resolve_type_refs(&self, is_type: &dyn Fn(&str) -> bool) -> Expr {
        match self {
            Expr::Terminal(Terminal::FieldRef(name)) if is_type(name.as_str()) => {
                Expr::Terminal(Terminal::TypeRef(name.clone()))
            }
            Expr::Terminal(_) => self.clone(),
            Expr::Unary { op, operand } => Expr::Unary {
                op:      *op,
                operand: Box::new(operand.resolve_type_refs(is_type)),
            },
            Expr::Binary { op, left, right } => Expr::Binary {
                op:    *op,
                left:  Box::new(left.resolve_type_refs(is_type)),
                right: Box::new(right.resolve_type_refs(is_type)),
            },
        }
    }

    /// Evaluates the expression against `ctx`.
    ///
    /// Comparisons and `&&`/`||` give `0` or `1`. Only the empty expression
    /// evaluates to `None`; inside an operator it counts as `0`.
    pub fn evaluate<C: FieldContext + ?Sized>(&self, ctx: &C) -> Result<Option<i64>, NifError> {
        match self {
            Expr::Terminal(t) => evaluate_terminal(t, ctx),
            Expr::Unary { op, operand } => {
                let value = operand.evaluate(ctx)?.unwrap_or(0);
                match op {
                    Operator::Not => Ok(Some(i64::from(value == 0))),
                    other => Err(NifError::SyntaxError {
                        expr: quote(&self.to_string()),
                        msg:  format!("'{}' is not a unary operator", other),
                    }),
                }
            }
            Expr::Binary { op, left, right } => {
                let l = left.evaluate(ctx)?.unwrap_or(0);
                let r = right.evaluate(ctx)?.unwrap_or(0);
                let overflow = || NifError::Overflow(quote(&self.to_string()));
                let value = match op {
                    Operator::Eq => i64::from(l == r),
                    Operator::Ne => i64::from(l != r),
                    Operator::Ge => i64::from(l >= r),
                    Operator::Le => i64::from(l <= r),
                    Operator::Gt => i64::from(l > r),
                    Operator::Lt => i64::from(l < r),
                    Operator::And => i64::from(l != 0 && r != 0),
                    Operator::Or => i64::from(l != 0 || r != 0),
                    Operator::BitAnd => l & r,
                    Operator::BitOr => l | r,
                    Operator::Sub => l.checked_sub(r).ok_or_else(overflow)?,
                    Operator::Add => l.checked_add(r).ok_or_else(overflow)?,
                    Operator::Mul => l.checked_mul(r).ok_or_else(overflow)?,
                    Operator::Div => {
                        if r == 0 {
                            return Err(NifError::DivisionByZero(quote(&self.to_string())));
                        }
                        l.checked_div(r).ok_or_else(overflow)?
                    }
                    Operator::Not => i64::from(r == 0),
                };
                Ok(Some(value))
            }
        }
    }

    /// Re-serializes the expression for a target language.
    ///
    /// Names get `opts.prefix` and `opts.name_hook`; type references (and names
    /// accepted by `opts.is_type`) become `IsDerivedType(Name::TYPE)`. Nested
    /// operator expressions are always bracketed.
    pub fn render(&self, opts: &RenderOptions) -> String {
        let (lb, rb) = if opts.brackets { ("(", ")") } else { ("", "") };
        let nested = RenderOptions { brackets: true, ..*opts };
        match self {
            Expr::Terminal(t) => render_terminal(t, opts),
            Expr::Unary { op, operand } => format!("{}{}{}{}", lb, op, operand.render(&nested), rb),
            Expr::Binary { op, left, right } => format!(
                "{}{} {} {}{}",
                lb,
                left.render(&nested),
                op,
                right.render(&nested),
                rb
            ),
        }
    }
}

/// Classifies operator-free text as a literal or a name.
///
/// Four-component versions become hex literals, `0x` numbers hex literals,
/// decimal numbers integers, and anything else a field name passed through
/// `name_hook`.
pub fn classify_terminal(text: &str, name_hook: Option<NameHook>) -> Result<Terminal, NifError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Terminal::Empty);
    }
    if VERSION_LITERAL.is_match(text) {
        return Ok(Terminal::HexLiteral(VersionOrdinal::pack(text)?.value()));
    }
    if HEX_LITERAL.is_match(text) {
        return u32::from_str_radix(&text[2..], 16)
            .map(Terminal::HexLiteral)
            .map_err(|_| NifError::InvalidValue { what: "hex literal", value: quote(text) });
    }
    if INTEGER_LITERAL.is_match(text) {
        return text
            .parse::<i64>()
            .map(Terminal::Integer)
            .map_err(|_| NifError::InvalidValue { what: "integer literal", value: quote(text) });
    }
    let name = match name_hook {
        Some(hook) => hook(text),
        None => text.to_string(),
    };
    Ok(Terminal::FieldRef(name))
}

fn evaluate_terminal<C: FieldContext + ?Sized>(t: &Terminal, ctx: &C) -> Result<Option<i64>, NifError> {
    match t {
        Terminal::Integer(n) => Ok(Some(*n)),
        Terminal::HexLiteral(v) => Ok(Some(i64::from(*v))),
        Terminal::FieldRef(name) => ctx
            .field_value(name)
            .map(Some)
            .ok_or_else(|| NifError::UnboundReference(quote(name))),
        Terminal::TypeRef(name) => ctx
            .is_derived_type(name)
            .map(|b| Some(i64::from(b)))
            .ok_or_else(|| NifError::UnboundReference(quote(name))),
        Terminal::Empty => Ok(None),
    }
}

fn render_terminal(t: &Terminal, opts: &RenderOptions) -> String {
    let type_check = |name: &str| format!("IsDerivedType({}::TYPE)", name);
    match t {
        Terminal::Empty => String::new(),
        Terminal::Integer(_) | Terminal::HexLiteral(_) => t.to_string(),
        Terminal::TypeRef(name) => type_check(name),
        Terminal::FieldRef(name) => {
            if opts.is_type.is_some_and(|is_type| is_type(name.as_str())) {
                return type_check(name);
            }
            let name = match opts.name_hook {
                Some(hook) => hook(name.as_str()),
                None => name.clone(),
            };
            format!("{}{}", opts.prefix, name)
        }
    }
}

/// Writes the expression back in its own syntax, nested operators bracketed.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn nested(e: &Expr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match e {
                Expr::Terminal(t) => write!(f, "{}", t),
                _ => write!(f, "({})", e),
            }
        }

        match self {
            Expr::Terminal(t) => write!(f, "{}", t),
            Expr::Unary { op, operand } => {
                write!(f, "{}", op)?;
                nested(operand, f)
            }
            Expr::Binary { op, left, right } => {
                nested(left, f)?;
                write!(f, " {} ", op)?;
                nested(right, f)
            }
        }
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn ctx(pairs: &[(&str, i64)]) -> HashMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn eval(text: &str, c: &HashMap<String, i64>) -> i64 {
        Expr::parse(text).unwrap().evaluate(c).unwrap().unwrap()
    }

    #[test]
    fn test_evaluate_boolean_and_bitwise() {
        let c = ctx(&[("x", 0), ("y", 1)]);
        assert_eq!(eval("x || y", &c), 1);
        assert_eq!(eval("x && y", &c), 0);
        assert_eq!(Expr::parse("99 & 15").unwrap().evaluate(&()).unwrap(), Some(3));
        assert_eq!(eval("(99&15)&&y", &c), 1);
        assert_eq!(eval("1 == 1", &c), 1);
        assert_eq!(eval("1 != 1", &c), 0);
        assert_eq!(eval("4 | 1", &c), 5);
        assert_eq!(eval("!x", &c), 1);
        assert_eq!(eval("!(x || y)", &c), 0);
    }

    #[test]
    fn test_evaluate_with_name_hook() {
        let hook = |s: &str| format!("hello_{}", s.to_lowercase());
        let expr = Expr::parse_with("(99 &15) &&WoRlD", Some(&hook)).unwrap();
        let c = ctx(&[("hello_world", 0)]);
        assert_eq!(expr.evaluate(&c).unwrap(), Some(0));
        assert_eq!(expr.field_refs(), vec!["hello_world"]);
    }

    #[test]
    fn test_evaluate_arithmetic() {
        let c = ctx(&[("n", 6)]);
        assert_eq!(eval("n * 2", &c), 12);
        assert_eq!(eval("7 / 2", &c), 3);
        assert_eq!(eval("-7 / 2", &c), -3);
        assert_eq!(eval("n - 1", &c), 5);
        // Operators split left to right: 10 - (4 - 1).
        assert_eq!(eval("10 - 4 - 1", &c), 7);
        assert_eq!(eval("n >= 6", &c), 1);
        assert_eq!(eval("n < 6", &c), 0);
    }

    #[test]
    fn test_evaluate_errors() {
        let err = Expr::parse("c && d").unwrap().evaluate(&()).unwrap_err();
        assert!(matches!(err, NifError::UnboundReference(ref n) if n == "\"c\""), "{:?}", err);

        let err = Expr::parse("4 / (2 - 2)").unwrap().evaluate(&()).unwrap_err();
        assert!(matches!(err, NifError::DivisionByZero(_)), "{:?}", err);
    }

    #[test]
    fn test_empty_expression() {
        assert!(Expr::parse("()").unwrap().is_empty());
        assert!(Expr::parse(" (( )) ").unwrap().is_empty());
        let expr = Expr::parse("").unwrap();
        assert!(expr.is_empty());
        assert_eq!(expr.evaluate(&()).unwrap(), None);
        assert_eq!(expr.to_string(), "");
        assert_eq!(expr.render(&RenderOptions::default()), "");
    }

    #[test]
    fn test_syntax_errors() {
        for text in ["a(b)c", "(a || b", "a ||", "!", "() && 1", "() + 2", "!()", "a | ()", "!(())"] {
            assert!(
                matches!(Expr::parse(text), Err(NifError::SyntaxError { .. })),
                "{} should not parse",
                text
            );
        }
    }

    #[test]
    fn test_terminal_classification() {
        assert_eq!(
            Expr::parse("Version >= 10.0.1.0").unwrap().right(),
            Some(&Expr::Terminal(Terminal::HexLiteral(0x0A00_0100)))
        );
        assert_eq!(classify_terminal("0x0A000100", None).unwrap(), Terminal::HexLiteral(0x0A00_0100));
        assert_eq!(classify_terminal("42", None).unwrap(), Terminal::Integer(42));
        assert_eq!(classify_terminal("-1", None).unwrap(), Terminal::Integer(-1));
        assert_eq!(
            classify_terminal("Num Vertices", None).unwrap(),
            Terminal::FieldRef("Num Vertices".into())
        );
        assert_eq!(classify_terminal("  ", None).unwrap(), Terminal::Empty);
    }

    #[test]
    fn test_operand_accessors() {
        let e = Expr::parse("Num Blocks").unwrap();
        assert_eq!(e.left_name(), Some("Num Blocks"));
        assert!(e.right_is_numeric_or_absent());

        let e = Expr::parse("Num Blocks * 3").unwrap();
        assert_eq!(e.left_name(), Some("Num Blocks"));
        assert!(e.right_is_numeric_or_absent());

        let e = Expr::parse("Num Blocks * Stride").unwrap();
        assert!(!e.right_is_numeric_or_absent());

        let e = Expr::parse("!Has Data").unwrap();
        assert_eq!(e.op(), Some(Operator::Not));
        assert_eq!(e.left_name(), Some("Has Data"));

        let e = Expr::parse("(a || b) && c").unwrap();
        assert_eq!(e.left_name(), None);
        assert_eq!(Expr::parse("4").unwrap().as_integer(), Some(4));
    }

    #[test]
    fn test_render() {
        let expr = Expr::parse("Num Vertices > 0 && Has Normals").unwrap();
        let hook = |s: &str| crate::utils::member_name(s);
        let opts = RenderOptions {
            prefix:    "this->",
            name_hook: Some(&hook),
            ..Default::default()
        };
        assert_eq!(expr.render(&opts), "(this->numVertices > (0 && this->hasNormals))");

        let flat = RenderOptions { brackets: false, ..opts };
        assert_eq!(expr.render(&flat), "this->numVertices > (0 && this->hasNormals)");

        let version = Expr::parse("Version >= 10.0.1.0").unwrap();
        let plain = RenderOptions { brackets: false, ..Default::default() };
        assert_eq!(version.render(&plain), "Version >= 0x0A000100");

        let unary = Expr::parse("!Has UV").unwrap();
        assert_eq!(unary.render(&opts), "(!this->hasUv)");
    }

    #[test]
    fn test_render_type_checks() {
        let is_block = |name: &str| name == "NiNode";
        let expr = Expr::parse("NiNode || Flags & 4").unwrap();
        let opts = RenderOptions { is_type: Some(&is_block), brackets: false, ..Default::default() };
        assert_eq!(expr.render(&opts), "IsDerivedType(NiNode::TYPE) || (Flags & 4)");

        let resolved = expr.resolve_type_refs(&is_block);
        assert_eq!(resolved.left(), &Expr::Terminal(Terminal::TypeRef("NiNode".into())));
        assert_eq!(resolved.field_refs(), vec!["Flags"]);
        let plain = RenderOptions { brackets: false, ..Default::default() };
        assert_eq!(resolved.render(&plain), "IsDerivedType(NiNode::TYPE) || (Flags & 4)");
    }

    #[test]
    fn test_render_round_trip_preserves_value() {
        let c = ctx(&[("x", 0), ("y", 1), ("a", 1), ("b", 2), ("c", 3), ("Version", 0x0A00_0100)]);
        let cases = [
            "x || y",
            "(a == 1) && (b != 2)",
            "a & 4 == 4",
            "!x || y",
            "!(x)",
            "Version >= 10.0.1.0 && Version <= 20.0.0.5",
            "0x0A000100 == Version",
            "-3 + x * 2",
            "((a))",
            "a - b - c",
            "(a - b) - c",
            "c / b * a",
            "(c > b) | (a < b)",
        ];
        let plain = RenderOptions { brackets: false, ..Default::default() };
        for text in cases {
            let expr = Expr::parse(text).unwrap();
            let expected = expr.evaluate(&c).unwrap();
            for rendered in [expr.render(&plain), expr.render(&RenderOptions::default()), expr.to_string()] {
                let reparsed = Expr::parse(&rendered)
                    .unwrap_or_else(|e| panic!("{} -> {} did not reparse: {}", text, rendered, e));
                assert_eq!(reparsed.evaluate(&c).unwrap(), expected, "{} -> {}", text, rendered);
            }
        }
    }

    #[test]
    fn test_serialize_as_text() {
        let expr = Expr::parse("(a | b) & 3").unwrap();
        assert_eq!(serde_json::to_string(&expr).unwrap(), "\"(a | b) & 3\"");
    }
}
