//! Replacement fragments and the printer that turns them into source text.
//!
//! A [`Fragment`] is a detached expression tree: it has no span of its own
//! and may embed untouched subtrees of the original file, which are printed
//! from the original text. Rendering always happens against the node being
//! replaced, because whether the replacement needs parentheses depends on
//! where it lands.

use crate::ts::SyntaxNode;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("'{name}' is not a valid identifier")]
    InvalidIdentifier { name: String },

    #[error("fragment embeds a node from {found}, but is rendered into {expected}")]
    ForeignNode { expected: String, found: String },

    #[error("number {value} has no literal form")]
    NonFiniteNumber { value: f64 },
}

/// Binary operators a rule can synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// `??`
    Coalesce,
    /// `||`
    LogicalOr,
    /// `&&`
    LogicalAnd,
}

impl BinaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOperator::Coalesce => "??",
            BinaryOperator::LogicalOr => "||",
            BinaryOperator::LogicalAnd => "&&",
        }
    }

    fn precedence(self) -> Precedence {
        binary_precedence(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Literal {
    fn render(&self) -> Result<String, RenderError> {
        match self {
            Literal::Boolean(value) => Ok(value.to_string()),
            Literal::Integer(value) => Ok(value.to_string()),
            Literal::Float(value) if !value.is_finite() => {
                Err(RenderError::NonFiniteNumber { value: *value })
            }
            Literal::Float(value) => Ok(value.to_string()),
            // JSON string syntax is valid JavaScript string syntax.
            Literal::String(value) => Ok(serde_json::Value::String(value.clone()).to_string()),
        }
    }

    fn precedence(&self) -> Precedence {
        match self {
            Literal::Integer(value) if *value < 0 => Precedence::Unary,
            Literal::Float(value) if value.is_sign_negative() => Precedence::Unary,
            _ => Precedence::Primary,
        }
    }
}

/// A synthesized expression, not yet anchored to any span.
#[derive(Debug, Clone)]
pub enum Fragment<'f> {
    /// An original subtree, reused verbatim.
    Node(SyntaxNode<'f>),
    Identifier(String),
    Literal(Literal),
    PropertyAccess {
        object: Box<Fragment<'f>>,
        /// `?.` instead of `.`
        optional: bool,
        name: String,
    },
    Call {
        callee: Box<Fragment<'f>>,
        arguments: Vec<Fragment<'f>>,
    },
    Binary {
        left: Box<Fragment<'f>>,
        operator: BinaryOperator,
        right: Box<Fragment<'f>>,
    },
}

impl<'f> Fragment<'f> {
    pub fn node(node: SyntaxNode<'f>) -> Self {
        Fragment::Node(node)
    }

    pub fn property_access(object: Fragment<'f>, optional: bool, name: impl Into<String>) -> Self {
        Fragment::PropertyAccess {
            object: Box::new(object),
            optional,
            name: name.into(),
        }
    }

    pub fn call(callee: Fragment<'f>, arguments: Vec<Fragment<'f>>) -> Self {
        Fragment::Call {
            callee: Box::new(callee),
            arguments,
        }
    }

    pub fn binary(left: Fragment<'f>, operator: BinaryOperator, right: Fragment<'f>) -> Self {
        Fragment::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    fn precedence(&self) -> Precedence {
        match self {
            Fragment::Node(node) => node_precedence(*node),
            Fragment::Identifier(_) => Precedence::Primary,
            Fragment::Literal(literal) => literal.precedence(),
            Fragment::PropertyAccess { .. } | Fragment::Call { .. } => Precedence::Member,
            Fragment::Binary { operator, .. } => operator.precedence(),
        }
    }

    /// Top-level binary operator, for the `??` mixing rule.
    fn operator(&self) -> Option<&'f str> {
        match self {
            Fragment::Node(node) if node.kind() == "binary_expression" => {
                node.field("operator").map(|op| op.text())
            }
            Fragment::Binary { operator, .. } => Some(operator.as_str()),
            _ => None,
        }
    }

    fn is_optional_chain(&self) -> bool {
        match self {
            Fragment::Node(node) => node.is_optional_chain(),
            Fragment::PropertyAccess { object, optional, .. } => {
                *optional || object.is_optional_chain()
            }
            Fragment::Call { callee, .. } => callee.is_optional_chain(),
            _ => false,
        }
    }

    fn is_integer_literal(&self) -> bool {
        match self {
            Fragment::Node(node) => {
                // `1_000` too; `1.5`, `1e3`, `0x1` and `1n` take a `.` as is
                node.kind() == "number"
                    && node.text().bytes().all(|b| b.is_ascii_digit() || b == b'_')
            }
            Fragment::Literal(Literal::Integer(_)) => true,
            _ => false,
        }
    }
}

/// Expression precedence, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Comma,
    Assignment,
    Conditional,
    Coalesce,
    LogicalOr,
    LogicalAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseAnd,
    Equality,
    Relational,
    Shift,
    Additive,
    Multiplicative,
    Exponentiation,
    Unary,
    Update,
    LeftHandSide,
    Member,
    Primary,
}

impl Precedence {
    fn next(self) -> Self {
        use Precedence::*;
        match self {
            Comma => Assignment,
            Assignment => Conditional,
            Conditional => Coalesce,
            Coalesce => LogicalOr,
            LogicalOr => LogicalAnd,
            LogicalAnd => BitwiseOr,
            BitwiseOr => BitwiseXor,
            BitwiseXor => BitwiseAnd,
            BitwiseAnd => Equality,
            Equality => Relational,
            Relational => Shift,
            Shift => Additive,
            Additive => Multiplicative,
            Multiplicative => Exponentiation,
            Exponentiation => Unary,
            Unary => Update,
            Update => LeftHandSide,
            LeftHandSide => Member,
            Member | Primary => Primary,
        }
    }
}

fn binary_precedence(operator: &str) -> Precedence {
    match operator {
        "??" => Precedence::Coalesce,
        "||" => Precedence::LogicalOr,
        "&&" => Precedence::LogicalAnd,
        "|" => Precedence::BitwiseOr,
        "^" => Precedence::BitwiseXor,
        "&" => Precedence::BitwiseAnd,
        "==" | "!=" | "===" | "!==" => Precedence::Equality,
        "<" | ">" | "<=" | ">=" | "instanceof" | "in" => Precedence::Relational,
        "<<" | ">>" | ">>>" => Precedence::Shift,
        "+" | "-" => Precedence::Additive,
        "*" | "/" | "%" => Precedence::Multiplicative,
        "**" => Precedence::Exponentiation,
        _ => Precedence::Comma,
    }
}

fn node_precedence(node: SyntaxNode<'_>) -> Precedence {
    match node.kind() {
        "sequence_expression" => Precedence::Comma,
        "assignment_expression"
        | "augmented_assignment_expression"
        | "arrow_function"
        | "yield_expression"
        | "spread_element" => Precedence::Assignment,
        "ternary_expression" => Precedence::Conditional,
        "binary_expression" => node
            .field("operator")
            .map(|op| binary_precedence(op.text()))
            .unwrap_or(Precedence::Comma),
        "as_expression" | "satisfies_expression" => Precedence::Relational,
        "unary_expression" | "await_expression" => Precedence::Unary,
        "update_expression" => Precedence::Update,
        "new_expression" if node.field("arguments").is_none() => Precedence::LeftHandSide,
        "call_expression" | "member_expression" | "subscript_expression"
        | "non_null_expression" | "new_expression" => Precedence::Member,
        _ => Precedence::Primary,
    }
}

fn mixes_coalesce(inner: Option<&str>, outer: Option<&str>) -> bool {
    matches!(
        (inner, outer),
        (Some("??"), Some("||" | "&&")) | (Some("||" | "&&"), Some("??"))
    )
}

/// Requirements an operand position puts on the expression placed in it.
#[derive(Debug, Clone, Copy)]
struct Slot<'s> {
    min: Precedence,
    operator: Option<&'s str>,
    /// Object of an access that is not itself part of an optional chain.
    ends_chain: bool,
}

impl<'s> Slot<'s> {
    fn any() -> Self {
        Self::at_least(Precedence::Assignment)
    }

    fn at_least(min: Precedence) -> Self {
        Self {
            min,
            operator: None,
            ends_chain: false,
        }
    }

    fn binary(min: Precedence, operator: Option<&'s str>) -> Self {
        Self {
            min,
            operator,
            ends_chain: false,
        }
    }

    /// Object position of a parsed access; an optional chain placed there
    /// must not absorb the access.
    fn access_object(parent: SyntaxNode<'_>) -> Self {
        Self {
            ends_chain: parent.field("optional_chain").is_none(),
            ..Self::at_least(Precedence::Member)
        }
    }

    fn needs_parens(&self, fragment: &Fragment<'_>) -> bool {
        fragment.precedence() < self.min
            || mixes_coalesce(fragment.operator(), self.operator)
            || (self.ends_chain && fragment.is_optional_chain())
    }
}

/// Slot the replaced node occupies in its parent.
fn site_slot<'s>(site: SyntaxNode<'s>) -> Slot<'s> {
    let Some(parent) = site.parent() else {
        return Slot::any();
    };
    let is_field = |name: &str| parent.field(name).is_some_and(|f| f.same_node(&site));

    match parent.kind() {
        "member_expression" | "subscript_expression" if is_field("object") => {
            Slot::access_object(parent)
        }
        "call_expression" if is_field("function") => Slot::access_object(parent),
        "new_expression" if is_field("constructor") => Slot::at_least(Precedence::Primary),
        "non_null_expression" => Slot {
            ends_chain: true,
            ..Slot::at_least(Precedence::Member)
        },
        "update_expression" => Slot::at_least(Precedence::LeftHandSide),
        "unary_expression" | "await_expression" => Slot::at_least(Precedence::Unary),
        "as_expression" | "satisfies_expression" => Slot::at_least(Precedence::Relational),
        "binary_expression" => {
            let operator = parent.field("operator").map(|op| op.text());
            let prec = operator.map(binary_precedence).unwrap_or(Precedence::Primary);
            let min = match (operator, is_field("left")) {
                (Some("**"), true) => Precedence::Update,
                (Some("**"), false) => prec,
                (_, true) => prec,
                (_, false) => prec.next(),
            };
            Slot::binary(min, operator)
        }
        "ternary_expression" if is_field("condition") => Slot::at_least(Precedence::Coalesce),
        _ => Slot::any(),
    }
}

/// Renders fragments into canonical single-line source text.
#[derive(Debug, Default, Clone, Copy)]
pub struct Printer;

impl Printer {
    pub fn new() -> Self {
        Printer
    }

    /// Render `fragment` as the replacement for `site`, adding parentheses
    /// when the surrounding expression would otherwise re-associate it.
    pub fn print(&self, fragment: &Fragment<'_>, site: SyntaxNode<'_>) -> Result<String, RenderError> {
        let mut out = String::new();
        self.emit(fragment, site, site_slot(site), &mut out)?;
        Ok(out)
    }

    fn emit(
        &self,
        fragment: &Fragment<'_>,
        site: SyntaxNode<'_>,
        slot: Slot<'_>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let wrap = slot.needs_parens(fragment);
        if wrap {
            out.push('(');
        }

        match fragment {
            Fragment::Node(node) => {
                if !std::ptr::eq(node.file(), site.file()) {
                    return Err(RenderError::ForeignNode {
                        expected: site.file().path().display().to_string(),
                        found: node.file().path().display().to_string(),
                    });
                }
                out.push_str(node.text());
            }
            Fragment::Identifier(name) => {
                validate_identifier(name)?;
                out.push_str(name);
            }
            Fragment::Literal(literal) => out.push_str(&literal.render()?),
            Fragment::PropertyAccess { object, optional, name } => {
                validate_identifier(name)?;
                if object.is_integer_literal() {
                    // `1.toString` lexes as a number
                    out.push('(');
                    self.emit(object, site, Slot::any(), out)?;
                    out.push(')');
                } else {
                    // An optional chain object continues the chain: `a?.b.c`
                    self.emit(object, site, Slot::at_least(Precedence::Member), out)?;
                }
                out.push_str(if *optional { "?." } else { "." });
                out.push_str(name);
            }
            Fragment::Call { callee, arguments } => {
                self.emit(callee, site, Slot::at_least(Precedence::Member), out)?;
                out.push('(');
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.emit(argument, site, Slot::any(), out)?;
                }
                out.push(')');
            }
            Fragment::Binary { left, operator, right } => {
                let prec = operator.precedence();
                let op = Some(operator.as_str());
                self.emit(left, site, Slot::binary(prec, op), out)?;
                out.push(' ');
                out.push_str(operator.as_str());
                out.push(' ');
                self.emit(right, site, Slot::binary(prec.next(), op), out)?;
            }
        }

        if wrap {
            out.push(')');
        }
        Ok(())
    }
}

fn validate_identifier(name: &str) -> Result<(), RenderError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(RenderError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}

/// ASCII-level identifier check: `[A-Za-z_$][A-Za-z0-9_$]*`, plus any
/// non-ASCII letters.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let start_ok = first == '_' || first == '$' || first.is_alphabetic();
    start_ok && chars.all(|c| c == '_' || c == '$' || c.is_alphanumeric())
}
