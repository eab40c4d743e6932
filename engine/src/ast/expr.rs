use super::matches::{DirectionalMatchGroup, RegularMatchGroup};
use crate::token::Conjunction;
use serde::Serialize;

/// A parsed filter.
///
/// Chains are right-recursive: `a and b or c` is
/// `Conjunction { left: a, op: And, right: (b or c) }`.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Default)]
pub enum Expression {
    /// The empty filter, which matches everything.
    #[default]
    Empty,
    Single(Box<Statement>),
    Conjunction {
        left: Box<Statement>,
        op: Conjunction,
        right: Box<Expression>,
    },
}

impl Expression {
    pub fn is_empty(&self) -> bool {
        matches!(self, Expression::Empty)
    }
}

/// One optionally negated term of an expression.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize)]
pub struct Statement {
    pub negated: bool,
    pub body: StatementBody,
}

#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize)]
pub enum StatementBody {
    Directional(DirectionalMatchGroup),
    Regular(RegularMatchGroup),
    /// A parenthesized expression.
    SubExpression(Box<Expression>),
}
