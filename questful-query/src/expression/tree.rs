//! Syntax tree for filter expressions.
//!
//! Binding strength, tightest first: `and`, `xor`, `or`. Operators of equal
//! strength group to the left, and parentheses always form a single subtree.

use super::LogicalOperator;
use super::lexer::Token;
use crate::error::{QueryError, QueryResult};

/// A node of the expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SyntaxNode {
    /// `left and right`
    And(Box<SyntaxNode>, Box<SyntaxNode>),
    /// `left or right`
    Or(Box<SyntaxNode>, Box<SyntaxNode>),
    /// `left xor right`
    Xor(Box<SyntaxNode>, Box<SyntaxNode>),
    /// A filter index.
    Leaf(usize),
}

impl SyntaxNode {
    /// Combine two nodes with `operator`.
    pub fn binary(operator: LogicalOperator, left: SyntaxNode, right: SyntaxNode) -> Self {
        let (left, right) = (Box::new(left), Box::new(right));
        match operator {
            LogicalOperator::And => Self::And(left, right),
            LogicalOperator::Or => Self::Or(left, right),
            LogicalOperator::Xor => Self::Xor(left, right),
        }
    }

    /// Operator and children of a binary node; `None` for leaves.
    pub fn as_binary(&self) -> Option<(LogicalOperator, &SyntaxNode, &SyntaxNode)> {
        match self {
            Self::And(l, r) => Some((LogicalOperator::And, l, r)),
            Self::Or(l, r) => Some((LogicalOperator::Or, l, r)),
            Self::Xor(l, r) => Some((LogicalOperator::Xor, l, r)),
            Self::Leaf(_) => None,
        }
    }

    /// Whether this is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Canonical text: binary children in parentheses, leaves bare.
    pub fn normalize(&self) -> String {
        let mut out = String::new();
        self.write_normalized(&mut out);
        out
    }

    fn write_normalized(&self, out: &mut String) {
        match self.as_binary() {
            None => {
                if let Self::Leaf(index) = self {
                    out.push_str(&index.to_string());
                }
            }
            Some((op, left, right)) => {
                for (i, child) in [left, right].into_iter().enumerate() {
                    if i == 1 {
                        out.push_str(op.as_str());
                    }
                    if child.is_leaf() {
                        child.write_normalized(out);
                    } else {
                        out.push('(');
                        child.write_normalized(out);
                        out.push(')');
                    }
                }
            }
        }
    }

    /// Distinct leaf indexes, ascending.
    pub fn indexes(&self) -> Vec<usize> {
        let mut indexes = Vec::new();
        self.collect_leaves(&mut indexes);
        indexes.sort_unstable();
        indexes.dedup();
        indexes
    }

    fn collect_leaves(&self, out: &mut Vec<usize>) {
        match self {
            Self::Leaf(index) => out.push(*index),
            Self::And(l, r) | Self::Or(l, r) | Self::Xor(l, r) => {
                l.collect_leaves(out);
                r.collect_leaves(out);
            }
        }
    }
}

/// Build a tree from tokens already accepted by the lexer.
pub(crate) fn build(tokens: &[Token], expression: &str) -> QueryResult<SyntaxNode> {
    let mut parser = Parser { tokens, pos: 0, expression };
    let node = parser.expression(0)?;
    match parser.tokens.get(parser.pos) {
        None => Ok(node),
        Some(token) => Err(parser.invariant(&format!("trailing token '{}'", token))),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    expression: &'a str,
}

impl Parser<'_> {
    fn expression(&mut self, min_binding: u8) -> QueryResult<SyntaxNode> {
        let mut left = self.operand()?;

        while let Some(Token::Operator(op)) = self.tokens.get(self.pos).copied() {
            if op.binding_power() < min_binding {
                break;
            }
            self.pos += 1;
            let right = self.expression(op.binding_power() + 1)?;
            left = SyntaxNode::binary(op, left, right);
        }

        Ok(left)
    }

    fn operand(&mut self) -> QueryResult<SyntaxNode> {
        let token = self.tokens.get(self.pos).copied();
        self.pos += 1;
        match token {
            Some(Token::Index(index)) => Ok(SyntaxNode::Leaf(index)),
            Some(Token::OpenParen) => {
                let node = self.expression(0)?;
                match self.tokens.get(self.pos) {
                    Some(Token::CloseParen) => {
                        self.pos += 1;
                        Ok(node)
                    }
                    _ => Err(self.invariant("missing ')'")),
                }
            }
            Some(other) => Err(self.invariant(&format!("unexpected token '{}'", other))),
            None => Err(self.invariant("unexpected end of tokens")),
        }
    }

    fn invariant(&self, detail: &str) -> QueryError {
        QueryError::internal(format!(
            "Failed to build syntax tree for filter expression '{}': {}",
            self.expression, detail
        ))
    }
}
