//! Boolean combination of filters: `filterExpression=(0or1)and2`.
//!
//! Leaves are filter indexes, operators are `and`, `or` and `xor`. Every
//! expression has a normalized form in which only nested operations are
//! parenthesized, so `(0and1)or2`, `((0and1))or(2)` and `0and1or2` all
//! compare equal.
//!
//! ```rust
//! use questful_query::expression::FilterExpression;
//!
//! let expression = FilterExpression::parse("0and1or2").unwrap();
//! assert_eq!(expression.normalized(), "(0and1)or2");
//! assert_eq!(expression.indexes(), vec![0, 1, 2]);
//! ```

mod lexer;
mod tree;

pub use lexer::{Token, Tokens, tokenize};
pub use tree::SyntaxNode;

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::{QueryError, QueryResult};

/// `and`, `or`, `xor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    /// Both sides hold.
    And,
    /// Either side holds.
    Or,
    /// Exactly one side holds.
    Xor,
}

impl LogicalOperator {
    /// All operators.
    pub const ALL: [LogicalOperator; 3] = [Self::And, Self::Xor, Self::Or];

    /// The keyword as written in expressions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
        }
    }

    /// The SQL keyword.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
        }
    }

    /// Higher binds tighter.
    pub(crate) fn binding_power(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::Xor => 2,
            Self::And => 3,
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `filterExpression`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpression {
    expression: String,
    tokens: Tokens,
    tree: SyntaxNode,
    normalized: String,
}

impl FilterExpression {
    /// Parse an expression. Blank input is rejected.
    pub fn parse(expression: &str) -> QueryResult<Self> {
        if expression.trim().is_empty() {
            return Err(QueryError::malformed_expression(
                expression,
                "Malformed expression. Expression is empty",
            ));
        }

        let tokens = tokenize(expression)?;
        let tree = tree::build(&tokens, expression)?;
        let normalized = tree.normalize();

        debug!(expression, normalized = %normalized, "Parsed filter expression");
        Ok(Self {
            expression: expression.to_string(),
            tokens,
            tree,
            normalized,
        })
    }

    /// Parse an optional expression; missing or blank input yields `None`.
    pub fn parse_optional(expression: Option<&str>) -> QueryResult<Option<Self>> {
        match expression {
            Some(e) if !e.trim().is_empty() => Self::parse(e).map(Some),
            _ => Ok(None),
        }
    }

    /// The expression as submitted.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The tokens of the submitted expression.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// The canonical text.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// The syntax tree.
    pub fn tree(&self) -> &SyntaxNode {
        &self.tree
    }

    /// Distinct filter indexes referenced, ascending.
    pub fn indexes(&self) -> Vec<usize> {
        self.tree.indexes()
    }

    /// Serializable view of this expression.
    pub fn summary(&self) -> ExpressionSummary {
        ExpressionSummary {
            expression_original: self.expression.clone(),
            expression_normalized: self.normalized.clone(),
            indexes: self.indexes(),
        }
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

/// Serializable view of a [`FilterExpression`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionSummary {
    /// As submitted.
    pub expression_original: String,
    /// Canonical text.
    pub expression_normalized: String,
    /// Referenced indexes.
    pub indexes: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_parse_normalizes() {
        let expression = FilterExpression::parse("((0)or(1))").unwrap();
        assert_eq!(expression.expression(), "((0)or(1))");
        assert_eq!(expression.normalized(), "0or1");
        assert_eq!(expression.to_string(), "0or1");
        assert_eq!(expression.tokens().len(), 9);
    }

    #[test]
    fn test_equivalent_expressions_compare_by_normalized_text() {
        let a = FilterExpression::parse("0and1or2").unwrap();
        let b = FilterExpression::parse("((0and1))or(2)").unwrap();
        assert_eq!(a.normalized(), b.normalized());
        assert_eq!(a.tree(), b.tree());
    }

    #[test]
    fn test_blank() {
        let err = FilterExpression::parse("  ").unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedFilterExpression);
        assert!(FilterExpression::parse_optional(Some(" ")).unwrap().is_none());
        assert!(FilterExpression::parse_optional(None).unwrap().is_none());
        assert!(FilterExpression::parse_optional(Some("0")).unwrap().is_some());
    }

    #[test]
    fn test_summary() {
        let summary = FilterExpression::parse("2or(0and2)").unwrap().summary();
        assert_eq!(
            serde_json::to_value(summary).unwrap(),
            serde_json::json!({
                "expressionOriginal": "2or(0and2)",
                "expressionNormalized": "2or(0and2)",
                "indexes": [0, 2],
            })
        );
    }
}
