//! Tokenizer for `filterExpression` values.
//!
//! The lexer walks the input once, keeping the set of tokens that may legally
//! follow the previous one:
//!
//! | after | expected |
//! |---|---|
//! | start, `(`, keyword | `(` or digits |
//! | digits, `)` | `and` / `or` / `xor`, or `)` while a parenthesis is open |
//!
//! Whitespace is not allowed anywhere and keywords are lowercase.

use std::fmt;

use smallvec::SmallVec;
use tracing::trace;

use super::LogicalOperator;
use crate::error::{QueryError, QueryResult};

/// A lexical token of a filter expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// A filter index.
    Index(usize),
    /// `and`, `or`, `xor`
    Operator(LogicalOperator),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenParen => f.write_str("("),
            Self::CloseParen => f.write_str(")"),
            Self::Index(i) => write!(f, "{}", i),
            Self::Operator(op) => f.write_str(op.as_str()),
        }
    }
}

/// Token buffer; most expressions fit inline.
pub type Tokens = SmallVec<[Token; 16]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    /// `(` or digits.
    Operand,
    /// Keyword, or `)` if a parenthesis is open.
    Operator,
}

/// Tokenize `expression`, rejecting anything outside the grammar.
///
/// ```rust
/// use questful_query::expression::{tokenize, Token, LogicalOperator};
///
/// let tokens = tokenize("(0or1)and2").unwrap();
/// assert_eq!(tokens[2], Token::Operator(LogicalOperator::Or));
/// assert_eq!(tokens.len(), 7);
/// ```
pub fn tokenize(expression: &str) -> QueryResult<Tokens> {
    let bytes = expression.as_bytes();
    let mut tokens = Tokens::new();
    let mut expect = Expect::Operand;
    let mut opened = 0usize;
    let mut closed = 0usize;
    let mut pos = 0usize;

    while pos < bytes.len() {
        let rest = &expression[pos..];
        let byte = bytes[pos];

        match expect {
            Expect::Operand if byte == b'(' => {
                tokens.push(Token::OpenParen);
                opened += 1;
                pos += 1;
            }
            Expect::Operand if byte.is_ascii_digit() => {
                let len = rest.bytes().take_while(u8::is_ascii_digit).count();
                let digits = &rest[..len];
                let index = digits.parse::<usize>().map_err(|_| {
                    QueryError::malformed_expression(
                        expression,
                        format!(
                            "Malformed expression. Index '{}' at position {} is out of range in expression: {}",
                            digits, pos, expression
                        ),
                    )
                    .with_position(pos)
                })?;
                tokens.push(Token::Index(index));
                expect = Expect::Operator;
                pos += len;
            }
            Expect::Operator if byte == b')' && closed < opened => {
                tokens.push(Token::CloseParen);
                closed += 1;
                pos += 1;
            }
            Expect::Operator => match LogicalOperator::ALL.iter().find(|op| rest.starts_with(op.as_str())) {
                Some(op) => {
                    tokens.push(Token::Operator(*op));
                    expect = Expect::Operand;
                    pos += op.as_str().len();
                }
                None => return Err(unexpected(expression, pos)),
            },
            Expect::Operand => return Err(unexpected(expression, pos)),
        }
    }

    if opened != closed {
        return Err(QueryError::malformed_expression(
            expression,
            format!(
                "Malformed expression. Mismatching number of starting and ending parentheses. {} and {}, respectively, in: {}",
                opened, closed, expression
            ),
        ));
    }
    if expect == Expect::Operand {
        return Err(QueryError::malformed_expression(
            expression,
            format!("Malformed expression. Ended unexpectedly: {}", expression),
        ));
    }

    trace!(expression, tokens = tokens.len(), "Tokenized filter expression");
    Ok(tokens)
}

fn unexpected(expression: &str, pos: usize) -> QueryError {
    // everything before `pos` was ASCII, so the byte offset is the char offset
    let token = expression[pos..].chars().next().unwrap_or_default();
    QueryError::malformed_expression(
        expression,
        format!(
            "Malformed expression. Unexpected token '{}' at position {} in expression: {}",
            token, pos, expression
        ),
    )
    .with_position(pos)
}
