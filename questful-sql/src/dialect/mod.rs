//! Backend-specific syntax.
//!
//! The condition builder and the expression walk produce the same structure
//! for every backend; a [`Dialect`] only decides the spelling of the parts
//! that differ.

mod doctrine;
mod mysql;
mod sqlite;

pub use doctrine::Doctrine;
pub use mysql::MySql;
pub use sqlite::Sqlite;

use std::fmt;

use questful_query::FilterValue;

/// How a backend spells exclusive or.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XorStyle {
    /// `a XOR b`
    Infix,
    /// `XOR(a, b)`, a user-defined function.
    Function,
    /// `(a AND NOT (b)) OR (NOT (a) AND b)`
    Expanded,
}

/// Spelling rules of one SQL or DQL backend.
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Backend name, used in log events.
    fn name(&self) -> &'static str;

    /// Placeholder for a case-sensitive string parameter, including any
    /// binary marker the backend needs.
    fn string_placeholder(&self, name: &str) -> String {
        format!(":{}", name)
    }

    /// The `ESCAPE` literal following `LIKE`.
    fn like_escape(&self) -> &'static str {
        r"'\'"
    }

    /// A regexp match of `column` against the parameter `name`.
    fn regexp(&self, column: &str, negated: bool, name: &str, case_insensitive: bool) -> String;

    /// The bound pattern for a regexp filter.
    fn regexp_value(&self, pattern: &str, case_insensitive: bool) -> String {
        if case_insensitive {
            format!("(?i){}", pattern)
        } else {
            pattern.to_string()
        }
    }

    /// The bound value of a boolean in-list element.
    fn boolean_element(&self, value: bool) -> FilterValue {
        FilterValue::Int(i64::from(value))
    }

    /// How exclusive or is written.
    fn xor_style(&self) -> XorStyle;
}

pub(crate) fn not(negated: bool) -> &'static str {
    if negated { "NOT " } else { "" }
}
