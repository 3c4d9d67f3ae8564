//! Typed filters parsed from `filter[]=<key><operator><value>` entries.
//!
//! A raw entry is split into key, operator and value by [`parse_filter`]; the
//! value is classified into one [`FilterKind`] by the value lexer. The kind
//! decides which operators are legal:
//!
//! | kind | legal operators |
//! |---|---|
//! | null | `=` `!=` |
//! | boolean | `=` |
//! | integer, float, string | `=` `!=` `<` `<=` `>` `>=` |
//! | like, in, regexp | `=` `!=` |
//!
//! ```rust
//! use questful_query::filter::{parse_filter, FilterKind, Operator};
//!
//! let filter = parse_filter(0, "age>=18").unwrap();
//! assert_eq!(filter.key(), "age");
//! assert_eq!(filter.operator(), Operator::GreaterThanOrEqual);
//! assert_eq!(filter.kind(), &FilterKind::Integer(18));
//! ```

mod factory;
pub mod lexer;

pub use factory::{parse_filter, parse_filters};
pub use lexer::{ValueError, classify_value};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator between a filter key and its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// `=`
    #[serde(rename = "=")]
    Equal,
    /// `!=`
    #[serde(rename = "!=")]
    NotEqual,
    /// `<`
    #[serde(rename = "<")]
    LessThan,
    /// `<=`
    #[serde(rename = "<=")]
    LessThanOrEqual,
    /// `>`
    #[serde(rename = ">")]
    GreaterThan,
    /// `>=`
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
}

impl Operator {
    /// Every operator, longest symbols first.
    pub const ALL: [Operator; 6] = [
        Self::LessThanOrEqual,
        Self::GreaterThanOrEqual,
        Self::NotEqual,
        Self::Equal,
        Self::GreaterThan,
        Self::LessThan,
    ];

    /// The operator's symbol, also valid as SQL.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
        }
    }

    /// Look up an operator by its symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == symbol)
    }

    /// Whether this is `!=`.
    #[inline]
    pub fn is_negated(&self) -> bool {
        matches!(self, Self::NotEqual)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload-free discriminant of a [`FilterKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// `null`
    Null,
    /// `true` / `false`
    Boolean,
    /// `42`
    Integer,
    /// `4.2`
    Float,
    /// `"text"`
    String,
    /// `%"text"%`
    Like,
    /// `[1, "a", null]`
    In,
    /// `/pattern/`
    Regexp,
}

const EQUALITY: &[Operator] = &[Operator::Equal, Operator::NotEqual];
const EQUAL_ONLY: &[Operator] = &[Operator::Equal];
const COMPARISON: &[Operator] = &[
    Operator::Equal,
    Operator::NotEqual,
    Operator::LessThanOrEqual,
    Operator::GreaterThanOrEqual,
    Operator::GreaterThan,
    Operator::LessThan,
];

impl FilterType {
    /// All filter types.
    pub const ALL: [FilterType; 8] = [
        Self::Null,
        Self::Boolean,
        Self::Integer,
        Self::Float,
        Self::String,
        Self::Like,
        Self::In,
        Self::Regexp,
    ];

    /// Lowercase name used in messages and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Like => "like",
            Self::In => "in",
            Self::Regexp => "regexp",
        }
    }

    /// Operators this kind of filter can ever use.
    pub fn legal_operators(&self) -> &'static [Operator] {
        match self {
            Self::Boolean => EQUAL_ONLY,
            Self::Integer | Self::Float | Self::String => COMPARISON,
            Self::Null | Self::Like | Self::In | Self::Regexp => EQUALITY,
        }
    }

    /// Check whether `operator` is legal for this kind.
    #[inline]
    pub fn accepts(&self, operator: Operator) -> bool {
        self.legal_operators().contains(&operator)
    }

    /// Whether a `/i` modifier means anything for this kind.
    pub fn supports_case_insensitivity(&self) -> bool {
        matches!(self, Self::String | Self::Like | Self::In | Self::Regexp)
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Datatype of a single value, as used for In-list element constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// `null`
    Null,
    /// `true` / `false`
    Boolean,
    /// Floating point.
    Double,
    /// Integer.
    Integer,
    /// String.
    String,
}

impl ElementType {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Double => "double",
            Self::Integer => "integer",
            Self::String => "string",
        }
    }

    /// The filter kind whose constraint set applies to elements of this type.
    pub fn filter_type(&self) -> FilterType {
        match self {
            Self::Null => FilterType::Null,
            Self::Boolean => FilterType::Boolean,
            Self::Double => FilterType::Float,
            Self::Integer => FilterType::Integer,
            Self::String => FilterType::String,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value bound as a query parameter or handed to a constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// List of values (the payload of an In filter).
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Scalar datatype of the value; `None` for lists.
    pub fn element_type(&self) -> Option<ElementType> {
        match self {
            Self::Null => Some(ElementType::Null),
            Self::Bool(_) => Some(ElementType::Boolean),
            Self::Int(_) => Some(ElementType::Integer),
            Self::Float(_) => Some(ElementType::Double),
            Self::String(_) => Some(ElementType::String),
            Self::List(_) => None,
        }
    }

    /// Numeric view of integers and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// String view of string values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{:?}", v),
            Self::String(s) => write!(f, "\"{}\"", s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// A like pattern with its wildcard placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikePattern {
    /// The literal text to search for, without wildcards.
    pub value: String,
    /// `%` before the value.
    pub wildcard_left: bool,
    /// `%` after the value.
    pub wildcard_right: bool,
}

/// The typed payload of a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    /// `key=null`, also produced by an empty value.
    Null,
    /// `key=true`
    Boolean(bool),
    /// `key>5`
    Integer(i64),
    /// `key<2.5`
    Float(f64),
    /// `key="text"`
    String(String),
    /// `key=%"text"%`
    Like(LikePattern),
    /// `key=[1, "a", null]`, duplicates preserved.
    In(Vec<FilterValue>),
    /// `key=/^a.+z$/`, the pattern without delimiters.
    Regexp(String),
}

impl FilterKind {
    /// The discriminant.
    pub fn filter_type(&self) -> FilterType {
        match self {
            Self::Null => FilterType::Null,
            Self::Boolean(_) => FilterType::Boolean,
            Self::Integer(_) => FilterType::Integer,
            Self::Float(_) => FilterType::Float,
            Self::String(_) => FilterType::String,
            Self::Like(_) => FilterType::Like,
            Self::In(_) => FilterType::In,
            Self::Regexp(_) => FilterType::Regexp,
        }
    }

    /// The payload as a plain value. Like and regexp filters yield their text.
    pub fn value(&self) -> FilterValue {
        match self {
            Self::Null => FilterValue::Null,
            Self::Boolean(b) => FilterValue::Bool(*b),
            Self::Integer(i) => FilterValue::Int(*i),
            Self::Float(f) => FilterValue::Float(*f),
            Self::String(s) => FilterValue::String(s.clone()),
            Self::Like(like) => FilterValue::String(like.value.clone()),
            Self::In(items) => FilterValue::List(items.clone()),
            Self::Regexp(pattern) => FilterValue::String(pattern.clone()),
        }
    }
}

/// One parsed `filter[N]` entry.
///
/// Immutable once built; identity is the index it was submitted under, which
/// the owning collection keeps.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    expression: String,
    key: String,
    operator: Operator,
    kind: FilterKind,
    case_insensitive: bool,
}

impl Filter {
    /// Build a filter, rejecting operators the kind does not support.
    pub fn new(
        expression: impl Into<String>,
        key: impl Into<String>,
        operator: Operator,
        kind: FilterKind,
        case_insensitive: bool,
    ) -> Result<Self, ValueError> {
        let filter_type = kind.filter_type();
        if !filter_type.accepts(operator) {
            return Err(ValueError::UnsupportedOperator {
                operator,
                filter_type,
                expected: crate::error::quoted_list(filter_type.legal_operators()),
            });
        }

        Ok(Self {
            expression: expression.into(),
            key: key.into(),
            operator,
            kind,
            case_insensitive: case_insensitive && filter_type.supports_case_insensitivity(),
        })
    }

    /// The raw `<key><operator><value>` text as submitted.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The client-facing key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The comparison operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// The typed payload.
    pub fn kind(&self) -> &FilterKind {
        &self.kind
    }

    /// The kind discriminant.
    pub fn filter_type(&self) -> FilterType {
        self.kind.filter_type()
    }

    /// The payload as a plain value.
    pub fn value(&self) -> FilterValue {
        self.kind.value()
    }

    /// Set by a trailing `/i`.
    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Serializable view of this filter.
    pub fn summary(&self) -> FilterSummary {
        FilterSummary {
            expression: self.expression.clone(),
            key: self.key.clone(),
            operator: self.operator,
            value: self.value(),
            filter_type: self.filter_type(),
            modifiers: if self.case_insensitive {
                vec!["i".to_string()]
            } else {
                Vec::new()
            },
        }
    }
}

/// Serializable view of a [`Filter`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSummary {
    /// Raw expression.
    pub expression: String,
    /// Key.
    pub key: String,
    /// Operator.
    pub operator: Operator,
    /// Value.
    pub value: FilterValue,
    /// Kind.
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    /// Modifiers, currently only `"i"`.
    pub modifiers: Vec<String>,
}
