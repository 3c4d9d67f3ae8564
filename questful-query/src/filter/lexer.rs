//! Value lexer: infers the filter kind from the raw text after the operator.
//!
//! Grammars are tried in priority order and the first match wins:
//!
//! 1. integer `^\d+$`
//! 2. float `^\d+\.\d+$`
//! 3. `null`
//! 4. `true` / `false`
//! 5. string `"..."` with optional `/i`
//! 6. in-list `[...]` with optional `/i`
//! 7. like `%"..."`, `%"..."%` or `"..."%` with optional `/i`
//! 8. regexp `/.../` with optional `i`
//!
//! Regexp patterns are validated with `regex-lite` syntax.

use std::sync::LazyLock;

use regex_lite::Regex;
use thiserror::Error;

use super::{FilterKind, FilterType, FilterValue, LikePattern, Operator};

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").expect("valid integer grammar"));
static FLOAT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\d+$").expect("valid float grammar"));
static STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^"(.*)"(?:/(i))?$"#).expect("valid string grammar"));
static IN_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(.*)\](?:/(i))?$").expect("valid in grammar"));
static LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:(%)"(.*)"(%?)|"(.*)"(%))(?:/(i))?$"#).expect("valid like grammar")
});
static REGEXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(.*)/(i?)$").expect("valid regexp grammar"));

/// Reasons a raw value cannot become a filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// No grammar matched.
    #[error("Filter value '{0}' does not match a supported pattern")]
    Unsupported(String),

    /// Digits that do not fit a 64-bit integer.
    #[error("Integer '{0}' is out of range")]
    IntegerOutOfRange(String),

    /// Quoted content with a stray `"` or a dangling `\`.
    #[error("String literal \"{0}\" contains an unescaped double quote or ends with a lone backslash")]
    InvalidStringLiteral(String),

    /// `[]`
    #[error("Array is empty")]
    EmptyArray,

    /// An in-list element that is not null, a boolean, a number or a string.
    #[error("Illegal token '{token}' at index {index}")]
    IllegalArrayElement {
        /// The offending text.
        token: String,
        /// 0-based element position.
        index: usize,
    },

    /// `%""%`
    #[error("Like pattern is empty")]
    EmptyLikePattern,

    /// A regexp that does not compile.
    #[error("Invalid regular expression '{pattern}': {message}")]
    InvalidRegex {
        /// Pattern without delimiters.
        pattern: String,
        /// Compiler message.
        message: String,
    },

    /// The value's kind does not support the operator.
    #[error("Operator \"{operator}\" is not supported for {filter_type} values; expected one of {expected}")]
    UnsupportedOperator {
        /// Operator used.
        operator: Operator,
        /// Inferred kind.
        filter_type: FilterType,
        /// Legal operators rendered as a list.
        expected: String,
    },
}

/// Classify a trimmed raw value.
///
/// Returns the typed payload and whether a `/i` modifier was present.
///
/// ```rust
/// use questful_query::filter::{classify_value, FilterKind};
///
/// let (kind, insensitive) = classify_value(r#""Alice"/i"#).unwrap();
/// assert_eq!(kind, FilterKind::String("Alice".into()));
/// assert!(insensitive);
/// ```
pub fn classify_value(raw: &str) -> Result<(FilterKind, bool), ValueError> {
    if INTEGER.is_match(raw) {
        let value = raw
            .parse::<i64>()
            .map_err(|_| ValueError::IntegerOutOfRange(raw.to_string()))?;
        return Ok((FilterKind::Integer(value), false));
    }

    if FLOAT.is_match(raw) {
        let value = raw
            .parse::<f64>()
            .map_err(|_| ValueError::Unsupported(raw.to_string()))?;
        return Ok((FilterKind::Float(value), false));
    }

    match raw {
        "null" => return Ok((FilterKind::Null, false)),
        "true" => return Ok((FilterKind::Boolean(true), false)),
        "false" => return Ok((FilterKind::Boolean(false), false)),
        _ => {}
    }

    if let Some(caps) = STRING.captures(raw) {
        let inner = caps.get(1).map_or("", |m| m.as_str());
        let value = parse_string_literal(inner)?;
        return Ok((FilterKind::String(value), caps.get(2).is_some()));
    }

    if let Some(caps) = IN_LIST.captures(raw) {
        let inner = caps.get(1).map_or("", |m| m.as_str());
        let values = parse_array(inner)?;
        return Ok((FilterKind::In(values), caps.get(2).is_some()));
    }

    if let Some(caps) = LIKE.captures(raw) {
        // groups 1-3: %"..."%? ; groups 4-5: "..."%
        let (inner, wildcard_left, wildcard_right) = match caps.get(1) {
            Some(_) => (
                caps.get(2).map_or("", |m| m.as_str()),
                true,
                caps.get(3).is_some_and(|m| !m.as_str().is_empty()),
            ),
            None => (caps.get(4).map_or("", |m| m.as_str()), false, true),
        };
        let value = parse_string_literal(inner)?;
        if value.is_empty() {
            return Err(ValueError::EmptyLikePattern);
        }
        let like = LikePattern {
            value,
            wildcard_left,
            wildcard_right,
        };
        return Ok((FilterKind::Like(like), caps.get(6).is_some()));
    }

    if let Some(caps) = REGEXP.captures(raw) {
        let pattern = caps.get(1).map_or("", |m| m.as_str());
        Regex::new(pattern).map_err(|e| ValueError::InvalidRegex {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        let insensitive = caps.get(2).is_some_and(|m| !m.as_str().is_empty());
        return Ok((FilterKind::Regexp(pattern.to_string()), insensitive));
    }

    Err(ValueError::Unsupported(raw.to_string()))
}

/// Validate and unescape the content between double quotes.
///
/// `\"` and `\\` are unescaped; any other backslash sequence is kept as is.
fn parse_string_literal(inner: &str) -> Result<String, ValueError> {
    let invalid = || ValueError::InvalidStringLiteral(inner.to_string());
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => return Err(invalid()),
            },
            '"' => return Err(invalid()),
            c => out.push(c),
        }
    }

    Ok(out)
}

/// Byte offset of the first unescaped `"` in `s`.
fn find_closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_scalar_element(token: &str) -> Option<FilterValue> {
    match token {
        "null" => Some(FilterValue::Null),
        "true" => Some(FilterValue::Bool(true)),
        "false" => Some(FilterValue::Bool(false)),
        _ if INTEGER.is_match(token) => token.parse().ok().map(FilterValue::Int),
        _ if FLOAT.is_match(token) => token.parse().ok().map(FilterValue::Float),
        _ => None,
    }
}

/// Parse the comma separated literals of an in-list.
fn parse_array(inner: &str) -> Result<Vec<FilterValue>, ValueError> {
    if inner.trim().is_empty() {
        return Err(ValueError::EmptyArray);
    }

    let mut values = Vec::new();
    let mut rest = inner;

    loop {
        rest = rest.trim_start();
        let index = values.len();
        let illegal = |token: &str| ValueError::IllegalArrayElement {
            token: token.to_string(),
            index,
        };

        let remaining = if let Some(after) = rest.strip_prefix('"') {
            let end = find_closing_quote(after).ok_or_else(|| illegal(rest))?;
            let value = parse_string_literal(&after[..end]).map_err(|_| illegal(&rest[..end + 2]))?;
            values.push(FilterValue::String(value));
            &after[end + 1..]
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            let token = rest[..end].trim();
            values.push(parse_scalar_element(token).ok_or_else(|| illegal(token))?);
            &rest[end..]
        };

        let remaining = remaining.trim_start();
        if remaining.is_empty() {
            break;
        }
        match remaining.strip_prefix(',') {
            // a single trailing comma is accepted
            Some(after) if after.trim().is_empty() => break,
            Some(after) => rest = after,
            None => {
                return Err(ValueError::IllegalArrayElement {
                    token: remaining.to_string(),
                    index,
                });
            }
        }
    }

    Ok(values)
}
