//! Splits `filter[N]` entries into key, operator and value.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex_lite::Regex;
use tracing::{debug, trace};

use super::lexer::{ValueError, classify_value};
use super::{Filter, Operator};
use crate::error::{ErrorCode, QueryError, QueryResult};
use crate::input::{dedup_raw_entries, duplicate_index, parse_index};

// Longest operators first so `=` never splits `!=`, `<=` or `>=`.
static SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)(<=|>=|!=|=|>|<)(.*)$").expect("valid filter split pattern"));

/// Parse one `filter[index]=expression` entry.
///
/// ```rust
/// use questful_query::filter::{parse_filter, FilterKind};
///
/// let filter = parse_filter(2, "deletedAt=").unwrap();
/// assert_eq!(filter.kind(), &FilterKind::Null);
/// ```
pub fn parse_filter(index: usize, expression: &str) -> QueryResult<Filter> {
    let Some(caps) = SPLIT.captures(expression) else {
        return Err(unsupported(index, expression, expression));
    };

    let key = caps.get(1).map_or("", |m| m.as_str()).trim();
    let symbol = caps.get(2).map_or("", |m| m.as_str());
    let mut value = caps.get(3).map_or("", |m| m.as_str()).trim();

    if key.is_empty() {
        return Err(QueryError::new(
            ErrorCode::MalformedFilter,
            format!("Filter 'filter[{}]={}' is missing key", index, expression),
        )
        .with_parameter("filter")
        .with_index(index)
        .with_expression(expression));
    }

    let operator = Operator::from_symbol(symbol).ok_or_else(|| {
        QueryError::internal(format!(
            "Operator scan matched '{}' in 'filter[{}]={}', which is not an operator",
            symbol, index, expression
        ))
    })?;

    if value.is_empty() {
        value = "null";
    }

    trace!(index, key, operator = %operator, value, "Split filter");

    let (kind, case_insensitive) = classify_value(value).map_err(|e| match e {
        ValueError::Unsupported(raw) => unsupported(index, &raw, expression),
        other => QueryError::malformed_filter(index, expression, &other).with_source(other),
    })?;

    Filter::new(expression, key, operator, kind, case_insensitive)
        .map_err(|e| QueryError::malformed_filter(index, expression, &e).with_source(e))
}

fn unsupported(index: usize, value: &str, expression: &str) -> QueryError {
    QueryError::new(
        ErrorCode::MalformedFilter,
        format!(
            "Filter value '{}' (in 'filter[{}]={}') does not match a supported pattern.",
            value, index, expression
        ),
    )
    .with_parameter("filter")
    .with_index(index)
    .with_expression(expression)
    .with_help("Values are integers, floats, null, true, false, \"strings\", [lists], %\"like\"% patterns or /regexps/")
}

/// Parse every `filter[<index>]` entry.
///
/// Identical raw expressions collapse to the first index they appear under.
/// Distinct expressions under the same numeric index are rejected. The result
/// is ordered by index.
pub fn parse_filters(entries: &IndexMap<String, String>) -> QueryResult<BTreeMap<usize, Filter>> {
    let mut filters = BTreeMap::new();

    for (raw_index, expression) in dedup_raw_entries(entries) {
        let index = parse_index("filter", raw_index, expression)?;
        match filters.entry(index) {
            Entry::Vacant(slot) => {
                slot.insert(parse_filter(index, expression)?);
            }
            Entry::Occupied(_) => return Err(duplicate_index("filter", index, raw_index, expression)),
        }
    }

    debug!(count = filters.len(), "Parsed filters");
    Ok(filters)
}
