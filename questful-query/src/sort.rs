//! Sorts parsed from `sort[]=[+|-]key` entries.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::input::{dedup_raw_entries, duplicate_index, parse_index};

static SORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\+|-)?((\w+)(\.\w+)*)$").expect("valid sort pattern"));

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9, oldest first).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0, newest first).
    Desc,
}

impl SortOrder {
    /// Get the SQL keyword for this sort order.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// One parsed `sort[N]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    expression: String,
    key: String,
    order: SortOrder,
}

impl Sort {
    /// The raw text as submitted.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The client-facing key, possibly dotted (`author.name`).
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The direction.
    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// `true` unless the key was prefixed with `-`.
    pub fn is_ascending(&self) -> bool {
        self.order == SortOrder::Asc
    }

    /// Serializable view of this sort.
    pub fn summary(&self) -> SortSummary {
        SortSummary {
            expression: self.expression.clone(),
            key: self.key.clone(),
            is_ascending: self.is_ascending(),
        }
    }
}

/// Serializable view of a [`Sort`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSummary {
    /// Raw expression.
    pub expression: String,
    /// Key.
    pub key: String,
    /// Direction.
    pub is_ascending: bool,
}

/// Parse one `sort[index]=expression` entry.
///
/// ```rust
/// use questful_query::sort::{parse_sort, SortOrder};
///
/// let sort = parse_sort(0, "-author.name").unwrap();
/// assert_eq!(sort.key(), "author.name");
/// assert_eq!(sort.order(), SortOrder::Desc);
/// ```
pub fn parse_sort(index: usize, expression: &str) -> QueryResult<Sort> {
    let caps = SORT
        .captures(expression)
        .ok_or_else(|| QueryError::malformed_sort(index, expression))?;

    let order = match caps.get(1).map(|m| m.as_str()) {
        Some("-") => SortOrder::Desc,
        _ => SortOrder::Asc,
    };
    let key = caps.get(2).map_or("", |m| m.as_str());

    Ok(Sort {
        expression: expression.to_string(),
        key: key.to_string(),
        order,
    })
}

/// Parse every `sort[<index>]` entry, deduplicated and ordered by index.
pub fn parse_sorts(entries: &IndexMap<String, String>) -> QueryResult<BTreeMap<usize, Sort>> {
    let mut sorts = BTreeMap::new();

    for (raw_index, expression) in dedup_raw_entries(entries) {
        let index = parse_index("sort", raw_index, expression)?;
        match sorts.entry(index) {
            Entry::Vacant(slot) => {
                slot.insert(parse_sort(index, expression)?);
            }
            Entry::Occupied(_) => return Err(duplicate_index("sort", index, raw_index, expression)),
        }
    }

    debug!(count = sorts.len(), "Parsed sorts");
    Ok(sorts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_order_serializes_as_sql_keyword() {
        assert_eq!(serde_json::to_value(SortOrder::Desc).unwrap(), "DESC");
        assert_eq!(serde_json::from_str::<SortOrder>("\"ASC\"").unwrap(), SortOrder::Asc);
    }

    #[test]
    fn test_directions() {
        assert_eq!(parse_sort(0, "name").unwrap().order(), SortOrder::Asc);
        assert_eq!(parse_sort(0, "+name").unwrap().order(), SortOrder::Asc);
        assert!(!parse_sort(0, "-name").unwrap().is_ascending());
    }

    #[test]
    fn test_dotted_key() {
        let sort = parse_sort(0, "t.created_at").unwrap();
        assert_eq!(sort.key(), "t.created_at");
        assert_eq!(sort.expression(), "t.created_at");
    }

    #[test]
    fn test_malformed() {
        for raw in ["", "-", "a.", ".a", "a b", "--a", "a-b"] {
            let err = parse_sort(2, raw).unwrap_err();
            assert_eq!(err.code, ErrorCode::MalformedSort, "{raw}");
        }
        let err = parse_sort(2, "a b").unwrap_err();
        assert_eq!(
            err.message,
            "Sort expression 'a b' (in 'sort[2]=a b') does not match a supported pattern."
        );
    }

    #[test]
    fn test_parse_sorts_ordering() {
        let entries: IndexMap<String, String> = [("9", "-id"), ("1", "name"), ("4", "-id")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let sorts = parse_sorts(&entries).unwrap();
        let keys: Vec<(usize, &str)> = sorts.iter().map(|(i, s)| (*i, s.key())).collect();
        assert_eq!(keys, vec![(1, "name"), (9, "id")]);
    }

    #[test]
    fn test_parse_sorts_rejects_colliding_indexes() {
        let entries: IndexMap<String, String> = [("2", "name"), ("02", "-id")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let err = parse_sorts(&entries).unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedSort);
        assert_eq!(err.message, "Index in 'sort[02]=-id' duplicates index 2 of an earlier entry");
    }

    #[test]
    fn test_summary() {
        let summary = parse_sort(0, "-name").unwrap().summary();
        assert_eq!(
            serde_json::to_value(summary).unwrap(),
            serde_json::json!({"expression": "-name", "key": "name", "isAscending": false})
        );
    }
}
