//! Raw query parameters before any parsing.
//!
//! [`QueryInput`] is an ordered multimap that mirrors how a query string
//! decodes into scalars (`filterExpression=0or1`) and indexed lists
//! (`filter[]=a=1`, `filter[3]=b=2`).

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex_lite::Regex;

use crate::error::{ErrorCode, QueryError, QueryResult};

static INDEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+$").expect("valid index pattern"));

/// A single decoded parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// `name=value`
    Scalar(String),
    /// `name[]=value` / `name[key]=value`, keyed by the raw bracket content.
    List(IndexMap<String, String>),
}

impl ParamValue {
    /// Short description used in error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Scalar(s) => format!("(string) {}", s),
            Self::List(items) => format!("(array) Array({})", items.len()),
        }
    }
}

/// Decoded query parameters, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryInput {
    params: IndexMap<String, ParamValue>,
}

impl QueryInput {
    /// Create an empty input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from already decoded `(name, value)` pairs.
    ///
    /// Names may carry a bracket suffix: `filter[]` appends with the next
    /// free integer index, `filter[3]` uses index `3` as given.
    ///
    /// ```rust
    /// use questful_query::{QueryInput, ParamValue};
    ///
    /// let input = QueryInput::from_pairs([("filter[]", "a=1"), ("filter[]", "b=2")]);
    /// let Some(ParamValue::List(items)) = input.get("filter") else { panic!() };
    /// assert_eq!(items.keys().collect::<Vec<_>>(), ["0", "1"]);
    /// ```
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut input = Self::new();
        for (name, value) in pairs {
            input.insert_pair(name.as_ref(), value.into());
        }
        input
    }

    /// Decode an `application/x-www-form-urlencoded` query string.
    ///
    /// A leading `?` is ignored. `+` decodes to a space.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(
            url::form_urlencoded::parse(query.as_bytes()).map(|(k, v)| (k.into_owned(), v.into_owned())),
        )
    }

    /// Decode the query part of a URI or path, e.g. `/users?filter[]=id>1`.
    pub fn from_uri(uri: &str) -> Self {
        let without_fragment = uri.split_once('#').map_or(uri, |(before, _)| before);
        match without_fragment.split_once('?') {
            Some((_, query)) => Self::from_query_string(query),
            None => Self::new(),
        }
    }

    /// Insert one decoded pair, interpreting a bracket suffix on the name.
    pub fn insert_pair(&mut self, name: &str, value: String) {
        match split_bracket(name) {
            Some((base, "")) => self.push(base, value),
            Some((base, key)) => self.insert_list_item(base, key, value),
            None => self.insert_scalar(name, value),
        }
    }

    /// Set a scalar parameter, replacing any previous value.
    pub fn insert_scalar(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), ParamValue::Scalar(value.into()));
    }

    /// Append to a list parameter with the next free integer index.
    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        let next = match self.params.get(name) {
            Some(ParamValue::List(items)) => items
                .keys()
                .filter_map(|k| k.parse::<u64>().ok())
                .max()
                .map_or(0, |max| max + 1),
            _ => 0,
        };
        self.insert_list_item(name, &next.to_string(), value);
    }

    /// Set `name[key]`, turning a scalar `name` into a list.
    pub fn insert_list_item(&mut self, name: &str, key: &str, value: impl Into<String>) {
        let entry = self
            .params
            .entry(name.to_string())
            .or_insert_with(|| ParamValue::List(IndexMap::new()));
        if matches!(entry, ParamValue::Scalar(_)) {
            *entry = ParamValue::List(IndexMap::new());
        }
        if let ParamValue::List(items) = entry {
            items.insert(key.to_string(), value.into());
        }
    }

    /// Look up a parameter.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Whether no parameters were supplied.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate over all parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Split `name[key]` into `("name", "key")`.
fn split_bracket(name: &str) -> Option<(&str, &str)> {
    let open = name.find('[')?;
    let inner = name[open + 1..].strip_suffix(']')?;
    if open == 0 {
        return None;
    }
    Some((&name[..open], inner))
}

/// Drop entries whose raw value repeats an earlier one, keeping the first.
pub(crate) fn dedup_raw_entries(entries: &IndexMap<String, String>) -> Vec<(&str, &str)> {
    let mut seen = std::collections::HashSet::new();
    entries
        .iter()
        .filter(|(_, value)| seen.insert(value.as_str()))
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

/// Validate the raw bracket content of `parameter[raw_index]=expression`.
pub(crate) fn parse_index(parameter: &str, raw_index: &str, expression: &str) -> QueryResult<usize> {
    let code = if parameter == "sort" {
        ErrorCode::MalformedSort
    } else {
        ErrorCode::MalformedFilter
    };
    let malformed = |message: String| {
        QueryError::new(code, message)
            .with_parameter(parameter)
            .with_expression(expression)
    };

    if !INDEX.is_match(raw_index) {
        return Err(malformed(format!(
            "Index in '{}[{}]={}' must be an integer. Found: {}",
            parameter, raw_index, expression, raw_index
        )));
    }
    if raw_index.starts_with('-') {
        return Err(malformed(format!(
            "Index in '{}[{}]={}' is negative; all indexes must be >= 0",
            parameter, raw_index, expression
        )));
    }

    raw_index.parse::<usize>().map_err(|_| {
        malformed(format!(
            "Index in '{}[{}]={}' is too large",
            parameter, raw_index, expression
        ))
    })
}

/// Two raw indexes such as `7` and `007` that name the same slot.
pub(crate) fn duplicate_index(parameter: &str, index: usize, raw_index: &str, expression: &str) -> QueryError {
    let code = if parameter == "sort" {
        ErrorCode::MalformedSort
    } else {
        ErrorCode::MalformedFilter
    };
    QueryError::new(
        code,
        format!(
            "Index in '{}[{}]={}' duplicates index {} of an earlier entry",
            parameter, raw_index, expression, index
        ),
    )
    .with_parameter(parameter)
    .with_index(index)
    .with_expression(expression)
}
