//! Turns a [`QueryInput`] into filters, an optional filter expression and sorts.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::error::{ErrorCode, QueryError, QueryResult, index_list};
use crate::expression::{ExpressionSummary, FilterExpression};
use crate::filter::{Filter, FilterSummary, parse_filters};
use crate::input::{ParamValue, QueryInput};
use crate::sort::{Sort, SortSummary, parse_sorts};

/// Name of the filter list parameter.
pub const FILTER_PARAMETER: &str = "filter";
/// Name of the filter expression parameter.
pub const FILTER_EXPRESSION_PARAMETER: &str = "filterExpression";
/// Name of the sort list parameter.
pub const SORT_PARAMETER: &str = "sort";

/// The parsed state of one request.
///
/// ```rust
/// use questful_query::{ParsedQuery, QueryInput};
///
/// let input = QueryInput::from_query_string("filter[]=id>1&filter[]=id<9&filterExpression=0and1&sort[]=-id");
/// let query = ParsedQuery::parse(&input).unwrap();
/// assert_eq!(query.filters().len(), 2);
/// assert_eq!(query.filters_by_key("id").count(), 2);
/// assert_eq!(query.filter_expression().unwrap().normalized(), "0and1");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedQuery {
    filters: BTreeMap<usize, Filter>,
    filter_expression: Option<FilterExpression>,
    sorts: BTreeMap<usize, Sort>,
}

impl ParsedQuery {
    /// Parse `filter`, `filterExpression` and `sort` from `input`.
    ///
    /// Fails when any entry is malformed or when the filter indexes and the
    /// indexes referenced by the expression differ.
    pub fn parse(input: &QueryInput) -> QueryResult<Self> {
        let filters = match input.get(FILTER_PARAMETER) {
            None => BTreeMap::new(),
            Some(ParamValue::List(entries)) => parse_filters(entries)?,
            Some(other) => {
                return Err(QueryError::malformed_parameter(
                    FILTER_PARAMETER,
                    format!("Parameter 'filter[]' must be an array. Found: {}", other.describe()),
                ));
            }
        };

        let filter_expression = match input.get(FILTER_EXPRESSION_PARAMETER) {
            None => None,
            Some(ParamValue::Scalar(raw)) => FilterExpression::parse_optional(Some(raw.as_str()))?,
            Some(other) => {
                return Err(QueryError::malformed_parameter(
                    FILTER_EXPRESSION_PARAMETER,
                    format!(
                        "Parameter 'filterExpression' must be a string. Found: {}",
                        other.describe()
                    ),
                ));
            }
        };

        let sorts = match input.get(SORT_PARAMETER) {
            None => BTreeMap::new(),
            Some(ParamValue::List(entries)) => parse_sorts(entries)?,
            Some(other) => {
                return Err(QueryError::malformed_parameter(
                    SORT_PARAMETER,
                    format!("Parameter 'sort[]' must be an array. Found: {}", other.describe()),
                ));
            }
        };

        if let Some(ref expression) = filter_expression {
            check_indexes(&filters, expression)?;
        }

        debug!(
            filters = filters.len(),
            sorts = sorts.len(),
            expression = filter_expression.as_ref().map(FilterExpression::normalized),
            "Parsed query"
        );

        Ok(Self {
            filters,
            filter_expression,
            sorts,
        })
    }

    /// Filters keyed by index, ascending.
    pub fn filters(&self) -> &BTreeMap<usize, Filter> {
        &self.filters
    }

    /// The filter submitted under `index`.
    pub fn filter(&self, index: usize) -> Option<&Filter> {
        self.filters.get(&index)
    }

    /// All filters on `key`, in index order.
    pub fn filters_by_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = (usize, &'a Filter)> + 'a {
        self.filters
            .iter()
            .filter(move |(_, f)| f.key() == key)
            .map(|(i, f)| (*i, f))
    }

    /// The lowest-indexed filter on `key`.
    pub fn first_filter_by_key(&self, key: &str) -> Option<&Filter> {
        self.filters.values().find(|f| f.key() == key)
    }

    /// Whether any filter targets `key`.
    pub fn has_filter_with_key(&self, key: &str) -> bool {
        self.first_filter_by_key(key).is_some()
    }

    /// The filter expression, if one was supplied.
    pub fn filter_expression(&self) -> Option<&FilterExpression> {
        self.filter_expression.as_ref()
    }

    /// Sorts keyed by index, ascending.
    pub fn sorts(&self) -> &BTreeMap<usize, Sort> {
        &self.sorts
    }

    /// Whether nothing was requested.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.sorts.is_empty() && self.filter_expression.is_none()
    }

    /// Serializable view of the whole query.
    pub fn summary(&self) -> QuerySummary {
        QuerySummary {
            filter: self.filters.iter().map(|(i, f)| (*i, f.summary())).collect(),
            filter_expression: self.filter_expression.as_ref().map(FilterExpression::summary),
            sort: self.sorts.iter().map(|(i, s)| (*i, s.summary())).collect(),
        }
    }
}

/// Serializable view of a [`ParsedQuery`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySummary {
    /// Filters by index.
    pub filter: BTreeMap<usize, FilterSummary>,
    /// The expression.
    pub filter_expression: Option<ExpressionSummary>,
    /// Sorts by index.
    pub sort: BTreeMap<usize, SortSummary>,
}

/// Filter indexes and expression indexes must be the same set.
fn check_indexes(filters: &BTreeMap<usize, Filter>, expression: &FilterExpression) -> QueryResult<()> {
    if filters.is_empty() {
        return Err(QueryError::new(
            ErrorCode::MalformedParameter,
            "Parameter 'filter' is missing and is required when specifying parameter 'filterExpression'",
        )
        .with_parameter(FILTER_PARAMETER));
    }

    let filter_indexes: Vec<usize> = filters.keys().copied().collect();
    let expression_indexes = expression.indexes();

    let missing_in_filters: Vec<usize> = expression_indexes
        .iter()
        .copied()
        .filter(|i| !filters.contains_key(i))
        .collect();
    let missing_in_expression: Vec<usize> = filter_indexes
        .iter()
        .copied()
        .filter(|i| expression_indexes.binary_search(i).is_err())
        .collect();

    let mut problems = Vec::with_capacity(2);
    if !missing_in_filters.is_empty() {
        problems.push(format!(
            "Parameter 'filterExpression={}' contains indexes {}, which are not represented in parameter 'filter' (indexes: {})",
            expression.expression(),
            index_list(&missing_in_filters),
            index_list(&filter_indexes)
        ));
    }
    if !missing_in_expression.is_empty() {
        problems.push(format!(
            "Parameter 'filter' contains indexes {}, which are not represented in parameter 'filterExpression={}' (indexes: {})",
            index_list(&missing_in_expression),
            expression.expression(),
            index_list(&expression_indexes)
        ));
    }

    if !problems.is_empty() {
        return Err(QueryError::index_mismatch(problems.join("; ")).with_expression(expression.expression()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterKind;
    use pretty_assertions::assert_eq;

    fn parse(query: &str) -> QueryResult<ParsedQuery> {
        ParsedQuery::parse(&QueryInput::from_query_string(query))
    }

    #[test]
    fn test_empty_input() {
        let query = parse("").unwrap();
        assert!(query.is_empty());
        assert!(query.filter_expression().is_none());
    }

    #[test]
    fn test_accessors() {
        let query = parse("filter[3]=name=\"a\"&filter[1]=age>3&filter[7]=name=\"b\"").unwrap();
        assert_eq!(query.filters().keys().copied().collect::<Vec<_>>(), vec![1, 3, 7]);
        assert_eq!(query.filter(1).unwrap().kind(), &FilterKind::Integer(3));
        assert!(query.filter(2).is_none());
        assert_eq!(
            query.filters_by_key("name").map(|(i, _)| i).collect::<Vec<_>>(),
            vec![3, 7]
        );
        assert_eq!(
            query.first_filter_by_key("name").unwrap().kind(),
            &FilterKind::String("a".into())
        );
        assert!(query.has_filter_with_key("age"));
        assert!(!query.has_filter_with_key("nope"));
    }

    #[test]
    fn test_blank_expression_is_ignored() {
        let query = parse("filter[]=a=1&filterExpression=").unwrap();
        assert!(query.filter_expression().is_none());
    }

    #[test]
    fn test_expression_requires_filters() {
        let err = parse("filterExpression=0").unwrap_err();
        assert_eq!(
            err.message,
            "Parameter 'filter' is missing and is required when specifying parameter 'filterExpression'"
        );
    }

    #[test]
    fn test_filter_index_missing_from_expression() {
        let err = parse("filter[0]=a=1&filter[1]=b=2&filterExpression=0").unwrap_err();
        assert_eq!(err.code, ErrorCode::IndexMismatch);
        assert_eq!(
            err.message,
            "Parameter 'filter' contains indexes [1], which are not represented in parameter 'filterExpression=0' (indexes: [0])"
        );
    }

    #[test]
    fn test_expression_index_missing_from_filters() {
        let err = parse("filter[0]=a=1&filter[1]=b=2&filterExpression=0or1or2").unwrap_err();
        assert_eq!(
            err.message,
            "Parameter 'filterExpression=0or1or2' contains indexes [2], which are not represented in parameter 'filter' (indexes: [0, 1])"
        );
    }

    #[test]
    fn test_index_mismatch_on_both_sides() {
        let err = parse("filter[0]=a=1&filter[1]=b=2&filterExpression=0or2").unwrap_err();
        assert_eq!(err.code, ErrorCode::IndexMismatch);
        assert_eq!(
            err.message,
            "Parameter 'filterExpression=0or2' contains indexes [2], which are not represented in parameter 'filter' (indexes: [0, 1]); \
             Parameter 'filter' contains indexes [1], which are not represented in parameter 'filterExpression=0or2' (indexes: [0, 2])"
        );
    }

    #[test]
    fn test_parameter_shapes() {
        let err = parse("filter=a=1").unwrap_err();
        assert_eq!(err.message, "Parameter 'filter[]' must be an array. Found: (string) a=1");

        let err = parse("sort=name").unwrap_err();
        assert_eq!(err.message, "Parameter 'sort[]' must be an array. Found: (string) name");

        let err = parse("filterExpression[]=0").unwrap_err();
        assert_eq!(
            err.message,
            "Parameter 'filterExpression' must be a string. Found: (array) Array(1)"
        );
    }

    #[test]
    fn test_summary_shape() {
        let query = parse("filter[]=a=1&filterExpression=0&sort[]=-a").unwrap();
        let json = serde_json::to_value(query.summary()).unwrap();
        assert_eq!(json["filter"]["0"]["key"], "a");
        assert_eq!(json["filterExpression"]["expressionNormalized"], "0");
        assert_eq!(json["sort"]["0"]["isAscending"], false);
    }
}
