//! The server-side allow-list.
//!
//! A [`Mapping`] relates client-facing keys to backend columns and declares
//! which filters, sorts and filter expressions are permitted. It is built
//! once, is immutable afterwards, and can be shared across threads.
//!
//! ```rust
//! use questful_query::mapping::{AllowedFilter, Mapping};
//! use questful_query::{ParsedQuery, QueryInput};
//!
//! let mapping = Mapping::builder()
//!     .relate("id", "u.id")
//!     .relate("name", "u.name")
//!     .allow_filter(AllowedFilter::integer("id"))
//!     .allow_sort("name")
//!     .build()
//!     .unwrap();
//!
//! let query = ParsedQuery::parse(&QueryInput::from_query_string("filter[]=id>1&sort[]=name")).unwrap();
//! mapping.validate(&query).unwrap();
//!
//! let denied = ParsedQuery::parse(&QueryInput::from_query_string("sort[]=id")).unwrap();
//! assert!(mapping.validate(&denied).is_err());
//! ```

mod allowed;
pub mod config;
mod constraint;

pub use allowed::{AllowedFilter, AllowedFilterExpression, AllowedSort};
pub use config::{FilterRuleConfig, MappingConfig};
pub use constraint::{Callback, CallbackFn, Constraint, DefaultValidator, Validator};

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use regex_lite::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::error::{ErrorCode, QueryError, QueryResult, quoted_list};
use crate::filter::{Filter, FilterKind};
use crate::parser::ParsedQuery;

/// Default pattern for client-facing keys.
pub const DEFAULT_KEY_PATTERN: &str = r"^[a-z][0-9a-z]*([_\.][0-9a-z]+)*$";
/// Default pattern for backend columns.
pub const DEFAULT_COLUMN_PATTERN: &str = r"^[a-z][0-9a-z]*([_\.]+[0-9a-z]+)*$";

/// An immutable allow-list.
#[derive(Clone)]
pub struct Mapping {
    relations: IndexMap<String, String>,
    allowed_filters: Vec<AllowedFilter>,
    allowed_sorts: Vec<AllowedSort>,
    allowed_expressions: Vec<AllowedFilterExpression>,
    validator: Arc<dyn Validator>,
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapping")
            .field("relations", &self.relations)
            .field("allowed_filters", &self.allowed_filters.len())
            .field("allowed_sorts", &self.allowed_sorts.len())
            .field("allowed_expressions", &self.allowed_expressions.len())
            .field("validator", &self.validator)
            .finish()
    }
}

impl Mapping {
    /// Start declaring a mapping.
    pub fn builder() -> MappingBuilder {
        MappingBuilder::new()
    }

    /// Key → column relations, in declaration order.
    pub fn relations(&self) -> &IndexMap<String, String> {
        &self.relations
    }

    /// The column related to `key`.
    pub fn column_for(&self, key: &str) -> Option<&str> {
        self.relations.get(key).map(String::as_str)
    }

    /// Allowed filters, in declaration order.
    pub fn allowed_filters(&self) -> &[AllowedFilter] {
        &self.allowed_filters
    }

    /// Allowed sorts, in declaration order.
    pub fn allowed_sorts(&self) -> &[AllowedSort] {
        &self.allowed_sorts
    }

    /// Allowed filter expressions, in declaration order.
    pub fn allowed_filter_expressions(&self) -> &[AllowedFilterExpression] {
        &self.allowed_expressions
    }

    /// The first rule governing `filter`.
    pub fn find_allowed_filter(&self, filter: &Filter) -> Option<&AllowedFilter> {
        self.allowed_filters.iter().find(|rule| rule.matches(filter))
    }

    /// Whether sorting by `key` is allowed.
    pub fn is_sort_allowed(&self, key: &str) -> bool {
        self.allowed_sorts.iter().any(|rule| rule.key() == key)
    }

    /// Check a parsed query against this allow-list.
    ///
    /// Filters are checked first, then sorts, then the filter expression.
    pub fn validate(&self, query: &ParsedQuery) -> QueryResult<()> {
        let result = self
            .validate_filters(query)
            .and_then(|()| self.validate_sorts(query))
            .and_then(|()| self.validate_filter_expression(query));

        match &result {
            Ok(()) => debug!(
                filters = query.filters().len(),
                sorts = query.sorts().len(),
                "Query passed allow-list"
            ),
            Err(e) => warn!(code = %e.code, error = %e.message, "Query rejected by allow-list"),
        }
        result
    }

    fn validate_filters(&self, query: &ParsedQuery) -> QueryResult<()> {
        let mut unmatched = Vec::new();

        for (index, filter) in query.filters() {
            let mut matched = false;
            for rule in self.allowed_filters.iter().filter(|rule| rule.matches(filter)) {
                matched = true;
                self.check_filter(rule, *index, filter)?;
            }
            if !matched {
                unmatched.push(filter.expression());
            }
        }

        if unmatched.is_empty() {
            return Ok(());
        }
        Err(QueryError::new(
            ErrorCode::DisallowedFilter,
            format!(
                "{} filter(s) is/are not allowed. These are: {}",
                unmatched.len(),
                quoted_list(&unmatched)
            ),
        )
        .with_parameter("filter"))
    }

    fn check_filter(&self, rule: &AllowedFilter, index: usize, filter: &Filter) -> QueryResult<()> {
        let denied = |code: ErrorCode, message: String| {
            QueryError::new(code, message)
                .with_parameter("filter")
                .with_index(index)
                .with_expression(filter.expression())
        };

        let available = rule.available_operators();
        if !available.contains(&filter.operator()) {
            return Err(denied(
                ErrorCode::DisallowedOperator,
                format!(
                    "'filter={}': Disallowed operator \"{}\"; allowed operators are: {}",
                    filter.expression(),
                    filter.operator(),
                    quoted_list(&available)
                ),
            ));
        }

        if !rule.constraints().is_empty() {
            let violations = self.validator.validate(&filter.value(), rule.constraints());
            if let Some(first) = violations.first() {
                return Err(denied(
                    ErrorCode::ConstraintViolation,
                    format!(
                        "'filter={}': {} validation(s) failed. First error: {}",
                        filter.expression(),
                        violations.len(),
                        first
                    ),
                ));
            }
        }

        if let FilterKind::In(items) = filter.kind() {
            for (position, item) in items.iter().enumerate() {
                let Some(constraints) = item
                    .element_type()
                    .and_then(|element_type| rule.element_constraints().get(&element_type))
                else {
                    continue;
                };
                let violations = self.validator.validate(item, constraints);
                if let Some(first) = violations.first() {
                    return Err(denied(
                        ErrorCode::ConstraintViolation,
                        format!(
                            "'filter={}': Element at index {}: {} validation(s) failed. First error: {}",
                            filter.expression(),
                            position,
                            violations.len(),
                            first
                        ),
                    ));
                }
            }
        }

        Ok(())
    }

    fn validate_sorts(&self, query: &ParsedQuery) -> QueryResult<()> {
        let unmatched: Vec<&str> = query
            .sorts()
            .values()
            .filter(|sort| !self.is_sort_allowed(sort.key()))
            .map(|sort| sort.expression())
            .collect();

        if unmatched.is_empty() {
            return Ok(());
        }
        Err(QueryError::new(
            ErrorCode::DisallowedSort,
            format!(
                "{} sort(s) is/are not allowed. These are: {}",
                unmatched.len(),
                quoted_list(&unmatched)
            ),
        )
        .with_parameter("sort"))
    }

    fn validate_filter_expression(&self, query: &ParsedQuery) -> QueryResult<()> {
        let Some(expression) = query.filter_expression() else {
            return Ok(());
        };

        if self.allowed_expressions.is_empty() {
            return Err(QueryError::new(
                ErrorCode::DisallowedFilterExpression,
                format!(
                    "An allowed filter expression was not provided; denied filterExpression \"{}\"",
                    expression.normalized()
                ),
            )
            .with_parameter("filterExpression")
            .with_expression(expression.expression()));
        }

        if self.allowed_expressions.iter().any(|rule| rule.matches(expression)) {
            return Ok(());
        }

        Err(QueryError::new(
            ErrorCode::DisallowedFilterExpression,
            format!(
                "Denied filterExpression \"{}\" (raw: \"{}\"); does not match any allowed filter expressions: {}",
                expression.normalized(),
                expression.expression(),
                quoted_list(self.allowed_expressions.iter().map(AllowedFilterExpression::as_str))
            ),
        )
        .with_parameter("filterExpression")
        .with_expression(expression.expression()))
    }
}

/// Collects declarations for a [`Mapping`].
///
/// Declaration order does not matter; everything is checked by [`build`](Self::build).
#[derive(Debug, Default)]
pub struct MappingBuilder {
    relations: IndexMap<String, String>,
    allowed_filters: Vec<AllowedFilter>,
    allowed_sorts: Vec<String>,
    allowed_expressions: Vec<String>,
    key_pattern: Option<String>,
    column_pattern: Option<String>,
    validator: Option<Arc<dyn Validator>>,
}

impl MappingBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Relate a client-facing key to a backend column.
    pub fn relate(mut self, key: impl Into<String>, column: impl Into<String>) -> Self {
        self.relations.insert(key.into(), column.into());
        self
    }

    /// Allow a filter rule.
    pub fn allow_filter(mut self, rule: AllowedFilter) -> Self {
        self.allowed_filters.push(rule);
        self
    }

    /// Allow sorting by `key`.
    pub fn allow_sort(mut self, key: impl Into<String>) -> Self {
        self.allowed_sorts.push(key.into());
        self
    }

    /// Allow a filter expression, or every expression with `"*"`.
    pub fn allow_filter_expression(mut self, expression: impl Into<String>) -> Self {
        self.allowed_expressions.push(expression.into());
        self
    }

    /// Replace the key pattern (matched case-insensitively).
    pub fn key_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.key_pattern = Some(pattern.into());
        self
    }

    /// Replace the column pattern (matched case-insensitively).
    pub fn column_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.column_pattern = Some(pattern.into());
        self
    }

    /// Use a custom validation engine for constraints.
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Check every declaration and freeze the mapping.
    pub fn build(self) -> QueryResult<Mapping> {
        let key_pattern = compile_pattern("key", self.key_pattern.as_deref().unwrap_or(DEFAULT_KEY_PATTERN))?;
        let column_pattern = compile_pattern(
            "column",
            self.column_pattern.as_deref().unwrap_or(DEFAULT_COLUMN_PATTERN),
        )?;

        for (key, column) in &self.relations {
            if !key_pattern.is_match(key) {
                return Err(QueryError::invalid_relation(
                    ErrorCode::InvalidKey,
                    format!("Key \"{}\" is invalid; it must match {}", key, key_pattern.as_str()),
                ));
            }
            if !column_pattern.is_match(column) {
                return Err(QueryError::invalid_relation(
                    ErrorCode::InvalidColumn,
                    format!(
                        "Column \"{}\" for key \"{}\" is invalid; it must match {}",
                        column,
                        key,
                        column_pattern.as_str()
                    ),
                ));
            }
        }

        for rule in &self.allowed_filters {
            if !self.relations.contains_key(rule.key()) {
                return Err(missing_relation("filter", rule.key()));
            }
            rule.check()?;
        }

        let mut allowed_sorts = Vec::with_capacity(self.allowed_sorts.len());
        for key in self.allowed_sorts {
            if !self.relations.contains_key(&key) {
                return Err(missing_relation("sort", &key));
            }
            allowed_sorts.push(AllowedSort::new(key));
        }

        let allowed_expressions = self
            .allowed_expressions
            .iter()
            .map(|expression| AllowedFilterExpression::parse(expression))
            .collect::<QueryResult<Vec<_>>>()?;

        debug!(
            relations = self.relations.len(),
            filters = self.allowed_filters.len(),
            sorts = allowed_sorts.len(),
            expressions = allowed_expressions.len(),
            "Built mapping"
        );

        Ok(Mapping {
            relations: self.relations,
            allowed_filters: self.allowed_filters,
            allowed_sorts,
            allowed_expressions,
            validator: self.validator.unwrap_or_else(|| Arc::new(DefaultValidator)),
        })
    }
}

fn compile_pattern(name: &str, pattern: &str) -> QueryResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| {
            QueryError::configuration(format!("The {} pattern '{}' does not compile: {}", name, pattern, e))
                .with_source(e)
        })
}

fn missing_relation(what: &str, key: &str) -> QueryError {
    QueryError::new(
        ErrorCode::MissingRelation,
        format!("Cannot allow {} with key \"{}\"; no relation exists", what, key),
    )
    .with_help("Declare the key with relate(key, column) first")
}
