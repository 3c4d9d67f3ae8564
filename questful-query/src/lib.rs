//! # questful-query
//!
//! Parsing and allow-list validation for REST query-string filters.
//!
//! This crate turns three query parameters into typed, validated structures:
//! - `filter[]=<key><operator><value>`: typed filters (null, boolean, integer,
//!   float, string, like, in, regexp)
//! - `filterExpression=<expression>`: a boolean combination of filter indexes
//!   using `and`, `or`, `xor` and parentheses
//! - `sort[]=[+|-]<key>`: ordering
//!
//! A server-side [`Mapping`] declares which keys exist, which filters, sorts
//! and expressions clients may use, and which constraints their values must
//! satisfy. Backend emission lives in `questful-sql`.
//!
//! ## Parsing
//!
//! ```rust
//! use questful_query::{FilterKind, ParsedQuery, QueryInput};
//!
//! let input = QueryInput::from_query_string(
//!     r#"filter[]=name=%"bob"%&filter[]=age>=18&filterExpression=0and1&sort[]=-age"#,
//! );
//! let query = ParsedQuery::parse(&input).unwrap();
//!
//! assert!(matches!(query.filter(1).unwrap().kind(), FilterKind::Integer(18)));
//! assert_eq!(query.filter_expression().unwrap().normalized(), "0and1");
//! assert!(!query.sorts()[&0].is_ascending());
//! ```
//!
//! ## Validation
//!
//! ```rust
//! use questful_query::{AllowedFilter, Constraint, Mapping, ParsedQuery, QueryInput};
//!
//! let mapping = Mapping::builder()
//!     .relate("age", "p.age")
//!     .allow_filter(AllowedFilter::integer("age").with_constraint(Constraint::Range {
//!         min: Some(0.0),
//!         max: Some(150.0),
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let query = ParsedQuery::parse(&QueryInput::from_query_string("filter[]=age=200")).unwrap();
//! let err = mapping.validate(&query).unwrap_err();
//! assert!(err.is_bad_request());
//! ```
//!
//! ## Logging
//!
//! Parsing and validation emit `tracing` events. With the
//! `tracing-subscriber` feature, [`init_logging`] installs a subscriber
//! configured from `QUESTFUL_DEBUG`, `QUESTFUL_LOG_LEVEL` and
//! `QUESTFUL_LOG_FORMAT`.

pub mod error;
pub mod expression;
pub mod filter;
pub mod input;
pub mod logging;
pub mod mapping;
pub mod parser;
pub mod sort;

pub use error::{ErrorCategory, ErrorCode, ErrorContext, QueryError, QueryResult};
pub use expression::{ExpressionSummary, FilterExpression, LogicalOperator, SyntaxNode};
pub use filter::{
    ElementType, Filter, FilterKind, FilterSummary, FilterType, FilterValue, LikePattern, Operator, parse_filter,
};
pub use input::{ParamValue, QueryInput};
pub use mapping::{
    AllowedFilter, AllowedFilterExpression, AllowedSort, Constraint, DefaultValidator, Mapping, MappingBuilder,
    MappingConfig, Validator,
};
pub use parser::{FILTER_EXPRESSION_PARAMETER, FILTER_PARAMETER, ParsedQuery, QuerySummary, SORT_PARAMETER};
pub use sort::{Sort, SortOrder, SortSummary, parse_sort};

// Re-export logging utilities
pub use logging::{LogFormat, init as init_logging, init_with_level, log_level};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::expression::FilterExpression;
    pub use crate::filter::{Filter, FilterKind, FilterType, FilterValue, Operator};
    pub use crate::input::QueryInput;
    pub use crate::mapping::{AllowedFilter, Constraint, Mapping};
    pub use crate::parser::ParsedQuery;
    pub use crate::sort::{Sort, SortOrder};
}
