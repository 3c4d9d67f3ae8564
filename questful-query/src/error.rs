//! Error types for query-string parsing, allow-list validation and SQL emission.
//!
//! Every failure carries an [`ErrorCode`] and falls into one of two
//! [`ErrorCategory`] values:
//!
//! - **Bad request**: the client sent something malformed or something the
//!   allow-list denies. Expected and frequent; map to HTTP 400.
//! - **Internal**: the server-side mapping is inconsistent or an unreachable
//!   path was reached. Fatal at development time; map to HTTP 500.
//!
//! # Error Codes
//!
//! Error codes follow a pattern: Q{category}{number}
//! - 1xxx: Malformed input (filter, filterExpression, sort, parameter shape)
//! - 2xxx: Denied by the allow-list (operator, filter, sort, expression, constraint)
//! - 7xxx: Configuration errors (relations, allow rules, config files)
//! - 9xxx: Internal errors
//!
//! ```rust
//! use questful_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::malformed_filter(0, "id>", "Operator is missing a value");
//! assert_eq!(err.code, ErrorCode::MalformedFilter);
//! assert!(err.is_bad_request());
//! assert_eq!(err.http_status(), 400);
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Malformed input (1xxx)
    /// A query parameter has the wrong shape (Q1001).
    MalformedParameter = 1001,
    /// A `filter[]` entry could not be parsed (Q1002).
    MalformedFilter = 1002,
    /// The `filterExpression` could not be parsed (Q1003).
    MalformedFilterExpression = 1003,
    /// A `sort[]` entry could not be parsed (Q1004).
    MalformedSort = 1004,
    /// Filter indexes and expression indexes disagree (Q1005).
    IndexMismatch = 1005,

    // Denied by allow-list (2xxx)
    /// Operator not allowed for the filter (Q2001).
    DisallowedOperator = 2001,
    /// No allow rule matches the filter (Q2002).
    DisallowedFilter = 2002,
    /// No allow rule matches the sort (Q2003).
    DisallowedSort = 2003,
    /// No allow rule matches the filter expression (Q2004).
    DisallowedFilterExpression = 2004,
    /// A value constraint rejected the filter value (Q2005).
    ConstraintViolation = 2005,

    // Configuration errors (7xxx)
    /// Invalid configuration (Q7001).
    InvalidConfiguration = 7001,
    /// Allow rule references a key without relation (Q7002).
    MissingRelation = 7002,
    /// Relation key does not match the key pattern (Q7003).
    InvalidKey = 7003,
    /// Relation column does not match the column pattern (Q7004).
    InvalidColumn = 7004,
    /// Allow rule is internally inconsistent (Q7005).
    InvalidRule = 7005,
    /// Mapping configuration file could not be read or parsed (Q7006).
    ConfigParse = 7006,

    // Internal errors (9xxx)
    /// Internal error (Q9001).
    Internal = 9001,
}

/// The two failure domains every error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The client must correct and resubmit the query.
    BadRequest,
    /// A programming or configuration mistake on the server side.
    Internal,
}

impl ErrorCode {
    /// Get the error code string (e.g., "Q1001").
    pub fn code(&self) -> String {
        format!("Q{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::MalformedParameter => "Malformed query parameter",
            Self::MalformedFilter => "Malformed filter",
            Self::MalformedFilterExpression => "Malformed filter expression",
            Self::MalformedSort => "Malformed sort",
            Self::IndexMismatch => "Filter and filter expression indexes differ",
            Self::DisallowedOperator => "Operator not allowed",
            Self::DisallowedFilter => "Filter not allowed",
            Self::DisallowedSort => "Sort not allowed",
            Self::DisallowedFilterExpression => "Filter expression not allowed",
            Self::ConstraintViolation => "Filter value failed validation",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::MissingRelation => "Missing relation",
            Self::InvalidKey => "Invalid relation key",
            Self::InvalidColumn => "Invalid relation column",
            Self::InvalidRule => "Invalid allow rule",
            Self::ConfigParse => "Configuration parse error",
            Self::Internal => "Internal error",
        }
    }

    /// Which failure domain this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match *self as u16 {
            1000..=2999 => ErrorCategory::BadRequest,
            _ => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The query parameter involved (`filter`, `filterExpression`, `sort`).
    pub parameter: Option<String>,
    /// The client-supplied array index.
    pub index: Option<usize>,
    /// The raw expression that failed.
    pub expression: Option<String>,
    /// 0-based character position inside the expression.
    pub position: Option<usize>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur while parsing, validating or emitting a query.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Set the query parameter.
    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.context.parameter = Some(parameter.into());
        self
    }

    /// Set the client-supplied index.
    pub fn with_index(mut self, index: usize) -> Self {
        self.context.index = Some(index);
        self
    }

    /// Set the raw expression.
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.context.expression = Some(expression.into());
        self
    }

    /// Set the character position.
    pub fn with_position(mut self, position: usize) -> Self {
        self.context.position = Some(position);
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create a malformed parameter error.
    pub fn malformed_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        let parameter = parameter.into();
        Self::new(ErrorCode::MalformedParameter, message).with_parameter(parameter)
    }

    /// Create a malformed filter error, echoing `filter[index]=expression`.
    pub fn malformed_filter(index: usize, expression: impl Into<String>, reason: impl fmt::Display) -> Self {
        let expression = expression.into();
        Self::new(
            ErrorCode::MalformedFilter,
            format!("'filter[{}]={}' is malformed: {}", index, expression, reason),
        )
        .with_parameter("filter")
        .with_index(index)
        .with_expression(expression)
    }

    /// Create a malformed filter expression error.
    pub fn malformed_expression(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedFilterExpression, message)
            .with_parameter("filterExpression")
            .with_expression(expression)
            .with_help("Use filter indexes joined by 'and', 'or' or 'xor', e.g. (0and1)or2")
    }

    /// Create a malformed sort error.
    pub fn malformed_sort(index: usize, expression: impl Into<String>) -> Self {
        let expression = expression.into();
        Self::new(
            ErrorCode::MalformedSort,
            format!(
                "Sort expression '{}' (in 'sort[{}]={}') does not match a supported pattern.",
                expression, index, expression
            ),
        )
        .with_parameter("sort")
        .with_index(index)
        .with_expression(expression)
        .with_help("Use [+|-]key, e.g. sort[]=-createdAt")
    }

    /// Create an index mismatch error between `filter` and `filterExpression`.
    pub fn index_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::IndexMismatch, message).with_parameter("filterExpression")
    }

    /// Create an error for a key or column that failed pattern validation.
    pub fn invalid_relation(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message)
    }

    /// Create an invalid allow rule error.
    pub fn invalid_rule(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRule, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
            .with_help("This is likely a bug in questful - please report it at https://github.com/pegasusheavy/questful/issues")
    }

    // ============== Error Checks ==============

    /// Which failure domain this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Check if the client caused this error.
    pub fn is_bad_request(&self) -> bool {
        self.category() == ErrorCategory::BadRequest
    }

    /// Check if this is a server-side error.
    pub fn is_internal(&self) -> bool {
        self.category() == ErrorCategory::Internal
    }

    /// Check if the input was syntactically malformed.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::MalformedParameter
                | ErrorCode::MalformedFilter
                | ErrorCode::MalformedFilterExpression
                | ErrorCode::MalformedSort
                | ErrorCode::IndexMismatch
        )
    }

    /// Check if the allow-list denied the input.
    pub fn is_denied(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::DisallowedOperator
                | ErrorCode::DisallowedFilter
                | ErrorCode::DisallowedSort
                | ErrorCode::DisallowedFilterExpression
                | ErrorCode::ConstraintViolation
        )
    }

    /// HTTP status code matching the error category.
    pub fn http_status(&self) -> u16 {
        match self.category() {
            ErrorCategory::BadRequest => 400,
            ErrorCategory::Internal => 500,
        }
    }

    // ============== Display Functions ==============

    /// Display the full error with all context.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref parameter) = self.context.parameter {
            output.push_str(&format!("  → Parameter: {}\n", parameter));
        }
        if let Some(index) = self.context.index {
            output.push_str(&format!("  → Index: {}\n", index));
        }
        if let Some(ref expression) = self.context.expression {
            output.push_str(&format!("  → Expression: {}\n", expression));
            if let Some(position) = self.context.position {
                // caret under the offending character
                output.push_str(&format!("                {}^\n", " ".repeat(position)));
            }
        }
        if let Some(ref source) = self.source {
            output.push_str(&format!("  → Caused by: {}\n", source));
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

/// Render a list of displayable items as `["a", "b"]`.
pub(crate) fn quoted_list<T: fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    let items: Vec<String> = items.into_iter().map(|i| format!("\"{}\"", i)).collect();
    format!("[{}]", items.join(", "))
}

/// Render a list of indexes as `[0, 1]`.
pub(crate) fn index_list(indexes: &[usize]) -> String {
    let items: Vec<String> = indexes.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}

/// Helper for creating errors with context.
#[macro_export]
macro_rules! query_error {
    ($code:expr, $msg:expr) => {
        $crate::error::QueryError::new($code, $msg)
    };
    ($code:expr, $msg:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut err = $crate::error::QueryError::new($code, $msg);
        $(
            err = err.$key($value);
        )+
        err
    }};
}
