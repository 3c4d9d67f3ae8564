//! Allow rules: which filters, sorts and filter expressions a client may use.

use indexmap::IndexMap;

use super::constraint::Constraint;
use crate::error::{QueryError, QueryResult, quoted_list};
use crate::expression::FilterExpression;
use crate::filter::{ElementType, Filter, FilterType, Operator};

/// Permission for filters of one kind on one key.
///
/// ```rust
/// use questful_query::mapping::{AllowedFilter, Constraint};
/// use questful_query::filter::Operator;
///
/// let rule = AllowedFilter::integer("age")
///     .with_operators([Operator::GreaterThan, Operator::LessThan])
///     .with_constraint(Constraint::Range { min: Some(0.0), max: Some(150.0) });
/// assert_eq!(rule.available_operators(), vec![Operator::GreaterThan, Operator::LessThan]);
/// ```
#[derive(Debug, Clone)]
pub struct AllowedFilter {
    key: String,
    filter_type: FilterType,
    operators: Option<Vec<Operator>>,
    constraints: Vec<Constraint>,
    element_constraints: IndexMap<ElementType, Vec<Constraint>>,
}

impl AllowedFilter {
    /// Allow every legal operator for `filter_type` on `key`.
    pub fn new(key: impl Into<String>, filter_type: FilterType) -> Self {
        Self {
            key: key.into(),
            filter_type,
            operators: None,
            constraints: Vec::new(),
            element_constraints: IndexMap::new(),
        }
    }

    /// `key=null` / `key!=null`
    pub fn null(key: impl Into<String>) -> Self {
        Self::new(key, FilterType::Null)
    }

    /// `key=true`
    pub fn boolean(key: impl Into<String>) -> Self {
        Self::new(key, FilterType::Boolean)
    }

    /// `key>1`
    pub fn integer(key: impl Into<String>) -> Self {
        Self::new(key, FilterType::Integer)
    }

    /// `key>1.5`
    pub fn float(key: impl Into<String>) -> Self {
        Self::new(key, FilterType::Float)
    }

    /// `key="text"`
    pub fn string(key: impl Into<String>) -> Self {
        Self::new(key, FilterType::String)
    }

    /// `key=%"text"%`
    pub fn like(key: impl Into<String>) -> Self {
        Self::new(key, FilterType::Like)
    }

    /// `key=[1, 2]`
    pub fn in_list(key: impl Into<String>) -> Self {
        Self::new(key, FilterType::In)
    }

    /// `key=/pattern/`
    pub fn regexp(key: impl Into<String>) -> Self {
        Self::new(key, FilterType::Regexp)
    }

    /// Restrict the operators. Must be non-empty and legal for the kind.
    pub fn with_operators(mut self, operators: impl IntoIterator<Item = Operator>) -> Self {
        self.operators = Some(operators.into_iter().collect());
        self
    }

    /// Add a value constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Add several value constraints.
    pub fn with_constraints(mut self, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        self.constraints.extend(constraints);
        self
    }

    /// Add a constraint applied to every in-list element of `element_type`.
    pub fn with_element_constraint(mut self, element_type: ElementType, constraint: Constraint) -> Self {
        self.element_constraints
            .entry(element_type)
            .or_default()
            .push(constraint);
        self
    }

    /// The key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The filter kind.
    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    /// Value constraints.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Constraints for in-list elements, keyed by datatype.
    pub fn element_constraints(&self) -> &IndexMap<ElementType, Vec<Constraint>> {
        &self.element_constraints
    }

    /// Operators a filter may use under this rule: the declared ones that are
    /// legal for the kind, or every legal one if none were declared.
    pub fn available_operators(&self) -> Vec<Operator> {
        match &self.operators {
            None => self.filter_type.legal_operators().to_vec(),
            Some(declared) => declared
                .iter()
                .copied()
                .filter(|op| self.filter_type.accepts(*op))
                .collect(),
        }
    }

    /// Whether this rule governs `filter`.
    pub fn matches(&self, filter: &Filter) -> bool {
        self.key == filter.key() && self.filter_type == filter.filter_type()
    }

    /// Reject inconsistent declarations.
    pub(crate) fn check(&self) -> QueryResult<()> {
        let label = format!("Allowed filter \"{}\" ({})", self.key, self.filter_type);

        if let Some(operators) = &self.operators {
            if operators.is_empty() {
                return Err(QueryError::invalid_rule(format!(
                    "{} declares an empty operator list",
                    label
                )));
            }
            if let Some(op) = operators.iter().find(|op| !self.filter_type.accepts(**op)) {
                return Err(QueryError::invalid_rule(format!(
                    "{} declares operator \"{}\", which {} filters do not support; supported operators are: {}",
                    label,
                    op,
                    self.filter_type,
                    quoted_list(self.filter_type.legal_operators())
                )));
            }
        }

        for constraint in &self.constraints {
            check_constraint(&label, constraint, self.filter_type)?;
        }

        if !self.element_constraints.is_empty() && self.filter_type != FilterType::In {
            return Err(QueryError::invalid_rule(format!(
                "{} declares element constraints, which only in filters support",
                label
            )));
        }
        for (element_type, constraints) in &self.element_constraints {
            let label = format!("{}, {} elements", label, element_type);
            for constraint in constraints {
                check_constraint(&label, constraint, element_type.filter_type())?;
            }
        }

        Ok(())
    }
}

fn check_constraint(label: &str, constraint: &Constraint, filter_type: FilterType) -> QueryResult<()> {
    if !constraint.is_available_for(filter_type) {
        return Err(QueryError::invalid_rule(format!(
            "{}: constraint \"{}\" is not available for {} values",
            label,
            constraint.name(),
            filter_type
        )));
    }
    constraint.check_definition().map_err(|reason| {
        QueryError::invalid_rule(format!(
            "{}: constraint \"{}\" is invalid: {}",
            label,
            constraint.name(),
            reason
        ))
    })
}

/// Permission to sort by a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedSort {
    key: String,
}

impl AllowedSort {
    /// Allow sorting by `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// The key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Permission for a filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedFilterExpression {
    /// `*`: any well-formed expression.
    Any,
    /// Expressions with the same normalized form.
    Expression(FilterExpression),
}

impl AllowedFilterExpression {
    /// The wildcard that allows every expression.
    pub const WILDCARD: &'static str = "*";

    /// Parse a declared expression, or the `*` wildcard.
    pub fn parse(expression: &str) -> QueryResult<Self> {
        if expression.trim() == Self::WILDCARD {
            return Ok(Self::Any);
        }
        FilterExpression::parse(expression)
            .map(Self::Expression)
            .map_err(|e| {
                QueryError::invalid_rule(format!(
                    "Allowed filter expression \"{}\" is malformed: {}",
                    expression, e.message
                ))
                .with_source(e)
            })
    }

    /// Whether `expression` is permitted.
    pub fn matches(&self, expression: &FilterExpression) -> bool {
        match self {
            Self::Any => true,
            Self::Expression(allowed) => allowed.normalized() == expression.normalized(),
        }
    }

    /// Normalized text, or `*`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Any => Self::WILDCARD,
            Self::Expression(allowed) => allowed.normalized(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::filter::parse_filter;

    #[test]
    fn test_available_operators() {
        assert_eq!(AllowedFilter::boolean("b").available_operators(), vec![Operator::Equal]);
        assert_eq!(AllowedFilter::integer("i").available_operators().len(), 6);
        let rule = AllowedFilter::string("s").with_operators([Operator::NotEqual]);
        assert_eq!(rule.available_operators(), vec![Operator::NotEqual]);
    }

    #[test]
    fn test_matches_by_key_and_kind() {
        let rule = AllowedFilter::integer("age");
        assert!(rule.matches(&parse_filter(0, "age>1").unwrap()));
        assert!(!rule.matches(&parse_filter(0, "age>1.5").unwrap()));
        assert!(!rule.matches(&parse_filter(0, "size>1").unwrap()));
    }

    #[test]
    fn test_check_rejects_bad_operators() {
        let err = AllowedFilter::integer("a").with_operators([]).check().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRule);
        assert!(err.message.contains("empty operator list"));

        let err = AllowedFilter::like("a")
            .with_operators([Operator::GreaterThan])
            .check()
            .unwrap_err();
        assert!(err.message.contains(r#"declares operator ">""#));
        assert!(err.is_internal());
    }

    #[test]
    fn test_check_rejects_unavailable_constraints() {
        let err = AllowedFilter::boolean("a")
            .with_constraint(Constraint::Email)
            .check()
            .unwrap_err();
        assert!(err.message.contains(r#"constraint "email" is not available for boolean values"#));

        let err = AllowedFilter::string("a")
            .with_element_constraint(ElementType::String, Constraint::NotBlank)
            .check()
            .unwrap_err();
        assert!(err.message.contains("only in filters"));

        let err = AllowedFilter::in_list("a")
            .with_element_constraint(ElementType::Integer, Constraint::Email)
            .check()
            .unwrap_err();
        assert!(err.message.contains("integer elements"));

        assert!(
            AllowedFilter::in_list("a")
                .with_constraint(Constraint::Count { min: Some(1), max: Some(3) })
                .with_element_constraint(ElementType::String, Constraint::Length { min: None, max: Some(8) })
                .check()
                .is_ok()
        );
    }

    #[test]
    fn test_allowed_expressions() {
        let any = AllowedFilterExpression::parse("*").unwrap();
        let exact = AllowedFilterExpression::parse("(0and1)or2").unwrap();
        let submitted = FilterExpression::parse("0and1or2").unwrap();
        assert!(any.matches(&submitted));
        assert!(exact.matches(&submitted));
        assert!(!exact.matches(&FilterExpression::parse("0and(1or2)").unwrap()));
        assert_eq!(exact.as_str(), "(0and1)or2");

        let err = AllowedFilterExpression::parse("0and").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRule);
    }
}
