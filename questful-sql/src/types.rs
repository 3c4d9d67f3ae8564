//! Emitter output.

use indexmap::IndexMap;
use serde::Serialize;

use questful_query::{FilterValue, SortOrder};

/// One `ORDER BY` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderByField {
    /// The backend column.
    pub column: String,
    /// The sort order.
    pub order: SortOrder,
}

impl OrderByField {
    /// Create a new order by field.
    pub fn new(column: impl Into<String>, order: SortOrder) -> Self {
        Self {
            column: column.into(),
            order,
        }
    }

    /// Create an ascending order.
    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, SortOrder::Asc)
    }

    /// Create a descending order.
    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, SortOrder::Desc)
    }

    /// Generate the SQL for this order by field.
    pub fn to_sql(&self) -> String {
        let mut sql = String::with_capacity(self.column.len() + 5);
        self.write_sql(&mut sql);
        sql
    }

    /// Write the SQL directly to a buffer.
    ///
    /// ```rust
    /// use questful_sql::OrderByField;
    ///
    /// let field = OrderByField::desc("u.created_at");
    /// let mut buffer = String::from("ORDER BY ");
    /// field.write_sql(&mut buffer);
    /// assert_eq!(buffer, "ORDER BY u.created_at DESC");
    /// ```
    pub fn write_sql(&self, buffer: &mut String) {
        buffer.push_str(&self.column);
        buffer.push(' ');
        buffer.push_str(self.order.as_sql());
    }
}

/// A parameterized `WHERE` fragment, its parameters and the ordering.
///
/// The fragment contains no `WHERE` keyword and is either `None` or wrapped
/// in one pair of parentheses, so it can be appended to an existing
/// condition with `AND`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuery {
    /// The condition, absent when no filter applies.
    #[serde(rename = "where")]
    pub where_clause: Option<String>,
    /// Named parameters, without the leading colon.
    pub parameters: IndexMap<String, FilterValue>,
    /// Ordering, in sort index order.
    pub order_by: Vec<OrderByField>,
}

impl GeneratedQuery {
    /// The condition.
    pub fn where_clause(&self) -> Option<&str> {
        self.where_clause.as_deref()
    }

    /// Named parameters.
    pub fn parameters(&self) -> &IndexMap<String, FilterValue> {
        &self.parameters
    }

    /// Ordering entries.
    pub fn order_by(&self) -> &[OrderByField] {
        &self.order_by
    }

    /// `col ASC, col2 DESC`, or `None` without sorts.
    pub fn order_by_sql(&self) -> Option<String> {
        if self.order_by.is_empty() {
            return None;
        }
        let mut sql = String::new();
        for (i, field) in self.order_by.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            field.write_sql(&mut sql);
        }
        Some(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_order_by_sql() {
        let generated = GeneratedQuery {
            order_by: vec![OrderByField::asc("t.foo"), OrderByField::desc("t.bar")],
            ..Default::default()
        };
        assert_eq!(generated.order_by_sql().as_deref(), Some("t.foo ASC, t.bar DESC"));
        assert_eq!(GeneratedQuery::default().order_by_sql(), None);
    }

    #[test]
    fn test_order_by_field_to_sql() {
        assert_eq!(OrderByField::new("name", SortOrder::Asc).to_sql(), "name ASC");
    }
}
