//! Turns a validated query into a parameterized `WHERE` fragment and an
//! `ORDER BY` list.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use questful_query::{LogicalOperator, Mapping, ParsedQuery, QueryError, QueryResult, SyntaxNode};
use tracing::{debug, trace};

use crate::condition;
use crate::dialect::{Dialect, Doctrine, MySql, Sqlite, XorStyle};
use crate::types::{GeneratedQuery, OrderByField};

/// Emits SQL or DQL for one backend.
///
/// ```rust
/// use questful_query::{AllowedFilter, Mapping, ParsedQuery, QueryInput};
/// use questful_sql::SqlGenerator;
///
/// let mapping = Mapping::builder()
///     .relate("id", "u.id")
///     .relate("name", "u.name")
///     .allow_filter(AllowedFilter::integer("id"))
///     .allow_sort("name")
///     .build()
///     .unwrap();
/// let query = ParsedQuery::parse(&QueryInput::from_query_string("filter[]=id>1&sort[]=name")).unwrap();
///
/// let generated = SqlGenerator::sqlite().generate(&mapping, &query).unwrap();
/// assert_eq!(generated.where_clause(), Some("(u.id > :filter_0)"));
/// assert_eq!(generated.order_by_sql().as_deref(), Some("u.name ASC"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SqlGenerator<D: Dialect> {
    dialect: D,
}

impl SqlGenerator<MySql> {
    /// Create a MySQL generator.
    pub fn mysql() -> Self {
        Self::new(MySql)
    }
}

impl SqlGenerator<Sqlite> {
    /// Create a SQLite generator.
    pub fn sqlite() -> Self {
        Self::new(Sqlite)
    }
}

impl SqlGenerator<Doctrine> {
    /// Create a Doctrine DQL generator.
    pub fn doctrine() -> Self {
        Self::new(Doctrine)
    }
}

impl<D: Dialect> SqlGenerator<D> {
    /// Create a generator for `dialect`.
    pub fn new(dialect: D) -> Self {
        Self { dialect }
    }

    /// The dialect.
    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    /// Validate `query` against `mapping`, then emit.
    pub fn generate(&self, mapping: &Mapping, query: &ParsedQuery) -> QueryResult<GeneratedQuery> {
        mapping.validate(query)?;

        let mut parameters = IndexMap::new();
        let mut conditions = BTreeMap::new();
        for (index, filter) in query.filters() {
            let Some(rule) = mapping.find_allowed_filter(filter) else {
                continue;
            };
            let column = mapping.column_for(rule.key()).ok_or_else(|| {
                QueryError::internal(format!("No column is related to allowed key \"{}\"", rule.key()))
            })?;
            let sql = condition::build(&self.dialect, *index, column, filter, &mut parameters);
            trace!(index, sql = %sql, "Filter condition");
            conditions.insert(*index, sql);
        }

        let where_clause = if conditions.is_empty() {
            None
        } else {
            let combined = match query.filter_expression() {
                Some(expression) => self.render(expression.tree(), &conditions)?.sql,
                None => conditions.values().cloned().collect::<Vec<_>>().join(" AND "),
            };
            wrap_in_parentheses(&combined)
        };

        let mut order_by = Vec::with_capacity(query.sorts().len());
        for sort in query.sorts().values() {
            if !mapping.is_sort_allowed(sort.key()) {
                continue;
            }
            let column = mapping.column_for(sort.key()).ok_or_else(|| {
                QueryError::internal(format!("No column is related to allowed sort \"{}\"", sort.key()))
            })?;
            order_by.push(OrderByField::new(column, sort.order()));
        }

        debug!(
            dialect = self.dialect.name(),
            conditions = conditions.len(),
            parameters = parameters.len(),
            sorts = order_by.len(),
            "Generated query"
        );

        Ok(GeneratedQuery {
            where_clause,
            parameters,
            order_by,
        })
    }

    fn render(&self, node: &SyntaxNode, conditions: &BTreeMap<usize, String>) -> QueryResult<Rendered> {
        let Some((operator, left, right)) = node.as_binary() else {
            return match node {
                SyntaxNode::Leaf(index) => conditions
                    .get(index)
                    .map(|sql| Rendered::atom(sql.clone()))
                    .ok_or_else(|| QueryError::internal(format!("No condition exists for filter index {}", index))),
                _ => Err(QueryError::internal("Syntax node is neither binary nor a leaf")),
            };
        };

        let left = self.render(left, conditions)?;
        let right = self.render(right, conditions)?;

        let rendered = match (operator, self.dialect.xor_style()) {
            (LogicalOperator::Xor, XorStyle::Function) => {
                Rendered::atom(format!("XOR({}, {})", left.operand(), right.operand()))
            }
            (LogicalOperator::Xor, XorStyle::Expanded) => Rendered::infix(format!(
                "({} AND NOT ({})) OR (NOT ({}) AND {})",
                left.operand(),
                right.sql,
                left.sql,
                right.operand()
            )),
            (operator, _) => Rendered::infix(format!(
                "{} {} {}",
                left.operand(),
                operator.as_sql(),
                right.operand()
            )),
        };
        Ok(rendered)
    }
}

/// A rendered subtree and whether it is an infix operation.
struct Rendered {
    sql: String,
    infix: bool,
}

impl Rendered {
    fn atom(sql: String) -> Self {
        Self { sql, infix: false }
    }

    fn infix(sql: String) -> Self {
        Self { sql, infix: true }
    }

    /// The subtree as an operand of an enclosing operation.
    fn operand(&self) -> String {
        if self.infix {
            format!("({})", self.sql)
        } else {
            self.sql.clone()
        }
    }
}

/// Strip outer parentheses that enclose the whole string, then wrap once.
fn wrap_in_parentheses(sql: &str) -> Option<String> {
    let mut inner = sql.trim();
    while inner.starts_with('(') && closing_paren(inner) == Some(inner.len() - 1) {
        inner = inner[1..inner.len() - 1].trim();
    }
    if inner.is_empty() {
        None
    } else {
        Some(format!("({})", inner))
    }
}

/// Byte offset of the `)` matching the `(` at offset 0.
fn closing_paren(sql: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in sql.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
