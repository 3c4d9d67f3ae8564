//! One boolean fragment per filter.

use indexmap::IndexMap;
use questful_query::{Filter, FilterKind, FilterValue, LikePattern, Operator};

use crate::dialect::{Dialect, not};

/// Render `filter` against `column`, binding its values into `parameters`.
///
/// Parameters are named `filter_<index>`; in-list elements are named
/// `filter_<index>_<position>` after their position in the submitted list.
pub(crate) fn build<D: Dialect + ?Sized>(
    dialect: &D,
    index: usize,
    column: &str,
    filter: &Filter,
    parameters: &mut IndexMap<String, FilterValue>,
) -> String {
    let name = format!("filter_{}", index);
    let operator = filter.operator();
    let negated = operator.is_negated();
    let case_insensitive = filter.is_case_insensitive();

    match filter.kind() {
        FilterKind::Null => {
            format!("{} IS {}NULL", column, not(negated))
        }
        FilterKind::Boolean(value) => {
            format!("{} {} {}", column, operator, if *value { 1 } else { 0 })
        }
        FilterKind::Integer(value) => {
            parameters.insert(name.clone(), FilterValue::Int(*value));
            format!("{} {} :{}", column, operator, name)
        }
        FilterKind::Float(value) => {
            parameters.insert(name.clone(), FilterValue::Float(*value));
            format!("{} {} :{}", column, operator, name)
        }
        FilterKind::String(value) => {
            if case_insensitive {
                parameters.insert(name.clone(), FilterValue::String(value.to_lowercase()));
                format!("LOWER({}) {} :{}", column, operator, name)
            } else {
                parameters.insert(name.clone(), FilterValue::String(value.clone()));
                format!("{} {} {}", column, operator, dialect.string_placeholder(&name))
            }
        }
        FilterKind::Like(pattern) => {
            parameters.insert(name.clone(), FilterValue::String(like_value(pattern, case_insensitive)));
            let (column, placeholder) = if case_insensitive {
                (format!("LOWER({})", column), format!(":{}", name))
            } else {
                (column.to_string(), dialect.string_placeholder(&name))
            };
            format!(
                "{} {}LIKE {} ESCAPE {}",
                column,
                not(negated),
                placeholder,
                dialect.like_escape()
            )
        }
        FilterKind::Regexp(pattern) => {
            parameters.insert(
                name.clone(),
                FilterValue::String(dialect.regexp_value(pattern, case_insensitive)),
            );
            dialect.regexp(column, negated, &name, case_insensitive)
        }
        FilterKind::In(items) => in_list(dialect, &name, column, operator, items, case_insensitive, parameters),
    }
}

/// Escape `%`, `_` and `\`, then add the wildcards.
fn like_value(pattern: &LikePattern, case_insensitive: bool) -> String {
    let text = if case_insensitive {
        pattern.value.to_lowercase()
    } else {
        pattern.value.clone()
    };

    let mut value = String::with_capacity(text.len() + 2);
    if pattern.wildcard_left {
        value.push('%');
    }
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            value.push('\\');
        }
        value.push(c);
    }
    if pattern.wildcard_right {
        value.push('%');
    }
    value
}

/// Strict deduplication: `1`, `1.0` and `"1"` are distinct.
fn dedup_strict(items: &[FilterValue]) -> Vec<(usize, &FilterValue)> {
    let mut unique: Vec<(usize, &FilterValue)> = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        if !unique.iter().any(|(_, seen)| *seen == item) {
            unique.push((position, item));
        }
    }
    unique
}

struct Bound {
    placeholder: String,
    is_string: bool,
}

/// `col IN (...)`, plain comparisons for a lone value and `IS NULL` branches.
///
/// Two or more distinct non-null values form an `IN` list. A single one
/// becomes a plain comparison. Nulls become `IS [NOT] NULL` branches. Branches
/// are joined with `OR` for `=` and `AND` for `!=`.
fn in_list<D: Dialect + ?Sized>(
    dialect: &D,
    name: &str,
    column: &str,
    operator: Operator,
    items: &[FilterValue],
    case_insensitive: bool,
    parameters: &mut IndexMap<String, FilterValue>,
) -> String {
    let negated = operator.is_negated();
    let mut bound = Vec::new();
    let mut has_null = false;

    for (position, item) in dedup_strict(items) {
        let item_name = format!("{}_{}", name, position);
        let (value, placeholder, is_string) = match item {
            FilterValue::Null => {
                has_null = true;
                continue;
            }
            FilterValue::String(s) if case_insensitive => {
                (FilterValue::String(s.to_lowercase()), format!(":{}", item_name), true)
            }
            FilterValue::String(s) => (
                FilterValue::String(s.clone()),
                dialect.string_placeholder(&item_name),
                true,
            ),
            FilterValue::Bool(b) => (dialect.boolean_element(*b), format!(":{}", item_name), false),
            other => (other.clone(), format!(":{}", item_name), false),
        };
        parameters.insert(item_name, value);
        bound.push(Bound { placeholder, is_string });
    }

    let folded = |is_string: bool| {
        if case_insensitive && is_string {
            format!("LOWER({})", column)
        } else {
            column.to_string()
        }
    };

    let mut branches = Vec::new();
    if has_null {
        branches.push(format!("{} IS {}NULL", column, not(negated)));
    }

    let list = match bound.as_slice() {
        [] => None,
        [single] => {
            branches.push(format!("{} {} {}", folded(single.is_string), operator, single.placeholder));
            None
        }
        many => {
            let placeholders: Vec<&str> = many.iter().map(|b| b.placeholder.as_str()).collect();
            Some(format!(
                "{} {}IN ({})",
                folded(case_insensitive),
                not(negated),
                placeholders.join(", ")
            ))
        }
    };

    let connective = if negated { " AND " } else { " OR " };
    match (list, branches.is_empty()) {
        (Some(list), true) => list,
        (Some(list), false) => format!("({}{}{})", list, connective, branches.join(connective)),
        (None, _) => format!("({})", branches.join(connective)),
    }
}
