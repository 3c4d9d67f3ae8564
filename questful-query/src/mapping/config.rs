//! Mapping declarations loaded from TOML.
//!
//! ```toml
//! filter_expressions = ["0or1", "*"]
//! sorts = ["name"]
//!
//! [relations]
//! id = "u.id"
//! name = "${USER_TABLE}.name"
//!
//! [[filters]]
//! key = "id"
//! type = "integer"
//! operators = ["=", ">"]
//! constraints = [{ type = "range", min = 1 }]
//! ```
//!
//! `${VAR}` references are replaced by the environment variable's value
//! before parsing; unset variables are left untouched.

use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex_lite::Regex;
use serde::Deserialize;
use tracing::debug;

use super::{AllowedFilter, Constraint, Mapping, MappingBuilder};
use crate::error::{ErrorCode, QueryError, QueryResult};
use crate::filter::{ElementType, FilterType, Operator};

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

/// A whole mapping file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingConfig {
    /// Replacement key pattern.
    #[serde(default)]
    pub key_pattern: Option<String>,

    /// Replacement column pattern.
    #[serde(default)]
    pub column_pattern: Option<String>,

    /// Key → column relations.
    #[serde(default)]
    pub relations: IndexMap<String, String>,

    /// Allowed filters.
    #[serde(default)]
    pub filters: Vec<FilterRuleConfig>,

    /// Keys that may be sorted by.
    #[serde(default)]
    pub sorts: Vec<String>,

    /// Allowed filter expressions; `"*"` allows any.
    #[serde(default)]
    pub filter_expressions: Vec<String>,
}

/// One `[[filters]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterRuleConfig {
    /// The key.
    pub key: String,

    /// The filter kind.
    #[serde(rename = "type")]
    pub filter_type: FilterType,

    /// Operator restriction; every legal operator when absent.
    #[serde(default)]
    pub operators: Option<Vec<Operator>>,

    /// Value constraints.
    #[serde(default)]
    pub constraints: Vec<Constraint>,

    /// In-list element constraints by element datatype.
    #[serde(default)]
    pub element_constraints: IndexMap<ElementType, Vec<Constraint>>,
}

impl FilterRuleConfig {
    fn into_rule(self) -> AllowedFilter {
        let mut rule = AllowedFilter::new(self.key, self.filter_type).with_constraints(self.constraints);
        if let Some(operators) = self.operators {
            rule = rule.with_operators(operators);
        }
        for (element_type, constraints) in self.element_constraints {
            for constraint in constraints {
                rule = rule.with_element_constraint(element_type, constraint);
            }
        }
        rule
    }
}

impl MappingConfig {
    /// Load a mapping file.
    pub fn from_file(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            QueryError::new(
                ErrorCode::ConfigParse,
                format!("Failed to read mapping file '{}': {}", path.display(), e),
            )
            .with_source(e)
        })?;

        debug!(path = %path.display(), "Loaded mapping file");
        content.parse()
    }

    /// Turn the declarations into a builder, e.g. to add callback constraints.
    pub fn into_builder(self) -> MappingBuilder {
        let mut builder = Mapping::builder();
        if let Some(pattern) = self.key_pattern {
            builder = builder.key_pattern(pattern);
        }
        if let Some(pattern) = self.column_pattern {
            builder = builder.column_pattern(pattern);
        }
        for (key, column) in self.relations {
            builder = builder.relate(key, column);
        }
        for filter in self.filters {
            builder = builder.allow_filter(filter.into_rule());
        }
        for key in self.sorts {
            builder = builder.allow_sort(key);
        }
        for expression in self.filter_expressions {
            builder = builder.allow_filter_expression(expression);
        }
        builder
    }

    /// Build the mapping.
    pub fn build(self) -> QueryResult<Mapping> {
        self.into_builder().build()
    }
}

impl FromStr for MappingConfig {
    type Err = QueryError;

    fn from_str(content: &str) -> QueryResult<Self> {
        let expanded = expand_env_vars(content);
        toml::from_str(&expanded).map_err(|e| {
            QueryError::new(ErrorCode::ConfigParse, format!("Invalid mapping configuration: {}", e.message()))
                .with_source(e)
        })
    }
}

/// Expand environment variables in the format `${VAR_NAME}`.
fn expand_env_vars(content: &str) -> String {
    ENV_VAR
        .replace_all(content, |caps: &regex_lite::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::QueryInput;
    use crate::parser::ParsedQuery;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const CONFIG: &str = r#"
filter_expressions = ["0or1"]
sorts = ["name"]

[relations]
id = "u.id"
name = "u.name"
tags = "u.tags"

[[filters]]
key = "id"
type = "integer"
operators = ["=", ">"]
constraints = [{ type = "range", min = 1 }]

[[filters]]
key = "name"
type = "like"

[[filters]]
key = "tags"
type = "in"
constraints = [{ type = "count", max = 3 }]
element_constraints = { string = [{ type = "length", max = 5 }] }
"#;

    fn parse(query: &str) -> ParsedQuery {
        ParsedQuery::parse(&QueryInput::from_query_string(query)).unwrap()
    }

    #[test]
    fn test_parse_config() {
        let config: MappingConfig = CONFIG.parse().unwrap();
        assert_eq!(config.relations.len(), 3);
        assert_eq!(config.filters.len(), 3);
        assert_eq!(config.filters[0].filter_type, FilterType::Integer);
        assert_eq!(
            config.filters[0].operators,
            Some(vec![Operator::Equal, Operator::GreaterThan])
        );
        assert_eq!(config.filters[2].element_constraints.len(), 1);
        assert!(config.key_pattern.is_none());
    }

    #[test]
    fn test_build_and_validate() {
        let mapping = CONFIG.parse::<MappingConfig>().unwrap().build().unwrap();
        assert_eq!(mapping.column_for("name"), Some("u.name"));
        assert!(mapping.is_sort_allowed("name"));

        assert!(
            mapping
                .validate(&parse(r#"filter[]=id>1&filter[]=name=%"bo"%&filterExpression=0or1"#))
                .is_ok()
        );

        let err = mapping.validate(&parse("filter[]=id<1")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DisallowedOperator);

        let err = mapping.validate(&parse("filter[]=id=0")).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConstraintViolation);

        let err = mapping
            .validate(&parse(r#"filter[]=tags=["short", "too long"]"#))
            .unwrap_err();
        assert!(err.message.contains("Element at index 1"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = "sort = [\"name\"]".parse::<MappingConfig>().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParse);

        let err = r#"
[[filters]]
key = "id"
type = "integer"
operator = "="
"#
        .parse::<MappingConfig>()
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParse);
        assert!(err.is_internal());
    }

    #[test]
    fn test_invalid_rule_surfaces_on_build() {
        let err = r#"
[relations]
flag = "u.flag"

[[filters]]
key = "flag"
type = "boolean"
operators = [">"]
"#
        .parse::<MappingConfig>()
        .unwrap()
        .build()
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRule);
    }

    #[test]
    fn test_env_var_expansion() {
        // SAFETY: test-local variable name
        unsafe { std::env::set_var("QUESTFUL_TEST_USER_TABLE", "users") };
        let expanded = expand_env_vars(r#"name = "${QUESTFUL_TEST_USER_TABLE}.name""#);
        assert_eq!(expanded, r#"name = "users.name""#);

        let untouched = expand_env_vars("${QUESTFUL_TEST_SURELY_UNSET}");
        assert_eq!(untouched, "${QUESTFUL_TEST_SURELY_UNSET}");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let config = MappingConfig::from_file(file.path()).unwrap();
        assert_eq!(config.sorts, vec!["name".to_string()]);

        let err = MappingConfig::from_file("/nonexistent/questful.toml").unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParse);
        assert!(err.message.starts_with("Failed to read mapping file"));
    }
}
