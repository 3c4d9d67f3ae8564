//! Integration tests for mapping configuration files.
//!
//! These tests verify that a mapping declared in TOML behaves like the same
//! mapping declared in code.

use std::io::Write;

use pretty_assertions::assert_eq;
use questful::prelude::*;
use questful::query::{Constraint, ErrorCode};

const USERS: &str = r#"
sorts = ["name", "created"]
filter_expressions = ["*"]

[relations]
id = "u.id"
name = "u.name"
email = "u.email"
created = "u.created_at"

[[filters]]
key = "id"
type = "integer"
operators = ["=", "!=", ">", "<"]
constraints = [{ type = "range", min = 1 }]

[[filters]]
key = "id"
type = "in"
constraints = [{ type = "count", max = 5 }]

[[filters]]
key = "name"
type = "like"
constraints = [{ type = "length", min = 2 }]

[[filters]]
key = "email"
type = "string"
constraints = [{ type = "email" }]

[[filters]]
key = "created"
type = "string"
constraints = [{ type = "date" }]
"#;

fn generate(mapping: &Mapping, query: &str) -> QueryResult<GeneratedQuery> {
    let query = ParsedQuery::parse(&QueryInput::from_query_string(query))?;
    SqlGenerator::mysql().generate(mapping, &query)
}

/// Test a full mapping file
#[test]
fn test_config_full() {
    let mapping = USERS.parse::<MappingConfig>().unwrap().build().unwrap();

    let generated = generate(
        &mapping,
        r#"filter[]=id>1&filter[]=name=%"jo"%/i&filter[]=created="2024-02-29"&filterExpression=0and(1or2)&sort[]=-created"#,
    )
    .unwrap();

    assert_eq!(
        generated.where_clause(),
        Some(r"(u.id > :filter_0 AND (LOWER(u.name) LIKE :filter_1 ESCAPE '\\' OR u.created_at = BINARY :filter_2))")
    );
    assert_eq!(generated.parameters()["filter_1"], FilterValue::from("%jo%"));
    assert_eq!(generated.order_by_sql().as_deref(), Some("u.created_at DESC"));
}

/// Test constraint violations declared in the file
#[test]
fn test_config_constraints() {
    let mapping = USERS.parse::<MappingConfig>().unwrap().build().unwrap();

    for query in [
        "filter[]=id=0",
        "filter[]=id=[1,2,3,4,5,6]",
        r#"filter[]=name="j"%"#,
        r#"filter[]=email="not-an-email""#,
        r#"filter[]=created="2023-02-29""#,
    ] {
        let err = generate(&mapping, query).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConstraintViolation, "{}", query);
    }

    assert!(generate(&mapping, r#"filter[]=email="jo@example.com""#).is_ok());
}

/// Test that the file and the builder produce the same mapping
#[test]
fn test_config_matches_builder() {
    let from_file = r#"
sorts = ["name"]

[relations]
id = "u.id"
name = "u.name"

[[filters]]
key = "id"
type = "integer"
constraints = [{ type = "greater_than", value = 0 }]
"#
    .parse::<MappingConfig>()
    .unwrap()
    .build()
    .unwrap();

    let from_code = Mapping::builder()
        .relate("id", "u.id")
        .relate("name", "u.name")
        .allow_filter(AllowedFilter::integer("id").with_constraint(Constraint::GreaterThan {
            value: FilterValue::Int(0),
        }))
        .allow_sort("name")
        .build()
        .unwrap();

    for query in ["filter[]=id=3&sort[]=name", "filter[]=id=0", "sort[]=id"] {
        let a = generate(&from_file, query).map_err(|e| e.code);
        let b = generate(&from_code, query).map_err(|e| e.code);
        assert_eq!(a, b, "{}", query);
    }
}

/// Test adding programmatic constraints to a file-based mapping
#[test]
fn test_config_into_builder() {
    let mapping = USERS
        .parse::<MappingConfig>()
        .unwrap()
        .into_builder()
        .relate("age", "u.age")
        .allow_filter(AllowedFilter::integer("age").with_constraint(Constraint::callback("even", |value| {
            match value {
                FilterValue::Int(n) if n % 2 == 0 => None,
                _ => Some("This value should be even.".to_string()),
            }
        })))
        .build()
        .unwrap();

    assert!(generate(&mapping, "filter[]=age=4").is_ok());
    let err = generate(&mapping, "filter[]=age=5").unwrap_err();
    assert!(err.message.ends_with("First error: This value should be even."));
}

/// Test loading from disk
#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(USERS.as_bytes()).unwrap();

    let config = MappingConfig::from_file(file.path()).unwrap();
    assert_eq!(config.relations.len(), 4);
    assert_eq!(config.filters.len(), 5);
    assert!(config.build().is_ok());
}

/// Test that configuration mistakes surface as internal errors
#[test]
fn test_config_errors() {
    let err = "[relations]\nid = \"u.id; --\"".parse::<MappingConfig>().unwrap().build().unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidColumn);

    let err = "[[filters]]\nkey = \"id\"\ntype = \"integer\"".parse::<MappingConfig>().unwrap().build().unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingRelation);

    let err = "[[filters]]\nkey = \"id\"\ntype = \"number\"".parse::<MappingConfig>().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigParse);
    assert!(err.is_internal());
}
