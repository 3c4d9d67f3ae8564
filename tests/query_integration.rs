//! End-to-end tests: query string → parsed query → allow-list → SQL.
//!
//! These tests verify the whole pipeline including:
//! - Filter, filter expression and sort parsing
//! - Index cross-checks between `filter` and `filterExpression`
//! - Allow-list rejection
//! - SQL emission for every dialect

use std::io;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use questful::prelude::*;
use questful::query::{AllowedFilterExpression, ErrorCode, parse_filter};
use tracing_subscriber::fmt::MakeWriter;

fn parse(query: &str) -> QueryResult<ParsedQuery> {
    ParsedQuery::parse(&QueryInput::from_query_string(query))
}

fn users() -> Mapping {
    Mapping::builder()
        .relate("id", "u.id")
        .relate("name", "u.name")
        .relate("timeCreated", "u.timeCreated")
        .allow_filter(AllowedFilter::integer("id"))
        .allow_filter(AllowedFilter::string("timeCreated"))
        .allow_filter(AllowedFilter::in_list("name"))
        .allow_sort("name")
        .allow_filter_expression("0or1")
        .build()
        .expect("valid mapping")
}

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ============== End-to-end scenarios ==============

#[test]
fn test_filter_and_sort_to_sql() {
    let query = parse("filter[]=id>1&sort[]=name").unwrap();
    let generated = SqlGenerator::sqlite().generate(&users(), &query).unwrap();

    assert_eq!(generated.where_clause(), Some("(u.id > :filter_0)"));
    assert_eq!(generated.parameters().len(), 1);
    assert_eq!(generated.parameters()["filter_0"], FilterValue::Int(1));
    assert_eq!(generated.order_by_sql().as_deref(), Some("u.name ASC"));
}

#[test]
fn test_filter_expression_to_sql() {
    let query = parse(r#"filter[]=id=1&filter[]=timeCreated="2016-01-01"&filterExpression=0or1"#).unwrap();
    let generated = SqlGenerator::sqlite().generate(&users(), &query).unwrap();

    assert_eq!(
        generated.where_clause(),
        Some("(u.id = :filter_0 OR u.timeCreated = :filter_1)")
    );
    assert_eq!(
        generated.parameters()["filter_1"],
        FilterValue::String("2016-01-01".into())
    );

    let mysql = SqlGenerator::mysql().generate(&users(), &query).unwrap();
    assert_eq!(
        mysql.where_clause(),
        Some("(u.id = :filter_0 OR u.timeCreated = BINARY :filter_1)")
    );
}

#[test]
fn test_case_insensitive_in_list() {
    let query = parse(r#"filter[]=name=["fOO","bAr"]/i"#).unwrap();
    let generated = SqlGenerator::mysql().generate(&users(), &query).unwrap();

    assert_eq!(
        generated.where_clause(),
        Some("(LOWER(u.name) IN (:filter_0_0, :filter_0_1))")
    );
    assert_eq!(generated.parameters()["filter_0_0"], FilterValue::from("foo"));
    assert_eq!(generated.parameters()["filter_0_1"], FilterValue::from("bar"));
}

#[test]
fn test_parameters_serialize_to_json() {
    let query = parse("filter[]=id>1&sort[]=-name").unwrap();
    let generated = SqlGenerator::doctrine().generate(&users(), &query).unwrap();
    let json = serde_json::to_value(&generated).unwrap();

    assert_eq!(json["where"], "(u.id > :filter_0)");
    assert_eq!(json["parameters"]["filter_0"], 1);
    assert_eq!(json["orderBy"][0]["column"], "u.name");
}

#[test]
fn test_null_branch_snapshot() {
    let query = parse(r#"filter[]=name=["a",null]&filter[]=id>=3&sort[]=name"#).unwrap();
    let generated = SqlGenerator::mysql().generate(&users(), &query).unwrap();

    insta::assert_json_snapshot!(generated, @r###"
    {
      "where": "((u.name IS NULL OR u.name = BINARY :filter_0_0) AND u.id >= :filter_1)",
      "parameters": {
        "filter_0_0": "a",
        "filter_1": 3
      },
      "orderBy": [
        {
          "column": "u.name",
          "order": "ASC"
        }
      ]
    }
    "###);
}

// ============== Parsing properties ==============

#[test]
fn test_integers_and_floats() {
    for n in [0_i64, 7, 42, 1_000_000, i64::MAX] {
        let filter = parse_filter(0, &format!("a={}", n)).unwrap();
        assert_eq!(filter.kind(), &FilterKind::Integer(n));

        let filter = parse_filter(0, &format!("a={}.0", n)).unwrap();
        assert_eq!(filter.filter_type(), FilterType::Float);
    }
}

#[test]
fn test_empty_value_is_null() {
    for operator in ["=", "!="] {
        let filter = parse_filter(0, &format!("deletedAt{}", operator)).unwrap();
        assert_eq!(filter.kind(), &FilterKind::Null);
    }
    for operator in ["<", "<=", ">", ">="] {
        let err = parse_filter(0, &format!("deletedAt{}", operator)).unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedFilter);
    }
}

#[test]
fn test_operator_scan_prefers_longest() {
    let filter = parse_filter(0, "a<=5").unwrap();
    assert_eq!(filter.operator(), Operator::LessThanOrEqual);
    let filter = parse_filter(0, "a!=5").unwrap();
    assert_eq!(filter.operator(), Operator::NotEqual);
}

#[test]
fn test_expression_normalization() {
    let cases = [
        ("0and1or2", "(0and1)or2"),
        ("0or1and2", "0or(1and2)"),
        ("((0))", "0"),
        ("(0or1)and(2or3)", "(0or1)and(2or3)"),
    ];
    for (raw, normalized) in cases {
        let expression = FilterExpression::parse(raw).unwrap();
        assert_eq!(expression.normalized(), normalized, "normalizing {}", raw);

        let again = FilterExpression::parse(expression.normalized()).unwrap();
        assert_eq!(again.normalized(), normalized);
    }

    assert_eq!(FilterExpression::parse("3or(1and3)or0").unwrap().indexes(), vec![0, 1, 3]);
}

#[test]
fn test_duplicate_entries_collapse() {
    let query = parse("filter[0]=id=1&filter[5]=id=1&sort[0]=name&sort[3]=name").unwrap();
    assert_eq!(query.filters().keys().copied().collect::<Vec<_>>(), vec![0]);
    assert_eq!(query.sorts().len(), 1);
}

// ============== Rejections ==============

#[test]
fn test_cross_validation() {
    let err = parse("filter[0]=id=1&filter[1]=id=2&filterExpression=0").unwrap_err();
    assert_eq!(err.code, ErrorCode::IndexMismatch);
    assert!(err.message.contains("contains indexes [1]"));

    let err = parse("filter[0]=id=1&filter[1]=id=2&filterExpression=0or2").unwrap_err();
    assert_eq!(err.code, ErrorCode::IndexMismatch);
    assert!(err.message.contains("contains indexes [2]"));
}

#[test]
fn test_rejection_is_logged() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let query = parse("filter[]=id=1&sort[]=id").unwrap();
        let err = users().validate(&query).unwrap_err();
        assert_eq!(err.code, ErrorCode::DisallowedSort);
    });

    let output = logs.contents();
    assert!(output.contains("Query rejected by allow-list"), "{}", output);
    assert!(output.contains("code=Q2003"), "{}", output);
    assert!(!output.contains("Parsed query"), "debug events are filtered: {}", output);
}

#[test]
fn test_disallowed_operator_names_both_sides() {
    let mapping = Mapping::builder()
        .relate("id", "u.id")
        .allow_filter(AllowedFilter::integer("id").with_operators([Operator::Equal]))
        .build()
        .unwrap();

    let err = mapping.validate(&parse("filter[]=id>1").unwrap()).unwrap_err();
    assert_eq!(err.code, ErrorCode::DisallowedOperator);
    assert!(err.message.contains(r#"Disallowed operator ">""#));
    assert!(err.message.contains(r#"["="]"#));
}

#[test]
fn test_denied_expression() {
    let query = parse("filter[]=id=1&filter[]=id=2&filterExpression=0and1").unwrap();
    let err = SqlGenerator::mysql().generate(&users(), &query).unwrap_err();
    assert_eq!(err.code, ErrorCode::DisallowedFilterExpression);
    assert_eq!(err.http_status(), 400);
}

#[test]
fn test_malformed_input_is_bad_request() {
    for query in [
        "filter[]=id",
        "filter[]==1",
        "filter[x]=id=1",
        "filter[-1]=id=1",
        "filter[]=id=[]",
        "filter[]=id=\"a\"b\"",
        "filter[]=id=/(/",
        "filter[]=id=1&filterExpression=0and",
        "filter[]=id=1&filterExpression=(0",
        "filter[]=id=1&filterExpression=0 and 1",
        "sort[]=na-me",
    ] {
        let err = parse(query).unwrap_err();
        assert!(err.is_bad_request(), "{} should be a bad request: {}", query, err);
        assert!(err.is_malformed(), "{} should be malformed: {}", query, err);
    }
}

#[test]
fn test_configuration_mistakes_are_internal() {
    let err = Mapping::builder()
        .allow_filter(AllowedFilter::integer("id"))
        .build()
        .unwrap_err();
    assert!(err.is_internal());
    assert_eq!(err.http_status(), 500);

    let err = AllowedFilterExpression::parse("0or").unwrap_err();
    assert!(err.is_internal());
}
