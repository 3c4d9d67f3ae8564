//! Value constraints attached to allowed filters.
//!
//! Constraints only see the parsed value. Each filter kind accepts a fixed set
//! of constraints, checked when the mapping is built:
//!
//! | kind | constraints |
//! |---|---|
//! | integer, float | range, comparisons, callback |
//! | string, like | blank, not_blank, length, regex, email, url, ip, uuid, date, date_time, time, comparisons, callback |
//! | regexp | length, regex, comparisons, callback |
//! | boolean | is_true, is_false, callback |
//! | null | is_null |
//! | in | count |
//!
//! Apart from `not_blank`, `blank` and the `is_*` family, a null value
//! satisfies every constraint.

use std::cmp::Ordering;
use std::fmt;
use std::net::IpAddr;
use std::sync::{Arc, LazyLock};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::filter::{FilterType, FilterValue};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"));

/// A predicate over a filter value, returning a violation message on failure.
pub type CallbackFn = dyn Fn(&FilterValue) -> Option<String> + Send + Sync;

/// A named, programmatic constraint.
#[derive(Clone)]
pub struct Callback {
    name: String,
    check: Arc<CallbackFn>,
}

impl Callback {
    /// Wrap `check` under `name`.
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&FilterValue) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// The name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").field("name", &self.name).finish_non_exhaustive()
    }
}

/// A built-in value constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum Constraint {
    /// Not null, not empty, not whitespace-only, not `false`.
    NotBlank,
    /// Null or empty.
    Blank,
    /// Character count bounds.
    Length {
        /// Inclusive minimum.
        #[serde(default)]
        min: Option<usize>,
        /// Inclusive maximum.
        #[serde(default)]
        max: Option<usize>,
    },
    /// Must (or must not) match a `regex-lite` pattern.
    Regex {
        /// The pattern.
        pattern: String,
        /// `false` inverts the check.
        #[serde(default = "default_true")]
        matches: bool,
    },
    /// `local@domain.tld`
    Email,
    /// Absolute `http` or `https` URL.
    Url,
    /// IPv4 or IPv6 address.
    Ip,
    /// Hyphenated UUID.
    Uuid,
    /// `YYYY-MM-DD`
    Date,
    /// `YYYY-MM-DD HH:MM:SS`
    DateTime,
    /// `HH:MM:SS`
    Time,
    /// Numeric bounds.
    Range {
        /// Inclusive minimum.
        #[serde(default)]
        min: Option<f64>,
        /// Inclusive maximum.
        #[serde(default)]
        max: Option<f64>,
    },
    /// Loosely equal (`1` equals `1.0`).
    EqualTo {
        /// Reference value.
        value: FilterValue,
    },
    /// Not loosely equal.
    NotEqualTo {
        /// Reference value.
        value: FilterValue,
    },
    /// Same type and value.
    IdenticalTo {
        /// Reference value.
        value: FilterValue,
    },
    /// Different type or value.
    NotIdenticalTo {
        /// Reference value.
        value: FilterValue,
    },
    /// `<`
    LessThan {
        /// Reference value.
        value: FilterValue,
    },
    /// `<=`
    LessThanOrEqual {
        /// Reference value.
        value: FilterValue,
    },
    /// `>`
    GreaterThan {
        /// Reference value.
        value: FilterValue,
    },
    /// `>=`
    GreaterThanOrEqual {
        /// Reference value.
        value: FilterValue,
    },
    /// Exactly `true`.
    IsTrue,
    /// Exactly `false`.
    IsFalse,
    /// Exactly null.
    IsNull,
    /// Element count bounds for in-lists.
    Count {
        /// Inclusive minimum.
        #[serde(default)]
        min: Option<usize>,
        /// Inclusive maximum.
        #[serde(default)]
        max: Option<usize>,
    },
    /// Programmatic check; cannot come from a configuration file.
    #[serde(skip)]
    Callback(Callback),
}

fn default_true() -> bool {
    true
}

impl Constraint {
    /// Build a callback constraint.
    pub fn callback(
        name: impl Into<String>,
        check: impl Fn(&FilterValue) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self::Callback(Callback::new(name, check))
    }

    /// Snake-case name, as used in configuration files.
    pub fn name(&self) -> &str {
        match self {
            Self::NotBlank => "not_blank",
            Self::Blank => "blank",
            Self::Length { .. } => "length",
            Self::Regex { .. } => "regex",
            Self::Email => "email",
            Self::Url => "url",
            Self::Ip => "ip",
            Self::Uuid => "uuid",
            Self::Date => "date",
            Self::DateTime => "date_time",
            Self::Time => "time",
            Self::Range { .. } => "range",
            Self::EqualTo { .. } => "equal_to",
            Self::NotEqualTo { .. } => "not_equal_to",
            Self::IdenticalTo { .. } => "identical_to",
            Self::NotIdenticalTo { .. } => "not_identical_to",
            Self::LessThan { .. } => "less_than",
            Self::LessThanOrEqual { .. } => "less_than_or_equal",
            Self::GreaterThan { .. } => "greater_than",
            Self::GreaterThanOrEqual { .. } => "greater_than_or_equal",
            Self::IsTrue => "is_true",
            Self::IsFalse => "is_false",
            Self::IsNull => "is_null",
            Self::Count { .. } => "count",
            Self::Callback(callback) => callback.name(),
        }
    }

    fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::EqualTo { .. }
                | Self::NotEqualTo { .. }
                | Self::IdenticalTo { .. }
                | Self::NotIdenticalTo { .. }
                | Self::LessThan { .. }
                | Self::LessThanOrEqual { .. }
                | Self::GreaterThan { .. }
                | Self::GreaterThanOrEqual { .. }
        )
    }

    /// Whether this constraint may be declared on filters of `filter_type`.
    pub fn is_available_for(&self, filter_type: FilterType) -> bool {
        match filter_type {
            FilterType::Integer | FilterType::Float => {
                matches!(self, Self::Range { .. } | Self::Callback(_)) || self.is_comparison()
            }
            FilterType::String | FilterType::Like => {
                matches!(
                    self,
                    Self::NotBlank
                        | Self::Blank
                        | Self::Length { .. }
                        | Self::Regex { .. }
                        | Self::Email
                        | Self::Url
                        | Self::Ip
                        | Self::Uuid
                        | Self::Date
                        | Self::DateTime
                        | Self::Time
                        | Self::Callback(_)
                ) || self.is_comparison()
            }
            FilterType::Regexp => {
                matches!(self, Self::Length { .. } | Self::Regex { .. } | Self::Callback(_))
                    || self.is_comparison()
            }
            FilterType::Boolean => matches!(self, Self::IsTrue | Self::IsFalse | Self::Callback(_)),
            FilterType::Null => matches!(self, Self::IsNull),
            FilterType::In => matches!(self, Self::Count { .. }),
        }
    }

    /// Check the constraint's own parameters.
    pub fn check_definition(&self) -> Result<(), String> {
        match self {
            Self::Regex { pattern, .. } => Regex::new(pattern)
                .map(|_| ())
                .map_err(|e| format!("invalid pattern '{}': {}", pattern, e)),
            Self::Length { min: Some(min), max: Some(max) } | Self::Count { min: Some(min), max: Some(max) }
                if min > max =>
            {
                Err(format!("min ({}) is greater than max ({})", min, max))
            }
            Self::Range { min: Some(min), max: Some(max) } if min > max => {
                Err(format!("min ({}) is greater than max ({})", min, max))
            }
            _ => Ok(()),
        }
    }

    /// Check `value`, returning a violation message if it fails.
    pub fn check(&self, value: &FilterValue) -> Option<String> {
        match self {
            Self::NotBlank => is_blank(value).then(|| "This value should not be blank.".to_string()),
            Self::Blank => (!is_blank(value)).then(|| "This value should be blank.".to_string()),
            Self::IsTrue => {
                (*value != FilterValue::Bool(true)).then(|| "This value should be true.".to_string())
            }
            Self::IsFalse => {
                (*value != FilterValue::Bool(false)).then(|| "This value should be false.".to_string())
            }
            Self::IsNull => (!value.is_null()).then(|| "This value should be null.".to_string()),
            Self::Callback(callback) => (callback.check)(value),
            _ if value.is_null() => None,
            _ => self.check_present(value),
        }
    }

    fn check_present(&self, value: &FilterValue) -> Option<String> {
        match self {
            Self::Length { min, max } => {
                let length = value.as_str()?.chars().count();
                if let Some(min) = min.filter(|min| length < *min) {
                    return Some(format!(
                        "This value is too short. It should have {} character(s) or more.",
                        min
                    ));
                }
                max.filter(|max| length > *max).map(|max| {
                    format!("This value is too long. It should have {} character(s) or less.", max)
                })
            }
            Self::Regex { pattern, matches } => {
                let text = plain_string(value);
                let found = Regex::new(pattern).map(|re| re.is_match(&text)).unwrap_or(false);
                (found != *matches).then(|| "This value is not valid.".to_string())
            }
            Self::Email => string_check(value, |s| EMAIL.is_match(s), "This value is not a valid email address."),
            Self::Url => string_check(
                value,
                |s| url::Url::parse(s).is_ok_and(|u| matches!(u.scheme(), "http" | "https")),
                "This value is not a valid URL.",
            ),
            Self::Ip => string_check(value, |s| s.parse::<IpAddr>().is_ok(), "This is not a valid IP address."),
            Self::Uuid => string_check(value, is_valid_uuid, "This is not a valid UUID."),
            Self::Date => string_check(value, is_valid_date, "This value is not a valid date."),
            Self::Time => string_check(value, is_valid_time, "This value is not a valid time."),
            Self::DateTime => string_check(
                value,
                is_valid_date_time,
                "This value is not a valid datetime.",
            ),
            Self::Range { min, max } => {
                let Some(number) = value.as_f64() else {
                    return Some("This value should be a valid number.".to_string());
                };
                if let Some(min) = min.filter(|min| number < *min) {
                    return Some(format!("This value should be {} or more.", min));
                }
                max.filter(|max| number > *max)
                    .map(|max| format!("This value should be {} or less.", max))
            }
            Self::EqualTo { value: limit } => (!loosely_equal(value, limit))
                .then(|| format!("This value should be equal to {}.", limit)),
            Self::NotEqualTo { value: limit } => loosely_equal(value, limit)
                .then(|| format!("This value should not be equal to {}.", limit)),
            Self::IdenticalTo { value: limit } => (value != limit)
                .then(|| format!("This value should be identical to {}.", limit)),
            Self::NotIdenticalTo { value: limit } => (value == limit)
                .then(|| format!("This value should not be identical to {}.", limit)),
            Self::LessThan { value: limit } => ordering_check(value, limit, |o| o.is_lt(), "less than", limit),
            Self::LessThanOrEqual { value: limit } => {
                ordering_check(value, limit, |o| o.is_le(), "less than or equal to", limit)
            }
            Self::GreaterThan { value: limit } => {
                ordering_check(value, limit, |o| o.is_gt(), "greater than", limit)
            }
            Self::GreaterThanOrEqual { value: limit } => {
                ordering_check(value, limit, |o| o.is_ge(), "greater than or equal to", limit)
            }
            Self::Count { min, max } => {
                let FilterValue::List(items) = value else {
                    return Some("This value should be a collection.".to_string());
                };
                if let Some(min) = min.filter(|min| items.len() < *min) {
                    return Some(format!(
                        "This collection should contain {} element(s) or more.",
                        min
                    ));
                }
                max.filter(|max| items.len() > *max).map(|max| {
                    format!("This collection should contain {} element(s) or less.", max)
                })
            }
            Self::NotBlank | Self::Blank | Self::IsTrue | Self::IsFalse | Self::IsNull | Self::Callback(_) => None,
        }
    }
}

/// The value without quotes, as a pattern sees it.
fn plain_string(value: &FilterValue) -> String {
    match value {
        FilterValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_blank(value: &FilterValue) -> bool {
    match value {
        FilterValue::Null | FilterValue::Bool(false) => true,
        FilterValue::String(s) => s.trim().is_empty(),
        FilterValue::List(items) => items.is_empty(),
        _ => false,
    }
}

fn string_check(value: &FilterValue, valid: impl Fn(&str) -> bool, message: &str) -> Option<String> {
    match value.as_str() {
        Some(s) if valid(s) => None,
        _ => Some(message.to_string()),
    }
}

fn loosely_equal(a: &FilterValue, b: &FilterValue) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare(a: &FilterValue, b: &FilterValue) -> Option<Ordering> {
    match (a, b) {
        (FilterValue::String(x), FilterValue::String(y)) => Some(x.cmp(y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn ordering_check(
    value: &FilterValue,
    limit: &FilterValue,
    accept: impl Fn(Ordering) -> bool,
    relation: &str,
    shown: &FilterValue,
) -> Option<String> {
    match compare(value, limit) {
        Some(ordering) if accept(ordering) => None,
        _ => Some(format!("This value should be {} {}.", relation, shown)),
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// chrono accepts unpadded fields and leap seconds; the fixed lengths and the
// `:60` check keep the accepted shapes strict.
fn is_valid_date(s: &str) -> bool {
    s.len() == 10 && NaiveDate::parse_from_str(s, DATE_FORMAT).is_ok()
}

fn is_valid_time(s: &str) -> bool {
    s.len() == 8 && !s.ends_with(":60") && NaiveTime::parse_from_str(s, TIME_FORMAT).is_ok()
}

fn is_valid_date_time(s: &str) -> bool {
    s.len() == 19 && !s.ends_with(":60") && NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT).is_ok()
}

/// Hyphenated form only; `Uuid::parse_str` also takes simple, braced and URN forms.
fn is_valid_uuid(s: &str) -> bool {
    s.len() == 36 && Uuid::parse_str(s).is_ok()
}

/// The validation engine consulted for allowed filters with constraints.
pub trait Validator: fmt::Debug + Send + Sync {
    /// Every violation message produced by `constraints` for `value`.
    fn validate(&self, value: &FilterValue, constraints: &[Constraint]) -> Vec<String>;
}

/// Runs each constraint's own check.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValidator;

impl Validator for DefaultValidator {
    fn validate(&self, value: &FilterValue, constraints: &[Constraint]) -> Vec<String> {
        constraints.iter().filter_map(|c| c.check(value)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn violations(constraint: Constraint, value: impl Into<FilterValue>) -> Vec<String> {
        DefaultValidator.validate(&value.into(), &[constraint])
    }

    #[test]
    fn test_blank_family() {
        assert_eq!(violations(Constraint::NotBlank, "  "), vec!["This value should not be blank."]);
        assert!(violations(Constraint::NotBlank, "x").is_empty());
        assert!(violations(Constraint::Blank, "").is_empty());
        assert_eq!(violations(Constraint::Blank, "x").len(), 1);
    }

    #[test]
    fn test_length() {
        let length = Constraint::Length { min: Some(2), max: Some(4) };
        assert_eq!(
            violations(length.clone(), "a"),
            vec!["This value is too short. It should have 2 character(s) or more."]
        );
        assert!(violations(length.clone(), "äöü").is_empty());
        assert_eq!(violations(length, "abcde").len(), 1);
    }

    #[test]
    fn test_range_and_comparisons() {
        let range = Constraint::Range { min: Some(1.0), max: Some(10.0) };
        assert!(violations(range.clone(), 5).is_empty());
        assert_eq!(violations(range.clone(), 0), vec!["This value should be 1 or more."]);
        assert_eq!(violations(range, 10.5), vec!["This value should be 10 or less."]);

        let lt = Constraint::LessThan { value: 3.into() };
        assert!(violations(lt.clone(), 2).is_empty());
        assert_eq!(violations(lt, 3), vec!["This value should be less than 3."]);

        assert!(violations(Constraint::EqualTo { value: 1.into() }, 1.0).is_empty());
        assert_eq!(violations(Constraint::IdenticalTo { value: 1.into() }, 1.0).len(), 1);
        assert!(violations(Constraint::GreaterThanOrEqual { value: "b".into() }, "c").is_empty());
    }

    #[test]
    fn test_formats() {
        assert!(violations(Constraint::Email, "a@b.io").is_empty());
        assert_eq!(violations(Constraint::Email, "a@b").len(), 1);
        assert!(violations(Constraint::Url, "https://example.com/x").is_empty());
        assert_eq!(violations(Constraint::Url, "ftp://example.com").len(), 1);
        assert!(violations(Constraint::Ip, "::1").is_empty());
        assert!(violations(Constraint::Uuid, "123e4567-e89b-12d3-a456-426614174000").is_empty());
        assert!(violations(Constraint::Date, "2016-02-29").is_empty());
        assert_eq!(violations(Constraint::Date, "2015-02-29").len(), 1);
        assert!(violations(Constraint::Time, "23:59:59").is_empty());
        assert_eq!(violations(Constraint::Time, "24:00:00").len(), 1);
        assert!(violations(Constraint::DateTime, "2016-01-01 12:00:00").is_empty());
    }

    #[test]
    fn test_calendar_formats_are_strict() {
        assert!(violations(Constraint::Date, "2000-02-29").is_empty());
        assert_eq!(violations(Constraint::Date, "1900-02-29").len(), 1);
        assert_eq!(violations(Constraint::Date, "2016-2-29").len(), 1);
        assert_eq!(violations(Constraint::Date, "2016-04-31").len(), 1);
        assert_eq!(violations(Constraint::Time, "12:60:00").len(), 1);
        assert_eq!(violations(Constraint::Time, "23:59:60").len(), 1);
        assert_eq!(violations(Constraint::Time, "9:00:00").len(), 1);
        assert_eq!(violations(Constraint::DateTime, "2016-01-01T12:00:00").len(), 1);
        assert_eq!(violations(Constraint::DateTime, "2015-02-29 12:00:00").len(), 1);
        assert_eq!(violations(Constraint::DateTime, "2016-01-01 12:00").len(), 1);
    }

    #[test]
    fn test_uuid_forms() {
        assert!(violations(Constraint::Uuid, "123E4567-E89B-12D3-A456-426614174000").is_empty());
        assert_eq!(violations(Constraint::Uuid, "123e4567e89b12d3a456426614174000").len(), 1);
        assert_eq!(violations(Constraint::Uuid, "{123e4567-e89b-12d3-a456-426614174000}").len(), 1);
        assert_eq!(violations(Constraint::Uuid, "123e4567-e89b-12d3-a456-42661417400g").len(), 1);
    }

    #[test]
    fn test_regex() {
        let digits = Constraint::Regex { pattern: r"^\d+$".into(), matches: true };
        assert!(violations(digits.clone(), "123").is_empty());
        assert_eq!(violations(digits, "12a"), vec!["This value is not valid."]);
        let no_space = Constraint::Regex { pattern: r"\s".into(), matches: false };
        assert_eq!(violations(no_space, "a b").len(), 1);
    }

    #[test]
    fn test_null_passes_value_constraints() {
        assert!(violations(Constraint::Email, FilterValue::Null).is_empty());
        assert!(violations(Constraint::Range { min: Some(1.0), max: None }, FilterValue::Null).is_empty());
        assert!(violations(Constraint::IsNull, FilterValue::Null).is_empty());
        assert_eq!(violations(Constraint::IsNull, 1).len(), 1);
    }

    #[test]
    fn test_count() {
        let count = Constraint::Count { min: None, max: Some(2) };
        assert!(violations(count.clone(), vec![1, 2]).is_empty());
        assert_eq!(
            violations(count, vec![1, 2, 3]),
            vec!["This collection should contain 2 element(s) or less."]
        );
    }

    #[test]
    fn test_callback() {
        let even = Constraint::callback("even", |v| match v {
            FilterValue::Int(i) if i % 2 == 0 => None,
            _ => Some("This value should be even.".to_string()),
        });
        assert_eq!(even.name(), "even");
        assert!(violations(even.clone(), 4).is_empty());
        assert_eq!(violations(even, 3), vec!["This value should be even."]);
    }

    #[test]
    fn test_availability() {
        assert!(Constraint::Range { min: None, max: None }.is_available_for(FilterType::Integer));
        assert!(!Constraint::Range { min: None, max: None }.is_available_for(FilterType::String));
        assert!(Constraint::Email.is_available_for(FilterType::Like));
        assert!(!Constraint::Email.is_available_for(FilterType::Regexp));
        assert!(Constraint::IsNull.is_available_for(FilterType::Null));
        assert!(!Constraint::callback("x", |_| None).is_available_for(FilterType::Null));
        assert!(Constraint::Count { min: None, max: None }.is_available_for(FilterType::In));
        assert!(!Constraint::NotBlank.is_available_for(FilterType::In));
    }

    #[test]
    fn test_definition_checks() {
        assert!(Constraint::Regex { pattern: "(".into(), matches: true }.check_definition().is_err());
        assert!(Constraint::Length { min: Some(3), max: Some(1) }.check_definition().is_err());
        assert!(Constraint::Range { min: Some(1.0), max: None }.check_definition().is_ok());
    }

    #[test]
    fn test_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Holder {
            constraints: Vec<Constraint>,
        }
        let holder: Holder = toml::from_str(
            r#"constraints = [
                { type = "range", min = 1 },
                { type = "regex", pattern = "^a" },
                { type = "less_than", value = 5 },
            ]"#,
        )
        .unwrap();
        let names: Vec<&str> = holder.constraints.iter().map(Constraint::name).collect();
        assert_eq!(names, vec!["range", "regex", "less_than"]);
        assert!(matches!(holder.constraints[1], Constraint::Regex { matches: true, .. }));
    }
}
