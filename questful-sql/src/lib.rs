//! # questful-sql
//!
//! Parameterized `WHERE` and `ORDER BY` emission for queries parsed and
//! validated by `questful-query`.
//!
//! Three backends are supported:
//! - [`MySql`]: MySQL 5.5+, `BINARY` for case-sensitive strings, infix `XOR`
//! - [`Sqlite`]: SQLite 3, `REGEXP` and `XOR(a, b)` as user-defined functions
//! - [`Doctrine`]: Doctrine 2 DQL, `BINARY(...)` and `REGEXP(...)` custom
//!   functions, `XOR` expanded into `AND`/`OR`/`NOT`
//!
//! Values are never inlined; every filter value is bound as a named parameter
//! (`:filter_<index>`, `:filter_<index>_<position>` for in-list elements).
//! Column names come from the mapping's relations and are checked against the
//! column pattern when the mapping is built.
//!
//! ```rust
//! use questful_query::{AllowedFilter, FilterValue, Mapping, ParsedQuery, QueryInput};
//! use questful_sql::SqlGenerator;
//!
//! let mapping = Mapping::builder()
//!     .relate("name", "u.name")
//!     .allow_filter(AllowedFilter::in_list("name"))
//!     .build()
//!     .unwrap();
//!
//! let input = QueryInput::from_query_string(r#"filter[]=name=["fOO","bAr"]/i"#);
//! let query = ParsedQuery::parse(&input).unwrap();
//! let generated = SqlGenerator::sqlite().generate(&mapping, &query).unwrap();
//!
//! assert_eq!(
//!     generated.where_clause(),
//!     Some("(LOWER(u.name) IN (:filter_0_0, :filter_0_1))")
//! );
//! assert_eq!(generated.parameters()["filter_0_1"], FilterValue::from("bar"));
//! ```

mod condition;
pub mod dialect;
pub mod generator;
pub mod types;

pub use dialect::{Dialect, Doctrine, MySql, Sqlite, XorStyle};
pub use generator::SqlGenerator;
pub use types::{GeneratedQuery, OrderByField};
