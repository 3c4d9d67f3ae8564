//! # Questful
//!
//! Safe, allow-listed filtering and sorting from HTTP query strings to
//! parameterized SQL.
//!
//! Questful provides:
//! - Typed filters from `filter[]=<key><operator><value>`
//! - Boolean filter expressions from `filterExpression=(0or1)and2`
//! - Sorting from `sort[]=-createdAt`
//! - A server-side allow-list with value constraints
//! - Parameterized `WHERE` / `ORDER BY` emission for MySQL, SQLite and Doctrine DQL
//!
//! ## Quick Start
//!
//! ```rust
//! use questful::prelude::*;
//!
//! let mapping = Mapping::builder()
//!     .relate("id", "u.id")
//!     .relate("timeCreated", "u.timeCreated")
//!     .allow_filter(AllowedFilter::integer("id"))
//!     .allow_filter(AllowedFilter::string("timeCreated"))
//!     .allow_filter_expression("0or1")
//!     .build()?;
//!
//! let input = QueryInput::from_query_string(
//!     r#"filter[]=id=1&filter[]=timeCreated="2016-01-01"&filterExpression=0or1"#,
//! );
//! let query = ParsedQuery::parse(&input)?;
//! let generated = SqlGenerator::sqlite().generate(&mapping, &query)?;
//!
//! assert_eq!(
//!     generated.where_clause(),
//!     Some("(u.id = :filter_0 OR u.timeCreated = :filter_1)")
//! );
//! # Ok::<(), questful::QueryError>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Query-string parsing, allow-list validation and mapping configuration.
pub mod query {
    pub use questful_query::*;
}

/// MySQL, SQLite and Doctrine DQL emission.
pub mod sql {
    pub use questful_sql::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::query::prelude::*;
    pub use crate::query::MappingConfig;
    pub use crate::sql::{GeneratedQuery, SqlGenerator};
}

// Re-export key types at the crate root
pub use query::{Mapping, ParsedQuery, QueryError, QueryInput};
pub use sql::{GeneratedQuery, SqlGenerator};
