//! Fuzz target for the whole query pipeline.
//!
//! Decodes an arbitrary query string, validates it against a permissive
//! mapping and renders it for every dialect.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_query_pipeline
//! ```

#![no_main]

use std::sync::LazyLock;

use libfuzzer_sys::fuzz_target;
use questful_query::{AllowedFilter, FilterType, Mapping, ParsedQuery, QueryInput};
use questful_sql::SqlGenerator;

static MAPPING: LazyLock<Mapping> = LazyLock::new(|| {
    let mut builder = Mapping::builder();
    for key in ["a", "b", "c"] {
        builder = builder.relate(key, format!("t.{}", key)).allow_sort(key);
        for filter_type in FilterType::ALL {
            builder = builder.allow_filter(AllowedFilter::new(key, filter_type));
        }
    }
    builder.allow_filter_expression("*").build().expect("valid mapping")
});

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let Ok(query) = ParsedQuery::parse(&QueryInput::from_query_string(input)) else {
            return;
        };

        let mysql = SqlGenerator::mysql().generate(&MAPPING, &query);
        let sqlite = SqlGenerator::sqlite().generate(&MAPPING, &query);
        let doctrine = SqlGenerator::doctrine().generate(&MAPPING, &query);

        // Dialects agree on acceptance and on bound parameter names.
        if let (Ok(mysql), Ok(sqlite), Ok(doctrine)) = (&mysql, &sqlite, &doctrine) {
            assert!(mysql.parameters().keys().eq(sqlite.parameters().keys()));
            assert!(mysql.parameters().keys().eq(doctrine.parameters().keys()));
        } else {
            assert_eq!(mysql.is_ok(), sqlite.is_ok());
            assert_eq!(mysql.is_ok(), doctrine.is_ok());
        }
    }
});
