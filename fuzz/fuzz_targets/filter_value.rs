//! Fuzz target for the filter value lexer.
//!
//! Feeds arbitrary strings to `parse_filter` to find panics in operator
//! scanning and value classification.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_filter_value
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use questful_query::filter::{FilterKind, classify_value, parse_filter};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let _ = classify_value(input);

        if let Ok(filter) = parse_filter(0, input) {
            // A parsed filter always has a non-empty key and a legal operator.
            assert!(!filter.key().is_empty());
            assert!(filter.filter_type().accepts(filter.operator()));

            if let FilterKind::In(values) = filter.kind() {
                assert!(!values.is_empty());
            }
        }
    }
});
