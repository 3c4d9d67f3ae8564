//! Fuzz target for the mapping configuration parser.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_mapping_config
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use questful_query::MappingConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // The parser and builder should never panic, only return errors
        if let Ok(config) = input.parse::<MappingConfig>() {
            let _ = config.build();
        }
    }
});
