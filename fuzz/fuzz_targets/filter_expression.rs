//! Fuzz target for the filter expression parser.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_filter_expression
//! ```

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use questful_query::FilterExpression;

/// Either raw text or a token stream that is more likely to be well formed.
#[derive(Debug, Arbitrary)]
enum FuzzExpression {
    Raw(String),
    Tokens(Vec<FuzzToken>),
}

#[derive(Debug, Arbitrary)]
enum FuzzToken {
    Index(u8),
    And,
    Or,
    Xor,
    Open,
    Close,
}

impl FuzzExpression {
    fn render(&self) -> String {
        match self {
            FuzzExpression::Raw(raw) => raw.clone(),
            FuzzExpression::Tokens(tokens) => tokens
                .iter()
                .map(|token| match token {
                    FuzzToken::Index(i) => i.to_string(),
                    FuzzToken::And => "and".to_string(),
                    FuzzToken::Or => "or".to_string(),
                    FuzzToken::Xor => "xor".to_string(),
                    FuzzToken::Open => "(".to_string(),
                    FuzzToken::Close => ")".to_string(),
                })
                .collect(),
        }
    }
}

fuzz_target!(|input: FuzzExpression| {
    let rendered = input.render();

    if let Ok(expression) = FilterExpression::parse(&rendered) {
        // Normalization is a fixed point.
        let again = FilterExpression::parse(expression.normalized())
            .expect("normalized expression must parse");
        assert_eq!(again.normalized(), expression.normalized());
        assert_eq!(again.indexes(), expression.indexes());
    }
});
