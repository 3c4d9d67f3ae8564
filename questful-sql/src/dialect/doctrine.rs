use questful_query::FilterValue;

use super::{Dialect, XorStyle};

/// Doctrine 2 DQL.
///
/// `BINARY` and `REGEXP` are not part of core DQL; the host registers them
/// as custom string functions.
#[derive(Debug, Clone, Copy, Default)]
pub struct Doctrine;

impl Dialect for Doctrine {
    fn name(&self) -> &'static str {
        "doctrine"
    }

    fn string_placeholder(&self, name: &str) -> String {
        format!("BINARY(:{})", name)
    }

    fn regexp(&self, column: &str, negated: bool, name: &str, _case_insensitive: bool) -> String {
        format!("REGEXP({}, :{}) = {}", column, name, if negated { 0 } else { 1 })
    }

    fn boolean_element(&self, value: bool) -> FilterValue {
        FilterValue::Bool(value)
    }

    fn xor_style(&self) -> XorStyle {
        XorStyle::Expanded
    }
}
