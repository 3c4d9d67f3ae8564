use super::{Dialect, XorStyle, not};

/// SQLite 3.
///
/// SQLite ships neither `REGEXP` nor `XOR`. The host registers both as
/// user-defined functions: `regexp(pattern, value)` and `xor(a, b)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn regexp(&self, column: &str, negated: bool, name: &str, _case_insensitive: bool) -> String {
        format!("{} {}REGEXP :{}", column, not(negated), name)
    }

    fn xor_style(&self) -> XorStyle {
        XorStyle::Function
    }
}
