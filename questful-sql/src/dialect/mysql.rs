use super::{Dialect, XorStyle, not};

/// MySQL 5.5 and later, through PDO-style named parameters.
///
/// Case-sensitive strings are compared with `BINARY`. Without it, MySQL
/// compares by the column collation, which is usually case-insensitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn string_placeholder(&self, name: &str) -> String {
        format!("BINARY :{}", name)
    }

    fn like_escape(&self) -> &'static str {
        r"'\\'"
    }

    fn regexp(&self, column: &str, negated: bool, name: &str, case_insensitive: bool) -> String {
        if case_insensitive {
            format!("{} {}REGEXP :{}", column, not(negated), name)
        } else {
            format!("{} {}REGEXP BINARY :{}", column, not(negated), name)
        }
    }

    fn regexp_value(&self, pattern: &str, _case_insensitive: bool) -> String {
        pattern.to_string()
    }

    fn xor_style(&self) -> XorStyle {
        XorStyle::Infix
    }
}
