/// Utility functions for SQL identifier handling
use crate::result::{DbError, Result};
use regex::Regex;

// Regexes compiled once as lazy statics
static COLUMN_NAME_REGEX: once_cell::sync::Lazy<Regex> =
    once_cell::sync::Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());
static TABLE_NAME_REGEX: once_cell::sync::Lazy<Regex> = once_cell::sync::Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").unwrap()
});

/// Check a column name against the allow-list `[A-Za-z_][A-Za-z0-9_]*`
pub fn validate_column_name(name: &str) -> Result<()> {
    if COLUMN_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(DbError::new_invalid_identifier(name))
    }
}

/// Check a table name against the allow-list, optionally schema-qualified (`schema.table`)
pub fn validate_table_name(name: &str) -> Result<()> {
    if TABLE_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(DbError::new_invalid_identifier(name))
    }
}

/// Wrap an already validated identifier in the given quote character
pub fn quote_identifier(name: &str, quote: char) -> String {
    format!("{quote}{name}{quote}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names() {
        assert!(validate_column_name("name").is_ok());
        assert!(validate_column_name("_created_at2").is_ok());
        assert!(validate_column_name("").is_err());
        assert!(validate_column_name("2fast").is_err());
        assert!(validate_column_name("a.b").is_err());
        assert!(validate_column_name("name`; DROP TABLE users; --").is_err());
    }

    #[test]
    fn test_table_names() {
        assert!(validate_table_name("users").is_ok());
        assert!(validate_table_name("main.users").is_ok());
        assert!(validate_table_name("a.b.c").is_err());
        assert!(validate_table_name("users ").is_err());
        assert!(validate_table_name("users; DELETE FROM users").is_err());
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("age", '`'), "`age`");
        assert_eq!(quote_identifier("age", '"'), "\"age\"");
    }
}
