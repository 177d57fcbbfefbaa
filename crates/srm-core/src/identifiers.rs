//! Identifier checks for names spliced into generated SQL.

use std::sync::OnceLock;

use regex::Regex;

const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";
const COLUMN_PATH_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$";

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "identifier pattern failed to compile");
            None
        }
    })
    .as_ref()
}

/// Whether `name` is a bare SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`).
pub fn is_valid_identifier(name: &str) -> bool {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&CELL, IDENTIFIER_PATTERN).is_some_and(|re| re.is_match(name))
}

/// Whether `path` is an identifier optionally qualified by one alias, e.g. `o_master1.id`.
pub fn is_valid_column_path(path: &str) -> bool {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&CELL, COLUMN_PATH_PATTERN).is_some_and(|re| re.is_match(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers() {
        assert!(is_valid_identifier("master1"));
        assert!(is_valid_identifier("_x9"));
        assert!(!is_valid_identifier("9x"));
        assert!(!is_valid_identifier("a;drop"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn test_column_paths() {
        assert!(is_valid_column_path("o_master1.id"));
        assert!(is_valid_column_path("name"));
        assert!(!is_valid_column_path("o.a.b"));
        assert!(!is_valid_column_path("o.id = 1"));
    }
}
