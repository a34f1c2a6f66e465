// Boolean expression checks run before a query is submitted

use super::render::is_no_criteria;
use crate::types::{AppError, AppResult};
use regex::Regex;
use std::sync::OnceLock;

fn trailing_operator_re() -> &'static Regex {
    static TRAILING_RE: OnceLock<Regex> = OnceLock::new();
    TRAILING_RE.get_or_init(|| Regex::new(r"(?i)\b(AND|OR)\b\s*$").expect("valid regex"))
}

fn doubled_operator_re() -> &'static Regex {
    static DOUBLED_RE: OnceLock<Regex> = OnceLock::new();
    DOUBLED_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(AND|OR)\b\s+\b(AND|OR)\b").expect("valid regex")
    })
}

/// Reject query text that ends in, or repeats, a boolean operator.
///
/// Blank text and the "no criteria" placeholder are rejected as well since
/// there is nothing to search for.
pub fn validate_query(text: &str) -> AppResult<()> {
    if is_no_criteria(text) {
        return Err(AppError::Validation("No search criteria entered".to_string()));
    }

    if trailing_operator_re().is_match(text) {
        return Err(AppError::Validation(
            "Query ends with a dangling AND/OR operator".to_string(),
        ));
    }

    if doubled_operator_re().is_match(text) {
        return Err(AppError::Validation(
            "Query contains two adjacent AND/OR operators".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::NO_CRITERIA;

    #[test]
    fn test_accepts_well_formed_queries() {
        assert!(validate_query("\"cancer\" OR \"tumor\"").is_ok());
        assert!(validate_query(
            "\"a\" AND \"2020-01-01\"[Date - Publication] : 3000[Date - Publication]"
        )
        .is_ok());
    }

    #[test]
    fn test_rejects_trailing_operator() {
        let err = validate_query("\"cancer\" AND ").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(validate_query("\"cancer\" or").is_err());
    }

    #[test]
    fn test_rejects_doubled_operators() {
        assert!(validate_query("\"cancer\" AND OR \"tumor\"").is_err());
        assert!(validate_query("\"cancer\" and\nand \"tumor\"").is_err());
    }

    #[test]
    fn test_rejects_placeholder() {
        assert!(validate_query(NO_CRITERIA).is_err());
        assert!(validate_query("").is_err());
    }
}
