//! Summary Parser
//!
//! Reads rendered (or hand-edited) query text back into keyword groups and a
//! date filter, so pasted or edited queries can repopulate the editor.

use super::{Connector, DateFilter, KeywordGroup};
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Structured criteria recovered from query text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedSummary {
    pub groups: Vec<KeywordGroup>,
    pub date_filter: DateFilter,
}

fn date_clause_re() -> &'static Regex {
    static DATE_RE: OnceLock<Regex> = OnceLock::new();
    DATE_RE.get_or_init(|| {
        let date = r#""(\d{4}[-/]\d{2}[-/]\d{2})""#;
        let field = r"\[Date - Publication\]";
        let pattern = format!(
            r"\(\s*{date}{field}\s*:\s*{date}{field}\s*\)|{date}{field}\s*:\s*3000{field}|1800{field}\s*:\s*{date}{field}"
        );
        Regex::new(&pattern).expect("valid regex")
    })
}

fn iso_date_re() -> &'static Regex {
    static ISO_RE: OnceLock<Regex> = OnceLock::new();
    ISO_RE.get_or_init(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("valid regex"))
}

fn token_re() -> &'static Regex {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    TOKEN_RE.get_or_init(|| Regex::new(r#""([^"]*)"|(\S+)"#).expect("valid regex"))
}

/// Parse query text into groups and a date filter.
///
/// A quoted token becomes a keyword group, a bare `AND`/`OR` sets the
/// connector of the group that follows, and any other bare word is taken as
/// an unquoted term. Operators with no group after them are dropped.
pub fn parse_summary(text: &str) -> ParsedSummary {
    let folded = text.replace(['\r', '\n'], " ");

    let mut date_filter = DateFilter::disabled();
    for caps in date_clause_re().captures_iter(&folded) {
        date_filter.enabled = true;
        if let (Some(start), Some(end)) = (caps.get(1), caps.get(2)) {
            date_filter.start_date = Some(normalize_date(start.as_str()));
            date_filter.end_date = Some(normalize_date(end.as_str()));
        } else if let Some(start) = caps.get(3) {
            date_filter.start_date = Some(normalize_date(start.as_str()));
        } else if let Some(end) = caps.get(4) {
            date_filter.end_date = Some(normalize_date(end.as_str()));
        }
    }
    let keyword_text = date_clause_re().replace_all(&folded, " ");

    let mut groups = Vec::new();
    let mut pending = Connector::default();
    for caps in token_re().captures_iter(&keyword_text) {
        let term = if let Some(quoted) = caps.get(1) {
            quoted.as_str().trim()
        } else {
            let bare = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            if let Some(connector) = Connector::from_token(bare) {
                pending = connector;
                continue;
            }
            bare.trim_matches(|c: char| c == '(' || c == ')')
        };

        if term.is_empty() {
            continue;
        }
        groups.push(KeywordGroup::new(groups.len(), pending, term));
        pending = Connector::default();
    }

    ParsedSummary { groups, date_filter }
}

/// Turn query text as typed into a search term.
///
/// Line breaks become spaces and dates inside publication-date clauses switch
/// to slash form. Everything else, parentheses and field tags included, is
/// passed through untouched.
pub fn search_form(text: &str) -> String {
    let folded = text.replace(['\r', '\n'], " ");
    date_clause_re()
        .replace_all(&folded, |caps: &Captures| {
            iso_date_re()
                .replace_all(&caps[0], |date: &Captures| date[0].replace('-', "/"))
                .into_owned()
        })
        .trim()
        .to_string()
}

fn normalize_date(date: &str) -> String {
    date.replace('/', "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{render, render_display, render_with, DateStyle};

    #[test]
    fn test_parses_terms_and_connectors() {
        let parsed = parse_summary("\"cancer\" OR \"tumor\" AND \"p53\"");
        assert_eq!(parsed.groups.len(), 3);
        assert_eq!(parsed.groups[0].keywords, vec!["cancer".to_string()]);
        assert_eq!(parsed.groups[1].operator, Connector::Or);
        assert_eq!(parsed.groups[2].operator, Connector::And);
        assert!(!parsed.date_filter.enabled);
    }

    #[test]
    fn test_keeps_multi_word_terms() {
        let parsed = parse_summary("\"breast cancer\" or \"gene therapy\"");
        assert_eq!(parsed.groups[0].first_term(), Some("breast cancer"));
        assert_eq!(parsed.groups[1].first_term(), Some("gene therapy"));
        assert_eq!(parsed.groups[1].operator, Connector::Or);
    }

    #[test]
    fn test_extracts_date_range() {
        let parsed = parse_summary(
            "\"crispr\" AND (\"2020-01-01\"[Date - Publication] : \"2021-12-31\"[Date - Publication])",
        );
        assert_eq!(parsed.groups.len(), 1);
        assert_eq!(parsed.date_filter, DateFilter::range(Some("2020-01-01"), Some("2021-12-31")));
    }

    #[test]
    fn test_extracts_open_ended_dates() {
        let start = parse_summary("\"2020/01/01\"[Date - Publication] : 3000[Date - Publication]");
        assert!(start.groups.is_empty());
        assert_eq!(start.date_filter.start(), Some("2020-01-01"));
        assert_eq!(start.date_filter.end(), None);

        let end = parse_summary("\"x\" AND 1800[Date - Publication] : \"2019-06-30\"[Date - Publication]");
        assert_eq!(end.groups.len(), 1);
        assert_eq!(end.date_filter.end(), Some("2019-06-30"));
    }

    #[test]
    fn test_recovers_rendered_criteria() {
        let groups = vec![
            KeywordGroup::new(0, Connector::And, "a"),
            KeywordGroup::new(1, Connector::Or, "b"),
            KeywordGroup::new(2, Connector::And, "c"),
            KeywordGroup::new(3, Connector::Or, "d"),
        ];
        let filter = DateFilter::range(Some("2018-03-01"), None);

        for text in [
            render(&groups, &filter),
            render_display(&groups, &filter, 5),
            render_with(&groups, &filter, DateStyle::Slash),
        ] {
            let parsed = parse_summary(&text);
            assert_eq!(parsed.groups, groups);
            assert_eq!(parsed.date_filter, filter);
        }
    }

    #[test]
    fn test_search_form_only_touches_date_clauses() {
        assert_eq!(
            search_form("(\"a\" OR \"b\")\nAND \"sars-cov-2\"[MeSH]"),
            "(\"a\" OR \"b\") AND \"sars-cov-2\"[MeSH]"
        );
        assert_eq!(
            search_form("\"x\" AND (\"2020-01-01\"[Date - Publication] : \"2021-12-31\"[Date - Publication])"),
            "\"x\" AND (\"2020/01/01\"[Date - Publication] : \"2021/12/31\"[Date - Publication])"
        );
    }

    #[test]
    fn test_trailing_operator_is_dropped() {
        let parsed = parse_summary("\"a\" AND");
        assert_eq!(parsed.groups.len(), 1);
    }
}
