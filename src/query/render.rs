//! Query Renderer
//!
//! Turns keyword groups and a date filter into PubMed query syntax:
//!
//! ```text
//! "cancer" OR "tumor" AND ("2020-01-01"[Date - Publication] : "2021-12-31"[Date - Publication])
//! ```

use super::{DateFilter, KeywordGroup};

/// Placeholder shown when there are no search criteria at all
pub const NO_CRITERIA: &str = "No search criteria.";

/// Keyword tokens per display line
pub const DEFAULT_WRAP: usize = 5;

const DATE_FIELD: &str = "[Date - Publication]";
const OPEN_START_YEAR: &str = "1800";
const OPEN_END_YEAR: &str = "3000";

/// How calendar dates are written inside the date clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateStyle {
    /// `2020-01-01`, used for display and the stored query text
    #[default]
    Iso,
    /// `2020/01/01`, the form submitted to E-utilities as `term`
    Slash,
}

impl DateStyle {
    fn format(&self, date: &str) -> String {
        match self {
            DateStyle::Iso => date.to_string(),
            DateStyle::Slash => date.replace('-', "/"),
        }
    }
}

/// Render groups and date filter for display, or [`NO_CRITERIA`] when empty
pub fn render(groups: &[KeywordGroup], date_filter: &DateFilter) -> String {
    let text = render_with(groups, date_filter, DateStyle::Iso);
    if text.is_empty() {
        NO_CRITERIA.to_string()
    } else {
        text
    }
}

/// Render without the placeholder; an empty input yields an empty string
pub fn render_with(groups: &[KeywordGroup], date_filter: &DateFilter, style: DateStyle) -> String {
    let keywords = keyword_tokens(groups).join(" ");
    join_date_clause(keywords, date_clause(date_filter, style))
}

/// Like [`render`], with a line break after every `wrap` keyword tokens.
///
/// `wrap == 0` disables wrapping.
pub fn render_display(groups: &[KeywordGroup], date_filter: &DateFilter, wrap: usize) -> String {
    let tokens = keyword_tokens(groups);
    let mut keywords = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            if wrap > 0 && i % wrap == 0 {
                keywords.push('\n');
            } else {
                keywords.push(' ');
            }
        }
        keywords.push_str(token);
    }

    let text = join_date_clause(keywords, date_clause(date_filter, DateStyle::Iso));
    if text.is_empty() {
        NO_CRITERIA.to_string()
    } else {
        text
    }
}

/// True for blank text and for the [`NO_CRITERIA`] placeholder
pub fn is_no_criteria(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text == NO_CRITERIA
}

/// Date clause for an enabled filter with at least one bound
pub fn date_clause(date_filter: &DateFilter, style: DateStyle) -> Option<String> {
    match (date_filter.start(), date_filter.end()) {
        (Some(start), Some(end)) => Some(format!(
            "(\"{}\"{DATE_FIELD} : \"{}\"{DATE_FIELD})",
            style.format(start),
            style.format(end)
        )),
        (Some(start), None) => Some(format!(
            "\"{}\"{DATE_FIELD} : {OPEN_END_YEAR}{DATE_FIELD}",
            style.format(start)
        )),
        (None, Some(end)) => Some(format!(
            "{OPEN_START_YEAR}{DATE_FIELD} : \"{}\"{DATE_FIELD}",
            style.format(end)
        )),
        (None, None) => None,
    }
}

/// Quoted terms interleaved with connectors; blank groups contribute nothing
fn keyword_tokens(groups: &[KeywordGroup]) -> Vec<String> {
    let mut tokens = Vec::new();
    for group in groups {
        let Some(term) = group.first_term() else {
            continue;
        };
        if !tokens.is_empty() {
            tokens.push(group.operator.to_string());
        }
        tokens.push(format!("\"{}\"", term));
    }
    tokens
}

fn join_date_clause(keywords: String, clause: Option<String>) -> String {
    match clause {
        Some(clause) if keywords.is_empty() => clause,
        Some(clause) => format!("{} AND {}", keywords, clause),
        None => keywords,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Connector;

    fn groups(terms: &[(Connector, &str)]) -> Vec<KeywordGroup> {
        terms
            .iter()
            .enumerate()
            .map(|(i, (op, term))| KeywordGroup::new(i, *op, *term))
            .collect()
    }

    #[test]
    fn test_empty_input_renders_placeholder() {
        assert_eq!(render(&[], &DateFilter::disabled()), NO_CRITERIA);
        assert!(is_no_criteria(&render(&[], &DateFilter::disabled())));
        assert!(is_no_criteria("   "));
        assert_eq!(render_with(&[], &DateFilter::disabled(), DateStyle::Iso), "");
    }

    #[test]
    fn test_connector_placement() {
        let input = groups(&[(Connector::And, "cancer"), (Connector::Or, "tumor")]);
        assert_eq!(render(&input, &DateFilter::disabled()), "\"cancer\" OR \"tumor\"");
    }

    #[test]
    fn test_blank_groups_are_skipped() {
        let input = groups(&[
            (Connector::Or, "cancer"),
            (Connector::Or, "  "),
            (Connector::And, "therapy"),
        ]);
        assert_eq!(render(&input, &DateFilter::disabled()), "\"cancer\" AND \"therapy\"");
    }

    #[test]
    fn test_date_only_start() {
        let filter = DateFilter::range(Some("2020-01-01"), Some(""));
        assert_eq!(
            render(&[], &filter),
            "\"2020-01-01\"[Date - Publication] : 3000[Date - Publication]"
        );
    }

    #[test]
    fn test_date_only_end_and_range() {
        let end_only = DateFilter::range(None, Some("2019-06-30"));
        assert_eq!(
            render(&[], &end_only),
            "1800[Date - Publication] : \"2019-06-30\"[Date - Publication]"
        );

        let input = groups(&[(Connector::And, "crispr")]);
        let both = DateFilter::range(Some("2020-01-01"), Some("2021-12-31"));
        assert_eq!(
            render(&input, &both),
            "\"crispr\" AND (\"2020-01-01\"[Date - Publication] : \"2021-12-31\"[Date - Publication])"
        );
    }

    #[test]
    fn test_disabled_filter_is_ignored() {
        let filter = DateFilter {
            enabled: false,
            start_date: Some("2020-01-01".to_string()),
            end_date: Some("2021-01-01".to_string()),
        };
        let input = groups(&[(Connector::And, "asthma")]);
        assert_eq!(render(&input, &filter), "\"asthma\"");
    }

    #[test]
    fn test_slash_style_for_search_term() {
        let filter = DateFilter::range(Some("2020-01-01"), None);
        let input = groups(&[(Connector::And, "covid")]);
        assert_eq!(
            render_with(&input, &filter, DateStyle::Slash),
            "\"covid\" AND \"2020/01/01\"[Date - Publication] : 3000[Date - Publication]"
        );
    }

    #[test]
    fn test_display_wraps_after_every_fifth_token() {
        let input = groups(&[
            (Connector::And, "a"),
            (Connector::And, "b"),
            (Connector::Or, "c"),
            (Connector::And, "d"),
        ]);
        let display = render_display(&input, &DateFilter::disabled(), DEFAULT_WRAP);
        assert_eq!(display, "\"a\" AND \"b\" OR \"c\"\nAND \"d\"");

        let flat: Vec<&str> = display.split_whitespace().collect();
        let plain = render(&input, &DateFilter::disabled());
        assert_eq!(flat, plain.split_whitespace().collect::<Vec<_>>());
    }
}
