//! Query Model
//!
//! In-memory representation of a PubMed boolean search:
//! - Ordered keyword groups, each joined to the previous one by a connector
//! - An optional publication date range
//! - The rendered query text that is shown to the user and persisted
//!
//! Field names on the serde types follow the camelCase layout of the saved-query
//! blob so that previously exported stores keep loading.

pub mod parse;
pub mod render;
pub mod validate;

pub use parse::{parse_summary, search_form, ParsedSummary};
pub use render::{is_no_criteria, render, render_display, render_with, DateStyle, NO_CRITERIA};
pub use validate::validate_query;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Boolean operator joining a keyword group to the one before it
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Connector {
    #[default]
    #[serde(rename = "AND", alias = "and", alias = "And")]
    And,
    #[serde(rename = "OR", alias = "or", alias = "Or")]
    Or,
}

impl std::fmt::Display for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connector::And => write!(f, "AND"),
            Connector::Or => write!(f, "OR"),
        }
    }
}

impl Connector {
    /// Parse a bare operator token, case-insensitively
    pub fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("AND") {
            Some(Connector::And)
        } else if token.eq_ignore_ascii_case("OR") {
            Some(Connector::Or)
        } else {
            None
        }
    }
}

/// One user-entered search term plus the connector linking it to the previous group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeywordGroup {
    /// Ordinal position in the editor when the group was collected
    #[serde(default)]
    pub group_index: usize,
    /// Joins this group to the previously emitted group; ignored on the first one
    #[serde(default)]
    pub operator: Connector,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl KeywordGroup {
    pub fn new(group_index: usize, operator: Connector, term: impl Into<String>) -> Self {
        Self {
            group_index,
            operator,
            keywords: vec![term.into()],
        }
    }

    /// The term the renderer emits: the first keyword that is not blank
    pub fn first_term(&self) -> Option<&str> {
        self.keywords
            .iter()
            .map(|k| k.trim())
            .find(|k| !k.is_empty())
    }

    pub fn is_blank(&self) -> bool {
        self.first_term().is_none()
    }
}

/// Publication date range restricting search results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DateFilter {
    #[serde(default)]
    pub enabled: bool,
    /// ISO calendar date (`YYYY-MM-DD`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl DateFilter {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn range(start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            enabled: true,
            start_date: start.map(String::from),
            end_date: end.map(String::from),
        }
    }

    /// Lower bound, if the filter is enabled and the bound is non-blank
    pub fn start(&self) -> Option<&str> {
        self.bound(self.start_date.as_deref())
    }

    /// Upper bound, if the filter is enabled and the bound is non-blank
    pub fn end(&self) -> Option<&str> {
        self.bound(self.end_date.as_deref())
    }

    /// Whether the filter contributes a clause to the rendered query
    pub fn is_active(&self) -> bool {
        self.start().is_some() || self.end().is_some()
    }

    fn bound<'a>(&self, value: Option<&'a str>) -> Option<&'a str> {
        if !self.enabled {
            return None;
        }
        value.map(str::trim).filter(|v| !v.is_empty())
    }
}

/// A named, persisted search
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// De-duplication key in the store
    pub name: String,
    /// Text shown to the user; may have been edited by hand
    pub rendered_text: String,
    pub groups: Vec<KeywordGroup>,
    pub date_filter: DateFilter,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

/// Source of the search criteria currently being edited.
///
/// Front ends implement this over whatever widgets hold the keyword and date
/// inputs; the store and renderer only see the collected values.
pub trait CriteriaProvider {
    /// Non-blank keyword groups in editor order
    fn keyword_groups(&self) -> Vec<KeywordGroup>;

    fn date_filter(&self) -> DateFilter;

    /// Query text the user typed over the rendered summary, if any
    fn edited_text(&self) -> Option<String> {
        None
    }
}

/// Collect editor rows into keyword groups, dropping blank ones.
///
/// Each row is `(connector, term)`; the kept groups remember their row index.
pub fn collect_groups<'a, I>(rows: I) -> Vec<KeywordGroup>
where
    I: IntoIterator<Item = (Connector, &'a str)>,
{
    rows.into_iter()
        .enumerate()
        .filter_map(|(index, (operator, term))| {
            let term = term.trim();
            if term.is_empty() {
                None
            } else {
                Some(KeywordGroup::new(index, operator, term))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_groups_drops_blank_rows() {
        let groups = collect_groups(vec![
            (Connector::And, " cancer "),
            (Connector::Or, "   "),
            (Connector::Or, "tumor"),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].keywords, vec!["cancer".to_string()]);
        assert_eq!(groups[1].group_index, 2);
        assert_eq!(groups[1].operator, Connector::Or);
    }

    #[test]
    fn test_keyword_group_json_layout() {
        let group = KeywordGroup::new(0, Connector::Or, "p53");
        let json = serde_json::to_string(&group).unwrap();
        assert_eq!(json, r#"{"groupIndex":0,"operator":"OR","keywords":["p53"]}"#);
    }

    #[test]
    fn test_date_filter_ignores_bounds_when_disabled() {
        let filter = DateFilter {
            enabled: false,
            start_date: Some("2020-01-01".to_string()),
            end_date: None,
        };
        assert_eq!(filter.start(), None);
        assert!(!filter.is_active());

        let json = serde_json::to_string(&DateFilter::disabled()).unwrap();
        assert_eq!(json, r#"{"enabled":false}"#);
    }

    #[test]
    fn test_date_filter_treats_empty_bound_as_absent() {
        let filter: DateFilter =
            serde_json::from_str(r#"{"enabled":true,"startDate":"2021-05-01","endDate":""}"#).unwrap();
        assert_eq!(filter.start(), Some("2021-05-01"));
        assert_eq!(filter.end(), None);
    }

    #[test]
    fn test_connector_accepts_lowercase() {
        let connector: Connector = serde_json::from_str(r#""or""#).unwrap();
        assert_eq!(connector, Connector::Or);
        assert_eq!(Connector::from_token("And"), Some(Connector::And));
        assert_eq!(Connector::from_token("NOT"), None);
    }
}
