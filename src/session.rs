//! Search Session
//!
//! Editing state for one search: the keyword rows, the date filter and any text
//! the user typed over the rendered summary. Front ends own a session and feed
//! it into the renderer and the query store through [`CriteriaProvider`].

use crate::query::{
    parse_summary, render::DEFAULT_WRAP, render_display, render_with, search_form,
    validate_query, Connector, CriteriaProvider, DateFilter, DateStyle, KeywordGroup, Query,
};
use crate::types::{AppError, AppResult};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SearchSession {
    /// Editor rows, blank ones included
    groups: Vec<KeywordGroup>,
    date_filter: DateFilter,
    edited_text: Option<String>,
    wrap: usize,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchSession {
    /// Start with a single blank keyword row
    pub fn new() -> Self {
        Self {
            groups: vec![KeywordGroup::new(0, Connector::And, "")],
            date_filter: DateFilter::disabled(),
            edited_text: None,
            wrap: DEFAULT_WRAP,
        }
    }

    pub fn with_wrap(mut self, wrap: usize) -> Self {
        self.wrap = wrap;
        self
    }

    pub fn rows(&self) -> &[KeywordGroup] {
        &self.groups
    }

    /// Append a keyword row; structured edits discard any hand-edited text
    pub fn push_keyword(&mut self, operator: Connector, term: impl Into<String>) {
        // Fill the trailing blank row before growing the list
        let fill_last = self.groups.last().is_some_and(|g| g.is_blank());
        if fill_last {
            if let Some(last) = self.groups.last_mut() {
                last.operator = operator;
                last.keywords = vec![term.into()];
            }
        } else {
            let index = self.groups.len();
            self.groups.push(KeywordGroup::new(index, operator, term));
        }
        self.edited_text = None;
    }

    pub fn clear_keywords(&mut self) {
        self.groups = vec![KeywordGroup::new(0, Connector::And, "")];
        self.edited_text = None;
    }

    pub fn set_date_filter(&mut self, date_filter: DateFilter) {
        self.date_filter = date_filter;
        self.edited_text = None;
    }

    /// Record text typed over the summary; typing the current summary back is not an edit
    pub fn edit_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.trim() == self.summary().trim() {
            self.edited_text = None;
        } else {
            self.edited_text = Some(text);
        }
    }

    pub fn is_edited(&self) -> bool {
        self.edited_text.is_some()
    }

    /// Summary as displayed, wrapped every few tokens
    pub fn summary(&self) -> String {
        render_display(&self.groups, &self.date_filter, self.wrap)
    }

    /// What the user currently sees: edited text if any, otherwise the summary
    pub fn effective_text(&self) -> String {
        self.edited_text.clone().unwrap_or_else(|| self.summary())
    }

    /// Validate the visible text and build the `term` sent to PubMed.
    ///
    /// Hand-edited text is submitted as typed; only line breaks and the dates
    /// of publication-date clauses are rewritten.
    pub fn search_term(&self) -> AppResult<String> {
        validate_query(&self.effective_text())?;

        let term = match &self.edited_text {
            Some(text) => search_form(text),
            None => render_with(&self.groups, &self.date_filter, DateStyle::Slash),
        };

        if term.is_empty() {
            return Err(AppError::Validation("No search criteria entered".to_string()));
        }
        debug!(term = %term, "Built search term");
        Ok(term)
    }

    /// Repopulate the editor from a saved query.
    ///
    /// Only the first keyword of each group is restored. When none of the
    /// restored rows carries text, the stored query text is shown as an edit.
    pub fn apply(&mut self, query: &Query) {
        self.groups = query
            .groups
            .iter()
            .enumerate()
            .map(|(index, group)| {
                let term = group.keywords.first().cloned().unwrap_or_default();
                KeywordGroup::new(index, group.operator, term)
            })
            .collect();
        if self.groups.is_empty() {
            self.groups.push(KeywordGroup::new(0, Connector::And, ""));
        }

        self.date_filter = if query.date_filter.enabled {
            query.date_filter.clone()
        } else {
            DateFilter::disabled()
        };

        let restored = self.groups.iter().any(|g| !g.is_blank());
        self.edited_text = if restored || query.rendered_text.trim().is_empty() {
            None
        } else {
            Some(query.rendered_text.clone())
        };
    }

    /// Replace the editor contents with criteria parsed from pasted query text
    pub fn paste(&mut self, text: &str) {
        let parsed = parse_summary(text);
        self.groups = parsed.groups;
        let index = self.groups.len();
        self.groups.push(KeywordGroup::new(index, Connector::And, ""));
        self.date_filter = parsed.date_filter;
        self.edited_text = None;
    }
}

impl CriteriaProvider for SearchSession {
    fn keyword_groups(&self) -> Vec<KeywordGroup> {
        self.groups.iter().filter(|g| !g.is_blank()).cloned().collect()
    }

    fn date_filter(&self) -> DateFilter {
        if self.date_filter.enabled {
            self.date_filter.clone()
        } else {
            DateFilter::disabled()
        }
    }

    fn edited_text(&self) -> Option<String> {
        self.edited_text.clone()
    }
}
