//! Query Store
//!
//! Named queries persisted as one CSV blob under one key of a [`BlobStore`].
//! Every mutation loads the whole collection, changes it in memory, encodes a
//! complete new blob and hands it to the backend in a single write, so a
//! failed write leaves the previous blob untouched.

pub mod backend;
pub mod codec;

pub use backend::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use codec::{DiagnosticKind, LoadReport, ParseDiagnostic, BOM};

use crate::query::{is_no_criteria, render, CriteriaProvider, DateFilter, KeywordGroup, Query};
use crate::types::{AppError, AppResult};
use chrono::{DateTime, SubsecRound, Utc};
use std::path::Path;
use tracing::{info, warn};

/// Storage key used by the browser front end
pub const DEFAULT_STORE_KEY: &str = "pubmed_query_csv_data";

/// Everything needed to save the query currently being edited
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub name: String,
    pub groups: Vec<KeywordGroup>,
    pub date_filter: DateFilter,
    /// Text typed over the rendered summary; wins over re-rendering
    pub edited_text: Option<String>,
}

impl SaveRequest {
    pub fn new(name: impl Into<String>, groups: Vec<KeywordGroup>, date_filter: DateFilter) -> Self {
        Self {
            name: name.into(),
            groups,
            date_filter,
            edited_text: None,
        }
    }

    pub fn from_provider(name: impl Into<String>, provider: &impl CriteriaProvider) -> Self {
        Self {
            name: name.into(),
            groups: provider.keyword_groups(),
            date_filter: provider.date_filter(),
            edited_text: provider.edited_text(),
        }
    }

    pub fn with_edited_text(mut self, text: impl Into<String>) -> Self {
        self.edited_text = Some(text.into());
        self
    }

    /// Text to persist: hand-edited text if present, otherwise the rendered groups
    pub fn rendered_text(&self) -> String {
        match self.edited_text.as_deref().map(str::trim) {
            Some(text) if !is_no_criteria(text) => text.to_string(),
            _ => render(&self.groups, &self.date_filter),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Replaced,
    /// An entry with the same name existed and the overwrite was declined
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NotFound,
}

/// Saved-query collection over a blob backend
pub struct QueryStore<B: BlobStore> {
    backend: B,
    key: String,
}

impl<B: BlobStore> QueryStore<B> {
    pub fn new(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn with_default_key(backend: B) -> Self {
        Self::new(backend, DEFAULT_STORE_KEY)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Write a bare header if nothing is stored yet
    pub fn initialize(&mut self) -> AppResult<()> {
        if self.backend.get(&self.key)?.is_none() {
            self.backend.set(&self.key, &format!("{}\n", codec::header_line()))?;
            info!(key = %self.key, "Initialized empty query store");
        }
        Ok(())
    }

    /// Decode every stored query; a missing blob is an empty list
    pub fn list_all(&self) -> AppResult<LoadReport> {
        match self.backend.get(&self.key)? {
            Some(blob) => Ok(codec::decode(&blob, Utc::now())),
            None => Ok(LoadReport::default()),
        }
    }

    pub fn contains(&self, name: &str) -> AppResult<bool> {
        Ok(self.list_all()?.queries.iter().any(|q| q.name == name))
    }

    /// Save under `request.name`, replacing an entry with the same name.
    ///
    /// `confirm_overwrite` is asked only when the name already exists;
    /// returning `false` cancels without writing. A replaced entry keeps its
    /// original creation time.
    pub fn save<F>(
        &mut self,
        request: &SaveRequest,
        now: DateTime<Utc>,
        confirm_overwrite: F,
    ) -> AppResult<SaveOutcome>
    where
        F: FnOnce(&str) -> bool,
    {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Query name must not be empty".to_string()));
        }

        let now = now.trunc_subsecs(3);
        let mut queries = self.list_all()?.queries;
        let existing = queries.iter().position(|q| q.name == name);

        let created_at = match existing {
            Some(index) => {
                if !confirm_overwrite(name) {
                    info!(name = %name, "Save cancelled, existing query kept");
                    return Ok(SaveOutcome::Cancelled);
                }
                queries.remove(index).created_at
            }
            None => now,
        };

        queries.push(Query {
            name: name.to_string(),
            rendered_text: request.rendered_text(),
            groups: request.groups.clone(),
            date_filter: request.date_filter.clone(),
            created_at,
            last_used_at: now,
        });
        queries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        self.write_all(&queries)?;
        info!(name = %name, total = queries.len(), "Saved query");

        Ok(if existing.is_some() {
            SaveOutcome::Replaced
        } else {
            SaveOutcome::Created
        })
    }

    pub fn delete(&mut self, name: &str) -> AppResult<DeleteOutcome> {
        let mut queries = self.list_all()?.queries;
        let Some(index) = queries.iter().position(|q| q.name == name) else {
            warn!(name = %name, "Query to delete not found");
            return Ok(DeleteOutcome::NotFound);
        };

        queries.remove(index);
        self.write_all(&queries)?;
        info!(name = %name, remaining = queries.len(), "Deleted query");
        Ok(DeleteOutcome::Deleted)
    }

    pub fn update_last_used(&mut self, name: &str, timestamp: DateTime<Utc>) -> AppResult<UpdateOutcome> {
        let mut queries = self.list_all()?.queries;
        let Some(query) = queries.iter_mut().find(|q| q.name == name) else {
            return Ok(UpdateOutcome::NotFound);
        };

        query.last_used_at = timestamp.trunc_subsecs(3);
        self.write_all(&queries)?;
        info!(name = %name, "Updated last-used time");
        Ok(UpdateOutcome::Updated)
    }

    /// Fetch a query by name and record the access
    pub fn load(&mut self, name: &str, now: DateTime<Utc>) -> AppResult<Option<Query>> {
        let report = self.list_all()?;
        let Some(mut query) = report.queries.into_iter().find(|q| q.name == name) else {
            return Ok(None);
        };

        // A failed bookkeeping write must not block using the query
        if let Err(e) = self.update_last_used(name, now) {
            warn!(name = %name, error = %e, "Failed to update last-used time");
        }
        query.last_used_at = now.trunc_subsecs(3);
        Ok(Some(query))
    }

    /// Short human-readable summary of the store contents
    pub fn status(&self) -> AppResult<String> {
        let count = self.list_all()?.queries.len();
        Ok(if count > 0 {
            format!("Saved queries: {}", count)
        } else {
            "No saved queries".to_string()
        })
    }

    /// Canonical CSV export with a leading byte-order mark
    pub fn export_csv(&self) -> AppResult<String> {
        let queries = self.list_all()?.queries;
        Ok(format!("{}{}", BOM, codec::encode(&queries)?))
    }

    pub fn export_to_file(&self, path: impl AsRef<Path>) -> AppResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.export_csv()?)?;
        info!(path = ?path, "Exported saved queries");
        Ok(())
    }

    fn write_all(&mut self, queries: &[Query]) -> AppResult<()> {
        let blob = codec::encode(queries)?;
        self.backend.set(&self.key, &blob)
    }
}
