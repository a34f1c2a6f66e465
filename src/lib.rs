// PubMed Query - boolean query builder and saved-query store for PubMed searches

pub mod cli;
pub mod config;
pub mod query;
pub mod session;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use query::{Connector, CriteriaProvider, DateFilter, KeywordGroup, Query};
pub use session::SearchSession;
pub use store::{FileBlobStore, MemoryBlobStore, QueryStore};
pub use types::{AppError, AppResult};
