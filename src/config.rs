use crate::query::render::DEFAULT_WRAP;
use crate::store::{FileBlobStore, DEFAULT_STORE_KEY};
use crate::types::{AppError, AppResult};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub display: DisplayConfig,
    pub log_filter: String,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// Keyword tokens per line in the displayed summary; 0 disables wrapping
    pub wrap_tokens: usize,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            store: StoreConfig {
                data_dir: env::var("PUBMED_QUERY_DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| FileBlobStore::default_dir()),
                key: env::var("PUBMED_QUERY_STORE_KEY")
                    .unwrap_or_else(|_| DEFAULT_STORE_KEY.to_string()),
            },
            display: DisplayConfig {
                wrap_tokens: env::var("PUBMED_QUERY_WRAP")
                    .unwrap_or_else(|_| DEFAULT_WRAP.to_string())
                    .parse()
                    .map_err(|e| AppError::Config(format!("PUBMED_QUERY_WRAP: {}", e)))?,
            },
            log_filter: env::var("RUST_LOG").unwrap_or_else(|_| "pubmed_query=info".to_string()),
        })
    }
}

