//! Data Loader Module
//! CSV loading via Polars, schema validation, and the per-session table cache.

use polars::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::data::cleaner::{CleanerError, DataCleaner, ImputationScope};
use crate::data::schema::{self, SchemaError};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load data: {0}")]
    CsvError(#[from] PolarsError),
    #[error(transparent)]
    SchemaError(#[from] SchemaError),
    #[error(transparent)]
    CleanerError(#[from] CleanerError),
}

/// Key for one fetch+clean result: source reference plus the imputation
/// scope it was cleaned under.
type CacheKey = (PathBuf, ImputationScope);

/// Owns the cleaned tables for the session. Populated once per source
/// reference, then handed out as shared read-only frames; every aggregation
/// recomputes from these, nothing writes back.
pub struct DataLoader {
    cache: HashMap<CacheKey, Arc<DataFrame>>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Cached cleaned table for this source, if one was already loaded.
    pub fn get_cached(&self, path: &Path, scope: ImputationScope) -> Option<Arc<DataFrame>> {
        let key = (Self::cache_key_path(path), scope);
        self.cache.get(&key).cloned()
    }

    /// Store a fetch+clean result produced off-thread.
    pub fn insert(&mut self, path: &Path, scope: ImputationScope, df: Arc<DataFrame>) {
        self.cache.insert((Self::cache_key_path(path), scope), df);
    }

    /// Fetch, validate, and clean one spreadsheet. Free of loader state so it
    /// can run on a background thread; the caller stores the result via
    /// `insert`. Any failure aborts the whole load.
    pub fn fetch_and_clean(
        path: &Path,
        scope: ImputationScope,
    ) -> Result<DataFrame, LoaderError> {
        let raw = LazyCsvReader::new(path.to_string_lossy().as_ref())
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;

        // Fail fast on a malformed spreadsheet before any aggregation runs.
        schema::validate(&raw)?;

        Ok(DataCleaner::clean(&raw, scope)?)
    }

    fn cache_key_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
    }
}
