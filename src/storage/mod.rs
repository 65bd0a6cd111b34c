//! Data store seam: a hosted REST store for real runs, an in-process one for
//! dry runs and tests.

pub mod memory;
pub mod postgrest;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;

use crate::config::StoreConfig;
use crate::error::{ConfigError, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Column equality filters, ANDed together
pub type Filter<'a> = [(&'a str, Value)];

#[async_trait]
pub trait DataStore: Send + Sync {
    /// Insert or merge on `conflict_key`, returning the stored row (with its id)
    async fn upsert(
        &self,
        table: &str,
        record: Value,
        conflict_key: &[&str],
    ) -> Result<Value, StoreError>;

    async fn insert(&self, table: &str, record: Value) -> Result<Value, StoreError>;

    async fn select(&self, table: &str, filter: &Filter<'_>) -> Result<Vec<Value>, StoreError>;
}

/// Store for this run: in memory for dry runs, the hosted store otherwise
pub fn open(config: Option<&StoreConfig>, dry_run: bool) -> anyhow::Result<Arc<dyn DataStore>> {
    if dry_run {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let config = config.ok_or(ConfigError::Missing("SUPABASE_URL"))?;
    Ok(Arc::new(PostgrestStore::new(config)?))
}

/// Filter value as the store expects it in a query string
pub(crate) fn filter_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
