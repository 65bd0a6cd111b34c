use super::{filter_value, DataStore, Filter};
use crate::config::{timeouts, StoreConfig};
use crate::error::StoreError;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=representation";
const PREFER_INSERT: &str = "return=representation";

/// Hosted Postgres behind its REST gateway (`/rest/v1/<table>`)
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    client: Client,
    base_url: String,
}

impl PostgrestStore {
    pub fn new(config: &StoreConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&config.key).context("Invalid store key")?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.key)).context("Invalid store key")?,
        );

        let client = Client::builder()
            .timeout(timeouts::HTTP)
            .default_headers(headers)
            .build()
            .context("Failed to create data store client")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn send(&self, table: &str, request: RequestBuilder) -> Result<Vec<Value>, StoreError> {
        let http = |source| StoreError::Http {
            table: table.to_string(),
            source,
        };

        let response = request.send().await.map_err(http)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                table: table.to_string(),
                status,
                body,
            });
        }

        let rows: Vec<Value> = response.json().await.map_err(http)?;
        debug!("{} returned {} rows", table, rows.len());
        Ok(rows)
    }
}

/// `col=eq.value` pairs for a select
pub fn filter_params(filter: &Filter<'_>) -> Vec<(String, String)> {
    std::iter::once(("select".to_string(), "*".to_string()))
        .chain(
            filter
                .iter()
                .map(|(column, value)| (column.to_string(), format!("eq.{}", filter_value(value)))),
        )
        .collect()
}

#[async_trait]
impl DataStore for PostgrestStore {
    async fn upsert(
        &self,
        table: &str,
        record: Value,
        conflict_key: &[&str],
    ) -> Result<Value, StoreError> {
        let request = self
            .client
            .post(self.endpoint(table))
            .query(&[("on_conflict", conflict_key.join(","))])
            .header("Prefer", PREFER_UPSERT)
            .json(&record);

        self.send(table, request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::MissingId(table.to_string()))
    }

    async fn insert(&self, table: &str, record: Value) -> Result<Value, StoreError> {
        let request = self
            .client
            .post(self.endpoint(table))
            .header("Prefer", PREFER_INSERT)
            .json(&record);

        Ok(self.send(table, request).await?.into_iter().next().unwrap_or(Value::Null))
    }

    async fn select(&self, table: &str, filter: &Filter<'_>) -> Result<Vec<Value>, StoreError> {
        let request = self.client.get(self.endpoint(table)).query(&filter_params(filter));
        self.send(table, request).await
    }
}
