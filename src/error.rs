use thiserror::Error;

/// A scraped value that could not be turned into its typed form.
/// Always recovered locally: the record is skipped or the field dropped.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unparseable date: {0:?}")]
    Date(String),
    #[error("unparseable time: {0:?}")]
    Time(String),
}

/// Startup configuration problems. Fatal before any scraping starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
    #[error("failed to load airport map from {path}: {reason:#}")]
    AirportMap { path: String, reason: anyhow::Error },
}

/// Failure of a single data store call
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to {table} failed: {source}")]
    Http {
        table: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{table} returned {status}: {body}")]
    Status {
        table: String,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("upsert into {0} returned no id")]
    MissingId(String),
    #[error("record for {table} is not a JSON object")]
    NotAnObject { table: String },
    #[error("could not encode record: {0}")]
    Encode(#[from] serde_json::Error),
}
