//! The relational store contract.

use async_trait::async_trait;
use serde_json::{Map, Value};

/// One result row as a JSON object keyed by column name.
pub type Row = Map<String, Value>;

/// Named query parameters (`:name` placeholders).
pub type Params = Map<String, Value>;

/// Store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote SQL error: {0}")]
    Remote(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Missing query parameter: {0}")]
    MissingParam(String),
}

/// Executes SQL with named parameters and returns rows as JSON objects.
#[async_trait]
pub trait Store: Send + Sync {
    async fn execute(&self, query: &str, params: &Params) -> Result<Vec<Row>, StoreError>;
}

/// Build a parameter map from `(name, value)` pairs.
pub fn params<const N: usize>(pairs: [(&str, Value); N]) -> Params {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
