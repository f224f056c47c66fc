//! Store backed by a remote SQL execution endpoint.
//!
//! The endpoint receives `{query, params, project_id}` and answers with
//! `{status: "success", data: [...]}` or `{status: "error", error: "..."}`.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::store::{Params, Row, Store, StoreError};

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    query: &'a str,
    params: &'a Params,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct ExecuteResponse {
    status: String,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Remote SQL store client.
#[derive(Debug)]
pub struct HttpSqlStore {
    http: reqwest::Client,
    endpoint: String,
    project_id: Option<String>,
}

impl HttpSqlStore {
    pub fn new(
        endpoint: &str,
        api_key: Option<&str>,
        project_id: Option<String>,
    ) -> Result<Self, StoreError> {
        if endpoint.is_empty() {
            return Err(StoreError::Remote("SQL endpoint is empty".into()));
        }

        let mut headers = HeaderMap::new();
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| StoreError::Remote("Invalid API key format".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        // reqwest is built with rustls-no-provider.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            project_id,
        })
    }
}

#[async_trait]
impl Store for HttpSqlStore {
    async fn execute(&self, query: &str, params: &Params) -> Result<Vec<Row>, StoreError> {
        let body = ExecuteRequest {
            query,
            params,
            project_id: self.project_id.as_deref(),
        };
        let resp = self.http.post(&self.endpoint).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StoreError::Remote(format!(
                "endpoint returned {}",
                status.as_u16()
            )));
        }

        let parsed: ExecuteResponse = resp.json().await?;
        parse_response(parsed).inspect(|rows| debug!(rows = rows.len(), "Remote query done"))
    }
}

fn parse_response(resp: ExecuteResponse) -> Result<Vec<Row>, StoreError> {
    if resp.status != "success" {
        return Err(StoreError::Remote(
            resp.error.unwrap_or_else(|| format!("status {}", resp.status)),
        ));
    }
    match resp.data {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                other => Err(StoreError::Decode(format!("row is not an object: {other}"))),
            })
            .collect(),
        Some(other) => Err(StoreError::Decode(format!(
            "data is not an array: {other}"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn response(json: &str) -> ExecuteResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn success_rows_are_objects() {
        let rows = parse_response(response(
            r#"{"status":"success","data":[{"wedding_id":"w1","role":"bride"}]}"#,
        ))
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["role"], "bride");
    }

    #[test]
    fn success_without_data_is_empty() {
        assert!(parse_response(response(r#"{"status":"success"}"#))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn error_status_surfaces_message() {
        let err = parse_response(response(r#"{"status":"error","error":"syntax error"}"#))
            .unwrap_err();
        assert!(matches!(err, StoreError::Remote(msg) if msg == "syntax error"));
    }

    #[test]
    fn non_object_rows_are_decode_errors() {
        let err = parse_response(response(r#"{"status":"success","data":[1]}"#)).unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[test]
    fn request_body_shape() {
        let params = crate::storage::store::params([("user_id", Value::from("u1"))]);
        let body = ExecuteRequest {
            query: "SELECT 1",
            params: &params,
            project_id: Some("p1"),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["query"], "SELECT 1");
        assert_eq!(json["params"]["user_id"], "u1");
        assert_eq!(json["project_id"], "p1");
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        assert!(HttpSqlStore::new("", None, None).is_err());
    }
}
