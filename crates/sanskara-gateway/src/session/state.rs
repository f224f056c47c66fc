//! Shared session state map.
//!
//! Priming writes the context keys before streaming starts; afterwards only
//! the response dispatcher writes, and only its own keys.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;

/// Cloneable handle to one session's key/value state.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    inner: Arc<RwLock<Map<String, Value>>>,
}

impl SessionState {
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().await.get(key).cloned()
    }

    pub async fn get_str(&self, key: &str) -> Option<String> {
        self.inner
            .read()
            .await
            .get(key)
            .and_then(Value::as_str)
            .map(String::from)
    }

    pub async fn set(&self, key: &str, value: Value) {
        self.inner.write().await.insert(key.to_string(), value);
    }

    /// Overlay every entry of `values`.
    pub async fn extend(&self, values: Map<String, Value>) {
        self.inner.write().await.extend(values);
    }

    /// Increment an integer counter, returning the new value.
    pub async fn increment(&self, key: &str) -> u64 {
        let mut state = self.inner.write().await;
        let next = state.get(key).and_then(Value::as_u64).unwrap_or(0) + 1;
        state.insert(key.to_string(), Value::from(next));
        next
    }

    pub async fn snapshot(&self) -> Map<String, Value> {
        self.inner.read().await.clone()
    }
}
