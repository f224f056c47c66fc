//! HTTP surface: the realtime WebSocket endpoint and a health probe.

mod health;
mod ws;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use crate::session::SessionManager;

pub use health::HealthResponse;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<SessionManager>,
    /// Used when a client connects without `user_id`.
    pub default_user_id: String,
    pub max_frame_bytes: usize,
}

/// Build the gateway router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health::health))
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::artifacts::InMemoryArtifactStore;
    use crate::live::{EventStream, LiveContext, LiveRequestQueue, Responder, ResponderError};
    use crate::session::SessionSettings;
    use crate::storage::SqliteStore;

    struct IdleResponder;

    #[async_trait]
    impl Responder for IdleResponder {
        async fn create_session(&self, _user_id: &str) -> Result<Option<String>, ResponderError> {
            Ok(Some("s-1".into()))
        }

        async fn run_live(
            &self,
            _ctx: LiveContext,
            _requests: LiveRequestQueue,
        ) -> Result<EventStream, ResponderError> {
            Ok(Box::pin(futures::stream::pending()))
        }
    }

    async fn state() -> AppState {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let manager = SessionManager::new(
            Arc::new(IdleResponder),
            Arc::new(store),
            Arc::new(InMemoryArtifactStore::new()),
            SessionSettings::from(&sanskara_core::Config::default()),
        );
        AppState {
            manager: Arc::new(manager),
            default_user_id: "default_user_id".into(),
            max_frame_bytes: 1024 * 1024,
        }
    }

    #[tokio::test]
    async fn health_reports_active_sessions() {
        let app = build_router(state().await);
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "sanskara-gateway");
        assert_eq!(json["active_sessions"], 0);
    }

    #[tokio::test]
    async fn ws_requires_an_upgrade() {
        let app = build_router(state().await);
        let resp = app
            .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = build_router(state().await);
        let resp = app
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
