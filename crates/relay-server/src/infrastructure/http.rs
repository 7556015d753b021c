//! HTTP surface: the router, shared handler state and the `/status` route.
//!
//! Every route lives on the one listener:
//!
//! | Route     | Handler                              |
//! |-----------|--------------------------------------|
//! | `/`       | WebSocket upgrade, frames channel    |
//! | `/ws`     | WebSocket upgrade, frames channel    |
//! | `/sensor` | WebSocket upgrade, sensor channel    |
//! | `/status` | JSON [`StatusReport`]                |
//!
//! A permissive CORS layer wraps all of them so browser panels served from
//! any origin can poll `/status`.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::application::{RelayService, StatusReport};
use crate::domain::RelayConfig;
use crate::infrastructure::ws_server::{frames_upgrade, sensor_upgrade};

/// State handed to every route handler.  Cloning copies two `Arc`s.
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: Arc<RelayService>,
    pub config: Arc<RelayConfig>,
}

/// Builds the relay's router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(frames_upgrade))
        .route("/ws", get(frames_upgrade))
        .route("/sensor", get(sensor_upgrade))
        .route("/status", get(status_handler))
        .layer(cors)
        .with_state(state)
}

/// `GET /status`: liveness, connection counts and uptime.
async fn status_handler(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.service.status())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::Connection;
    use crate::domain::{Channel, ConnectionState};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn make_state() -> AppState {
        let config = RelayConfig::default();
        AppState {
            service: Arc::new(RelayService::new(config.stats_interval)),
            config: Arc::new(config),
        }
    }

    async fn get_status(app: Router) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_status_with_no_clients() {
        let (status, body) = get_status(router(make_state())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "running");
        assert_eq!(body["connections"], 0);
        assert!(body["uptime"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn test_status_counts_registered_connections_per_channel() {
        // Arrange: two frames clients and one sensor client.
        let state = make_state();
        let addr = "127.0.0.1:1".parse().unwrap();
        let mut queues = Vec::new();
        for channel in [Channel::Frames, Channel::Frames, Channel::Sensor] {
            let (conn, rx) = Connection::new(addr, channel, 4);
            conn.advance(ConnectionState::Open);
            state.service.registry(channel).register(conn);
            queues.push(rx);
        }

        // Act
        let (_, body) = get_status(router(state)).await;

        // Assert
        assert_eq!(body["connections"], 3);
        assert_eq!(body["channels"]["frames"], 2);
        assert_eq!(body["channels"]["sensor"], 1);
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let response = router(make_state())
            .oneshot(
                Request::get("/status")
                    .header(header::ORIGIN, "http://panels.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn test_plain_get_on_websocket_route_is_rejected() {
        // No upgrade headers: the request must be refused, not served.
        let response = router(make_state())
            .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.status().is_client_error(), "got {}", response.status());
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = router(make_state())
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
