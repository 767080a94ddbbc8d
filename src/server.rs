use axum::{Router, middleware, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::state::AppState;
use crate::{RelayConfig, RelayError, cors, routes};

/// The auth relay HTTP server.
pub struct RelayServer {
    state: AppState,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        Ok(Self {
            state: AppState::new(config)?,
        })
    }

    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(routes::home))
            .route("/auth/callback", get(routes::auth_callback))
            .route("/auth/process", get(routes::auth_process))
            .route("/api/auth/callback", post(routes::api_auth_callback))
            .route("/api/status", get(routes::api_status))
            .fallback(routes::fallback)
            // CORS runs outside routing so pre-flights answer for any path
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                cors::cors_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind and serve until the process is stopped.
    pub async fn run(self) -> Result<(), RelayError> {
        let port = self.state.config.port;
        let router = self.router();

        let listener = match TcpListener::bind(("0.0.0.0", port)).await {
            Ok(listener) => listener,
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::error!(
                    port,
                    "port is already in use; stop the other process and start the relay again"
                );
                return Err(RelayError::Io(err));
            }
            Err(err) => return Err(RelayError::Io(err)),
        };

        info!(port, "auth relay listening on http://localhost:{port}");
        info!(
            callback = %self.state.environment.redirect_uri,
            "waiting for authorization callbacks"
        );

        axum::serve(listener, router).await.map_err(RelayError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::RelayServer;
    use crate::RelayConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    fn local_server() -> RelayServer {
        RelayServer::new(RelayConfig::default()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn status_route_reports_resolved_configuration() {
        let server = local_server();
        let expected_redirect = server.state().environment.redirect_uri.clone();

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/api/status")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "Server is running");
        assert_eq!(body["mode"], "local");
        assert_eq!(body["redirect_uri"], expected_redirect.as_str());
        assert_eq!(body["cors_origin"], "http://localhost:5173");
        assert!(body["timestamp"].as_str().unwrap().contains('T'));
    }

    #[tokio::test]
    async fn callback_without_code_redirects_with_no_code_error() {
        let response = local_server()
            .router()
            .oneshot(
                Request::builder()
                    .uri("/auth/callback")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "http://localhost:5173/#/auth/callback?error=no_code"
        );
    }

    #[tokio::test]
    async fn callback_with_code_hands_off_to_process() {
        let response = local_server()
            .router()
            .oneshot(
                Request::builder()
                    .uri("/auth/callback?code=test_code")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("/auth/process?code=test_code&redirect="));
    }

    #[tokio::test]
    async fn preflight_gets_empty_204_with_reflected_origin() {
        let response = local_server()
            .router()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/status")
                    .header(header::ORIGIN, "https://someone.github.io")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "https://someone.github.io"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn regular_responses_carry_cors_headers() {
        let response = local_server()
            .router()
            .oneshot(
                Request::builder()
                    .uri("/api/status")
                    .header(header::ORIGIN, "https://animerealm-api.onrender.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "https://animerealm-api.onrender.com"
        );
        assert_eq!(
            response.headers()["access-control-allow-credentials"],
            "true"
        );
    }

    #[tokio::test]
    async fn unknown_routes_get_404_naming_the_path() {
        let response = local_server()
            .router()
            .oneshot(
                Request::builder()
                    .uri("/definitely/not/here")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("/definitely/not/here"));
    }

    #[tokio::test]
    async fn api_callback_rejects_empty_code() {
        let response = local_server()
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/callback")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"code":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "No code provided");
    }

    #[tokio::test]
    async fn api_callback_without_credentials_is_a_500() {
        let response = local_server()
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/callback")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"code":"abc123"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Missing credentials");
    }

    #[tokio::test]
    async fn home_page_shows_the_redirect_uri() {
        let server = local_server();
        let redirect_uri = server.state().environment.redirect_uri.clone();

        let response = server
            .router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains(&redirect_uri));
    }
}
