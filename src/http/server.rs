//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, panic recovery, timeout, observability)
//! - Expose the Prometheus scrape endpoint
//! - Bind server to listener and drain on shutdown

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{FromRef, MatchedPath, Request, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::domain::{AppError, UserRepository, UserUseCase};
use crate::observability::request_log::METRICS_PATH;
use crate::observability::{
    observe_request, ExceptionSink, HttpMetrics, LogExceptionSink, Observer,
};
use crate::user::{handler, InMemoryUserRepository, UserHandler, UserService};

pub const USERS_PATH: &str = "/api/v1/users";
pub const USER_BY_ID_PATH: &str = "/api/v1/users/{id}";

/// Errors raised while assembling or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: UserHandler,
    pub metrics: HttpMetrics,
}

impl FromRef<AppState> for UserHandler {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

impl FromRef<AppState> for HttpMetrics {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

/// HTTP server for the user service.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
    metrics: HttpMetrics,
}

impl HttpServer {
    /// Create a server backed by the in-memory repository.
    pub fn new(config: AppConfig) -> Result<Self, ServerError> {
        Self::with_repository(config, Arc::new(InMemoryUserRepository::new()))
    }

    pub fn with_repository(
        config: AppConfig,
        repo: Arc<dyn UserRepository>,
    ) -> Result<Self, ServerError> {
        let sink: Option<Arc<dyn ExceptionSink>> = if config.observability.exception_sink {
            Some(Arc::new(LogExceptionSink))
        } else {
            None
        };
        Self::with_parts(config, Arc::new(UserService::new(repo)), sink)
    }

    /// Assemble from explicit collaborators.
    pub fn with_parts(
        config: AppConfig,
        use_case: Arc<dyn UserUseCase>,
        sink: Option<Arc<dyn ExceptionSink>>,
    ) -> Result<Self, ServerError> {
        let metrics = HttpMetrics::new()?;
        let state = AppState {
            users: UserHandler::new(use_case),
            metrics: metrics.clone(),
        };
        let observer = Observer::new(metrics.clone(), sink, config.limits.max_body_size);

        let router = Self::build_router(&config, state, observer);
        Ok(Self {
            router,
            config,
            metrics,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The observability layer is applied through `Router::layer`, so it
    /// wraps each route individually and sees the matched template.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState, observer: Observer) -> Router {
        Router::new()
            .route(USERS_PATH, post(handler::create_user).put(handler::update_user))
            .route(
                USER_BY_ID_PATH,
                get(handler::get_user_by_id).delete(handler::delete_user_by_id),
            )
            .route(METRICS_PATH, get(metrics_handler))
            .fallback(route_not_found)
            .with_state(state)
            .layer(middleware::from_fn_with_state(observer, observe_request))
            .layer(CatchPanicLayer::new())
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let route = request
                    .extensions()
                    .get::<MatchedPath>()
                    .map(MatchedPath::as_str)
                    .unwrap_or("unmatched");
                tracing::info_span!("http_request", method = %request.method(), route)
            }))
    }

    /// The assembled router, for driving the service without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn metrics(&self) -> &HttpMetrics {
        &self.metrics
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests
    /// for at most `shutdown.grace_secs`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let grace = Duration::from_secs(self.config.shutdown.grace_secs);
        let (drain_tx, drain_rx) = tokio::sync::oneshot::channel::<()>();

        let server = axum::serve(listener, self.router).with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown Server ...");
            let _ = drain_tx.send(());
        });
        let server = server.into_future();

        tokio::select! {
            result = server => result?,
            _ = async {
                let _ = drain_rx.await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(grace_secs = grace.as_secs(), "Drain timeout elapsed, dropping in-flight requests");
            }
        }

        tracing::info!("Server exiting");
        Ok(())
    }
}

/// Prometheus text exposition.
async fn metrics_handler(State(metrics): State<HttpMetrics>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics.render(),
    )
        .into_response()
}

async fn route_not_found() -> AppError {
    AppError::not_found("route not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use tower::ServiceExt;

    async fn send(router: Router, method: &str, uri: &str, body: &str) -> (StatusCode, String) {
        let request = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let server = HttpServer::new(AppConfig::default()).unwrap();
        let router = server.router();

        let (status, body) = send(router.clone(), "POST", "/api/v1/users", r#"{"name":"mert","age":26}"#).await;
        assert_eq!(status, StatusCode::CREATED);
        let created: serde_json::Value = serde_json::from_str(&body).unwrap();
        let id = created["id"].as_u64().unwrap();
        assert_ne!(id, 0);

        let (status, body) = send(router.clone(), "GET", &format!("/api/v1/users/{id}"), "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_str::<serde_json::Value>(&body).unwrap(), created);

        let update = format!(r#"{{"id":{id},"name":"mert k","age":27}}"#);
        let (status, body) = send(router.clone(), "PUT", "/api/v1/users", &update).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_str::<serde_json::Value>(&body).unwrap()["age"], 27);

        let (status, body) = send(router.clone(), "DELETE", &format!("/api/v1/users/{id}"), "").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());

        let (status, body) = send(router, "GET", &format!("/api/v1/users/{id}"), "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, format!(r#"{{"message":"User not found, ID: {id}"}}"#));
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected() {
        let server = HttpServer::new(AppConfig::default()).unwrap();

        let (status, body) = send(server.router(), "POST", "/api/v1/users", r#"{"name":"","age":3}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, r#"{"message":"The name should not be empty."}"#);
    }

    #[tokio::test]
    async fn test_metrics_are_keyed_by_template() {
        let server = HttpServer::new(AppConfig::default()).unwrap();
        let router = server.router();

        send(router.clone(), "GET", "/api/v1/users/41", "").await;
        send(router.clone(), "GET", "/api/v1/users/42", "").await;
        send(router.clone(), "POST", "/api/v1/users", r#"{"name":"a"}"#).await;

        let (status, text) = send(router, "GET", "/metrics", "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(text.contains(r#"http_requests_total_with_path{url="GET /api/v1/users/:id"} 2"#));
        assert!(text.contains(r#"http_requests_total_with_path{url="POST /api/v1/users"} 1"#));
        assert!(text.contains(r#"http_request_duration_seconds_count{path="GET /api/v1/users/:id"} 2"#));
        assert!(!text.contains("/api/v1/users/41"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let server = HttpServer::new(AppConfig::default()).unwrap();

        let (status, body) = send(server.router(), "GET", "/nope/123", "").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, r#"{"message":"route not found"}"#);
        assert!(server
            .metrics()
            .render()
            .contains(r#"http_requests_total_with_path{url="GET unmatched"} 1"#));
    }
}
