//! Per-request observability pipeline.
//!
//! # Data Flow
//! ```text
//! Start     timer started, RouteKey from the matched template
//! Attach    CorrelationId generated, ExceptionScope installed,
//!           request body captured and replayed
//! Dispatch  downstream handler (inside a span carrying the correlation id)
//! Finalize  response body teed through CaptureBody; when it completes:
//!           count++, access line emitted, duration observed
//! ```
//!
//! Finalization is owned by `RequestObservation`. Whatever path the
//! request takes (normal completion, early body drop, handler panic) the
//! guard is dropped exactly once, and the drop records the count and the
//! duration for that request.
//!
//! A handler panic is reported to the exception sink and then resumed, so
//! the outer panic layer still builds the 500 response.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::{MatchedPath, Request, State},
    http::{HeaderValue, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;
use tracing::Instrument;

use crate::domain::AppError;
use crate::observability::capture::CaptureBody;
use crate::observability::correlation::{CorrelationId, X_REQUEST_ID};
use crate::observability::metrics::{HttpMetrics, RouteKey};
use crate::observability::request_log;
use crate::observability::sink::{ExceptionScope, ExceptionSink};

/// Shared collaborators of the observability middleware.
#[derive(Clone)]
pub struct Observer {
    metrics: HttpMetrics,
    sink: Option<Arc<dyn ExceptionSink>>,
    max_body_size: usize,
}

impl Observer {
    pub fn new(
        metrics: HttpMetrics,
        sink: Option<Arc<dyn ExceptionSink>>,
        max_body_size: usize,
    ) -> Self {
        Self {
            metrics,
            sink,
            max_body_size,
        }
    }

    pub fn metrics(&self) -> &HttpMetrics {
        &self.metrics
    }
}

/// Finalizer for one request.
struct RequestObservation {
    metrics: HttpMetrics,
    route: RouteKey,
    started: Instant,
    counted: bool,
    method: Method,
    uri: Uri,
    correlation_id: CorrelationId,
    request_body: String,
}

impl RequestObservation {
    fn start(metrics: HttpMetrics, route: RouteKey, request: &Request) -> Self {
        Self {
            metrics,
            route,
            started: Instant::now(),
            counted: false,
            method: request.method().clone(),
            uri: request.uri().clone(),
            correlation_id: CorrelationId::generate(),
            request_body: String::new(),
        }
    }

    fn count(&mut self) {
        if !self.counted {
            self.counted = true;
            self.metrics.increment_count(&self.route);
        }
    }

    /// Count, then log. The duration is observed when `self` drops.
    fn complete(mut self, status: StatusCode, response_body: &[u8]) {
        self.count();

        let line = request_log::format(
            status,
            &self.method,
            &self.uri,
            &self.request_body,
            &String::from_utf8_lossy(response_body),
            self.correlation_id.as_str(),
        );
        request_log::emit(&line, status, &self.method, self.correlation_id.as_str());
    }
}

impl Drop for RequestObservation {
    fn drop(&mut self) {
        if !self.counted {
            tracing::warn!(
                correlation_id = %self.correlation_id,
                route = %self.route,
                "Request finished without a response"
            );
        }
        self.count();
        self.metrics
            .observe_duration(&self.route, self.started.elapsed().as_secs_f64());
    }
}

const BODY_TOO_LARGE_MESSAGE: &str = "request body too large";

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

/// Observability middleware.
///
/// Must be installed with `Router::layer` so the matched route template is
/// already present in the request extensions.
pub async fn observe_request(
    State(observer): State<Observer>,
    request: Request,
    next: Next,
) -> Response {
    let route = RouteKey::for_request(request.method(), request.extensions().get::<MatchedPath>());
    let mut observation = RequestObservation::start(observer.metrics.clone(), route, &request);
    let correlation_id = observation.correlation_id.clone();

    let scope = ExceptionScope::new(correlation_id.clone(), observer.sink.clone());
    let (mut parts, body) = request.into_parts();
    parts.extensions.insert(correlation_id.clone());
    parts.extensions.insert(scope.clone());

    let mut response = match request_log::read_request_body(body, observer.max_body_size).await {
        Ok((captured, body)) => {
            observation.request_body = String::from_utf8_lossy(&captured).into_owned();
            let span = tracing::info_span!("request", correlation_id = %correlation_id);
            let dispatch = next.run(Request::from_parts(parts, body)).instrument(span);
            let dispatched = AssertUnwindSafe(dispatch).catch_unwind().await;
            match dispatched {
                Ok(response) => response,
                Err(payload) => {
                    scope.report(&AppError::unexpected(format!(
                        "handler panicked: {}",
                        panic_message(&*payload)
                    )));
                    std::panic::resume_unwind(payload)
                }
            }
        }
        Err(e) => {
            tracing::warn!(correlation_id = %correlation_id, error = %e, "Failed to read request body");
            let message = if request_log::exceeds_limit(&e) {
                BODY_TOO_LARGE_MESSAGE
            } else {
                request_log::UNREADABLE_BODY_MESSAGE
            };
            AppError::bad_request(message).into_response()
        }
    };

    if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = response.status();
    response.map(|body| {
        Body::new(CaptureBody::new(body, move |captured: Bytes| {
            observation.complete(status, &captured);
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;
    use axum::{middleware, routing::get, Router};
    use std::sync::Mutex;
    use tower::ServiceExt;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    fn observer() -> Observer {
        Observer::new(HttpMetrics::new().unwrap(), None, 1024)
    }

    async fn panicking_handler() -> &'static str {
        panic!("handler blew up")
    }

    fn app(observer: Observer) -> Router {
        Router::new()
            .route("/items/{id}", get(|| async { "item" }).post(|body: String| async move { body }))
            .route("/gone", get(|| async { (StatusCode::NOT_FOUND, "gone") }))
            .route("/metrics", get(|| async { "# EOF" }))
            .route("/panic", get(panicking_handler))
            .layer(middleware::from_fn_with_state(observer, observe_request))
            .layer(tower_http::catch_panic::CatchPanicLayer::new())
    }

    #[derive(Default)]
    struct RecordingSink {
        reports: Mutex<Vec<(String, String)>>,
    }

    impl ExceptionSink for RecordingSink {
        fn capture(&self, correlation_id: &CorrelationId, error: &AppError) {
            self.reports
                .lock()
                .unwrap()
                .push((correlation_id.to_string(), error.message().to_string()));
        }
    }

    /// Collects `(level, message)` for every event on the `access` target.
    #[derive(Clone, Default)]
    struct AccessEvents(Arc<Mutex<Vec<(Level, String)>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for AccessEvents {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if event.metadata().target() != "access" {
                return;
            }
            let mut visitor = MessageVisitor::default();
            event.record(&mut visitor);
            self.0
                .lock()
                .unwrap()
                .push((*event.metadata().level(), visitor.0));
        }
    }

    #[derive(Default)]
    struct MessageVisitor(String);

    impl tracing::field::Visit for MessageVisitor {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    async fn send(app: Router, request: Request) -> (StatusCode, Bytes, Option<String>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let request_id = response
            .headers()
            .get(X_REQUEST_ID)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body, request_id)
    }

    #[tokio::test]
    async fn test_counts_once_per_template() {
        let observer = observer();
        let app = app(observer.clone());

        for id in [1, 2, 42] {
            let request = HttpRequest::get(format!("/items/{id}")).body(Body::empty()).unwrap();
            let (status, body, _) = send(app.clone(), request).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(&body[..], b"item");
        }

        let text = observer.metrics().render();
        assert!(text.contains(r#"http_requests_total_with_path{url="GET /items/:id"} 3"#));
        assert!(text.contains(r#"http_request_duration_seconds_count{path="GET /items/:id"} 3"#));
        assert!(!text.contains("/items/42"));
    }

    #[tokio::test]
    async fn test_handler_sees_full_request_body() {
        let app = app(observer());
        let request = HttpRequest::post("/items/7")
            .body(Body::from(r#"{"name":"mert"}"#))
            .unwrap();

        let (status, body, _) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], br#"{"name":"mert"}"#);
    }

    #[tokio::test]
    async fn test_correlation_id_header() {
        let app = app(observer());
        let request = HttpRequest::get("/items/1").body(Body::empty()).unwrap();

        let (_, _, request_id) = send(app, request).await;

        assert!(uuid::Uuid::parse_str(&request_id.unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected_and_counted() {
        let observer = Observer::new(HttpMetrics::new().unwrap(), None, 8);
        let app = app(observer.clone());
        let request = HttpRequest::post("/items/1")
            .body(Body::from("0123456789abcdef"))
            .unwrap();

        let (status, body, _) = send(app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(&body[..], br#"{"message":"request body too large"}"#);
        assert!(observer
            .metrics()
            .render()
            .contains(r#"http_requests_total_with_path{url="POST /items/:id"} 1"#));
    }

    #[tokio::test]
    async fn test_panicking_handler_still_counted_once() {
        let observer = observer();
        let app = app(observer.clone());
        let request = HttpRequest::get("/panic").body(Body::empty()).unwrap();

        let (status, _, _) = send(app, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let text = observer.metrics().render();
        assert!(text.contains(r#"http_requests_total_with_path{url="GET /panic"} 1"#));
        assert!(text.contains(r#"http_request_duration_seconds_count{path="GET /panic"} 1"#));
    }

    #[tokio::test]
    async fn test_panic_is_reported_to_sink_once() {
        let sink = Arc::new(RecordingSink::default());
        let observer = Observer::new(HttpMetrics::new().unwrap(), Some(sink.clone()), 1024);
        let app = app(observer);

        let request = HttpRequest::get("/panic").body(Body::empty()).unwrap();
        let (status, _, _) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let request = HttpRequest::get("/items/1").body(Body::empty()).unwrap();
        send(app, request).await;

        let reports = sink.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].1, "handler panicked: handler blew up");
        assert!(uuid::Uuid::parse_str(&reports[0].0).is_ok());
    }

    #[tokio::test]
    async fn test_unreadable_body_is_plain_bad_request() {
        let app = app(observer());
        let chunks = vec![Err::<Bytes, _>(std::io::Error::other("connection reset"))];
        let request = HttpRequest::post("/items/1")
            .body(Body::from_stream(futures_util::stream::iter(chunks)))
            .unwrap();

        let (status, body, _) = send(app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(&body[..], br#"{"message":"bad request"}"#);
    }

    #[tokio::test]
    async fn test_access_lines_follow_status() {
        let events = AccessEvents::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(events.clone()));
        let app = app(observer());

        for uri in ["/items/1", "/gone", "/metrics"] {
            let request = HttpRequest::get(uri).body(Body::empty()).unwrap();
            send(app.clone(), request).await;
        }

        let events = events.0.lock().unwrap();
        assert_eq!(events.len(), 2);

        assert_eq!(events[0].0, Level::INFO);
        assert!(events[0].1.contains("Status: [200], Method: [GET], Url: /items/1"));
        assert!(events[0].1.ends_with("Response Body: item"));

        assert_eq!(events[1].0, Level::ERROR);
        assert!(events[1].1.contains("Status: [404], Method: [GET], Url: /gone"));
        assert!(events[1].1.ends_with("Response Body: gone"));
    }

    #[tokio::test]
    async fn test_body_dropped_unread_is_still_recorded() {
        let observer = observer();
        let app = app(observer.clone());
        let request = HttpRequest::get("/items/5").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        drop(response);

        assert!(observer
            .metrics()
            .render()
            .contains(r#"http_requests_total_with_path{url="GET /items/:id"} 1"#));
    }
}
