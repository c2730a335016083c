//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Count requests per route
//! - Record request latency per route
//! - Render the Prometheus text exposition for `/metrics`
//!
//! # Metrics
//! - `http_requests_total_with_path{url}` (counter): requests by route key
//! - `http_request_duration_seconds{path}` (histogram): latency distribution
//!
//! # Design Decisions
//! - Labels are route templates (`GET /api/v1/users/:id`), never raw paths
//! - The recorder is constructed explicitly and injected, not installed
//!   globally, so each test owns an isolated instance
//! - Mutations go through the exporter's atomic storage; no locking here

use std::fmt;
use std::sync::Arc;

use axum::{extract::MatchedPath, http::Method};
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};

pub const REQUEST_COUNT: &str = "http_requests_total_with_path";
pub const REQUEST_DURATION: &str = "http_request_duration_seconds";

/// Prometheus client default buckets, in seconds.
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Template used when no route matched the request.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Method label for anything outside the standard HTTP methods.
pub const OTHER_METHOD: &str = "OTHER";

/// Normalized `"METHOD template"` metrics label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey(String);

impl RouteKey {
    /// Build a key from a method and an axum route template.
    ///
    /// `{param}` captures are rewritten as `:param`. Extension methods
    /// share the `OTHER` label.
    pub fn new(method: &Method, template: &str) -> Self {
        Self(format!("{} {}", method_label(method), normalize_template(template)))
    }

    /// Key for a request, using the matched route template when the router
    /// found one.
    pub fn for_request(method: &Method, matched: Option<&MatchedPath>) -> Self {
        match matched {
            Some(path) => Self::new(method, path.as_str()),
            None => Self::new(method, UNMATCHED_ROUTE),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn method_label(method: &Method) -> &str {
    match *method {
        Method::GET
        | Method::POST
        | Method::PUT
        | Method::PATCH
        | Method::DELETE
        | Method::HEAD
        | Method::OPTIONS
        | Method::CONNECT
        | Method::TRACE => method.as_str(),
        _ => OTHER_METHOD,
    }
}

fn normalize_template(template: &str) -> String {
    template
        .split('/')
        .map(|segment| {
            match segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
            {
                Some(name) => format!(":{}", name.trim_start_matches('*')),
                None => segment.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Request count and latency aggregates shared by all in-flight requests.
#[derive(Clone)]
pub struct HttpMetrics {
    recorder: Arc<PrometheusRecorder>,
    handle: PrometheusHandle,
}

impl HttpMetrics {
    pub fn new() -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), DURATION_BUCKETS)?
            .build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe_counter!(REQUEST_COUNT, "Number of HTTP requests by path.");
            describe_histogram!(
                REQUEST_DURATION,
                Unit::Seconds,
                "Average response time of HTTP requests."
            );
        });

        Ok(Self {
            recorder: Arc::new(recorder),
            handle,
        })
    }

    pub fn increment_count(&self, route: &RouteKey) {
        metrics::with_local_recorder(self.recorder.as_ref(), || {
            counter!(REQUEST_COUNT, "url" => route.to_string()).increment(1);
        });
    }

    pub fn observe_duration(&self, route: &RouteKey, seconds: f64) {
        metrics::with_local_recorder(self.recorder.as_ref(), || {
            histogram!(REQUEST_DURATION, "path" => route.to_string()).record(seconds);
        });
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl fmt::Debug for HttpMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpMetrics").finish_non_exhaustive()
    }
}
