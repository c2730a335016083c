//! Exception sink collaborator.
//!
//! The sink receives `(correlation id, error)` pairs for offline
//! diagnostics. Its absence is modelled as `None`, which turns every report
//! into a no-op instead of guarding each handler call.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::domain::AppError;
use crate::observability::correlation::CorrelationId;

/// Accepts errors reported at the handler boundary.
pub trait ExceptionSink: Send + Sync {
    fn capture(&self, correlation_id: &CorrelationId, error: &AppError);
}

/// Default sink: forwards each report as an error event on the
/// `exception_sink` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogExceptionSink;

impl ExceptionSink for LogExceptionSink {
    fn capture(&self, correlation_id: &CorrelationId, error: &AppError) {
        tracing::error!(
            target: "exception_sink",
            correlation_id = %correlation_id,
            kind = ?error.kind(),
            error = %error,
            "Exception captured"
        );
    }
}

/// Sink handle bound to one request's correlation id.
///
/// Installed into request extensions by the observability middleware and
/// extracted by handlers. Without the middleware the extractor yields a
/// scope with no sink.
#[derive(Clone)]
pub struct ExceptionScope {
    correlation_id: CorrelationId,
    sink: Option<Arc<dyn ExceptionSink>>,
}

impl ExceptionScope {
    pub fn new(correlation_id: CorrelationId, sink: Option<Arc<dyn ExceptionSink>>) -> Self {
        Self {
            correlation_id,
            sink,
        }
    }

    /// A scope that drops every report.
    pub fn detached() -> Self {
        Self::new(CorrelationId::generate(), None)
    }

    pub fn report(&self, error: &AppError) {
        if let Some(sink) = &self.sink {
            sink.capture(&self.correlation_id, error);
        }
    }
}

impl std::fmt::Debug for ExceptionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExceptionScope")
            .field("correlation_id", &self.correlation_id)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl<S> FromRequestParts<S> for ExceptionScope
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<ExceptionScope>()
            .cloned()
            .unwrap_or_else(ExceptionScope::detached))
    }
}
