//! Request/response access logging.
//!
//! # Responsibilities
//! - Read the request body without consuming it for the handler
//! - Format one line per completed request
//! - Classify the line as info (success) or error (everything else)
//!
//! # Design Decisions
//! - The metrics scrape path is never logged; this is not configurable
//! - Bodies are logged lossily as UTF-8

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{Method, StatusCode, Uri},
};
use http_body_util::LengthLimitError;
use tracing::Level;

/// Path excluded from access logging.
pub const METRICS_PATH: &str = "/metrics";

/// Public message for a request body that could not be read.
pub const UNREADABLE_BODY_MESSAGE: &str = "bad request";

/// Read the whole request body and hand back a fresh body holding the same
/// bytes, so downstream extractors still see an unconsumed stream.
pub async fn read_request_body(body: Body, limit: usize) -> Result<(Bytes, Body), axum::Error> {
    let bytes = to_bytes(body, limit).await?;
    Ok((bytes.clone(), Body::from(bytes)))
}

/// Whether a body read failed because the body was over the size limit,
/// as opposed to a broken stream.
pub fn exceeds_limit(err: &axum::Error) -> bool {
    std::iter::successors(
        Some(err as &(dyn std::error::Error + 'static)),
        |e| e.source(),
    )
    .any(|e| e.is::<LengthLimitError>())
}

/// Format the access line for a completed exchange.
///
/// Returns an empty string for the metrics scrape path.
pub fn format(
    status: StatusCode,
    method: &Method,
    uri: &Uri,
    request_body: &str,
    response_body: &str,
    correlation_id: &str,
) -> String {
    if uri.path() == METRICS_PATH {
        return String::new();
    }

    format!(
        "[Request ID: {}], Status: [{}], Method: [{}], Url: {} Request Body: {}, Response Body: {}",
        correlation_id,
        status.as_u16(),
        method,
        uri,
        request_body,
        response_body
    )
}

pub fn is_success_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED | StatusCode::NO_CONTENT
    )
}

pub fn level_for(status: StatusCode) -> Level {
    if is_success_status(status) {
        Level::INFO
    } else {
        Level::ERROR
    }
}

/// Emit a formatted line at the level its status calls for. Empty lines are
/// dropped.
pub fn emit(line: &str, status: StatusCode, method: &Method, correlation_id: &str) {
    if line.is_empty() {
        return;
    }

    if level_for(status) == Level::INFO {
        tracing::info!(
            target: "access",
            correlation_id,
            status = status.as_u16(),
            method = %method,
            "{line}"
        );
    } else {
        tracing::error!(
            target: "access",
            correlation_id,
            status = status.as_u16(),
            method = %method,
            "{line}"
        );
    }
}
