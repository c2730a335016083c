//! Per-request correlation identifier.

use std::fmt;

use uuid::Uuid;

/// Response header echoing the correlation id back to the caller.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Opaque id generated once per inbound request.
///
/// Threaded through the exception sink scope and every log line of the
/// request; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a fresh UUID v4 id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
