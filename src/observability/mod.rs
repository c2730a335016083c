//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → middleware.rs (orchestrates the per-request pipeline)
//!     → correlation.rs (request-scoped id)
//!     → sink.rs (exception scope handed to handlers)
//!     → capture.rs (response body tee)
//!     → metrics.rs (count + latency by route template)
//!     → request_log.rs (one access line per request)
//!
//! Process-wide:
//!     → logging.rs (subscriber setup)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through logs and the exception sink
//! - Metrics are cheap (atomic increments) and injected, not global
//! - The metrics scrape path is excluded from access logs

pub mod capture;
pub mod correlation;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod request_log;
pub mod sink;

pub use self::correlation::CorrelationId;
pub use self::metrics::{HttpMetrics, RouteKey};
pub use self::middleware::{observe_request, Observer};
pub use self::sink::{ExceptionScope, ExceptionSink, LogExceptionSink};
