//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layer stack)
//!     → TraceLayer (process-wide tracer span)
//!     → observability middleware (per matched route)
//!     → user handlers / metrics endpoint
//!     → Send to client
//! ```

pub mod server;

pub use server::{AppState, HttpServer, ServerError};
