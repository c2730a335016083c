//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → drain in-flight → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config, logging, state, then listener
//! - Shutdown has timeout: forced exit after the grace window

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
