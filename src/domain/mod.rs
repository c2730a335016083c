//! Domain subsystem.
//!
//! # Data Flow
//! ```text
//! repository (persistence failure / absence)
//!     → AppError created at the point of detection
//!     → use case (validation failures, forwards repository errors unchanged)
//!     → handler (binding failures, renders PublicError at the mapped status)
//! ```
//!
//! # Design Decisions
//! - Errors are values: every layer returns `Result<_, AppError>`
//! - Transport types stay out of the entity and the seams, except the
//!   status mapping which belongs to the taxonomy itself

pub mod error;
pub mod user;

pub use error::{AppError, ErrorKind, PublicError};
pub use user::{User, UserRepository, UserUseCase};
