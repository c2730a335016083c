//! User resource.
//!
//! # Data Flow
//! ```text
//! handler.rs (bind request, render AppError, report to sink)
//!     → use_case.rs (validation, logging, delegation)
//!     → repository.rs (storage by primary key)
//! ```

pub mod handler;
pub mod repository;
pub mod use_case;

pub use handler::UserHandler;
pub use repository::InMemoryUserRepository;
pub use use_case::UserService;
