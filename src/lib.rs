//! User service library: a CRUD API for users wrapped in a request
//! observability and error-mapping pipeline.

pub mod config;
pub mod domain;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod user;

pub use config::AppConfig;
pub use domain::AppError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
