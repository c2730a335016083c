//! User entity and the seams around it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::AppError;

/// A stored user.
///
/// Every field defaults when absent from a request body, so a missing `name`
/// reaches the use case as an empty string and fails validation there.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub age: i32,
    #[serde(alias = "createdDate")]
    pub created_date: DateTime<Utc>,
}

/// Business operations on users.
#[async_trait]
pub trait UserUseCase: Send + Sync {
    async fn create_user(&self, user: User) -> Result<User, AppError>;
    async fn get_user_by_id(&self, id: u64) -> Result<User, AppError>;
    async fn update_user(&self, user: User) -> Result<User, AppError>;
    async fn delete_user_by_id(&self, id: u64) -> Result<(), AppError>;
}

/// Persistence by primary key.
///
/// Absence is reported as [`ErrorKind::NotFound`](crate::domain::ErrorKind),
/// any other failure as `Unexpected` carrying the underlying error text.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: User) -> Result<User, AppError>;
    async fn get_user_by_id(&self, id: u64) -> Result<User, AppError>;
    async fn update_user(&self, user: User) -> Result<User, AppError>;
    async fn delete_user_by_id(&self, id: u64) -> Result<(), AppError>;
}
