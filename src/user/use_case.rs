//! User business rules.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{AppError, User, UserRepository, UserUseCase};

pub const EMPTY_NAME_MESSAGE: &str = "The name should not be empty.";

/// Use case implementation over any [`UserRepository`].
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl UserUseCase for UserService {
    /// The creation timestamp is always assigned here; a client-supplied one
    /// is overwritten.
    async fn create_user(&self, mut user: User) -> Result<User, AppError> {
        user.created_date = Utc::now();
        if user.name.is_empty() {
            let err = AppError::validation(EMPTY_NAME_MESSAGE);
            tracing::error!("{}", err.message());
            return Err(err);
        }

        let created = self.repo.create_user(user).await.map_err(|err| {
            tracing::error!("{}", err.message());
            err
        })?;

        tracing::info!("User created. ID: {}", created.id);
        Ok(created)
    }

    async fn get_user_by_id(&self, id: u64) -> Result<User, AppError> {
        self.repo.get_user_by_id(id).await.map_err(|err| {
            tracing::error!("{}", err.message());
            err
        })
    }

    // No existence check: updating an absent id is a save.
    async fn update_user(&self, user: User) -> Result<User, AppError> {
        self.repo.update_user(user).await.map_err(|err| {
            tracing::error!("{}", err.message());
            err
        })
    }

    async fn delete_user_by_id(&self, id: u64) -> Result<(), AppError> {
        self.repo.delete_user_by_id(id).await.map_err(|err| {
            tracing::error!("{}", err.message());
            err
        })
    }
}
