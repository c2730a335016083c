//! In-memory persistence for users.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::{AppError, User, UserRepository};

/// Concurrent map keyed by user id with a monotonically increasing id
/// sequence starting at 1.
#[derive(Debug)]
pub struct InMemoryUserRepository {
    users: DashMap<u64, User>,
    next_id: AtomicU64,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, mut user: User) -> Result<User, AppError> {
        user.id = self.allocate_id();
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user_by_id(&self, id: u64) -> Result<User, AppError> {
        self.users
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::not_found(format!("User not found, ID: {}", id)))
    }

    /// Save semantics: overwrite by id, insert when absent, allocate an id
    /// when none was given.
    async fn update_user(&self, mut user: User) -> Result<User, AppError> {
        if user.id == 0 {
            user.id = self.allocate_id();
        } else {
            self.next_id.fetch_max(user.id.saturating_add(1), Ordering::Relaxed);
        }
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_user_by_id(&self, id: u64) -> Result<(), AppError> {
        self.users.remove(&id);
        Ok(())
    }
}
