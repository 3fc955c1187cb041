// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User store: one record per chat user, keyed by user ID.

pub mod file;
pub mod memory;

pub use file::FileUserStore;
pub use memory::MemoryUserStore;

use crate::error::{AppError, Result};
use crate::models::User;
use async_trait::async_trait;
use std::sync::Arc;

/// Keyed persistence for [`User`] records.
///
/// There is no cross-call locking: concurrent saves of the same user are
/// last-writer-wins.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Load a user, or `AppError::NotFound`.
    async fn load(&self, user_id: &str) -> Result<User>;

    /// Create or replace the record keyed by `user.user_id`.
    async fn save(&self, user: &User) -> Result<()>;

    /// Remove a user, or `AppError::NotFound`.
    async fn delete(&self, user_id: &str) -> Result<()>;

    /// All stored keys, the admin record included, in ascending order.
    async fn list_user_ids(&self) -> Result<Vec<String>>;
}

pub type SharedUserStore = Arc<dyn UserStore>;

/// Reject keys that cannot be used as a flat storage key.
pub fn validate_user_id(user_id: &str) -> Result<()> {
    let valid = !user_id.is_empty()
        && user_id != "."
        && user_id != ".."
        && !user_id.starts_with('.')
        && !user_id.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("invalid user id '{}'", user_id)))
    }
}
