// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory user store for tests and offline runs.

use crate::db::{validate_user_id, UserStore};
use crate::error::{AppError, Result};
use crate::models::User;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// `DashMap`-backed store that counts writes.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<String, User>,
    saves: AtomicUsize,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record without counting it as a save.
    pub fn seed(&self, user: User) {
        self.users.insert(user.user_id.clone(), user);
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Current record, if any, without going through the trait.
    pub fn get(&self, user_id: &str) -> Option<User> {
        self.users.get(user_id).map(|u| u.clone())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn load(&self, user_id: &str) -> Result<User> {
        self.get(user_id)
            .ok_or_else(|| AppError::NotFound(format!("user '{}'", user_id)))
    }

    async fn save(&self, user: &User) -> Result<()> {
        validate_user_id(&user.user_id)?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        self.users
            .remove(user_id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("user '{}'", user_id)))
    }

    async fn list_user_ids(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.users.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}
