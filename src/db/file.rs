// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! File-backed user store: `<dir>/<user_id>` holds one JSON document.

use crate::db::{validate_user_id, UserStore};
use crate::error::{AppError, Result};
use crate::models::User;
use async_trait::async_trait;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Flat directory of JSON user records.
#[derive(Debug, Clone)]
pub struct FileUserStore {
    dir: PathBuf,
}

impl FileUserStore {
    /// Open (and create if needed) the store directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Storage(format!("create {}: {}", dir.display(), e)))?;
        tracing::info!(dir = %dir.display(), "Opened user store");
        Ok(Self { dir })
    }

    fn path_for(&self, user_id: &str) -> Result<PathBuf> {
        validate_user_id(user_id)?;
        Ok(self.dir.join(user_id))
    }
}

#[async_trait]
impl UserStore for FileUserStore {
    async fn load(&self, user_id: &str) -> Result<User> {
        let path = self.path_for(user_id)?;
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AppError::NotFound(format!("user '{}'", user_id)));
            }
            Err(e) => return Err(AppError::Storage(format!("read {}: {}", path.display(), e))),
        };

        serde_json::from_slice(&data)
            .map_err(|e| AppError::Storage(format!("decode {}: {}", path.display(), e)))
    }

    async fn save(&self, user: &User) -> Result<()> {
        let path = self.path_for(&user.user_id)?;
        let data = serde_json::to_vec_pretty(user)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JSON error: {}", e)))?;

        // Each write gets its own temp file; the rename publishes it whole.
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || write_atomically(&dir, &path, &data))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("save task failed: {}", e)))??;

        tracing::debug!(user_id = %user.user_id, "User saved");
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        let path = self.path_for(user_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(AppError::NotFound(format!("user '{}'", user_id)))
            }
            Err(e) => Err(AppError::Storage(format!("remove {}: {}", path.display(), e))),
        }
    }

    async fn list_user_ids(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| AppError::Storage(format!("list {}: {}", self.dir.display(), e)))?;

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if validate_user_id(name).is_ok() {
                    ids.push(name.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Write `data` to a fresh hidden temp file in `dir`, then rename it over `path`.
fn write_atomically(dir: &Path, path: &Path, data: &[u8]) -> Result<()> {
    let storage = |what: &str, e: std::io::Error| {
        AppError::Storage(format!("{} {}: {}", what, path.display(), e))
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| storage("create temp for", e))?;
    tmp.write_all(data).map_err(|e| storage("write", e))?;
    tmp.as_file().sync_all().map_err(|e| storage("sync", e))?;
    tmp.persist(path).map_err(|e| storage("rename", e.error))?;
    Ok(())
}
