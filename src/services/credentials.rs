// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential broker: picks the credential for a request, refreshes it and
//! writes the renewed token back before handing out an authorized client.

use crate::db::SharedUserStore;
use crate::error::{AppError, Result};
use crate::models::{User, ADMIN_USER_ID};
use crate::services::hr::{AuthorizedClient, HrClient};
use crate::services::oauth::OAuthClient;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Whose credential a request runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// The user's own token.
    Own,
    /// The shared admin token.
    Admin,
}

/// Decide which credential serves `user`. `admin` is the admin record, if one exists.
pub fn resolve_credential(user: &User, admin: Option<&User>) -> Result<CredentialSource> {
    if user.has_credential() {
        return Ok(CredentialSource::Own);
    }
    match admin {
        Some(admin) if admin.has_credential() => Ok(CredentialSource::Admin),
        _ => Err(AppError::NoCredential),
    }
}

/// Shared per-holder refresh locks.
pub type RefreshLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Hands out HR clients authorized with a freshly refreshed token.
#[derive(Clone)]
pub struct CredentialBroker {
    oauth: OAuthClient,
    hr: HrClient,
    store: SharedUserStore,
    /// Per-holder mutex so one refresh-and-save runs at a time for a record.
    refresh_locks: RefreshLocks,
}

impl CredentialBroker {
    pub fn new(oauth: OAuthClient, hr: HrClient, store: SharedUserStore) -> Self {
        Self {
            oauth,
            hr,
            store,
            refresh_locks: Arc::new(DashMap::new()),
        }
    }

    /// Return a client authorized for `user`.
    ///
    /// With a personal token, that token is refreshed and, if it changed,
    /// `user` is updated in place and saved. Without one, the admin record
    /// gets the same treatment. `user` must be saved by the caller only
    /// after this returns, so later writes carry the current token.
    pub async fn authorized_client(&self, user: &mut User) -> Result<AuthorizedClient> {
        let admin = if user.has_credential() {
            None
        } else {
            match self.store.load(ADMIN_USER_ID).await {
                Ok(admin) => Some(admin),
                Err(AppError::NotFound(_)) => None,
                Err(e) => return Err(e),
            }
        };

        let access_token = match (resolve_credential(user, admin.as_ref())?, admin) {
            (CredentialSource::Admin, Some(mut admin)) => {
                tracing::debug!(user_id = %user.user_id, "Using shared admin credential");
                self.refresh_and_persist(&mut admin).await?
            }
            (CredentialSource::Own, _) => self.refresh_and_persist(user).await?,
            (CredentialSource::Admin, None) => return Err(AppError::NoCredential),
        };

        Ok(self.hr.authorize(access_token))
    }

    /// Refresh `holder`'s token and save it when the access token changed.
    async fn refresh_and_persist(&self, holder: &mut User) -> Result<String> {
        let lock = self
            .refresh_locks
            .entry(holder.user_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another task may have refreshed while we waited; start from its token.
        if let Ok(latest) = self.store.load(&holder.user_id).await {
            if latest.has_credential() && latest.credential != holder.credential {
                holder.credential = latest.credential;
            }
        }

        let refreshed = self.oauth.refresh(&holder.credential).await?;

        if refreshed.access_token != holder.credential.access_token {
            holder.credential = refreshed;
            self.store.save(holder).await?;
            tracing::info!(user_id = %holder.user_id, "Access token refreshed and saved");
        }

        Ok(holder.credential.access_token.clone())
    }
}
