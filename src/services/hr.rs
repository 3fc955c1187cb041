// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HR vendor client for the per-day work-record resource.
//!
//! Handles:
//! - `GET  /api/v1/employees/{employee_id}/work_records/{YYYY-MM-DD}`
//! - `PUT  /api/v1/employees/{employee_id}/work_records/{YYYY-MM-DD}`
//!
//! Any status other than 200 becomes `AppError::RemoteRequest` carrying the
//! drained response body. Nothing is retried here.

use crate::error::{AppError, Result};
use crate::models::{WorkRecord, WorkRecordPatch};
use chrono::NaiveDate;
use reqwest::StatusCode;
use std::fmt;

/// HR vendor API client.
#[derive(Clone)]
pub struct HrClient {
    http: reqwest::Client,
    base_url: String,
}

impl HrClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Bind an access token to this client.
    pub fn authorize(&self, access_token: String) -> AuthorizedClient {
        AuthorizedClient {
            hr: self.clone(),
            access_token,
        }
    }

    fn record_url(&self, employee_id: &str, date: NaiveDate) -> String {
        format!(
            "{}/api/v1/employees/{}/work_records/{}",
            self.base_url,
            urlencoding::encode(employee_id),
            date.format("%Y-%m-%d")
        )
    }

    /// Fetch the work record for one employee and day.
    pub async fn get_day(
        &self,
        access_token: &str,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<WorkRecord> {
        let url = self.record_url(employee_id, date);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Http(e.to_string()))?;

        let body = self.check_response(response).await?;
        serde_json::from_str(&body)
            .map_err(|e| AppError::Http(format!("JSON parse error: {}", e)))
    }

    /// Write (upsert) the work record for one employee and day.
    pub async fn put_day(
        &self,
        access_token: &str,
        employee_id: &str,
        date: NaiveDate,
        patch: &WorkRecordPatch,
    ) -> Result<()> {
        let url = self.record_url(employee_id, date);

        let response = self
            .http
            .put(&url)
            .bearer_auth(access_token)
            .json(patch)
            .send()
            .await
            .map_err(|e| AppError::Http(e.to_string()))?;

        self.check_response(response).await?;
        tracing::debug!(employee_id, %date, is_absence = patch.is_absence, "Work record written");
        Ok(())
    }

    /// Drain the body and fail unless the status is 200.
    async fn check_response(&self, response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Http(format!("failed to read response body: {}", e)))?;

        if status != StatusCode::OK {
            tracing::warn!(status = status.as_u16(), body = %body, "HR API request rejected");
            return Err(AppError::RemoteRequest {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

/// An [`HrClient`] paired with the access token chosen by the credential broker.
#[derive(Clone)]
pub struct AuthorizedClient {
    hr: HrClient,
    access_token: String,
}

impl AuthorizedClient {
    pub async fn get_day(&self, employee_id: &str, date: NaiveDate) -> Result<WorkRecord> {
        self.hr.get_day(&self.access_token, employee_id, date).await
    }

    pub async fn put_day(
        &self,
        employee_id: &str,
        date: NaiveDate,
        patch: &WorkRecordPatch,
    ) -> Result<()> {
        self.hr
            .put_day(&self.access_token, employee_id, date, patch)
            .await
    }
}

impl fmt::Debug for AuthorizedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedClient")
            .field("base_url", &self.hr.base_url)
            .finish_non_exhaustive()
    }
}
