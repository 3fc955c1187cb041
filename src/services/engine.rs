// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance reconciliation.
//!
//! Each operation works on one (employee, calendar day) work record:
//! 1. Load the user and obtain an authorized client from the broker
//! 2. Read the day's record when the write depends on it
//! 3. Write a consistent clock-in/clock-out pair (or an absence)
//! 4. Stamp `last_used_at` on the user

use crate::db::SharedUserStore;
use crate::error::{AppError, Result};
use crate::models::{BulkRecord, ReportRow, User, WorkRecordPatch};
use crate::services::credentials::CredentialBroker;
use crate::services::hr::AuthorizedClient;
use crate::time_utils::{civil_offset, civil_today, month_start};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};

/// Provisional shift length written on punch-in, and the fallback used when
/// a stored clock-in cannot precede the punch-out.
pub const PROVISIONAL_SHIFT_HOURS: i64 = 9;

/// Gap used to synthesize a clock-in when the user never punched in.
pub const MISSING_CLOCK_IN_GAP_MINUTES: i64 = 1;

/// Pick the clock-in to write alongside a punch-out.
///
/// - no stored clock-in: one minute before `clock_out`
/// - stored clock-in later than `clock_out` (or unreadable): nine hours before
/// - otherwise the stored clock-in
pub fn resolve_clock_in(
    stored: Option<&str>,
    clock_out: DateTime<FixedOffset>,
) -> DateTime<FixedOffset> {
    let Some(stored) = stored.filter(|s| !s.trim().is_empty()) else {
        return clock_out - Duration::minutes(MISSING_CLOCK_IN_GAP_MINUTES);
    };

    match DateTime::parse_from_rfc3339(stored.trim()) {
        Ok(clock_in) if clock_in <= clock_out => clock_in,
        _ => clock_out - Duration::hours(PROVISIONAL_SHIFT_HOURS),
    }
}

/// Attendance engine shared by chat commands, button actions and reminders.
#[derive(Clone)]
pub struct AttendanceEngine {
    store: SharedUserStore,
    broker: CredentialBroker,
}

impl AttendanceEngine {
    pub fn new(store: SharedUserStore, broker: CredentialBroker) -> Self {
        Self { store, broker }
    }

    /// Punch in at `at`: blind upsert with a provisional nine-hour clock-out.
    pub async fn punch_in(&self, user_id: &str, at: DateTime<FixedOffset>) -> Result<()> {
        let (mut user, client) = self.begin(user_id).await?;

        let clock_in = at.with_timezone(&civil_offset());
        let clock_out = clock_in + Duration::hours(PROVISIONAL_SHIFT_HOURS);
        let date = clock_in.date_naive();

        client
            .put_day(
                &user.employee_id,
                date,
                &WorkRecordPatch::attendance(clock_in, clock_out),
            )
            .await?;

        tracing::info!(user_id, employee_id = %user.employee_id, %date, "Punched in");
        self.finish(&mut user).await
    }

    /// Punch out at `at`, repairing the day's clock-in if it is missing or later.
    pub async fn punch_out(&self, user_id: &str, at: DateTime<FixedOffset>) -> Result<()> {
        let (mut user, client) = self.begin(user_id).await?;

        let clock_out = at.with_timezone(&civil_offset());
        let date = clock_out.date_naive();

        let record = client.get_day(&user.employee_id, date).await?;
        let clock_in = resolve_clock_in(record.clock_in_at.as_deref(), clock_out);
        if record.clock_in_at.is_none() {
            tracing::debug!(user_id, %date, "No clock-in on record, synthesizing one");
        }

        client
            .put_day(
                &user.employee_id,
                date,
                &WorkRecordPatch::attendance(clock_in, clock_out),
            )
            .await?;

        tracing::info!(user_id, employee_id = %user.employee_id, %date, "Punched out");
        self.finish(&mut user).await
    }

    /// Mark today as an absence.
    pub async fn punch_leave(&self, user_id: &str) -> Result<()> {
        self.punch_leave_on(user_id, civil_today()).await
    }

    /// Mark `date` as an absence. Timestamps are left untouched.
    pub async fn punch_leave_on(&self, user_id: &str, date: NaiveDate) -> Result<()> {
        let (mut user, client) = self.begin(user_id).await?;

        client
            .put_day(&user.employee_id, date, &WorkRecordPatch::absence())
            .await?;

        tracing::info!(user_id, employee_id = %user.employee_id, %date, "Marked absence");
        self.finish(&mut user).await
    }

    /// Apply `records` in order, one PUT each.
    ///
    /// Stops at the first bad entry or rejected write; entries already
    /// written stay written. Returns the number of entries applied.
    pub async fn bulk_update(&self, user_id: &str, records: &[BulkRecord]) -> Result<usize> {
        let (mut user, client) = self.begin(user_id).await?;

        for (index, record) in records.iter().enumerate() {
            if let Err(e) = self.apply_entry(&user, &client, record, index + 1).await {
                tracing::warn!(
                    user_id,
                    applied = index,
                    total = records.len(),
                    remote_rejection = e.is_remote_rejection(),
                    error = %e,
                    "Bulk update stopped"
                );
                return Err(e);
            }
        }

        tracing::info!(user_id, applied = records.len(), "Bulk update complete");
        self.finish(&mut user).await?;
        Ok(records.len())
    }

    async fn apply_entry(
        &self,
        user: &User,
        client: &AuthorizedClient,
        record: &BulkRecord,
        ordinal: usize,
    ) -> Result<()> {
        let entry = record.resolve(ordinal)?;
        client
            .put_day(&user.employee_id, entry.date(), &entry.to_patch())
            .await
    }

    /// Month-to-date report for the current civil month.
    pub async fn report(&self, user_id: &str) -> Result<Vec<ReportRow>> {
        self.report_until(user_id, civil_today()).await
    }

    /// Report from the first of `today`'s month through `today`, working days only.
    ///
    /// Any read failure fails the whole report.
    pub async fn report_until(&self, user_id: &str, today: NaiveDate) -> Result<Vec<ReportRow>> {
        let (mut user, client) = self.begin(user_id).await?;

        let mut rows = Vec::new();
        for date in month_start(today).iter_days().take_while(|d| *d <= today) {
            let record = client.get_day(&user.employee_id, date).await?;
            if !record.is_normal_day() {
                continue;
            }
            rows.push(ReportRow::from_record(record, date));
        }

        tracing::info!(user_id, days = rows.len(), "Report generated");
        self.finish(&mut user).await?;
        Ok(rows)
    }

    /// Whether the vendor classifies `date` as a normal working day for the user.
    ///
    /// Any failure counts as "not a working day". Does not touch `last_used_at`.
    pub async fn is_normal_day(&self, user_id: &str, date: NaiveDate) -> bool {
        let (user, client) = match self.begin(user_id).await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::debug!(user_id, error = %e, "Cannot check day pattern");
                return false;
            }
        };

        match client.get_day(&user.employee_id, date).await {
            Ok(record) => record.is_normal_day(),
            Err(e) => {
                tracing::debug!(user_id, error = %e, "Cannot check day pattern");
                false
            }
        }
    }

    async fn begin(&self, user_id: &str) -> Result<(User, AuthorizedClient)> {
        let mut user = self.store.load(user_id).await?;
        if user.is_admin() {
            return Err(AppError::BadRequest(
                "the admin record cannot record attendance".to_string(),
            ));
        }

        let client = self.broker.authorized_client(&mut user).await?;
        Ok((user, client))
    }

    async fn finish(&self, user: &mut User) -> Result<()> {
        user.last_used_at = Some(Utc::now());
        self.store.save(user).await
    }
}
