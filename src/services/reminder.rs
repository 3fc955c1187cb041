// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Minute-granularity punch reminders.
//!
//! The loop wakes at the start of every civil minute, and each user whose
//! AM or PM reminder time equals that minute gets the punch prompt. A minute
//! that is slept through is not caught up.

use crate::db::SharedUserStore;
use crate::error::Result;
use crate::models::{ReminderSchedule, User};
use crate::services::chat::SharedNotifier;
use crate::services::engine::AttendanceEngine;
use crate::time_utils::{civil_offset, now_civil};
use chrono::{DateTime, DurationRound, FixedOffset, TimeDelta, Timelike};
use futures_util::{stream, StreamExt};
use std::sync::Mutex;

const MAX_CONCURRENT_PROMPTS: usize = 16;

/// True when `now` falls in the same civil hour:minute as one of the schedule's times.
pub fn is_reminder_due(now: DateTime<FixedOffset>, schedule: &ReminderSchedule) -> bool {
    if !schedule.enabled {
        return false;
    }
    let now = now.with_timezone(&civil_offset());
    [schedule.am, schedule.pm]
        .iter()
        .any(|t| t.hour() == now.hour() && t.minute() == now.minute())
}

/// Time left until the next whole minute after `now`.
pub fn until_next_minute(now: DateTime<FixedOffset>) -> std::time::Duration {
    let into_minute = u64::from(now.second()) * 1_000 + u64::from(now.timestamp_subsec_millis());
    std::time::Duration::from_millis(60_000u64.saturating_sub(into_minute).max(1))
}

/// Periodic reminder task.
pub struct ReminderScheduler {
    store: SharedUserStore,
    notifier: SharedNotifier,
    /// When set, users are only reminded on the vendor's normal working days.
    workday_filter: Option<AttendanceEngine>,
    last_minute: Mutex<Option<DateTime<FixedOffset>>>,
}

impl ReminderScheduler {
    pub fn new(store: SharedUserStore, notifier: SharedNotifier) -> Self {
        Self {
            store,
            notifier,
            workday_filter: None,
            last_minute: Mutex::new(None),
        }
    }

    /// Skip users for whom today is not a normal working day.
    pub fn with_workday_filter(mut self, engine: AttendanceEngine) -> Self {
        self.workday_filter = Some(engine);
        self
    }

    /// Run forever, ticking at each minute boundary.
    pub async fn run(self) {
        tracing::info!("Reminder scheduler started");
        loop {
            tokio::time::sleep(until_next_minute(now_civil())).await;
            match self.tick(now_civil()).await {
                Ok(0) => {}
                Ok(sent) => tracing::info!(sent, "Reminders sent"),
                Err(e) => tracing::error!(error = %e, "Reminder tick failed"),
            }
        }
    }

    /// Process one tick at `now`; returns how many prompts were posted.
    ///
    /// A second tick within an already processed minute does nothing.
    pub async fn tick(&self, now: DateTime<FixedOffset>) -> Result<usize> {
        let minute = now
            .with_timezone(&civil_offset())
            .duration_trunc(TimeDelta::minutes(1))
            .unwrap_or(now);
        {
            let mut last = self.last_minute.lock().unwrap_or_else(|e| e.into_inner());
            if *last == Some(minute) {
                return Ok(0);
            }
            *last = Some(minute);
        }

        let mut due = Vec::new();
        for user_id in self.store.list_user_ids().await? {
            let user = match self.store.load(&user_id).await {
                Ok(user) => user,
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Skipping unreadable user");
                    continue;
                }
            };
            if user.is_admin() || !is_reminder_due(minute, &user.reminder) {
                continue;
            }
            if let Some(engine) = &self.workday_filter {
                if !engine.is_normal_day(&user.user_id, minute.date_naive()).await {
                    tracing::debug!(user_id = %user.user_id, "Not a working day, no reminder");
                    continue;
                }
            }
            due.push(user);
        }

        let sent = stream::iter(due)
            .map(|user| self.prompt(user))
            .buffer_unordered(MAX_CONCURRENT_PROMPTS)
            .filter(|ok| std::future::ready(*ok))
            .count()
            .await;

        Ok(sent)
    }

    async fn prompt(&self, user: User) -> bool {
        match self.notifier.post_punch_prompt(&user.channel_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(user_id = %user.user_id, error = %e, "Failed to post reminder");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn schedule() -> ReminderSchedule {
        ReminderSchedule {
            enabled: true,
            am: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            pm: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_due_exactly_at_configured_minutes() {
        assert!(is_reminder_due(at("2024-01-10T09:00:00+09:00"), &schedule()));
        assert!(is_reminder_due(at("2024-01-10T09:00:59+09:00"), &schedule()));
        assert!(is_reminder_due(at("2024-01-10T17:00:00+09:00"), &schedule()));
        assert!(!is_reminder_due(at("2024-01-10T09:01:00+09:00"), &schedule()));
        assert!(!is_reminder_due(at("2024-01-10T08:59:00+09:00"), &schedule()));
    }

    #[test]
    fn test_compares_in_civil_time() {
        // 00:00 UTC is 09:00 civil.
        assert!(is_reminder_due(at("2024-01-10T00:00:00Z"), &schedule()));
        assert!(!is_reminder_due(at("2024-01-10T09:00:00Z"), &schedule()));
    }

    #[test]
    fn test_disabled_never_due() {
        let disabled = ReminderSchedule {
            enabled: false,
            ..schedule()
        };
        assert!(!is_reminder_due(at("2024-01-10T09:00:00+09:00"), &disabled));
    }

    #[test]
    fn test_until_next_minute() {
        assert_eq!(
            until_next_minute(at("2024-01-10T09:00:45+09:00")),
            std::time::Duration::from_secs(15)
        );
        assert_eq!(
            until_next_minute(at("2024-01-10T09:00:00+09:00")),
            std::time::Duration::from_secs(60)
        );
    }
}
