// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod user;
pub mod work_record;

pub use user::{Credential, ReminderSchedule, User, ADMIN_USER_ID};
pub use work_record::{BulkRecord, DayEntry, ReportRow, WorkRecord, WorkRecordPatch, NORMAL_DAY};
