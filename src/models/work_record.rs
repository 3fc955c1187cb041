// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! HR vendor work-record shapes and the bulk-update entry model.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, Result};
use crate::time_utils::{format_rfc3339, parse_record_time};

/// Day pattern the vendor assigns to ordinary working days.
pub const NORMAL_DAY: &str = "normal_day";

/// One employee's attendance for one calendar day, as returned by the vendor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkRecord {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub clock_in_at: Option<String>,
    #[serde(default)]
    pub clock_out_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_absence: bool,
    /// Vendor day classification ("normal_day", "prescribed_holiday", ...)
    #[serde(default)]
    pub day_pattern: Option<String>,
}

impl WorkRecord {
    pub fn is_normal_day(&self) -> bool {
        self.day_pattern.as_deref() == Some(NORMAL_DAY)
    }
}

fn null_as_false<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(d)?.unwrap_or(false))
}

/// Body of a work-record PUT.
///
/// Attendance writes carry both timestamps and an empty break list;
/// absence writes carry only `is_absence: true`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkRecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_records: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock_in_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock_out_at: Option<String>,
    pub is_absence: bool,
}

impl WorkRecordPatch {
    pub fn attendance(clock_in: DateTime<FixedOffset>, clock_out: DateTime<FixedOffset>) -> Self {
        Self {
            break_records: Some(Vec::new()),
            clock_in_at: Some(format_rfc3339(clock_in)),
            clock_out_at: Some(format_rfc3339(clock_out)),
            is_absence: false,
        }
    }

    pub fn absence() -> Self {
        Self {
            break_records: None,
            clock_in_at: None,
            clock_out_at: None,
            is_absence: true,
        }
    }
}

/// One validated bulk-update entry.
#[derive(Debug, Clone, PartialEq)]
pub enum DayEntry {
    Absence {
        date: NaiveDate,
    },
    Present {
        date: NaiveDate,
        clock_in: DateTime<FixedOffset>,
        clock_out: DateTime<FixedOffset>,
    },
}

impl DayEntry {
    pub fn date(&self) -> NaiveDate {
        match self {
            DayEntry::Absence { date } | DayEntry::Present { date, .. } => *date,
        }
    }

    pub fn to_patch(&self) -> WorkRecordPatch {
        match self {
            DayEntry::Absence { .. } => WorkRecordPatch::absence(),
            DayEntry::Present {
                clock_in,
                clock_out,
                ..
            } => WorkRecordPatch::attendance(*clock_in, *clock_out),
        }
    }
}

/// Bulk-update entry as received: `{date, in, out, off}`, all optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkRecord {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, rename = "in")]
    pub clock_in: Option<String>,
    #[serde(default, rename = "out")]
    pub clock_out: Option<String>,
    #[serde(default)]
    pub off: Option<bool>,
}

impl BulkRecord {
    /// Validate this entry. `ordinal` is its 1-based position, used in the error.
    pub fn resolve(&self, ordinal: usize) -> Result<DayEntry> {
        let entry_error = || AppError::BatchEntry { ordinal };

        let date = self
            .date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
            .ok_or_else(entry_error)?;

        if self.off.unwrap_or(false) {
            return Ok(DayEntry::Absence { date });
        }

        let clock_in = parse_record_time(self.clock_in.as_deref().unwrap_or(""), date)
            .map_err(|_| entry_error())?;
        let clock_out = parse_record_time(self.clock_out.as_deref().unwrap_or(""), date)
            .map_err(|_| entry_error())?;

        Ok(DayEntry::Present {
            date,
            clock_in,
            clock_out,
        })
    }
}

/// One line of the month-to-date report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub date: String,
    #[serde(rename = "in")]
    pub clock_in: Option<String>,
    #[serde(rename = "out")]
    pub clock_out: Option<String>,
    pub off: bool,
}

impl ReportRow {
    /// Build a row from the vendor record fetched for `date`.
    pub fn from_record(record: WorkRecord, date: NaiveDate) -> Self {
        Self {
            date: record
                .date
                .unwrap_or_else(|| date.format("%Y-%m-%d").to_string()),
            clock_in: record.clock_in_at,
            clock_out: record.clock_out_at,
            off: record.is_absence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(json: serde_json::Value) -> BulkRecord {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_absence_patch_has_no_timestamps() {
        let json = serde_json::to_value(WorkRecordPatch::absence()).unwrap();
        assert_eq!(json, serde_json::json!({"is_absence": true}));
    }

    #[test]
    fn test_attendance_patch_shape() {
        let clock_in = DateTime::parse_from_rfc3339("2024-01-10T09:00:00+09:00").unwrap();
        let clock_out = DateTime::parse_from_rfc3339("2024-01-10T18:00:00+09:00").unwrap();
        let json = serde_json::to_value(WorkRecordPatch::attendance(clock_in, clock_out)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "break_records": [],
                "clock_in_at": "2024-01-10T09:00:00+09:00",
                "clock_out_at": "2024-01-10T18:00:00+09:00",
                "is_absence": false
            })
        );
    }

    #[test]
    fn test_off_ignores_times() {
        let entry = bulk(serde_json::json!({"date": "2024-01-10", "off": true, "in": "junk"}))
            .resolve(1)
            .unwrap();
        assert_eq!(
            entry,
            DayEntry::Absence {
                date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
            }
        );
    }

    #[test]
    fn test_present_accepts_mixed_forms() {
        let entry = bulk(serde_json::json!({
            "date": "2024-01-10",
            "in": "0930",
            "out": "2024-01-10T18:45:00+09:00"
        }))
        .resolve(1)
        .unwrap();
        let patch = entry.to_patch();
        assert_eq!(
            patch.clock_in_at.as_deref(),
            Some("2024-01-10T09:30:00+09:00")
        );
        assert_eq!(
            patch.clock_out_at.as_deref(),
            Some("2024-01-10T18:45:00+09:00")
        );
    }

    #[test]
    fn test_missing_date_reports_ordinal() {
        let err = bulk(serde_json::json!({"in": "09:00", "out": "18:00"}))
            .resolve(3)
            .unwrap_err();
        assert!(matches!(err, AppError::BatchEntry { ordinal: 3 }));
    }

    #[test]
    fn test_bad_out_reports_same_ordinal() {
        let err = bulk(serde_json::json!({"date": "2024-01-10", "in": "09:00", "out": "late"}))
            .resolve(2)
            .unwrap_err();
        assert!(matches!(err, AppError::BatchEntry { ordinal: 2 }));
    }

    #[test]
    fn test_null_absence_flag() {
        let record: WorkRecord = serde_json::from_value(serde_json::json!({
            "date": "2024-01-10",
            "clock_in_at": null,
            "is_absence": null,
            "day_pattern": "normal_day"
        }))
        .unwrap();
        assert!(!record.is_absence);
        assert!(record.is_normal_day());
    }
}
