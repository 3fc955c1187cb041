//! User model for storage and chat commands.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage key and employee ID of the shared credential holder.
pub const ADMIN_USER_ID: &str = "admin";

/// A chat identity registered for attendance, stored one record per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Chat user ID (also used as the storage key)
    pub user_id: String,
    /// Channel where prompts and replies are delivered
    pub channel_id: String,
    /// Employee ID in the HR system ("admin" for the shared credential holder)
    pub employee_id: String,
    /// Personal OAuth credential; empty when the user relies on the admin one
    #[serde(default)]
    pub credential: Credential,
    /// Punch reminder schedule
    #[serde(default)]
    pub reminder: ReminderSchedule,
    /// Last successful attendance action
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(
        user_id: impl Into<String>,
        channel_id: impl Into<String>,
        employee_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            channel_id: channel_id.into(),
            employee_id: employee_id.into(),
            credential: Credential::default(),
            reminder: ReminderSchedule::default(),
            last_used_at: None,
        }
    }

    /// The shared credential holder. Its storage key is always [`ADMIN_USER_ID`].
    pub fn admin(channel_id: impl Into<String>, credential: Credential) -> Self {
        Self {
            credential,
            ..Self::new(ADMIN_USER_ID, channel_id, ADMIN_USER_ID)
        }
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    /// True for the reserved shared-credential record.
    pub fn is_admin(&self) -> bool {
        self.user_id == ADMIN_USER_ID || self.employee_id == ADMIN_USER_ID
    }

    /// True when the user carries a personal access token.
    pub fn has_credential(&self) -> bool {
        !self.credential.is_empty()
    }
}

/// OAuth access/refresh token pair.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: String,
    /// When the access token expires, if the token endpoint said so
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &redacted(&self.access_token))
            .field("refresh_token", &redacted(&self.refresh_token))
            .field("token_type", &self.token_type)
            .field("expiry", &self.expiry)
            .finish()
    }
}

fn redacted(token: &str) -> &'static str {
    if token.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

/// Twice-daily punch reminder. Times are wall-clock times in the civil timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSchedule {
    pub enabled: bool,
    #[serde(with = "hhmm")]
    pub am: NaiveTime,
    #[serde(with = "hhmm")]
    pub pm: NaiveTime,
}

impl Default for ReminderSchedule {
    fn default() -> Self {
        Self {
            enabled: true,
            am: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            pm: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
        }
    }
}

/// `NaiveTime` as `"HH:MM"`.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}
