// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Chat command parsing and execution.
//!
//! The transport hands over the sender, the channel and the raw text; the
//! handler returns the reply to show, or `None` when nothing should be said.
//! Reports and bulk updates run in a spawned task and post their result to
//! the channel when done.

use crate::db::SharedUserStore;
use crate::error::{AppError, Result};
use crate::models::{BulkRecord, ReminderSchedule, ReportRow, User, ADMIN_USER_ID};
use crate::services::chat::SharedNotifier;
use crate::services::engine::AttendanceEngine;
use crate::services::oauth::{OAuthClient, AUTHORIZATION_CODE_LEN};
use crate::time_utils::{civil_offset, civil_today, format_utc_rfc3339, normalize, now_civil};
use chrono::{DateTime, FixedOffset, NaiveTime};

pub const MSG_INVALID_PARAMETERS: &str = "Invalid parameters.";
pub const MSG_INVALID_CODE: &str = "Invalid authorization code.";
pub const MSG_PUNCHED_IN: &str = ":ok: You have punched in for today.";
pub const MSG_PUNCHED_OUT: &str = ":ok: You have punched out for today.";
pub const MSG_LEAVE: &str = ":ok: You are off today. Enjoy :tada:";

pub const HELP_MESSAGE: &str = "```
Usage:
	Integration:
		auth
		add [emp_id] [auth_code]
		admin add [auth_code]

	Deintegration:
		remove

	Check In:
		in
		in now
		in 0930

	Check Out:
		out
		out now
		out 1810

	Off:
		leave
		off

	Monthly report:
		report

	Bulk update:
		bulk [{\"date\":\"2024-01-10\",\"in\":\"09:00\",\"out\":\"18:00\"},{\"date\":\"2024-01-11\",\"off\":true}]

	Reminder:
		reminder on
		reminder off
		reminder 09:00 17:00

	Debug:
		me
		ping
```";

/// Which attendance action a punch performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunchKind {
    In,
    Out,
    Leave,
}

impl PunchKind {
    fn success_message(self) -> &'static str {
        match self {
            PunchKind::In => MSG_PUNCHED_IN,
            PunchKind::Out => MSG_PUNCHED_OUT,
            PunchKind::Leave => MSG_LEAVE,
        }
    }
}

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Auth,
    Register {
        employee_id: String,
        code: Option<String>,
    },
    AdminRegister {
        code: String,
    },
    Unregister,
    /// Bare `in` / `out`: show the button prompt.
    Prompt,
    Punch {
        kind: PunchKind,
        time: String,
    },
    Leave,
    Report,
    Bulk(String),
    Reminder(ReminderChange),
    Me,
    Ping,
    Help,
    /// Recognised command with unusable arguments; carries the reply.
    Invalid(&'static str),
}

impl Command {
    /// Commands that touch a registration or attendance are only taken from
    /// direct-message channels.
    pub fn requires_direct_message(&self) -> bool {
        !matches!(self, Command::Me | Command::Ping | Command::Help)
    }
}

/// Direct-message channel IDs start with `D`.
pub fn is_direct_message_channel(channel_id: &str) -> bool {
    channel_id.starts_with('D')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderChange {
    Enable(bool),
    Times { am: NaiveTime, pm: NaiveTime },
}

/// Parse chat text. `None` means the text is not addressed to us.
pub fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim();
    let words: Vec<&str> = text.split_whitespace().collect();
    let (&head, args) = words.split_first()?;

    let command = match (head, args) {
        ("auth", []) => Command::Auth,
        ("register" | "add", [employee_id]) => Command::Register {
            employee_id: employee_id.to_string(),
            code: None,
        },
        ("register" | "add", [employee_id, code]) => {
            if code.chars().count() != AUTHORIZATION_CODE_LEN {
                Command::Invalid(MSG_INVALID_CODE)
            } else {
                Command::Register {
                    employee_id: employee_id.to_string(),
                    code: Some(code.to_string()),
                }
            }
        }
        ("register" | "add", _) => Command::Invalid(MSG_INVALID_PARAMETERS),
        ("admin", [sub, rest @ ..]) if matches!(*sub, "register" | "add") => match rest {
            [code] if code.chars().count() == AUTHORIZATION_CODE_LEN => Command::AdminRegister {
                code: code.to_string(),
            },
            [_] => Command::Invalid(MSG_INVALID_CODE),
            _ => Command::Invalid(MSG_INVALID_PARAMETERS),
        },
        ("unregister" | "remove", []) => Command::Unregister,
        ("in" | "out", []) => Command::Prompt,
        ("in" | "out", [time]) => Command::Punch {
            kind: if head == "in" {
                PunchKind::In
            } else {
                PunchKind::Out
            },
            time: time.to_string(),
        },
        ("in" | "out", _) => Command::Invalid(MSG_INVALID_PARAMETERS),
        ("leave" | "off", []) => Command::Leave,
        ("report", []) => Command::Report,
        ("bulk", [_, ..]) => Command::Bulk(text[head.len()..].trim().to_string()),
        ("bulk", []) => Command::Invalid(MSG_INVALID_PARAMETERS),
        ("reminder", ["on"]) => Command::Reminder(ReminderChange::Enable(true)),
        ("reminder", ["off"]) => Command::Reminder(ReminderChange::Enable(false)),
        ("reminder", [am, pm]) => {
            match (
                crate::time_utils::parse_clock_time(am),
                crate::time_utils::parse_clock_time(pm),
            ) {
                (Some(am), Some(pm)) => Command::Reminder(ReminderChange::Times { am, pm }),
                _ => Command::Invalid(MSG_INVALID_PARAMETERS),
            }
        }
        ("reminder", _) => Command::Invalid(MSG_INVALID_PARAMETERS),
        ("me", []) => Command::Me,
        ("ping", []) => Command::Ping,
        ("help", []) => Command::Help,
        _ => return None,
    };
    Some(command)
}

/// Executes chat commands against the store, the engine and the OAuth client.
#[derive(Clone)]
pub struct CommandHandler {
    store: SharedUserStore,
    engine: AttendanceEngine,
    oauth: OAuthClient,
    notifier: SharedNotifier,
}

impl CommandHandler {
    pub fn new(
        store: SharedUserStore,
        engine: AttendanceEngine,
        oauth: OAuthClient,
        notifier: SharedNotifier,
    ) -> Self {
        Self {
            store,
            engine,
            oauth,
            notifier,
        }
    }

    /// Handle one message from `user_id` in `channel_id`.
    pub async fn handle(&self, user_id: &str, channel_id: &str, text: &str) -> Option<String> {
        let command = parse_command(text)?;
        if command.requires_direct_message() && !is_direct_message_channel(channel_id) {
            tracing::debug!(
                user_id,
                channel_id,
                command = command_name(&command),
                "Ignoring command outside a direct message"
            );
            return None;
        }
        tracing::debug!(user_id, command = command_name(&command), "Handling command");

        let reply = match command {
            Command::Auth => Ok(format!(
                "Please open the following URL in your browser:\n{}",
                self.oauth.authorize_url()
            )),
            Command::Register { employee_id, code } => {
                self.register(user_id, channel_id, &employee_id, code.as_deref())
                    .await
            }
            Command::AdminRegister { code } => self.register_admin(channel_id, &code).await,
            Command::Unregister => self.unregister(user_id).await,
            Command::Prompt => {
                return match self.notifier.post_punch_prompt(channel_id).await {
                    Ok(()) => None,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to post punch prompt");
                        Some(e.user_message())
                    }
                };
            }
            Command::Punch { kind, time } => {
                let now = now_civil();
                match normalize(&time, civil_today(), now) {
                    Ok(instant) => Ok(self.handle_punch(user_id, kind, Some(instant)).await),
                    Err(e) => Err(e),
                }
            }
            Command::Leave => Ok(self.handle_punch(user_id, PunchKind::Leave, None).await),
            Command::Report => Ok(self.spawn_report(user_id, channel_id)),
            Command::Bulk(json) => self.spawn_bulk(user_id, channel_id, &json),
            Command::Reminder(change) => self.update_reminder(user_id, change).await,
            Command::Me => self.describe(user_id).await,
            Command::Ping => Ok("pong".to_string()),
            Command::Help => Ok(HELP_MESSAGE.to_string()),
            Command::Invalid(reply) => Ok(reply.to_string()),
        };

        Some(reply.unwrap_or_else(|e| {
            tracing::error!(user_id, error = %e, "Command failed");
            e.user_message()
        }))
    }

    /// Punch for `user_id` and return the message to show.
    ///
    /// `instant` defaults to now. For leave only its civil date is used.
    pub async fn handle_punch(
        &self,
        user_id: &str,
        kind: PunchKind,
        instant: Option<DateTime<FixedOffset>>,
    ) -> String {
        let at = instant.unwrap_or_else(now_civil);
        let result = match kind {
            PunchKind::In => self.engine.punch_in(user_id, at).await,
            PunchKind::Out => self.engine.punch_out(user_id, at).await,
            PunchKind::Leave => {
                let date = at.with_timezone(&civil_offset()).date_naive();
                self.engine.punch_leave_on(user_id, date).await
            }
        };

        match result {
            Ok(()) => kind.success_message().to_string(),
            Err(e) => {
                tracing::error!(user_id, ?kind, error = %e, "Punch failed");
                e.user_message()
            }
        }
    }

    async fn register(
        &self,
        user_id: &str,
        channel_id: &str,
        employee_id: &str,
        code: Option<&str>,
    ) -> Result<String> {
        if employee_id == ADMIN_USER_ID || user_id == ADMIN_USER_ID {
            return Ok(MSG_INVALID_PARAMETERS.to_string());
        }

        let mut user = User::new(user_id, channel_id, employee_id);
        if let Ok(existing) = self.store.load(user_id).await {
            user.reminder = existing.reminder;
            user.last_used_at = existing.last_used_at;
        }

        let reply = match code {
            Some(code) => {
                user.credential = self.oauth.exchange_code(code).await?;
                ":ok: Saved your access token successfully."
            }
            None => ":ok: Saved your employee ID successfully.",
        };

        self.store.save(&user).await?;
        tracing::info!(user_id, employee_id, with_token = code.is_some(), "User registered");
        Ok(reply.to_string())
    }

    async fn register_admin(&self, channel_id: &str, code: &str) -> Result<String> {
        let credential = self.oauth.exchange_code(code).await?;
        self.store.save(&User::admin(channel_id, credential)).await?;
        tracing::info!("Admin credential registered");
        Ok(":ok: Saved the admin access token successfully.".to_string())
    }

    async fn unregister(&self, user_id: &str) -> Result<String> {
        if user_id == ADMIN_USER_ID {
            return Ok(MSG_INVALID_PARAMETERS.to_string());
        }
        match self.store.delete(user_id).await {
            Ok(()) => {
                tracing::info!(user_id, "User unregistered");
                Ok(format!(":ok: '{}' was removed successfully.", user_id))
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to unregister");
                Ok(format!(":warning: Failed to remove '{}'.", user_id))
            }
        }
    }

    async fn update_reminder(&self, user_id: &str, change: ReminderChange) -> Result<String> {
        let mut user = self.store.load(user_id).await?;
        match change {
            ReminderChange::Enable(enabled) => user.reminder.enabled = enabled,
            ReminderChange::Times { am, pm } => {
                user.reminder = ReminderSchedule {
                    enabled: true,
                    am,
                    pm,
                }
            }
        }
        self.store.save(&user).await?;

        let reminder = user.reminder;
        Ok(if reminder.enabled {
            format!(
                ":ok: Reminder enabled at {} and {}.",
                reminder.am.format("%H:%M"),
                reminder.pm.format("%H:%M")
            )
        } else {
            ":ok: Reminder disabled.".to_string()
        })
    }

    async fn describe(&self, user_id: &str) -> Result<String> {
        let user = self.store.load(user_id).await?;
        let reminder = if user.reminder.enabled {
            format!(
                "{} / {}",
                user.reminder.am.format("%H:%M"),
                user.reminder.pm.format("%H:%M")
            )
        } else {
            "off".to_string()
        };
        Ok(format!(
            "user: {}\nchannel: {}\nemployee: {}\ncredential: {}\nreminder: {}\nlast used: {}",
            user.user_id,
            user.channel_id,
            user.employee_id,
            if user.has_credential() {
                "personal"
            } else {
                "shared"
            },
            reminder,
            user.last_used_at
                .map(format_utc_rfc3339)
                .unwrap_or_else(|| "never".to_string()),
        ))
    }

    fn spawn_report(&self, user_id: &str, channel_id: &str) -> String {
        let handler = self.clone();
        let user_id = user_id.to_string();
        let channel_id = channel_id.to_string();

        tokio::spawn(async move {
            let text = match handler.engine.report(&user_id).await {
                Ok(rows) => format_report(&rows),
                Err(e) => {
                    tracing::error!(user_id = %user_id, error = %e, "Report failed");
                    e.user_message()
                }
            };
            handler.deliver(&channel_id, &text).await;
        });

        ":hourglass_flowing_sand: Generating your report...".to_string()
    }

    fn spawn_bulk(&self, user_id: &str, channel_id: &str, json: &str) -> Result<String> {
        let records: Vec<BulkRecord> = serde_json::from_str(json)
            .map_err(|e| AppError::BadRequest(format!("bulk records must be a JSON array: {}", e)))?;

        let handler = self.clone();
        let user_id = user_id.to_string();
        let channel_id = channel_id.to_string();
        let total = records.len();

        tokio::spawn(async move {
            let text = match handler.engine.bulk_update(&user_id, &records).await {
                Ok(applied) => format!(":ok: Updated {} record(s).", applied),
                Err(e) => e.user_message(),
            };
            handler.deliver(&channel_id, &text).await;
        });

        Ok(format!(
            ":hourglass_flowing_sand: Updating {} record(s)...",
            total
        ))
    }

    async fn deliver(&self, channel_id: &str, text: &str) {
        if let Err(e) = self.notifier.post_message(channel_id, text).await {
            tracing::error!(channel_id, error = %e, "Failed to deliver result");
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Auth => "auth",
        Command::Register { .. } => "register",
        Command::AdminRegister { .. } => "admin_register",
        Command::Unregister => "unregister",
        Command::Prompt => "prompt",
        Command::Punch { .. } => "punch",
        Command::Leave => "leave",
        Command::Report => "report",
        Command::Bulk(_) => "bulk",
        Command::Reminder(_) => "reminder",
        Command::Me => "me",
        Command::Ping => "ping",
        Command::Help => "help",
        Command::Invalid(_) => "invalid",
    }
}

/// Render report rows as a fixed-width table.
pub fn format_report(rows: &[ReportRow]) -> String {
    if rows.is_empty() {
        return "No working days recorded this month.".to_string();
    }

    let mut out = String::from("```\ndate        in     out\n");
    for row in rows {
        if row.off {
            out.push_str(&format!("{}  off\n", row.date));
        } else {
            out.push_str(&format!(
                "{}  {}  {}\n",
                row.date,
                clock_label(row.clock_in.as_deref()),
                clock_label(row.clock_out.as_deref())
            ));
        }
    }
    out.push_str("```");
    out
}

fn clock_label(stamp: Option<&str>) -> String {
    match stamp.map(DateTime::parse_from_rfc3339) {
        Some(Ok(t)) => t.with_timezone(&civil_offset()).format("%H:%M").to_string(),
        Some(Err(_)) => stamp.unwrap_or_default().to_string(),
        None => "--:--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> String {
        "c".repeat(AUTHORIZATION_CODE_LEN)
    }

    #[test]
    fn test_parse_punch_commands() {
        assert_eq!(parse_command("in"), Some(Command::Prompt));
        assert_eq!(parse_command(" out "), Some(Command::Prompt));
        assert_eq!(
            parse_command("in 0930"),
            Some(Command::Punch {
                kind: PunchKind::In,
                time: "0930".to_string()
            })
        );
        assert_eq!(
            parse_command("out now"),
            Some(Command::Punch {
                kind: PunchKind::Out,
                time: "now".to_string()
            })
        );
        assert_eq!(
            parse_command("in 09 30"),
            Some(Command::Invalid(MSG_INVALID_PARAMETERS))
        );
        assert_eq!(parse_command("off"), Some(Command::Leave));
        assert_eq!(parse_command("inbox"), None);
    }

    #[test]
    fn test_parse_register() {
        assert_eq!(
            parse_command("add 1001"),
            Some(Command::Register {
                employee_id: "1001".to_string(),
                code: None
            })
        );
        assert_eq!(
            parse_command(&format!("register 1001 {}", code())),
            Some(Command::Register {
                employee_id: "1001".to_string(),
                code: Some(code())
            })
        );
        assert_eq!(
            parse_command("add 1001 short"),
            Some(Command::Invalid(MSG_INVALID_CODE))
        );
        assert_eq!(
            parse_command("add"),
            Some(Command::Invalid(MSG_INVALID_PARAMETERS))
        );
        assert_eq!(
            parse_command(&format!("admin add {}", code())),
            Some(Command::AdminRegister { code: code() })
        );
        assert_eq!(
            parse_command("admin register"),
            Some(Command::Invalid(MSG_INVALID_PARAMETERS))
        );
    }

    #[test]
    fn test_direct_message_gating() {
        assert!(is_direct_message_channel("D024BE91L"));
        assert!(!is_direct_message_channel("C024BE91L"));
        assert!(parse_command("add 1001").unwrap().requires_direct_message());
        assert!(parse_command("in now").unwrap().requires_direct_message());
        assert!(!parse_command("ping").unwrap().requires_direct_message());
        assert!(!parse_command("me").unwrap().requires_direct_message());
    }

    #[test]
    fn test_parse_bulk_keeps_json_intact() {
        let text = r#"bulk [{"date": "2024-01-10", "off": true}]"#;
        assert_eq!(
            parse_command(text),
            Some(Command::Bulk(r#"[{"date": "2024-01-10", "off": true}]"#.to_string()))
        );
    }

    #[test]
    fn test_parse_reminder() {
        assert_eq!(
            parse_command("reminder 08:30 1815"),
            Some(Command::Reminder(ReminderChange::Times {
                am: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
                pm: NaiveTime::from_hms_opt(18, 15, 0).unwrap(),
            }))
        );
        assert_eq!(
            parse_command("reminder off"),
            Some(Command::Reminder(ReminderChange::Enable(false)))
        );
        assert_eq!(
            parse_command("reminder soon later"),
            Some(Command::Invalid(MSG_INVALID_PARAMETERS))
        );
    }

    #[test]
    fn test_format_report() {
        let rows = vec![
            ReportRow {
                date: "2024-01-09".to_string(),
                clock_in: Some("2024-01-09T09:00:00+09:00".to_string()),
                clock_out: Some("2024-01-09T09:30:00Z".to_string()),
                off: false,
            },
            ReportRow {
                date: "2024-01-10".to_string(),
                clock_in: None,
                clock_out: None,
                off: true,
            },
        ];
        assert_eq!(
            format_report(&rows),
            "```\ndate        in     out\n2024-01-09  09:00  18:30\n2024-01-10  off\n```"
        );
        assert_eq!(
            format_report(&[]),
            "No working days recorded this month."
        );
    }
}
