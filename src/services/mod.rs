// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod chat;
pub mod commands;
pub mod credentials;
pub mod engine;
pub mod hr;
pub mod oauth;
pub mod reminder;

pub use chat::{ChatNotifier, SharedNotifier, SlackNotifier};
pub use commands::{CommandHandler, PunchKind};
pub use credentials::CredentialBroker;
pub use engine::AttendanceEngine;
pub use hr::{AuthorizedClient, HrClient};
pub use oauth::OAuthClient;
pub use reminder::ReminderScheduler;
