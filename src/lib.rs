// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Timecard-Sync: keep HR attendance records in step with chat punches
//!
//! This crate provides a chat bot backend that records punch-in, punch-out
//! and leave against an HR vendor's daily work records, repairs inconsistent
//! clock-in/clock-out pairs, and reminds users to punch.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::SharedUserStore;
use services::{
    AttendanceEngine, CommandHandler, CredentialBroker, HrClient, OAuthClient, ReminderScheduler,
    SharedNotifier,
};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: SharedUserStore,
    pub engine: AttendanceEngine,
    pub commands: CommandHandler,
    pub notifier: SharedNotifier,
}

impl AppState {
    /// Wire the services together around a user store and a chat notifier.
    pub fn new(config: Config, store: SharedUserStore, notifier: SharedNotifier) -> Self {
        let oauth = OAuthClient::from_config(&config);
        let hr = HrClient::new(&config.hr_api_base);
        let broker = CredentialBroker::new(oauth.clone(), hr, store.clone());
        let engine = AttendanceEngine::new(store.clone(), broker);
        let commands = CommandHandler::new(store.clone(), engine.clone(), oauth, notifier.clone());

        Self {
            config,
            store,
            engine,
            commands,
            notifier,
        }
    }

    /// Reminder task over the same store and notifier.
    pub fn reminder_scheduler(&self) -> ReminderScheduler {
        let scheduler = ReminderScheduler::new(self.store.clone(), self.notifier.clone());
        if self.config.reminder_skip_non_working_days {
            scheduler.with_workday_filter(self.engine.clone())
        } else {
            scheduler
        }
    }
}
