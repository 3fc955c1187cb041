// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Timecard-Sync Server
//!
//! Receives chat commands and button presses, records attendance with the
//! HR vendor, and posts punch reminders.

use std::sync::Arc;
use timecard_sync::{
    config::Config,
    db::FileUserStore,
    services::{SharedNotifier, SlackNotifier},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Timecard-Sync");

    let store = FileUserStore::open(&config.users_dir).await?;
    let notifier: SharedNotifier = Arc::new(SlackNotifier::new(
        &config.chat_api_base,
        &config.bot_token,
    ));

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), Arc::new(store), notifier));

    // Reminders run for the lifetime of the process
    tokio::spawn(state.reminder_scheduler().run());
    tracing::info!(
        skip_non_working_days = config.reminder_skip_non_working_days,
        "Reminder scheduler spawned"
    );

    // Build router
    let app = timecard_sync::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let mut filter = EnvFilter::from_default_env();
    for directive in ["timecard_sync=debug", "info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::registry().with(filter).with(format).init();
}
