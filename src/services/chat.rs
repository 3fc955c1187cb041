// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbound chat messages: plain replies and the interactive punch prompt.

use crate::error::{AppError, Result};
use crate::time_utils::now_civil;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Callback ID attached to the punch prompt.
pub const CALLBACK_ID: &str = "punch";

pub const ACTION_IN: &str = "in";
pub const ACTION_OUT: &str = "out";
pub const ACTION_LEAVE: &str = "leave";
pub const ACTION_CANCEL: &str = "cancel";

/// Delivers messages to chat channels.
#[async_trait]
pub trait ChatNotifier: Send + Sync + 'static {
    /// Post a plain text message.
    async fn post_message(&self, channel: &str, text: &str) -> Result<()>;

    /// Post the punch in / punch out / leave / cancel prompt.
    async fn post_punch_prompt(&self, channel: &str) -> Result<()>;
}

pub type SharedNotifier = Arc<dyn ChatNotifier>;

/// Attachments for the punch prompt, titled with `now` as `YYYY/MM/DD HH:MM`.
pub fn punch_prompt_attachments(now: DateTime<FixedOffset>) -> Value {
    json!([{
        "text": now.format("%Y/%m/%d %H:%M").to_string(),
        "callback_id": CALLBACK_ID,
        "actions": [
            {"name": ACTION_IN, "text": "Punch in", "type": "button", "style": "primary"},
            {"name": ACTION_OUT, "text": "Punch out", "type": "button", "style": "primary"},
            {"name": ACTION_LEAVE, "text": "Leave", "type": "button", "style": "danger"},
            {"name": ACTION_CANCEL, "text": "Cancel", "type": "button"}
        ]
    }])
}

/// Web API client posting as the bot user.
#[derive(Clone)]
pub struct SlackNotifier {
    http: reqwest::Client,
    base_url: String,
    bot_token: String,
}

impl SlackNotifier {
    pub fn new(base_url: &str, bot_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
        }
    }

    async fn post(&self, body: Value) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Chat(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Chat(format!("HTTP {}: {}", status, body)));
        }

        let reply: PostMessageReply = response
            .json()
            .await
            .map_err(|e| AppError::Chat(format!("JSON parse error: {}", e)))?;

        if !reply.ok {
            return Err(AppError::Chat(
                reply.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct PostMessageReply {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl ChatNotifier for SlackNotifier {
    async fn post_message(&self, channel: &str, text: &str) -> Result<()> {
        self.post(json!({"channel": channel, "text": text})).await
    }

    async fn post_punch_prompt(&self, channel: &str) -> Result<()> {
        self.post(json!({
            "channel": channel,
            "text": "",
            "attachments": punch_prompt_attachments(now_civil()),
        }))
        .await
    }
}
