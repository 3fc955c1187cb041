// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Chat platform callbacks: button actions and slash-style commands.

use crate::error::AppError;
use crate::routes::token_matches;
use crate::services::chat::{ACTION_CANCEL, ACTION_IN, ACTION_LEAVE, ACTION_OUT};
use crate::services::commands::PunchKind;
use crate::AppState;
use axum::{
    extract::{Form, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

pub const MSG_CANCELED: &str = "Operation canceled.";

/// Chat callback routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/interaction", post(handle_interaction))
        .route("/commands", post(handle_command))
}

/// Form body of a button callback.
#[derive(Deserialize)]
struct InteractionForm {
    payload: String,
}

/// Action callback posted when a prompt button is pressed.
#[derive(Deserialize, Debug)]
struct ActionCallback {
    #[serde(default)]
    token: String,
    #[serde(default)]
    actions: Vec<CallbackAction>,
    user: CallbackUser,
    #[serde(default)]
    original_message: Value,
}

#[derive(Deserialize, Debug)]
struct CallbackAction {
    name: String,
}

#[derive(Deserialize, Debug)]
struct CallbackUser {
    id: String,
}

/// Handle a prompt button press (POST /interaction).
async fn handle_interaction(
    State(state): State<Arc<AppState>>,
    Form(form): Form<InteractionForm>,
) -> Result<Json<Value>, AppError> {
    let callback: ActionCallback = serde_json::from_str(&form.payload).map_err(|e| {
        tracing::error!(error = %e, "Failed to decode action callback");
        AppError::BadRequest(format!("malformed action callback: {}", e))
    })?;

    verify_token(&state, &callback.token, "interaction")?;

    let action = callback.actions.first().ok_or_else(|| {
        tracing::warn!(user_id = %callback.user.id, "Action callback without actions");
        AppError::BadRequest("action callback without actions".to_string())
    })?;

    let kind = match action.name.as_str() {
        ACTION_IN => PunchKind::In,
        ACTION_OUT => PunchKind::Out,
        ACTION_LEAVE => PunchKind::Leave,
        ACTION_CANCEL => return Ok(Json(replace_buttons(callback.original_message, MSG_CANCELED))),
        other => {
            tracing::warn!(action = %other, "Unknown action submitted");
            return Err(AppError::BadRequest(format!("unknown action '{}'", other)));
        }
    };

    tracing::info!(user_id = %callback.user.id, ?kind, "Punch button pressed");
    let title = state
        .commands
        .handle_punch(&callback.user.id, kind, None)
        .await;

    Ok(Json(replace_buttons(callback.original_message, &title)))
}

fn verify_token(state: &AppState, received: &str, surface: &'static str) -> Result<(), AppError> {
    if token_matches(received, &state.config.verification_token) {
        Ok(())
    } else {
        tracing::warn!(surface, "Security Alert: verification token mismatch");
        Err(AppError::Unauthorized)
    }
}

/// Drop the buttons from the first attachment and show `title` in their place.
fn replace_buttons(mut message: Value, title: &str) -> Value {
    if !message.is_object() {
        message = json!({});
    }
    let attachments = message
        .as_object_mut()
        .map(|m| m.entry("attachments").or_insert_with(|| json!([])));

    if let Some(Value::Array(list)) = attachments {
        if list.is_empty() {
            list.push(json!({}));
        }
        if let Some(Value::Object(first)) = list.first_mut() {
            first.insert("actions".to_string(), json!([]));
            first.insert(
                "fields".to_string(),
                json!([{"title": title, "value": "", "short": false}]),
            );
        }
    }
    message
}

/// Form body of a chat command.
#[derive(Deserialize)]
struct CommandForm {
    #[serde(default)]
    token: String,
    user_id: String,
    channel_id: String,
    #[serde(default)]
    text: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CommandResponse {
    pub response_type: String,
    pub text: String,
}

/// Handle a chat command (POST /commands).
async fn handle_command(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CommandForm>,
) -> Result<Json<CommandResponse>, AppError> {
    verify_token(&state, &form.token, "commands")?;

    let text = state
        .commands
        .handle(&form.user_id, &form.channel_id, &form.text)
        .await
        .unwrap_or_default();

    Ok(Json(CommandResponse {
        response_type: "ephemeral".to_string(),
        text,
    }))
}
