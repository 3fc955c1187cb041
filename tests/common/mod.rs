// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    extract::{Form, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use timecard_sync::config::Config;
use timecard_sync::db::MemoryUserStore;
use timecard_sync::models::{Credential, User};
use timecard_sync::routes::create_router;
use timecard_sync::services::SharedNotifier;
use timecard_sync::services::SlackNotifier;
use timecard_sync::AppState;

/// One PUT received by the fake HR vendor.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedPut {
    pub employee_id: String,
    pub date: String,
    pub body: Value,
    pub bearer: String,
}

/// In-process stand-in for the HR vendor, its token endpoint and the chat API.
#[derive(Default)]
pub struct FakeVendor {
    records: Mutex<HashMap<(String, String), Value>>,
    day_patterns: Mutex<HashMap<String, String>>,
    get_failures: Mutex<HashMap<String, u16>>,
    put_failures: Mutex<HashMap<String, u16>>,
    puts: Mutex<Vec<RecordedPut>>,
    gets: AtomicUsize,
    token_calls: AtomicUsize,
    rotate_tokens: AtomicBool,
    posts: Mutex<Vec<Value>>,
}

#[allow(dead_code)]
impl FakeVendor {
    /// Pre-populate the stored record for one employee and day.
    pub fn set_record(&self, employee_id: &str, date: &str, record: Value) {
        self.records
            .lock()
            .unwrap()
            .insert((employee_id.to_string(), date.to_string()), record);
    }

    pub fn set_day_pattern(&self, date: &str, pattern: &str) {
        self.day_patterns
            .lock()
            .unwrap()
            .insert(date.to_string(), pattern.to_string());
    }

    pub fn fail_get(&self, date: &str, status: u16) {
        self.get_failures
            .lock()
            .unwrap()
            .insert(date.to_string(), status);
    }

    pub fn fail_put(&self, date: &str, status: u16) {
        self.put_failures
            .lock()
            .unwrap()
            .insert(date.to_string(), status);
    }

    /// Make every refresh grant return a new access token.
    pub fn rotate_tokens(&self, rotate: bool) {
        self.rotate_tokens.store(rotate, Ordering::SeqCst);
    }

    pub fn puts(&self) -> Vec<RecordedPut> {
        self.puts.lock().unwrap().clone()
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn posts(&self) -> Vec<Value> {
        self.posts.lock().unwrap().clone()
    }

    fn stored(&self, employee_id: &str, date: &str) -> Value {
        if let Some(record) = self
            .records
            .lock()
            .unwrap()
            .get(&(employee_id.to_string(), date.to_string()))
        {
            return record.clone();
        }
        let pattern = self
            .day_patterns
            .lock()
            .unwrap()
            .get(date)
            .cloned()
            .unwrap_or_else(|| "normal_day".to_string());
        json!({
            "date": date,
            "day_pattern": pattern,
            "clock_in_at": null,
            "clock_out_at": null,
            "is_absence": false
        })
    }
}

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string()
}

async fn get_record(
    State(vendor): State<Arc<FakeVendor>>,
    Path((employee_id, date)): Path<(String, String)>,
) -> Response {
    vendor.gets.fetch_add(1, Ordering::SeqCst);
    if let Some(status) = vendor.get_failures.lock().unwrap().get(&date).copied() {
        return (
            StatusCode::from_u16(status).unwrap(),
            r#"{"message":"unavailable"}"#,
        )
            .into_response();
    }
    Json(vendor.stored(&employee_id, &date)).into_response()
}

async fn put_record(
    State(vendor): State<Arc<FakeVendor>>,
    Path((employee_id, date)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    vendor.puts.lock().unwrap().push(RecordedPut {
        employee_id: employee_id.clone(),
        date: date.clone(),
        body: body.clone(),
        bearer: bearer(&headers),
    });

    if let Some(status) = vendor.put_failures.lock().unwrap().get(&date).copied() {
        return (
            StatusCode::from_u16(status).unwrap(),
            r#"{"message":"rejected"}"#,
        )
            .into_response();
    }

    let mut record = vendor.stored(&employee_id, &date);
    if let (Some(target), Some(patch)) = (record.as_object_mut(), body.as_object()) {
        for (key, value) in patch {
            if key != "break_records" {
                target.insert(key.clone(), value.clone());
            }
        }
    }
    vendor.set_record(&employee_id, &date, record.clone());
    Json(record).into_response()
}

async fn token(
    State(vendor): State<Arc<FakeVendor>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let n = vendor.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
    match form.get("grant_type").map(String::as_str) {
        Some("refresh_token") => {
            let refresh = form.get("refresh_token").cloned().unwrap_or_default();
            let access = if vendor.rotate_tokens.load(Ordering::SeqCst) {
                format!("rotated-{}", n)
            } else {
                access_for(&refresh)
            };
            Json(json!({
                "access_token": access,
                "token_type": "bearer",
                "expires_in": 86400
            }))
            .into_response()
        }
        Some("authorization_code") => Json(json!({
            "access_token": "code-access",
            "refresh_token": "code-refresh",
            "token_type": "bearer",
            "expires_in": 86400
        }))
        .into_response(),
        _ => (StatusCode::BAD_REQUEST, r#"{"error":"unsupported_grant_type"}"#).into_response(),
    }
}

async fn post_message(
    State(vendor): State<Arc<FakeVendor>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    vendor.posts.lock().unwrap().push(body);
    Json(json!({"ok": true}))
}

/// Access token the fake endpoint returns for `refresh` when not rotating.
pub fn access_for(refresh: &str) -> String {
    format!("access-for-{}", refresh)
}

/// Start the fake vendor on an ephemeral port; returns it and its base URL.
pub async fn start_vendor() -> (Arc<FakeVendor>, String) {
    let vendor = Arc::new(FakeVendor::default());
    let router = Router::new()
        .route(
            "/hr/api/v1/employees/{employee_id}/work_records/{date}",
            get(get_record).put(put_record),
        )
        .route("/oauth/token", post(token))
        .route("/chat/chat.postMessage", post(post_message))
        .with_state(vendor.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (vendor, format!("http://{}", addr))
}

/// Test configuration pointing every outbound URL at `base`.
pub fn config_for(base: &str) -> Config {
    Config {
        hr_api_base: format!("{}/hr", base),
        oauth_token_url: format!("{}/oauth/token", base),
        chat_api_base: format!("{}/chat", base),
        ..Config::test_default()
    }
}

/// Everything a test needs: the fake vendor, the store and the wired app.
#[allow(dead_code)]
pub struct TestEnv {
    pub vendor: Arc<FakeVendor>,
    pub store: Arc<MemoryUserStore>,
    pub state: Arc<AppState>,
}

#[allow(dead_code)]
impl TestEnv {
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }
}

#[allow(dead_code)]
pub async fn test_env() -> TestEnv {
    test_env_with(|_| {}).await
}

/// Like [`test_env`], with a hook to adjust the configuration.
#[allow(dead_code)]
pub async fn test_env_with(adjust: impl FnOnce(&mut Config)) -> TestEnv {
    let (vendor, base) = start_vendor().await;
    let mut config = config_for(&base);
    adjust(&mut config);

    let store = Arc::new(MemoryUserStore::new());
    let notifier: SharedNotifier = Arc::new(SlackNotifier::new(
        &config.chat_api_base,
        &config.bot_token,
    ));
    let state = Arc::new(AppState::new(config, store.clone(), notifier));

    TestEnv {
        vendor,
        store,
        state,
    }
}

/// Credential whose refresh grant returns the same access token unless rotating.
#[allow(dead_code)]
pub fn stable_credential(refresh: &str) -> Credential {
    Credential {
        access_token: access_for(refresh),
        refresh_token: refresh.to_string(),
        token_type: "Bearer".to_string(),
        expiry: None,
    }
}

/// A registered user holding a personal, non-rotating credential.
#[allow(dead_code)]
pub fn registered_user(user_id: &str, employee_id: &str) -> User {
    User::new(user_id, format!("D-{}", user_id), employee_id)
        .with_credential(stable_credential(&format!("refresh-{}", user_id)))
}
