//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honoured for local development. Only the chat bot token,
//! the verification token and the OAuth client pair are required; every
//! endpoint URL has a default pointing at the production services.

use std::env;
use std::path::PathBuf;

/// Default base URL of the HR vendor API.
pub const DEFAULT_HR_API_BASE: &str = "https://api.freee.co.jp/hr";
/// Default OAuth authorization endpoint.
pub const DEFAULT_OAUTH_AUTHORIZE_URL: &str = "https://secure.freee.co.jp/oauth/authorize";
/// Default OAuth token endpoint.
pub const DEFAULT_OAUTH_TOKEN_URL: &str = "https://api.freee.co.jp/oauth/token";
/// Out-of-band redirect: the vendor shows the code to the user, who pastes it into chat.
pub const DEFAULT_OAUTH_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";
/// Default chat Web API base URL.
pub const DEFAULT_CHAT_API_BASE: &str = "https://slack.com/api";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Secrets ---
    /// Bot token used to post messages
    pub bot_token: String,
    /// Token the chat platform sends with every callback
    pub verification_token: String,
    /// OAuth client ID registered with the HR vendor
    pub oauth_client_id: String,
    /// OAuth client secret
    pub oauth_client_secret: String,

    // --- Endpoints ---
    pub hr_api_base: String,
    pub oauth_authorize_url: String,
    pub oauth_token_url: String,
    pub oauth_redirect_uri: String,
    pub chat_api_base: String,

    // --- Runtime ---
    /// Server port
    pub port: u16,
    /// Directory holding one JSON file per registered user
    pub users_dir: PathBuf,
    /// Skip reminders on days the HR vendor does not classify as working days
    pub reminder_skip_non_working_days: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            bot_token: required("BOT_TOKEN")?,
            verification_token: required("VERIFICATION_TOKEN")?,
            oauth_client_id: required("OAUTH_CLIENT_ID")?,
            oauth_client_secret: required("OAUTH_CLIENT_SECRET")?,

            hr_api_base: optional("HR_API_BASE", DEFAULT_HR_API_BASE),
            oauth_authorize_url: optional("OAUTH_AUTHORIZE_URL", DEFAULT_OAUTH_AUTHORIZE_URL),
            oauth_token_url: optional("OAUTH_TOKEN_URL", DEFAULT_OAUTH_TOKEN_URL),
            oauth_redirect_uri: optional("OAUTH_REDIRECT_URI", DEFAULT_OAUTH_REDIRECT_URI),
            chat_api_base: optional("CHAT_API_BASE", DEFAULT_CHAT_API_BASE),

            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            users_dir: PathBuf::from(optional("USERS_DIR", "users")),
            reminder_skip_non_working_days: env::var("REMINDER_SKIP_NON_WORKING_DAYS")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }

    /// Fully-populated configuration for tests.
    pub fn test_default() -> Self {
        Self {
            bot_token: "xoxb-test".to_string(),
            verification_token: "test_verification_token".to_string(),
            oauth_client_id: "test_client_id".to_string(),
            oauth_client_secret: "test_client_secret".to_string(),
            hr_api_base: "http://127.0.0.1:9/hr".to_string(),
            oauth_authorize_url: DEFAULT_OAUTH_AUTHORIZE_URL.to_string(),
            oauth_token_url: "http://127.0.0.1:9/oauth/token".to_string(),
            oauth_redirect_uri: DEFAULT_OAUTH_REDIRECT_URI.to_string(),
            chat_api_base: "http://127.0.0.1:9/api".to_string(),
            port: 8080,
            users_dir: PathBuf::from("users"),
            reminder_skip_non_working_days: false,
        }
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

fn optional(name: &str, default: &str) -> String {
    env::var(name)
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
