use std::time::Duration;

pub const API_SPORT_MATCHES_URL: &str = "https://app.api-sport.ru/api/football/matches";
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

pub const DEFAULT_MATCH_WINDOW_HOURS: i64 = 2;
/// One week. Larger windows overflow date arithmetic long before they are useful.
pub const MAX_MATCH_WINDOW_HOURS: i64 = 168;
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_STATIC_DIR: &str = "client/dist";
pub const DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 3;

// Bot poller
pub const BOT_POLL_TIMEOUT_SECS: u64 = 30;
pub const BOT_RETRY_DELAY_SECS: u64 = 3;
pub const BOT_MATCHES_LIMIT: usize = 5;
pub const BOT_LIST_LIMIT: usize = 20;

// Kick-off reminders
pub const REMINDER_LEAD_MINUTES: i64 = 15;
pub const REMINDER_LOOKAHEAD_HOURS: i64 = 24;
pub const REMINDER_FETCH_INTERVAL_SECS: u64 = 5 * 60;
pub const REMINDER_CHECK_INTERVAL_SECS: u64 = 60;

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Key for the API-Sport football endpoint. Required.
pub fn api_sport_key() -> Option<String> {
    non_empty_var("API_SPORT_KEY")
}

pub fn api_sport_url() -> String {
    non_empty_var("API_SPORT_URL").unwrap_or_else(|| API_SPORT_MATCHES_URL.to_owned())
}

pub fn match_window_hours() -> i64 {
    std::env::var("MATCH_WINDOW_HOURS")
        .ok()
        .and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|value| (1..=MAX_MATCH_WINDOW_HOURS).contains(value))
        .unwrap_or(DEFAULT_MATCH_WINDOW_HOURS)
}

pub fn server_port() -> u16 {
    std::env::var("SERVER_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

pub fn static_dir() -> String {
    non_empty_var("STATIC_DIR").unwrap_or_else(|| DEFAULT_STATIC_DIR.to_owned())
}

/// Reject `/api/matches` calls that carry no Telegram init data.
pub fn require_init_data() -> bool {
    std::env::var("REQUIRE_INIT_DATA")
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
        })
        .unwrap_or(true)
}

pub fn upstream_http_timeout() -> Duration {
    std::env::var("UPSTREAM_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS))
}

pub fn upstream_connect_timeout() -> Duration {
    std::env::var("UPSTREAM_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS))
}

pub fn telegram_bot_token() -> Option<String> {
    non_empty_var("TELEGRAM_BOT_TOKEN")
}

pub fn telegram_api_url() -> String {
    non_empty_var("TELEGRAM_API_URL").unwrap_or_else(|| TELEGRAM_API_URL.to_owned())
}

/// Public URL of the web app, used for the bot's "open" button.
pub fn webapp_url() -> Option<String> {
    non_empty_var("WEBAPP_URL")
}
