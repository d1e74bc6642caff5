use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use ludic_shared::MatchListResponse;
use thiserror::Error;

use crate::config::{MAX_MATCH_WINDOW_HOURS, api_sport_url, match_window_hours};

const WINDOW_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MAX_ERROR_BODY_CHARS: usize = 256;

/// Where and how to query upcoming fixtures.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub matches_url: String,
    pub api_key: String,
    pub window_hours: i64,
}

impl UpstreamConfig {
    pub fn from_env(api_key: String) -> Self {
        Self {
            matches_url: api_sport_url(),
            api_key,
            window_hours: match_window_hours(),
        }
    }
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("upstream payload is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Query string for fixtures starting between `now` and `now + hours`.
/// `hours` is clamped to `1..=MAX_MATCH_WINDOW_HOURS`.
pub fn window_params(now: DateTime<Utc>, hours: i64) -> [(&'static str, String); 3] {
    let span = Duration::hours(hours.clamp(1, MAX_MATCH_WINDOW_HOURS));
    let to = now.checked_add_signed(span).unwrap_or(now);
    [
        ("from", now.format(WINDOW_TIME_FORMAT).to_string()),
        ("to", to.format(WINDOW_TIME_FORMAT).to_string()),
        ("timezone", "UTC".to_owned()),
    ]
}

/// Fetch the raw upstream body for the configured window.
pub async fn fetch_matches_raw(
    client: &reqwest::Client,
    config: &UpstreamConfig,
    now: DateTime<Utc>,
) -> Result<Bytes, UpstreamError> {
    fetch_window_raw(client, config, now, config.window_hours).await
}

async fn fetch_window_raw(
    client: &reqwest::Client,
    config: &UpstreamConfig,
    now: DateTime<Utc>,
    hours: i64,
) -> Result<Bytes, UpstreamError> {
    let resp = client
        .get(&config.matches_url)
        .header("X-API-KEY", &config.api_key)
        .query(&window_params(now, hours))
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }

    let body = resp.bytes().await?;
    // Only forward payloads the panel can parse.
    serde_json::from_slice::<serde_json::Value>(&body)?;
    Ok(body)
}

pub async fn fetch_match_list(
    client: &reqwest::Client,
    config: &UpstreamConfig,
    now: DateTime<Utc>,
) -> Result<MatchListResponse, UpstreamError> {
    fetch_match_list_within(client, config, now, config.window_hours).await
}

/// Like [`fetch_match_list`] but for an explicit look-ahead instead of the
/// panel's window.
pub async fn fetch_match_list_within(
    client: &reqwest::Client,
    config: &UpstreamConfig,
    now: DateTime<Utc>,
    hours: i64,
) -> Result<MatchListResponse, UpstreamError> {
    let body = fetch_window_raw(client, config, now, hours).await?;
    Ok(serde_json::from_slice(&body)?)
}
