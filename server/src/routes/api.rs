use std::fmt::Write as _;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use chrono::Utc;
use ludic_shared::INIT_DATA_HEADER;
use tracing::{error, warn};

use crate::services::api_sport;
use crate::state::{AppState, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "bot_enabled": state.bot_enabled,
        "require_init_data": state.require_init_data,
        "observability": {
            "matches_requests_total": observability.matches_requests_total,
            "matches_unauthorized_total": observability.matches_unauthorized_total,
            "matches_upstream_errors_total": observability.matches_upstream_errors_total,
            "bot_updates_total": observability.bot_updates_total,
            "reminders_sent_total": observability.reminders_sent_total,
        }
    }))
}

/// Upcoming matches for the panel, passed through from API-Sport unchanged.
pub async fn get_matches(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.observability.record_matches_request();

    if state.require_init_data && !has_init_data(&headers) {
        state.observability.record_matches_unauthorized();
        warn!("rejected /api/matches request without init data");
        return json_error(StatusCode::UNAUTHORIZED, "unauthorized");
    }

    match api_sport::fetch_matches_raw(&state.http_client, &state.upstream, Utc::now()).await {
        Ok(body) => json_bytes_response(body),
        Err(e) => {
            state.observability.record_matches_upstream_error();
            error!(error = %e, "error fetching matches");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = render_prometheus_metrics(state.bot_enabled, state.observability.snapshot());

    ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body)
}

fn has_init_data(headers: &HeaderMap) -> bool {
    headers
        .get(INIT_DATA_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| !value.trim().is_empty())
}

fn render_prometheus_metrics(bot_enabled: bool, observability: ObservabilitySnapshot) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "# HELP ludic_bot_enabled Whether the Telegram bot poller is running (1 or 0)."
    );
    let _ = writeln!(body, "# TYPE ludic_bot_enabled gauge");
    let _ = writeln!(body, "ludic_bot_enabled {}", u8::from(bot_enabled));

    let counters = [
        (
            "ludic_matches_requests_total",
            "Total /api/matches requests.",
            observability.matches_requests_total,
        ),
        (
            "ludic_matches_unauthorized_total",
            "Total /api/matches requests rejected for missing init data.",
            observability.matches_unauthorized_total,
        ),
        (
            "ludic_matches_upstream_errors_total",
            "Total upstream failures while serving /api/matches.",
            observability.matches_upstream_errors_total,
        ),
        (
            "ludic_bot_updates_total",
            "Total Telegram updates handled by the bot poller.",
            observability.bot_updates_total,
        ),
        (
            "ludic_reminders_sent_total",
            "Total kick-off reminders delivered to subscribed chats.",
            observability.reminders_sent_total,
        ),
    ];
    for (name, help, value) in counters {
        let _ = writeln!(body, "# HELP {name} {help}");
        let _ = writeln!(body, "# TYPE {name} counter");
        let _ = writeln!(body, "{name} {value}");
    }

    body
}

fn json_bytes_response(body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
