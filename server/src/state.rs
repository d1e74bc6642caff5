use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::warn;

use crate::config::{require_init_data, upstream_connect_timeout, upstream_http_timeout};
use crate::services::api_sport::UpstreamConfig;
use crate::services::reminders::ReminderBook;

#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    pub upstream: Arc<UpstreamConfig>,
    /// Answer 401 when `X-Telegram-Init-Data` is missing.
    pub require_init_data: bool,
    pub bot_enabled: bool,
    /// Chats that sent `/start` and not `/stop`. Kept in memory only.
    pub subscribers: Arc<RwLock<HashSet<i64>>>,
    pub reminders: Arc<RwLock<ReminderBook>>,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    matches_requests_total: AtomicU64,
    matches_unauthorized_total: AtomicU64,
    matches_upstream_errors_total: AtomicU64,
    bot_updates_total: AtomicU64,
    reminders_sent_total: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct ObservabilitySnapshot {
    pub matches_requests_total: u64,
    pub matches_unauthorized_total: u64,
    pub matches_upstream_errors_total: u64,
    pub bot_updates_total: u64,
    pub reminders_sent_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            matches_requests_total: self.matches_requests_total.load(Ordering::Relaxed),
            matches_unauthorized_total: self.matches_unauthorized_total.load(Ordering::Relaxed),
            matches_upstream_errors_total: self
                .matches_upstream_errors_total
                .load(Ordering::Relaxed),
            bot_updates_total: self.bot_updates_total.load(Ordering::Relaxed),
            reminders_sent_total: self.reminders_sent_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_matches_request(&self) {
        self.matches_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_matches_unauthorized(&self) {
        self.matches_unauthorized_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_matches_upstream_error(&self) {
        self.matches_upstream_errors_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bot_updates(&self, count: u64) {
        self.bot_updates_total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_reminder_sent(&self) {
        self.reminders_sent_total.fetch_add(1, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn new(upstream: UpstreamConfig, bot_enabled: bool) -> Self {
        let request_timeout = upstream_http_timeout();
        let connect_timeout = upstream_connect_timeout();
        let http_client = reqwest::Client::builder()
            .user_agent("ludic-server/0.1")
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .or_else(|e| {
                warn!(
                    error = %e,
                    "failed to build configured HTTP client, retrying without custom user-agent"
                );
                reqwest::Client::builder()
                    .timeout(request_timeout)
                    .connect_timeout(connect_timeout)
                    .build()
            })
            .unwrap_or_else(|e| {
                panic!("failed to build timeout-configured HTTP client: {e}");
            });
        Self {
            http_client,
            upstream: Arc::new(upstream),
            require_init_data: require_init_data(),
            bot_enabled,
            subscribers: Arc::new(RwLock::new(HashSet::new())),
            reminders: Arc::new(RwLock::new(ReminderBook::default())),
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }
}
