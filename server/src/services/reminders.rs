//! Kick-off reminders for bot subscribers.
//!
//! One task refreshes a day of upcoming fixtures every few minutes, another
//! checks once a minute for fixtures entering the reminder lead and messages
//! every subscribed chat once per fixture.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use ludic_shared::{MatchCard, MatchListResponse};
use tracing::{info, warn};

use crate::config::{
    REMINDER_CHECK_INTERVAL_SECS, REMINDER_FETCH_INTERVAL_SECS, REMINDER_LEAD_MINUTES,
    REMINDER_LOOKAHEAD_HOURS,
};
use crate::services::api_sport;
use crate::services::bot::BotClient;
use crate::state::AppState;

const NO_UPCOMING_TEXT: &str = "⚽ No upcoming matches.";

/// A fixture with a known kick-off instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Upcoming {
    pub card: MatchCard,
    pub starts_at: DateTime<Utc>,
    notified: bool,
}

#[derive(Debug, Default)]
pub struct ReminderBook {
    upcoming: Vec<Upcoming>,
}

impl ReminderBook {
    /// Replace the schedule with a fresh fetch. Fixtures without a parseable
    /// start, or already started, are dropped. A fixture that was reminded
    /// before stays reminded.
    pub fn replace(&mut self, response: &MatchListResponse, now: DateTime<Utc>) {
        let mut next: Vec<Upcoming> = response
            .data
            .iter()
            .filter_map(|m| {
                let starts_at = parse_kickoff(m.time.as_deref()?)?;
                (starts_at > now).then(|| Upcoming {
                    card: MatchCard::from_match(m),
                    starts_at,
                    notified: false,
                })
            })
            .collect();

        for entry in &mut next {
            entry.notified = self.upcoming.iter().any(|old| {
                old.notified && old.starts_at == entry.starts_at && old.card == entry.card
            });
        }
        next.sort_by_key(|entry| entry.starts_at);
        self.upcoming = next;
    }

    /// Fixtures starting within `lead` of `now` that were not reminded yet.
    /// Marks them reminded.
    pub fn take_due(&mut self, now: DateTime<Utc>, lead: TimeDelta) -> Vec<Upcoming> {
        let mut due = Vec::new();
        for entry in &mut self.upcoming {
            let until = entry.starts_at - now;
            if !entry.notified && until > TimeDelta::zero() && until <= lead {
                entry.notified = true;
                due.push(entry.clone());
            }
        }
        due
    }

    pub fn upcoming(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Upcoming> {
        self.upcoming.iter().filter(move |entry| entry.starts_at > now)
    }
}

/// Kick-off instant from the upstream `time` field. Accepts RFC 3339, the
/// `YYYY-MM-DD HH:MM[:SS]` form used in the query window (UTC) and unix
/// seconds. A bare clock time has no date and yields `None`.
pub fn parse_kickoff(time: &str) -> Option<DateTime<Utc>> {
    let time = time.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(time) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(time, format) {
            return Some(parsed.and_utc());
        }
    }
    time.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

pub fn reminder_text(entry: &Upcoming) -> String {
    format!(
        "⏰ Kick-off in {REMINDER_LEAD_MINUTES} minutes:\n⚽ {} vs {}\n🏆 {}\n🕒 {} UTC",
        entry.card.home,
        entry.card.away,
        entry.card.league,
        entry.starts_at.format("%H:%M"),
    )
}

/// `/list` reply: one line per cached fixture, capped at `limit`.
pub fn list_reply(book: &ReminderBook, now: DateTime<Utc>, limit: usize) -> String {
    let entries: Vec<&Upcoming> = book.upcoming(now).collect();
    if entries.is_empty() {
        return NO_UPCOMING_TEXT.to_owned();
    }

    let mut lines: Vec<String> = entries
        .iter()
        .take(limit)
        .map(|entry| {
            format!(
                "⚽ {} vs {} — {} UTC",
                entry.card.home,
                entry.card.away,
                entry.starts_at.format("%Y-%m-%d %H:%M")
            )
        })
        .collect();
    if entries.len() > limit {
        lines.push(format!("📊 Showing {limit} of {} matches", entries.len()));
    }
    lines.join("\n")
}

/// Keep the reminder book filled with the next day of fixtures.
pub async fn run_fetcher(state: AppState) {
    let mut interval = tokio::time::interval(Duration::from_secs(REMINDER_FETCH_INTERVAL_SECS));

    loop {
        interval.tick().await;

        let now = Utc::now();
        match api_sport::fetch_match_list_within(
            &state.http_client,
            &state.upstream,
            now,
            REMINDER_LOOKAHEAD_HOURS,
        )
        .await
        {
            Ok(response) => {
                let mut book = state.reminders.write().await;
                book.replace(&response, now);
                info!(
                    scheduled = book.upcoming(now).count(),
                    "reminder schedule refreshed"
                );
            }
            Err(e) => warn!(error = %e, "failed to refresh reminder schedule"),
        }
    }
}

/// Send a reminder to every subscriber for each fixture entering the lead.
pub async fn run_notifier(state: AppState, bot: BotClient) {
    let mut interval = tokio::time::interval(Duration::from_secs(REMINDER_CHECK_INTERVAL_SECS));
    let lead = TimeDelta::minutes(REMINDER_LEAD_MINUTES);

    loop {
        interval.tick().await;

        let due = state.reminders.write().await.take_due(Utc::now(), lead);
        if due.is_empty() {
            continue;
        }
        let chats: Vec<i64> = state.subscribers.read().await.iter().copied().collect();

        for entry in &due {
            let text = reminder_text(entry);
            for &chat_id in &chats {
                match bot.send_message(chat_id, &text, None).await {
                    Ok(()) => state.observability.record_reminder_sent(),
                    Err(e) => warn!(chat_id, "failed to send reminder: {e}"),
                }
            }
        }
    }
}
