//! Chat companion for the panel: `/start` links to the web app and subscribes
//! the chat to kick-off reminders, `/matches` answers with a short text list
//! of upcoming fixtures.

use std::time::Duration;

use chrono::Utc;
use ludic_shared::{MatchListResponse, cards_for};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{
    BOT_LIST_LIMIT, BOT_MATCHES_LIMIT, BOT_POLL_TIMEOUT_SECS, BOT_RETRY_DELAY_SECS,
    REMINDER_LEAD_MINUTES, telegram_api_url, webapp_url,
};
use crate::services::{api_sport, reminders};
use crate::state::AppState;

const GET_MATCHES_CALLBACK: &str = "get_matches";
const HELP_CALLBACK: &str = "help";

const LOADING_TEXT: &str = "⏳ Loading upcoming matches...";
const STOPPED_TEXT: &str = "🔕 Reminders are off. Send /start to turn them back on.";

fn hours_label(hours: i64) -> String {
    if hours == 1 {
        "hour".to_owned()
    } else {
        format!("{hours} hours")
    }
}

fn welcome_text() -> String {
    format!(
        "Hi! 👋\nI show upcoming football matches and remind you \
         {REMINDER_LEAD_MINUTES} minutes before kick-off.\n\n\
         ⚽ Commands:\n/matches - upcoming matches\n/list - reminder schedule\n\
         /stop - turn off reminders\n/start - restart the bot\n\n\
         Use the buttons below:"
    )
}

fn help_text(window_hours: i64) -> String {
    format!(
        "🤖 Ludic Bot Help\n\n\
         ⚽ Commands:\n/start - get started and enable reminders\n\
         /matches - upcoming matches\n/list - reminder schedule\n\
         /stop - turn off reminders\n\n\
         📊 Matches starting within the next {} across leagues and tournaments.",
        hours_label(window_hours)
    )
}

fn no_matches_text(window_hours: i64) -> String {
    format!("⚽ No matches in the next {}.", hours_label(window_hours))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Matches,
    List,
    Stop,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    from: Option<User>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    id: String,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Debug, Serialize, PartialEq)]
struct InlineButton {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    web_app: Option<WebAppInfo>,
}

#[derive(Debug, Serialize, PartialEq)]
struct WebAppInfo {
    url: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct InlineKeyboard {
    inline_keyboard: Vec<Vec<InlineButton>>,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboard>,
}

#[derive(Clone)]
pub struct BotClient {
    http: reqwest::Client,
    base_url: String,
}

impl BotClient {
    /// Long polls outlive the upstream timeout configured on the shared
    /// client, so the bot gets its own.
    pub fn connect(token: &str) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(BOT_POLL_TIMEOUT_SECS + 10))
            .build()?;
        Ok(Self {
            http,
            base_url: format!("{}/bot{token}", telegram_api_url()),
        })
    }

    async fn call<T, B>(&self, method: &str, body: &B) -> Result<T, String>
    where
        T: for<'de> Deserialize<'de>,
        B: Serialize + ?Sized,
    {
        let resp = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| format!("{method} request failed: {e}"))?;
        let parsed = resp
            .json::<ApiResponse<T>>()
            .await
            .map_err(|e| format!("{method} response parse failed: {e}"))?;
        if !parsed.ok {
            return Err(format!(
                "{method} rejected: {}",
                parsed.description.unwrap_or_default()
            ));
        }
        parsed
            .result
            .ok_or_else(|| format!("{method} returned no result"))
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, String> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": BOT_POLL_TIMEOUT_SECS,
            "allowed_updates": ["message", "callback_query"],
        });
        self.call("getUpdates", &body).await
    }

    pub(crate) async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<&InlineKeyboard>,
    ) -> Result<(), String> {
        let body = SendMessage {
            chat_id,
            text,
            reply_markup,
        };
        self.call::<serde_json::Value, _>("sendMessage", &body)
            .await
            .map(|_| ())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), String> {
        let body = serde_json::json!({ "callback_query_id": callback_id });
        self.call::<serde_json::Value, _>("answerCallbackQuery", &body)
            .await
            .map(|_| ())
    }
}

pub async fn run(state: AppState, bot: BotClient) {
    let keyboard = start_keyboard(webapp_url().as_deref());
    let mut offset = 0_i64;

    info!("Telegram bot polling started");
    loop {
        let updates = match bot.get_updates(offset).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!("bot poll failed: {e}");
                tokio::time::sleep(Duration::from_secs(BOT_RETRY_DELAY_SECS)).await;
                continue;
            }
        };

        if !updates.is_empty() {
            state.observability.record_bot_updates(updates.len() as u64);
        }
        for update in updates {
            offset = offset.max(update.update_id + 1);
            handle_update(&state, &bot, &keyboard, update).await;
        }
    }
}

async fn handle_update(state: &AppState, bot: &BotClient, keyboard: &InlineKeyboard, update: Update) {
    if let Some(callback) = update.callback_query {
        let command = match callback.data.as_deref() {
            Some(GET_MATCHES_CALLBACK) => Some(Command::Matches),
            Some(HELP_CALLBACK) => Some(Command::Help),
            _ => None,
        };
        if let (Some(command), Some(message)) = (command, callback.message.as_ref()) {
            respond(state, bot, keyboard, message.chat.id, command).await;
        }
        if let Err(e) = bot.answer_callback(&callback.id).await {
            warn!("failed to answer callback: {e}");
        }
        return;
    }

    let Some(message) = update.message else {
        return;
    };
    let Some(command) = message.text.as_deref().and_then(parse_command) else {
        return;
    };
    let username = message
        .from
        .as_ref()
        .and_then(|user| user.username.as_deref())
        .unwrap_or("-");
    info!(chat_id = message.chat.id, username, ?command, "bot command received");
    respond(state, bot, keyboard, message.chat.id, command).await;
}

async fn respond(
    state: &AppState,
    bot: &BotClient,
    keyboard: &InlineKeyboard,
    chat_id: i64,
    command: Command,
) {
    let result = match command {
        Command::Start => {
            set_subscribed(state, chat_id, true).await;
            bot.send_message(chat_id, &welcome_text(), Some(keyboard))
                .await
        }
        Command::Help => {
            bot.send_message(chat_id, &help_text(state.upstream.window_hours), None)
                .await
        }
        Command::Matches => send_matches(state, bot, chat_id).await,
        Command::List => {
            let reply = reminders::list_reply(
                &*state.reminders.read().await,
                Utc::now(),
                BOT_LIST_LIMIT,
            );
            bot.send_message(chat_id, &reply, None).await
        }
        Command::Stop => {
            set_subscribed(state, chat_id, false).await;
            bot.send_message(chat_id, STOPPED_TEXT, None).await
        }
    };
    if let Err(e) = result {
        warn!(chat_id, "failed to reply to {command:?}: {e}");
    }
}

/// Add or remove a chat from the reminder list. Returns true if it changed.
async fn set_subscribed(state: &AppState, chat_id: i64, subscribed: bool) -> bool {
    let mut subscribers = state.subscribers.write().await;
    let changed = if subscribed {
        subscribers.insert(chat_id)
    } else {
        subscribers.remove(&chat_id)
    };
    if changed {
        info!(chat_id, subscribed, total = subscribers.len(), "reminder subscription changed");
    }
    changed
}

async fn send_matches(state: &AppState, bot: &BotClient, chat_id: i64) -> Result<(), String> {
    bot.send_message(chat_id, LOADING_TEXT, None).await?;

    let window_hours = state.upstream.window_hours;
    let replies =
        match api_sport::fetch_match_list(&state.http_client, &state.upstream, Utc::now()).await {
            Ok(response) => matches_replies(&response, BOT_MATCHES_LIMIT, window_hours),
            Err(e) => {
                warn!(error = %e, "bot failed to fetch matches");
                vec![format!("❌ Failed to fetch matches: {e}")]
            }
        };
    for reply in replies {
        bot.send_message(chat_id, &reply, None).await?;
    }
    Ok(())
}

/// Parse `/cmd` or `/cmd@BotName`, ignoring any arguments.
pub fn parse_command(text: &str) -> Option<Command> {
    let word = text.split_whitespace().next()?;
    let name = word.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);
    match name.to_ascii_lowercase().as_str() {
        "start" => Some(Command::Start),
        "help" => Some(Command::Help),
        "matches" => Some(Command::Matches),
        "list" => Some(Command::List),
        "stop" => Some(Command::Stop),
        _ => None,
    }
}

/// One chat message per match, capped at `limit`, plus a count line when capped.
pub fn matches_replies(
    response: &MatchListResponse,
    limit: usize,
    window_hours: i64,
) -> Vec<String> {
    if response.data.is_empty() {
        return vec![no_matches_text(window_hours)];
    }

    let total = response.data.len();
    let shown = total.min(limit);
    let mut replies: Vec<String> = cards_for(&response.data[..shown])
        .iter()
        .map(|card| card.summary())
        .collect();
    if total > shown {
        replies.push(format!("📊 Showing {shown} of {total} matches"));
    }
    replies
}

fn start_keyboard(webapp_url: Option<&str>) -> InlineKeyboard {
    let callback_button = |text: &str, data: &str| InlineButton {
        text: text.to_owned(),
        callback_data: Some(data.to_owned()),
        web_app: None,
    };

    let mut rows = Vec::new();
    if let Some(url) = webapp_url {
        rows.push(vec![InlineButton {
            text: "📱 Open matches".to_owned(),
            callback_data: None,
            web_app: Some(WebAppInfo {
                url: url.to_owned(),
            }),
        }]);
    }
    rows.push(vec![
        callback_button("📅 Get matches", GET_MATCHES_CALLBACK),
        callback_button("🔄 Refresh", GET_MATCHES_CALLBACK),
    ]);
    rows.push(vec![callback_button("ℹ️ Help", HELP_CALLBACK)]);

    InlineKeyboard {
        inline_keyboard: rows,
    }
}
