mod app;
mod config;
mod routes;
mod services;
mod state;

use tokio::signal;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use crate::services::api_sport::UpstreamConfig;
use crate::services::bot::BotClient;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let Some(api_key) = config::api_sport_key() else {
        tracing::error!("API_SPORT_KEY is required to run ludic-server");
        return;
    };
    let upstream = UpstreamConfig::from_env(api_key);
    tracing::info!(
        url = %upstream.matches_url,
        window_hours = upstream.window_hours,
        "Using API-Sport matches endpoint"
    );

    let bot_token = config::telegram_bot_token();
    let state = AppState::new(upstream, bot_token.is_some());
    if !state.require_init_data {
        tracing::warn!("REQUIRE_INIT_DATA is disabled; /api/matches accepts anonymous requests");
    }

    let background = match bot_token {
        Some(token) => spawn_bot_tasks(&state, &token),
        None => {
            tracing::info!("TELEGRAM_BOT_TOKEN not set, bot and reminders disabled");
            Vec::new()
        }
    };

    let static_dir = config::static_dir();
    let app = app::build_app(state, &static_dir);

    let addr = format!("0.0.0.0:{}", config::server_port());
    tracing::info!(%static_dir, "Ludic server listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind TCP listener");
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server failed");
    }

    for task in &background {
        task.abort();
    }
    tracing::info!(
        background_tasks = background.len(),
        "Server shut down gracefully"
    );
}

/// Bot poller, reminder schedule refresh and reminder delivery.
fn spawn_bot_tasks(state: &AppState, token: &str) -> Vec<JoinHandle<()>> {
    let bot = match BotClient::connect(token) {
        Ok(bot) => bot,
        Err(e) => {
            tracing::warn!(error = %e, "failed to build bot HTTP client, bot disabled");
            return Vec::new();
        }
    };
    vec![
        tokio::spawn(services::bot::run(state.clone(), bot.clone())),
        tokio::spawn(services::reminders::run_fetcher(state.clone())),
        tokio::spawn(services::reminders::run_notifier(state.clone(), bot)),
    ]
}

/// Resolves on Ctrl+C or SIGTERM. A handler that cannot be installed never
/// resolves, so it cannot trigger a shutdown on its own.
async fn shutdown_signal() {
    let interrupt = async {
        match signal::ctrl_c().await {
            Ok(()) => "interrupt",
            Err(e) => {
                tracing::error!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                "terminate"
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&str>();

    let received = tokio::select! {
        name = interrupt => name,
        name = terminate => name,
    };
    tracing::info!(signal = received, "Shutdown signal received");
}
