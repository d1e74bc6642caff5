use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use leptos::prelude::*;
use ludic_shared::{
    EMPTY_MESSAGE, LOADING_MESSAGE, LoadError, MatchCard, MatchPanel, NOTICE_TTL_MS,
    PanelContent, PanelState,
};
use wasm_bindgen_futures::spawn_local;

use crate::source::{BrowserClock, HttpMatchSource};
use crate::telegram::TelegramHost;

type Panel = MatchPanel<TelegramHost, HttpMatchSource, BrowserClock>;

/// Timers may fire a few ms before the deadline the clock reports.
const PRUNE_SLACK_MS: u32 = 50;

thread_local! {
    static PANEL: RefCell<Option<Rc<Panel>>> = const { RefCell::new(None) };
}

fn current_panel() -> Option<Rc<Panel>> {
    PANEL.with(|slot| slot.borrow().clone())
}

fn log_load_error(err: &LoadError) {
    match err {
        LoadError::MissingInitData => {
            web_sys::console::info_1(&"Init data missing, panel opened outside Telegram".into());
        }
        _ => web_sys::console::warn_1(&format!("Error loading matches: {err}").into()),
    }
}

fn schedule_notice_prune() {
    Timeout::new(NOTICE_TTL_MS as u32 + PRUNE_SLACK_MS, || {
        if let Some(panel) = current_panel() {
            panel.prune_notices();
        }
    })
    .forget();
}

/// Run a fetch on the current panel without blocking the event handler.
fn spawn_load<F, Fut>(action: F)
where
    F: FnOnce(Rc<Panel>) -> Fut + 'static,
    Fut: Future<Output = Result<usize, LoadError>> + 'static,
{
    let Some(panel) = current_panel() else {
        return;
    };
    spawn_local(async move {
        let result = action(panel).await;
        if let Err(err) = &result {
            log_load_error(err);
        }
        if !matches!(result, Ok(0) | Err(LoadError::MissingInitData)) {
            schedule_notice_prune();
        }
    });
}

fn close_panel() {
    let Some(panel) = current_panel() else {
        return;
    };
    if let Err(err) = panel.close() {
        web_sys::console::info_1(&format!("Cannot close WebApp: {err}").into());
        schedule_notice_prune();
    }
}

/// Root component: greeting, match list, actions and notifications.
#[component]
pub fn App() -> impl IntoView {
    let state: RwSignal<PanelState> = RwSignal::new(PanelState::default());

    let panel = MatchPanel::new(TelegramHost::from_window(), HttpMatchSource, BrowserClock)
        .with_observer(move |snapshot| state.set(snapshot.clone()));
    PANEL.with(|slot| *slot.borrow_mut() = Some(Rc::new(panel)));
    on_cleanup(|| {
        PANEL.with(|slot| slot.borrow_mut().take());
    });

    // Host is ready once the bundle runs; initialize exactly once.
    Effect::new(move || {
        spawn_load(|panel| async move { panel.initialize().await });
    });

    view! {
        <div class="panel">
            {move || {
                state
                    .with(|s| s.greeting.clone())
                    .map(|greeting| view! { <div class="greeting">{greeting}</div> })
            }}
            <div id="matches" class="matches">
                {move || render_content(state.with(|s| s.content.clone()))}
            </div>
            <div class="actions">
                <button
                    id="refresh"
                    class="action"
                    on:click=move |_| spawn_load(|panel| async move { panel.refresh().await })
                >
                    "🔄 Refresh"
                </button>
                <button id="close" class="action" on:click=move |_| close_panel()>
                    "✖ Close"
                </button>
            </div>
            <Notices state=state />
        </div>
    }
}

fn render_content(content: PanelContent) -> AnyView {
    match content {
        PanelContent::Loading => view! { <div class="loading">{LOADING_MESSAGE}</div> }.into_any(),
        PanelContent::Blocked(message) | PanelContent::Error(message) => {
            view! { <div class="match error">{message}</div> }.into_any()
        }
        PanelContent::Empty => view! { <div class="match">{EMPTY_MESSAGE}</div> }.into_any(),
        PanelContent::Cards(cards) => cards
            .into_iter()
            .map(|card| view! { <MatchCardView card=card /> })
            .collect_view()
            .into_any(),
    }
}

#[component]
fn MatchCardView(card: MatchCard) -> impl IntoView {
    let fixture = card.fixture_line();
    let time = format!("🕒 {}", card.time);
    view! {
        <div class="match">
            <div class="league">{card.league}</div>
            <div class="vs">{fixture}</div>
            {card.score.map(|score| view! { <div class="score">{score}</div> })}
            <div class="time">{time}</div>
        </div>
    }
}

/// Transient notifications, stacked at the top of the viewport.
#[component]
fn Notices(state: RwSignal<PanelState>) -> impl IntoView {
    view! {
        <div class="notices" style="position: fixed; top: 20px; left: 50%; transform: translateX(-50%); z-index: 1000; display: flex; flex-direction: column; gap: 8px; max-width: 80%;">
            {move || {
                state.with(|s| {
                    s.notices
                        .iter()
                        .map(|notice| {
                            let style = format!(
                                "padding: 12px 20px; background: {}; color: white; border-radius: 8px; box-shadow: 0 4px 12px rgba(0,0,0,0.3); font-size: 14px; text-align: center;",
                                notice.kind.background_css()
                            );
                            let message = notice.message.clone();
                            view! { <div class="notice" style=style>{message}</div> }
                        })
                        .collect_view()
                })
            }}
        </div>
    }
}
