//! Match list panel controller.
//!
//! The controller knows nothing about the DOM or the Telegram SDK. It talks to
//! the embedding shell through [`Host`], fetches through [`MatchSource`] and
//! reads time from [`Clock`], so the whole fetch/render/notify cycle runs the
//! same way in the browser and in native tests.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::card::{MatchCard, cards_for};
use crate::matches::MatchListResponse;
use crate::notice::{NoticeKind, NoticeTray};

pub const MATCHES_PATH: &str = "/api/matches";
pub const INIT_DATA_HEADER: &str = "X-Telegram-Init-Data";

pub const LOADING_MESSAGE: &str = "⏳ Loading...";
pub const EMPTY_MESSAGE: &str = "⚽ No upcoming matches right now";
pub const BLOCKED_MESSAGE: &str = "Please open the app via Telegram";
pub const UNAUTHORIZED_MESSAGE: &str = "❌ Authorization error. Please open the app via Telegram.";
pub const GENERIC_ERROR_MESSAGE: &str = "❌ Failed to load matches";
pub const CLOSE_FALLBACK_MESSAGE: &str = "The app can be closed via Telegram";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("host capability `{0}` is unavailable")]
    Unavailable(&'static str),
    #[error("host call `{capability}` failed: {message}")]
    Failed {
        capability: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("host did not provide init data")]
    MissingInitData,
    #[error("request was not authorized")]
    Unauthorized,
    #[error("HTTP {0}")]
    Status(u16),
    #[error("fetch error: {0}")]
    Transport(String),
    #[error("parse error: {0}")]
    Decode(String),
}

impl LoadError {
    /// Text shown in the error card and error notification.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingInitData => BLOCKED_MESSAGE,
            Self::Unauthorized => UNAUTHORIZED_MESSAGE,
            Self::Status(_) | Self::Transport(_) | Self::Decode(_) => GENERIC_ERROR_MESSAGE,
        }
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_status(status: u16) -> Self {
        if status == 401 {
            Self::Unauthorized
        } else {
            Self::Status(status)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostUser {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl HostUser {
    pub fn greeting(&self) -> String {
        let name = self
            .first_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or("user");
        format!("Hello, {name}!")
    }
}

/// Capabilities the embedding shell exposes to the panel.
pub trait Host {
    fn expand(&self) -> Result<(), HostError>;
    fn close(&self) -> Result<(), HostError>;
    /// Opaque auth token issued by the host, if any.
    fn init_data(&self) -> Option<String>;
    fn user(&self) -> Option<HostUser>;
    fn show_back_button(&self, on_click: Box<dyn Fn()>) -> Result<(), HostError>;
}

pub trait MatchSource {
    fn fetch_matches(
        &self,
        init_data: Option<&str>,
    ) -> impl Future<Output = Result<MatchListResponse, LoadError>>;
}

pub trait Clock {
    fn now_ms(&self) -> f64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PanelContent {
    Loading,
    Blocked(String),
    Empty,
    Cards(Vec<MatchCard>),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelState {
    pub content: PanelContent,
    pub notices: NoticeTray,
    pub greeting: Option<String>,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            content: PanelContent::Loading,
            notices: NoticeTray::default(),
            greeting: None,
        }
    }
}

type Observer = Box<dyn Fn(&PanelState)>;

pub struct MatchPanel<H, S, C> {
    host: H,
    source: S,
    clock: C,
    state: RefCell<PanelState>,
    observer: Option<Observer>,
}

impl<H, S, C> MatchPanel<H, S, C>
where
    H: Host + Clone + 'static,
    S: MatchSource,
    C: Clock,
{
    pub fn new(host: H, source: S, clock: C) -> Self {
        Self {
            host,
            source,
            clock,
            state: RefCell::new(PanelState::default()),
            observer: None,
        }
    }

    /// Called after every state change. Must not call back into the panel.
    pub fn with_observer(mut self, observer: impl Fn(&PanelState) + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> PanelState {
        self.state.borrow().clone()
    }

    /// Run once when the host is ready. Returns the number of cards rendered.
    pub async fn initialize(&self) -> Result<usize, LoadError> {
        let _ = self.host.expand();

        let host = self.host.clone();
        let _ = self.host.show_back_button(Box::new(move || {
            let _ = host.close();
        }));

        if self.auth_token().is_none() {
            self.update(|state| {
                state.content = PanelContent::Blocked(BLOCKED_MESSAGE.to_owned());
            });
            return Err(LoadError::MissingInitData);
        }

        if let Some(user) = self.host.user() {
            self.update(|state| state.greeting = Some(user.greeting()));
        }

        self.load_matches().await
    }

    /// One fetch/render cycle. Concurrent calls are not coordinated; whichever
    /// response resolves last owns the container.
    pub async fn load_matches(&self) -> Result<usize, LoadError> {
        self.update(|state| state.content = PanelContent::Loading);

        let token = self.auth_token();
        let result = self.source.fetch_matches(token.as_deref()).await;
        let now_ms = self.clock.now_ms();

        match result {
            Ok(response) if response.data.is_empty() => {
                self.update(|state| state.content = PanelContent::Empty);
                Ok(0)
            }
            Ok(response) => {
                let cards = cards_for(&response.data);
                let count = cards.len();
                self.update(|state| {
                    state.content = PanelContent::Cards(cards);
                    state.notices.push(
                        format!("Loaded {count} matches"),
                        NoticeKind::Success,
                        now_ms,
                    );
                });
                Ok(count)
            }
            Err(err) => {
                let message = err.user_message();
                self.update(|state| {
                    state.content = PanelContent::Error(message.to_owned());
                    state.notices.push(message, NoticeKind::Error, now_ms);
                });
                Err(err)
            }
        }
    }

    pub async fn refresh(&self) -> Result<usize, LoadError> {
        self.load_matches().await
    }

    pub fn close(&self) -> Result<(), HostError> {
        let result = self.host.close();
        if result.is_err() {
            let now_ms = self.clock.now_ms();
            self.update(|state| {
                state
                    .notices
                    .push(CLOSE_FALLBACK_MESSAGE, NoticeKind::Info, now_ms);
            });
        }
        result
    }

    /// Remove expired notifications. Returns true if anything was removed.
    pub fn prune_notices(&self) -> bool {
        let now_ms = self.clock.now_ms();
        let removed = self.state.borrow_mut().notices.prune(now_ms);
        if removed > 0 {
            self.emit();
        }
        removed > 0
    }

    fn auth_token(&self) -> Option<String> {
        self.host.init_data().filter(|token| !token.is_empty())
    }

    fn update(&self, f: impl FnOnce(&mut PanelState)) {
        f(&mut self.state.borrow_mut());
        self.emit();
    }

    fn emit(&self) {
        if let Some(observer) = &self.observer {
            observer(&self.state.borrow());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use futures::FutureExt;
    use futures::channel::oneshot;
    use futures::executor::block_on;

    use super::*;
    use crate::matches::{League, Match, Scores, Team, Teams};
    use crate::notice::NOTICE_TTL_MS;

    #[derive(Clone, Default)]
    struct FakeHost {
        init_data: Option<String>,
        user: Option<HostUser>,
        can_close: bool,
        expand_calls: Rc<Cell<u32>>,
        close_calls: Rc<Cell<u32>>,
        back_button: Rc<RefCell<Option<Box<dyn Fn()>>>>,
    }

    impl Host for FakeHost {
        fn expand(&self) -> Result<(), HostError> {
            self.expand_calls.set(self.expand_calls.get() + 1);
            Err(HostError::Unavailable("expand"))
        }

        fn close(&self) -> Result<(), HostError> {
            self.close_calls.set(self.close_calls.get() + 1);
            if self.can_close {
                Ok(())
            } else {
                Err(HostError::Unavailable("close"))
            }
        }

        fn init_data(&self) -> Option<String> {
            self.init_data.clone()
        }

        fn user(&self) -> Option<HostUser> {
            self.user.clone()
        }

        fn show_back_button(&self, on_click: Box<dyn Fn()>) -> Result<(), HostError> {
            *self.back_button.borrow_mut() = Some(on_click);
            Ok(())
        }
    }

    struct FakeSource {
        reply: Result<MatchListResponse, LoadError>,
        calls: Rc<Cell<u32>>,
        seen_token: Rc<RefCell<Option<String>>>,
    }

    impl FakeSource {
        fn replying(reply: Result<MatchListResponse, LoadError>) -> Self {
            Self {
                reply,
                calls: Rc::new(Cell::new(0)),
                seen_token: Rc::new(RefCell::new(None)),
            }
        }
    }

    impl MatchSource for FakeSource {
        async fn fetch_matches(
            &self,
            init_data: Option<&str>,
        ) -> Result<MatchListResponse, LoadError> {
            self.calls.set(self.calls.get() + 1);
            *self.seen_token.borrow_mut() = init_data.map(str::to_owned);
            self.reply.clone()
        }
    }

    /// Each fetch waits on the next queued channel, so replies can be
    /// released in any order.
    #[derive(Default)]
    struct GatedSource {
        gates: RefCell<VecDeque<oneshot::Receiver<Result<MatchListResponse, LoadError>>>>,
    }

    impl GatedSource {
        fn gate(&self) -> oneshot::Sender<Result<MatchListResponse, LoadError>> {
            let (tx, rx) = oneshot::channel();
            self.gates.borrow_mut().push_back(rx);
            tx
        }
    }

    impl MatchSource for GatedSource {
        async fn fetch_matches(
            &self,
            _init_data: Option<&str>,
        ) -> Result<MatchListResponse, LoadError> {
            let gate = self.gates.borrow_mut().pop_front().expect("gate queued");
            gate.await
                .unwrap_or_else(|_| Err(LoadError::Transport("gate dropped".to_owned())))
        }
    }

    #[derive(Clone, Default)]
    struct FakeClock(Rc<Cell<f64>>);

    impl FakeClock {
        fn advance(&self, ms: f64) {
            self.0.set(self.0.get() + ms);
        }
    }

    impl Clock for FakeClock {
        fn now_ms(&self) -> f64 {
            self.0.get()
        }
    }

    fn signed_in_host() -> FakeHost {
        FakeHost {
            init_data: Some("query_id=AAH&user=%7B%7D&hash=ab12".to_owned()),
            ..FakeHost::default()
        }
    }

    fn named_match(home: &str, away: &str) -> Match {
        Match {
            league: Some(League {
                name: Some("Premier League".to_owned()),
            }),
            teams: Some(Teams {
                home: Some(Team {
                    name: Some(home.to_owned()),
                }),
                away: Some(Team {
                    name: Some(away.to_owned()),
                }),
            }),
            time: Some("19:45".to_owned()),
            scores: None,
        }
    }

    fn response(matches: Vec<Match>) -> Result<MatchListResponse, LoadError> {
        Ok(MatchListResponse { data: matches })
    }

    #[test]
    fn empty_response_renders_placeholder_without_error() {
        let panel = MatchPanel::new(
            signed_in_host(),
            FakeSource::replying(response(Vec::new())),
            FakeClock::default(),
        );

        assert_eq!(block_on(panel.load_matches()), Ok(0));
        let state = panel.state();
        assert_eq!(state.content, PanelContent::Empty);
        assert!(state.notices.is_empty());
    }

    #[test]
    fn renders_one_card_per_match_in_order() {
        let matches = vec![
            named_match("Liverpool", "Fulham"),
            named_match("Brighton", "Wolves"),
        ];
        let panel = MatchPanel::new(
            signed_in_host(),
            FakeSource::replying(response(matches)),
            FakeClock::default(),
        );

        assert_eq!(block_on(panel.load_matches()), Ok(2));
        let PanelContent::Cards(cards) = panel.state().content else {
            panic!("expected cards");
        };
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].home, "Liverpool");
        assert_eq!(cards[1].home, "Brighton");
    }

    #[test]
    fn partial_scores_and_missing_names_use_placeholders() {
        let m = Match {
            scores: Some(Scores {
                home: Some("1".to_owned()),
                away: None,
            }),
            ..Match::default()
        };
        let panel = MatchPanel::new(
            signed_in_host(),
            FakeSource::replying(response(vec![m])),
            FakeClock::default(),
        );

        block_on(panel.load_matches()).expect("load succeeds");
        let PanelContent::Cards(cards) = panel.state().content else {
            panic!("expected cards");
        };
        assert_eq!(cards[0].score, None);
        assert_eq!(cards[0].league, "—");
        assert_eq!(cards[0].home, "Home");
        assert_eq!(cards[0].away, "Away");
    }

    #[test]
    fn unauthorized_shows_authorization_message() {
        let panel = MatchPanel::new(
            signed_in_host(),
            FakeSource::replying(Err(LoadError::from_status(401))),
            FakeClock::default(),
        );

        assert_eq!(
            block_on(panel.load_matches()),
            Err(LoadError::Unauthorized)
        );
        let state = panel.state();
        let PanelContent::Error(message) = &state.content else {
            panic!("expected error content");
        };
        assert!(message.contains("Authorization"));
        let notice = state.notices.iter().next().expect("error notice");
        assert_eq!(notice.kind, NoticeKind::Error);
    }

    #[test]
    fn other_failures_show_generic_message() {
        for err in [
            LoadError::from_status(500),
            LoadError::Transport("connection reset".to_owned()),
            LoadError::Decode("expected value at line 1".to_owned()),
        ] {
            let panel = MatchPanel::new(
                signed_in_host(),
                FakeSource::replying(Err(err)),
                FakeClock::default(),
            );
            let _ = block_on(panel.load_matches());
            assert_eq!(
                panel.state().content,
                PanelContent::Error(GENERIC_ERROR_MESSAGE.to_owned())
            );
        }
    }

    #[test]
    fn success_notice_expires_after_ttl() {
        let clock = FakeClock::default();
        let panel = MatchPanel::new(
            signed_in_host(),
            FakeSource::replying(response(vec![named_match("Leeds", "Burnley")])),
            clock.clone(),
        );

        block_on(panel.load_matches()).expect("load succeeds");
        let notice = panel.state().notices.iter().next().cloned().expect("notice");
        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(notice.message, "Loaded 1 matches");

        clock.advance(NOTICE_TTL_MS - 1.0);
        assert!(!panel.prune_notices());
        assert_eq!(panel.state().notices.len(), 1);

        clock.advance(1.0);
        assert!(panel.prune_notices());
        assert!(panel.state().notices.is_empty());
    }

    #[test]
    fn missing_init_data_blocks_fetch() {
        let source = FakeSource::replying(response(vec![named_match("A", "B")]));
        let calls = Rc::clone(&source.calls);
        let panel = MatchPanel::new(FakeHost::default(), source, FakeClock::default());

        assert_eq!(
            block_on(panel.initialize()),
            Err(LoadError::MissingInitData)
        );
        assert_eq!(calls.get(), 0);
        assert_eq!(
            panel.state().content,
            PanelContent::Blocked(BLOCKED_MESSAGE.to_owned())
        );
    }

    #[test]
    fn initialize_forwards_token_and_greets_user() {
        let host = FakeHost {
            user: Some(HostUser {
                first_name: Some("Dana".to_owned()),
                username: None,
            }),
            ..signed_in_host()
        };
        let expand_calls = Rc::clone(&host.expand_calls);
        let source = FakeSource::replying(response(vec![named_match("A", "B")]));
        let seen_token = Rc::clone(&source.seen_token);
        let panel = MatchPanel::new(host, source, FakeClock::default());

        assert_eq!(block_on(panel.initialize()), Ok(1));
        assert_eq!(expand_calls.get(), 1);
        assert_eq!(
            seen_token.borrow().as_deref(),
            Some("query_id=AAH&user=%7B%7D&hash=ab12")
        );
        assert_eq!(panel.state().greeting.as_deref(), Some("Hello, Dana!"));
    }

    #[test]
    fn back_button_closes_host() {
        let host = FakeHost {
            can_close: true,
            ..signed_in_host()
        };
        let close_calls = Rc::clone(&host.close_calls);
        let back_button = Rc::clone(&host.back_button);
        let panel = MatchPanel::new(
            host,
            FakeSource::replying(response(Vec::new())),
            FakeClock::default(),
        );

        let _ = block_on(panel.initialize());
        let handler = back_button.borrow_mut().take().expect("back button registered");
        handler();
        assert_eq!(close_calls.get(), 1);
    }

    #[test]
    fn close_failure_raises_fallback_notice() {
        let panel = MatchPanel::new(
            signed_in_host(),
            FakeSource::replying(response(Vec::new())),
            FakeClock::default(),
        );

        assert!(panel.close().is_err());
        let notice = panel.state().notices.iter().next().cloned().expect("notice");
        assert_eq!(notice.message, CLOSE_FALLBACK_MESSAGE);
        assert_eq!(notice.kind, NoticeKind::Info);
    }

    #[test]
    fn observer_sees_loading_before_result() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let panel = MatchPanel::new(
            signed_in_host(),
            FakeSource::replying(response(Vec::new())),
            FakeClock::default(),
        )
        .with_observer(move |state| sink.borrow_mut().push(state.content.clone()));

        block_on(panel.refresh()).expect("refresh succeeds");
        assert_eq!(
            *seen.borrow(),
            vec![PanelContent::Loading, PanelContent::Empty]
        );
    }

    #[test]
    fn status_mapping_only_treats_401_as_unauthorized() {
        assert_eq!(LoadError::from_status(401), LoadError::Unauthorized);
        for status in [400, 403, 404, 500, 502] {
            let err = LoadError::from_status(status);
            assert_eq!(err, LoadError::Status(status));
            assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
        }
        assert_eq!(LoadError::Unauthorized.user_message(), UNAUTHORIZED_MESSAGE);
    }

    #[test]
    fn overlapping_loads_keep_the_last_reply_to_resolve() {
        let source = GatedSource::default();
        let first_gate = source.gate();
        let second_gate = source.gate();
        let panel = MatchPanel::new(signed_in_host(), source, FakeClock::default());

        let first = panel.load_matches();
        let second = panel.refresh();
        futures::pin_mut!(first, second);
        assert!(first.as_mut().now_or_never().is_none());
        assert!(second.as_mut().now_or_never().is_none());
        assert_eq!(panel.state().content, PanelContent::Loading);

        second_gate
            .send(response(vec![named_match("Fresh", "Reply")]))
            .expect("second fetch waiting");
        assert_eq!(second.as_mut().now_or_never(), Some(Ok(1)));

        first_gate
            .send(response(vec![
                named_match("Stale", "Reply"),
                named_match("Stale", "Extra"),
            ]))
            .expect("first fetch waiting");
        assert_eq!(first.as_mut().now_or_never(), Some(Ok(2)));

        let state = panel.state();
        let PanelContent::Cards(cards) = &state.content else {
            panic!("expected cards");
        };
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].home, "Stale");
        assert_eq!(state.notices.len(), 2);
    }
}
