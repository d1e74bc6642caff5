pub mod card;
pub mod matches;
pub mod notice;
pub mod panel;

pub use card::{MatchCard, cards_for};
pub use matches::*;
pub use notice::{NOTICE_TTL_MS, Notice, NoticeKind, NoticeTray};
pub use panel::*;
