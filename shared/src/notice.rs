use serde::{Deserialize, Serialize};

/// Lifetime of a transient notification.
pub const NOTICE_TTL_MS: f64 = 5_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

impl NoticeKind {
    pub fn background_css(self) -> &'static str {
        match self {
            Self::Success => "#4CAF50",
            Self::Error => "#f44336",
            Self::Info => "#2f80ed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: u64,
    pub message: String,
    pub kind: NoticeKind,
    pub expires_at_ms: f64,
}

/// Stack of on-screen notifications, newest last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoticeTray {
    next_id: u64,
    notices: Vec<Notice>,
}

impl NoticeTray {
    pub fn push(&mut self, message: impl Into<String>, kind: NoticeKind, now_ms: f64) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.notices.push(Notice {
            id,
            message: message.into(),
            kind,
            expires_at_ms: now_ms + NOTICE_TTL_MS,
        });
        id
    }

    /// Drop every notice whose deadline has passed. Returns how many were removed.
    pub fn prune(&mut self, now_ms: f64) -> usize {
        let before = self.notices.len();
        self.notices.retain(|notice| notice.expires_at_ms > now_ms);
        before - self.notices.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_survives_until_ttl() {
        let mut tray = NoticeTray::default();
        tray.push("Loaded 3 matches", NoticeKind::Success, 1_000.0);

        assert_eq!(tray.prune(5_999.0), 0);
        assert_eq!(tray.len(), 1);
        assert_eq!(tray.prune(6_000.0), 1);
        assert!(tray.is_empty());
    }

    #[test]
    fn prune_only_removes_expired() {
        let mut tray = NoticeTray::default();
        let first = tray.push("first", NoticeKind::Info, 0.0);
        let second = tray.push("second", NoticeKind::Error, 2_000.0);
        assert_ne!(first, second);

        tray.prune(5_000.0);
        let remaining: Vec<u64> = tray.iter().map(|n| n.id).collect();
        assert_eq!(remaining, vec![second]);
    }
}
