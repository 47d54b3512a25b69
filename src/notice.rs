use std::time::{Duration, Instant};

use tracing::debug;

/// Time a notice takes to fade out once its display time is over
pub const FADE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticePhase {
    Shown,
    Fading,
    Gone,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub message: String,
    created: Instant,
}

/// Transient messages: shown for a fixed time, then fading, then removed
#[derive(Debug)]
pub struct Notices {
    display: Duration,
    items: Vec<Notice>,
}

impl Notices {
    pub fn new(display: Duration) -> Self {
        Self {
            display,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.push_at(message, Instant::now());
    }

    pub fn push_at(&mut self, message: impl Into<String>, now: Instant) {
        let message = message.into();
        debug!(message = %message, "notice");
        self.items.push(Notice {
            message,
            created: now,
        });
    }

    pub fn phase(&self, notice: &Notice, now: Instant) -> NoticePhase {
        let age = now.saturating_duration_since(notice.created);
        if age < self.display {
            NoticePhase::Shown
        } else if age < self.display + FADE {
            NoticePhase::Fading
        } else {
            NoticePhase::Gone
        }
    }

    /// Drop notices whose fade has finished
    pub fn prune(&mut self, now: Instant) {
        let display = self.display;
        self.items
            .retain(|n| now.saturating_duration_since(n.created) < display + FADE);
    }

    pub fn visible(&self, now: Instant) -> Vec<(&Notice, NoticePhase)> {
        self.items
            .iter()
            .map(|n| (n, self.phase(n, now)))
            .filter(|(_, phase)| *phase != NoticePhase::Gone)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for Notices {
    fn default() -> Self {
        Self::new(Duration::from_millis(3000))
    }
}
