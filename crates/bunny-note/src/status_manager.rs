use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
}

impl MessageKind {
    fn lifetime(self) -> Duration {
        match self {
            MessageKind::Info => Duration::from_secs(3),
            MessageKind::Success => Duration::from_secs(2),
            MessageKind::Warning => Duration::from_secs(5),
            MessageKind::Error => Duration::from_secs(7),
        }
    }

    fn label(self) -> &'static str {
        match self {
            MessageKind::Info => "info",
            MessageKind::Success => "ok",
            MessageKind::Warning => "warning",
            MessageKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub content: String,
    pub kind: MessageKind,
    pub created_at: Instant,
}

impl StatusMessage {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.kind.lifetime()
    }
}

/// Status bar: character count, the "last saved" indicator and transient
/// messages reporting what just happened (including every failure).
#[derive(Debug, Clone, Default)]
pub struct StatusManager {
    message: Option<StatusMessage>,
    history: Vec<StatusMessage>,
    char_count: usize,
    last_saved: Option<DateTime<Local>>,
}

const HISTORY_LIMIT: usize = 64;

impl StatusManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, content: String, kind: MessageKind) {
        let message = StatusMessage {
            content,
            kind,
            created_at: Instant::now(),
        };
        if self.history.len() == HISTORY_LIMIT {
            self.history.remove(0);
        }
        self.history.push(message.clone());
        self.message = Some(message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(message.into(), MessageKind::Info);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(message.into(), MessageKind::Success);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(message.into(), MessageKind::Warning);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(message.into(), MessageKind::Error);
    }

    /// Drop the current message once it has outlived its kind's lifetime.
    pub fn update(&mut self, now: Instant) {
        if self.message.as_ref().is_some_and(|m| m.is_expired(now)) {
            self.message = None;
        }
    }

    pub fn current(&self) -> Option<&StatusMessage> {
        self.message.as_ref()
    }

    /// Every message posted so far, oldest first (bounded).
    pub fn history(&self) -> &[StatusMessage] {
        &self.history
    }

    pub fn set_char_count(&mut self, count: usize) {
        self.char_count = count;
    }

    pub fn char_count(&self) -> usize {
        self.char_count
    }

    pub fn set_last_saved(&mut self, at: DateTime<Local>) {
        self.last_saved = Some(at);
    }

    pub fn last_saved(&self) -> Option<DateTime<Local>> {
        self.last_saved
    }

    pub fn last_saved_label(&self) -> String {
        match self.last_saved {
            Some(at) => format!("Last saved: {}", at.format("%Y-%m-%d %H:%M:%S")),
            None => "Last saved: Never".to_string(),
        }
    }

    pub fn render_line(&self) -> String {
        let mut line = format!("Chars: {} | {}", self.char_count, self.last_saved_label());
        if let Some(message) = &self.message {
            line.push_str(&format!(" | [{}] {}", message.kind.label(), message.content));
        }
        line
    }
}
