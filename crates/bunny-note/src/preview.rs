//! Live preview: the renderer seam, the debounce state machine and the
//! request/result pair used to move rendering off the controlling thread.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::document::TabId;

pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(50);

/// Markdown in, markup out. Must be total and free of side effects.
pub trait Renderer: Send + Sync {
    fn render(&self, text: &str) -> String;
}

/// The production renderer backed by `mdcore`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl Renderer for MarkdownRenderer {
    fn render(&self, text: &str) -> String {
        mdcore::render(text)
    }
}

/// Render, degrading to the escaped raw text if the renderer blows up so
/// the preview is never left blank.
pub fn render_or_raw(renderer: &dyn Renderer, text: &str) -> String {
    match catch_unwind(AssertUnwindSafe(|| renderer.render(text))) {
        Ok(markup) => markup,
        Err(_) => {
            log::warn!("Renderer failed; showing raw text ({} bytes)", text.len());
            raw_markup(text)
        }
    }
}

fn raw_markup(text: &str) -> String {
    format!("<pre>{}</pre>", mdcore::clean_text(text))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewState {
    Idle,
    Pending { deadline: Instant },
}

/// Debounce for preview renders: every edit pushes the deadline out, and
/// only a quiet window lets it fire.
#[derive(Debug, Clone)]
pub struct PreviewScheduler {
    window: Duration,
    state: PreviewState,
}

impl PreviewScheduler {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: PreviewState::Idle,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn state(&self) -> PreviewState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, PreviewState::Pending { .. })
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            PreviewState::Pending { deadline } => Some(deadline),
            PreviewState::Idle => None,
        }
    }

    /// idle|pending -> pending, restarting the window.
    pub fn on_edit(&mut self, now: Instant) {
        self.state = PreviewState::Pending {
            deadline: now + self.window,
        };
    }

    /// Returns true exactly once per quiet window, moving back to idle.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        match self.state {
            PreviewState::Pending { deadline } if now >= deadline => {
                self.state = PreviewState::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.state = PreviewState::Idle;
    }
}

impl Default for PreviewScheduler {
    fn default() -> Self {
        Self::new(DEBOUNCE_WINDOW)
    }
}

/// A render of one buffer snapshot, addressed by stable tab identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub tab: TabId,
    pub generation: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderResult {
    pub tab: TabId,
    pub generation: u64,
    pub markup: String,
}

impl RenderRequest {
    pub fn run(self, renderer: &dyn Renderer) -> RenderResult {
        let markup = render_or_raw(renderer, &self.text);
        RenderResult {
            tab: self.tab,
            generation: self.generation,
            markup,
        }
    }

    /// Run on the blocking pool so large documents do not stall input.
    pub async fn run_offloaded(self, renderer: Arc<dyn Renderer>) -> RenderResult {
        let (tab, generation) = (self.tab, self.generation);
        let fallback = raw_markup(&self.text);
        match tokio::task::spawn_blocking(move || self.run(renderer.as_ref())).await {
            Ok(result) => result,
            Err(e) => {
                log::error!("Render worker for tab {} failed: {}", tab, e);
                RenderResult {
                    tab,
                    generation,
                    markup: fallback,
                }
            }
        }
    }
}
