use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{IoAction, Result, SessionError};
use crate::theme::DisplayStyle;

/// Creation-order identity of a tab; stays valid across reorders and closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(pub u64);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The rendered side of a tab.
#[derive(Debug, Clone, Default)]
pub struct PreviewSurface {
    page: String,
    scroll_y: u32,
}

impl PreviewSurface {
    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn scroll_y(&self) -> u32 {
        self.scroll_y
    }

    fn load(&mut self, page: String) {
        // scroll position belongs to the surface, not the content
        self.page = page;
    }
}

/// One open file: its text, its preview and its save state.
#[derive(Debug)]
pub struct DocumentTab {
    id: TabId,
    path: Option<PathBuf>,
    buffer: String,
    cached_markup: String,
    preview: PreviewSurface,
    dirty: bool,
    last_saved: Option<DateTime<Local>>,
    render_generation: u64,
}

impl DocumentTab {
    pub fn new_untitled(id: TabId) -> Self {
        Self {
            id,
            path: None,
            buffer: String::new(),
            cached_markup: String::new(),
            preview: PreviewSurface::default(),
            dirty: false,
            last_saved: None,
            render_generation: 0,
        }
    }

    pub fn from_file(id: TabId, path: PathBuf, content: String) -> Self {
        Self {
            path: Some(path),
            buffer: content,
            ..Self::new_untitled(id)
        }
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn has_path(&self) -> bool {
        self.path.is_some()
    }

    pub fn is_bound_to(&self, path: &Path) -> bool {
        self.path.as_deref() == Some(path)
    }

    pub fn display_name(&self) -> String {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string())
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn cached_markup(&self) -> &str {
        &self.cached_markup
    }

    pub fn preview(&self) -> &PreviewSurface {
        &self.preview
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn last_saved(&self) -> Option<DateTime<Local>> {
        self.last_saved
    }

    pub fn char_count(&self) -> usize {
        self.buffer.chars().count()
    }

    pub fn scroll_position(&self) -> u32 {
        self.preview.scroll_y
    }

    pub fn set_scroll_position(&mut self, y: u32) {
        self.preview.scroll_y = y;
    }

    /// Replace the buffer. Returns false when nothing changed.
    pub fn set_text(&mut self, text: &str) -> bool {
        if self.buffer == text {
            return false;
        }
        self.buffer.clear();
        self.buffer.push_str(text);
        self.dirty = true;
        true
    }

    pub fn append(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        self.buffer.push_str(text);
        self.dirty = true;
        true
    }

    /// Write the buffer to the bound path. State is untouched on failure.
    pub fn write_to_disk(&mut self) -> Result<()> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| SessionError::NotFound(format!("backing file for tab {}", self.id)))?;
        fs::write(path, self.buffer.as_bytes())
            .map_err(|e| SessionError::io(IoAction::Write, path, e))?;
        self.dirty = false;
        Ok(())
    }

    pub fn mark_saved(&mut self, at: DateTime<Local>) {
        self.dirty = false;
        self.last_saved = Some(at);
    }

    pub(crate) fn bind_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }

    /// Claim a new render generation; older in-flight results become stale.
    pub(crate) fn next_render_generation(&mut self) -> u64 {
        self.render_generation += 1;
        self.render_generation
    }

    pub(crate) fn render_generation(&self) -> u64 {
        self.render_generation
    }

    pub(crate) fn show_markup(&mut self, markup: String, style: &DisplayStyle) {
        self.preview.load(style.compose_page(&markup));
        self.cached_markup = markup;
    }
}
