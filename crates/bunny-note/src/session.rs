//! The multi-document session: which files are open, in what order, which
//! one is active, and every filesystem side effect that goes with that.
//!
//! Positions (`usize` indices) are for immediate UI interactions and may be
//! stale by the time a handler runs; a stale position is a silent no-op.
//! Anything queued (render results) is addressed by [`TabId`].

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::autosave::{AutosaveScheduler, FlushReport};
use crate::document::{DocumentTab, TabId};
use crate::error::{IoAction, Result, SessionError};
use crate::file_listing::{document_file_name, FileListing};
use crate::preview::{render_or_raw, PreviewScheduler, RenderRequest, RenderResult, Renderer};
use crate::settings::SettingsStore;
use crate::status_manager::StatusManager;
use crate::theme::{display_style, DisplayStyle, Theme};

pub const IMAGES_DIR: &str = "images";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// The tab has no backing file yet; ask for one and call `save_as`.
    NeedsPath,
    /// The position was stale.
    Skipped,
}

/// What one call to [`Session::tick`] did.
#[derive(Debug, Default)]
pub struct TickOutcome {
    pub rendered: Option<TabId>,
    pub autosave: Option<FlushReport>,
}

pub struct Session {
    tabs: Vec<DocumentTab>,
    active: Option<usize>,
    next_id: u64,
    theme: Theme,
    font: String,
    font_size: u16,
    settings: SettingsStore,
    listing: FileListing,
    preview: PreviewScheduler,
    autosave: AutosaveScheduler,
    renderer: Arc<dyn Renderer>,
    status: StatusManager,
}

impl Session {
    pub fn new(
        settings: SettingsStore,
        workdir: impl Into<PathBuf>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        let workdir = workdir.into();
        let workdir = fs::canonicalize(&workdir).unwrap_or(workdir);
        let record = settings.record().clone();
        let theme = Theme::from_name(&record.theme).unwrap_or_else(|| {
            log::warn!("Unknown theme '{}', using {}", record.theme, Theme::default());
            Theme::default()
        });

        let mut session = Self {
            tabs: Vec::new(),
            active: None,
            next_id: 1,
            theme,
            font: record.font,
            font_size: record.font_size,
            settings,
            listing: FileListing::new(workdir),
            preview: PreviewScheduler::default(),
            autosave: AutosaveScheduler::default(),
            renderer,
            status: StatusManager::new(),
        };

        if let Err(e) = session.listing.refresh() {
            log::warn!("Failed to list documents: {}", e);
            session.status.warning(e.to_string());
        }
        session
    }

    pub fn with_preview_window(mut self, window: Duration) -> Self {
        self.preview = PreviewScheduler::new(window);
        self
    }

    pub fn with_autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave = AutosaveScheduler::new(interval);
        self
    }

    /// Start the autosave clock.
    pub fn start(&mut self, now: Instant) {
        self.autosave.start(now);
        log::debug!("Autosave every {:?}", self.autosave.interval());
    }

    // ---- accessors -------------------------------------------------------

    pub fn tabs(&self) -> &[DocumentTab] {
        &self.tabs
    }

    pub fn tab(&self, index: usize) -> Option<&DocumentTab> {
        self.tabs.get(index)
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active.filter(|&i| i < self.tabs.len())
    }

    pub fn active_tab(&self) -> Option<&DocumentTab> {
        self.active_index().and_then(|i| self.tabs.get(i))
    }

    pub fn index_of(&self, id: TabId) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.id() == id)
    }

    pub fn index_of_path(&self, path: &Path) -> Option<usize> {
        let path = self.resolve(path);
        self.tabs.iter().position(|tab| tab.is_bound_to(&path))
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn font(&self) -> (&str, u16) {
        (&self.font, self.font_size)
    }

    pub fn style(&self) -> DisplayStyle {
        display_style(self.theme, &self.font, self.font_size)
    }

    pub fn workdir(&self) -> &Path {
        self.listing.dir()
    }

    pub fn listing(&self) -> &FileListing {
        &self.listing
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn status(&self) -> &StatusManager {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut StatusManager {
        &mut self.status
    }

    pub fn preview_scheduler(&self) -> &PreviewScheduler {
        &self.preview
    }

    pub fn autosave_scheduler(&self) -> &AutosaveScheduler {
        &self.autosave
    }

    // ---- open / create ---------------------------------------------------

    /// Open `path`, or select it if a tab already holds it.
    pub fn open(&mut self, path: &Path) -> Result<usize> {
        let path = self.resolve(path);
        if let Some(index) = self.tabs.iter().position(|tab| tab.is_bound_to(&path)) {
            log::debug!("{} already open, selecting tab {}", path.display(), index);
            self.switch_to(index);
            return Ok(index);
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => return self.report(Err(SessionError::io(IoAction::Read, &path, e))),
        };

        let id = self.allocate_id();
        self.tabs.push(DocumentTab::from_file(id, path.clone(), content));
        let index = self.tabs.len() - 1;
        self.activate(index);
        log::info!("Opened {} as tab {}", path.display(), id);

        if let Err(e) = self.settings.record_last_opened(&path) {
            self.settings_warning(e);
        }
        self.status.info(format!("Opened {}", path.display()));
        Ok(index)
    }

    /// Open a file from anywhere: its folder becomes the working folder.
    /// Nothing about the folder or listing changes unless the open succeeds.
    pub fn open_external(&mut self, path: &Path) -> Result<usize> {
        let path = self.resolve(path);
        let index = self.open(&path)?;

        if let Some(parent) = path.parent() {
            if parent != self.listing.dir() {
                if let Err(e) = self.listing.change_dir(parent) {
                    log::warn!("Could not switch to {}: {}", parent.display(), e);
                    self.status.warning(e.to_string());
                }
            }
        }
        if path.parent() == Some(self.listing.dir()) {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                self.listing.add(name);
            }
            self.listing.select_path(Some(&path));
        }
        Ok(index)
    }

    /// Open an untitled tab with no backing file.
    pub fn new_untitled(&mut self) -> usize {
        let id = self.allocate_id();
        self.tabs.push(DocumentTab::new_untitled(id));
        let index = self.tabs.len() - 1;
        self.activate(index);
        index
    }

    /// Create an empty document in the working folder and open it.
    /// Returns `None` when the name is unusable.
    pub fn create_new(&mut self, name: &str) -> Result<Option<usize>> {
        let Some(file_name) = document_file_name(name) else {
            log::debug!("Ignoring unusable document name '{}'", name);
            return Ok(None);
        };
        let path = self.listing.path_of(&file_name);

        let created = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => SessionError::NameConflict { path: path.clone() },
                _ => SessionError::io(IoAction::Create, &path, e),
            });
        self.report(created)?;
        log::info!("Created {}", path.display());

        self.refresh_listing();
        self.open(&path).map(Some)
    }

    /// Switch the working folder. Open tabs are left alone.
    pub fn open_folder(&mut self, dir: &Path) -> Result<()> {
        let dir = self.resolve(dir);
        match self.listing.change_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                log::warn!("{}", e);
                self.status.warning(e.to_string());
                return Err(e);
            }
            Err(e) => return self.report(Err(e)),
        }
        let active_path = self.active_tab().and_then(|t| t.path()).map(Path::to_path_buf);
        self.listing.select_path(active_path.as_deref());
        self.status.info(format!("Folder {}", dir.display()));
        Ok(())
    }

    /// Reopen the file recorded at the end of the previous session.
    pub fn restore_last_opened(&mut self) -> Option<usize> {
        let last = self.settings.record().last_opened_file.clone();
        if last.is_empty() {
            return None;
        }
        let path = PathBuf::from(&last);
        if !path.is_file() {
            log::info!("Last opened file {} no longer exists", last);
            return None;
        }
        match self.open_external(&path) {
            Ok(index) => Some(index),
            Err(e) => {
                log::warn!("Failed to restore {}: {}", last, e);
                None
            }
        }
    }

    // ---- selection -------------------------------------------------------

    /// Make `index` active and render it right away. Out of range clears the
    /// selection.
    pub fn switch_to(&mut self, index: usize) {
        if index >= self.tabs.len() {
            self.active = None;
            self.listing.clear_selection();
            self.status.set_char_count(0);
            return;
        }
        self.activate(index);
    }

    pub fn move_tab(&mut self, from: usize, to: usize) {
        if from >= self.tabs.len() || to >= self.tabs.len() || from == to {
            return;
        }
        let active_id = self.active_tab().map(DocumentTab::id);
        let tab = self.tabs.remove(from);
        self.tabs.insert(to, tab);
        self.active = active_id.and_then(|id| self.index_of(id));
    }

    pub fn set_scroll_position(&mut self, index: usize, y: u32) {
        if let Some(tab) = self.tabs.get_mut(index) {
            tab.set_scroll_position(y);
        }
    }

    // ---- editing ---------------------------------------------------------

    pub fn set_text(&mut self, index: usize, text: &str, now: Instant) {
        let changed = match self.tabs.get_mut(index) {
            Some(tab) => tab.set_text(text),
            None => return,
        };
        if changed {
            self.edited(index, now);
        }
    }

    pub fn append_text(&mut self, index: usize, text: &str, now: Instant) {
        let changed = match self.tabs.get_mut(index) {
            Some(tab) => tab.append(text),
            None => return,
        };
        if changed {
            self.edited(index, now);
        }
    }

    fn edited(&mut self, index: usize, now: Instant) {
        if self.active_index() != Some(index) {
            return;
        }
        self.preview.on_edit(now);
        let count = self.tabs[index].char_count();
        self.status.set_char_count(count);
    }

    /// Copy an image next to the document and reference it from the buffer.
    /// Returns the relative reference that was inserted.
    pub fn insert_image(&mut self, index: usize, image: &Path, now: Instant) -> Result<String> {
        let Some(tab) = self.tabs.get(index) else {
            return Ok(String::new());
        };
        let Some(doc_dir) = tab.path().and_then(Path::parent).map(Path::to_path_buf) else {
            self.status.warning("Save the document before inserting images");
            return Err(SessionError::NotFound("backing file for image insert".to_string()));
        };
        let Some(file_name) = image.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            return self.report(Err(SessionError::NotFound(format!("image {}", image.display()))));
        };

        let images_dir = doc_dir.join(IMAGES_DIR);
        let created = fs::create_dir_all(&images_dir)
            .map_err(|e| SessionError::io(IoAction::Create, &images_dir, e));
        self.report(created)?;

        let target = images_dir.join(&file_name);
        if !target.exists() {
            let copied = fs::copy(image, &target)
                .map(|_| ())
                .map_err(|e| SessionError::io(IoAction::Copy, image, e));
            self.report(copied)?;
            log::info!("Copied image to {}", target.display());
        }

        let reference = format!("{}/{}", IMAGES_DIR, file_name);
        let alt = Path::new(&file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let mut snippet = String::new();
        if !self.tabs[index].buffer().is_empty() && !self.tabs[index].buffer().ends_with('\n') {
            snippet.push('\n');
        }
        snippet.push_str(&format!("![{}]({})\n", alt, reference));
        self.append_text(index, &snippet, now);
        Ok(reference)
    }

    // ---- saving ----------------------------------------------------------

    pub fn save(&mut self, index: usize) -> Result<SaveOutcome> {
        let Some(tab) = self.tabs.get_mut(index) else {
            return Ok(SaveOutcome::Skipped);
        };
        if !tab.has_path() {
            return Ok(SaveOutcome::NeedsPath);
        }
        let written = tab.write_to_disk();
        self.report(written)?;
        self.saved(index);
        Ok(SaveOutcome::Saved)
    }

    /// Bind the tab to `new_path` and write it there. On failure the tab
    /// keeps its old binding and stays dirty.
    pub fn save_as(&mut self, index: usize, new_path: &Path) -> Result<()> {
        if index >= self.tabs.len() {
            return Ok(());
        }
        let new_path = self.resolve(new_path);
        if let Some(other) = self.tabs.iter().position(|t| t.is_bound_to(&new_path)) {
            if other != index {
                return self.report(Err(SessionError::NameConflict { path: new_path }));
            }
        }

        let written = fs::write(&new_path, self.tabs[index].buffer().as_bytes())
            .map_err(|e| SessionError::io(IoAction::Write, &new_path, e));
        self.report(written)?;

        self.tabs[index].bind_path(new_path.clone());
        log::info!("Tab {} now bound to {}", self.tabs[index].id(), new_path.display());
        self.saved(index);
        self.refresh_listing();
        if self.active_index() == Some(index) {
            self.listing.select_path(Some(&new_path));
        }
        Ok(())
    }

    fn saved(&mut self, index: usize) {
        let now = Local::now();
        let tab = &mut self.tabs[index];
        tab.mark_saved(now);
        let name = tab.display_name();
        if self.active_index() == Some(index) {
            self.status.set_last_saved(now);
        }
        self.status.success(format!("Saved {}", name));
    }

    // ---- closing / deleting ----------------------------------------------

    /// Close a tab, writing its buffer through to disk first. If that write
    /// fails the tab stays open.
    pub fn close_tab(&mut self, index: usize) -> Result<()> {
        let Some(tab) = self.tabs.get_mut(index) else {
            return Ok(());
        };
        if tab.has_path() {
            let written = tab.write_to_disk();
            self.report(written)?;
        }
        self.remove_tab(index);
        Ok(())
    }

    /// Delete a document from disk, closing its tab without a final write.
    pub fn delete_file(&mut self, path: &Path) -> Result<()> {
        let path = self.resolve(path);
        let removed =
            fs::remove_file(&path).map_err(|e| SessionError::io(IoAction::Delete, &path, e));
        self.report(removed)?;
        log::info!("Deleted {}", path.display());

        if let Some(index) = self.tabs.iter().position(|t| t.is_bound_to(&path)) {
            self.remove_tab(index);
        }
        if path.parent() == Some(self.listing.dir()) {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                self.listing.remove(name);
            }
        }
        self.status.info(format!("Deleted {}", path.display()));
        Ok(())
    }

    fn remove_tab(&mut self, index: usize) {
        let tab = self.tabs.remove(index);
        log::debug!("Closed tab {} ({})", tab.id(), tab.display_name());
        drop(tab);

        match self.active {
            Some(active) if active == index => {
                if self.tabs.is_empty() {
                    self.switch_to(usize::MAX);
                } else {
                    self.activate(index.min(self.tabs.len() - 1));
                }
            }
            Some(active) if active > index => self.active = Some(active - 1),
            _ => {}
        }
    }

    // ---- styling ---------------------------------------------------------

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.render_all();
        if let Err(e) = self.settings.set_theme(theme.name()) {
            self.settings_warning(e);
        }
        self.status.info(format!("Theme: {}", theme));
    }

    pub fn set_font(&mut self, family: &str, size: u16) {
        let family = family.trim();
        if family.is_empty() || size == 0 {
            log::warn!("Ignoring unusable font '{}' {}", family, size);
            self.status.warning("Font family and a non-zero size are required");
            return;
        }
        self.font = family.to_string();
        self.font_size = size;
        self.render_all();
        if let Err(e) = self.settings.set_font(family, size) {
            self.settings_warning(e);
        }
        self.status.info(format!("Font: {} {}pt", family, size));
    }

    // ---- timers ----------------------------------------------------------

    /// When the debounce window has elapsed, snapshot the active buffer into
    /// a render request.
    pub fn poll_preview(&mut self, now: Instant) -> Option<RenderRequest> {
        if !self.preview.on_tick(now) {
            return None;
        }
        // the active tab may have moved or closed since the edit
        let index = self.active_index()?;
        let tab = &mut self.tabs[index];
        Some(RenderRequest {
            tab: tab.id(),
            generation: tab.next_render_generation(),
            text: tab.buffer().to_string(),
        })
    }

    /// Apply a finished render unless something newer was requested since.
    pub fn apply_render(&mut self, result: RenderResult) -> bool {
        let style = self.style();
        let Some(tab) = self.tabs.iter_mut().find(|t| t.id() == result.tab) else {
            log::debug!("Dropping render for closed tab {}", result.tab);
            return false;
        };
        if result.generation < tab.render_generation() {
            log::debug!(
                "Dropping stale render {} for tab {} (latest {})",
                result.generation,
                result.tab,
                tab.render_generation()
            );
            return false;
        }
        tab.show_markup(result.markup, &style);
        true
    }

    pub fn poll_autosave(&mut self, now: Instant) -> Option<FlushReport> {
        if !self.autosave.on_tick(now) {
            return None;
        }
        Some(self.autosave_all())
    }

    /// Drive both schedulers, rendering inline on this thread.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if let Some(request) = self.poll_preview(now) {
            let tab = request.tab;
            let result = request.run(self.renderer.as_ref());
            if self.apply_render(result) {
                outcome.rendered = Some(tab);
            }
        }
        outcome.autosave = self.poll_autosave(now);
        self.status.update(now);
        outcome
    }

    /// Write every dirty tab that has a file. One failure does not stop the
    /// others. Only the active tab moves the "last saved" indicator.
    pub fn autosave_all(&mut self) -> FlushReport {
        let mut report = FlushReport::default();
        let active = self.active_index();
        let now = Local::now();

        for (index, tab) in self.tabs.iter_mut().enumerate() {
            if !tab.has_path() || !tab.is_dirty() {
                continue;
            }
            match tab.write_to_disk() {
                Ok(()) => {
                    if active == Some(index) {
                        tab.mark_saved(now);
                        self.status.set_last_saved(now);
                    }
                    report.saved.push(tab.id());
                }
                Err(e) => {
                    log::error!("Autosave failed for tab {}: {}", tab.id(), e);
                    self.status.error(e.to_string());
                    report.failed.push((tab.id(), e.to_string()));
                }
            }
        }

        if !report.is_empty() {
            log::info!(
                "Autosave: {} written, {} failed",
                report.saved.len(),
                report.failed.len()
            );
        }
        report
    }

    /// Session teardown: stop timers, write every tab through, persist
    /// preferences.
    pub fn shutdown(&mut self) -> FlushReport {
        self.autosave.cancel();
        self.preview.cancel();

        let mut report = FlushReport::default();
        for tab in self.tabs.iter_mut().filter(|t| t.has_path()) {
            match tab.write_to_disk() {
                Ok(()) => report.saved.push(tab.id()),
                Err(e) => {
                    log::error!("Failed to write tab {} on shutdown: {}", tab.id(), e);
                    report.failed.push((tab.id(), e.to_string()));
                }
            }
        }

        let mut record = self.settings.record().clone();
        record.theme = self.theme.name().to_string();
        record.font = self.font.clone();
        record.font_size = self.font_size;
        if let Some(path) = self.tabs.first().and_then(DocumentTab::path) {
            record.last_opened_file = path.to_string_lossy().into_owned();
        }
        if let Err(e) = self.settings.save(&record) {
            self.settings_warning(e);
        }

        log::info!("Session closed with {} tabs", self.tabs.len());
        report
    }

    // ---- internals -------------------------------------------------------

    fn allocate_id(&mut self) -> TabId {
        let id = TabId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Absolute, normalized form of `path` so one file always maps to one
    /// tab. A file that does not exist yet keeps its name under the
    /// normalized parent.
    fn resolve(&self, path: &Path) -> PathBuf {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.listing.dir().join(path)
        };
        if let Ok(canonical) = fs::canonicalize(&joined) {
            return canonical;
        }
        match (joined.parent(), joined.file_name()) {
            (Some(parent), Some(name)) => match fs::canonicalize(parent) {
                Ok(parent) => parent.join(name),
                Err(_) => joined,
            },
            _ => joined,
        }
    }

    fn activate(&mut self, index: usize) {
        self.active = Some(index);
        self.render_now(index);
        let tab = &self.tabs[index];
        let count = tab.char_count();
        let path = tab.path().map(Path::to_path_buf);
        self.listing.select_path(path.as_deref());
        self.status.set_char_count(count);
    }

    fn render_now(&mut self, index: usize) {
        let style = self.style();
        let renderer = Arc::clone(&self.renderer);
        let Some(tab) = self.tabs.get_mut(index) else {
            return;
        };
        tab.next_render_generation();
        let markup = render_or_raw(renderer.as_ref(), tab.buffer());
        tab.show_markup(markup, &style);
    }

    fn render_all(&mut self) {
        for index in 0..self.tabs.len() {
            self.render_now(index);
        }
    }

    fn refresh_listing(&mut self) {
        if let Err(e) = self.listing.refresh() {
            log::warn!("Failed to refresh document listing: {}", e);
            self.status.warning(e.to_string());
        }
    }

    fn settings_warning(&mut self, e: anyhow::Error) {
        log::warn!("Settings not saved: {:#}", e);
        self.status.warning(format!("Settings not saved: {}", e));
    }

    /// Surface a failure to the user. Stale positions and paths stay quiet.
    fn report<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_not_found() {
                log::debug!("{}", e);
            } else {
                log::error!("{}", e);
                self.status.error(e.to_string());
            }
        }
        result
    }
}
