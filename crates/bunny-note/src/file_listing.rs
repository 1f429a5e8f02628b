use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{IoAction, Result, SessionError};

pub const DOCUMENT_EXTENSION: &str = "md";

/// Sidebar listing of the documents in the working folder.
#[derive(Debug, Clone)]
pub struct FileListing {
    dir: PathBuf,
    entries: Vec<String>,
    selected: Option<String>,
}

impl FileListing {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            entries: Vec::new(),
            selected: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry == name)
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Switch folders; the listing is re-read immediately.
    pub fn change_dir(&mut self, dir: impl Into<PathBuf>) -> Result<()> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(SessionError::NotFound(format!("folder {}", dir.display())));
        }
        self.dir = dir;
        self.selected = None;
        self.refresh()
    }

    /// Re-read the folder. On failure the previous entries are kept.
    pub fn refresh(&mut self) -> Result<()> {
        let read_dir =
            fs::read_dir(&self.dir).map_err(|e| SessionError::io(IoAction::List, &self.dir, e))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| SessionError::io(IoAction::List, &self.dir, e))?;
            let path = entry.path();
            if !path.is_file() || !is_document(&path) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                entries.push(name.to_string());
            }
        }
        entries.sort();

        log::debug!("Listed {} documents in {}", entries.len(), self.dir.display());
        self.entries = entries;
        if self.selected.as_deref().is_some_and(|s| !self.contains(s)) {
            self.selected = None;
        }
        Ok(())
    }

    /// Add an entry for a file that lives in the working folder but was not
    /// listed yet (opened through a dialog, say).
    pub fn add(&mut self, name: &str) {
        if !self.contains(name) {
            self.entries.push(name.to_string());
            self.entries.sort();
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|entry| entry != name);
        if self.selected.as_deref() == Some(name) {
            self.selected = None;
        }
    }

    /// Select the entry for `path`; anything outside the listing clears it.
    pub fn select_path(&mut self, path: Option<&Path>) {
        self.selected = path
            .filter(|p| p.parent() == Some(self.dir.as_path()))
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
            .filter(|name| self.contains(name))
            .map(str::to_string);
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }
}

pub fn is_document(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some(DOCUMENT_EXTENSION)
}

/// Turn a user-typed name into a document file name.
pub fn document_file_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() || name.contains(&['/', '\\'][..]) {
        return None;
    }
    if Path::new(name).extension().is_some() {
        Some(name.to_string())
    } else {
        Some(format!("{}.{}", name, DOCUMENT_EXTENSION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn folder_with(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            fs::write(dir.path().join(file), "").unwrap();
        }
        dir
    }

    #[test]
    fn test_refresh_lists_only_markdown_sorted() {
        let dir = folder_with(&["b.md", "a.md", "notes.txt", "c.markdown"]);
        fs::create_dir(dir.path().join("folder.md")).unwrap();

        let mut listing = FileListing::new(dir.path());
        listing.refresh().unwrap();
        assert_eq!(listing.entries(), &["a.md".to_string(), "b.md".to_string()]);
    }

    #[test]
    fn test_select_path() {
        let dir = folder_with(&["a.md"]);
        let mut listing = FileListing::new(dir.path());
        listing.refresh().unwrap();

        listing.select_path(Some(&dir.path().join("a.md")));
        assert_eq!(listing.selected(), Some("a.md"));

        listing.select_path(Some(Path::new("/elsewhere/a.md")));
        assert_eq!(listing.selected(), None);

        listing.select_path(Some(&dir.path().join("a.md")));
        listing.select_path(None);
        assert_eq!(listing.selected(), None);
    }

    #[test]
    fn test_change_dir_to_missing_folder_keeps_state() {
        let dir = folder_with(&["a.md"]);
        let mut listing = FileListing::new(dir.path());
        listing.refresh().unwrap();

        let err = listing.change_dir(dir.path().join("nope")).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(listing.dir(), dir.path());
        assert_eq!(listing.entries().len(), 1);
    }

    #[test]
    fn test_add_and_remove() {
        let dir = folder_with(&[]);
        let mut listing = FileListing::new(dir.path());
        listing.add("z.md");
        listing.add("a.md");
        listing.add("a.md");
        assert_eq!(listing.entries(), &["a.md".to_string(), "z.md".to_string()]);
        listing.select_path(Some(&dir.path().join("a.md")));
        listing.remove("a.md");
        assert_eq!(listing.selected(), None);
        assert_eq!(listing.entries(), &["z.md".to_string()]);
    }

    #[test]
    fn test_document_file_name() {
        assert_eq!(document_file_name("todo").as_deref(), Some("todo.md"));
        assert_eq!(document_file_name(" todo.md ").as_deref(), Some("todo.md"));
        assert_eq!(document_file_name(""), None);
        assert_eq!(document_file_name("../escape"), None);
    }
}
