//! User preferences persisted as a flat JSON record.
//!
//! Reading never fails: a missing, empty or malformed record yields the
//! defaults. Writes go to a sibling temp file first and are renamed into
//! place, so a reader never sees half a record.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_THEME: &str = "Solarized Light";
pub const DEFAULT_FONT: &str = "Arial";
pub const DEFAULT_FONT_SIZE: u16 = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsRecord {
    pub theme: String,
    pub font: String,
    pub font_size: u16,
    pub last_opened_file: String,
}

impl Default for SettingsRecord {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            font: DEFAULT_FONT.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            last_opened_file: String::new(),
        }
    }
}

impl SettingsRecord {
    /// Replace values that cannot be used with the defaults.
    pub fn validate(&mut self) {
        let mut has_issues = false;

        if self.theme.is_empty() {
            log::warn!("Empty theme name, using default");
            self.theme = DEFAULT_THEME.to_string();
            has_issues = true;
        }

        if self.font.is_empty() {
            log::warn!("Empty font family, using default");
            self.font = DEFAULT_FONT.to_string();
            has_issues = true;
        }

        if self.font_size == 0 {
            log::warn!("Invalid font size: 0, using default");
            self.font_size = DEFAULT_FONT_SIZE;
            has_issues = true;
        }

        if has_issues {
            log::info!("Settings validation completed with corrections");
        }
    }
}

/// Owner of the settings record and its backing file.
pub struct SettingsStore {
    path: Option<PathBuf>,
    record: SettingsRecord,
}

impl SettingsStore {
    /// Store at the user's default location, loaded immediately.
    pub fn open() -> Self {
        let path = Self::default_path();
        if path.is_none() {
            log::warn!("No settings location available; preferences will not persist");
        }
        Self::from_location(path)
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self::from_location(Some(path.into()))
    }

    /// Store that never touches the disk.
    pub fn in_memory() -> Self {
        Self::from_location(None)
    }

    fn from_location(path: Option<PathBuf>) -> Self {
        let mut store = Self {
            path,
            record: SettingsRecord::default(),
        };
        store.record = store.load();
        store
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn record(&self) -> &SettingsRecord {
        &self.record
    }

    /// Read the record from disk, falling back to defaults.
    pub fn load(&self) -> SettingsRecord {
        let Some(path) = self.path.as_deref() else {
            return SettingsRecord::default();
        };

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("Settings file does not exist, using defaults");
                return SettingsRecord::default();
            }
            Err(e) => {
                log::error!("Failed to read settings file {}: {}", path.display(), e);
                return SettingsRecord::default();
            }
        };

        if content.trim().is_empty() {
            log::warn!("Settings file is empty, using defaults");
            return SettingsRecord::default();
        }

        match serde_json::from_str::<SettingsRecord>(&content) {
            Ok(mut record) => {
                record.validate();
                log::info!("Loaded settings from: {}", path.display());
                record
            }
            Err(json_err) => {
                log::error!("Failed to parse settings file: {}", json_err);
                let backup_path = path.with_extension("bak");
                match fs::copy(path, &backup_path) {
                    Ok(_) => log::info!("Backed up broken settings to: {}", backup_path.display()),
                    Err(e) => log::warn!("Failed to back up broken settings: {}", e),
                }
                SettingsRecord::default()
            }
        }
    }

    /// Persist the full record, replacing the cached copy.
    pub fn save(&mut self, record: &SettingsRecord) -> Result<()> {
        let mut record = record.clone();
        record.validate();
        self.record = record;
        self.flush()
    }

    /// Partial update of `lastOpenedFile`; every other field is preserved.
    pub fn record_last_opened(&mut self, path: &Path) -> Result<()> {
        self.record.last_opened_file = path.to_string_lossy().into_owned();
        self.flush()
    }

    pub fn set_theme(&mut self, theme: &str) -> Result<()> {
        self.record.theme = theme.to_string();
        self.flush()
    }

    pub fn set_font(&mut self, family: &str, size: u16) -> Result<()> {
        self.record.font = family.to_string();
        self.record.font_size = size;
        self.flush()
    }

    fn flush(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create settings directory {}", parent.display())
            })?;
        }

        let content =
            serde_json::to_string_pretty(&self.record).context("failed to serialize settings")?;

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, content)
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to replace {}", path.display()))?;

        log::debug!("Saved settings to: {}", path.display());
        Ok(())
    }

    fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("BUNNY_NOTE_SETTINGS_PATH") {
            return Some(PathBuf::from(path));
        }

        ProjectDirs::from("com", "bunnynote", "bunny-note")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SettingsStore {
        SettingsStore::with_path(dir.path().join("settings.json"))
    }

    #[test]
    fn test_load_without_record_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let record = store.load();
        assert_eq!(record.theme, "Solarized Light");
        assert_eq!(record.font, "Arial");
        assert_eq!(record.font_size, 12);
        assert_eq!(record.last_opened_file, "");
        assert_eq!(store.record(), &record);
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let record = SettingsRecord {
            theme: "Dark".to_string(),
            font: "Fira Code".to_string(),
            font_size: 17,
            last_opened_file: "/d/a.md".to_string(),
        };
        store.save(&record).unwrap();

        assert_eq!(store.load(), record);
        assert_eq!(store_in(&dir).record(), &record);
    }

    #[test]
    fn test_whitespace_values_round_trip_unchanged() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let record = SettingsRecord {
            theme: " ".to_string(),
            font: "\t".to_string(),
            font_size: 9,
            last_opened_file: String::new(),
        };
        store.save(&record).unwrap();
        assert_eq!(store_in(&dir).load(), record);
    }

    #[test]
    fn test_serialized_keys_are_flat_camel_case() {
        let json = serde_json::to_value(SettingsRecord::default()).unwrap();
        let object = json.as_object().unwrap();
        let mut keys: Vec<_> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["font", "fontSize", "lastOpenedFile", "theme"]);
    }

    #[test]
    fn test_malformed_record_falls_back_and_is_backed_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ theme: nope").unwrap();

        let store = SettingsStore::with_path(&path);
        assert_eq!(store.record(), &SettingsRecord::default());
        assert!(path.with_extension("bak").exists());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"theme": "Dark"}"#).unwrap();

        let record = SettingsStore::with_path(&path).load();
        assert_eq!(record.theme, "Dark");
        assert_eq!(record.font, "Arial");
        assert_eq!(record.font_size, 12);
    }

    #[test]
    fn test_record_last_opened_preserves_other_fields() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.set_theme("Light").unwrap();
        store.set_font("Courier", 20).unwrap();
        store.record_last_opened(Path::new("/notes/todo.md")).unwrap();

        let record = store.load();
        assert_eq!(record.theme, "Light");
        assert_eq!(record.font, "Courier");
        assert_eq!(record.font_size, 20);
        assert_eq!(record.last_opened_file, "/notes/todo.md");
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.save(&SettingsRecord::default()).unwrap();
        assert!(dir.path().join("settings.json").exists());
        assert!(!dir.path().join("settings.json.tmp").exists());
    }

    #[test]
    fn test_validate_corrects_unusable_values() {
        let mut record = SettingsRecord {
            theme: String::new(),
            font: String::new(),
            font_size: 0,
            last_opened_file: String::new(),
        };
        record.validate();
        assert_eq!(record, SettingsRecord::default());
    }

    #[test]
    fn test_in_memory_store_never_fails() {
        let mut store = SettingsStore::in_memory();
        assert!(store.path().is_none());
        store.set_theme("Dark").unwrap();
        assert_eq!(store.record().theme, "Dark");
    }
}
