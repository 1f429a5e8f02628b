// Bunny Note library exports

pub mod autosave;
pub mod command_processor;
pub mod document;
pub mod error;
pub mod file_listing;
pub mod preview;
pub mod session;
pub mod settings;
pub mod status_manager;
pub mod theme;

pub use autosave::{AutosaveScheduler, FlushReport};
pub use document::{DocumentTab, TabId};
pub use error::{IoAction, SessionError};
pub use preview::{MarkdownRenderer, PreviewScheduler, RenderRequest, RenderResult, Renderer};
pub use session::{SaveOutcome, Session};
pub use settings::{SettingsRecord, SettingsStore};
pub use theme::{display_style, DisplayStyle, Theme};
