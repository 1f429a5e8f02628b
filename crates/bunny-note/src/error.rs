use std::path::{Path, PathBuf};

use thiserror::Error;

/// What the session was doing when the filesystem refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoAction {
    Read,
    Write,
    Create,
    Delete,
    Copy,
    List,
}

impl std::fmt::Display for IoAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = match self {
            IoAction::Read => "read",
            IoAction::Write => "write",
            IoAction::Create => "create",
            IoAction::Delete => "delete",
            IoAction::Copy => "copy",
            IoAction::List => "list",
        };
        f.write_str(verb)
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("could not {action} {}: {source}", .path.display())]
    Io {
        action: IoAction,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a file named {} already exists", .path.display())]
    NameConflict { path: PathBuf },

    #[error("not found: {0}")]
    NotFound(String),
}

impl SessionError {
    pub fn io(action: IoAction, path: &Path, source: std::io::Error) -> Self {
        SessionError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display_names_action_and_path() {
        let err = SessionError::io(
            IoAction::Write,
            Path::new("/d/a.md"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = err.to_string();
        assert!(message.contains("could not write"));
        assert!(message.contains("/d/a.md"));
        assert!(message.contains("denied"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_name_conflict_display() {
        let err = SessionError::NameConflict {
            path: PathBuf::from("/d/a.md"),
        };
        assert_eq!(err.to_string(), "a file named /d/a.md already exists");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found() {
        let err = SessionError::NotFound("tab 3".to_string());
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "not found: tab 3");
    }
}
