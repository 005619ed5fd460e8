use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors raised by the folder model and the terminal host.
#[derive(Debug, Error)]
pub enum TreeError {
    /// I/O errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A folder could not be opened (missing or unreadable on disk).
    #[error("Failed to open folder {name} ({})", path.display())]
    Open { name: String, path: PathBuf },

    /// A folder name that cannot be used on disk.
    #[error("Invalid folder name: {0}")]
    InvalidName(String),

    /// The target name is already taken in the parent folder.
    #[error("Folder {0} already exists")]
    AlreadyExists(String),

    /// The handle refers to a folder that was deleted or closed.
    #[error("Folder no longer exists")]
    StaleDirectory,

    /// A folder operation that the model refused.
    #[error("{0}")]
    Operation(String),

    /// Folder metadata could not be encoded or decoded.
    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}
