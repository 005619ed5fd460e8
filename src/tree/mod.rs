//! The folder tree view: a lazily built cache of rows over a
//! [`DirectoryModel`](crate::notebook::DirectoryModel), plus the clipboard
//! and quick-navigation controllers that drive it.

pub mod actions;
pub mod clipboard;
pub mod navigation;
pub mod sync;

use crate::notebook::{DirId, NotebookId};

pub use actions::{ConfirmKind, Confirmation, SortBy};
pub use clipboard::{Clipboard, ClipboardOp, ClipboardOpController, MemoryClipboard};
pub use navigation::{NavOutcome, QuickNavController};
pub use sync::{Depth, Lookup, RowId, TreeSyncEngine, UiTreeNode, VisibleItem};

/// Notification for the host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    /// A folder was created, renamed or pasted.
    DirectoryUpdated(DirId),
    /// The selected folder changed.
    CurrentDirectoryChanged(Option<DirId>),
    /// Short informational message ("2 folders pasted").
    Status(String),
    /// A recoverable failure the user should see.
    Warning { summary: String, detail: String },
}

/// What the editor is asked to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseTarget {
    Directory(DirId),
    Notebook(NotebookId),
}

/// Editor collaborator that owns the open notes.
pub trait EditorArea {
    /// Close every note under `target`. Returning `false` aborts the
    /// destructive operation that asked for it.
    fn close_file(&mut self, target: CloseTarget, force: bool) -> bool;
}

/// Editor area for hosts that never open notes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEditor;

impl EditorArea for NoEditor {
    fn close_file(&mut self, _target: CloseTarget, _force: bool) -> bool {
        true
    }
}
