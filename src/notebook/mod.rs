//! Folder model of a set of notebooks.
//!
//! The tree engine only talks to folders through [`DirectoryModel`]; the
//! on-disk [`Library`] is the implementation shipped with the crate.

pub mod library;
pub mod meta;
pub mod ops;

use std::path::{Path, PathBuf};

use crate::error::Result;

pub use library::Library;

/// Handle to a folder. Handles are never reused: once the folder is deleted
/// or its parent is closed the handle simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirId(pub(crate) usize);

/// Handle to a notebook registered in a [`Library`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotebookId(pub(crate) usize);

/// Folder tree of one or more notebooks.
///
/// A folder's children are only meaningful after [`DirectoryModel::open`]
/// succeeded; until then `sub_dirs` is empty. Mutations are single calls that
/// either fully succeed or leave the model untouched.
pub trait DirectoryModel {
    fn root_dir(&self, notebook: NotebookId) -> Option<DirId>;
    fn notebook_of(&self, dir: DirId) -> Option<NotebookId>;
    fn notebook_name(&self, notebook: NotebookId) -> Option<&str>;
    fn notebook_path(&self, notebook: NotebookId) -> Option<&Path>;

    /// Open the notebook's root folder.
    fn open_notebook(&mut self, notebook: NotebookId) -> Result<()>;
    /// Close the notebook's root folder, dropping every loaded folder.
    fn close_notebook(&mut self, notebook: NotebookId);

    /// Load the folder's children. Opening an open folder is a no-op.
    fn open(&mut self, dir: DirId) -> Result<()>;
    /// Forget the folder's children; their handles stop resolving.
    fn close(&mut self, dir: DirId);
    fn is_open(&self, dir: DirId) -> bool;

    /// Children in persisted order.
    fn sub_dirs(&self, dir: DirId) -> &[DirId];
    fn parent(&self, dir: DirId) -> Option<DirId>;
    fn name(&self, dir: DirId) -> Option<&str>;
    /// Absolute path of the folder.
    fn path(&self, dir: DirId) -> Option<PathBuf>;

    fn is_expanded(&self, dir: DirId) -> bool;
    fn set_expanded(&mut self, dir: DirId, expanded: bool);

    fn rename(&mut self, dir: DirId, new_name: &str) -> Result<()>;
    fn create_sub_directory(&mut self, parent: DirId, name: &str) -> Result<DirId>;
    /// Delete a folder. Without `purge` it goes to the notebook's recycle bin.
    fn delete_directory(&mut self, dir: DirId, purge: bool) -> Result<()>;
    /// Copy (or move when `is_move`) `src` into `dest` under `new_name`.
    /// Returns the folder now living in `dest`.
    fn copy_directory(
        &mut self,
        dest: DirId,
        new_name: &str,
        src: DirId,
        is_move: bool,
    ) -> Result<DirId>;

    /// Replace the children order of an open folder with a permutation of it.
    fn reorder_sub_dirs(&mut self, dir: DirId, order: &[DirId]) -> Result<()>;

    /// Resolve an absolute path to a folder of any notebook, opening folders
    /// on the way.
    fn find_directory(&mut self, path: &Path) -> Option<DirId>;

    fn is_alive(&self, dir: DirId) -> bool {
        self.name(dir).is_some()
    }
}
