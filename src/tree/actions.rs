//! User operations on the tree. Each mutates the folder model first and only
//! reconciles the rows when the mutation succeeded.

use crate::notebook::{ops, DirId, DirectoryModel, NotebookId};
use crate::tree::sync::{Depth, Lookup, RowId, TreeSyncEngine};
use crate::tree::{CloseTarget, EditorArea, TreeEvent};

/// Base name proposed for new folders.
pub const DEFAULT_FOLDER_NAME: &str = "new_folder";

/// Sort order for manual folder sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    /// Alphabetical (case-insensitive), default.
    #[default]
    Name,
    /// Reverse alphabetical (case-insensitive).
    NameDesc,
}

impl SortBy {
    /// Parse sort_by from config string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "name_desc" => SortBy::NameDesc,
            _ => SortBy::Name,
        }
    }

    /// Get the display label for the sort order.
    pub fn label(&self) -> &'static str {
        match self {
            SortBy::Name => "name",
            SortBy::NameDesc => "name (descending)",
        }
    }

    /// Cycle to the next sort option.
    pub fn next(&self) -> Self {
        match self {
            SortBy::Name => SortBy::NameDesc,
            SortBy::NameDesc => SortBy::Name,
        }
    }
}

/// A destructive operation waiting for the user's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmKind {
    Delete(DirId),
    ReloadDirectory(DirId),
    ReloadNotebook(NotebookId),
}

/// Question to show before a destructive operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub kind: ConfirmKind,
    pub prompt: String,
    pub detail: String,
}

/// Propose `new_folder`, `new_folder_1`, ... whichever is free in `parent`.
pub fn default_folder_name(model: &dyn DirectoryModel, parent: DirId) -> String {
    match model.path(parent) {
        Some(path) => ops::sequence_name(&path, DEFAULT_FOLDER_NAME),
        None => DEFAULT_FOLDER_NAME.to_string(),
    }
}

impl TreeSyncEngine {
    fn display_name(model: &dyn DirectoryModel, dir: DirId) -> String {
        model.name(dir).unwrap_or_default().to_string()
    }

    fn display_path(model: &dyn DirectoryModel, dir: DirId) -> String {
        model
            .path(dir)
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }

    fn create_in(&mut self, model: &mut dyn DirectoryModel, parent: DirId, name: &str) -> Option<DirId> {
        match model.create_sub_directory(parent, name) {
            Ok(dir) => {
                self.reconcile_directory(model, parent);
                self.locate(model, dir);
                self.notify(TreeEvent::DirectoryUpdated(dir));
                Some(dir)
            }
            Err(e) => {
                self.warn(format!("Failed to create folder {}.", name), e.to_string());
                None
            }
        }
    }

    /// Create a folder directly under the notebook root and select it.
    pub fn new_root_directory(&mut self, model: &mut dyn DirectoryModel, name: &str) -> Option<DirId> {
        let root = self.notebook().and_then(|nb| model.root_dir(nb))?;
        self.create_in(model, root, name)
    }

    /// Create a folder under the selected folder and select it.
    pub fn new_sub_directory(&mut self, model: &mut dyn DirectoryModel, name: &str) -> Option<DirId> {
        let parent = self.current_dir()?;
        self.create_in(model, parent, name)
    }

    /// Ask before deleting the selected folder.
    pub fn prepare_delete(&self, model: &dyn DirectoryModel) -> Option<Confirmation> {
        let dir = self.current_dir()?;
        let name = Self::display_name(model, dir);
        Some(Confirmation {
            kind: ConfirmKind::Delete(dir),
            prompt: format!("Are you sure to delete folder {}?", name),
            detail: format!(
                "The folder {} and all notes inside it will be moved to the recycle bin.",
                Self::display_path(model, dir)
            ),
        })
    }

    /// Ask before reloading the selected folder, or the whole notebook when
    /// nothing is selected.
    pub fn prepare_reload(&self, model: &dyn DirectoryModel) -> Option<Confirmation> {
        if let Some(dir) = self.current_dir() {
            let name = Self::display_name(model, dir);
            return Some(Confirmation {
                kind: ConfirmKind::ReloadDirectory(dir),
                prompt: format!("Are you sure to reload folder {}?", name),
                detail: format!(
                    "Folder {} will be reloaded from disk. Open notes inside it will be closed.",
                    name
                ),
            });
        }

        let notebook = self.notebook()?;
        let name = model.notebook_name(notebook).unwrap_or_default().to_string();
        Some(Confirmation {
            kind: ConfirmKind::ReloadNotebook(notebook),
            prompt: format!("Are you sure to reload notebook {}?", name),
            detail: format!(
                "Notebook {} will be reloaded from disk. Open notes inside it will be closed.",
                name
            ),
        })
    }

    /// Run a confirmed operation. Returns whether it went through.
    pub fn confirm(
        &mut self,
        model: &mut dyn DirectoryModel,
        editor: &mut dyn EditorArea,
        confirmation: Confirmation,
    ) -> bool {
        match confirmation.kind {
            ConfirmKind::Delete(dir) => self.delete_directory(model, editor, dir),
            ConfirmKind::ReloadDirectory(dir) => self.reload_directory(model, editor, dir),
            ConfirmKind::ReloadNotebook(notebook) => {
                if self.notebook() != Some(notebook) {
                    return false;
                }
                self.reload_notebook(model, editor)
            }
        }
    }

    /// Move `dir` to the recycle bin after the editor closed its notes.
    pub fn delete_directory(
        &mut self,
        model: &mut dyn DirectoryModel,
        editor: &mut dyn EditorArea,
        dir: DirId,
    ) -> bool {
        if !model.is_alive(dir) {
            return false;
        }
        if !editor.close_file(CloseTarget::Directory(dir), true) {
            log::info!("Delete of {:?} aborted: editor kept notes open", dir);
            return false;
        }

        let name = Self::display_name(model, dir);
        let path = Self::display_path(model, dir);
        let parent = model.parent(dir);
        if let Err(e) = model.delete_directory(dir, false) {
            self.warn(
                format!("Failed to delete folder {}.", name),
                format!("{} Please check {} and delete it manually.", e, path),
            );
            return false;
        }

        self.forget_directory(dir);
        if let Some(parent) = parent {
            self.reconcile_directory(model, parent);
        }
        self.status("1 folder deleted");
        true
    }

    /// Drop everything cached for `dir` and read it from disk again.
    pub fn reload_directory(
        &mut self,
        model: &mut dyn DirectoryModel,
        editor: &mut dyn EditorArea,
        dir: DirId,
    ) -> bool {
        let Lookup::Found(row) = self.find_row(model, dir) else {
            return false;
        };
        if let Some(notebook) = self.notebook() {
            self.forget_notebook(notebook);
        }
        if !editor.close_file(CloseTarget::Directory(dir), false) {
            log::info!("Reload of {:?} aborted: editor kept notes open", dir);
            return false;
        }

        let name = Self::display_name(model, dir);
        self.on_collapse(model, row);
        model.close(dir);
        self.discard_children(row);
        self.materialize_subtree(model, row, Depth::Levels(1));
        self.set_current(Some(row));
        self.status(format!("Folder {} reloaded from disk", name));
        true
    }

    /// Close and reopen the current notebook, rebuilding every row.
    pub fn reload_notebook(&mut self, model: &mut dyn DirectoryModel, editor: &mut dyn EditorArea) -> bool {
        let Some(notebook) = self.notebook() else {
            return false;
        };
        self.forget_notebook(notebook);
        if !editor.close_file(CloseTarget::Notebook(notebook), false) {
            log::info!("Reload of {:?} aborted: editor kept notes open", notebook);
            return false;
        }

        let name = model.notebook_name(notebook).unwrap_or_default().to_string();
        model.close_notebook(notebook);
        if let Err(e) = model.open_notebook(notebook) {
            self.clear();
            self.warn(format!("Failed to open notebook {}.", name), e.to_string());
            return false;
        }
        self.rebuild_root(model);
        self.status(format!("Notebook {} reloaded from disk", name));
        true
    }

    /// Rename the folder shown by `row`.
    pub fn rename_directory(&mut self, model: &mut dyn DirectoryModel, row: RowId, new_name: &str) -> bool {
        let Some(dir) = self.row(row).map(|n| n.dir) else {
            return false;
        };
        let old_name = Self::display_name(model, dir);
        if old_name == new_name {
            return true;
        }
        if let Err(e) = model.rename(dir, new_name) {
            self.warn(
                format!("Failed to rename folder {} to {}.", old_name, new_name),
                e.to_string(),
            );
            return false;
        }
        self.refresh_label(model, row);
        self.notify(TreeEvent::DirectoryUpdated(dir));
        true
    }

    /// Sort the children of `parent` (top level for `None`) by name.
    pub fn sort_directory(&mut self, model: &mut dyn DirectoryModel, parent: Option<RowId>, sort_by: SortBy) -> bool {
        let dir = match parent {
            Some(row) => self.row(row).map(|n| n.dir),
            None => self.notebook().and_then(|nb| model.root_dir(nb)),
        };
        let Some(dir) = dir else {
            return false;
        };
        if let Err(e) = model.open(dir) {
            self.warn(
                format!("Failed to open folder {}.", Self::display_name(model, dir)),
                e.to_string(),
            );
            return false;
        }

        let mut order = model.sub_dirs(dir).to_vec();
        order.sort_by_cached_key(|d| model.name(*d).unwrap_or_default().to_lowercase());
        if sort_by == SortBy::NameDesc {
            order.reverse();
        }
        if let Err(e) = model.reorder_sub_dirs(dir, &order) {
            self.warn(
                format!("Failed to sort folder {}.", Self::display_name(model, dir)),
                e.to_string(),
            );
            return false;
        }

        self.reconcile_direct_children(model, parent);
        self.status(format!(
            "Sorted {} by {}",
            Self::display_name(model, dir),
            sort_by.label()
        ));
        true
    }
}
