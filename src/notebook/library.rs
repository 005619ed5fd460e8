use std::path::{Component, Path, PathBuf};

use crate::error::{Result, TreeError};
use crate::notebook::meta::{DirMeta, SubDirMeta, META_VERSION};
use crate::notebook::{ops, DirId, DirectoryModel, NotebookId};

/// A loaded folder.
#[derive(Debug, Clone)]
struct DirEntry {
    name: String,
    parent: Option<DirId>,
    notebook: NotebookId,
    children: Vec<DirId>,
    opened: bool,
    expanded: bool,
}

/// A registered notebook.
#[derive(Debug, Clone)]
struct NotebookEntry {
    name: String,
    path: PathBuf,
    root: DirId,
}

/// On-disk folder model for a set of notebooks.
///
/// Folders live in an arena indexed by [`DirId`]. Slots are freed when a
/// folder is deleted or its parent closed, and never reused.
#[derive(Debug, Default)]
pub struct Library {
    dirs: Vec<Option<DirEntry>>,
    notebooks: Vec<NotebookEntry>,
}

impl Library {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a notebook rooted at `path`. The root is not opened yet.
    pub fn add_notebook(&mut self, name: &str, path: &Path) -> Result<NotebookId> {
        let path = path.canonicalize().map_err(|_| {
            TreeError::InvalidPath(format!("{} does not exist", path.display()))
        })?;
        if !path.is_dir() {
            return Err(TreeError::InvalidPath(format!(
                "{} is not a directory",
                path.display()
            )));
        }
        if self.notebooks.iter().any(|nb| nb.path == path) {
            return Err(TreeError::AlreadyExists(path.display().to_string()));
        }

        let id = NotebookId(self.notebooks.len());
        let root = self.alloc(DirEntry {
            name: name.to_string(),
            parent: None,
            notebook: id,
            children: Vec::new(),
            opened: false,
            expanded: true,
        });
        self.notebooks.push(NotebookEntry {
            name: name.to_string(),
            path,
            root,
        });
        log::info!("Registered notebook {} ({:?})", name, id);
        Ok(id)
    }

    /// All registered notebooks in registration order.
    pub fn notebooks(&self) -> impl Iterator<Item = NotebookId> + '_ {
        (0..self.notebooks.len()).map(NotebookId)
    }

    fn notebook(&self, id: NotebookId) -> Option<&NotebookEntry> {
        self.notebooks.get(id.0)
    }

    fn entry(&self, dir: DirId) -> Option<&DirEntry> {
        self.dirs.get(dir.0).and_then(Option::as_ref)
    }

    fn entry_mut(&mut self, dir: DirId) -> Option<&mut DirEntry> {
        self.dirs.get_mut(dir.0).and_then(Option::as_mut)
    }

    fn live(&self, dir: DirId) -> Result<&DirEntry> {
        self.entry(dir).ok_or(TreeError::StaleDirectory)
    }

    fn alloc(&mut self, entry: DirEntry) -> DirId {
        self.dirs.push(Some(entry));
        DirId(self.dirs.len() - 1)
    }

    /// Free `dir` and every loaded descendant.
    fn release(&mut self, dir: DirId) {
        let mut stack = vec![dir];
        while let Some(id) = stack.pop() {
            if let Some(entry) = self.dirs.get_mut(id.0).and_then(Option::take) {
                stack.extend(entry.children);
            }
        }
    }

    /// Whether `ancestor` is `dir` or one of its ancestors.
    fn is_ancestor_or_self(&self, ancestor: DirId, dir: DirId) -> bool {
        let mut cur = Some(dir);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.entry(id).and_then(|e| e.parent);
        }
        false
    }

    fn sibling_taken(&self, parent: DirId, name: &str) -> bool {
        self.sub_dirs(parent)
            .iter()
            .any(|c| self.entry(*c).map(|e| e.name == name).unwrap_or(false))
    }

    fn set_notebook_recursive(&mut self, dir: DirId, notebook: NotebookId) {
        let mut stack = vec![dir];
        while let Some(id) = stack.pop() {
            if let Some(entry) = self.entry_mut(id) {
                entry.notebook = notebook;
                stack.extend(entry.children.iter().copied());
            }
        }
    }

    fn detach(&mut self, parent: DirId, dir: DirId) {
        if let Some(entry) = self.entry_mut(parent) {
            entry.children.retain(|c| *c != dir);
        }
    }

    /// Rewrite the metadata file of an open folder from its children.
    fn persist_meta(&self, dir: DirId) -> Result<()> {
        let entry = self.live(dir)?;
        if !entry.opened {
            return Ok(());
        }
        let path = self.path(dir).ok_or(TreeError::StaleDirectory)?;
        let meta = DirMeta {
            version: META_VERSION,
            sub_directories: entry
                .children
                .iter()
                .filter_map(|c| self.entry(*c))
                .map(|c| SubDirMeta {
                    name: c.name.clone(),
                    expanded: c.expanded,
                })
                .collect(),
        };
        meta.save(&path)
    }

    fn persist_meta_logged(&self, dir: DirId) {
        if let Err(e) = self.persist_meta(dir) {
            log::warn!("Failed to save folder metadata for {:?}: {}", dir, e);
        }
    }
}

impl DirectoryModel for Library {
    fn root_dir(&self, notebook: NotebookId) -> Option<DirId> {
        self.notebook(notebook).map(|nb| nb.root)
    }

    fn notebook_of(&self, dir: DirId) -> Option<NotebookId> {
        self.entry(dir).map(|e| e.notebook)
    }

    fn notebook_name(&self, notebook: NotebookId) -> Option<&str> {
        self.notebook(notebook).map(|nb| nb.name.as_str())
    }

    fn notebook_path(&self, notebook: NotebookId) -> Option<&Path> {
        self.notebook(notebook).map(|nb| nb.path.as_path())
    }

    fn open_notebook(&mut self, notebook: NotebookId) -> Result<()> {
        let root = self
            .root_dir(notebook)
            .ok_or_else(|| TreeError::InvalidPath(format!("unknown notebook {:?}", notebook)))?;
        self.open(root)
    }

    fn close_notebook(&mut self, notebook: NotebookId) {
        if let Some(root) = self.root_dir(notebook) {
            self.close(root);
        }
    }

    fn open(&mut self, dir: DirId) -> Result<()> {
        let entry = self.live(dir)?;
        if entry.opened {
            return Ok(());
        }
        let name = entry.name.clone();
        let notebook = entry.notebook;
        let path = self.path(dir).ok_or(TreeError::StaleDirectory)?;

        let open_error = || TreeError::Open {
            name: name.clone(),
            path: path.clone(),
        };
        if !path.is_dir() {
            return Err(open_error());
        }
        let on_disk = ops::list_sub_dirs(&path).map_err(|_| open_error())?;
        let meta = DirMeta::load(&path);

        let children: Vec<DirId> = DirMeta::merge_with_disk(meta.as_ref(), on_disk)
            .into_iter()
            .map(|sub| {
                self.alloc(DirEntry {
                    name: sub.name,
                    parent: Some(dir),
                    notebook,
                    children: Vec::new(),
                    opened: false,
                    expanded: sub.expanded,
                })
            })
            .collect();

        log::debug!("Opened folder {} with {} sub-folders", path.display(), children.len());
        if let Some(entry) = self.entry_mut(dir) {
            entry.children = children;
            entry.opened = true;
        }
        Ok(())
    }

    fn close(&mut self, dir: DirId) {
        let children = match self.entry_mut(dir) {
            Some(entry) => {
                entry.opened = false;
                std::mem::take(&mut entry.children)
            }
            None => return,
        };
        for child in children {
            self.release(child);
        }
    }

    fn is_open(&self, dir: DirId) -> bool {
        self.entry(dir).map(|e| e.opened).unwrap_or(false)
    }

    fn sub_dirs(&self, dir: DirId) -> &[DirId] {
        self.entry(dir)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    fn parent(&self, dir: DirId) -> Option<DirId> {
        self.entry(dir).and_then(|e| e.parent)
    }

    fn name(&self, dir: DirId) -> Option<&str> {
        self.entry(dir).map(|e| e.name.as_str())
    }

    fn path(&self, dir: DirId) -> Option<PathBuf> {
        let mut names = Vec::new();
        let mut cur = self.entry(dir)?;
        while let Some(parent) = cur.parent {
            names.push(cur.name.as_str());
            cur = self.entry(parent)?;
        }
        let mut path = self.notebook(cur.notebook)?.path.clone();
        for name in names.iter().rev() {
            path.push(name);
        }
        Some(path)
    }

    fn is_expanded(&self, dir: DirId) -> bool {
        self.entry(dir).map(|e| e.expanded).unwrap_or(false)
    }

    fn set_expanded(&mut self, dir: DirId, expanded: bool) {
        let parent = match self.entry_mut(dir) {
            Some(entry) if entry.expanded != expanded => {
                entry.expanded = expanded;
                entry.parent
            }
            _ => return,
        };
        if let Some(parent) = parent {
            self.persist_meta_logged(parent);
        }
    }

    fn rename(&mut self, dir: DirId, new_name: &str) -> Result<()> {
        ops::validate_name(new_name)?;
        let entry = self.live(dir)?;
        if entry.name == new_name {
            return Ok(());
        }
        let parent = entry
            .parent
            .ok_or_else(|| TreeError::Operation("cannot rename the notebook root".into()))?;
        if self.sibling_taken(parent, new_name) {
            return Err(TreeError::AlreadyExists(new_name.to_string()));
        }

        let old_path = self.path(dir).ok_or(TreeError::StaleDirectory)?;
        let new_path = self
            .path(parent)
            .ok_or(TreeError::StaleDirectory)?
            .join(new_name);
        if new_path.exists() {
            return Err(TreeError::AlreadyExists(new_name.to_string()));
        }
        ops::rename(&old_path, &new_path)?;

        if let Some(entry) = self.entry_mut(dir) {
            entry.name = new_name.to_string();
        }
        self.persist_meta_logged(parent);
        log::info!("Renamed folder {} to {}", old_path.display(), new_name);
        Ok(())
    }

    fn create_sub_directory(&mut self, parent: DirId, name: &str) -> Result<DirId> {
        ops::validate_name(name)?;
        self.open(parent)?;
        if self.sibling_taken(parent, name) {
            return Err(TreeError::AlreadyExists(name.to_string()));
        }
        let path = self
            .path(parent)
            .ok_or(TreeError::StaleDirectory)?
            .join(name);
        if path.exists() {
            return Err(TreeError::AlreadyExists(name.to_string()));
        }
        ops::create_dir(&path)?;

        let notebook = self.live(parent)?.notebook;
        let id = self.alloc(DirEntry {
            name: name.to_string(),
            parent: Some(parent),
            notebook,
            children: Vec::new(),
            opened: false,
            expanded: false,
        });
        if let Some(entry) = self.entry_mut(parent) {
            entry.children.push(id);
        }
        self.persist_meta_logged(parent);
        log::info!("Created folder {}", path.display());
        Ok(id)
    }

    fn delete_directory(&mut self, dir: DirId, purge: bool) -> Result<()> {
        let entry = self.live(dir)?;
        let notebook = entry.notebook;
        let parent = entry
            .parent
            .ok_or_else(|| TreeError::Operation("cannot delete the notebook root".into()))?;
        let path = self.path(dir).ok_or(TreeError::StaleDirectory)?;

        if purge {
            ops::remove_dir(&path)?;
        } else {
            let root = self
                .notebook_path(notebook)
                .ok_or(TreeError::StaleDirectory)?
                .to_path_buf();
            let binned = ops::recycle(&root, &path)?;
            log::debug!("Recycled {} to {}", path.display(), binned.display());
        }

        self.detach(parent, dir);
        self.release(dir);
        self.persist_meta_logged(parent);
        log::info!("Deleted folder {}", path.display());
        Ok(())
    }

    fn copy_directory(
        &mut self,
        dest: DirId,
        new_name: &str,
        src: DirId,
        is_move: bool,
    ) -> Result<DirId> {
        ops::validate_name(new_name)?;
        let old_parent = self
            .live(src)?
            .parent
            .ok_or_else(|| TreeError::Operation("cannot copy the notebook root".into()))?;
        let notebook = self.live(dest)?.notebook;
        if self.is_ancestor_or_self(src, dest) {
            return Err(TreeError::Operation(
                "cannot copy a folder into itself".into(),
            ));
        }
        self.open(dest)?;
        if self.sibling_taken(dest, new_name) {
            return Err(TreeError::AlreadyExists(new_name.to_string()));
        }

        let src_path = self.path(src).ok_or(TreeError::StaleDirectory)?;
        let dest_path = self
            .path(dest)
            .ok_or(TreeError::StaleDirectory)?
            .join(new_name);
        if dest_path.exists() {
            return Err(TreeError::AlreadyExists(new_name.to_string()));
        }

        if is_move {
            ops::move_dir(&src_path, &dest_path)?;
            self.detach(old_parent, src);
            if let Some(entry) = self.entry_mut(src) {
                entry.parent = Some(dest);
                entry.name = new_name.to_string();
            }
            self.set_notebook_recursive(src, notebook);
            if let Some(entry) = self.entry_mut(dest) {
                entry.children.push(src);
            }
            self.persist_meta_logged(old_parent);
            self.persist_meta_logged(dest);
            log::info!("Moved folder {} to {}", src_path.display(), dest_path.display());
            return Ok(src);
        }

        ops::copy_dir_recursive(&src_path, &dest_path)?;
        let id = self.alloc(DirEntry {
            name: new_name.to_string(),
            parent: Some(dest),
            notebook,
            children: Vec::new(),
            opened: false,
            expanded: false,
        });
        if let Some(entry) = self.entry_mut(dest) {
            entry.children.push(id);
        }
        self.persist_meta_logged(dest);
        log::info!("Copied folder {} to {}", src_path.display(), dest_path.display());
        Ok(id)
    }

    fn reorder_sub_dirs(&mut self, dir: DirId, order: &[DirId]) -> Result<()> {
        let entry = self.live(dir)?;
        let mut current = entry.children.clone();
        let mut requested = order.to_vec();
        current.sort();
        requested.sort();
        if current != requested {
            return Err(TreeError::Operation(
                "order does not match the folder's children".into(),
            ));
        }
        if let Some(entry) = self.entry_mut(dir) {
            entry.children = order.to_vec();
        }
        self.persist_meta(dir)
    }

    fn find_directory(&mut self, path: &Path) -> Option<DirId> {
        // Nested notebooks: the deepest matching root wins.
        let (root, rel) = self
            .notebooks
            .iter()
            .filter_map(|nb| {
                path.strip_prefix(&nb.path)
                    .ok()
                    .map(|rel| (nb.root, rel.to_path_buf(), nb.path.components().count()))
            })
            .max_by_key(|(_, _, depth)| *depth)
            .map(|(root, rel, _)| (root, rel))?;

        let mut cur = root;
        for component in rel.components() {
            let Component::Normal(name) = component else {
                return None;
            };
            let name = name.to_str()?;
            if self.open(cur).is_err() {
                return None;
            }
            cur = self
                .sub_dirs(cur)
                .iter()
                .copied()
                .find(|c| self.name(*c) == Some(name))?;
        }
        Some(cur)
    }
}
