use std::collections::{HashMap, VecDeque};

use crate::error::TreeError;
use crate::notebook::{DirId, DirectoryModel, NotebookId};
use crate::tree::TreeEvent;

/// Handle to a materialized row. Never reused within an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(usize);

/// How many levels below a row to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Levels(usize),
    Unbounded,
}

impl Depth {
    /// Interpret a raw depth where any negative value means "everything".
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            Depth::Unbounded
        } else {
            Depth::Levels(raw as usize)
        }
    }

    fn is_zero(self) -> bool {
        self == Depth::Levels(0)
    }

    fn deeper(self) -> Self {
        match self {
            Depth::Levels(n) => Depth::Levels(n.saturating_sub(1)),
            Depth::Unbounded => Depth::Unbounded,
        }
    }

    fn levels(self) -> usize {
        match self {
            Depth::Levels(n) => n,
            Depth::Unbounded => usize::MAX,
        }
    }
}

/// Where a folder sits in the current tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Not materialized, or not part of the current notebook.
    NotFound,
    /// The notebook root, which has no row of its own.
    IsRoot,
    Found(RowId),
}

/// A materialized row mirroring one folder.
#[derive(Debug, Clone)]
pub struct UiTreeNode {
    pub dir: DirId,
    pub label: String,
    pub parent: Option<RowId>,
    pub children: Vec<RowId>,
    /// 0 while the row is a stub whose children were never loaded.
    pub built_depth: usize,
    pub expanded: bool,
}

impl UiTreeNode {
    /// Whether the children of this row have been materialized.
    pub fn is_built(&self) -> bool {
        self.built_depth > 0
    }
}

/// A row in display order, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleItem {
    pub row: RowId,
    pub dir: DirId,
    pub label: String,
    pub depth: usize,
    pub expanded: bool,
    pub built: bool,
    pub has_children: bool,
    pub is_last_sibling: bool,
}

/// Keeps a tree of rows in step with the folder model.
///
/// Rows are built on demand: the engine only reads a folder's children when
/// a row needs them, and expansion state lives in the model so it survives
/// full rebuilds. Structural changes go through
/// [`reconcile_direct_children`](Self::reconcile_direct_children).
#[derive(Debug, Default)]
pub struct TreeSyncEngine {
    notebook: Option<NotebookId>,
    rows: HashMap<RowId, UiTreeNode>,
    next_row: usize,
    top_level: Vec<RowId>,
    current: Option<RowId>,
    /// Last selected folder per notebook.
    memo: HashMap<NotebookId, DirId>,
    events: VecDeque<TreeEvent>,
}

impl TreeSyncEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn notebook(&self) -> Option<NotebookId> {
        self.notebook
    }

    pub fn row(&self, row: RowId) -> Option<&UiTreeNode> {
        self.rows.get(&row)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn top_level(&self) -> &[RowId] {
        &self.top_level
    }

    /// Children of `parent`, or the top-level rows for `None`.
    pub fn children_of(&self, parent: Option<RowId>) -> &[RowId] {
        match parent {
            Some(row) => self
                .rows
                .get(&row)
                .map(|n| n.children.as_slice())
                .unwrap_or(&[]),
            None => &self.top_level,
        }
    }

    pub fn current(&self) -> Option<RowId> {
        self.current
    }

    pub fn current_dir(&self) -> Option<DirId> {
        self.current.and_then(|r| self.rows.get(&r)).map(|n| n.dir)
    }

    /// The folder remembered as selected for `notebook`.
    pub fn remembered(&self, notebook: NotebookId) -> Option<DirId> {
        self.memo.get(&notebook).copied()
    }

    /// Take every pending notification, oldest first.
    pub fn drain_events(&mut self) -> Vec<TreeEvent> {
        self.events.drain(..).collect()
    }

    // ── Notifications ───────────────────────────────────────────────────────

    pub(crate) fn notify(&mut self, event: TreeEvent) {
        match &event {
            TreeEvent::Status(msg) => log::info!("{}", msg),
            TreeEvent::Warning { summary, detail } => log::warn!("{} {}", summary, detail),
            other => log::debug!("{:?}", other),
        }
        self.events.push_back(event);
    }

    pub(crate) fn status(&mut self, msg: impl Into<String>) {
        self.notify(TreeEvent::Status(msg.into()));
    }

    pub(crate) fn warn(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.notify(TreeEvent::Warning {
            summary: summary.into(),
            detail: detail.into(),
        });
    }

    fn warn_open_failure(&mut self, model: &dyn DirectoryModel, dir: DirId, err: &TreeError) {
        let name = model.name(dir).unwrap_or_default().to_string();
        let path = model
            .path(dir)
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        self.warn(
            format!("Failed to open folder {}.", name),
            format!("Please check if directory {} exists. ({})", path, err),
        );
    }

    // ── Row arena ───────────────────────────────────────────────────────────

    fn alloc_row(&mut self, parent: Option<RowId>, dir: DirId, model: &dyn DirectoryModel) -> RowId {
        let id = RowId(self.next_row);
        self.next_row += 1;
        self.rows.insert(
            id,
            UiTreeNode {
                dir,
                label: model.name(dir).unwrap_or_default().to_string(),
                parent,
                children: Vec::new(),
                built_depth: 0,
                expanded: false,
            },
        );
        id
    }

    /// Drop `row` and its subtree. Returns whether the selection was inside.
    ///
    /// A lost selection keeps its stale id until the caller moves it with
    /// [`Self::set_current`], which then reports the change.
    fn discard(&mut self, row: RowId) -> bool {
        let mut lost_current = false;
        let mut stack = vec![row];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.rows.remove(&id) {
                lost_current |= self.current == Some(id);
                stack.extend(node.children);
            }
        }
        lost_current
    }

    /// Drop every row. The notebook and the memo are kept.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.top_level.clear();
        if self.current.take().is_some() {
            self.notify(TreeEvent::CurrentDirectoryChanged(None));
        }
    }

    pub(crate) fn refresh_label(&mut self, model: &dyn DirectoryModel, row: RowId) {
        if let Some(node) = self.rows.get_mut(&row) {
            if let Some(name) = model.name(node.dir) {
                node.label = name.to_string();
            }
        }
    }

    pub(crate) fn discard_children(&mut self, row: RowId) {
        let children = match self.rows.get_mut(&row) {
            Some(node) => {
                node.built_depth = 0;
                node.expanded = false;
                std::mem::take(&mut node.children)
            }
            None => return,
        };
        for child in children {
            self.discard(child);
        }
    }

    // ── Building ────────────────────────────────────────────────────────────

    /// Show `notebook`, rebuilding the tree when it changes.
    pub fn set_notebook(&mut self, model: &mut dyn DirectoryModel, notebook: Option<NotebookId>) {
        if self.notebook == notebook {
            return;
        }
        self.clear();
        self.notebook = notebook;
        let Some(notebook) = notebook else {
            return;
        };

        if let Err(e) = model.open_notebook(notebook) {
            let name = model.notebook_name(notebook).unwrap_or_default().to_string();
            let path = model
                .notebook_path(notebook)
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            self.warn(
                format!("Failed to open notebook {}.", name),
                format!("Please check if the notebook's root folder {} exists. ({})", path, e),
            );
            return;
        }
        self.rebuild_root(model);
    }

    /// Throw away every row and build the top level again.
    ///
    /// Top-level rows get one extra level so their expand markers are known,
    /// and rows whose folder is persisted as expanded are deepened the way a
    /// user expand would.
    pub fn rebuild_root(&mut self, model: &mut dyn DirectoryModel) {
        self.clear();
        let Some(root) = self.notebook.and_then(|nb| model.root_dir(nb)) else {
            return;
        };

        let subs = model.sub_dirs(root).to_vec();
        for dir in subs {
            let row = self.alloc_row(None, dir, model);
            self.top_level.push(row);
            self.materialize_subtree(model, row, Depth::Levels(1));
        }
        for row in self.top_level.clone() {
            self.deepen_expanded(model, row);
        }

        if !self.restore_current(model) {
            let first = self.top_level.first().copied();
            self.set_current(first);
        }
    }

    /// Materialize `depth` more levels below `row`.
    ///
    /// Rows that were already built are walked, not rebuilt, so calling this
    /// again only deepens the tree. An unreadable folder leaves its row as a
    /// stub and reports a warning; siblings are not affected.
    pub fn materialize_subtree(&mut self, model: &mut dyn DirectoryModel, row: RowId, depth: Depth) {
        if depth.is_zero() {
            return;
        }
        let Some(node) = self.rows.get(&row) else {
            return;
        };
        let dir = node.dir;
        let built = node.is_built();

        if let Err(e) = model.open(dir) {
            self.warn_open_failure(model, dir, &e);
            return;
        }

        let next = depth.deeper();
        let children = if built {
            self.children_of(Some(row)).to_vec()
        } else {
            let subs = model.sub_dirs(dir).to_vec();
            let children: Vec<RowId> = subs
                .into_iter()
                .map(|sub| self.alloc_row(Some(row), sub, model))
                .collect();
            if let Some(node) = self.rows.get_mut(&row) {
                node.children = children.clone();
            }
            children
        };

        if let Some(node) = self.rows.get_mut(&row) {
            node.built_depth = node.built_depth.max(depth.levels());
        }
        for child in children {
            self.materialize_subtree(model, child, next);
        }

        if model.is_expanded(dir) {
            if let Some(node) = self.rows.get_mut(&row) {
                node.expanded = true;
            }
        }
    }

    /// Give every unbuilt child of `row` its own children.
    fn build_children(&mut self, model: &mut dyn DirectoryModel, row: RowId) {
        for child in self.children_of(Some(row)).to_vec() {
            let unbuilt = self.rows.get(&child).map(|n| !n.is_built()).unwrap_or(false);
            if unbuilt {
                self.materialize_subtree(model, child, Depth::Levels(1));
            }
        }
    }

    fn deepen_expanded(&mut self, model: &mut dyn DirectoryModel, row: RowId) {
        let expanded = self.rows.get(&row).map(|n| n.expanded).unwrap_or(false);
        if !expanded {
            return;
        }
        self.build_children(model, row);
        for child in self.children_of(Some(row)).to_vec() {
            self.deepen_expanded(model, child);
        }
    }

    /// Re-apply persisted expansion to built rows under `row`.
    fn expand_subtree(&mut self, model: &dyn DirectoryModel, row: RowId) {
        let Some(node) = self.rows.get(&row) else {
            return;
        };
        let dir = node.dir;
        let built = node.is_built();
        for child in node.children.clone() {
            self.expand_subtree(model, child);
        }
        if built && model.is_expanded(dir) {
            if let Some(node) = self.rows.get_mut(&row) {
                node.expanded = true;
            }
        }
    }

    // ── Reconciliation ──────────────────────────────────────────────────────

    /// Make the children of `parent` (top level for `None`) match the model.
    ///
    /// Existing rows are moved into the new order, folders without a row get
    /// a new row built one level deep, and rows whose folder is gone are
    /// dropped together with their subtrees.
    pub fn reconcile_direct_children(&mut self, model: &mut dyn DirectoryModel, parent: Option<RowId>) {
        let parent_dir = match parent {
            Some(row) => match self.rows.get(&row) {
                Some(node) => node.dir,
                None => return,
            },
            None => match self.notebook.and_then(|nb| model.root_dir(nb)) {
                Some(root) => root,
                None => return,
            },
        };
        if let Err(e) = model.open(parent_dir) {
            self.warn_open_failure(model, parent_dir, &e);
            return;
        }

        let mut by_dir: HashMap<DirId, RowId> = HashMap::new();
        let mut stale = Vec::new();
        for row in self.children_of(parent).to_vec() {
            if let Some(node) = self.rows.get(&row) {
                if let Some(dup) = by_dir.insert(node.dir, row) {
                    stale.push(dup);
                }
            }
        }

        let truth = model.sub_dirs(parent_dir).to_vec();
        let mut ordered = Vec::with_capacity(truth.len());
        let mut fresh = Vec::new();
        for dir in truth {
            match by_dir.remove(&dir) {
                Some(row) => {
                    if let (Some(node), Some(name)) = (self.rows.get_mut(&row), model.name(dir)) {
                        if node.label != name {
                            node.label = name.to_string();
                        }
                    }
                    ordered.push(row);
                }
                None => {
                    let row = self.alloc_row(parent, dir, model);
                    ordered.push(row);
                    fresh.push(row);
                }
            }
        }

        match parent {
            Some(row) => {
                if let Some(node) = self.rows.get_mut(&row) {
                    node.children = ordered.clone();
                    node.built_depth = node.built_depth.max(1);
                }
            }
            None => self.top_level = ordered.clone(),
        }

        let mut lost_current = false;
        for row in by_dir.into_values().chain(stale) {
            lost_current |= self.discard(row);
        }
        for row in fresh {
            self.materialize_subtree(model, row, Depth::Levels(1));
            self.deepen_expanded(model, row);
        }
        for row in ordered {
            self.expand_subtree(model, row);
        }

        if lost_current {
            let fallback = parent.or_else(|| self.top_level.first().copied());
            self.set_current(fallback);
        }
    }

    /// Reconcile the row showing `dir`, if it is part of the tree.
    ///
    /// Returns `false` when the folder has no row to reconcile.
    pub fn reconcile_directory(&mut self, model: &mut dyn DirectoryModel, dir: DirId) -> bool {
        match self.find_row(model, dir) {
            Lookup::Found(row) => {
                self.reconcile_direct_children(model, Some(row));
                true
            }
            Lookup::IsRoot => {
                self.reconcile_direct_children(model, None);
                true
            }
            Lookup::NotFound => false,
        }
    }

    // ── Lookup and selection ────────────────────────────────────────────────

    /// Find the row of `dir` among already materialized rows.
    pub fn find_row(&self, model: &dyn DirectoryModel, dir: DirId) -> Lookup {
        let Some(notebook) = self.notebook else {
            return Lookup::NotFound;
        };
        if model.notebook_of(dir) != Some(notebook) {
            return Lookup::NotFound;
        }
        if model.root_dir(notebook) == Some(dir) {
            return Lookup::IsRoot;
        }
        let Some(parent) = model.parent(dir) else {
            return Lookup::NotFound;
        };

        let siblings = match self.find_row(model, parent) {
            Lookup::Found(row) => self.children_of(Some(row)),
            Lookup::IsRoot => self.children_of(None),
            Lookup::NotFound => return Lookup::NotFound,
        };
        siblings
            .iter()
            .copied()
            .find(|r| self.rows.get(r).map(|n| n.dir) == Some(dir))
            .map(Lookup::Found)
            .unwrap_or(Lookup::NotFound)
    }

    /// Build whatever is missing between the top level and `dir`.
    fn expand_to(&mut self, model: &mut dyn DirectoryModel, dir: DirId) -> Option<RowId> {
        let notebook = self.notebook?;
        if model.notebook_of(dir) != Some(notebook) {
            return None;
        }
        let root = model.root_dir(notebook)?;
        if dir == root {
            return None;
        }
        let parent = model.parent(dir)?;

        let parent_row = if parent == root {
            None
        } else {
            let row = self.expand_to(model, parent)?;
            if !self.rows.get(&row)?.is_built() {
                self.materialize_subtree(model, row, Depth::Levels(1));
            }
            Some(row)
        };
        self.children_of(parent_row)
            .iter()
            .copied()
            .find(|r| self.rows.get(r).map(|n| n.dir) == Some(dir))
    }

    /// Reveal and select the row of `dir`, materializing ancestors as needed.
    ///
    /// Returns `None` for the notebook root and for folders of other notebooks.
    pub fn locate(&mut self, model: &mut dyn DirectoryModel, dir: DirId) -> Option<RowId> {
        let row = self.expand_to(model, dir)?;

        let mut ancestors = Vec::new();
        let mut cur = self.rows.get(&row).and_then(|n| n.parent);
        while let Some(parent) = cur {
            ancestors.push(parent);
            cur = self.rows.get(&parent).and_then(|n| n.parent);
        }
        for ancestor in ancestors.into_iter().rev() {
            let expanded = self.rows.get(&ancestor).map(|n| n.expanded).unwrap_or(true);
            if !expanded {
                self.on_expand(model, ancestor);
            }
        }

        self.set_current(Some(row));
        Some(row)
    }

    /// Change the selection and remember it for the current notebook.
    pub fn set_current(&mut self, row: Option<RowId>) {
        let row = row.filter(|r| self.rows.contains_key(r));
        if self.current == row {
            return;
        }
        self.current = row;
        let dir = row.and_then(|r| self.rows.get(&r)).map(|n| n.dir);
        if let (Some(notebook), Some(dir)) = (self.notebook, dir) {
            self.memo.insert(notebook, dir);
        }
        self.notify(TreeEvent::CurrentDirectoryChanged(dir));
    }

    fn restore_current(&mut self, model: &dyn DirectoryModel) -> bool {
        let Some(dir) = self.notebook.and_then(|nb| self.memo.get(&nb).copied()) else {
            return false;
        };
        match self.find_row(model, dir) {
            Lookup::Found(row) => {
                self.set_current(Some(row));
                true
            }
            _ => false,
        }
    }

    /// Drop memo entries pointing at `dir`.
    pub(crate) fn forget_directory(&mut self, dir: DirId) {
        self.memo.retain(|_, remembered| *remembered != dir);
    }

    pub(crate) fn forget_notebook(&mut self, notebook: NotebookId) {
        self.memo.remove(&notebook);
    }

    // ── Expand / collapse ───────────────────────────────────────────────────

    /// The view collapsed `row`. Its children stay materialized.
    pub fn on_collapse(&mut self, model: &mut dyn DirectoryModel, row: RowId) {
        let Some(node) = self.rows.get_mut(&row) else {
            return;
        };
        node.expanded = false;
        let dir = node.dir;
        model.set_expanded(dir, false);
    }

    /// The view expanded `row`: load one level ahead so that expanding a
    /// child is instant, then persist the flag.
    pub fn on_expand(&mut self, model: &mut dyn DirectoryModel, row: RowId) {
        let Some(node) = self.rows.get(&row) else {
            return;
        };
        let dir = node.dir;
        if !node.is_built() {
            self.materialize_subtree(model, row, Depth::Levels(1));
            if !self.rows.get(&row).map(|n| n.is_built()).unwrap_or(false) {
                return;
            }
        }
        self.build_children(model, row);

        if let Some(node) = self.rows.get_mut(&row) {
            node.expanded = true;
        }
        model.set_expanded(dir, true);
    }

    /// Expand the selected row if collapsed, collapse it otherwise.
    pub fn toggle_current(&mut self, model: &mut dyn DirectoryModel) {
        let Some(row) = self.current else {
            return;
        };
        let expanded = self.rows.get(&row).map(|n| n.expanded).unwrap_or(false);
        if expanded {
            self.on_collapse(model, row);
        } else {
            self.on_expand(model, row);
        }
    }

    /// Build the whole subtree of `row` and expand every row that has children.
    pub fn expand_all(&mut self, model: &mut dyn DirectoryModel, row: RowId) {
        self.materialize_subtree(model, row, Depth::Unbounded);
        let mut stack = vec![row];
        while let Some(id) = stack.pop() {
            let Some(node) = self.rows.get_mut(&id) else {
                continue;
            };
            if node.children.is_empty() {
                continue;
            }
            node.expanded = true;
            let dir = node.dir;
            stack.extend(node.children.iter().copied());
            model.set_expanded(dir, true);
        }
    }

    // ── Visible rows ────────────────────────────────────────────────────────

    /// Rows in display order: a row's children are visible when the row is
    /// visible and expanded.
    pub fn visible_rows(&self) -> Vec<RowId> {
        self.visible_items().into_iter().map(|item| item.row).collect()
    }

    /// Visible rows with everything a renderer needs.
    pub fn visible_items(&self) -> Vec<VisibleItem> {
        let mut items = Vec::new();
        let count = self.top_level.len();
        for (i, row) in self.top_level.iter().enumerate() {
            self.collect_visible(*row, 0, i + 1 == count, &mut items);
        }
        items
    }

    fn collect_visible(&self, row: RowId, depth: usize, is_last: bool, items: &mut Vec<VisibleItem>) {
        let Some(node) = self.rows.get(&row) else {
            return;
        };
        items.push(VisibleItem {
            row,
            dir: node.dir,
            label: node.label.clone(),
            depth,
            expanded: node.expanded,
            built: node.is_built(),
            has_children: !node.children.is_empty(),
            is_last_sibling: is_last,
        });
        if node.expanded {
            let count = node.children.len();
            for (i, child) in node.children.iter().enumerate() {
                self.collect_visible(*child, depth + 1, i + 1 == count, items);
            }
        }
    }

    // ── Keyboard movement ───────────────────────────────────────────────────

    fn select_visible_offset(&mut self, offset: isize) {
        let rows = self.visible_rows();
        if rows.is_empty() {
            return;
        }
        let index = self
            .current
            .and_then(|c| rows.iter().position(|r| *r == c))
            .map(|i| i as isize + offset)
            .unwrap_or(0)
            .clamp(0, rows.len() as isize - 1);
        self.set_current(Some(rows[index as usize]));
    }

    /// Move selection down by one visible row.
    pub fn select_next(&mut self) {
        self.select_visible_offset(1);
    }

    /// Move selection up by one visible row.
    pub fn select_previous(&mut self) {
        self.select_visible_offset(-1);
    }

    /// Jump to the first visible row.
    pub fn select_first(&mut self) {
        let first = self.top_level.first().copied();
        self.set_current(first);
    }

    /// Jump to the last visible row.
    pub fn select_last(&mut self) {
        let last = self.visible_rows().last().copied();
        self.set_current(last);
    }

    /// Collapse the selected row, or jump to its parent when already collapsed.
    pub fn collapse_or_parent(&mut self, model: &mut dyn DirectoryModel) {
        let Some(row) = self.current else {
            return;
        };
        let Some(node) = self.rows.get(&row) else {
            return;
        };
        if node.expanded {
            self.on_collapse(model, row);
        } else if let Some(parent) = node.parent {
            self.set_current(Some(parent));
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::notebook::meta::META_FILE_NAME;
    use crate::notebook::Library;
    use std::fs;
    use tempfile::TempDir;

    /// Notebook with `Work/Drafts/Deep/Deeper` and `Personal`, persisted in
    /// the order `[Work, Personal]`.
    pub(crate) fn setup_notebook() -> (TempDir, Library, NotebookId) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(
            dir.path()
                .join("Work")
                .join("Drafts")
                .join("Deep")
                .join("Deeper"),
        )
        .unwrap();
        fs::create_dir(dir.path().join("Personal")).unwrap();
        fs::write(
            dir.path().join(META_FILE_NAME),
            r#"{"version":1,"sub_directories":[{"name":"Work"},{"name":"Personal"}]}"#,
        )
        .unwrap();
        let mut lib = Library::new();
        let nb = lib.add_notebook("notes", dir.path()).unwrap();
        (dir, lib, nb)
    }

    pub(crate) fn engine_for(lib: &mut Library, nb: NotebookId) -> TreeSyncEngine {
        let mut engine = TreeSyncEngine::new();
        engine.set_notebook(lib, Some(nb));
        engine
    }

    pub(crate) fn row_named(engine: &TreeSyncEngine, parent: Option<RowId>, name: &str) -> RowId {
        engine
            .children_of(parent)
            .iter()
            .copied()
            .find(|r| engine.row(*r).unwrap().label == name)
            .unwrap_or_else(|| panic!("row {name} not found"))
    }

    pub(crate) fn labels(engine: &TreeSyncEngine, parent: Option<RowId>) -> Vec<String> {
        engine
            .children_of(parent)
            .iter()
            .map(|r| engine.row(*r).unwrap().label.clone())
            .collect()
    }

    fn visible_labels(engine: &TreeSyncEngine) -> Vec<String> {
        engine.visible_items().into_iter().map(|i| i.label).collect()
    }

    fn snapshot(engine: &TreeSyncEngine, parent: Option<RowId>) -> Vec<(RowId, DirId, bool)> {
        engine
            .children_of(parent)
            .iter()
            .map(|r| {
                let node = engine.row(*r).unwrap();
                (*r, node.dir, node.expanded)
            })
            .collect()
    }

    fn base(dir: &TempDir) -> std::path::PathBuf {
        dir.path().canonicalize().unwrap()
    }

    #[test]
    fn depth_from_raw() {
        assert_eq!(Depth::from_raw(-1), Depth::Unbounded);
        assert_eq!(Depth::from_raw(0), Depth::Levels(0));
        assert_eq!(Depth::from_raw(3), Depth::Levels(3));
    }

    #[test]
    fn rebuild_root_builds_top_level_one_level_deep() {
        let (_dir, mut lib, nb) = setup_notebook();
        let engine = engine_for(&mut lib, nb);

        assert_eq!(labels(&engine, None), vec!["Work", "Personal"]);
        let work = row_named(&engine, None, "Work");
        let node = engine.row(work).unwrap();
        assert!(node.is_built());
        assert!(!node.expanded);
        assert_eq!(labels(&engine, Some(work)), vec!["Drafts"]);

        let drafts = row_named(&engine, Some(work), "Drafts");
        assert!(!engine.row(drafts).unwrap().is_built());
        assert!(engine.children_of(Some(drafts)).is_empty());
    }

    #[test]
    fn rebuild_root_selects_first_row() {
        let (_dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        let work = row_named(&engine, None, "Work");
        assert_eq!(engine.current(), Some(work));
        let events = engine.drain_events();
        assert!(events.contains(&TreeEvent::CurrentDirectoryChanged(Some(
            engine.row(work).unwrap().dir
        ))));
    }

    #[test]
    fn rebuild_root_restores_remembered_selection() {
        let (_dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        let personal = row_named(&engine, None, "Personal");
        engine.set_current(Some(personal));

        engine.rebuild_root(&mut lib);
        let personal = row_named(&engine, None, "Personal");
        assert_eq!(engine.current(), Some(personal));
    }

    #[test]
    fn rebuild_root_restores_expansion_chain() {
        let (_dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        let work = row_named(&engine, None, "Work");
        engine.on_expand(&mut lib, work);
        let drafts = row_named(&engine, Some(work), "Drafts");
        engine.on_expand(&mut lib, drafts);

        engine.rebuild_root(&mut lib);
        assert_eq!(
            visible_labels(&engine),
            vec!["Work", "Drafts", "Deep", "Personal"]
        );
    }

    #[test]
    fn empty_notebook_has_no_selection() {
        let dir = TempDir::new().unwrap();
        let mut lib = Library::new();
        let nb = lib.add_notebook("empty", dir.path()).unwrap();
        let engine = engine_for(&mut lib, nb);
        assert!(engine.top_level().is_empty());
        assert_eq!(engine.current(), None);
    }

    #[test]
    fn set_notebook_with_missing_root_warns() {
        let (dir, mut lib, nb) = setup_notebook();
        fs::remove_dir_all(dir.path()).unwrap();
        let mut engine = TreeSyncEngine::new();
        engine.set_notebook(&mut lib, Some(nb));
        assert!(engine.top_level().is_empty());
        assert!(engine
            .drain_events()
            .iter()
            .any(|e| matches!(e, TreeEvent::Warning { .. })));
    }

    #[test]
    fn materialize_one_level_never_builds_grandchildren() {
        let (_dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        let work = row_named(&engine, None, "Work");
        let drafts = row_named(&engine, Some(work), "Drafts");

        engine.materialize_subtree(&mut lib, drafts, Depth::Levels(1));
        let deep = row_named(&engine, Some(drafts), "Deep");
        assert!(!engine.row(deep).unwrap().is_built());
        assert!(engine.children_of(Some(deep)).is_empty());
    }

    #[test]
    fn materialize_unbounded_builds_everything() {
        let (_dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        let work = row_named(&engine, None, "Work");

        engine.materialize_subtree(&mut lib, work, Depth::Unbounded);
        let drafts = row_named(&engine, Some(work), "Drafts");
        let deep = row_named(&engine, Some(drafts), "Deep");
        let deeper = row_named(&engine, Some(deep), "Deeper");
        assert!(engine.row(deeper).unwrap().is_built());
        assert_eq!(engine.row(work).unwrap().built_depth, usize::MAX);
    }

    #[test]
    fn materialize_zero_is_noop() {
        let (_dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        let work = row_named(&engine, None, "Work");
        let drafts = row_named(&engine, Some(work), "Drafts");
        let before = engine.row_count();
        engine.materialize_subtree(&mut lib, drafts, Depth::Levels(0));
        assert_eq!(engine.row_count(), before);
    }

    #[test]
    fn materialize_twice_does_not_duplicate() {
        let (_dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        let work = row_named(&engine, None, "Work");
        engine.materialize_subtree(&mut lib, work, Depth::Levels(2));
        let count = engine.row_count();
        engine.materialize_subtree(&mut lib, work, Depth::Levels(2));
        assert_eq!(engine.row_count(), count);
        assert_eq!(labels(&engine, Some(work)), vec!["Drafts"]);
    }

    #[test]
    fn materialize_failure_is_local() {
        let (dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        engine.drain_events();
        let work = row_named(&engine, None, "Work");
        let drafts = row_named(&engine, Some(work), "Drafts");
        fs::remove_dir_all(dir.path().join("Work").join("Drafts")).unwrap();

        engine.materialize_subtree(&mut lib, drafts, Depth::Levels(1));
        assert!(!engine.row(drafts).unwrap().is_built());
        assert!(engine.row(work).unwrap().is_built());
        assert_eq!(labels(&engine, None), vec!["Work", "Personal"]);
        assert!(matches!(
            engine.drain_events().as_slice(),
            [TreeEvent::Warning { .. }]
        ));
    }

    #[test]
    fn materialize_marks_persisted_expansion() {
        let (_dir, mut lib, nb) = setup_notebook();
        let root = lib.root_dir(nb).unwrap();
        lib.open(root).unwrap();
        let work_dir = lib.sub_dirs(root)[0];
        lib.set_expanded(work_dir, true);

        let engine = engine_for(&mut lib, nb);
        let work = row_named(&engine, None, "Work");
        assert!(engine.row(work).unwrap().expanded);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let (_dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        let root = lib.root_dir(nb).unwrap();
        lib.create_sub_directory(root, "Archive").unwrap();
        let work = row_named(&engine, None, "Work");
        engine.on_expand(&mut lib, work);

        engine.reconcile_direct_children(&mut lib, None);
        let first = snapshot(&engine, None);
        engine.reconcile_direct_children(&mut lib, None);
        assert_eq!(snapshot(&engine, None), first);
        assert_eq!(labels(&engine, None), vec!["Work", "Personal", "Archive"]);
    }

    #[test]
    fn reconcile_mirrors_model_order_and_keeps_rows() {
        let (_dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        let root = lib.root_dir(nb).unwrap();
        let work_row = row_named(&engine, None, "Work");
        let personal_row = row_named(&engine, None, "Personal");
        let archive = lib.create_sub_directory(root, "Archive").unwrap();
        let subs = lib.sub_dirs(root).to_vec();
        let order = vec![archive, subs[1], subs[0]];
        lib.reorder_sub_dirs(root, &order).unwrap();

        engine.reconcile_direct_children(&mut lib, None);
        let dirs: Vec<DirId> = engine
            .top_level()
            .iter()
            .map(|r| engine.row(*r).unwrap().dir)
            .collect();
        assert_eq!(dirs, lib.sub_dirs(root).to_vec());
        assert_eq!(engine.top_level()[1], personal_row);
        assert_eq!(engine.top_level()[2], work_row);
    }

    #[test]
    fn reconcile_keeps_expansion_of_untouched_rows() {
        let (_dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        let work = row_named(&engine, None, "Work");
        engine.on_expand(&mut lib, work);

        let root = lib.root_dir(nb).unwrap();
        let personal = lib.sub_dirs(root)[1];
        lib.delete_directory(personal, true).unwrap();
        engine.reconcile_direct_children(&mut lib, None);

        assert_eq!(labels(&engine, None), vec!["Work"]);
        assert!(engine.row(work).unwrap().expanded);
        assert_eq!(visible_labels(&engine), vec!["Work", "Drafts"]);
    }

    #[test]
    fn reconcile_drops_vanished_rows_and_moves_selection() {
        let (_dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        let work = row_named(&engine, None, "Work");
        engine.on_expand(&mut lib, work);
        let drafts = row_named(&engine, Some(work), "Drafts");
        engine.set_current(Some(drafts));

        let drafts_dir = engine.row(drafts).unwrap().dir;
        lib.delete_directory(drafts_dir, true).unwrap();
        engine.reconcile_direct_children(&mut lib, Some(work));

        assert!(engine.row(drafts).is_none());
        assert!(engine.children_of(Some(work)).is_empty());
        assert_eq!(engine.current(), Some(work));
    }

    #[test]
    fn reconcile_builds_new_rows_one_level_deep() {
        let (dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        fs::create_dir_all(dir.path().join("Personal").join("Trips").join("2024")).unwrap();
        let personal = row_named(&engine, None, "Personal");
        let personal_dir = engine.row(personal).unwrap().dir;
        lib.close(personal_dir);

        engine.reconcile_direct_children(&mut lib, Some(personal));
        let trips = row_named(&engine, Some(personal), "Trips");
        assert!(engine.row(trips).unwrap().is_built());
        assert_eq!(labels(&engine, Some(trips)), vec!["2024"]);
    }

    #[test]
    fn reconcile_refreshes_renamed_labels() {
        let (_dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        let personal = row_named(&engine, None, "Personal");
        let personal_dir = engine.row(personal).unwrap().dir;
        lib.rename(personal_dir, "Home").unwrap();
        engine.reconcile_direct_children(&mut lib, None);
        assert_eq!(labels(&engine, None), vec!["Work", "Home"]);
        assert_eq!(row_named(&engine, None, "Home"), personal);
    }

    #[test]
    fn collapse_keeps_children_and_reexpand_skips_disk() {
        let (dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        let work = row_named(&engine, None, "Work");
        engine.on_expand(&mut lib, work);
        engine.on_collapse(&mut lib, work);

        let work_dir = engine.row(work).unwrap().dir;
        assert!(!lib.is_expanded(work_dir));
        assert_eq!(labels(&engine, Some(work)), vec!["Drafts"]);

        fs::remove_dir_all(dir.path().join("Work").join("Drafts")).unwrap();
        engine.on_expand(&mut lib, work);
        assert_eq!(labels(&engine, Some(work)), vec!["Drafts"]);
        assert!(lib.is_expanded(work_dir));
    }

    #[test]
    fn expand_builds_one_level_ahead() {
        let (_dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        let work = row_named(&engine, None, "Work");
        engine.on_expand(&mut lib, work);
        let drafts = row_named(&engine, Some(work), "Drafts");
        assert!(engine.row(drafts).unwrap().is_built());
        assert_eq!(labels(&engine, Some(drafts)), vec!["Deep"]);
        let deep = row_named(&engine, Some(drafts), "Deep");
        assert!(!engine.row(deep).unwrap().is_built());
    }

    #[test]
    fn expand_all_opens_whole_subtree() {
        let (_dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        let work = row_named(&engine, None, "Work");
        engine.expand_all(&mut lib, work);
        assert_eq!(
            visible_labels(&engine),
            vec!["Work", "Drafts", "Deep", "Deeper", "Personal"]
        );
    }

    #[test]
    fn visible_rows_follow_expansion() {
        let (_dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        assert_eq!(visible_labels(&engine), vec!["Work", "Personal"]);
        let work = row_named(&engine, None, "Work");
        engine.on_expand(&mut lib, work);
        let items = engine.visible_items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].label, "Drafts");
        assert_eq!(items[1].depth, 1);
        assert!(items[1].is_last_sibling);
        assert!(items[2].is_last_sibling);
        assert!(!items[0].is_last_sibling);
    }

    #[test]
    fn find_row_distinguishes_root_and_missing() {
        let (dir, mut lib, nb) = setup_notebook();
        let engine = engine_for(&mut lib, nb);
        let root = lib.root_dir(nb).unwrap();
        assert_eq!(engine.find_row(&lib, root), Lookup::IsRoot);

        let work = row_named(&engine, None, "Work");
        let work_dir = engine.row(work).unwrap().dir;
        assert_eq!(engine.find_row(&lib, work_dir), Lookup::Found(work));

        let deep = lib
            .find_directory(&base(&dir).join("Work").join("Drafts").join("Deep"))
            .unwrap();
        assert_eq!(engine.find_row(&lib, deep), Lookup::NotFound);
    }

    #[test]
    fn locate_builds_and_reveals_ancestors() {
        let (dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        let deeper = lib
            .find_directory(
                &base(&dir)
                    .join("Work")
                    .join("Drafts")
                    .join("Deep")
                    .join("Deeper"),
            )
            .unwrap();

        let row = engine.locate(&mut lib, deeper).unwrap();
        assert_eq!(engine.current(), Some(row));
        assert_eq!(engine.current_dir(), Some(deeper));
        assert!(engine.visible_rows().contains(&row));
        assert_eq!(engine.remembered(nb), Some(deeper));
    }

    #[test]
    fn locate_rejects_root_and_foreign_folders() {
        let (_dir, mut lib, nb) = setup_notebook();
        let other_dir = TempDir::new().unwrap();
        fs::create_dir(other_dir.path().join("Elsewhere")).unwrap();
        let other = lib.add_notebook("other", other_dir.path()).unwrap();
        lib.open_notebook(other).unwrap();
        let foreign = lib.sub_dirs(lib.root_dir(other).unwrap())[0];

        let mut engine = engine_for(&mut lib, nb);
        let root = lib.root_dir(nb).unwrap();
        assert_eq!(engine.locate(&mut lib, root), None);
        assert_eq!(engine.locate(&mut lib, foreign), None);
    }

    #[test]
    fn switching_notebooks_keeps_memo_per_notebook() {
        let (_dir, mut lib, nb) = setup_notebook();
        let other_dir = TempDir::new().unwrap();
        fs::create_dir(other_dir.path().join("A")).unwrap();
        fs::create_dir(other_dir.path().join("B")).unwrap();
        let other = lib.add_notebook("other", other_dir.path()).unwrap();

        let mut engine = engine_for(&mut lib, nb);
        let personal = row_named(&engine, None, "Personal");
        engine.set_current(Some(personal));

        engine.set_notebook(&mut lib, Some(other));
        assert_eq!(labels(&engine, None), vec!["A", "B"]);
        let b = row_named(&engine, None, "B");
        engine.set_current(Some(b));

        engine.set_notebook(&mut lib, Some(nb));
        let personal = row_named(&engine, None, "Personal");
        assert_eq!(engine.current(), Some(personal));
    }

    #[test]
    fn keyboard_movement_walks_visible_rows() {
        let (_dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        let work = row_named(&engine, None, "Work");
        engine.toggle_current(&mut lib);
        assert!(engine.row(work).unwrap().expanded);

        engine.select_next();
        let drafts = row_named(&engine, Some(work), "Drafts");
        assert_eq!(engine.current(), Some(drafts));
        engine.select_last();
        assert_eq!(engine.current(), Some(row_named(&engine, None, "Personal")));
        engine.select_next();
        assert_eq!(engine.current(), Some(row_named(&engine, None, "Personal")));

        engine.set_current(Some(drafts));
        engine.collapse_or_parent(&mut lib);
        assert_eq!(engine.current(), Some(work));
        engine.collapse_or_parent(&mut lib);
        assert!(!engine.row(work).unwrap().expanded);
        engine.select_previous();
        assert_eq!(engine.current(), Some(work));
    }

    #[test]
    fn stale_rows_are_ignored() {
        let (_dir, mut lib, nb) = setup_notebook();
        let mut engine = engine_for(&mut lib, nb);
        let work = row_named(&engine, None, "Work");
        engine.rebuild_root(&mut lib);
        assert!(engine.row(work).is_none());
        engine.on_expand(&mut lib, work);
        engine.set_current(Some(work));
        assert_ne!(engine.current(), Some(work));
    }
}
