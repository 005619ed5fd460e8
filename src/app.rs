use std::time::Instant;

use notebook_tree::config::AppConfig;
use notebook_tree::notebook::{DirectoryModel, Library, NotebookId};
use notebook_tree::tree::actions::default_folder_name;
use notebook_tree::tree::{
    ClipboardOp, ClipboardOpController, Confirmation, MemoryClipboard, NoEditor, QuickNavController,
    RowId, SortBy, TreeEvent, TreeSyncEngine,
};

/// The kind of dialog being displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogKind {
    NewRootFolder,
    NewSubFolder,
    Rename { row: RowId },
    Confirm(Confirmation),
    Warning { summary: String, detail: String },
}

/// Application mode.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum AppMode {
    #[default]
    Normal,
    /// Jump labels are shown and keys go to quick navigation.
    Navigation,
    Dialog(DialogKind),
}

/// State for a dialog's text input.
#[derive(Debug, Default)]
pub struct DialogState {
    pub input: String,
    pub cursor_position: usize,
}

/// Main application state.
pub struct App {
    pub library: Library,
    pub engine: TreeSyncEngine,
    pub clipboard_ops: ClipboardOpController,
    pub clipboard: MemoryClipboard,
    pub nav: QuickNavController,
    pub editor: NoEditor,
    pub notebooks: Vec<NotebookId>,
    pub notebook_index: usize,
    pub config: AppConfig,
    pub sort_by: SortBy,
    pub should_quit: bool,
    pub mode: AppMode,
    pub dialog_state: DialogState,
    pub status_message: Option<(String, Instant)>,
    pub scroll_offset: usize,
}

impl App {
    /// Create the app and show the first notebook of `library`.
    pub fn new(library: Library, config: AppConfig) -> Self {
        let notebooks: Vec<NotebookId> = library.notebooks().collect();
        let mut app = Self {
            library,
            engine: TreeSyncEngine::new(),
            clipboard_ops: ClipboardOpController::new(),
            clipboard: MemoryClipboard::default(),
            nav: QuickNavController::new(config.major_key()),
            editor: NoEditor,
            notebooks,
            notebook_index: 0,
            sort_by: config.sort_by(),
            config,
            should_quit: false,
            mode: AppMode::Normal,
            dialog_state: DialogState::default(),
            status_message: None,
            scroll_offset: 0,
        };
        let first = app.notebooks.first().copied();
        app.engine.set_notebook(&mut app.library, first);
        app.pump_events();
        app
    }

    /// Move engine notifications into the status bar and warning dialogs.
    pub fn pump_events(&mut self) {
        for event in self.engine.drain_events() {
            match event {
                TreeEvent::Status(msg) => self.set_status_message(msg),
                TreeEvent::Warning { summary, detail } => {
                    if self.mode == AppMode::Normal {
                        self.open_dialog(DialogKind::Warning { summary, detail });
                    } else {
                        self.set_status_message(summary);
                    }
                }
                TreeEvent::DirectoryUpdated(_) | TreeEvent::CurrentDirectoryChanged(_) => {}
            }
        }
    }

    // ── Dialogs ─────────────────────────────────────────────────────────────

    /// Open a dialog of the given kind.
    pub fn open_dialog(&mut self, kind: DialogKind) {
        self.dialog_state = DialogState::default();
        let prefill = match &kind {
            DialogKind::Rename { row } => self.engine.row(*row).map(|n| n.label.clone()),
            DialogKind::NewRootFolder => self
                .current_notebook()
                .and_then(|nb| self.library.root_dir(nb))
                .map(|root| default_folder_name(&self.library, root)),
            DialogKind::NewSubFolder => self
                .engine
                .current_dir()
                .map(|dir| default_folder_name(&self.library, dir)),
            _ => None,
        };
        if let Some(text) = prefill {
            self.dialog_state.cursor_position = text.len();
            self.dialog_state.input = text;
        }
        self.mode = AppMode::Dialog(kind);
    }

    /// Close the current dialog and return to normal mode.
    pub fn close_dialog(&mut self) {
        self.mode = AppMode::Normal;
        self.dialog_state = DialogState::default();
    }

    /// Insert a character at the current cursor position.
    pub fn dialog_input_char(&mut self, c: char) {
        self.dialog_state
            .input
            .insert(self.dialog_state.cursor_position, c);
        self.dialog_state.cursor_position += c.len_utf8();
    }

    /// Delete the character before the cursor (backspace).
    pub fn dialog_delete_char(&mut self) {
        let pos = self.dialog_state.cursor_position;
        if let Some(prev_char) = self.dialog_state.input[..pos].chars().next_back() {
            self.dialog_state.cursor_position -= prev_char.len_utf8();
            self.dialog_state
                .input
                .remove(self.dialog_state.cursor_position);
        }
    }

    /// Move cursor left by one character.
    pub fn dialog_move_cursor_left(&mut self) {
        let pos = self.dialog_state.cursor_position;
        if let Some(prev_char) = self.dialog_state.input[..pos].chars().next_back() {
            self.dialog_state.cursor_position -= prev_char.len_utf8();
        }
    }

    /// Move cursor right by one character.
    pub fn dialog_move_cursor_right(&mut self) {
        let pos = self.dialog_state.cursor_position;
        if let Some(next_char) = self.dialog_state.input[pos..].chars().next() {
            self.dialog_state.cursor_position += next_char.len_utf8();
        }
    }

    pub fn dialog_cursor_home(&mut self) {
        self.dialog_state.cursor_position = 0;
    }

    pub fn dialog_cursor_end(&mut self) {
        self.dialog_state.cursor_position = self.dialog_state.input.len();
    }

    /// Apply the open input or confirmation dialog.
    pub fn submit_dialog(&mut self) {
        let AppMode::Dialog(kind) = self.mode.clone() else {
            return;
        };
        let input = std::mem::take(&mut self.dialog_state.input);
        self.close_dialog();

        match kind {
            DialogKind::NewRootFolder => {
                self.engine.new_root_directory(&mut self.library, &input);
            }
            DialogKind::NewSubFolder => {
                self.engine.new_sub_directory(&mut self.library, &input);
            }
            DialogKind::Rename { row } => {
                self.engine.rename_directory(&mut self.library, row, &input);
            }
            DialogKind::Confirm(confirmation) => {
                self.engine
                    .confirm(&mut self.library, &mut self.editor, confirmation);
            }
            DialogKind::Warning { .. } => {}
        }
        self.pump_events();
    }

    // ── Status ──────────────────────────────────────────────────────────────

    /// Set a status message with current timestamp.
    pub fn set_status_message(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    /// Clear the status message if it has been displayed for more than 3 seconds.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, ref created)) = self.status_message {
            if created.elapsed().as_secs() > 3 {
                self.status_message = None;
            }
        }
    }

    // ── Notebooks ───────────────────────────────────────────────────────────

    pub fn current_notebook(&self) -> Option<NotebookId> {
        self.notebooks.get(self.notebook_index).copied()
    }

    /// Show the next (`delta > 0`) or previous notebook, wrapping around.
    pub fn switch_notebook(&mut self, delta: isize) {
        let count = self.notebooks.len() as isize;
        if count == 0 {
            return;
        }
        self.notebook_index = (self.notebook_index as isize + delta).rem_euclid(count) as usize;
        let notebook = self.current_notebook();
        self.engine.set_notebook(&mut self.library, notebook);
        self.scroll_offset = 0;
        self.pump_events();
    }

    // ── Folder actions ──────────────────────────────────────────────────────

    pub fn begin_new_folder(&mut self, under_current: bool) {
        if under_current && self.engine.current().is_some() {
            self.open_dialog(DialogKind::NewSubFolder);
        } else if self.current_notebook().is_some() {
            self.open_dialog(DialogKind::NewRootFolder);
        }
    }

    pub fn begin_rename(&mut self) {
        if let Some(row) = self.engine.current() {
            self.open_dialog(DialogKind::Rename { row });
        }
    }

    pub fn begin_delete(&mut self) {
        let Some(confirmation) = self.engine.prepare_delete(&self.library) else {
            return;
        };
        if self.config.confirm_delete() {
            self.open_dialog(DialogKind::Confirm(confirmation));
        } else {
            self.engine
                .confirm(&mut self.library, &mut self.editor, confirmation);
            self.pump_events();
        }
    }

    pub fn begin_reload(&mut self) {
        let Some(confirmation) = self.engine.prepare_reload(&self.library) else {
            return;
        };
        if self.config.confirm_reload() {
            self.open_dialog(DialogKind::Confirm(confirmation));
        } else {
            self.engine
                .confirm(&mut self.library, &mut self.editor, confirmation);
            self.pump_events();
        }
    }

    pub fn copy_current(&mut self, op: ClipboardOp) {
        let Some(dir) = self.engine.current_dir() else {
            return;
        };
        self.clipboard_ops
            .copy(&mut self.engine, &self.library, &mut self.clipboard, &[dir], op);
        self.pump_events();
    }

    pub fn paste(&mut self) {
        if !self.clipboard_ops.paste_available(&self.clipboard) {
            self.set_status_message("Nothing to paste".to_string());
            return;
        }
        self.clipboard_ops
            .paste_from_clipboard(&mut self.engine, &mut self.library, &mut self.clipboard);
        self.pump_events();
    }

    /// Sort the selected folder's parent level.
    pub fn sort_current_level(&mut self, sort_by: SortBy) {
        let parent = self
            .engine
            .current()
            .and_then(|row| self.engine.row(row))
            .and_then(|node| node.parent);
        self.engine.sort_directory(&mut self.library, parent, sort_by);
        self.pump_events();
    }

    pub fn expand_all_current(&mut self) {
        if let Some(row) = self.engine.current() {
            self.engine.expand_all(&mut self.library, row);
            self.pump_events();
        }
    }

    // ── Quick navigation ────────────────────────────────────────────────────

    pub fn enter_navigation(&mut self) {
        self.nav.show(&self.engine, true);
        self.mode = AppMode::Navigation;
    }

    pub fn leave_navigation(&mut self) {
        self.nav.hide();
        self.mode = AppMode::Normal;
    }

    // ── View ────────────────────────────────────────────────────────────────

    /// Keep the selected row inside a window of `visible_height` rows.
    pub fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        let rows = self.engine.visible_rows();
        let selected = self
            .engine
            .current()
            .and_then(|c| rows.iter().position(|r| *r == c))
            .unwrap_or(0);
        if selected < self.scroll_offset {
            self.scroll_offset = selected;
        } else if selected >= self.scroll_offset + visible_height {
            self.scroll_offset = selected + 1 - visible_height;
        }
        let max_offset = rows.len().saturating_sub(visible_height);
        self.scroll_offset = self.scroll_offset.min(max_offset);
    }

    /// Quit the application.
    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup_app() -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("alpha").join("inner")).unwrap();
        fs::create_dir(dir.path().join("beta")).unwrap();
        fs::write(dir.path().join("note.md"), "# note").unwrap();
        let mut library = Library::new();
        library.add_notebook("notes", dir.path()).unwrap();
        let app = App::new(library, AppConfig::default());
        (dir, app)
    }

    fn labels(app: &App) -> Vec<String> {
        app.engine
            .visible_items()
            .into_iter()
            .map(|i| i.label)
            .collect()
    }

    #[test]
    fn new_app_shows_first_notebook() {
        let (_dir, app) = setup_app();
        assert_eq!(labels(&app), vec!["alpha", "beta"]);
        assert!(app.engine.current().is_some());
        assert_eq!(app.mode, AppMode::Normal);
    }

    #[test]
    fn quit_sets_flag() {
        let (_dir, mut app) = setup_app();
        assert!(!app.should_quit);
        app.quit();
        assert!(app.should_quit);
    }

    #[test]
    fn new_folder_dialog_prefills_default_name() {
        let (_dir, mut app) = setup_app();
        app.begin_new_folder(false);
        assert_eq!(app.mode, AppMode::Dialog(DialogKind::NewRootFolder));
        assert_eq!(app.dialog_state.input, "new_folder");
        assert_eq!(app.dialog_state.cursor_position, 10);
    }

    #[test]
    fn submitting_new_folder_creates_it() {
        let (dir, mut app) = setup_app();
        app.begin_new_folder(true);
        app.dialog_cursor_end();
        app.dialog_input_char('x');
        app.submit_dialog();
        assert!(dir.path().join("alpha").join("new_folderx").is_dir());
        assert_eq!(app.mode, AppMode::Normal);
        assert!(labels(&app).contains(&"new_folderx".to_string()));
    }

    #[test]
    fn rename_prefills_current_label() {
        let (_dir, mut app) = setup_app();
        app.begin_rename();
        assert_eq!(app.dialog_state.input, "alpha");
        assert_eq!(app.dialog_state.cursor_position, 5);
    }

    #[test]
    fn failed_rename_opens_warning() {
        let (_dir, mut app) = setup_app();
        app.begin_rename();
        app.dialog_state.input = "beta".to_string();
        app.submit_dialog();
        assert!(matches!(
            app.mode,
            AppMode::Dialog(DialogKind::Warning { .. })
        ));
    }

    #[test]
    fn delete_asks_first_by_default() {
        let (dir, mut app) = setup_app();
        app.begin_delete();
        assert!(matches!(app.mode, AppMode::Dialog(DialogKind::Confirm(_))));
        assert!(dir.path().join("alpha").is_dir());
        app.submit_dialog();
        assert!(!dir.path().join("alpha").exists());
        assert_eq!(labels(&app), vec!["beta"]);
        let (msg, _) = app.status_message.as_ref().unwrap();
        assert_eq!(msg, "1 folder deleted");
    }

    #[test]
    fn delete_without_confirmation_when_disabled() {
        let (dir, mut app) = setup_app();
        app.config.general.confirm_delete = Some(false);
        app.begin_delete();
        assert_eq!(app.mode, AppMode::Normal);
        assert!(!dir.path().join("alpha").exists());
    }

    #[test]
    fn copy_then_paste_duplicates_folder() {
        let (dir, mut app) = setup_app();
        app.copy_current(ClipboardOp::Copy);
        app.engine.select_next();
        app.paste();
        assert!(dir.path().join("beta").join("alpha").join("inner").is_dir());
        app.paste();
        let (msg, _) = app.status_message.as_ref().unwrap();
        assert_eq!(msg, "Nothing to paste");
    }

    #[test]
    fn navigation_mode_shows_labels() {
        let (_dir, mut app) = setup_app();
        app.enter_navigation();
        assert_eq!(app.mode, AppMode::Navigation);
        assert_eq!(app.nav.labels().count(), 2);
        app.leave_navigation();
        assert_eq!(app.mode, AppMode::Normal);
        assert_eq!(app.nav.labels().count(), 0);
    }

    #[test]
    fn switch_notebook_wraps_around() {
        let (_dir, mut app) = setup_app();
        let other = TempDir::new().unwrap();
        fs::create_dir(other.path().join("gamma")).unwrap();
        let nb = app.library.add_notebook("other", other.path()).unwrap();
        app.notebooks.push(nb);

        app.switch_notebook(1);
        assert_eq!(labels(&app), vec!["gamma"]);
        app.switch_notebook(1);
        assert_eq!(labels(&app), vec!["alpha", "beta"]);
        app.switch_notebook(-1);
        assert_eq!(app.current_notebook(), Some(nb));
    }

    #[test]
    fn dialog_editing_handles_multibyte() {
        let (_dir, mut app) = setup_app();
        app.open_dialog(DialogKind::Warning {
            summary: String::new(),
            detail: String::new(),
        });
        app.dialog_input_char('é');
        app.dialog_input_char('b');
        app.dialog_move_cursor_left();
        app.dialog_move_cursor_left();
        assert_eq!(app.dialog_state.cursor_position, 0);
        app.dialog_move_cursor_right();
        assert_eq!(app.dialog_state.cursor_position, 2);
        app.dialog_delete_char();
        assert_eq!(app.dialog_state.input, "b");
        app.dialog_cursor_home();
        app.dialog_delete_char();
        assert_eq!(app.dialog_state.input, "b");
    }

    #[test]
    fn clear_expired_status_removes_old() {
        let (_dir, mut app) = setup_app();
        app.status_message = Some(("old".to_string(), Instant::now() - Duration::from_secs(5)));
        app.clear_expired_status();
        assert!(app.status_message.is_none());
    }

    #[test]
    fn update_scroll_follows_selection() {
        let (_dir, mut app) = setup_app();
        app.engine.select_last();
        app.update_scroll(1);
        assert_eq!(app.scroll_offset, 1);
        app.engine.select_first();
        app.update_scroll(1);
        assert_eq!(app.scroll_offset, 0);
    }
}
