use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use notebook_tree::tree::ClipboardOp;

use crate::app::{App, AppMode, DialogKind};

/// Route a key press by application mode.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    match app.mode.clone() {
        AppMode::Normal => handle_normal_mode(app, key),
        AppMode::Navigation => handle_navigation_mode(app, key),
        AppMode::Dialog(kind) => handle_dialog_mode(app, key, &kind),
    }
    app.pump_events();
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char(c) if c == app.config.trigger_key() => app.enter_navigation(),
        KeyCode::Char('q') => app.quit(),

        KeyCode::Char('j') | KeyCode::Down => app.engine.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.engine.select_previous(),
        KeyCode::Char('g') | KeyCode::Home => app.engine.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.engine.select_last(),
        KeyCode::Enter | KeyCode::Char(' ') => app.engine.toggle_current(&mut app.library),
        KeyCode::Char('l') | KeyCode::Right => {
            if let Some(row) = app.engine.current() {
                app.engine.on_expand(&mut app.library, row);
            }
        }
        KeyCode::Char('h') | KeyCode::Left => app.engine.collapse_or_parent(&mut app.library),
        KeyCode::Char('*') => app.expand_all_current(),

        KeyCode::Char('a') => app.begin_new_folder(true),
        KeyCode::Char('A') => app.begin_new_folder(false),
        KeyCode::Char('r') | KeyCode::F(2) => app.begin_rename(),
        KeyCode::Char('d') | KeyCode::Delete => app.begin_delete(),
        KeyCode::Char('R') | KeyCode::F(5) => app.begin_reload(),

        KeyCode::Char('y') => app.copy_current(ClipboardOp::Copy),
        KeyCode::Char('x') => app.copy_current(ClipboardOp::Cut),
        KeyCode::Char('p') => app.paste(),

        KeyCode::Char('s') => app.sort_current_level(app.sort_by),
        KeyCode::Char('S') => {
            app.sort_by = app.sort_by.next();
            app.sort_current_level(app.sort_by);
        }

        KeyCode::Tab => app.switch_notebook(1),
        KeyCode::BackTab => app.switch_notebook(-1),
        _ => {}
    }
}

fn handle_navigation_mode(app: &mut App, key: KeyEvent) {
    let KeyCode::Char(c) = key.code else {
        app.leave_navigation();
        return;
    };
    let outcome = app.nav.handle_key(&mut app.engine, c);
    if !outcome.consumed || !app.nav.is_awaiting() {
        app.leave_navigation();
    }
}

fn handle_dialog_mode(app: &mut App, key: KeyEvent, kind: &DialogKind) {
    match kind {
        DialogKind::NewRootFolder | DialogKind::NewSubFolder | DialogKind::Rename { .. } => {
            match key.code {
                KeyCode::Enter => app.submit_dialog(),
                KeyCode::Esc => app.close_dialog(),
                KeyCode::Backspace => app.dialog_delete_char(),
                KeyCode::Left => app.dialog_move_cursor_left(),
                KeyCode::Right => app.dialog_move_cursor_right(),
                KeyCode::Home => app.dialog_cursor_home(),
                KeyCode::End => app.dialog_cursor_end(),
                KeyCode::Char(c) => app.dialog_input_char(c),
                _ => {}
            }
        }
        DialogKind::Confirm(_) => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.submit_dialog(),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.close_dialog(),
            _ => {}
        },
        DialogKind::Warning { .. } => app.close_dialog(),
    }
}
