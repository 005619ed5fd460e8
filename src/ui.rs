use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders},
    Frame,
};

use notebook_tree::notebook::DirectoryModel;

use crate::app::{App, AppMode};
use crate::components::dialog::DialogWidget;
use crate::components::status_bar::StatusBarWidget;
use crate::components::tree::TreeWidget;

/// Render the application UI.
pub fn render(app: &mut App, frame: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    // Borders take two rows.
    app.update_scroll(chunks[0].height.saturating_sub(2) as usize);

    let notebook_name = app
        .current_notebook()
        .and_then(|nb| app.library.notebook_name(nb))
        .unwrap_or("no notebook")
        .to_string();
    let border_color = if app.mode == AppMode::Navigation {
        Color::Yellow
    } else {
        Color::Gray
    };
    let block = Block::default()
        .title(format!(" {} ", notebook_name))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let items = app.engine.visible_items();
    let mut tree = TreeWidget::new(&items, app.engine.current())
        .scroll_offset(app.scroll_offset)
        .block(block);
    if app.mode == AppMode::Navigation {
        tree = tree.nav_labels(&app.nav);
    }
    frame.render_widget(tree, chunks[0]);

    let path_str = app
        .engine
        .current_dir()
        .and_then(|dir| app.library.path(dir))
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let notebook_info = format!(
        "{} {}/{}",
        notebook_name,
        app.notebook_index + 1,
        app.notebooks.len().max(1)
    );
    let mut status_bar = StatusBarWidget::new(&path_str, &notebook_info)
        .paste_ready(app.clipboard_ops.paste_available(&app.clipboard));
    if let Some((msg, _)) = &app.status_message {
        status_bar = status_bar.status_message(msg);
    }
    frame.render_widget(status_bar, chunks[1]);

    if matches!(app.mode, AppMode::Dialog(_)) {
        frame.render_widget(DialogWidget::new(&app.mode, &app.dialog_state), frame.area());
    }
}
