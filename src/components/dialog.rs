use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Paragraph, Widget, Wrap},
};

use crate::app::{AppMode, DialogKind, DialogState};

/// Centered modal overlay for the dialog of the current mode.
pub struct DialogWidget<'a> {
    mode: &'a AppMode,
    dialog_state: &'a DialogState,
}

impl<'a> DialogWidget<'a> {
    pub fn new(mode: &'a AppMode, dialog_state: &'a DialogState) -> Self {
        Self { mode, dialog_state }
    }

    fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        Rect::new(x, y, width.min(area.width), height.min(area.height))
    }
}

impl Widget for DialogWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let AppMode::Dialog(kind) = self.mode else {
            return;
        };

        match kind {
            DialogKind::NewRootFolder => {
                render_input_dialog("New Root Folder", self.dialog_state, area, buf)
            }
            DialogKind::NewSubFolder => {
                render_input_dialog("New Subfolder", self.dialog_state, area, buf)
            }
            DialogKind::Rename { .. } => {
                render_input_dialog("Rename Folder", self.dialog_state, area, buf)
            }
            DialogKind::Confirm(confirmation) => render_message_dialog(
                " Confirm ",
                Color::Yellow,
                &confirmation.prompt,
                &confirmation.detail,
                "[y] Yes  [n/Esc] Cancel",
                area,
                buf,
            ),
            DialogKind::Warning { summary, detail } => render_message_dialog(
                " Warning ",
                Color::Red,
                summary,
                detail,
                "[any key] Dismiss",
                area,
                buf,
            ),
        }
    }
}

fn render_input_dialog(title: &str, state: &DialogState, area: Rect, buf: &mut Buffer) {
    let rect = DialogWidget::centered_rect(50.min(area.width.saturating_sub(4)), 5, area);
    Clear.render(rect, buf);

    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .padding(Padding::horizontal(1));
    let inner = block.inner(rect);
    block.render(rect, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let input = state.input.as_str();
    let (before, rest) = input.split_at(state.cursor_position.min(input.len()));
    let mut rest_chars = rest.chars();
    let cursor_char = rest_chars
        .next()
        .map(|c| c.to_string())
        .unwrap_or_else(|| " ".to_string());
    let after = rest_chars.as_str();

    // Keep the cursor on screen by dropping characters from the left.
    let room = (inner.width as usize).saturating_sub(2);
    let before_len = before.chars().count();
    let before_display: String = before.chars().skip(before_len.saturating_sub(room)).collect();

    let input_style = Style::default().fg(Color::White);
    let cursor_style = Style::default()
        .bg(Color::White)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD);
    let line = Line::from(vec![
        Span::styled(before_display, input_style),
        Span::styled(cursor_char, cursor_style),
        Span::styled(after, input_style),
    ]);
    buf.set_line(inner.x, inner.y + inner.height / 2, &line, inner.width);

    if inner.height > 1 {
        let hint = Line::from(Span::styled(
            "[Enter] Confirm  [Esc] Cancel",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::DIM),
        ));
        buf.set_line(inner.x, inner.y + inner.height - 1, &hint, inner.width);
    }
}

/// Headline in bold, wrapped detail below it, key hint on the last line.
fn render_message_dialog(
    title: &str,
    color: Color,
    headline: &str,
    detail: &str,
    hint: &str,
    area: Rect,
    buf: &mut Buffer,
) {
    let width = 60.min(area.width.saturating_sub(4));
    let text_width = width.saturating_sub(4).max(1) as usize;
    let detail_lines = detail.len().div_ceil(text_width).max(1) as u16;
    let height = (detail_lines + 6).min(area.height.saturating_sub(2));
    let rect = DialogWidget::centered_rect(width, height, area);
    Clear.render(rect, buf);

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .padding(Padding::horizontal(1));
    let inner = block.inner(rect);
    block.render(rect, buf);

    if inner.height < 2 || inner.width == 0 {
        return;
    }

    let body = Paragraph::new(vec![
        Line::from(Span::styled(
            headline,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(detail),
    ])
    .wrap(Wrap { trim: true });
    let body_area = Rect::new(inner.x, inner.y, inner.width, inner.height - 1);
    body.render(body_area, buf);

    let hint = Line::from(Span::styled(
        hint,
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM),
    ));
    buf.set_line(inner.x, inner.y + inner.height - 1, &hint, inner.width);
}
