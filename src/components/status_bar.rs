use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

const KEY_HINTS: &str = " a:new r:ren d:del y/x/p:clip ;:jump tab:notebook ";

/// One-line bar with the selected folder path, or a transient status message.
pub struct StatusBarWidget<'a> {
    path_str: &'a str,
    notebook_info: &'a str,
    status_message: Option<&'a str>,
    paste_ready: bool,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(path_str: &'a str, notebook_info: &'a str) -> Self {
        Self {
            path_str,
            notebook_info,
            status_message: None,
            paste_ready: false,
        }
    }

    pub fn status_message(mut self, msg: &'a str) -> Self {
        self.status_message = Some(msg);
        self
    }

    /// Show a marker while the clipboard holds folders this session can paste.
    pub fn paste_ready(mut self, ready: bool) -> Self {
        self.paste_ready = ready;
        self
    }
}

/// Keep the last `max` characters of `s`, marking the cut with `...`.
fn truncate_left(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max {
        return s.to_string();
    }
    if max <= 3 {
        return s.chars().skip(len - max).collect();
    }
    let tail: String = s.chars().skip(len - (max - 3)).collect();
    format!("...{}", tail)
}

impl Widget for StatusBarWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let width = area.width as usize;

        if let Some(msg) = self.status_message {
            let display: String = format!("{:<width$}", msg, width = width)
                .chars()
                .take(width)
                .collect();
            let line = Line::from(Span::styled(display, Style::default().fg(Color::Green)));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        let clip = if self.paste_ready { " [clip]" } else { "" };
        let right_len =
            self.notebook_info.chars().count() + clip.chars().count() + KEY_HINTS.chars().count();
        let path_budget = width.saturating_sub(right_len + 1);
        let path_display = truncate_left(self.path_str, path_budget);
        let gap = width
            .saturating_sub(path_display.chars().count())
            .saturating_sub(right_len);

        let spans = vec![
            Span::styled(path_display, Style::default().fg(Color::White)),
            Span::raw(" ".repeat(gap)),
            Span::styled(self.notebook_info, Style::default().fg(Color::Cyan)),
            Span::styled(
                clip,
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                KEY_HINTS,
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::DIM),
            ),
        ];
        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_to_string(widget: StatusBarWidget, width: u16) -> String {
        let area = Rect::new(0, 0, width, 1);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        (0..width)
            .map(|x| buf.cell((x, 0)).unwrap().symbol().to_string())
            .collect()
    }

    #[test]
    fn shows_path_and_notebook() {
        let out = render_to_string(StatusBarWidget::new("/notes/Work", "notes 1/2"), 100);
        assert!(out.starts_with("/notes/Work"));
        assert!(out.contains("notes 1/2"));
        assert!(out.contains("a:new"));
        assert!(!out.contains("[clip]"));
    }

    #[test]
    fn status_message_replaces_bar() {
        let out = render_to_string(
            StatusBarWidget::new("/notes/Work", "notes 1/2").status_message("2 folders pasted"),
            60,
        );
        assert!(out.starts_with("2 folders pasted"));
        assert!(!out.contains("/notes/Work"));
    }

    #[test]
    fn paste_marker_is_shown() {
        let out = render_to_string(
            StatusBarWidget::new("/n", "nb 1/1").paste_ready(true),
            100,
        );
        assert!(out.contains("[clip]"));
    }

    #[test]
    fn long_path_is_cut_from_the_left() {
        assert_eq!(truncate_left("/very/long/path/Drafts", 10), ".../Drafts");
        assert_eq!(truncate_left("short", 10), "short");
        assert_eq!(truncate_left("abcdef", 2), "ef");
    }

    #[test]
    fn zero_area_is_noop() {
        let area = Rect::new(0, 0, 0, 0);
        let mut buf = Buffer::empty(area);
        StatusBarWidget::new("/x", "nb").render(area, &mut buf);
    }
}
