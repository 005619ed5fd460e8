use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use notebook_tree::tree::{QuickNavController, RowId, VisibleItem};

/// Folder tree drawn with box-drawing connectors and optional jump labels.
pub struct TreeWidget<'a> {
    items: &'a [VisibleItem],
    selected: Option<RowId>,
    scroll_offset: usize,
    nav: Option<&'a QuickNavController>,
    block: Option<Block<'a>>,
}

impl<'a> TreeWidget<'a> {
    pub fn new(items: &'a [VisibleItem], selected: Option<RowId>) -> Self {
        Self {
            items,
            selected,
            scroll_offset: 0,
            nav: None,
            block: None,
        }
    }

    pub fn scroll_offset(mut self, offset: usize) -> Self {
        self.scroll_offset = offset;
        self
    }

    /// Show the labels currently held by `nav` in front of their rows.
    pub fn nav_labels(mut self, nav: &'a QuickNavController) -> Self {
        self.nav = Some(nav);
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    /// Connector prefix of `items[index]`. Each ancestor level draws a
    /// continuation line unless that ancestor was the last of its siblings.
    fn build_prefix(items: &[VisibleItem], index: usize) -> String {
        let item = &items[index];
        if item.depth == 0 {
            return String::new();
        }

        let mut prefix = String::new();
        for d in 1..item.depth {
            let ancestor_is_last = items[..index]
                .iter()
                .rev()
                .take_while(|i| i.depth >= d)
                .find(|i| i.depth == d)
                .is_some_and(|i| i.is_last_sibling);
            prefix.push_str(if ancestor_is_last { "   " } else { "│  " });
        }
        prefix.push_str(if item.is_last_sibling { "└──" } else { "├──" });
        prefix
    }

    /// `▸` for a folder that has or may have children, `▾` once expanded.
    fn indicator(item: &VisibleItem) -> &'static str {
        if item.expanded {
            "▾ "
        } else if item.has_children || !item.built {
            "▸ "
        } else {
            "  "
        }
    }
}

impl Widget for TreeWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = match &self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.clone().render(area, buf);
                inner
            }
            None => area,
        };

        if self.items.is_empty() || inner_area.height == 0 {
            return;
        }

        let rows = self
            .items
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(inner_area.height as usize);

        for (line_no, (index, item)) in rows.enumerate() {
            let is_selected = self.selected == Some(item.row);
            let style = if is_selected {
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Cyan)
            };

            let mut spans = vec![Span::raw(Self::build_prefix(self.items, index))];
            if let Some(label) = self.nav.and_then(|nav| nav.label_for(item.row)) {
                spans.push(Span::styled(
                    format!("[{}]", label),
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ));
                spans.push(Span::raw(" "));
            }
            spans.push(Span::styled(
                format!("{}{}", Self::indicator(item), item.label),
                style,
            ));

            let y = inner_area.y + line_no as u16;
            buf.set_line(inner_area.x, y, &Line::from(spans), inner_area.width);
        }
    }
}
