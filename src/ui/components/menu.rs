use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::ui::theme::Theme;

pub struct MenuItem {
    pub label: String,
    pub description: String,
    pub enabled: bool,
}

impl MenuItem {
    pub fn new(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Bordered two-line-per-entry list that keeps the selection in view.
pub struct Menu<'a> {
    title: &'a str,
    items: Vec<MenuItem>,
    selected: usize,
    theme: &'a Theme,
}

impl<'a> Menu<'a> {
    pub fn new(title: &'a str, items: Vec<MenuItem>, selected: usize, theme: &'a Theme) -> Self {
        Self {
            title,
            items,
            selected,
            theme,
        }
    }
}

impl Widget for Menu<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(format!(" {} ", self.title))
            .border_style(Style::default().fg(colors.border_focused()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        if self.items.is_empty() {
            Paragraph::new(Span::styled(
                "  Nothing here yet.",
                Style::default().fg(colors.muted()),
            ))
            .render(inner, buf);
            return;
        }

        let visible = (inner.height as usize / 2).max(1);
        let first = self.selected.saturating_sub(visible - 1);

        let mut lines = Vec::with_capacity(visible * 2);
        for (i, item) in self.items.iter().enumerate().skip(first).take(visible) {
            let is_selected = i == self.selected;
            let indicator = if is_selected { ">" } else { " " };
            let label_style = if !item.enabled {
                Style::default().fg(colors.muted())
            } else if is_selected {
                Style::default()
                    .fg(colors.accent())
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(colors.fg())
            };
            let suffix = if item.enabled { "" } else { "  (coming soon)" };

            lines.push(Line::from(vec![
                Span::styled(format!(" {indicator} {}", item.label), label_style),
                Span::styled(suffix, Style::default().fg(colors.muted())),
            ]));
            lines.push(Line::from(Span::styled(
                format!("     {}", item.description),
                Style::default().fg(colors.muted()),
            )));
        }

        Paragraph::new(lines).render(inner, buf);
    }
}
