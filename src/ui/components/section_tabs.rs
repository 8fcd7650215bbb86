use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};

use crate::app::Section;
use crate::ui::theme::Theme;

pub struct SectionTabs<'a> {
    pub selected: Section,
    pub theme: &'a Theme,
}

impl Widget for SectionTabs<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.header_bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let mut spans = vec![Span::styled(
            " examprep ",
            Style::default()
                .fg(colors.header_fg())
                .add_modifier(Modifier::BOLD),
        )];
        for (i, section) in Section::ALL.iter().enumerate() {
            let style = if *section == self.selected {
                Style::default()
                    .fg(colors.bg())
                    .bg(colors.accent())
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(colors.muted())
            };
            spans.push(Span::raw(" "));
            spans.push(Span::styled(format!(" [{}] {} ", i + 1, section.title()), style));
        }

        Paragraph::new(vec![Line::from(""), Line::from(spans)]).render(inner, buf);
    }
}
