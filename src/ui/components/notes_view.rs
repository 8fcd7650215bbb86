use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::ui::theme::{Theme, ThemeColors};

/// Revision notes rendered from the markdown subset the notes prompt asks
/// for: `#` headings, `-`/`*` bullets and `**bold**` runs.
pub struct NotesView<'a> {
    pub text: &'a str,
    pub scroll: u16,
    pub focused: bool,
    pub theme: &'a Theme,
}

impl Widget for NotesView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let border = if self.focused {
            colors.border_focused()
        } else {
            colors.border()
        };
        let block = Block::bordered()
            .title(" Revision Notes ")
            .border_style(Style::default().fg(border));

        Paragraph::new(markdown_lines(self.text, colors))
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .render(area, buf);
    }
}

pub fn markdown_lines(text: &str, colors: &ThemeColors) -> Vec<Line<'static>> {
    let body = Style::default().fg(colors.fg());
    text.lines()
        .map(|raw| {
            let trimmed = raw.trim_start();
            if let Some((level, title)) = heading(trimmed) {
                let mut style = Style::default()
                    .fg(colors.accent())
                    .add_modifier(Modifier::BOLD);
                if level == 1 {
                    style = style.add_modifier(Modifier::UNDERLINED);
                }
                return Line::from(inline_spans(title, style));
            }
            if let Some(item) = trimmed
                .strip_prefix("- ")
                .or_else(|| trimmed.strip_prefix("* "))
            {
                let depth = (raw.len() - trimmed.len()) / 2;
                let mut spans = vec![Span::styled(
                    format!("{}  • ", "  ".repeat(depth)),
                    Style::default().fg(colors.accent()),
                )];
                spans.extend(inline_spans(item, body));
                return Line::from(spans);
            }
            Line::from(inline_spans(raw, body))
        })
        .collect()
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    line[level..].strip_prefix(' ').map(|title| (level, title.trim()))
}

/// Split on `**` pairs; an unmatched trailing marker is kept as text.
fn inline_spans(text: &str, base: Style) -> Vec<Span<'static>> {
    let parts: Vec<&str> = text.split("**").collect();
    let balanced = parts.len() % 2 == 1;
    let last = parts.len() - 1;

    parts
        .iter()
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| {
            let marked = i % 2 == 1;
            if marked && (balanced || i < last) {
                Span::styled(part.to_string(), base.add_modifier(Modifier::BOLD))
            } else if marked {
                Span::styled(format!("**{part}"), base)
            } else {
                Span::styled(part.to_string(), base)
            }
        })
        .collect()
}
