use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::{Block, Widget};

use crate::gateway::Weightage;
use crate::ui::theme::Theme;

const LABEL_WIDTH: u16 = 24;
const VALUE_WIDTH: u16 = 6;

/// One horizontal bar per chapter, scaled so 100% fills the row.
pub struct WeightageChart<'a> {
    pub entries: &'a [Weightage],
    pub theme: &'a Theme,
}

impl Widget for WeightageChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(" Chapter Weightage ")
            .border_style(Style::default().fg(colors.border()));
        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width <= LABEL_WIDTH + VALUE_WIDTH || inner.height == 0 {
            return;
        }
        let bar_width = inner.width - LABEL_WIDTH - VALUE_WIDTH;

        for (row, entry) in self.entries.iter().take(inner.height as usize).enumerate() {
            let y = inner.y + row as u16;
            let label = truncate(&entry.chapter, LABEL_WIDTH as usize - 1);
            buf.set_string(inner.x, y, &label, Style::default().fg(colors.fg()));

            let bar_x = inner.x + LABEL_WIDTH;
            let filled = bar_cells(entry.percentage, bar_width);
            for x in bar_x..bar_x + bar_width {
                let style = if x < bar_x + filled {
                    Style::default().bg(colors.bar_filled())
                } else {
                    Style::default().bg(colors.bar_empty())
                };
                buf[(x, y)].set_style(style);
            }

            let value = format!("{:>5.1}%", entry.percentage);
            buf.set_string(
                bar_x + bar_width,
                y,
                &value,
                Style::default().fg(colors.accent()),
            );
        }
    }
}

/// Filled cells for `percentage` of `width`; values outside 0..=100 are clamped for drawing only.
fn bar_cells(percentage: f64, width: u16) -> u16 {
    let ratio = if percentage.is_finite() {
        (percentage / 100.0).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (ratio * width as f64).round() as u16
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
