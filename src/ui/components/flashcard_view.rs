use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::session::flashcards::FlashcardDeck;
use crate::ui::theme::Theme;

pub struct FlashcardView<'a> {
    pub deck: &'a FlashcardDeck,
    pub focused: bool,
    pub theme: &'a Theme,
}

impl Widget for FlashcardView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let title = if self.deck.is_empty() {
            " Flashcards ".to_string()
        } else {
            format!(" Flashcards {}/{} ", self.deck.position() + 1, self.deck.len())
        };
        let border = if self.focused {
            colors.border_focused()
        } else {
            colors.border()
        };
        let block = Block::bordered()
            .title(title)
            .border_style(Style::default().fg(border));

        let Some(card) = self.deck.current() else {
            Paragraph::new(Span::styled(
                "No flashcards were generated for this module.",
                Style::default().fg(colors.muted()),
            ))
            .block(block)
            .alignment(Alignment::Center)
            .render(area, buf);
            return;
        };

        let (side, text, color) = if self.deck.is_flipped() {
            ("ANSWER", card.answer.as_str(), colors.success())
        } else {
            ("QUESTION", card.question.as_str(), colors.highlight())
        };

        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                side,
                Style::default().fg(colors.muted()).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(text, Style::default().fg(color))),
        ];

        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}
