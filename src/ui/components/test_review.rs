use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::gateway::{Evaluation, Question};
use crate::session::mock_test::MockTestSession;
use crate::store::schema::TestRecord;
use crate::ui::layout::wrapped_line_count;
use crate::ui::line_input::LineInput;
use crate::ui::theme::{Theme, ThemeColors};

/// Everything shown for one question, in display order.
struct QuestionBlock<'a> {
    number: usize,
    question: &'a Question,
    answer: &'a str,
    evaluation: Option<&'a Evaluation>,
    status: Option<Span<'static>>,
    show_model_answer: bool,
    selected: bool,
}

impl QuestionBlock<'_> {
    fn lines(&self, colors: &ThemeColors) -> Vec<Line<'static>> {
        let marker = if self.selected { "> " } else { "  " };
        let title_style = if self.selected {
            Style::default()
                .fg(colors.accent())
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.fg()).add_modifier(Modifier::BOLD)
        };

        let mut lines = vec![
            Line::from(vec![
                Span::styled(format!("{marker}Q{}. ", self.number), title_style),
                Span::styled(self.question.question.clone(), title_style),
            ]),
            Line::from(Span::styled(
                format!("    {} · {} marks", self.question.chapter, format_marks(self.question.marks)),
                Style::default().fg(colors.muted()),
            )),
        ];

        let answer = if self.answer.trim().is_empty() {
            Span::styled("(no answer yet)", Style::default().fg(colors.muted()))
        } else {
            Span::styled(self.answer.to_string(), Style::default().fg(colors.fg()))
        };
        lines.push(Line::from(vec![
            Span::styled("    Your answer: ", Style::default().fg(colors.muted())),
            answer,
        ]));

        if self.show_model_answer {
            lines.push(Line::from(vec![
                Span::styled("    Model answer: ", Style::default().fg(colors.muted())),
                Span::styled(self.question.answer.clone(), Style::default().fg(colors.success())),
            ]));
        }

        if let Some(evaluation) = self.evaluation {
            lines.push(Line::from(vec![
                Span::styled("    Score: ", Style::default().fg(colors.muted())),
                Span::styled(
                    format!(
                        "{} / {}",
                        format_marks(evaluation.score),
                        format_marks(self.question.marks)
                    ),
                    Style::default()
                        .fg(colors.highlight())
                        .add_modifier(Modifier::BOLD),
                ),
            ]));
            lines.push(Line::from(vec![
                Span::styled("    Feedback: ", Style::default().fg(colors.muted())),
                Span::styled(evaluation.feedback.clone(), Style::default().fg(colors.fg())),
            ]));
        }

        if let Some(status) = &self.status {
            lines.push(Line::from(vec![Span::raw("    "), status.clone()]));
        }
        lines.push(Line::from(""));
        lines
    }
}

/// Marks are whole numbers in practice; show decimals only when present.
pub fn format_marks(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

/// Rows the wrapped `lines` occupy at `width`.
fn wrapped_height(lines: &[Line], width: usize) -> usize {
    lines
        .iter()
        .map(|line| {
            let text: String = line.spans.iter().map(|s| &*s.content).collect();
            wrapped_line_count(&text, width)
        })
        .sum()
}

/// The questions of a test being answered, scrolled to the selected one.
pub struct MockTestView<'a> {
    pub session: &'a MockTestSession,
    pub selected: usize,
    pub input: Option<&'a LineInput>,
    pub theme: &'a Theme,
}

impl Widget for MockTestView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let title = format!(
            " Mock Test · {}/{} evaluated ",
            self.session.evaluated_count(),
            self.session.len()
        );
        let block = Block::bordered()
            .title(title)
            .border_style(Style::default().fg(colors.border_focused()));
        let inner = block.inner(area);
        let width = inner.width.max(1) as usize;

        let mut lines: Vec<Line<'static>> = Vec::new();
        let mut scroll = 0usize;
        for (i, (question, state)) in self
            .session
            .questions
            .iter()
            .zip(&self.session.states)
            .enumerate()
        {
            let selected = i == self.selected;
            let status = if state.evaluating {
                Some(Span::styled(
                    "Evaluating…",
                    Style::default().fg(colors.warning()),
                ))
            } else {
                state.error.as_ref().map(|e| {
                    Span::styled(e.clone(), Style::default().fg(colors.error()))
                })
            };
            let editing = selected && self.input.is_some();
            let block_lines = QuestionBlock {
                number: i + 1,
                question,
                answer: if editing { "" } else { &state.answer },
                evaluation: state.evaluation.as_ref(),
                status,
                show_model_answer: state.evaluation.is_some(),
                selected,
            }
            .lines(colors);

            if selected {
                scroll = wrapped_height(&lines, width);
            }
            lines.extend(block_lines);
            if editing {
                if let Some(input) = self.input {
                    // Replace the "Your answer" row with the live field.
                    let answer_row = lines.len() - 1 - trailing_rows(state);
                    lines[answer_row] = input_line(input, colors);
                }
            }
        }

        if self.session.all_evaluated() {
            lines.push(Line::from(Span::styled(
                format!(
                    "Total: {} / {}",
                    format_marks(self.session.total_score()),
                    format_marks(self.session.max_score())
                ),
                Style::default()
                    .fg(colors.highlight())
                    .add_modifier(Modifier::BOLD),
            )));
        }

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((scroll.min(u16::MAX as usize) as u16, 0))
            .render(area, buf);
    }
}

/// Rows after "Your answer" in an unevaluated block: status (if any) and the spacer.
fn trailing_rows(state: &crate::session::mock_test::QuestionState) -> usize {
    let status = usize::from(state.evaluating || state.error.is_some());
    status + 1
}

fn input_line(input: &LineInput, colors: &ThemeColors) -> Line<'static> {
    let (before, cursor, after) = input.render_parts();
    let cursor_style = Style::default().fg(colors.bg()).bg(colors.fg());
    Line::from(vec![
        Span::styled("    Your answer: ", Style::default().fg(colors.accent())),
        Span::styled(before.to_string(), Style::default().fg(colors.fg())),
        Span::styled(cursor.map_or(" ".to_string(), String::from), cursor_style),
        Span::styled(after.to_string(), Style::default().fg(colors.fg())),
    ])
}

/// A saved test: each question with the user's answer, model answer and evaluation.
pub struct RecordDetail<'a> {
    pub record: &'a TestRecord,
    pub scroll: u16,
    pub theme: &'a Theme,
}

impl Widget for RecordDetail<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let record = self.record;

        let mut lines = vec![
            Line::from(vec![
                Span::styled("Score: ", Style::default().fg(colors.muted())),
                Span::styled(
                    format!(
                        "{} / {}",
                        format_marks(record.total_score),
                        format_marks(record.max_score)
                    ),
                    Style::default()
                        .fg(colors.highlight())
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(
                        "   {} · {}",
                        record.options.difficulty,
                        record.options.chapters.join(", ")
                    ),
                    Style::default().fg(colors.muted()),
                ),
            ]),
            Line::from(""),
        ];

        for (i, answered) in record.questions.iter().enumerate() {
            let status = answered.evaluation.is_none().then(|| {
                Span::styled("Not evaluated", Style::default().fg(colors.warning()))
            });
            lines.extend(
                QuestionBlock {
                    number: i + 1,
                    question: &answered.question,
                    answer: &answered.user_answer,
                    evaluation: answered.evaluation.as_ref(),
                    status,
                    show_model_answer: true,
                    selected: false,
                }
                .lines(colors),
            );
        }

        let title = format!(
            " Test from {} ",
            record
                .created_at
                .with_timezone(&chrono::Local)
                .format("%d %b %Y, %H:%M")
        );
        Paragraph::new(lines)
            .block(
                Block::bordered()
                    .title(title)
                    .border_style(Style::default().fg(colors.border_focused())),
            )
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .render(area, buf);
    }
}
