mod app;
mod config;
mod error;
mod event;
mod gateway;
mod jobs;
mod logging;
mod session;
mod store;
mod syllabus;
mod ui;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Wrap};

use app::{App, DetailFocus, HistoryView, MockView, RevisionView, Section};
use config::Config;
use event::{AppEvent, EventHandler};
use gateway::gemini::GeminiClient;
use jobs::Services;
use store::history_store::{StoreHandle, default_data_dir};
use syllabus::Syllabus;
use ui::components::flashcard_view::FlashcardView;
use ui::components::menu::{Menu, MenuItem};
use ui::components::notes_view::NotesView;
use ui::components::section_tabs::SectionTabs;
use ui::components::test_review::{MockTestView, RecordDetail, format_marks};
use ui::components::weightage_chart::WeightageChart;
use ui::layout::{ScreenLayout, centered_rect, pack_hint_lines, split_panes};
use ui::line_input::InputResult;
use ui::theme::Theme;

#[derive(Parser)]
#[command(
    name = "examprep",
    version,
    about = "Exam preparation in the terminal: AI revision notes, flashcards, PYQ analysis and mock tests"
)]
struct Cli {
    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(short, long, help = "Directory for test history and logs")]
    data_dir: Option<PathBuf>,

    #[arg(long, help = "Log level (error, warn, info, debug, trace)")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let (mut config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let _log_guard = logging::init(&data_dir.join("logs"), &config.log_level)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), data_dir = %data_dir.display(), "starting");
    if let Some(e) = config_error {
        tracing::warn!(error = %format!("{e:#}"), "ignoring unreadable config, using defaults");
    }

    let theme_name = cli.theme.as_deref().unwrap_or(&config.theme);
    let theme = Theme::load(theme_name).unwrap_or_else(|| {
        tracing::warn!(theme = theme_name, "unknown theme, using default");
        Theme::default()
    });
    let theme: &'static Theme = Box::leak(Box::new(theme));

    let syllabus = Syllabus::load(config.syllabus_dir.as_deref().map(Path::new))?;
    let client = GeminiClient::from_config(&config, config.api_key())
        .context("building the Gemini client")?;
    let has_api_key = client.has_api_key();
    let services = Services {
        content: Arc::new(client),
        store: Arc::new(StoreHandle::new(data_dir)),
    };

    let mut app = App::new(config, services, syllabus, theme);
    if !has_api_key {
        tracing::warn!("no API key configured");
        app.banner = Some(format!(
            "No API key found: set {} or GEMINI_API_KEY (a .env file works too).",
            app.config.api_key_env
        ));
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = EventHandler::new(Duration::from_millis(250));
    let result = run_app(&mut terminal, &mut app, &events);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        tracing::error!(error = %format!("{err:#}"), "exiting with error");
        eprintln!("Error: {err:?}");
    }
    tracing::info!("exiting");
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        for (ticket, job) in app.take_jobs() {
            jobs::spawn(ticket, job, app.services(), events.sender());
        }

        terminal.draw(|frame| render(frame, app))?;

        match events.next()? {
            AppEvent::Key(key) => handle_key(app, key),
            AppEvent::Job(ticket, outcome) => app.apply_outcome(ticket, outcome),
            AppEvent::Tick | AppEvent::Resize(_, _) => {}
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind == KeyEventKind::Release {
        return;
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }
    app.banner = None;

    if !app.is_typing() && !app.history.confirm_clear {
        match key.code {
            KeyCode::Char('q') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Tab => {
                app.set_section(app.section.next());
                return;
            }
            KeyCode::BackTab => {
                app.set_section(app.section.prev());
                return;
            }
            KeyCode::Char(c @ '1'..='4') => {
                let index = c as usize - '1' as usize;
                app.set_section(Section::ALL[index]);
                return;
            }
            _ => {}
        }
    }

    match app.section {
        Section::Revision => handle_revision_key(app, key),
        Section::Pyqs => handle_pyqs_key(app, key),
        Section::MockTest => handle_mock_key(app, key),
        Section::History => handle_history_key(app, key),
    }
}

fn handle_revision_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.revision_move(false),
        KeyCode::Down | KeyCode::Char('j') => app.revision_move(true),
        KeyCode::Esc | KeyCode::Backspace => app.revision_back(),
        _ if app.revision.view != RevisionView::ModuleDetail => {
            if key.code == KeyCode::Enter {
                app.revision_open();
            }
        }
        KeyCode::Left | KeyCode::Char('h') => app.revision.deck.prev(),
        KeyCode::Right | KeyCode::Char('l') => app.revision.deck.next(),
        KeyCode::Char(' ') | KeyCode::Enter => app.revision.deck.flip(),
        KeyCode::Char('f') => app.toggle_detail_focus(),
        _ => {}
    }
}

fn handle_pyqs_key(app: &mut App, key: KeyEvent) {
    if app.pyqs.editing {
        match app.pyqs.input.handle(key) {
            InputResult::Submit => app.analyze_paper(),
            InputResult::Cancel => app.pyqs.editing = false,
            InputResult::Continue => {}
        }
        return;
    }
    match key.code {
        KeyCode::Enter | KeyCode::Char('e') | KeyCode::Char('/') => app.pyqs.editing = true,
        KeyCode::Up | KeyCode::Char('k') => app.pyqs.scroll = app.pyqs.scroll.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => app.pyqs.scroll = app.pyqs.scroll.saturating_add(1),
        _ => {}
    }
}

fn handle_mock_key(app: &mut App, key: KeyEvent) {
    if let Some(input) = app.mock.answer_input.as_mut() {
        match input.handle(key) {
            InputResult::Submit => app.commit_answer(),
            InputResult::Cancel => app.cancel_answer(),
            InputResult::Continue => {}
        }
        return;
    }

    match app.mock.view {
        MockView::Setup => match key.code {
            KeyCode::Up | KeyCode::Char('k') => app.setup_move(false),
            KeyCode::Down | KeyCode::Char('j') => app.setup_move(true),
            KeyCode::Left | KeyCode::Char('h') => app.setup_adjust(false),
            KeyCode::Right | KeyCode::Char('l') => app.setup_adjust(true),
            KeyCode::Char(' ') | KeyCode::Enter => app.setup_activate(),
            KeyCode::Char('g') => app.generate_test(),
            _ => {}
        },
        MockView::InProgress => match key.code {
            KeyCode::Up | KeyCode::Char('k') => app.question_move(false),
            KeyCode::Down | KeyCode::Char('j') => app.question_move(true),
            KeyCode::Enter | KeyCode::Char('a') => app.open_answer(),
            KeyCode::Char('c') => app.check_answer(),
            KeyCode::Char('s') => app.save_test(),
            KeyCode::Esc => app.new_test(),
            _ => {}
        },
        MockView::Saved => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Char('n')) {
                app.new_test();
            }
        }
    }
}

fn handle_history_key(app: &mut App, key: KeyEvent) {
    if app.history.confirm_clear {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => app.answer_clear(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.answer_clear(false),
            _ => {}
        }
        return;
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.history_move(false),
        KeyCode::Down | KeyCode::Char('j') => app.history_move(true),
        KeyCode::Esc | KeyCode::Backspace => app.history_back(),
        KeyCode::Enter if app.history.view == HistoryView::List => app.open_record(),
        KeyCode::Char('c') if app.history.view == HistoryView::List => app.request_clear(),
        KeyCode::Char('r') if app.history.view == HistoryView::List => app.load_history(),
        _ => {}
    }
}

fn render(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let bg = Block::default().style(Style::default().bg(colors.bg()).fg(colors.fg()));
    frame.render_widget(bg, area);

    let layout = ScreenLayout::new(area);
    frame.render_widget(
        SectionTabs {
            selected: app.section,
            theme: app.theme,
        },
        layout.tabs,
    );

    match app.section {
        Section::Revision => render_revision(frame, app, layout.body),
        Section::Pyqs => render_pyqs(frame, app, layout.body),
        Section::MockTest => render_mock(frame, app, layout.body),
        Section::History => render_history(frame, app, layout.body),
    }

    render_footer(frame, app, layout.footer);
}

fn render_footer(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let colors = &app.theme.colors;
    let mut lines = Vec::new();
    if let Some((message, color)) = status_message(app) {
        lines.push(Line::from(Span::styled(
            format!("  {message}"),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
    }
    let room = (area.height as usize).saturating_sub(lines.len());
    for hint in pack_hint_lines(&footer_hints(app), area.width as usize)
        .into_iter()
        .take(room)
    {
        lines.push(Line::from(Span::styled(
            hint,
            Style::default().fg(colors.muted()),
        )));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

fn status_message(app: &App) -> Option<(String, ratatui::style::Color)> {
    let colors = &app.theme.colors;
    if let Some(banner) = &app.banner {
        return Some((banner.clone(), colors.warning()));
    }
    let error = match app.section {
        Section::Revision => app.revision.error.as_ref(),
        Section::Pyqs => app.pyqs.error.as_ref(),
        Section::MockTest => app.mock.error.as_ref(),
        Section::History => app.history.error.as_ref(),
    };
    if let Some(error) = error {
        return Some((error.clone(), colors.error()));
    }
    if app.section == Section::MockTest {
        if let Some(notice) = &app.mock.notice {
            return Some((notice.clone(), colors.success()));
        }
    }
    None
}

fn footer_hints(app: &App) -> Vec<&'static str> {
    const NAV: [&str; 2] = ["[Tab/1-4] Section", "[q] Quit"];
    let mut hints: Vec<&'static str> = match app.section {
        Section::Revision => match app.revision.view {
            RevisionView::Subjects | RevisionView::Modules => {
                vec!["[↑↓] Move", "[Enter] Open", "[Esc] Back"]
            }
            RevisionView::ModuleDetail => vec![
                "[↑↓] Scroll/cards",
                "[←→] Prev/next card",
                "[Space] Flip",
                "[f] Switch pane",
                "[Esc] Back",
            ],
        },
        Section::Pyqs if app.pyqs.editing => {
            return vec!["[Enter] Analyze", "[Tab] Complete path", "[Esc] Stop editing"];
        }
        Section::Pyqs => vec!["[Enter/e] Edit path", "[↑↓] Scroll"],
        Section::MockTest if app.mock.answer_input.is_some() => {
            return vec!["[Enter] Keep answer", "[Esc] Discard edit"];
        }
        Section::MockTest => match app.mock.view {
            MockView::Setup => vec![
                "[↑↓] Move",
                "[Space] Toggle",
                "[←→] Adjust",
                "[g] Generate",
            ],
            MockView::InProgress => vec![
                "[↑↓] Question",
                "[Enter] Answer",
                "[c] Check",
                "[s] Save",
                "[Esc] Abandon",
            ],
            MockView::Saved => vec!["[Enter] New test"],
        },
        Section::History if app.history.confirm_clear => {
            return vec!["[y] Delete everything", "[n] Keep"];
        }
        Section::History => match app.history.view {
            HistoryView::List => vec!["[↑↓] Move", "[Enter] Open", "[c] Clear all", "[r] Reload"],
            HistoryView::Detail => vec!["[↑↓] Scroll", "[Esc] Back"],
        },
    };
    hints.extend(NAV);
    hints
}

fn render_placeholder(frame: &mut ratatui::Frame, app: &App, area: Rect, title: &str, text: &str) {
    let colors = &app.theme.colors;
    let block = Block::bordered()
        .title(format!(" {title} "))
        .border_style(Style::default().fg(colors.border()));
    let paragraph = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(text.to_string(), Style::default().fg(colors.muted()))),
    ])
    .block(block)
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_revision(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    match app.revision.view {
        RevisionView::Subjects => {
            let items = app
                .syllabus
                .subjects
                .iter()
                .map(|s| {
                    let item = MenuItem::new(
                        s.name.clone(),
                        format!("{} chapters · {} modules", s.chapters, s.modules.len()),
                    );
                    if s.is_available() { item } else { item.disabled() }
                })
                .collect();
            frame.render_widget(
                Menu::new("Subjects", items, app.revision.subject, app.theme),
                area,
            );
        }
        RevisionView::Modules => {
            let Some(subject) = app.current_subject() else {
                return;
            };
            let items = subject
                .modules
                .iter()
                .map(|m| {
                    let item =
                        MenuItem::new(format!("Module {}: {}", m.number, m.title), m.description.clone());
                    if m.is_available() { item } else { item.disabled() }
                })
                .collect();
            frame.render_widget(
                Menu::new(&subject.name, items, app.revision.module, app.theme),
                area,
            );
        }
        RevisionView::ModuleDetail => {
            let title = app.current_module().map_or("Module", |m| m.title.as_str());
            if app.revision.loading {
                render_placeholder(frame, app, area, title, "Generating notes and flashcards…");
                return;
            }
            let Some(notes) = &app.revision.notes else {
                render_placeholder(frame, app, area, title, "Nothing to show. Press Esc to go back.");
                return;
            };
            let (left, right) = split_panes(area, 60);
            frame.render_widget(
                NotesView {
                    text: notes,
                    scroll: app.revision.notes_scroll,
                    focused: app.revision.focus == DetailFocus::Notes,
                    theme: app.theme,
                },
                left,
            );
            frame.render_widget(
                FlashcardView {
                    deck: &app.revision.deck,
                    focused: app.revision.focus == DetailFocus::Flashcards,
                    theme: app.theme,
                },
                right,
            );
        }
    }
}

fn render_pyqs(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let colors = &app.theme.colors;
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let (before, cursor, after) = app.pyqs.input.render_parts();
    let mut spans = vec![Span::styled(before.to_string(), Style::default().fg(colors.fg()))];
    if app.pyqs.editing {
        let cursor_style = Style::default().fg(colors.bg()).bg(colors.fg());
        spans.push(Span::styled(cursor.map_or(" ".to_string(), String::from), cursor_style));
    } else if let Some(ch) = cursor {
        spans.push(Span::styled(ch.to_string(), Style::default().fg(colors.fg())));
    }
    spans.push(Span::styled(after.to_string(), Style::default().fg(colors.fg())));
    if app.pyqs.input.completion_failed() {
        spans.push(Span::styled(
            "  (cannot list that directory)",
            Style::default().fg(colors.warning()),
        ));
    }
    let border = if app.pyqs.editing {
        colors.border_focused()
    } else {
        colors.border()
    };
    frame.render_widget(
        Paragraph::new(Line::from(spans)).block(
            Block::bordered()
                .title(" Question paper (PDF, PNG, JPG, WEBP) ")
                .border_style(Style::default().fg(border)),
        ),
        layout[0],
    );

    if app.pyqs.loading {
        render_placeholder(frame, app, layout[1], "Analysis", "Analyzing the question paper…");
        return;
    }
    let Some(analysis) = &app.pyqs.analysis else {
        render_placeholder(
            frame,
            app,
            layout[1],
            "Analysis",
            "Enter the path of a past question paper to see chapter weightage and extracted questions.",
        );
        return;
    };

    let (left, right) = split_panes(layout[1], 45);
    frame.render_widget(
        WeightageChart {
            entries: &analysis.weightage,
            theme: app.theme,
        },
        left,
    );

    let mut lines = Vec::new();
    for (i, pyq) in analysis.pyqs.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{}. ", i + 1),
                Style::default().fg(colors.accent()).add_modifier(Modifier::BOLD),
            ),
            Span::styled(pyq.question.clone(), Style::default().fg(colors.fg())),
        ]));
        lines.push(Line::from(Span::styled(
            format!("   {} · {} marks", pyq.chapter, format_marks(pyq.marks)),
            Style::default().fg(colors.muted()),
        )));
        lines.push(Line::from(""));
    }
    frame.render_widget(
        Paragraph::new(lines)
            .block(
                Block::bordered()
                    .title(format!(" Extracted Questions ({}) ", analysis.pyqs.len()))
                    .border_style(Style::default().fg(colors.border())),
            )
            .wrap(Wrap { trim: false })
            .scroll((app.pyqs.scroll, 0)),
        right,
    );
}

fn render_mock(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    match app.mock.view {
        MockView::Setup => render_mock_setup(frame, app, area),
        MockView::InProgress => {
            if let Some(session) = &app.mock.session {
                frame.render_widget(
                    MockTestView {
                        session,
                        selected: app.mock.selected,
                        input: app.mock.answer_input.as_ref(),
                        theme: app.theme,
                    },
                    area,
                );
            }
        }
        MockView::Saved => {
            let colors = &app.theme.colors;
            let popup = centered_rect(40, 30, area);
            let score = app.mock.session.as_ref().map_or(String::new(), |s| {
                format!(
                    "Score: {} / {}",
                    format_marks(s.total_score()),
                    format_marks(s.max_score())
                )
            });
            let lines = vec![
                Line::from(""),
                Line::from(Span::styled(
                    app::SAVED_MESSAGE,
                    Style::default().fg(colors.success()).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(score, Style::default().fg(colors.fg()))),
                Line::from(""),
                Line::from(Span::styled(
                    "Press Enter to start a new test.",
                    Style::default().fg(colors.muted()),
                )),
            ];
            frame.render_widget(
                Paragraph::new(lines).alignment(Alignment::Center).block(
                    Block::bordered().border_style(Style::default().fg(colors.border_focused())),
                ),
                popup,
            );
        }
    }
}

fn render_mock_setup(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let colors = &app.theme.colors;
    let setup = &app.mock.setup;
    let row_style = |row: usize| {
        if row == setup.cursor {
            Style::default().fg(colors.accent()).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.fg())
        }
    };
    let marker = |row: usize| if row == setup.cursor { " > " } else { "   " };

    let mut lines = vec![Line::from(Span::styled(
        " Chapters",
        Style::default().fg(colors.muted()),
    ))];
    for (row, (name, on)) in setup.chapters.iter().enumerate() {
        let check = if *on { "[x]" } else { "[ ]" };
        lines.push(Line::from(Span::styled(
            format!("{}{check} {name}", marker(row)),
            row_style(row),
        )));
    }
    lines.push(Line::from(""));
    let count_row = setup.count_row();
    lines.push(Line::from(Span::styled(
        format!("{}Questions:  < {} >", marker(count_row), setup.num_questions),
        row_style(count_row),
    )));
    let difficulty_row = setup.difficulty_row();
    lines.push(Line::from(Span::styled(
        format!("{}Difficulty: < {} >", marker(difficulty_row), setup.difficulty),
        row_style(difficulty_row),
    )));
    lines.push(Line::from(""));
    if app.mock.generating {
        lines.push(Line::from(Span::styled(
            " Generating your test…",
            Style::default().fg(colors.warning()),
        )));
    }

    frame.render_widget(
        Paragraph::new(lines).block(
            Block::bordered()
                .title(" New Mock Test ")
                .border_style(Style::default().fg(colors.border_focused())),
        ),
        area,
    );
}

fn render_history(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    if app.history.loading && app.history.records.is_empty() {
        render_placeholder(frame, app, area, "History", "Loading test history…");
        return;
    }

    match app.history.view {
        HistoryView::List => {
            let items = app
                .history
                .records
                .iter()
                .map(|r| {
                    let percent = if r.max_score > 0.0 {
                        r.total_score / r.max_score * 100.0
                    } else {
                        0.0
                    };
                    MenuItem::new(
                        format!(
                            "{} / {}  ({percent:.0}%)",
                            format_marks(r.total_score),
                            format_marks(r.max_score)
                        ),
                        format!(
                            "{} · {} · {}",
                            r.created_at.with_timezone(&chrono::Local).format("%d %b %Y, %H:%M"),
                            r.options.difficulty,
                            r.options.chapters.join(", ")
                        ),
                    )
                })
                .collect();
            frame.render_widget(
                Menu::new("Past Tests", items, app.history.selected, app.theme),
                area,
            );
        }
        HistoryView::Detail => {
            if let Some(record) = app.history.selected_record() {
                frame.render_widget(
                    RecordDetail {
                        record,
                        scroll: app.history.detail_scroll,
                        theme: app.theme,
                    },
                    area,
                );
            }
        }
    }

    if app.history.confirm_clear {
        render_clear_confirmation(frame, app, area);
    }
}

fn render_clear_confirmation(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let colors = &app.theme.colors;
    let popup = centered_rect(40, 25, area);
    frame.render_widget(Clear, popup);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("Delete all {} saved tests?", app.history.records.len()),
            Style::default().fg(colors.fg()).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "This cannot be undone.",
            Style::default().fg(colors.error()),
        )),
        Line::from(""),
        Line::from(Span::styled("[y] Yes   [n] No", Style::default().fg(colors.muted()))),
    ];
    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center).block(
            Block::bordered()
                .title(" Clear History ")
                .border_style(Style::default().fg(colors.error()))
                .style(Style::default().bg(colors.bg())),
        ),
        popup,
    );
}
