use std::collections::HashSet;
use std::path::PathBuf;

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::config::{Config, MAX_QUESTIONS, MIN_QUESTIONS};
use crate::error::GenerationTarget;
use crate::gateway::PyqAnalysis;
use crate::jobs::{Job, JobOutcome, Services, Ticket};
use crate::session::flashcards::FlashcardDeck;
use crate::session::mock_test::MockTestSession;
use crate::store::schema::{Difficulty, MockTestOptions, TestRecord};
use crate::syllabus::{Module, Subject, Syllabus};
use crate::ui::line_input::LineInput;
use crate::ui::theme::Theme;

pub const MISSING_FILE_MESSAGE: &str = "Please select a PDF file.";
pub const NO_CHAPTERS_MESSAGE: &str = "Please select at least one chapter.";
pub const SAVE_FAILED_MESSAGE: &str = "Failed to save test results. Please try again.";
pub const SAVED_MESSAGE: &str = "Test Saved!";
pub const MISSING_CONTENT_MESSAGE: &str = "Chapter content for this module could not be loaded.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Revision,
    Pyqs,
    MockTest,
    History,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Revision,
        Section::Pyqs,
        Section::MockTest,
        Section::History,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Section::Revision => "Revision",
            Section::Pyqs => "PYQ Analysis",
            Section::MockTest => "Mock Test",
            Section::History => "History",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Move a list cursor one step with wrap-around.
pub fn step(current: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        0
    } else if forward {
        (current + 1) % len
    } else {
        (current + len - 1) % len
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RevisionView {
    #[default]
    Subjects,
    Modules,
    ModuleDetail,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetailFocus {
    #[default]
    Notes,
    Flashcards,
}

#[derive(Debug, Default)]
pub struct RevisionState {
    pub view: RevisionView,
    pub subject: usize,
    pub module: usize,
    pub notes: Option<String>,
    pub deck: FlashcardDeck,
    pub focus: DetailFocus,
    pub notes_scroll: u16,
    pub loading: bool,
    pub error: Option<String>,
    pending: Option<Ticket>,
}

#[derive(Debug)]
pub struct PyqState {
    pub input: LineInput,
    pub editing: bool,
    pub analysis: Option<PyqAnalysis>,
    pub scroll: u16,
    pub loading: bool,
    pub error: Option<String>,
    pending: Option<Ticket>,
}

impl Default for PyqState {
    fn default() -> Self {
        Self {
            input: LineInput::path(""),
            editing: true,
            analysis: None,
            scroll: 0,
            loading: false,
            error: None,
            pending: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MockView {
    #[default]
    Setup,
    InProgress,
    Saved,
}

/// Chapter toggles followed by the question-count and difficulty rows.
/// The first chapter starts ticked.
#[derive(Clone, Debug, Default)]
pub struct MockSetup {
    pub chapters: Vec<(String, bool)>,
    pub cursor: usize,
    pub num_questions: u32,
    pub difficulty: Difficulty,
}

impl MockSetup {
    pub fn new(chapters: &[String], config: &Config) -> Self {
        Self {
            chapters: chapters
                .iter()
                .enumerate()
                .map(|(i, c)| (c.clone(), i == 0))
                .collect(),
            cursor: 0,
            num_questions: config
                .default_question_count
                .clamp(MIN_QUESTIONS, MAX_QUESTIONS),
            difficulty: config.default_difficulty,
        }
    }

    pub fn rows(&self) -> usize {
        self.chapters.len() + 2
    }

    pub fn count_row(&self) -> usize {
        self.chapters.len()
    }

    pub fn difficulty_row(&self) -> usize {
        self.chapters.len() + 1
    }

    pub fn selected_chapters(&self) -> Vec<String> {
        self.chapters
            .iter()
            .filter(|(_, on)| *on)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct MockState {
    pub view: MockView,
    pub setup: MockSetup,
    pub session: Option<MockTestSession>,
    pub selected: usize,
    /// Open while the user is typing an answer for `selected`.
    pub answer_input: Option<LineInput>,
    pub generating: bool,
    pub saving: bool,
    pub error: Option<String>,
    pub notice: Option<String>,
    requested: Option<MockTestOptions>,
    pending_test: Option<Ticket>,
    pending_evaluations: HashSet<Ticket>,
    pending_save: Option<Ticket>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HistoryView {
    #[default]
    List,
    Detail,
}

#[derive(Debug, Default)]
pub struct HistoryState {
    pub view: HistoryView,
    pub records: Vec<TestRecord>,
    pub selected: usize,
    pub detail_scroll: u16,
    pub confirm_clear: bool,
    pub loading: bool,
    pub error: Option<String>,
    pending: Option<Ticket>,
}

impl HistoryState {
    pub fn selected_record(&self) -> Option<&TestRecord> {
        self.records.get(self.selected)
    }
}

pub struct App {
    pub section: Section,
    pub revision: RevisionState,
    pub pyqs: PyqState,
    pub mock: MockState,
    pub history: HistoryState,
    pub syllabus: Syllabus,
    pub config: Config,
    pub theme: &'static Theme,
    /// Shown in the footer until the next key press.
    pub banner: Option<String>,
    pub should_quit: bool,
    services: Services,
    outbox: Vec<(Ticket, Job)>,
    last_ticket: Ticket,
    rng: SmallRng,
}

impl App {
    pub fn new(config: Config, services: Services, syllabus: Syllabus, theme: &'static Theme) -> Self {
        let setup = MockSetup::new(&syllabus.test_chapters, &config);
        Self {
            section: Section::Revision,
            revision: RevisionState::default(),
            pyqs: PyqState::default(),
            mock: MockState {
                setup,
                ..MockState::default()
            },
            history: HistoryState::default(),
            syllabus,
            config,
            theme,
            banner: None,
            should_quit: false,
            services,
            outbox: Vec::new(),
            last_ticket: Ticket::default(),
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn services(&self) -> Services {
        self.services.clone()
    }

    /// Jobs queued since the last call, for the main loop to spawn.
    pub fn take_jobs(&mut self) -> Vec<(Ticket, Job)> {
        std::mem::take(&mut self.outbox)
    }

    fn submit(&mut self, job: Job) -> Ticket {
        self.last_ticket = self.last_ticket.next();
        tracing::debug!(ticket = ?self.last_ticket, job = job.name(), "queued");
        self.outbox.push((self.last_ticket, job));
        self.last_ticket
    }

    /// True while a text field owns the keyboard.
    pub fn is_typing(&self) -> bool {
        match self.section {
            Section::Pyqs => self.pyqs.editing,
            Section::MockTest => self.mock.answer_input.is_some(),
            _ => false,
        }
    }

    pub fn set_section(&mut self, section: Section) {
        if self.section == section {
            return;
        }
        self.section = section;
        if section == Section::History {
            self.history.view = HistoryView::List;
            self.history.confirm_clear = false;
            self.load_history();
        }
    }

    // --- Revision ---

    pub fn current_subject(&self) -> Option<&Subject> {
        self.syllabus.subjects.get(self.revision.subject)
    }

    pub fn current_module(&self) -> Option<&Module> {
        self.current_subject()?.modules.get(self.revision.module)
    }

    pub fn revision_move(&mut self, forward: bool) {
        match self.revision.view {
            RevisionView::Subjects => {
                let len = self.syllabus.subjects.len();
                self.revision.subject = step(self.revision.subject, len, forward);
            }
            RevisionView::Modules => {
                let len = self.current_subject().map_or(0, |s| s.modules.len());
                self.revision.module = step(self.revision.module, len, forward);
            }
            RevisionView::ModuleDetail => match self.revision.focus {
                DetailFocus::Notes => {
                    self.revision.notes_scroll = if forward {
                        self.revision.notes_scroll.saturating_add(1)
                    } else {
                        self.revision.notes_scroll.saturating_sub(1)
                    };
                }
                DetailFocus::Flashcards => {
                    if forward {
                        self.revision.deck.next();
                    } else {
                        self.revision.deck.prev();
                    }
                }
            },
        }
    }

    /// Open the highlighted subject or module. Entries without content stay closed.
    pub fn revision_open(&mut self) {
        match self.revision.view {
            RevisionView::Subjects => {
                if self.current_subject().is_some_and(Subject::is_available) {
                    self.revision.view = RevisionView::Modules;
                    self.revision.module = 0;
                }
            }
            RevisionView::Modules => {
                let Some(module) = self.current_module().filter(|m| m.is_available()) else {
                    return;
                };
                let text = self.syllabus.module_text(module);
                self.revision.view = RevisionView::ModuleDetail;
                self.revision.notes = None;
                self.revision.deck = FlashcardDeck::default();
                self.revision.focus = DetailFocus::Notes;
                self.revision.notes_scroll = 0;
                match text {
                    Some(text) => {
                        self.revision.loading = true;
                        self.revision.error = None;
                        self.revision.pending = Some(self.submit(Job::ModuleMaterials { text }));
                    }
                    None => {
                        tracing::warn!(module = module_title(self.current_module()), "chapter text missing");
                        self.revision.loading = false;
                        self.revision.error = Some(MISSING_CONTENT_MESSAGE.to_string());
                    }
                }
            }
            RevisionView::ModuleDetail => {}
        }
    }

    pub fn revision_back(&mut self) {
        match self.revision.view {
            RevisionView::ModuleDetail => {
                self.revision.view = RevisionView::Modules;
                self.revision.pending = None;
                self.revision.loading = false;
                self.revision.error = None;
            }
            RevisionView::Modules => self.revision.view = RevisionView::Subjects,
            RevisionView::Subjects => {}
        }
    }

    pub fn toggle_detail_focus(&mut self) {
        self.revision.focus = match self.revision.focus {
            DetailFocus::Notes => DetailFocus::Flashcards,
            DetailFocus::Flashcards => DetailFocus::Notes,
        };
    }

    // --- PYQ analysis ---

    pub fn analyze_paper(&mut self) {
        let raw = self.pyqs.input.value().trim();
        if raw.is_empty() {
            self.pyqs.error = Some(MISSING_FILE_MESSAGE.to_string());
            return;
        }
        let path = expand_home(raw);
        self.pyqs.editing = false;
        self.pyqs.loading = true;
        self.pyqs.error = None;
        self.pyqs.pending = Some(self.submit(Job::AnalyzePaper { path }));
    }

    // --- Mock test ---

    pub fn setup_move(&mut self, forward: bool) {
        let setup = &mut self.mock.setup;
        setup.cursor = step(setup.cursor, setup.rows(), forward);
    }

    /// Toggle the chapter under the cursor, or bump the count/difficulty row.
    pub fn setup_activate(&mut self) {
        let setup = &mut self.mock.setup;
        if let Some((_, on)) = setup.chapters.get_mut(setup.cursor) {
            *on = !*on;
            self.mock.error = None;
        } else {
            self.setup_adjust(true);
        }
    }

    pub fn setup_adjust(&mut self, up: bool) {
        let setup = &mut self.mock.setup;
        if setup.cursor == setup.count_row() {
            let count = if up {
                setup.num_questions.saturating_add(1)
            } else {
                setup.num_questions.saturating_sub(1)
            };
            setup.num_questions = count.clamp(MIN_QUESTIONS, MAX_QUESTIONS);
        } else if setup.cursor == setup.difficulty_row() {
            setup.difficulty = if up {
                setup.difficulty.next()
            } else {
                setup.difficulty.prev()
            };
        }
    }

    pub fn generate_test(&mut self) {
        if self.mock.generating {
            return;
        }
        let chapters = self.mock.setup.selected_chapters();
        if chapters.is_empty() {
            self.mock.error = Some(NO_CHAPTERS_MESSAGE.to_string());
            return;
        }
        let options = MockTestOptions {
            num_questions: self.mock.setup.num_questions,
            chapters,
            difficulty: self.mock.setup.difficulty,
        };
        self.mock.generating = true;
        self.mock.error = None;
        self.mock.requested = Some(options.clone());
        self.mock.pending_test = Some(self.submit(Job::GenerateTest { options }));
    }

    pub fn question_move(&mut self, forward: bool) {
        let len = self.mock.session.as_ref().map_or(0, MockTestSession::len);
        self.mock.selected = step(self.mock.selected, len, forward);
    }

    pub fn open_answer(&mut self) {
        let Some(session) = &self.mock.session else {
            return;
        };
        if let Some(state) = session.states.get(self.mock.selected) {
            if state.evaluation.is_none() && !state.evaluating {
                self.mock.answer_input = Some(LineInput::new(&state.answer));
            }
        }
    }

    pub fn commit_answer(&mut self) {
        let Some(input) = self.mock.answer_input.take() else {
            return;
        };
        if let Some(session) = self.mock.session.as_mut() {
            session.set_answer(self.mock.selected, input.value());
        }
    }

    pub fn cancel_answer(&mut self) {
        self.mock.answer_input = None;
    }

    pub fn check_answer(&mut self) {
        let Some(session) = self.mock.session.as_mut() else {
            return;
        };
        let already_scored = session
            .states
            .get(self.mock.selected)
            .is_some_and(|s| s.evaluation.is_some());
        if already_scored {
            return;
        }
        if let Some(request) = session.begin_evaluation(self.mock.selected) {
            let ticket = self.submit(Job::Evaluate(request));
            self.mock.pending_evaluations.insert(ticket);
        }
    }

    /// Save once every answer is scored. Scores are summed into the record here.
    pub fn save_test(&mut self) {
        if self.mock.saving {
            return;
        }
        let Some(session) = &self.mock.session else {
            return;
        };
        if !session.all_evaluated() {
            return;
        }
        let record = session.to_record(Utc::now(), &mut self.rng);
        self.mock.saving = true;
        self.mock.error = None;
        self.mock.pending_save = Some(self.submit(Job::SaveTest(Box::new(record))));
    }

    /// Drop the current test and return to setup. Chapter choices are kept.
    pub fn new_test(&mut self) {
        let setup = std::mem::take(&mut self.mock.setup);
        self.mock = MockState {
            setup,
            ..MockState::default()
        };
    }

    // --- History ---

    pub fn load_history(&mut self) {
        self.history.loading = true;
        self.history.error = None;
        self.history.pending = Some(self.submit(Job::LoadHistory));
    }

    pub fn history_move(&mut self, forward: bool) {
        match self.history.view {
            HistoryView::List => {
                self.history.selected =
                    step(self.history.selected, self.history.records.len(), forward);
            }
            HistoryView::Detail => {
                self.history.detail_scroll = if forward {
                    self.history.detail_scroll.saturating_add(1)
                } else {
                    self.history.detail_scroll.saturating_sub(1)
                };
            }
        }
    }

    pub fn open_record(&mut self) {
        if self.history.selected_record().is_some() {
            self.history.view = HistoryView::Detail;
            self.history.detail_scroll = 0;
        }
    }

    pub fn history_back(&mut self) {
        self.history.view = HistoryView::List;
    }

    pub fn request_clear(&mut self) {
        if !self.history.records.is_empty() && !self.history.loading {
            self.history.confirm_clear = true;
        }
    }

    pub fn answer_clear(&mut self, confirmed: bool) {
        self.history.confirm_clear = false;
        if confirmed {
            self.history.loading = true;
            self.history.error = None;
            self.history.pending = Some(self.submit(Job::ClearHistory));
        }
    }

    /// Apply a finished job. Outcomes for tickets no screen is waiting on are dropped.
    pub fn apply_outcome(&mut self, ticket: Ticket, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Materials(result) => {
                if !take_if_pending(&mut self.revision.pending, ticket) {
                    return stale(ticket);
                }
                self.revision.loading = false;
                match result {
                    Ok(materials) => {
                        self.revision.notes = Some(materials.notes);
                        self.revision.deck = FlashcardDeck::new(materials.flashcards);
                    }
                    Err(e) => self.revision.error = Some(e.to_string()),
                }
            }
            JobOutcome::Analysis(result) => {
                if !take_if_pending(&mut self.pyqs.pending, ticket) {
                    return stale(ticket);
                }
                self.pyqs.loading = false;
                match result {
                    Ok(analysis) => {
                        self.pyqs.analysis = Some(analysis);
                        self.pyqs.scroll = 0;
                    }
                    Err(e) => self.pyqs.error = Some(e.to_string()),
                }
            }
            JobOutcome::Questions(result) => {
                if !take_if_pending(&mut self.mock.pending_test, ticket) {
                    return stale(ticket);
                }
                self.mock.generating = false;
                let options = self.mock.requested.take();
                match (result, options) {
                    (Ok(questions), Some(options)) if !questions.is_empty() => {
                        tracing::info!(count = questions.len(), "mock test ready");
                        self.mock.session = Some(MockTestSession::new(options, questions));
                        self.mock.view = MockView::InProgress;
                        self.mock.selected = 0;
                        self.mock.pending_evaluations.clear();
                    }
                    (Ok(_), _) => {
                        tracing::warn!("mock test generation returned no questions");
                        self.mock.error =
                            Some(GenerationTarget::MockTest.failure_message().to_string());
                    }
                    (Err(e), _) => self.mock.error = Some(e.to_string()),
                }
            }
            JobOutcome::Evaluated { index, result } => {
                if !self.mock.pending_evaluations.remove(&ticket) {
                    return stale(ticket);
                }
                if let Some(session) = self.mock.session.as_mut() {
                    session.complete_evaluation(index, result.map_err(|e| e.to_string()));
                }
            }
            JobOutcome::Saved(result) => {
                if !take_if_pending(&mut self.mock.pending_save, ticket) {
                    return stale(ticket);
                }
                self.mock.saving = false;
                match result {
                    Ok(record) => {
                        tracing::info!(id = %record.id, score = record.total_score, max = record.max_score, "test saved");
                        self.mock.view = MockView::Saved;
                        self.mock.notice = Some(SAVED_MESSAGE.to_string());
                    }
                    Err(e) => {
                        tracing::error!(error = %e, source = ?std::error::Error::source(&e), "saving test failed");
                        self.mock.error = Some(SAVE_FAILED_MESSAGE.to_string());
                    }
                }
            }
            JobOutcome::History(result) => {
                if !take_if_pending(&mut self.history.pending, ticket) {
                    return stale(ticket);
                }
                self.history.loading = false;
                match result {
                    Ok(records) => {
                        self.history.selected =
                            self.history.selected.min(records.len().saturating_sub(1));
                        self.history.records = records;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, source = ?std::error::Error::source(&e), "loading history failed");
                        self.history.error = Some(e.to_string());
                    }
                }
            }
            JobOutcome::Cleared(result) => {
                if !take_if_pending(&mut self.history.pending, ticket) {
                    return stale(ticket);
                }
                self.history.loading = false;
                match result {
                    Ok(()) => {
                        tracing::info!("test history cleared");
                        self.history.records.clear();
                        self.history.selected = 0;
                        self.history.view = HistoryView::List;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, source = ?std::error::Error::source(&e), "clearing history failed");
                        self.history.error = Some(e.to_string());
                    }
                }
            }
        }
    }
}

fn take_if_pending(pending: &mut Option<Ticket>, ticket: Ticket) -> bool {
    if *pending == Some(ticket) {
        *pending = None;
        true
    } else {
        false
    }
}

fn stale(ticket: Ticket) {
    tracing::debug!(?ticket, "ignoring outcome nobody is waiting for");
}

fn module_title(module: Option<&Module>) -> &str {
    module.map_or("", |m| m.title.as_str())
}

fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map_or_else(|| PathBuf::from(raw), |home| home.join(rest)),
        None => PathBuf::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::{GatewayFault, RemoteServiceError};
    use crate::gateway::{ContentService, Evaluation, Flashcard, Question};
    use crate::jobs;
    use crate::store::history_store::StoreHandle;

    /// Answers every call with canned data; evaluation awards half marks.
    struct Canned;

    impl ContentService for Canned {
        fn generate_notes(&self, _text: &str) -> Result<String, RemoteServiceError> {
            Ok("# Microbes\n- **Bacteria** are everywhere".to_string())
        }

        fn generate_flashcards(&self, _text: &str) -> Result<Vec<Flashcard>, RemoteServiceError> {
            Ok(vec![
                Flashcard {
                    question: "What is a virus?".to_string(),
                    answer: "A non-cellular agent".to_string(),
                };
                3
            ])
        }

        fn analyze_document(
            &self,
            _content: &[u8],
            _mime_type: &str,
        ) -> Result<PyqAnalysis, RemoteServiceError> {
            Err(RemoteServiceError::Analysis(GatewayFault::EmptyResponse))
        }

        fn generate_test(
            &self,
            options: &MockTestOptions,
        ) -> Result<Vec<Question>, RemoteServiceError> {
            Ok((0..options.num_questions)
                .map(|i| Question {
                    question: format!("Question {i}"),
                    answer: "model".to_string(),
                    chapter: options.chapters[0].clone(),
                    marks: 2.0,
                })
                .collect())
        }

        fn evaluate_answer(
            &self,
            _question: &str,
            _user_answer: &str,
            _model_answer: &str,
            max_marks: f64,
        ) -> Result<Evaluation, RemoteServiceError> {
            Ok(Evaluation {
                score: max_marks / 2.0,
                feedback: "partly right".to_string(),
            })
        }
    }

    fn app() -> (tempfile::TempDir, App) {
        let dir = tempfile::tempdir().unwrap();
        let services = Services {
            content: Arc::new(Canned),
            store: Arc::new(StoreHandle::new(dir.path().to_path_buf())),
        };
        let syllabus = Syllabus::load(None).unwrap();
        let theme: &'static Theme = Box::leak(Box::new(Theme::default()));
        let mut config = Config::default();
        config.default_question_count = 2;
        (dir, App::new(config, services, syllabus, theme))
    }

    /// Run queued jobs inline and apply their outcomes.
    fn drain(app: &mut App) {
        let services = app.services();
        for (ticket, job) in app.take_jobs() {
            let outcome = jobs::run(job, &services);
            app.apply_outcome(ticket, outcome);
        }
    }

    fn open_biology_module(app: &mut App) {
        let biology = app
            .syllabus
            .subjects
            .iter()
            .position(|s| s.name == "Biology")
            .unwrap();
        app.revision.subject = biology;
        app.revision_open();
        app.revision_open();
    }

    #[test]
    fn section_cycling_wraps() {
        assert_eq!(Section::History.next(), Section::Revision);
        assert_eq!(Section::Revision.prev(), Section::History);
    }

    #[test]
    fn opening_module_loads_notes_and_flashcards() {
        let (_dir, mut app) = app();
        open_biology_module(&mut app);
        assert_eq!(app.revision.view, RevisionView::ModuleDetail);
        assert!(app.revision.loading);

        drain(&mut app);
        assert!(!app.revision.loading);
        assert!(app.revision.notes.as_deref().unwrap().starts_with("# Microbes"));
        assert_eq!(app.revision.deck.len(), 3);
    }

    #[test]
    fn unavailable_subject_and_module_do_not_open() {
        let (_dir, mut app) = app();
        app.revision.subject = 0;
        app.revision_open();
        assert_eq!(app.revision.view, RevisionView::Subjects);

        open_biology_module(&mut app);
        app.revision_back();
        app.revision.module = 1;
        app.revision_open();
        assert_eq!(app.revision.view, RevisionView::Modules);
    }

    #[test]
    fn leaving_module_drops_late_materials() {
        let (_dir, mut app) = app();
        open_biology_module(&mut app);
        let queued = app.take_jobs();
        app.revision_back();

        let services = app.services();
        for (ticket, job) in queued {
            app.apply_outcome(ticket, jobs::run(job, &services));
        }
        assert!(app.revision.notes.is_none());
        assert!(app.revision.error.is_none());
    }

    #[test]
    fn blank_paper_path_is_rejected_without_a_job() {
        let (_dir, mut app) = app();
        app.analyze_paper();
        assert_eq!(app.pyqs.error.as_deref(), Some(MISSING_FILE_MESSAGE));
        assert!(app.take_jobs().is_empty());
    }

    #[test]
    fn first_chapter_starts_selected() {
        let (_dir, app) = app();
        assert_eq!(app.mock.setup.selected_chapters(), ["Microorganisms"]);
    }

    #[test]
    fn generation_needs_a_chapter() {
        let (_dir, mut app) = app();
        app.setup_activate();
        app.generate_test();
        assert_eq!(app.mock.error.as_deref(), Some(NO_CHAPTERS_MESSAGE));
        assert!(app.take_jobs().is_empty());
    }

    #[test]
    fn question_count_is_clamped() {
        let (_dir, mut app) = app();
        app.mock.setup.cursor = app.mock.setup.count_row();
        for _ in 0..5 {
            app.setup_adjust(false);
        }
        assert_eq!(app.mock.setup.num_questions, MIN_QUESTIONS);
        for _ in 0..30 {
            app.setup_adjust(true);
        }
        assert_eq!(app.mock.setup.num_questions, MAX_QUESTIONS);
    }

    #[test]
    fn full_mock_test_is_scored_and_saved() {
        let (_dir, mut app) = app();
        app.generate_test();
        drain(&mut app);
        assert_eq!(app.mock.view, MockView::InProgress);

        for index in 0..2 {
            app.mock.selected = index;
            app.check_answer();
            assert!(app.take_jobs().is_empty(), "blank answers are not sent");

            app.open_answer();
            app.mock.answer_input.as_mut().unwrap().set_value("bacteria divide");
            app.commit_answer();
            app.check_answer();
            drain(&mut app);
        }

        let session = app.mock.session.as_ref().unwrap();
        assert!(session.all_evaluated());
        assert_eq!(session.total_score(), 2.0);

        app.save_test();
        drain(&mut app);
        assert_eq!(app.mock.view, MockView::Saved);
        assert_eq!(app.mock.notice.as_deref(), Some(SAVED_MESSAGE));

        app.set_section(Section::History);
        drain(&mut app);
        assert_eq!(app.history.records.len(), 1);
        assert_eq!(app.history.records[0].total_score, 2.0);
        assert_eq!(app.history.records[0].max_score, 4.0);
    }

    #[test]
    fn incomplete_test_is_not_saved() {
        let (_dir, mut app) = app();
        app.generate_test();
        drain(&mut app);
        app.save_test();
        assert!(app.take_jobs().is_empty());
        assert!(!app.mock.saving);
    }

    #[test]
    fn clearing_history_requires_confirmation() {
        let (_dir, mut app) = app();
        app.history.records = vec![];
        app.request_clear();
        assert!(!app.history.confirm_clear, "nothing to clear");

        app.generate_test();
        drain(&mut app);
        app.mock.session.as_mut().unwrap().set_answer(0, "x");
        app.mock.session.as_mut().unwrap().set_answer(1, "y");
        for index in 0..2 {
            app.mock.selected = index;
            app.check_answer();
        }
        drain(&mut app);
        app.save_test();
        drain(&mut app);

        app.set_section(Section::History);
        drain(&mut app);
        app.request_clear();
        assert!(app.history.confirm_clear);
        app.answer_clear(false);
        assert!(app.take_jobs().is_empty());
        assert_eq!(app.history.records.len(), 1);

        app.request_clear();
        app.answer_clear(true);
        drain(&mut app);
        assert!(app.history.records.is_empty());

        app.load_history();
        drain(&mut app);
        assert!(app.history.records.is_empty());
    }

    #[test]
    fn typing_state_follows_fields() {
        let (_dir, mut app) = app();
        assert!(!app.is_typing());
        app.set_section(Section::Pyqs);
        assert!(app.is_typing());
        app.pyqs.editing = false;
        assert!(!app.is_typing());
    }
}
